/*
 * validate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Round-trip validation of a merged document.
 */

//! Round-trip validator.
//!
//! After the merged text has been written and parsed again by the YAML
//! engine, [`validate`] walks the three oracle trees together:
//!
//! - a value the current document owned must be unchanged
//! - any other value must equal the update's value at that path
//! - no value of either document may be missing
//!
//! The current document owns a path when it has a value there (a null
//! value gives way to an update subtree). An alias that is still an alias
//! in the merged document is accepted as is: its value follows the anchor,
//! which is checked where it is defined. Object lists are compared item
//! by item: merged items line up with the current items by position, and
//! each current item is paired with an update item through the same
//! matcher the merger used.

use tracing::debug;

use crate::error::{Error, Result};
use crate::matcher::pair_list_items;
use crate::tree::{NodeId, YamlPath, YamlTree, format_value};

use yaml_rust2::Yaml;

/// Check `merged` against the current document (`old`, absent on first
/// install) and the update document (`new`).
pub fn validate(merged: &YamlTree, old: Option<&YamlTree>, new: &YamlTree) -> Result<()> {
    let validator = Validator { merged, old, new };
    let old_root = old.filter(|tree| !tree.is_empty()).map(YamlTree::root);
    validator.check_children(
        &YamlPath::root(),
        merged.root(),
        old_root,
        Some(new.root()),
    )?;
    debug!("merged document validated");
    Ok(())
}

struct Validator<'a> {
    merged: &'a YamlTree,
    old: Option<&'a YamlTree>,
    new: &'a YamlTree,
}

enum Origin {
    Current,
    Update,
}

impl Origin {
    fn label(&self) -> &'static str {
        match self {
            Origin::Current => "current",
            Origin::Update => "update",
        }
    }
}

impl Validator<'_> {
    fn check_node(
        &self,
        path: &YamlPath,
        merged: Option<NodeId>,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) -> Result<()> {
        let source_alias = match (old, self.old) {
            (Some(o), Some(tree)) => tree.node(o).is_alias(),
            _ => new.is_some_and(|n| self.new.node(n).is_alias()),
        };
        if source_alias && merged.is_some_and(|m| self.merged.node(m).is_alias()) {
            return Ok(());
        }

        if let (Some(o), Some(tree)) = (old, self.old) {
            if !tree.is_leaf_value(o) {
                let m = self.expect_container(path, merged)?;
                let n = new.filter(|n| !self.new.is_leaf_value(*n));
                return self.check_children(path, m, Some(o), n);
            }
            let replaced_null = tree.to_yaml(o).is_null()
                && merged.is_some_and(|m| !self.merged.is_leaf_value(m));
            if !replaced_null {
                return self.expect_value(path, merged, tree.to_yaml(o), Origin::Current);
            }
        }

        match new {
            Some(n) if self.new.is_leaf_value(n) => {
                self.expect_value(path, merged, self.new.to_yaml(n), Origin::Update)
            }
            Some(n) => {
                let m = self.expect_container(path, merged)?;
                self.check_children(path, m, None, Some(n))
            }
            None => match merged {
                Some(m) => Err(Error::validation(
                    path.as_str(),
                    format!(
                        "value {} exists in neither document",
                        format_value(&self.merged.to_yaml(m))
                    ),
                )),
                None => Ok(()),
            },
        }
    }

    fn check_children(
        &self,
        path: &YamlPath,
        merged: NodeId,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) -> Result<()> {
        if self.merged.is_list(merged) {
            self.check_list(path, merged, old, new)
        } else {
            self.check_mapping(path, merged, old, new)
        }
    }

    fn check_list(
        &self,
        path: &YamlPath,
        merged: NodeId,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) -> Result<()> {
        let merged_items = self.merged.children(merged);
        let new_items = new
            .filter(|n| self.new.is_list(*n))
            .map(|n| self.new.children(n))
            .unwrap_or_default();
        let old_list = self
            .old
            .and_then(|tree| old.filter(|o| tree.is_list(*o)).map(|o| (tree, o)));

        match old_list {
            Some((tree, o)) => {
                let old_items = tree.children(o);
                if old_items.len() != merged_items.len() {
                    return Err(self.length_error(path, merged_items.len(), old_items.len(), Origin::Current));
                }
                let pairs = pair_list_items(tree, old_items, self.new, new_items);
                for (i, ((m, o), n)) in merged_items.iter().zip(old_items).zip(pairs).enumerate() {
                    self.check_node(&path.item(i), Some(*m), Some(*o), n)?;
                }
            }
            None => {
                if new_items.len() != merged_items.len() {
                    return Err(self.length_error(path, merged_items.len(), new_items.len(), Origin::Update));
                }
                for (i, (m, n)) in merged_items.iter().zip(new_items).enumerate() {
                    self.check_node(&path.item(i), Some(*m), None, Some(*n))?;
                }
            }
        }
        Ok(())
    }

    fn check_mapping(
        &self,
        path: &YamlPath,
        merged: NodeId,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) -> Result<()> {
        let old_child = |key: &str| self.old.zip(old).and_then(|(tree, o)| tree.child_by_key(o, key));
        let new_child = |key: &str| new.and_then(|n| self.new.child_by_key(n, key));

        for m in self.merged.children(merged) {
            let Some(key) = self.merged.node(*m).key.as_deref() else {
                continue;
            };
            self.check_node(&path.child(key), Some(*m), old_child(key), new_child(key))?;
        }

        // values the merged document lost
        if let (Some(tree), Some(o)) = (self.old, old) {
            for child in tree.children(o) {
                let Some(key) = tree.node(*child).key.as_deref() else {
                    continue;
                };
                if self.merged.child_by_key(merged, key).is_none() {
                    self.check_node(&path.child(key), None, Some(*child), new_child(key))?;
                }
            }
        }
        if let Some(n) = new {
            for child in self.new.children(n) {
                let Some(key) = self.new.node(*child).key.as_deref() else {
                    continue;
                };
                if self.merged.child_by_key(merged, key).is_none() && old_child(key).is_none() {
                    self.check_node(&path.child(key), None, None, Some(*child))?;
                }
            }
        }
        Ok(())
    }

    fn expect_value(
        &self,
        path: &YamlPath,
        merged: Option<NodeId>,
        expected: Yaml,
        origin: Origin,
    ) -> Result<()> {
        let Some(m) = merged else {
            return Err(Error::validation(
                path.as_str(),
                format!("{} value {} is missing", origin.label(), format_value(&expected)),
            ));
        };
        if !self.merged.is_leaf_value(m) {
            return Err(Error::validation(
                path.as_str(),
                format!(
                    "expected {} value {}, found a nested structure",
                    origin.label(),
                    format_value(&expected)
                ),
            ));
        }
        let actual = self.merged.to_yaml(m);
        if actual != expected {
            return Err(Error::validation(
                path.as_str(),
                format!(
                    "expected {} value {}, found {}",
                    origin.label(),
                    format_value(&expected),
                    format_value(&actual)
                ),
            ));
        }
        Ok(())
    }

    fn expect_container(&self, path: &YamlPath, merged: Option<NodeId>) -> Result<NodeId> {
        match merged {
            None => Err(Error::validation(path.as_str(), "nested structure is missing")),
            Some(m) if self.merged.is_leaf_value(m) => Err(Error::validation(
                path.as_str(),
                format!(
                    "expected a nested structure, found value {}",
                    format_value(&self.merged.to_yaml(m))
                ),
            )),
            Some(m) => Ok(m),
        }
    }

    fn length_error(&self, path: &YamlPath, merged: usize, expected: usize, origin: Origin) -> Error {
        Error::validation(
            path.as_str(),
            format!(
                "list has {} items, {} document has {}",
                merged,
                origin.label(),
                expected
            ),
        )
    }
}
