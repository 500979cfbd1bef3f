/*
 * matcher.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Property-based identity matching for object list items.
 */

//! List item matcher.
//!
//! Object list items have no stable identity of their own, so an item is
//! paired with a candidate from another list by comparing properties:
//!
//! 1. every candidate starts in the running
//! 2. for each property of the item with a usable identity (a non-null
//!    scalar or a non-empty subtree), a candidate exposing the same key is
//!    either credited (values match) or eliminated (values differ); a
//!    candidate without the key, or with a null value for it, is left alone
//! 3. candidates with no credit are dropped, then all but those with the
//!    highest credit
//! 4. exactly one survivor is the match; none or several means no match
//!
//! Both the merger and the validator pair items through [`pair_list_items`],
//! so they always agree on which items belong together.

use std::collections::HashMap;

use tracing::debug;

use crate::tree::{NodeId, YamlTree};

/// Find the single candidate in `target` matching `item` of `source`.
///
/// Works on comment trees and oracle trees alike: values are compared
/// through [`crate::tree::Node::identity`].
pub fn find_match(
    source: &YamlTree,
    item: NodeId,
    target: &YamlTree,
    candidates: &[NodeId],
) -> Option<NodeId> {
    let mut alive: Vec<NodeId> = candidates.to_vec();
    let mut credit: HashMap<NodeId, usize> = HashMap::new();

    for prop in source.children(item) {
        let prop_node = source.node(*prop);
        let Some(key) = prop_node.key.as_deref() else {
            continue;
        };
        if !has_identity(source, *prop) {
            continue;
        }
        alive.retain(|candidate| match target.child_by_key(*candidate, key) {
            None => true,
            Some(other) if !has_identity(target, other) => true,
            Some(other) => {
                if values_match(source, *prop, target, other) {
                    *credit.entry(*candidate).or_default() += 1;
                    true
                } else {
                    false
                }
            }
        });
    }

    let best = alive
        .iter()
        .filter_map(|c| credit.get(c).copied())
        .max()
        .unwrap_or(0);
    if best == 0 {
        return None;
    }
    let survivors: Vec<NodeId> = alive
        .into_iter()
        .filter(|c| credit.get(c).copied() == Some(best))
        .collect();

    match survivors.as_slice() {
        [only] => Some(*only),
        _ => {
            debug!(
                path = %source.path(item),
                candidates = survivors.len(),
                "ambiguous list item, leaving it unmatched"
            );
            None
        }
    }
}

/// Pair every object item of `items` with at most one of `candidates`.
///
/// Items are processed in order and a matched candidate leaves the pool, so
/// no candidate is paired twice. A pairing also has to hold in reverse: the
/// candidate must single out the item among the still unpaired items, which
/// keeps two identical items from claiming one candidate. Scalar items never
/// match.
pub fn pair_list_items(
    source: &YamlTree,
    items: &[NodeId],
    target: &YamlTree,
    candidates: &[NodeId],
) -> Vec<Option<NodeId>> {
    let mut pool: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|c| !target.children(*c).is_empty())
        .collect();
    let mut unpaired: Vec<NodeId> = items
        .iter()
        .copied()
        .filter(|i| !source.children(*i).is_empty())
        .collect();

    items
        .iter()
        .map(|item| {
            if source.children(*item).is_empty() {
                return None;
            }
            let found = find_match(source, *item, target, &pool)?;
            if find_match(target, found, source, &unpaired) != Some(*item) {
                debug!(path = %source.path(*item), "list item match is not mutual");
                return None;
            }
            pool.retain(|c| *c != found);
            unpaired.retain(|i| i != item);
            Some(found)
        })
        .collect()
}

/// A property can identify its item: non-null scalar or non-empty subtree.
fn has_identity(tree: &YamlTree, id: NodeId) -> bool {
    !tree.children(id).is_empty() || tree.node(id).identity().is_some_and(|v| !v.is_null())
}

fn values_match(a_tree: &YamlTree, a: NodeId, b_tree: &YamlTree, b: NodeId) -> bool {
    let (a_leaf, b_leaf) = (a_tree.children(a).is_empty(), b_tree.children(b).is_empty());
    if a_leaf || b_leaf {
        return a_leaf && b_leaf && a_tree.node(a).identity() == b_tree.node(b).identity();
    }

    match (a_tree.is_list(a), b_tree.is_list(b)) {
        (true, true) => {
            // scalar lists are never diffed
            if a_tree.is_scalar_list(a) || b_tree.is_scalar_list(b) {
                return true;
            }
            let candidates = b_tree.children(b);
            a_tree
                .children(a)
                .iter()
                .filter(|item| !a_tree.children(**item).is_empty())
                .any(|item| find_match(a_tree, *item, b_tree, candidates).is_some())
        }
        (false, false) => subtree_match(a_tree, a, b_tree, b),
        _ => false,
    }
}

/// At least one property matches and none conflicts.
fn subtree_match(a_tree: &YamlTree, a: NodeId, b_tree: &YamlTree, b: NodeId) -> bool {
    let mut matches = 0;
    for prop in a_tree.children(a) {
        let Some(key) = a_tree.node(*prop).key.as_deref() else {
            continue;
        };
        if !has_identity(a_tree, *prop) {
            continue;
        }
        if let Some(other) = b_tree
            .child_by_key(b, key)
            .filter(|other| has_identity(b_tree, *other))
        {
            if values_match(a_tree, *prop, b_tree, other) {
                matches += 1;
            } else {
                return false;
            }
        }
    }
    matches > 0
}
