/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Merge of a current comment tree against an update comment tree.
 */

//! Tree merger.
//!
//! [`merge`] rewrites the current tree in place so that it
//!
//! - keeps every pre-existing property and its value
//! - gains every property that only the update defines (tagged as added)
//! - follows the update's property order, indentation and dash style
//! - carries the update's comments for properties present on both sides
//!
//! Only the first document is merged. Later documents of the current file
//! are kept verbatim at the end; those of the update are carried over only
//! when the current document is empty.
//!
//! The merger never fails. Object list items without a unique counterpart
//! are kept untouched and reported in [`MergeSummary::unmatched`]; the
//! round-trip validator catches anything that went wrong.

use std::mem;

use tracing::debug;

use crate::matcher::pair_list_items;
use crate::tree::{NodeId, YamlPath, YamlTree, shift_line};

/// What the merger could not reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Object list items of the current document left as they were.
    pub unmatched: Vec<YamlPath>,
}

/// Merge `update` into `current`.
pub fn merge(current: &mut YamlTree, update: &YamlTree) -> MergeSummary {
    let mut summary = MergeSummary::default();

    let trailing = current.trailing_comment();
    let document = current.trailing_document();
    for id in [trailing, document].into_iter().flatten() {
        current.detach(id);
    }

    let (croot, uroot) = (current.root(), update.root());
    merge_level(current, croot, update, uroot, &mut summary);

    let mut children = current.children(croot).to_vec();
    if document.is_some() {
        children.retain(|c| !current.node(*c).is_trailing_document());
    }
    // one trailing comment survives; the update's wins
    if update.trailing_comment().is_none() {
        children.extend(trailing);
    }
    children.extend(document);
    current.set_children(croot, children);

    debug!(unmatched = summary.unmatched.len(), "merge complete");
    summary
}

fn merge_level(
    current: &mut YamlTree,
    cid: NodeId,
    update: &YamlTree,
    uid: NodeId,
    summary: &mut MergeSummary,
) {
    let update_children = update.children(uid);
    if update_children.is_empty() {
        return;
    }

    if current.children(cid).is_empty() {
        if cid != current.root() && current.node(cid).has_scalar_value() {
            debug!(path = %current.path(cid), "keeping current value over update subtree");
            return;
        }
        let grafted: Vec<NodeId> = update_children
            .iter()
            .map(|u| current.graft(update, *u))
            .collect();
        current.set_children(cid, grafted);
        return;
    }

    if current.is_list(cid) != update.is_list(uid) {
        debug!(path = %current.path(cid), "list and mapping mixed, keeping current");
        return;
    }

    if update.is_list(uid) {
        merge_list(current, cid, update, uid, summary);
    } else {
        merge_properties(current, cid, update, uid, summary);
    }
}

/// A position in the merged property order.
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Update node not (yet) claimed by a current property.
    Added(NodeId),
    /// Current node.
    Kept(NodeId),
}

fn merge_properties(
    current: &mut YamlTree,
    cid: NodeId,
    update: &YamlTree,
    uid: NodeId,
    summary: &mut MergeSummary,
) {
    let update_children = update.children(uid);
    let padding = update_children
        .iter()
        .map(|u| update.node(*u))
        .find(|n| !n.is_comment_only())
        .map(|n| n.padding);

    let mut slots: Vec<Slot> = update_children
        .iter()
        .filter(|u| !update.node(**u).is_trailing_document())
        .map(|u| Slot::Added(*u))
        .collect();
    let mut insert_at = 0;

    for child in current.children(cid).to_vec() {
        if let Some(padding) = padding {
            let delta = padding as isize - current.node(child).padding as isize;
            current.shift(child, delta);
        }

        let key = current.node(child).key.clone();
        let claimed = key.as_deref().and_then(|key| {
            slots.iter().position(|slot| {
                matches!(slot, Slot::Added(u) if update.node(*u).key.as_deref() == Some(key))
            })
        });

        match claimed {
            Some(pos) => {
                if let Slot::Added(u) = slots[pos] {
                    if let (Some(data), Some(template)) = (
                        current.node_mut(child).comments_mut(),
                        update.node(u).comments(),
                    ) {
                        data.top_comment = template.top_comment.clone();
                        data.source_key = template.source_key.clone();
                    }
                    slots[pos] = Slot::Kept(child);
                    merge_level(current, child, update, u, summary);
                }
                insert_at = pos + 1;
            }
            None => {
                slots.insert(insert_at, Slot::Kept(child));
                insert_at += 1;
            }
        }
    }

    let children: Vec<NodeId> = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Added(u) => current.graft(update, u),
            Slot::Kept(c) => c,
        })
        .collect();
    current.set_children(cid, children);
}

/// How object items of a list are laid out.
#[derive(Debug, Clone, Copy)]
struct DashStyle {
    /// First property on the dash line.
    same_line: bool,
    /// Indentation of the item's properties relative to the dash.
    child_offset: usize,
}

fn merge_list(
    current: &mut YamlTree,
    cid: NodeId,
    update: &YamlTree,
    uid: NodeId,
    summary: &mut MergeSummary,
) {
    let update_items: Vec<NodeId> = update
        .children(uid)
        .iter()
        .copied()
        .filter(|u| update.node(*u).list_item)
        .collect();
    let Some(&first) = update_items.first() else {
        return;
    };

    let padding = update.node(first).padding;
    let current_items = current.children(cid).to_vec();
    for item in &current_items {
        let delta = padding as isize - current.node(*item).padding as isize;
        current.shift(*item, delta);
    }
    if current.is_scalar_list(cid) {
        return;
    }

    let style = update_items.iter().find_map(|u| {
        let first_child = *update.children(*u).first()?;
        let node = update.node(*u);
        Some(DashStyle {
            same_line: node.list_item_with_property,
            child_offset: update.node(first_child).padding.saturating_sub(node.padding),
        })
    });

    let pairs = pair_list_items(current, &current_items, update, &update_items);
    for (item, pair) in current_items.iter().zip(pairs) {
        match pair {
            Some(u) => merge_level(current, *item, update, u, summary),
            None if !current.children(*item).is_empty() => {
                debug!(path = %current.path(*item), "no unique match for list item");
                summary.unmatched.push(current.path(*item));
            }
            None => {}
        }
        if let Some(style) = style {
            apply_dash_style(current, *item, style);
        }
    }
}

/// Re-lay an object item in `style`.
///
/// Switching to the same-line form moves the first property's comment (and
/// any comment on the bare dash) above the dash.
fn apply_dash_style(tree: &mut YamlTree, item: NodeId, style: DashStyle) {
    let Some(&first) = tree.children(item).first() else {
        return;
    };
    if !tree.node(first).is_property() {
        return;
    }
    let padding = tree.node(item).padding;

    if style.same_line && !tree.node(item).list_item_with_property {
        let dash_text = tree
            .node(item)
            .comments()
            .and_then(|data| data.value.first())
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        if !dash_text.is_empty() && !dash_text.starts_with('#') {
            // tags or anchors on the dash line cannot move
            return;
        }

        let delta = padding as isize - tree.node(first).padding as isize;
        let first_comment = tree
            .node_mut(first)
            .comments_mut()
            .map(|data| mem::take(&mut data.top_comment))
            .unwrap_or_default();

        if let Some(data) = tree.node_mut(item).comments_mut() {
            data.value.clear();
            if !dash_text.is_empty() {
                data.top_comment
                    .push(format!("{}{}", " ".repeat(padding), dash_text));
            }
            data.top_comment
                .extend(first_comment.iter().map(|line| shift_line(line, delta)));
        }
        tree.node_mut(item).list_item_with_property = true;
    } else if !style.same_line && tree.node(item).list_item_with_property {
        tree.node_mut(item).list_item_with_property = false;
    }

    let delta = (padding + style.child_offset) as isize - tree.node(first).padding as isize;
    for child in tree.children(item).to_vec() {
        tree.shift(child, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::{parse_comments, render};
    use crate::cross_check::cross_check;
    use crate::structure::parse_structure;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> YamlTree {
        let mut tree = parse_comments(text).unwrap();
        cross_check(&mut tree, &parse_structure(text).unwrap()).unwrap();
        tree
    }

    fn merged(current: &str, update: &str) -> (String, MergeSummary) {
        let mut tree = parse(current);
        let summary = merge(&mut tree, &parse(update));
        (render(&tree, "\n"), summary)
    }

    #[test]
    fn test_adds_new_property_and_keeps_value() {
        let (text, summary) = merged(
            "server:\n  port: 8080 # prod\n",
            "server:\n    port: 9090\n    host: localhost\n",
        );
        assert_eq!(text, "server:\n    port: 8080 # prod\n    host: localhost\n");
        assert!(summary.unmatched.is_empty());
    }

    #[test]
    fn test_current_only_properties_follow_last_match() {
        let (text, _) = merged("b: 1\nmine: x\nc: 2\n", "a: 0\nb: 0\nc: 0\nd: 0\n");
        assert_eq!(text, "a: 0\nb: 1\nmine: x\nc: 2\nd: 0\n");
    }

    #[test]
    fn test_current_only_before_any_match_goes_first() {
        let (text, _) = merged("mine: x\nb: 1\n", "a: 0\nb: 0\n");
        assert_eq!(text, "mine: x\na: 0\nb: 1\n");
    }

    #[test]
    fn test_update_comments_and_key_quoting_win() {
        let (text, _) = merged("# old\nkey: 1\n", "# new\n'key': 2\n");
        assert_eq!(text, "# new\n'key': 1\n");
    }

    #[test]
    fn test_added_nodes_are_tagged() {
        let mut tree = parse("a: 1\n");
        merge(&mut tree, &parse("a: 2\nb:\n  c: 3\n"));
        let a = tree.find("a").unwrap();
        let c = tree.find("b/c").unwrap();
        assert!(!tree.node(a).is_added());
        assert!(tree.node(c).is_added());
    }

    #[test]
    fn test_scalar_value_wins_over_update_subtree() {
        let (text, _) = merged("opt: off\n", "opt:\n  level: 2\n");
        assert_eq!(text, "opt: off\n");
    }

    #[test]
    fn test_empty_value_takes_update_subtree() {
        let (text, _) = merged("opt:\n", "opt:\n  level: 2\n");
        assert_eq!(text, "opt:\n  level: 2\n");
    }

    #[test]
    fn test_multiline_values_are_reindented() {
        let current = "a:\n  text: |\n    line one\n\n    line two\n  b: 1\n";
        let update = "a:\n    text: x\n    b: 2\n";
        let (text, _) = merged(current, update);
        assert_eq!(
            text,
            "a:\n    text: |\n      line one\n\n      line two\n    b: 1\n"
        );
    }

    #[test]
    fn test_list_items_are_matched_and_merged() {
        let current = "users:\n- name: a\n  role: admin\n- name: b\n";
        let update = "users:\n  - name: b\n    shell: sh\n  - name: a\n    shell: bash\n";
        let (text, _) = merged(current, update);
        assert_eq!(
            text,
            "users:\n  - name: a\n    role: admin\n    shell: bash\n  - name: b\n    shell: sh\n"
        );
    }

    #[test]
    fn test_ambiguous_items_are_left_alone() {
        let current = "list:\n  - name: a\n  - name: a\n";
        let update = "list:\n  - name: a\n    new: 1\n";
        let (text, summary) = merged(current, update);
        assert_eq!(text, current);
        assert_eq!(
            summary.unmatched,
            vec![YamlPath::new("list[0]"), YamlPath::new("list[1]")]
        );
    }

    #[test]
    fn test_dash_style_switches_to_same_line() {
        let current = "list:\n  -\n    # about a\n    name: a\n    x: 1\n";
        let update = "list:\n  - name: b\n    y: 2\n";
        let (text, summary) = merged(current, update);
        assert_eq!(text, "list:\n  # about a\n  - name: a\n    x: 1\n");
        assert_eq!(summary.unmatched, vec![YamlPath::new("list[0]")]);
    }

    #[test]
    fn test_dash_style_switches_to_separate_lines() {
        let current = "list:\n  - name: a\n    x: 1\n";
        let update = "list:\n  -\n    name: a\n";
        let (text, _) = merged(current, update);
        assert_eq!(text, "list:\n  -\n    name: a\n    x: 1\n");
    }

    #[test]
    fn test_scalar_lists_are_kept() {
        let (text, _) = merged("tags:\n- x\n- y\n", "tags:\n    - z\n");
        assert_eq!(text, "tags:\n    - x\n    - y\n");
    }

    #[test]
    fn test_single_trailing_comment_survives() {
        let (text, _) = merged("a: 1\n# old end\n", "a: 2\n# new end\n");
        assert_eq!(text, "a: 1\n# new end\n");
        let (text, _) = merged("a: 1\n# old end\n", "a: 2\nb: 3\n");
        assert_eq!(text, "a: 1\nb: 3\n# old end\n");
    }

    #[test]
    fn test_second_document_of_current_is_kept() {
        let current = "a: 1\n# old end\n---\nb: 2\n";
        let (text, _) = merged(current, "a: 2\nc: 3\n# end\n");
        assert_eq!(text, "a: 1\nc: 3\n# end\n---\nb: 2\n");

        let (text, _) = merged(current, "a: 2\n");
        assert_eq!(text, "a: 1\n# old end\n---\nb: 2\n");
    }

    #[test]
    fn test_second_document_of_update_is_not_merged() {
        let (text, _) = merged("a: 1\n", "a: 2\n---\nz: 9\n");
        assert_eq!(text, "a: 1\n");

        let (text, _) = merged("a: 1\n---\nb: 2\n", "a: 2\n---\nz: 9\n");
        assert_eq!(text, "a: 1\n---\nb: 2\n");
    }

    #[test]
    fn test_empty_current_takes_whole_update() {
        let (text, _) = merged("", "a: 2\n---\nz: 9\n");
        assert_eq!(text, "a: 2\n---\nz: 9\n");
    }

    #[test]
    fn test_self_merge_is_identity() {
        let yaml = "# top\nserver:\n  port: 80 # p\nlist:\n  - name: a\n    v: 1\n  - name: b\n";
        let (text, summary) = merged(yaml, yaml);
        assert_eq!(text, yaml);
        assert!(summary.unmatched.is_empty());
    }
}
