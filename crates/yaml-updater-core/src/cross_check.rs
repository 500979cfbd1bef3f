/*
 * cross_check.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Shape comparison between the comment tree and the oracle tree.
 */

//! Cross-validation of the two parsers.
//!
//! The comment parser infers structure from indentation alone. Before a
//! comment tree is used, its shape is compared level by level with the
//! oracle tree, and every comment node receives the engine-decoded value of
//! its counterpart in `parsed_value`. Any disagreement is a defect in the
//! comment parser and aborts the run with both subtrees printed.

use tracing::debug;

use crate::diagnostic::side_by_side;
use crate::error::{Error, Result};
use crate::tree::{NodeId, YamlTree};

/// Compare `comments` with `structure` and copy decoded values over.
pub fn cross_check(comments: &mut YamlTree, structure: &YamlTree) -> Result<()> {
    let (croot, sroot) = (comments.root(), structure.root());
    check_level(comments, croot, structure, sroot)?;
    debug!(nodes = structure.descendants(sroot).len(), "comment tree matches YAML engine");
    Ok(())
}

fn check_level(
    comments: &mut YamlTree,
    cid: NodeId,
    structure: &YamlTree,
    sid: NodeId,
) -> Result<()> {
    let value = structure.node(sid).identity().cloned();
    if let Some(data) = comments.node_mut(cid).comments_mut() {
        data.parsed_value = value;
    }

    let comment_children: Vec<NodeId> = comments
        .children(cid)
        .iter()
        .copied()
        .filter(|c| !comments.node(*c).is_comment_only())
        .collect();
    let structure_children = structure.children(sid);

    if comment_children.len() != structure_children.len() {
        return Err(inconsistent(
            comments,
            cid,
            structure,
            sid,
            format!(
                "comment parser found {} children, YAML engine found {}",
                comment_children.len(),
                structure_children.len()
            ),
        ));
    }

    for (c, s) in comment_children.iter().zip(structure_children) {
        let (cnode, snode) = (comments.node(*c), structure.node(*s));
        if cnode.list_item != snode.list_item {
            return Err(inconsistent(
                comments,
                *c,
                structure,
                *s,
                "list item and property mixed up".to_string(),
            ));
        }
        if cnode.key != snode.key {
            let reason = format!(
                "key {:?} does not match {:?}",
                cnode.key.as_deref().unwrap_or_default(),
                snode.key.as_deref().unwrap_or_default()
            );
            return Err(inconsistent(comments, *c, structure, *s, reason));
        }
    }

    for (c, s) in comment_children.into_iter().zip(structure_children) {
        check_level(comments, c, structure, *s)?;
    }
    Ok(())
}

fn inconsistent(
    comments: &YamlTree,
    cid: NodeId,
    structure: &YamlTree,
    sid: NodeId,
    reason: String,
) -> Error {
    Error::Inconsistent {
        path: comments.path(cid).to_string(),
        reason,
        dump: side_by_side(
            "comment parser",
            &comments.dump(cid),
            "YAML engine",
            &structure.dump(sid),
        ),
    }
}
