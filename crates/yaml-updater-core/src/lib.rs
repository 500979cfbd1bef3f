/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Comment-preserving YAML parse, merge and validation.
 */

//! # yaml-updater-core
//!
//! Parsing, merging and validation of YAML configuration files that keeps
//! every comment, blank line and formatting quirk of the user's file.
//!
//! ## Design
//!
//! Every document is parsed twice:
//!
//! - the comment parser ([`comments`]) keeps raw lines, comments and key
//!   spelling, and infers structure from indentation
//! - the structural oracle ([`structure`]) lets yaml-rust2 decode exact values
//!
//! [`cross_check`] proves both trees have the same shape and copies decoded
//! values into the comment tree. The [`merge`] then works on comment trees
//! only, and [`validate`] checks the re-parsed result against both inputs.
//!
//! ## Example
//!
//! ```rust
//! use yaml_updater_core::{merge, parse_document, render};
//!
//! let mut current = parse_document("server:\n  port: 8080 # prod\n", "config.yml").unwrap();
//! let update = parse_document("server:\n    port: 9090\n    host: localhost\n", "update.yml").unwrap();
//!
//! merge(&mut current.comments, &update.comments);
//! assert_eq!(
//!     render(&current.comments, "\n"),
//!     "server:\n    port: 8080 # prod\n    host: localhost\n"
//! );
//! ```

pub mod comments;
pub mod cross_check;
pub mod diagnostic;
mod error;
pub mod matcher;
pub mod merge;
pub mod structure;
pub mod tree;
pub mod validate;

pub use comments::{parse_comments, parse_comments_named, render, render_lines, render_with_positions};
pub use cross_check::cross_check;
pub use error::{Error, Result};
pub use matcher::{find_match, pair_list_items};
pub use merge::{MergeSummary, merge};
pub use structure::parse_structure;
pub use tree::{CommentData, Node, NodeId, Payload, StructureData, YamlPath, YamlTree, format_value};
pub use validate::validate;

use tracing::debug;

/// A document parsed by both parsers and cross-checked.
#[derive(Debug, Clone)]
pub struct Document {
    /// Comment tree, with decoded values filled in.
    pub comments: YamlTree,
    /// Oracle tree.
    pub structure: YamlTree,
}

impl Document {
    /// Remove the node at `path` from both trees.
    ///
    /// `path` is `/`-separated; a `.`-separated path is tried as a fallback.
    /// Returns `false` when nothing was found.
    pub fn delete(&mut self, path: &str) -> bool {
        let Some(id) = self.comments.resolve(path) else {
            return false;
        };
        self.comments.detach(id);
        if let Some(id) = self.structure.resolve(path) {
            self.structure.detach(id);
        }
        debug!(path, "deleted");
        true
    }
}

/// Parse `content` with both parsers and cross-check the result.
///
/// `source_name` labels syntax error excerpts.
///
/// # Errors
///
/// [`Error::Syntax`] or [`Error::Structure`] for malformed input,
/// [`Error::Inconsistent`] if the parsers disagree.
pub fn parse_document(content: &str, source_name: &str) -> Result<Document> {
    let mut comments = parse_comments_named(content, source_name)?;
    let structure = parse_structure(content)?;
    cross_check(&mut comments, &structure)?;
    debug!(source = source_name, lines = content.lines().count(), "parsed document");
    Ok(Document {
        comments,
        structure,
    })
}
