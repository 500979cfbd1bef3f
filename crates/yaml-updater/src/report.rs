/*
 * report.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Change report produced by an update.
 */

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use yaml_updater_core::{YamlTree, render_with_positions};

/// Size of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub bytes: usize,
    pub lines: usize,
}

impl FileStats {
    pub fn of(content: &str) -> Self {
        Self {
            bytes: content.len(),
            lines: content.lines().count(),
        }
    }
}

/// A property that was added or removed, with the line it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathChange {
    pub path: String,
    /// 1-based line in the merged document (added) or the original (removed)
    pub line: usize,
    pub preview: String,
}

/// What an update did, or would do in a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub target: PathBuf,
    /// The target did not exist before.
    pub first_install: bool,
    /// The merged text differs from the current file.
    pub changed: bool,
    pub dry_run: bool,
    pub before: FileStats,
    pub after: FileStats,
    pub added: Vec<PathChange>,
    pub removed: Vec<PathChange>,
    /// Deletion paths that matched nothing.
    pub missing_deletions: Vec<String>,
    /// Object list items that were left unmerged.
    pub unmatched: Vec<String>,
    pub applied_variables: Vec<String>,
    pub backup: Option<PathBuf>,
    /// The merged document, set on dry runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Top-most added nodes of a merged tree, with their rendered lines.
pub(crate) fn added_paths(merged: &YamlTree) -> Vec<PathChange> {
    let (lines, positions) = render_with_positions(merged);
    let mut added: Vec<PathChange> = merged
        .descendants(merged.root())
        .into_iter()
        .filter(|id| {
            let node = merged.node(*id);
            node.is_added()
                && !node.is_comment_only()
                && !node
                    .parent()
                    .is_some_and(|parent| merged.node(parent).is_added())
        })
        .filter_map(|id| {
            let line = *positions.get(&id)?;
            Some(PathChange {
                path: merged.path(id).to_string(),
                line,
                preview: lines.get(line - 1).cloned().unwrap_or_default(),
            })
        })
        .collect();
    added.sort_by_key(|change| change.line);
    added
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match (self.dry_run, self.changed) {
            (_, false) => "unchanged",
            (true, true) => "would be updated",
            (false, true) if self.first_install => "created",
            (false, true) => "updated",
        };
        writeln!(f, "{}: {}", self.target.display(), verb)?;
        writeln!(
            f,
            "  size: {} -> {} bytes, {} -> {} lines",
            self.before.bytes, self.after.bytes, self.before.lines, self.after.lines
        )?;
        for change in &self.added {
            writeln!(f, "  + {} (line {}): {}", change.path, change.line, change.preview.trim())?;
        }
        for change in &self.removed {
            writeln!(f, "  - {} (line {}): {}", change.path, change.line, change.preview.trim())?;
        }
        for path in &self.missing_deletions {
            writeln!(f, "  ! nothing to delete at {}", path)?;
        }
        for path in &self.unmatched {
            writeln!(f, "  ! list item {} has no unique match, left as is", path)?;
        }
        if !self.applied_variables.is_empty() {
            writeln!(f, "  variables: {}", self.applied_variables.join(", "))?;
        }
        if let Some(backup) = &self.backup {
            writeln!(f, "  backup: {}", backup.display())?;
        }
        Ok(())
    }
}
