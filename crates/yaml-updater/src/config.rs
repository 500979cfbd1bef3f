/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Options for a single configuration update.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpdateError};

/// Where the update document comes from.
///
/// Fetching remote or bundled templates is the caller's job; they arrive
/// here as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSource {
    /// In-memory text, labelled with `name` in error messages.
    Text { name: String, content: String },
    File(PathBuf),
}

impl UpdateSource {
    pub fn text(content: impl Into<String>) -> Self {
        UpdateSource::Text {
            name: "update".to_string(),
            content: content.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        UpdateSource::File(path.into())
    }

    /// Label used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            UpdateSource::Text { name, .. } => name.clone(),
            UpdateSource::File(path) => path.display().to_string(),
        }
    }

    pub(crate) fn load(&self) -> Result<String> {
        match self {
            UpdateSource::Text { content, .. } => Ok(content.clone()),
            UpdateSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| UpdateError::io("read update file", path, e)),
        }
    }
}

/// Configuration for [`crate::update`].
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// The configuration file to update. It may not exist yet.
    pub target: PathBuf,
    pub update: UpdateSource,
    /// Paths removed from the current file before merging, in order.
    pub delete_paths: Vec<String>,
    /// Values for `#{name}` placeholders in the update text.
    pub variables: BTreeMap<String, String>,
    /// Copy the current file aside before replacing it.
    pub backup: bool,
    /// Directory for backups; the target's directory when unset.
    pub backup_dir: Option<PathBuf>,
    /// Re-parse and check the merged document before writing it.
    pub validate_result: bool,
    /// Run every stage but never touch the target.
    pub dry_run: bool,
}

impl UpdateConfig {
    pub fn new(target: impl Into<PathBuf>, update: UpdateSource) -> Self {
        Self {
            target: target.into(),
            update,
            delete_paths: Vec::new(),
            variables: BTreeMap::new(),
            backup: true,
            backup_dir: None,
            validate_result: true,
            dry_run: false,
        }
    }

    pub fn with_delete_path(mut self, path: impl Into<String>) -> Self {
        self.delete_paths.push(path.into());
        self
    }

    pub fn with_delete_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delete_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_result = validate;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Directory holding the target file.
    pub(crate) fn target_dir(&self) -> &Path {
        match self.target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}
