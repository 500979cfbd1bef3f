/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for the update pipeline.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an update.
///
/// When any of these is returned the target file has not been touched.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// One of the two documents could not be parsed.
    #[error("Failed to parse {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: yaml_updater_core::Error,
    },

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The merged document did not survive the round trip.
    #[error("{source}\nMerged content:\n{listing}")]
    Validation {
        #[source]
        source: yaml_updater_core::Error,
        /// The merged document with line numbers
        listing: String,
    },
}

impl UpdateError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdateError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(source_name: impl Into<String>, source: yaml_updater_core::Error) -> Self {
        UpdateError::Parse {
            source_name: source_name.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = UpdateError::io(
            "read",
            "/tmp/missing.yml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "Failed to read /tmp/missing.yml: not found");
    }

    #[test]
    fn test_validation_error_carries_listing() {
        let err = UpdateError::Validation {
            source: yaml_updater_core::Error::Validation {
                path: "a".to_string(),
                message: "value changed".to_string(),
            },
            listing: "1| a: 2\n".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("'a'"));
        assert!(text.ends_with("1| a: 2\n"));
    }
}
