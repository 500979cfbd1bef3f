/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for parsing, cross-checking and validating YAML trees.
 */

//! Error types for the YAML update core.

/// Result type alias for yaml-updater-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the parsing, merging and validation core.
///
/// Every variant is fatal for the document being processed. Recoverable
/// conditions (ambiguous list matches, missing deletion targets) are never
/// reported through this type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A line could not be classified by the comment-preserving parser.
    #[error("Syntax error at line {line}: {message}\n{snippet}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// 1-based column of the offending character
        column: usize,
        message: String,
        /// Rendered source excerpt with a caret pointer
        snippet: String,
    },

    /// The YAML engine rejected the document.
    #[error("Invalid YAML: {message}")]
    Structure {
        message: String,
        /// 1-based line reported by the engine, when known
        line: Option<usize>,
    },

    /// The comment parser and the YAML engine disagree on document shape.
    ///
    /// This is a defect in the comment parser, never a user error.
    #[error(
        "Comment parser and YAML engine disagree at '{path}': {reason}\n\
         (please report this as a bug)\n{dump}"
    )]
    Inconsistent {
        path: String,
        reason: String,
        /// Both subtrees rendered side by side
        dump: String,
    },

    /// The merged document lost or corrupted a value.
    #[error("Merged result validation failed at '{path}': {message}")]
    Validation { path: String, message: String },
}

impl Error {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::Structure {
            message: err.to_string(),
            line: Some(err.marker().line()),
        }
    }
}
