//! Error types and error code constants for annofind.
//!
//! This module provides a unified error type (`AnnofindError`) that bridges
//! domain-specific errors from the subsystems (tree construction, criterion
//! parsing, offset indexing) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad criterion, unknown node, missing file)
//! - `3`: Malformed input document (bad JSON, invalid tree, bad event stream)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! ## Design
//!
//! - **Unified type**: `AnnofindError` is the single error type for CLI output
//! - **Bridging**: `impl From<X> for AnnofindError` bridges domain errors
//! - **Code mapping**: `OutputErrorCode` provides stable integer codes for JSON

use std::fmt;
use std::io;

use thiserror::Error;

use crate::bytecode::IndexError;
use crate::criteria::CriterionError;
use crate::syntax::{NodeId, SyntaxError};

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad criterion, unknown node).
    InvalidArguments = 2,
    /// Input document could not be read as a tree, request or event stream.
    MalformedInput = 3,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum AnnofindError {
    /// Criterion description could not be turned into a criterion.
    #[error("invalid criterion: {0}")]
    InvalidCriterion(#[from] CriterionError),

    /// Candidate node is not part of the tree.
    #[error("unknown node {id}")]
    UnknownNode { id: NodeId },

    /// Input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Input document is not valid JSON of the expected shape.
    #[error("malformed {document}: {message}")]
    MalformedInput { document: String, message: String },

    /// Syntax tree violates a structural rule.
    #[error("invalid syntax tree: {0}")]
    InvalidTree(#[from] SyntaxError),

    /// Decoder event stream could not be indexed.
    #[error("invalid event stream: {0}")]
    InvalidEvents(#[from] IndexError),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&AnnofindError> for OutputErrorCode {
    fn from(err: &AnnofindError) -> Self {
        match err {
            AnnofindError::InvalidCriterion(_) => OutputErrorCode::InvalidArguments,
            AnnofindError::UnknownNode { .. } => OutputErrorCode::InvalidArguments,
            AnnofindError::FileNotFound { .. } => OutputErrorCode::InvalidArguments,
            AnnofindError::MalformedInput { .. } => OutputErrorCode::MalformedInput,
            AnnofindError::InvalidTree(_) => OutputErrorCode::MalformedInput,
            AnnofindError::InvalidEvents(_) => OutputErrorCode::MalformedInput,
            AnnofindError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<AnnofindError> for OutputErrorCode {
    fn from(err: AnnofindError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges: std and serde_json -> AnnofindError
// ============================================================================

impl From<io::Error> for AnnofindError {
    fn from(err: io::Error) -> Self {
        AnnofindError::InternalError {
            message: format!("IO error: {err}"),
        }
    }
}

impl From<serde_json::Error> for AnnofindError {
    fn from(err: serde_json::Error) -> Self {
        AnnofindError::malformed("document", err.to_string())
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl AnnofindError {
    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        AnnofindError::FileNotFound { path: path.into() }
    }

    /// Create a malformed input error for the named document.
    pub fn malformed(document: impl Into<String>, message: impl Into<String>) -> Self {
        AnnofindError::MalformedInput {
            document: document.into(),
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
