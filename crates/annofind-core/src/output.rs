//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (field order, array ordering)
//! 3. **Versioned:** Schema version in response enables forward compatibility

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::bytecode::{InsnCategory, MethodOffsetIndex, MethodOffsets};
use crate::criteria::CriterionKind;
use crate::error::{AnnofindError, OutputErrorCode};
use crate::syntax::NodeId;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Locate
// ============================================================================

/// Nodes satisfying one criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionMatches {
    /// Human-readable description of the criterion.
    pub criterion: String,
    pub kind: CriterionKind,
    /// Matching node ids in pre-order.
    pub matches: Vec<NodeId>,
}

/// Response for the locate command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Number of candidate nodes evaluated.
    pub candidates: usize,
    /// Per-criterion results, in request order.
    pub criteria: Vec<CriterionMatches>,
    /// Nodes satisfying every criterion.
    pub all: Vec<NodeId>,
}

impl LocateResponse {
    pub fn new(candidates: usize, criteria: Vec<CriterionMatches>, all: Vec<NodeId>) -> Self {
        LocateResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            candidates,
            criteria,
            all,
        }
    }
}

// ============================================================================
// Offsets
// ============================================================================

/// A local variable entry in an offsets response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVariableInfo {
    pub name: String,
    pub slot: u16,
    pub start: u32,
    pub occurrence: usize,
}

/// Offset tables of one method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodOffsetsInfo {
    /// Method key, `name(params)`.
    pub method: String,
    /// Ascending offsets per category; empty categories are omitted.
    pub instructions: BTreeMap<InsnCategory, Vec<u32>>,
    pub locals: Vec<LocalVariableInfo>,
}

impl MethodOffsetsInfo {
    pub fn from_offsets(method: &str, offsets: &MethodOffsets) -> Self {
        let instructions = offsets
            .categories()
            .map(|category| (category, offsets.offsets(category).collect()))
            .collect();
        let locals = offsets
            .locals()
            .map(|v| LocalVariableInfo {
                name: v.name.to_string(),
                slot: v.slot,
                start: v.start,
                occurrence: v.occurrence,
            })
            .collect();
        MethodOffsetsInfo {
            method: method.to_string(),
            instructions,
            locals,
        }
    }
}

/// Response for the offsets command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetsResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Methods in key order.
    pub methods: Vec<MethodOffsetsInfo>,
}

impl OffsetsResponse {
    pub fn from_index(index: &MethodOffsetIndex) -> Self {
        OffsetsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            methods: index
                .methods()
                .map(|(key, offsets)| MethodOffsetsInfo::from_offsets(key.as_str(), offsets))
                .collect(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from an AnnofindError.
    pub fn from_error(err: &AnnofindError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();
        let details = match err {
            AnnofindError::UnknownNode { id } => Some(serde_json::json!({ "node": id })),
            AnnofindError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            AnnofindError::MalformedInput { document, .. } => {
                Some(serde_json::json!({ "document": document }))
            }
            _ => None,
        };
        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from an AnnofindError.
    pub fn from_error(err: &AnnofindError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
///
/// This is the single output path for CLI, ensuring consistency.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

// ============================================================================
// Tests
// ============================================================================
