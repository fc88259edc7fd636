//! Bytecode offset index.
//!
//! Relates source-level constructs (casts, object creation, `instanceof`,
//! method calls, lambdas, local variables) to the bytecode offsets of their
//! compiled instructions, so an annotation written against "the second cast
//! in `foo(I)`" can find the matching instruction.
//!
//! The index is built in one sequential pass per class over the decoder's
//! callbacks:
//!
//! ```text
//! ClassEvent* --OffsetScan--> ScanRecord* --MethodOffsetIndex::from_records--> MethodOffsetIndex
//!               (owns the last-label offset)      (stateless fold)
//! ```
//!
//! Only [`OffsetScan`] carries state; every record it yields already holds
//! its final offset. Once built, the index is immutable and may be shared
//! across threads.

mod index;
pub mod opcodes;
mod scan;

pub use index::{LocalVariable, MethodOffsetIndex, MethodOffsets};
pub use scan::{OffsetScan, ScanRecord};

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while scanning a class's instruction stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Method descriptor has no closing parenthesis.
    #[error("malformed descriptor for method '{name}': {descriptor}")]
    MalformedDescriptor { name: String, descriptor: String },

    /// An instruction or variable event arrived before any method event.
    #[error("{event} event outside of any method")]
    EventOutsideMethod { event: &'static str },

    /// An instruction event carries an opcode its kind never has.
    #[error("unexpected opcode {opcode:#04x} for {event} event in {method}")]
    UnexpectedOpcode {
        event: &'static str,
        opcode: u8,
        method: MethodKey,
    },

    /// The operand offset of a type check lies past the largest representable offset.
    #[error("operand offset after label {offset} overflows in {method}")]
    OffsetOverflow { offset: u32, method: MethodKey },
}

/// Result type for offset index operations.
pub type IndexResult<T> = Result<T, IndexError>;

// ============================================================================
// Method Identity
// ============================================================================

/// Method name followed by its parameter descriptors, e.g. `foo(ILjava/lang/String;)`.
///
/// The return type is left out: two methods of one class never differ in
/// it alone at the source level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodKey(String);

impl MethodKey {
    /// Build the key from a method name and its full descriptor.
    pub fn from_descriptor(name: &str, descriptor: &str) -> IndexResult<Self> {
        let close = descriptor
            .find(')')
            .ok_or_else(|| IndexError::MalformedDescriptor {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })?;
        Ok(MethodKey(format!("{name}{}", &descriptor[..=close])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MethodKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Categories and Events
// ============================================================================

/// Source construct an indexed instruction stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsnCategory {
    /// `CHECKCAST`.
    Cast,
    /// Object or array creation.
    New,
    /// `INSTANCEOF`.
    InstanceOf,
    /// Interface, static or virtual call. Constructor and `super` calls are
    /// not indexed.
    MethodCall,
    /// Invoke-dynamic site (lambda or method reference).
    Lambda,
}

impl InsnCategory {
    pub const ALL: [InsnCategory; 5] = [
        InsnCategory::Cast,
        InsnCategory::New,
        InsnCategory::InstanceOf,
        InsnCategory::MethodCall,
        InsnCategory::Lambda,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsnCategory::Cast => "cast",
            InsnCategory::New => "new",
            InsnCategory::InstanceOf => "instance_of",
            InsnCategory::MethodCall => "method_call",
            InsnCategory::Lambda => "lambda",
        }
    }
}

impl fmt::Display for InsnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One callback of a class-file decoder, in visiting order.
///
/// Offsets are byte offsets into the method's code array as resolved by the
/// decoder for labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClassEvent {
    /// Start of a method body.
    Method { name: String, descriptor: String },
    /// A label was placed at `offset`.
    Label { offset: u32 },
    /// `NEW`, `ANEWARRAY`, `CHECKCAST` or `INSTANCEOF`.
    TypeInsn { opcode: u8, type_name: String },
    /// `BIPUSH`, `SIPUSH` or `NEWARRAY`.
    IntInsn { opcode: u8, operand: i32 },
    #[serde(rename = "multi_anew_array")]
    MultiANewArray { descriptor: String, dimensions: u8 },
    /// `INVOKEVIRTUAL`, `INVOKESPECIAL`, `INVOKESTATIC` or `INVOKEINTERFACE`.
    MethodInsn {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeDynamic { name: String, descriptor: String },
    /// Local variable table entry; `start` is the offset of its start label.
    LocalVariable {
        name: String,
        descriptor: String,
        slot: u16,
        start: u32,
    },
    /// Any instruction without an indexed operand.
    Insn { opcode: u8 },
}

impl ClassEvent {
    /// Event name as it appears in serialized dumps.
    pub fn name(&self) -> &'static str {
        match self {
            ClassEvent::Method { .. } => "method",
            ClassEvent::Label { .. } => "label",
            ClassEvent::TypeInsn { .. } => "type_insn",
            ClassEvent::IntInsn { .. } => "int_insn",
            ClassEvent::MultiANewArray { .. } => "multi_anew_array",
            ClassEvent::MethodInsn { .. } => "method_insn",
            ClassEvent::InvokeDynamic { .. } => "invoke_dynamic",
            ClassEvent::LocalVariable { .. } => "local_variable",
            ClassEvent::Insn { .. } => "insn",
        }
    }
}
