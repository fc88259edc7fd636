//! Core engine for annofind.
//!
//! annofind decides where a type annotation belongs in a program's syntax
//! tree, given a description of the target written against compiled class
//! names and bytecode. This crate provides:
//! - Syntax tree model and root-to-leaf paths
//! - Declaration-order ranks of anonymous and local classes
//! - Location criteria (in-class, receiver, method signature)
//! - Bytecode offset index built from class decoder events
//! - Error types and error codes
//! - JSON output types for CLI responses

pub mod bytecode;
pub mod criteria;
pub mod error;
pub mod ordinal;
pub mod output;
pub mod syntax;
