//! annofind: locate annotation insertion points.
//!
//! Given a syntax tree of one compilation unit and a description of where an
//! annotation should go (written against compiled class names, method
//! signatures and bytecode offsets), annofind reports which tree nodes the
//! description selects.

// Core infrastructure - re-exported from annofind-core
pub use annofind_core::bytecode;
pub use annofind_core::criteria;
pub use annofind_core::error;
pub use annofind_core::ordinal;
pub use annofind_core::output;
pub use annofind_core::syntax;

// Front door
pub mod cli;
pub mod request;
