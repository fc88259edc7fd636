//! JVM opcodes observed by the offset scan.
//!
//! Values follow the Java Virtual Machine Specification, chapter 6. Only the
//! instructions that carry an insertion-relevant operand are listed.

pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;
pub const NEW: u8 = 0xbb;
pub const NEWARRAY: u8 = 0xbc;
pub const ANEWARRAY: u8 = 0xbd;
pub const CHECKCAST: u8 = 0xc0;
pub const INSTANCEOF: u8 = 0xc1;
pub const MULTIANEWARRAY: u8 = 0xc5;

/// Mnemonic of a listed opcode, for log output.
pub fn mnemonic(opcode: u8) -> &'static str {
    match opcode {
        INVOKEVIRTUAL => "INVOKEVIRTUAL",
        INVOKESPECIAL => "INVOKESPECIAL",
        INVOKESTATIC => "INVOKESTATIC",
        INVOKEINTERFACE => "INVOKEINTERFACE",
        INVOKEDYNAMIC => "INVOKEDYNAMIC",
        NEW => "NEW",
        NEWARRAY => "NEWARRAY",
        ANEWARRAY => "ANEWARRAY",
        CHECKCAST => "CHECKCAST",
        INSTANCEOF => "INSTANCEOF",
        MULTIANEWARRAY => "MULTIANEWARRAY",
        _ => "UNKNOWN",
    }
}
