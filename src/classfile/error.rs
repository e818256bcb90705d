//! Specific error types for class file decoding and encoding

use thiserror::Error;

/// Errors that can occur during constant pool operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstPoolError {
    #[error("Constant pool is out of space")]
    OutOfSpace,
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Constant pool entry {index} is not a {expected}")]
    UnexpectedType { index: u16, expected: &'static str },
    #[error("String constant too long: {length} bytes")]
    StringTooLong { length: usize },
}

/// Errors raised while decoding class file bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassFormatError {
    #[error("Bad magic number: {0:#010x}")]
    BadMagic(u32),
    #[error("Unexpected end of class data at offset {offset} ({needed} more bytes needed)")]
    Truncated { offset: usize, needed: usize },
    #[error("Invalid constant pool tag {tag} at index {index}")]
    InvalidConstantTag { tag: u8, index: u16 },
    #[error("Invalid modified UTF-8 in constant pool entry {index}")]
    InvalidUtf8 { index: u16 },
    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),
    #[error("Invalid descriptor '{descriptor}': {reason}")]
    InvalidDescriptor { descriptor: String, reason: &'static str },
    #[error("Malformed {attribute} attribute: {reason}")]
    MalformedAttribute { attribute: &'static str, reason: String },
    #[error("Unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("{0} trailing bytes after class data")]
    TrailingBytes(usize),
}

impl ClassFormatError {
    pub fn invalid_descriptor(descriptor: &str, reason: &'static str) -> Self {
        Self::InvalidDescriptor { descriptor: descriptor.to_string(), reason }
    }

    pub fn malformed(attribute: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedAttribute { attribute, reason: reason.into() }
    }
}

/// Errors that can occur while emitting a method body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("Stack underflow at instruction {index}")]
    StackUnderflow { index: usize },
    #[error("Instruction {index} is unreachable")]
    UnreachableCode { index: usize },
    #[error("Label {0} is used but never placed")]
    UnboundLabel(usize),
    #[error("Label {0} is placed twice")]
    LabelAlreadyBound(usize),
    #[error("Inconsistent frames merging at label {label}")]
    FrameMismatch { label: usize },
    #[error("Local variable {slot} has type {found}, expected {expected}")]
    LocalTypeMismatch { slot: u16, expected: &'static str, found: String },
    #[error("Branch target too far: {offset}")]
    BranchTooFar { offset: i64 },
    #[error("Method code too large: {length} bytes")]
    CodeTooLarge { length: usize },
    #[error("Opcode {0:#04x} is not supported by the method writer")]
    UnsupportedOpcode(u8),
    #[error("Invalid method handle kind: {0}")]
    InvalidHandleKind(u8),
    #[error("Code falls off the end of the method")]
    FallsOffEnd,
    #[error("Invalid descriptor in generated code: {0}")]
    InvalidDescriptor(String),
    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),
}

/// Generic result type for constant pool operations
pub type ConstPoolResult<T> = Result<T, ConstPoolError>;

/// Generic result type for decoding operations
pub type ClassFormatResult<T> = Result<T, ClassFormatError>;

/// Generic result type for bytecode operations
pub type BytecodeResult<T> = Result<T, BytecodeError>;
