use thiserror::Error;

use crate::classfile::error::{BytecodeError, ClassFormatError, ConstPoolError};
use crate::classfile::verify::VerifyError;

/// Result type for classpatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for class transformation and generation
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed class file: {0}")]
    ClassFormat(#[from] ClassFormatError),

    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),

    #[error("Bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),

    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("Duplicate member {name}{descriptor} in {class}")]
    DuplicateMember {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("Refused to emit {name}{descriptor} in {class}")]
    MemberRefused {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("Visitor protocol violation: {message}")]
    Protocol { message: String },
}

impl Error {
    /// Create a protocol violation error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }

    pub fn duplicate_member(class: &str, name: &str, descriptor: &str) -> Self {
        Self::DuplicateMember {
            class: class.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    pub fn member_refused(class: &str, name: &str, descriptor: &str) -> Self {
        Self::MemberRefused {
            class: class.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}
