//! JVM class file model, decoder and encoder
//!
//! `ClassReader` decodes class bytes and drives a `ClassVisitor`;
//! `ClassWriter` is the visitor at the end of a chain that encodes the
//! result. Method bodies are built with `MethodWriter`.

pub mod attribute;
pub mod bytes;
pub mod class;
pub mod class_writer;
pub mod code;
pub mod constpool;
pub mod defs;
pub mod descriptor;
pub mod disasm;
pub mod error;
pub mod flag;
pub mod frame;
pub mod handle;
pub mod opcodes;
pub mod reader;
pub mod verify;
pub mod visitor;
pub mod writer;

// Re-export commonly used types
pub use attribute::{Annotation, AttributeInfo, CodeAttribute};
pub use class::{ClassFile, FieldInfo, MemberInfo, MethodInfo};
pub use class_writer::ClassWriter;
pub use code::{GeneratedMethod, Label, LdcConstant, MethodWriter};
pub use constpool::{Constant, ConstantPool, MemberRef};
pub use error::{BytecodeError, ClassFormatError, ConstPoolError};
pub use handle::{BootstrapArgument, HandleKind, MethodHandle};
pub use reader::ClassReader;
pub use visitor::{ClassHeader, ClassVisitor, Member, MemberBody};
pub use writer::ClassfileWritable;
