//! Push-based visitor protocol over a class's structure
//!
//! `ClassReader::accept` drives a visitor in a fixed order: `visit`, then
//! class annotations and other class attributes in file order, then fields,
//! then methods, then `visit_end`. Visitors that only care about a few
//! callbacks forward everything else to the next visitor in the chain.

use super::attribute::{Annotation, AttributeInfo};
use super::code::{GeneratedMethod, MethodWriter};
use crate::Result;

/// The class declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal name, e.g. `net/example/ExampleEvent`.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum MemberBody {
    /// Attributes as decoded; their constant pool indices refer to the pool
    /// of the class they were read from.
    Decoded(Vec<AttributeInfo>),
    /// A body built with a `MethodWriter`, laid out by the receiving writer.
    Generated(GeneratedMethod),
}

/// A field or method declaration travelling through a visitor chain.
#[derive(Debug, Clone)]
pub struct Member {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub body: MemberBody,
}

impl Member {
    pub fn generated(method: GeneratedMethod) -> Self {
        Self {
            access_flags: method.access_flags(),
            name: method.name().to_string(),
            descriptor: method.descriptor().to_string(),
            body: MemberBody::Generated(method),
        }
    }

    pub fn is(&self, name: &str, descriptor: &str) -> bool {
        self.name == name && self.descriptor == descriptor
    }
}

pub trait ClassVisitor {
    fn visit(&mut self, header: &ClassHeader) -> Result<()>;

    /// One class-level annotation.
    fn visit_annotation(&mut self, annotation: Annotation, visible: bool) -> Result<()>;

    /// Any class-level attribute other than annotations.
    fn visit_attribute(&mut self, attribute: AttributeInfo) -> Result<()>;

    fn visit_field(&mut self, field: Member) -> Result<()>;

    fn visit_method(&mut self, method: Member) -> Result<()>;

    /// Start a new method. `Ok(None)` means the declaration is refused: the
    /// class has ended or already declares `name` + `descriptor`. A returned
    /// writer is handed back through `visit_method` once finished.
    fn define_method(&mut self, access_flags: u16, name: &str, descriptor: &str) -> Result<Option<MethodWriter>>;

    fn visit_end(&mut self) -> Result<()>;
}
