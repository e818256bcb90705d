//! Method handles and bootstrap arguments for `invokedynamic` call sites

use std::convert::TryFrom;

use super::constpool::ConstantPool;
use super::error::{BytecodeError, ConstPoolResult};

/// `reference_kind` of a `CONSTANT_MethodHandle`, JVMS 5.4.3.5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl HandleKind {
    pub fn is_field_access(self) -> bool {
        (self as u8) <= HandleKind::PutStatic as u8
    }

    pub fn is_invocation(self) -> bool {
        !self.is_field_access()
    }
}

impl TryFrom<u8> for HandleKind {
    type Error = BytecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            other => return Err(BytecodeError::InvalidHandleKind(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandle {
    pub kind: HandleKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Whether `owner` is an interface.
    pub interface: bool,
}

impl MethodHandle {
    pub fn new(kind: HandleKind, owner: &str, name: &str, descriptor: &str, interface: bool) -> Self {
        Self {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface,
        }
    }

    /// Intern the handle and the member it refers to.
    pub fn to_constant(&self, pool: &mut ConstantPool) -> ConstPoolResult<u16> {
        let reference = if self.kind.is_field_access() {
            pool.try_add_field_ref(&self.owner, &self.name, &self.descriptor)?
        } else {
            pool.try_add_method_ref(&self.owner, &self.name, &self.descriptor, self.interface)?
        };
        pool.try_add_method_handle(self.kind as u8, reference)
    }
}

/// Static argument of a bootstrap method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapArgument {
    Integer(i32),
    String(String),
    Class(String),
    MethodType(String),
    Handle(MethodHandle),
}

impl BootstrapArgument {
    pub fn to_constant(&self, pool: &mut ConstantPool) -> ConstPoolResult<u16> {
        match self {
            BootstrapArgument::Integer(value) => pool.try_add_integer(*value),
            BootstrapArgument::String(value) => pool.try_add_string(value),
            BootstrapArgument::Class(name) => pool.try_add_class(name),
            BootstrapArgument::MethodType(descriptor) => pool.try_add_method_type(descriptor),
            BootstrapArgument::Handle(handle) => handle.to_constant(pool),
        }
    }
}
