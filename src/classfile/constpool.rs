//! Constant pool and constants for Java class files
//!
//! The pool deduplicates entries on insertion, so a pool decoded from an
//! existing class keeps every original index and only grows when a generated
//! member needs a constant the class did not already contain.

use std::collections::HashMap;

use super::bytes::ByteReader;
use super::defs::MAX_CONSTANT_POOL_INDEX;
use super::error::{ClassFormatError, ClassFormatResult, ConstPoolError, ConstPoolResult};

pub mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
    pub const CONSTANT_METHODHANDLE: u8 = 15;
    pub const CONSTANT_METHODTYPE: u8 = 16;
    pub const CONSTANT_DYNAMIC: u8 = 17;
    pub const CONSTANT_INVOKEDYNAMIC: u8 = 18;
    pub const CONSTANT_MODULE: u8 = 19;
    pub const CONSTANT_PACKAGE: u8 = 20;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
    /// Second slot of a `Long` or `Double` entry; never serialized.
    Unusable,
}

impl Constant {
    fn kind(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class(_) => "Class",
            Constant::String(_) => "String",
            Constant::FieldRef(..) => "Fieldref",
            Constant::MethodRef(..) => "Methodref",
            Constant::InterfaceMethodRef(..) => "InterfaceMethodref",
            Constant::NameAndType(..) => "NameAndType",
            Constant::MethodHandle(..) => "MethodHandle",
            Constant::MethodType(_) => "MethodType",
            Constant::Dynamic(..) => "Dynamic",
            Constant::InvokeDynamic(..) => "InvokeDynamic",
            Constant::Module(_) => "Module",
            Constant::Package(_) => "Package",
            Constant::Unusable => "(unusable)",
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Hashable identity of a constant; floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

impl ConstKey {
    fn of(constant: &Constant) -> Option<Self> {
        Some(match constant {
            Constant::Utf8(v) => ConstKey::Utf8(v.clone()),
            Constant::Integer(v) => ConstKey::Integer(*v),
            Constant::Float(v) => ConstKey::Float(v.to_bits()),
            Constant::Long(v) => ConstKey::Long(*v),
            Constant::Double(v) => ConstKey::Double(v.to_bits()),
            Constant::Class(i) => ConstKey::Class(*i),
            Constant::String(i) => ConstKey::String(*i),
            Constant::FieldRef(a, b) => ConstKey::FieldRef(*a, *b),
            Constant::MethodRef(a, b) => ConstKey::MethodRef(*a, *b),
            Constant::InterfaceMethodRef(a, b) => ConstKey::InterfaceMethodRef(*a, *b),
            Constant::NameAndType(a, b) => ConstKey::NameAndType(*a, *b),
            Constant::MethodHandle(k, i) => ConstKey::MethodHandle(*k, *i),
            Constant::MethodType(i) => ConstKey::MethodType(*i),
            Constant::Dynamic(a, b) => ConstKey::Dynamic(*a, *b),
            Constant::InvokeDynamic(a, b) => ConstKey::InvokeDynamic(*a, *b),
            Constant::Module(i) => ConstKey::Module(*i),
            Constant::Package(i) => ConstKey::Package(*i),
            Constant::Unusable => return None,
        })
    }
}

/// A resolved field or method reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub interface: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
    lookup: HashMap<ConstKey, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the `constant_pool_count` item.
    pub fn count(&self) -> u16 {
        (self.constants.len() + 1) as u16
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn get(&self, index: u16) -> ConstPoolResult<&Constant> {
        if index == 0 {
            return Err(ConstPoolError::InvalidIndex(index));
        }
        match self.constants.get(index as usize - 1) {
            Some(Constant::Unusable) | None => Err(ConstPoolError::InvalidIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| ((i + 1) as u16, c))
    }

    fn push(&mut self, constant: Constant) -> ConstPoolResult<u16> {
        let width = if constant.is_wide() { 2 } else { 1 };
        if self.constants.len() + width > MAX_CONSTANT_POOL_INDEX {
            return Err(ConstPoolError::OutOfSpace);
        }
        let index = (self.constants.len() + 1) as u16;
        if let Some(key) = ConstKey::of(&constant) {
            self.lookup.entry(key).or_insert(index);
        }
        let wide = constant.is_wide();
        self.constants.push(constant);
        if wide {
            self.constants.push(Constant::Unusable);
        }
        Ok(index)
    }

    fn intern(&mut self, constant: Constant) -> ConstPoolResult<u16> {
        if let Some(key) = ConstKey::of(&constant) {
            if let Some(&index) = self.lookup.get(&key) {
                return Ok(index);
            }
        }
        self.push(constant)
    }

    pub fn try_add_utf8(&mut self, value: &str) -> ConstPoolResult<u16> {
        let length = encoded_len(value);
        if length > u16::MAX as usize {
            return Err(ConstPoolError::StringTooLong { length });
        }
        self.intern(Constant::Utf8(value.to_string()))
    }

    pub fn try_add_class(&mut self, internal_name: &str) -> ConstPoolResult<u16> {
        let name_index = self.try_add_utf8(internal_name)?;
        self.intern(Constant::Class(name_index))
    }

    pub fn try_add_string(&mut self, value: &str) -> ConstPoolResult<u16> {
        let utf8_index = self.try_add_utf8(value)?;
        self.intern(Constant::String(utf8_index))
    }

    pub fn try_add_integer(&mut self, value: i32) -> ConstPoolResult<u16> {
        self.intern(Constant::Integer(value))
    }

    pub fn try_add_name_and_type(&mut self, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let name_index = self.try_add_utf8(name)?;
        let descriptor_index = self.try_add_utf8(descriptor)?;
        self.intern(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn try_add_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let class_index = self.try_add_class(owner)?;
        let nat = self.try_add_name_and_type(name, descriptor)?;
        self.intern(Constant::FieldRef(class_index, nat))
    }

    /// Adds a `Methodref`, or an `InterfaceMethodref` when `interface` is set.
    pub fn try_add_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> ConstPoolResult<u16> {
        let class_index = self.try_add_class(owner)?;
        let nat = self.try_add_name_and_type(name, descriptor)?;
        if interface {
            self.intern(Constant::InterfaceMethodRef(class_index, nat))
        } else {
            self.intern(Constant::MethodRef(class_index, nat))
        }
    }

    pub fn try_add_method_handle(&mut self, reference_kind: u8, reference_index: u16) -> ConstPoolResult<u16> {
        self.intern(Constant::MethodHandle(reference_kind, reference_index))
    }

    pub fn try_add_method_type(&mut self, descriptor: &str) -> ConstPoolResult<u16> {
        let descriptor_index = self.try_add_utf8(descriptor)?;
        self.intern(Constant::MethodType(descriptor_index))
    }

    pub fn try_add_invoke_dynamic(
        &mut self,
        bootstrap_index: u16,
        name: &str,
        descriptor: &str,
    ) -> ConstPoolResult<u16> {
        let nat = self.try_add_name_and_type(name, descriptor)?;
        self.intern(Constant::InvokeDynamic(bootstrap_index, nat))
    }

    pub fn get_utf8(&self, index: u16) -> ConstPoolResult<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            _ => Err(ConstPoolError::UnexpectedType { index, expected: "Utf8" }),
        }
    }

    pub fn get_class_name(&self, index: u16) -> ConstPoolResult<&str> {
        match self.get(index)? {
            Constant::Class(name_index) => self.get_utf8(*name_index),
            _ => Err(ConstPoolError::UnexpectedType { index, expected: "Class" }),
        }
    }

    pub fn get_name_and_type(&self, index: u16) -> ConstPoolResult<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType(name, descriptor) => Ok((self.get_utf8(*name)?, self.get_utf8(*descriptor)?)),
            _ => Err(ConstPoolError::UnexpectedType { index, expected: "NameAndType" }),
        }
    }

    pub fn get_member_ref(&self, index: u16) -> ConstPoolResult<MemberRef> {
        let (class_index, nat_index, interface) = match self.get(index)? {
            Constant::FieldRef(c, n) | Constant::MethodRef(c, n) => (*c, *n, false),
            Constant::InterfaceMethodRef(c, n) => (*c, *n, true),
            _ => return Err(ConstPoolError::UnexpectedType { index, expected: "member reference" }),
        };
        let (name, descriptor) = self.get_name_and_type(nat_index)?;
        Ok(MemberRef {
            owner: self.get_class_name(class_index)?.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface,
        })
    }

    /// Decode the pool, starting at `constant_pool_count`.
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> ClassFormatResult<Self> {
        use constant_tags::*;

        let count = reader.u16()?;
        let mut pool = ConstantPool::new();
        let mut index: u16 = 1;
        while index < count {
            let tag = reader.u8()?;
            let constant = match tag {
                CONSTANT_UTF8 => {
                    let len = reader.u16()? as usize;
                    let raw = reader.bytes(len)?;
                    let value = decode_modified_utf8(raw).ok_or(ClassFormatError::InvalidUtf8 { index })?;
                    Constant::Utf8(value)
                }
                CONSTANT_INTEGER => Constant::Integer(reader.i32()?),
                CONSTANT_FLOAT => Constant::Float(f32::from_bits(reader.u32()?)),
                CONSTANT_LONG => Constant::Long(reader.i64()?),
                CONSTANT_DOUBLE => Constant::Double(f64::from_bits(reader.i64()? as u64)),
                CONSTANT_CLASS => Constant::Class(reader.u16()?),
                CONSTANT_STRING => Constant::String(reader.u16()?),
                CONSTANT_FIELDREF => Constant::FieldRef(reader.u16()?, reader.u16()?),
                CONSTANT_METHODREF => Constant::MethodRef(reader.u16()?, reader.u16()?),
                CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(reader.u16()?, reader.u16()?),
                CONSTANT_NAMEANDTYPE => Constant::NameAndType(reader.u16()?, reader.u16()?),
                CONSTANT_METHODHANDLE => Constant::MethodHandle(reader.u8()?, reader.u16()?),
                CONSTANT_METHODTYPE => Constant::MethodType(reader.u16()?),
                CONSTANT_DYNAMIC => Constant::Dynamic(reader.u16()?, reader.u16()?),
                CONSTANT_INVOKEDYNAMIC => Constant::InvokeDynamic(reader.u16()?, reader.u16()?),
                CONSTANT_MODULE => Constant::Module(reader.u16()?),
                CONSTANT_PACKAGE => Constant::Package(reader.u16()?),
                _ => return Err(ClassFormatError::InvalidConstantTag { tag, index }),
            };
            if constant.is_wide() && index + 1 >= count {
                return Err(ClassFormatError::ConstPool(ConstPoolError::InvalidIndex(index + 1)));
            }
            index += if constant.is_wide() { 2 } else { 1 };
            pool.push(constant)?;
        }
        pool.check_references()?;
        Ok(pool)
    }

    /// Every index stored inside an entry must point at an entry of the right kind.
    fn check_references(&self) -> ConstPoolResult<()> {
        for (index, constant) in self.iter() {
            let expect = |target: u16, expected: &'static str, ok: fn(&Constant) -> bool| -> ConstPoolResult<()> {
                let entry = self.get(target)?;
                if ok(entry) {
                    Ok(())
                } else {
                    log::debug!("constant {} ({}) points at {} ({})", index, constant.kind(), target, entry.kind());
                    Err(ConstPoolError::UnexpectedType { index: target, expected })
                }
            };
            let is_utf8 = |c: &Constant| matches!(c, Constant::Utf8(_));
            match constant {
                Constant::Class(i) | Constant::String(i) | Constant::MethodType(i) | Constant::Module(i) | Constant::Package(i) => {
                    expect(*i, "Utf8", is_utf8)?
                }
                Constant::FieldRef(c, n) | Constant::MethodRef(c, n) | Constant::InterfaceMethodRef(c, n) => {
                    expect(*c, "Class", |c| matches!(c, Constant::Class(_)))?;
                    expect(*n, "NameAndType", |c| matches!(c, Constant::NameAndType(..)))?;
                }
                Constant::NameAndType(n, d) => {
                    expect(*n, "Utf8", is_utf8)?;
                    expect(*d, "Utf8", is_utf8)?;
                }
                Constant::MethodHandle(_, r) => expect(*r, "member reference", |c| {
                    matches!(c, Constant::FieldRef(..) | Constant::MethodRef(..) | Constant::InterfaceMethodRef(..))
                })?,
                Constant::Dynamic(_, n) | Constant::InvokeDynamic(_, n) => {
                    expect(*n, "NameAndType", |c| matches!(c, Constant::NameAndType(..)))?
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Decode the JVM's modified UTF-8 (null as two bytes, supplementary
/// characters as surrogate pairs).
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i] as u16;
        if b & 0x80 == 0 {
            if b == 0 {
                return None;
            }
            units.push(b);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1)? as u16;
            if b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b & 0x1F) << 6) | (b2 & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1)? as u16;
            let b3 = *bytes.get(i + 2)? as u16;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b & 0x0F) << 12) | ((b2 & 0x3F) << 6) | (b3 & 0x3F));
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn encoded_len(value: &str) -> usize {
    value
        .encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            _ => 3,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_existing_indices() {
        let mut pool = ConstantPool::new();
        let a = pool.try_add_class("a/B").unwrap();
        let b = pool.try_add_class("a/B").unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.count(), 3);
        let m = pool.try_add_method_ref("a/B", "run", "()V", false).unwrap();
        let im = pool.try_add_method_ref("a/B", "run", "()V", true).unwrap();
        assert_ne!(m, im);
        assert!(pool.get_member_ref(im).unwrap().interface);
    }

    #[test]
    fn modified_utf8_handles_null_and_supplementary_characters() {
        let text = "a\u{0}\u{1F600}é";
        let encoded = encode_modified_utf8(text);
        assert_eq!(&encoded[1..3], &[0xC0, 0x80]);
        assert_eq!(encoded.len(), encoded_len(text));
        assert_eq!(decode_modified_utf8(&encoded).as_deref(), Some(text));
        assert_eq!(decode_modified_utf8(&[0x00]), None);
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        pool.push(Constant::Long(7)).unwrap();
        let next = pool.try_add_utf8("x").unwrap();
        assert_eq!(next, 3);
        assert_eq!(pool.get(2), Err(ConstPoolError::InvalidIndex(2)));
    }
}
