//! Core classfile structures: ClassFile, FieldInfo, MethodInfo

use super::attribute::{split_annotations, Annotation, AttributeInfo, CodeAttribute};
use super::constpool::ConstantPool;
use super::defs::{attribute_names, JAVA_1_8, MAGIC};
use super::error::{ClassFormatResult, ConstPoolResult};

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    /// Zero only for `java/lang/Object`.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: JAVA_1_8,
            constant_pool: ConstantPool::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> ConstPoolResult<&str> {
        self.constant_pool.get_class_name(self.this_class)
    }

    pub fn super_name(&self) -> ConstPoolResult<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.get_class_name(self.super_class).map(Some)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.is(&self.constant_pool, name, descriptor))
    }

    /// Class-level annotations of one visibility, in attribute order.
    pub fn annotations(&self, visible: bool) -> ClassFormatResult<Vec<Annotation>> {
        collect_annotations(&self.attributes, &self.constant_pool, visible)
    }
}

impl Default for ClassFile {
    fn default() -> Self {
        Self::new()
    }
}

/// A field or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

pub type FieldInfo = MemberInfo;
pub type MethodInfo = MemberInfo;

impl MemberInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    pub fn name<'p>(&self, pool: &'p ConstantPool) -> ConstPoolResult<&'p str> {
        pool.get_utf8(self.name_index)
    }

    pub fn descriptor<'p>(&self, pool: &'p ConstantPool) -> ConstPoolResult<&'p str> {
        pool.get_utf8(self.descriptor_index)
    }

    pub fn is(&self, pool: &ConstantPool, name: &str, descriptor: &str) -> bool {
        matches!(
            (self.name(pool), self.descriptor(pool)),
            (Ok(n), Ok(d)) if n == name && d == descriptor
        )
    }

    pub fn attribute(&self, pool: &ConstantPool, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name(pool).map_or(false, |n| n == name))
    }

    /// Decoded `Code` attribute, if the member has one.
    pub fn code(&self, pool: &ConstantPool) -> Option<ClassFormatResult<CodeAttribute>> {
        self.attribute(pool, attribute_names::CODE).map(|a| CodeAttribute::parse(&a.info))
    }

    pub fn annotations(&self, pool: &ConstantPool, visible: bool) -> ClassFormatResult<Vec<Annotation>> {
        collect_annotations(&self.attributes, pool, visible)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&self.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
        bytes
    }
}

fn collect_annotations(
    attributes: &[AttributeInfo],
    pool: &ConstantPool,
    visible: bool,
) -> ClassFormatResult<Vec<Annotation>> {
    let wanted = attribute_names::annotations(visible);
    let mut annotations = Vec::new();
    for attribute in attributes {
        if attribute.name(pool)? == wanted {
            annotations.extend(split_annotations(&attribute.info, pool)?);
        }
    }
    Ok(annotations)
}
