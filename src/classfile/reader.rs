//! Class file decoding

use super::attribute::{split_annotations, AttributeInfo};
use super::bytes::ByteReader;
use super::class::{ClassFile, MemberInfo};
use super::constpool::ConstantPool;
use super::defs::{attribute_names, MAGIC};
use super::descriptor::{check_class_name, parse_field_descriptor, MethodDescriptor};
use super::error::{ClassFormatError, ClassFormatResult};
use super::visitor::{ClassHeader, ClassVisitor, Member, MemberBody};
use crate::Result;

/// A decoded and validated class, ready to drive a `ClassVisitor`.
#[derive(Debug, Clone)]
pub struct ClassReader {
    class: ClassFile,
}

impl ClassReader {
    pub fn new(bytes: &[u8]) -> ClassFormatResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFormatError::BadMagic(magic));
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let constant_pool = ConstantPool::read(&mut reader)?;
        let access_flags = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interface_count = reader.u16()?;
        let interfaces = (0..interface_count)
            .map(|_| reader.u16())
            .collect::<ClassFormatResult<Vec<_>>>()?;
        let fields = read_members(&mut reader)?;
        let methods = read_members(&mut reader)?;
        let attributes = AttributeInfo::read_list(&mut reader)?;
        if !reader.is_empty() {
            return Err(ClassFormatError::TrailingBytes(reader.remaining()));
        }

        let class = ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        validate(&class)?;
        log::trace!(
            "decoded {} ({} fields, {} methods, {} constants)",
            class.name()?,
            class.fields.len(),
            class.methods.len(),
            class.constant_pool.count()
        );
        Ok(Self { class })
    }

    pub fn class_file(&self) -> &ClassFile {
        &self.class
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.class.constant_pool
    }

    /// Internal name of the decoded class.
    pub fn name(&self) -> &str {
        // validated in `new`
        self.class.name().unwrap_or_default()
    }

    pub fn header(&self) -> ClassFormatResult<ClassHeader> {
        let pool = &self.class.constant_pool;
        Ok(ClassHeader {
            minor_version: self.class.minor_version,
            major_version: self.class.major_version,
            access_flags: self.class.access_flags,
            name: self.class.name()?.to_string(),
            super_name: self.class.super_name()?.map(str::to_string),
            interfaces: self
                .class
                .interfaces
                .iter()
                .map(|&i| pool.get_class_name(i).map(str::to_string))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        })
    }

    /// Drive `visitor` over the class.
    pub fn accept<V: ClassVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        let pool = &self.class.constant_pool;
        visitor.visit(&self.header()?)?;
        for attribute in &self.class.attributes {
            let name = attribute.name(pool)?;
            let visible = name == attribute_names::RUNTIME_VISIBLE_ANNOTATIONS;
            if visible || name == attribute_names::RUNTIME_INVISIBLE_ANNOTATIONS {
                for annotation in split_annotations(&attribute.info, pool)? {
                    visitor.visit_annotation(annotation, visible)?;
                }
            } else {
                visitor.visit_attribute(attribute.clone())?;
            }
        }
        for field in &self.class.fields {
            visitor.visit_field(decoded_member(field, pool)?)?;
        }
        for method in &self.class.methods {
            visitor.visit_method(decoded_member(method, pool)?)?;
        }
        visitor.visit_end()
    }
}

fn read_members(reader: &mut ByteReader<'_>) -> ClassFormatResult<Vec<MemberInfo>> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut member = MemberInfo::new(reader.u16()?, reader.u16()?, reader.u16()?);
        member.attributes = AttributeInfo::read_list(reader)?;
        members.push(member);
    }
    Ok(members)
}

fn decoded_member(member: &MemberInfo, pool: &ConstantPool) -> ClassFormatResult<Member> {
    Ok(Member {
        access_flags: member.access_flags,
        name: member.name(pool)?.to_string(),
        descriptor: member.descriptor(pool)?.to_string(),
        body: MemberBody::Decoded(member.attributes.clone()),
    })
}

/// Structural checks of everything the visitor protocol hands out by name.
fn validate(class: &ClassFile) -> ClassFormatResult<()> {
    let pool = &class.constant_pool;
    check_class_name(class.name()?)?;
    if let Some(super_name) = class.super_name()? {
        check_class_name(super_name)?;
    }
    for &interface in &class.interfaces {
        check_class_name(pool.get_class_name(interface)?)?;
    }
    for field in &class.fields {
        field.name(pool)?;
        parse_field_descriptor(field.descriptor(pool)?)?;
    }
    for method in &class.methods {
        method.name(pool)?;
        MethodDescriptor::parse(method.descriptor(pool)?)?;
    }
    for attribute in class
        .attributes
        .iter()
        .chain(class.fields.iter().flat_map(|f| &f.attributes))
        .chain(class.methods.iter().flat_map(|m| &m.attributes))
    {
        attribute.name(pool)?;
    }
    Ok(())
}
