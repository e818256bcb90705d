//! Structural checks over a finished ClassFile
//!
//! These catch encoder mistakes before bytes leave the crate. They do not
//! verify bytecode.

use std::collections::HashSet;

use super::attribute::split_annotations;
use super::class::{ClassFile, MemberInfo};
use super::constpool::Constant;
use super::defs::attribute_names;
use super::error::{ClassFormatError, ConstPoolError};
use super::flag::{access_flags, requires_code};

pub type VerifyResult<T> = Result<T, VerifyError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Constant pool index {index} is not a Class constant")]
    NotAClass { index: u16 },
    #[error("Duplicate {kind} {name}{descriptor}")]
    DuplicateMember { kind: &'static str, name: String, descriptor: String },
    #[error("Method {name}{descriptor} has {count} Code attributes")]
    CodeAttributeCount { name: String, descriptor: String, count: usize },
    #[error("Annotation type index {index} is not a Utf8 constant")]
    AnnotationType { index: u16 },
    #[error("Internal verifier error: {0}")]
    Internal(String),
}

/// Verify the ClassFile by running all structural checks
pub fn verify(class_file: &ClassFile) -> VerifyResult<()> {
    verify_class_index(class_file, class_file.this_class)?;
    let is_interface = class_file.access_flags & access_flags::ACC_INTERFACE != 0;
    if is_interface || class_file.super_class != 0 {
        verify_class_index(class_file, class_file.super_class)?;
    }
    for &interface in &class_file.interfaces {
        verify_class_index(class_file, interface)?;
    }
    verify_unique(class_file, &class_file.fields, "field")?;
    verify_unique(class_file, &class_file.methods, "method")?;
    for method in &class_file.methods {
        verify_code(class_file, method)?;
    }
    let member_attributes = class_file
        .fields
        .iter()
        .chain(&class_file.methods)
        .flat_map(|m| &m.attributes);
    for attribute in class_file.attributes.iter().chain(member_attributes) {
        let name = class_file.constant_pool.get_utf8(attribute.name_index).map_err(internal)?;
        if name == attribute_names::RUNTIME_VISIBLE_ANNOTATIONS || name == attribute_names::RUNTIME_INVISIBLE_ANNOTATIONS {
            verify_annotation_types(class_file, &attribute.info)?;
        }
    }
    Ok(())
}

fn internal(error: impl std::fmt::Display) -> VerifyError {
    VerifyError::Internal(error.to_string())
}

fn verify_class_index(class_file: &ClassFile, index: u16) -> VerifyResult<()> {
    match class_file.constant_pool.get(index) {
        Ok(Constant::Class(_)) => Ok(()),
        _ => Err(VerifyError::NotAClass { index }),
    }
}

fn verify_unique(class_file: &ClassFile, members: &[MemberInfo], kind: &'static str) -> VerifyResult<()> {
    let pool = &class_file.constant_pool;
    let mut seen = HashSet::new();
    for member in members {
        let name = member.name(pool).map_err(internal)?;
        let descriptor = member.descriptor(pool).map_err(internal)?;
        if !seen.insert((name, descriptor)) {
            return Err(VerifyError::DuplicateMember {
                kind,
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            });
        }
    }
    Ok(())
}

fn verify_code(class_file: &ClassFile, method: &MemberInfo) -> VerifyResult<()> {
    let pool = &class_file.constant_pool;
    let count = method
        .attributes
        .iter()
        .filter(|a| a.name(pool).map_or(false, |n| n == attribute_names::CODE))
        .count();
    let expected = usize::from(requires_code(method.access_flags));
    if count != expected {
        return Err(VerifyError::CodeAttributeCount {
            name: method.name(pool).map_err(internal)?.to_string(),
            descriptor: method.descriptor(pool).map_err(internal)?.to_string(),
            count,
        });
    }
    Ok(())
}

/// Only the type index of each top-level annotation is checked.
fn verify_annotation_types(class_file: &ClassFile, info: &[u8]) -> VerifyResult<()> {
    split_annotations(info, &class_file.constant_pool)
        .map(|_| ())
        .map_err(|e| match e {
            ClassFormatError::ConstPool(ConstPoolError::UnexpectedType { index, .. })
            | ClassFormatError::ConstPool(ConstPoolError::InvalidIndex(index)) => VerifyError::AnnotationType { index },
            other => internal(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::attribute::AttributeInfo;

    fn class_with_method(flags: u16) -> ClassFile {
        let mut class = ClassFile::new();
        class.this_class = class.constant_pool.try_add_class("a/B").unwrap();
        class.super_class = class.constant_pool.try_add_class("java/lang/Object").unwrap();
        let name = class.constant_pool.try_add_utf8("run").unwrap();
        let descriptor = class.constant_pool.try_add_utf8("()V").unwrap();
        class.methods.push(MemberInfo::new(flags, name, descriptor));
        class
    }

    #[test]
    fn abstract_methods_need_no_code() {
        let class = class_with_method(access_flags::ACC_PUBLIC | access_flags::ACC_ABSTRACT);
        assert_eq!(verify(&class), Ok(()));
    }

    #[test]
    fn concrete_methods_need_code() {
        let mut class = class_with_method(access_flags::ACC_PUBLIC);
        assert!(matches!(verify(&class), Err(VerifyError::CodeAttributeCount { count: 0, .. })));
        let code = AttributeInfo::named(&mut class.constant_pool, "Code", vec![0; 12]).unwrap();
        class.methods[0].attributes.push(code);
        assert_eq!(verify(&class), Ok(()));
    }

    #[test]
    fn duplicate_methods_are_rejected() {
        let mut class = class_with_method(access_flags::ACC_ABSTRACT);
        let copy = class.methods[0].clone();
        class.methods.push(copy);
        assert!(matches!(verify(&class), Err(VerifyError::DuplicateMember { kind: "method", .. })));
    }
}
