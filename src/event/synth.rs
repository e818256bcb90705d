//! Constant boolean method synthesis

use crate::classfile::flag::access_flags::ACC_PUBLIC;
use crate::classfile::opcodes::{ICONST_1, IRETURN};
use crate::classfile::{ClassVisitor, Member};
use crate::consts::{BOOLEAN_GETTER_DESCRIPTOR, OVERRIDE_DESCRIPTOR};
use crate::{Config, Error, Result};

/// Append `public boolean name() { return true; }` annotated with `@Override`
/// to the class being visited.
///
/// Returns `Ok(false)` when `visitor` refuses the declaration and the
/// configuration is lenient.
pub fn emit_constant_true<V: ClassVisitor + ?Sized>(
    visitor: &mut V,
    owner: &str,
    name: &str,
    config: &Config,
) -> Result<bool> {
    let Some(mut writer) = visitor.define_method(ACC_PUBLIC, name, BOOLEAN_GETTER_DESCRIPTOR)? else {
        if config.strict {
            return Err(Error::member_refused(owner, name, BOOLEAN_GETTER_DESCRIPTOR));
        }
        log::warn!("Could not add {}{} to {}: declaration refused", name, BOOLEAN_GETTER_DESCRIPTOR, owner);
        return Ok(false);
    };
    writer.visit_annotation(OVERRIDE_DESCRIPTOR, true);
    writer.insn(ICONST_1)?;
    writer.insn(IRETURN)?;
    visitor.visit_method(Member::generated(writer.finish()?))?;
    log::debug!("added {}{} to {}", name, BOOLEAN_GETTER_DESCRIPTOR, owner);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::flag::access_flags::ACC_SUPER;
    use crate::classfile::{ClassHeader, ClassWriter};

    fn open_writer() -> ClassWriter {
        let mut writer = ClassWriter::new();
        writer
            .visit(&ClassHeader {
                minor_version: 0,
                major_version: 52,
                access_flags: ACC_PUBLIC | ACC_SUPER,
                name: "a/Event".to_string(),
                super_name: Some("java/lang/Object".to_string()),
                interfaces: Vec::new(),
            })
            .unwrap();
        writer
    }

    #[test]
    fn emits_annotated_method_returning_true() {
        let mut writer = open_writer();
        assert!(emit_constant_true(&mut writer, "a/Event", "isCancelable", &Config::default()).unwrap());
        writer.visit_end().unwrap();
        let class = writer.into_class_file().unwrap();
        let pool = &class.constant_pool;
        let method = class.find_method("isCancelable", "()Z").unwrap();
        assert_eq!(method.access_flags, ACC_PUBLIC);
        let code = method.code(pool).unwrap().unwrap();
        assert_eq!(code.code, vec![ICONST_1, IRETURN]);
        assert_eq!((code.max_stack, code.max_locals), (1, 1));
        let annotations = method.annotations(pool, true).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].descriptor, OVERRIDE_DESCRIPTOR);
    }

    #[test]
    fn refusal_is_lenient_unless_strict() {
        let mut writer = open_writer();
        let config = Config::default();
        assert!(emit_constant_true(&mut writer, "a/Event", "hasResult", &config).unwrap());
        assert!(!emit_constant_true(&mut writer, "a/Event", "hasResult", &config).unwrap());
        let strict = config.with_strict(true);
        assert!(matches!(
            emit_constant_true(&mut writer, "a/Event", "hasResult", &strict),
            Err(Error::MemberRefused { .. })
        ));
    }
}
