// Common test utilities

#![allow(dead_code)]

use classpatch::classfile::disasm::{disassemble, Instruction};
use classpatch::classfile::flag::access_flags::*;
use classpatch::classfile::opcodes::*;
use classpatch::classfile::visitor::MemberBody;
use classpatch::classfile::{Annotation, ClassHeader, ClassReader, ClassVisitor, ClassWriter, ClassfileWritable, Member};

pub const EVENT_SUPER: &str = "net/minecraftforge/eventbus/api/Event";

/// Enable log output for a test run; repeated calls are harmless
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build an event class: a constructor, one `int` field, the given class
/// annotations (runtime visible), then one method per `(name, descriptor)`.
///
/// Method bodies depend on the return type: `()Z` returns `false`, reference
/// returns yield `null`, `()V` returns.
pub fn event_class(name: &str, annotations: &[&str], methods: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ClassWriter::new();
    writer
        .visit(&ClassHeader {
            minor_version: 0,
            major_version: 52,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            name: name.to_string(),
            super_name: Some(EVENT_SUPER.to_string()),
            interfaces: Vec::new(),
        })
        .unwrap();
    for descriptor in annotations {
        writer.visit_annotation(Annotation::marker(descriptor), true).unwrap();
    }
    writer
        .visit_field(Member {
            access_flags: ACC_PRIVATE,
            name: "counter".to_string(),
            descriptor: "I".to_string(),
            body: MemberBody::Decoded(Vec::new()),
        })
        .unwrap();

    let mut init = writer.define_method(ACC_PUBLIC, "<init>", "()V").unwrap().unwrap();
    init.var_insn(ALOAD, 0).unwrap();
    init.method_insn(INVOKESPECIAL, EVENT_SUPER, "<init>", "()V", false).unwrap();
    init.insn(RETURN).unwrap();
    writer.visit_method(Member::generated(init.finish().unwrap())).unwrap();

    for (method_name, descriptor) in methods {
        let mut method = writer.define_method(ACC_PUBLIC, method_name, descriptor).unwrap().unwrap();
        if descriptor.ends_with(")Z") {
            method.insn(ICONST_0).unwrap();
            method.insn(IRETURN).unwrap();
        } else if descriptor.ends_with(")V") {
            method.insn(RETURN).unwrap();
        } else {
            method.insn(ACONST_NULL).unwrap();
            method.insn(ARETURN).unwrap();
        }
        writer.visit_method(Member::generated(method.finish().unwrap())).unwrap();
    }
    writer.visit_end().unwrap();
    writer.into_class_file().unwrap().to_classfile_bytes()
}

pub fn method_names(bytes: &[u8]) -> Vec<String> {
    let reader = ClassReader::new(bytes).unwrap();
    let class = reader.class_file();
    class
        .methods
        .iter()
        .map(|m| format!("{}{}", m.name(&class.constant_pool).unwrap(), m.descriptor(&class.constant_pool).unwrap()))
        .collect()
}

pub fn class_annotations(bytes: &[u8], visible: bool) -> Vec<String> {
    let reader = ClassReader::new(bytes).unwrap();
    reader.class_file().annotations(visible).unwrap().into_iter().map(|a| a.descriptor).collect()
}

pub fn method_annotations(bytes: &[u8], name: &str, descriptor: &str, visible: bool) -> Vec<String> {
    let reader = ClassReader::new(bytes).unwrap();
    let class = reader.class_file();
    let method = class.find_method(name, descriptor).unwrap();
    method
        .annotations(&class.constant_pool, visible)
        .unwrap()
        .into_iter()
        .map(|a| a.descriptor)
        .collect()
}

pub fn method_code(bytes: &[u8], name: &str, descriptor: &str) -> Vec<u8> {
    let reader = ClassReader::new(bytes).unwrap();
    let class = reader.class_file();
    let method = class.find_method(name, descriptor).unwrap();
    method.code(&class.constant_pool).unwrap().unwrap().code
}

pub fn disassemble_method(bytes: &[u8], name: &str, descriptor: &str) -> Vec<Instruction> {
    let reader = ClassReader::new(bytes).unwrap();
    let class = reader.class_file();
    let method = class.find_method(name, descriptor).unwrap();
    let code = method.code(&class.constant_pool).unwrap().unwrap();
    disassemble(&code.code, &class.constant_pool).unwrap()
}

/// `owner.name` of every member-referencing instruction, in order
pub fn invoked_members(instructions: &[Instruction]) -> Vec<String> {
    instructions
        .iter()
        .filter_map(|i| i.member())
        .map(|m| format!("{}.{}", m.owner, m.name))
        .collect()
}
