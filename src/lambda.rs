//! `invokedynamic` call sites that build functional interface instances
//! through `LambdaMetafactory.metafactory`

use std::convert::TryFrom;

use crate::classfile::error::BytecodeResult;
use crate::classfile::{BootstrapArgument, HandleKind, MethodHandle, MethodWriter};
use crate::consts::*;

fn metafactory() -> MethodHandle {
    MethodHandle::new(HandleKind::InvokeStatic, LAMBDA_METAFACTORY, METAFACTORY, METAFACTORY_DESCRIPTOR, false)
}

fn emit(
    writer: &mut MethodWriter,
    factory_descriptor: &str,
    erased_type: &str,
    target: MethodHandle,
) -> BytecodeResult<()> {
    let instantiated = target.descriptor.clone();
    writer.invoke_dynamic_insn(
        CONSUMER_METHOD,
        factory_descriptor,
        metafactory(),
        vec![
            BootstrapArgument::MethodType(erased_type.to_string()),
            BootstrapArgument::Handle(target),
            BootstrapArgument::MethodType(instantiated),
        ],
    )
}

/// A `Consumer` bound to an instance method reference. Pops the receiver
/// (of type `class_name`) and pushes the `Consumer`.
///
/// `kind` is the raw handle kind and must be one of the `H_*` values 1..=9.
pub fn consumer_instance_lambda(
    writer: &mut MethodWriter,
    kind: u8,
    class_name: &str,
    method_name: &str,
    method_descriptor: &str,
    interface: bool,
) -> BytecodeResult<()> {
    let kind = HandleKind::try_from(kind)?;
    let target = MethodHandle::new(kind, class_name, method_name, method_descriptor, interface);
    let factory = format!("(L{};)Ljava/util/function/Consumer;", class_name);
    emit(writer, &factory, OBJECT_METHOD_TYPE, target)
}

/// A `Consumer` bound to a static method. Pushes the `Consumer`.
pub fn consumer_static_lambda(
    writer: &mut MethodWriter,
    class_name: &str,
    method_name: &str,
    method_descriptor: &str,
    interface: bool,
) -> BytecodeResult<()> {
    let target = MethodHandle::new(HandleKind::InvokeStatic, class_name, method_name, method_descriptor, interface);
    emit(writer, CONSUMER_FACTORY_DESCRIPTOR, OBJECT_METHOD_TYPE, target)
}

/// A `BiConsumer` bound to a static method. Pushes the `BiConsumer`.
pub fn bi_consumer_static_lambda(
    writer: &mut MethodWriter,
    class_name: &str,
    method_name: &str,
    method_descriptor: &str,
    interface: bool,
) -> BytecodeResult<()> {
    let target = MethodHandle::new(HandleKind::InvokeStatic, class_name, method_name, method_descriptor, interface);
    emit(writer, BI_CONSUMER_FACTORY_DESCRIPTOR, DUAL_OBJECT_METHOD_TYPE, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::attribute::BootstrapMethods;
    use crate::classfile::disasm::{disassemble, Operand};
    use crate::classfile::error::BytecodeError;
    use crate::classfile::flag::access_flags::*;
    use crate::classfile::opcodes::*;
    use crate::classfile::{CodeAttribute, ConstantPool};

    #[test]
    fn instance_lambda_consumes_receiver() {
        let mut writer = MethodWriter::new("a/Holder", ACC_STATIC, "f", "(La/Sub;)V").unwrap();
        writer.var_insn(ALOAD, 0).unwrap();
        consumer_instance_lambda(&mut writer, 5, "a/Sub", "handle", "(Ljava/lang/Object;)V", false).unwrap();
        writer.insn(POP).unwrap();
        writer.insn(RETURN).unwrap();
        let method = writer.finish().unwrap();
        assert_eq!(method.max_stack(), 1);

        let mut pool = ConstantPool::new();
        let mut bootstrap = BootstrapMethods::new();
        let attributes = method.assemble(&mut pool, &mut bootstrap).unwrap();
        assert_eq!(bootstrap.len(), 1);
        assert_eq!(bootstrap.methods[0].arguments.len(), 3);
        let code = CodeAttribute::parse(&attributes[0].info).unwrap();
        let instructions = disassemble(&code.code, &pool).unwrap();
        assert_eq!(
            instructions[1].operand,
            Operand::InvokeDynamic {
                bootstrap: 0,
                name: "accept".to_string(),
                descriptor: "(La/Sub;)Ljava/util/function/Consumer;".to_string(),
            }
        );
    }

    #[test]
    fn instance_lambda_rejects_invalid_kinds() {
        let mut writer = MethodWriter::new("a/Holder", ACC_STATIC, "f", "()V").unwrap();
        for kind in [0u8, 10] {
            assert_eq!(
                consumer_instance_lambda(&mut writer, kind, "a/Sub", "handle", "()V", false),
                Err(BytecodeError::InvalidHandleKind(kind))
            );
        }
    }

    #[test]
    fn static_lambdas_share_the_bootstrap_method() {
        let mut writer = MethodWriter::new("a/Holder", ACC_STATIC, "f", "()V").unwrap();
        consumer_static_lambda(&mut writer, "a/Sub", "one", "(Ljava/lang/Object;)V", false).unwrap();
        bi_consumer_static_lambda(&mut writer, "a/Sub", "two", "(La/Sub;Ljava/lang/Object;)V", true).unwrap();
        writer.insn(POP).unwrap();
        writer.insn(POP).unwrap();
        writer.insn(RETURN).unwrap();
        let mut pool = ConstantPool::new();
        let mut bootstrap = BootstrapMethods::new();
        writer.finish().unwrap().assemble(&mut pool, &mut bootstrap).unwrap();
        assert_eq!(bootstrap.len(), 2);
        assert_eq!(bootstrap.methods[0].method_ref, bootstrap.methods[1].method_ref);
    }
}
