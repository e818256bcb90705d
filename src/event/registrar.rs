//! Registrar method bodies
//!
//! A registrar hands a subscriber class's handler registration methods to
//! the `EventRegistrarRegistry` and, when the class carries
//! `@EventBusSubscriber`, registers the class itself on the selected bus.

use crate::classfile::opcodes::*;
use crate::classfile::{LdcConstant, MethodWriter};
use crate::consts::*;
use crate::lambda::{bi_consumer_static_lambda, consumer_static_lambda};
use crate::model::{Bus, SubscriberAnnotation, SubscriberMetadata};
use crate::Result;

/// Emit the complete body of a static `()V` registrar method into `writer`.
pub fn generate(
    writer: &mut MethodWriter,
    annotation: Option<&SubscriberAnnotation>,
    metadata: &SubscriberMetadata,
) -> Result<()> {
    let class_name = metadata.class_name.as_str();

    writer.field_insn(GETSTATIC, EVENT_REGISTRAR_REGISTRY, REGISTRY_INSTANCE_FIELD, EVENT_REGISTRAR_REGISTRY_DESCRIPTOR)?;
    writer.var_insn(ASTORE, REGISTRY_SLOT)?;
    let registry_start = writer.new_label();
    writer.visit_label(registry_start)?;

    emit_client_check(writer)?;
    let is_client_start = writer.new_label();
    writer.visit_label(is_client_start)?;

    if metadata.instance_subscribers {
        writer.var_insn(ALOAD, REGISTRY_SLOT)?;
        writer.ldc_insn(LdcConstant::Type(class_name.to_string()))?;
        bi_consumer_static_lambda(
            writer,
            class_name,
            REGISTER_INSTANCE_HANDLERS,
            &register_instance_handlers_descriptor(class_name),
            metadata.interface,
        )?;
        writer.method_insn(INVOKEINTERFACE, EVENT_REGISTRAR_REGISTRY, REGISTER_INSTANCE, REGISTER_INSTANCE_DESCRIPTOR, true)?;
    }

    if metadata.static_subscribers {
        writer.var_insn(ALOAD, REGISTRY_SLOT)?;
        writer.ldc_insn(LdcConstant::Type(class_name.to_string()))?;
        consumer_static_lambda(
            writer,
            class_name,
            REGISTER_STATIC_HANDLERS,
            REGISTER_STATIC_HANDLERS_DESCRIPTOR,
            metadata.interface,
        )?;
        writer.method_insn(INVOKEINTERFACE, EVENT_REGISTRAR_REGISTRY, REGISTER_STATIC, REGISTER_STATIC_DESCRIPTOR, true)?;
    }

    if let Some(annotation) = annotation {
        emit_bus_registration(writer, annotation, class_name)?;
    }

    writer.insn(RETURN)?;
    writer.local_variable(REGISTRY_LOCAL_NAME, EVENT_REGISTRAR_REGISTRY_DESCRIPTOR, REGISTRY_SLOT, registry_start)?;
    writer.local_variable(IS_CLIENT_LOCAL_NAME, "Z", IS_CLIENT_SLOT, is_client_start)?;
    Ok(())
}

/// `isClient = FabricLoader.getInstance().getEnvironmentType() == EnvType.CLIENT`
fn emit_client_check(writer: &mut MethodWriter) -> Result<()> {
    writer.method_insn(
        INVOKESTATIC,
        FABRIC_LOADER,
        FABRIC_LOADER_GET_INSTANCE,
        FABRIC_LOADER_GET_INSTANCE_DESCRIPTOR,
        true,
    )?;
    writer.method_insn(INVOKEINTERFACE, FABRIC_LOADER, GET_ENVIRONMENT_TYPE, GET_ENVIRONMENT_TYPE_DESCRIPTOR, true)?;
    writer.field_insn(GETSTATIC, ENV_TYPE, ENV_TYPE_CLIENT, ENV_TYPE_DESCRIPTOR)?;

    let not_client = writer.new_label();
    let end = writer.new_label();
    writer.jump_insn(IF_ACMPNE, not_client)?;
    writer.insn(ICONST_1)?;
    writer.jump_insn(GOTO, end)?;
    writer.visit_label(not_client)?;
    writer.insn(ICONST_0)?;
    writer.visit_label(end)?;
    writer.var_insn(ISTORE, IS_CLIENT_SLOT)?;
    Ok(())
}

fn emit_bus_registration(writer: &mut MethodWriter, annotation: &SubscriberAnnotation, class_name: &str) -> Result<()> {
    if annotation.is_sided() {
        log::warn!(
            "Sided @EventBusSubscriber annotations are still in progress, applying {} from {} : {}",
            annotation,
            class_name,
            annotation.target_mod_id.as_deref().unwrap_or("<none>")
        );
    }

    let skip = match (annotation.client, annotation.server) {
        (true, false) => {
            let skip = writer.new_label();
            writer.var_insn(ILOAD, IS_CLIENT_SLOT)?;
            writer.jump_insn(IFEQ, skip)?;
            Some(skip)
        }
        (false, true) => {
            let skip = writer.new_label();
            writer.var_insn(ILOAD, IS_CLIENT_SLOT)?;
            writer.jump_insn(IFNE, skip)?;
            Some(skip)
        }
        _ => None,
    };

    match annotation.bus {
        Bus::Mod => {
            writer.method_insn(
                INVOKESTATIC,
                MOD_LOADING_CONTEXT,
                MOD_LOADING_CONTEXT_GET,
                MOD_LOADING_CONTEXT_GET_DESCRIPTOR,
                false,
            )?;
            writer.method_insn(INVOKEVIRTUAL, MOD_LOADING_CONTEXT, GET_MOD_EVENT_BUS, GET_MOD_EVENT_BUS_DESCRIPTOR, false)?;
        }
        Bus::Forge => {
            writer.field_insn(GETSTATIC, MINECRAFT_FORGE, FORGE_EVENT_BUS_FIELD, I_EVENT_BUS_DESCRIPTOR)?;
        }
    }
    writer.ldc_insn(LdcConstant::Type(class_name.to_string()))?;
    writer.method_insn(INVOKEINTERFACE, I_EVENT_BUS, EVENT_BUS_REGISTER, EVENT_BUS_REGISTER_DESCRIPTOR, true)?;

    if let Some(skip) = skip {
        writer.visit_label(skip)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::flag::access_flags::*;

    fn writer() -> MethodWriter {
        MethodWriter::new("a/Registrars", ACC_PUBLIC | ACC_STATIC | ACC_SYNTHETIC, "register", "()V").unwrap()
    }

    #[test]
    fn bookkeeping_is_fixed() {
        let metadata = SubscriberMetadata::new("a/Handler").with_instance_subscribers().with_static_subscribers();
        let annotation = SubscriberAnnotation::new(Bus::Mod).client_only();
        let mut writer = writer();
        generate(&mut writer, Some(&annotation), &metadata).unwrap();
        let method = writer.finish().unwrap();
        assert_eq!(method.max_stack(), 3);
        assert_eq!(method.max_locals(), 3);
    }

    #[test]
    fn body_without_subscribers_still_computes_the_side() {
        let mut writer = writer();
        generate(&mut writer, None, &SubscriberMetadata::new("a/Handler")).unwrap();
        let method = writer.finish().unwrap();
        assert_eq!(method.max_stack(), 2);
        assert_eq!(method.max_locals(), 3);
    }
}
