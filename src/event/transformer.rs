//! Event class rewriting
//!
//! `EventSubclassTransformer` sits in a visitor chain in front of a writer.
//! It drops the legacy listener list accessors, consumes the `@Cancelable`
//! and `@Event.HasResult` markers, and at the end of the class synthesizes
//! `isCancelable()` / `hasResult()` for every marker that has no explicit
//! method.

use super::synth::emit_constant_true;
use crate::classfile::{Annotation, AttributeInfo, ClassHeader, ClassVisitor, Member, MethodWriter};
use crate::consts::*;
use crate::model::{AnnotationMarker, MethodSignature};
use crate::{Config, Error, Result};

/// A boolean capability an event class can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Cancelable,
    HasResult,
}

impl Capability {
    /// Synthesis order.
    pub const ALL: [Capability; 2] = [Capability::Cancelable, Capability::HasResult];

    /// Name of the `()Z` method reporting the capability.
    pub fn method_name(self) -> &'static str {
        match self {
            Capability::Cancelable => IS_CANCELABLE,
            Capability::HasResult => HAS_RESULT,
        }
    }
}

/// What happens to a method with a given name and descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodAction {
    /// Removed from the output.
    Strip,
    /// Forwarded; records an explicit implementation of the capability.
    Track(Capability),
    PassThrough,
}

pub const METHOD_TABLE: &[(MethodSignature<'static>, MethodAction)] = &[
    (MethodSignature::new(GET_LISTENER_LIST, LISTENER_LIST_ACCESSOR_DESCRIPTOR), MethodAction::Strip),
    (MethodSignature::new(GET_PARENT_LISTENER_LIST, LISTENER_LIST_ACCESSOR_DESCRIPTOR), MethodAction::Strip),
    (MethodSignature::new(IS_CANCELABLE, BOOLEAN_GETTER_DESCRIPTOR), MethodAction::Track(Capability::Cancelable)),
    (MethodSignature::new(HAS_RESULT, BOOLEAN_GETTER_DESCRIPTOR), MethodAction::Track(Capability::HasResult)),
];

pub const MARKER_TABLE: &[(AnnotationMarker, Capability)] = &[
    (AnnotationMarker(CANCELABLE_DESCRIPTOR), Capability::Cancelable),
    (AnnotationMarker(HAS_RESULT_DESCRIPTOR), Capability::HasResult),
];

pub fn method_action(name: &str, descriptor: &str) -> MethodAction {
    METHOD_TABLE
        .iter()
        .find(|(signature, _)| signature.matches(name, descriptor))
        .map_or(MethodAction::PassThrough, |(_, action)| *action)
}

pub fn marker_capability(descriptor: &str) -> Option<Capability> {
    MARKER_TABLE
        .iter()
        .find(|(marker, _)| marker.matches(descriptor))
        .map(|(_, capability)| *capability)
}

/// Per-class findings, alive between `visit` and `visit_end`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassContext {
    pub class_name: String,
    pub has_cancelable_marker: bool,
    pub has_cancelable_method: bool,
    pub has_result_marker: bool,
    pub has_result_method: bool,
}

impl ClassContext {
    pub fn new(class_name: &str) -> Self {
        Self { class_name: class_name.to_string(), ..Self::default() }
    }

    fn mark(&mut self, capability: Capability) {
        match capability {
            Capability::Cancelable => self.has_cancelable_marker = true,
            Capability::HasResult => self.has_result_marker = true,
        }
    }

    fn track(&mut self, capability: Capability) {
        match capability {
            Capability::Cancelable => self.has_cancelable_method = true,
            Capability::HasResult => self.has_result_method = true,
        }
    }

    /// Marker present without an explicit method.
    pub fn needs(&self, capability: Capability) -> bool {
        match capability {
            Capability::Cancelable => self.has_cancelable_marker && !self.has_cancelable_method,
            Capability::HasResult => self.has_result_marker && !self.has_result_method,
        }
    }
}

#[derive(Debug)]
enum State {
    Start,
    Scanning(ClassContext),
    Ended,
}

pub struct EventSubclassTransformer<'c, V: ClassVisitor> {
    next: V,
    config: &'c Config,
    state: State,
}

impl<'c, V: ClassVisitor> EventSubclassTransformer<'c, V> {
    pub fn new(next: V, config: &'c Config) -> Self {
        Self { next, config, state: State::Start }
    }

    pub fn into_inner(self) -> V {
        self.next
    }

    fn context(&mut self, callback: &str) -> Result<&mut ClassContext> {
        match &mut self.state {
            State::Scanning(context) => Ok(context),
            State::Start => Err(Error::protocol(format!("{} before visit", callback))),
            State::Ended => Err(Error::protocol(format!("{} after visit_end", callback))),
        }
    }
}

impl<'c, V: ClassVisitor> ClassVisitor for EventSubclassTransformer<'c, V> {
    fn visit(&mut self, header: &ClassHeader) -> Result<()> {
        if !matches!(self.state, State::Start) {
            return Err(Error::protocol(format!("second visit of {}", header.name)));
        }
        self.state = State::Scanning(ClassContext::new(&header.name));
        self.next.visit(header)
    }

    fn visit_annotation(&mut self, annotation: Annotation, visible: bool) -> Result<()> {
        let context = self.context("visit_annotation")?;
        match marker_capability(&annotation.descriptor) {
            Some(capability) => {
                log::debug!("consumed {} on {}", annotation.descriptor, context.class_name);
                context.mark(capability);
                Ok(())
            }
            None => self.next.visit_annotation(annotation, visible),
        }
    }

    fn visit_attribute(&mut self, attribute: AttributeInfo) -> Result<()> {
        self.context("visit_attribute")?;
        self.next.visit_attribute(attribute)
    }

    fn visit_field(&mut self, field: Member) -> Result<()> {
        self.context("visit_field")?;
        self.next.visit_field(field)
    }

    fn visit_method(&mut self, method: Member) -> Result<()> {
        let context = self.context("visit_method")?;
        match method_action(&method.name, &method.descriptor) {
            MethodAction::Strip => {
                log::warn!(
                    "Stripping {} from {} (an assumed Event class)",
                    method.name,
                    context.class_name
                );
                Ok(())
            }
            MethodAction::Track(capability) => {
                context.track(capability);
                self.next.visit_method(method)
            }
            MethodAction::PassThrough => self.next.visit_method(method),
        }
    }

    fn define_method(&mut self, access_flags: u16, name: &str, descriptor: &str) -> Result<Option<MethodWriter>> {
        if !matches!(self.state, State::Scanning(_)) {
            return Ok(None);
        }
        self.next.define_method(access_flags, name, descriptor)
    }

    fn visit_end(&mut self) -> Result<()> {
        self.context("visit_end")?;
        let context = match std::mem::replace(&mut self.state, State::Ended) {
            State::Scanning(context) => context,
            _ => return Err(Error::protocol("visit_end outside of a class")),
        };
        for capability in Capability::ALL {
            if context.needs(capability) {
                emit_constant_true(&mut self.next, &context.class_name, capability.method_name(), self.config)?;
            }
        }
        self.next.visit_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::visitor::MemberBody;
    use crate::classfile::ClassWriter;

    fn header() -> ClassHeader {
        ClassHeader {
            minor_version: 0,
            major_version: 52,
            access_flags: 0x21,
            name: "a/SomeEvent".to_string(),
            super_name: Some("net/minecraftforge/eventbus/api/Event".to_string()),
            interfaces: Vec::new(),
        }
    }

    fn abstract_method(name: &str, descriptor: &str) -> Member {
        Member {
            access_flags: 0x0401,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            body: MemberBody::Decoded(Vec::new()),
        }
    }

    #[test]
    fn table_lookup_is_exact() {
        assert_eq!(method_action(GET_LISTENER_LIST, LISTENER_LIST_ACCESSOR_DESCRIPTOR), MethodAction::Strip);
        assert_eq!(method_action(GET_LISTENER_LIST, "()Ljava/lang/Object;"), MethodAction::PassThrough);
        assert_eq!(method_action(IS_CANCELABLE, "()Z"), MethodAction::Track(Capability::Cancelable));
        assert_eq!(method_action(HAS_RESULT, "(I)Z"), MethodAction::PassThrough);
        assert_eq!(marker_capability(HAS_RESULT_DESCRIPTOR), Some(Capability::HasResult));
        assert_eq!(marker_capability(OVERRIDE_DESCRIPTOR), None);
    }

    #[test]
    fn context_needs_marker_without_method() {
        let mut context = ClassContext::new("a/SomeEvent");
        assert!(!context.needs(Capability::Cancelable));
        context.mark(Capability::Cancelable);
        assert!(context.needs(Capability::Cancelable));
        context.track(Capability::Cancelable);
        assert!(!context.needs(Capability::Cancelable));
        context.track(Capability::HasResult);
        assert!(!context.needs(Capability::HasResult));
    }

    #[test]
    fn callbacks_outside_a_class_are_protocol_errors() {
        let config = Config::default();
        let mut transformer = EventSubclassTransformer::new(ClassWriter::new(), &config);
        assert!(matches!(
            transformer.visit_annotation(Annotation::marker(CANCELABLE_DESCRIPTOR), true),
            Err(Error::Protocol { .. })
        ));
        transformer.visit(&header()).unwrap();
        transformer.visit_end().unwrap();
        assert!(matches!(
            transformer.visit_method(abstract_method("run", "()V")),
            Err(Error::Protocol { .. })
        ));
        assert!(transformer.define_method(1, "run", "()V").unwrap().is_none());
    }

    #[test]
    fn synthesizes_in_declaration_order() {
        let config = Config::default();
        let mut transformer = EventSubclassTransformer::new(ClassWriter::new(), &config);
        transformer.visit(&header()).unwrap();
        transformer.visit_annotation(Annotation::marker(HAS_RESULT_DESCRIPTOR), true).unwrap();
        transformer.visit_annotation(Annotation::marker(CANCELABLE_DESCRIPTOR), true).unwrap();
        transformer
            .visit_method(abstract_method(GET_PARENT_LISTENER_LIST, LISTENER_LIST_ACCESSOR_DESCRIPTOR))
            .unwrap();
        transformer.visit_end().unwrap();

        let class = transformer.into_inner().into_class_file().unwrap();
        let names: Vec<_> = class
            .methods
            .iter()
            .map(|m| m.name(&class.constant_pool).unwrap().to_string())
            .collect();
        assert_eq!(names, vec![IS_CANCELABLE, HAS_RESULT]);
        assert!(class.annotations(true).unwrap().is_empty());
    }
}
