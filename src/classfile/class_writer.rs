//! Class file encoding from visitor callbacks

use std::collections::{HashMap, HashSet};

use super::attribute::{annotation_type_indices, annotations_to_bytes_with, Annotation, AttributeInfo, BootstrapMethods};
use super::class::{ClassFile, MemberInfo};
use super::constpool::ConstantPool;
use super::code::MethodWriter;
use super::defs::attribute_names;
use super::reader::ClassReader;
use super::visitor::{ClassHeader, ClassVisitor, Member, MemberBody};
use super::writer::ClassfileWritable;
use crate::{Error, Result};

/// Where a class-level attribute goes in the output, in arrival order.
#[derive(Debug, Clone)]
enum AttributeSlot {
    Raw(AttributeInfo),
    Annotations { visible: bool },
    BootstrapMethods,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Fresh,
    Open,
    Ended,
}

type Signature = (String, String);

/// Constant pool indices used by the class a writer was created from.
///
/// A pool may hold the same string more than once, so interning a name can
/// land on a different entry than the source used. Reusing these indices
/// keeps decoded declarations on the entries they referenced.
#[derive(Debug, Clone, Default)]
struct SourceIndices {
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: HashMap<Signature, (u16, u16)>,
    methods: HashMap<Signature, (u16, u16)>,
    /// Keyed by visibility and descriptor; first occurrence wins.
    annotation_types: HashMap<(bool, String), u16>,
}

impl SourceIndices {
    fn of(class: &ClassFile) -> Self {
        let pool = &class.constant_pool;
        let members = |members: &[MemberInfo]| {
            members
                .iter()
                .filter_map(|m| {
                    let key = (m.name(pool).ok()?.to_string(), m.descriptor(pool).ok()?.to_string());
                    Some((key, (m.name_index, m.descriptor_index)))
                })
                .collect::<HashMap<_, _>>()
        };
        let mut annotation_types = HashMap::new();
        for attribute in &class.attributes {
            let visible = match attribute.name(pool) {
                Ok(attribute_names::RUNTIME_VISIBLE_ANNOTATIONS) => true,
                Ok(attribute_names::RUNTIME_INVISIBLE_ANNOTATIONS) => false,
                _ => continue,
            };
            for (descriptor, index) in annotation_type_indices(&attribute.info, pool).unwrap_or_default() {
                annotation_types.entry((visible, descriptor)).or_insert(index);
            }
        }
        Self {
            this_class: class.this_class,
            super_class: class.super_class,
            interfaces: class.interfaces.clone(),
            fields: members(&class.fields),
            methods: members(&class.methods),
            annotation_types,
        }
    }
}

/// `index` if it is a `Utf8` constant holding `value`, else the interned entry.
fn utf8_index(pool: &mut ConstantPool, index: Option<u16>, value: &str) -> Result<u16> {
    match index {
        Some(index) if pool.get_utf8(index).map_or(false, |v| v == value) => Ok(index),
        _ => Ok(pool.try_add_utf8(value)?),
    }
}

/// `index` if it is a `Class` constant naming `name`, else the interned entry.
fn class_index(pool: &mut ConstantPool, index: Option<u16>, name: &str) -> Result<u16> {
    match index {
        Some(index) if pool.get_class_name(index).map_or(false, |v| v == name) => Ok(index),
        _ => Ok(pool.try_add_class(name)?),
    }
}

/// Builds a `ClassFile` from the visitor protocol.
///
/// A writer created with `from_reader` starts from the source class's
/// constant pool and reuses the source's indices for the class, its super
/// class, interfaces, member names and descriptors, and class annotation
/// types. An unmodified class re-encodes to the same bytes even when its
/// pool holds duplicate entries.
#[derive(Debug)]
pub struct ClassWriter {
    class: ClassFile,
    class_name: String,
    state: WriterState,
    source: Option<SourceIndices>,
    slots: Vec<AttributeSlot>,
    visible_annotations: Vec<Annotation>,
    invisible_annotations: Vec<Annotation>,
    bootstrap_methods: BootstrapMethods,
    fields: HashSet<Signature>,
    methods: HashSet<Signature>,
    reserved: HashSet<Signature>,
}

impl ClassWriter {
    pub fn new() -> Self {
        Self::with_class(ClassFile::new())
    }

    pub fn from_reader(reader: &ClassReader) -> Self {
        let mut class = ClassFile::new();
        class.constant_pool = reader.constant_pool().clone();
        let mut writer = Self::with_class(class);
        writer.source = Some(SourceIndices::of(reader.class_file()));
        writer
    }

    fn with_class(class: ClassFile) -> Self {
        Self {
            class,
            class_name: String::new(),
            state: WriterState::Fresh,
            source: None,
            slots: Vec::new(),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            bootstrap_methods: BootstrapMethods::new(),
            fields: HashSet::new(),
            methods: HashSet::new(),
            reserved: HashSet::new(),
        }
    }

    /// The finished class. Fails unless `visit_end` has been called.
    pub fn into_class_file(mut self) -> Result<ClassFile> {
        if self.state != WriterState::Ended {
            return Err(Error::protocol("class writer used before visit_end"));
        }
        let pool = &mut self.class.constant_pool;
        let source_types = self.source.as_ref().map(|s| &s.annotation_types);
        let mut attributes = Vec::with_capacity(self.slots.len() + 1);
        let mut bootstrap_written = false;
        for slot in self.slots {
            match slot {
                AttributeSlot::Raw(attribute) => attributes.push(attribute),
                AttributeSlot::Annotations { visible } => {
                    let annotations = if visible { &self.visible_annotations } else { &self.invisible_annotations };
                    if !annotations.is_empty() {
                        let info = annotations_to_bytes_with(annotations, |descriptor| {
                            let index = source_types.and_then(|t| t.get(&(visible, descriptor.to_string())).copied());
                            match index {
                                Some(index) if pool.get_utf8(index).map_or(false, |v| v == descriptor) => Ok(index),
                                _ => pool.try_add_utf8(descriptor),
                            }
                        })?;
                        attributes.push(AttributeInfo::named(pool, attribute_names::annotations(visible), info)?);
                    }
                }
                AttributeSlot::BootstrapMethods => {
                    bootstrap_written = true;
                    if !self.bootstrap_methods.is_empty() {
                        let info = self.bootstrap_methods.to_bytes();
                        attributes.push(AttributeInfo::named(pool, attribute_names::BOOTSTRAP_METHODS, info)?);
                    }
                }
            }
        }
        if !bootstrap_written && !self.bootstrap_methods.is_empty() {
            let info = self.bootstrap_methods.to_bytes();
            attributes.push(AttributeInfo::named(pool, attribute_names::BOOTSTRAP_METHODS, info)?);
        }
        self.class.attributes = attributes;
        Ok(self.class)
    }

    pub fn to_bytes(self) -> Result<Vec<u8>> {
        Ok(self.into_class_file()?.to_classfile_bytes())
    }

    fn check_open(&self, callback: &str) -> Result<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Fresh => Err(Error::protocol(format!("{} before visit", callback))),
            WriterState::Ended => Err(Error::protocol(format!("{} after visit_end of {}", callback, self.class_name))),
        }
    }

    fn member_info(&mut self, member: &Member, is_method: bool, attributes: Vec<AttributeInfo>) -> Result<MemberInfo> {
        let key = (member.name.clone(), member.descriptor.clone());
        let source = self
            .source
            .as_ref()
            .and_then(|s| if is_method { s.methods.get(&key) } else { s.fields.get(&key) })
            .copied();
        let pool = &mut self.class.constant_pool;
        let mut info = MemberInfo::new(
            member.access_flags,
            utf8_index(pool, source.map(|(name, _)| name), &member.name)?,
            utf8_index(pool, source.map(|(_, descriptor)| descriptor), &member.descriptor)?,
        );
        info.attributes = attributes;
        Ok(info)
    }
}

impl Default for ClassWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassVisitor for ClassWriter {
    fn visit(&mut self, header: &ClassHeader) -> Result<()> {
        if self.state != WriterState::Fresh {
            return Err(Error::protocol(format!("visit of {} on a used class writer", header.name)));
        }
        let pool = &mut self.class.constant_pool;
        let source = self.source.as_ref();
        self.class.minor_version = header.minor_version;
        self.class.major_version = header.major_version;
        self.class.access_flags = header.access_flags;
        self.class.this_class = class_index(pool, source.map(|s| s.this_class), &header.name)?;
        self.class.super_class = match &header.super_name {
            Some(name) => class_index(pool, source.map(|s| s.super_class), name)?,
            None => 0,
        };
        self.class.interfaces = header
            .interfaces
            .iter()
            .enumerate()
            .map(|(i, name)| class_index(pool, source.and_then(|s| s.interfaces.get(i).copied()), name))
            .collect::<Result<Vec<_>>>()?;
        self.class_name = header.name.clone();
        self.state = WriterState::Open;
        Ok(())
    }

    fn visit_annotation(&mut self, annotation: Annotation, visible: bool) -> Result<()> {
        self.check_open("visit_annotation")?;
        let has_slot = self
            .slots
            .iter()
            .any(|slot| matches!(slot, AttributeSlot::Annotations { visible: v } if *v == visible));
        if !has_slot {
            self.slots.push(AttributeSlot::Annotations { visible });
        }
        if visible {
            self.visible_annotations.push(annotation);
        } else {
            self.invisible_annotations.push(annotation);
        }
        Ok(())
    }

    fn visit_attribute(&mut self, attribute: AttributeInfo) -> Result<()> {
        self.check_open("visit_attribute")?;
        if attribute.name(&self.class.constant_pool)? == attribute_names::BOOTSTRAP_METHODS {
            if !self.bootstrap_methods.is_empty() {
                return Err(Error::protocol(format!(
                    "BootstrapMethods of {} visited after call sites were generated",
                    self.class_name
                )));
            }
            self.bootstrap_methods = BootstrapMethods::parse(&attribute.info)?;
            self.slots.push(AttributeSlot::BootstrapMethods);
        } else {
            self.slots.push(AttributeSlot::Raw(attribute));
        }
        Ok(())
    }

    fn visit_field(&mut self, field: Member) -> Result<()> {
        self.check_open("visit_field")?;
        let key = (field.name.clone(), field.descriptor.clone());
        if self.fields.contains(&key) {
            return Err(Error::duplicate_member(&self.class_name, &field.name, &field.descriptor));
        }
        let attributes = match &field.body {
            MemberBody::Decoded(attributes) => attributes.clone(),
            MemberBody::Generated(_) => {
                return Err(Error::protocol(format!("field {} with a method body", field.name)));
            }
        };
        let info = self.member_info(&field, false, attributes)?;
        self.class.fields.push(info);
        self.fields.insert(key);
        Ok(())
    }

    fn visit_method(&mut self, method: Member) -> Result<()> {
        self.check_open("visit_method")?;
        let key = (method.name.clone(), method.descriptor.clone());
        let attributes = match &method.body {
            MemberBody::Generated(generated) => {
                if !self.reserved.remove(&key) && self.methods.contains(&key) {
                    return Err(Error::duplicate_member(&self.class_name, &method.name, &method.descriptor));
                }
                generated.assemble(&mut self.class.constant_pool, &mut self.bootstrap_methods)?
            }
            MemberBody::Decoded(attributes) => {
                if self.methods.contains(&key) || self.reserved.contains(&key) {
                    return Err(Error::duplicate_member(&self.class_name, &method.name, &method.descriptor));
                }
                attributes.clone()
            }
        };
        let info = self.member_info(&method, true, attributes)?;
        self.class.methods.push(info);
        self.methods.insert(key);
        Ok(())
    }

    fn define_method(&mut self, access_flags: u16, name: &str, descriptor: &str) -> Result<Option<MethodWriter>> {
        if self.state != WriterState::Open {
            return Ok(None);
        }
        let key = (name.to_string(), descriptor.to_string());
        if self.methods.contains(&key) || self.reserved.contains(&key) {
            return Ok(None);
        }
        let writer = MethodWriter::new(&self.class_name, access_flags, name, descriptor)?;
        self.reserved.insert(key);
        Ok(Some(writer))
    }

    fn visit_end(&mut self) -> Result<()> {
        self.check_open("visit_end")?;
        for (name, descriptor) in &self.reserved {
            log::warn!("{}{} was defined in {} but never emitted", name, descriptor, self.class_name);
        }
        self.state = WriterState::Ended;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::flag::access_flags::*;
    use crate::classfile::opcodes::RETURN;

    fn header(name: &str) -> ClassHeader {
        ClassHeader {
            minor_version: 0,
            major_version: 52,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            name: name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
        }
    }

    #[test]
    fn define_method_refuses_duplicates_and_closed_classes() {
        let mut writer = ClassWriter::new();
        assert!(writer.define_method(ACC_PUBLIC, "run", "()V").unwrap().is_none());
        writer.visit(&header("a/B")).unwrap();
        let mut body = writer.define_method(ACC_PUBLIC, "run", "()V").unwrap().unwrap();
        assert!(writer.define_method(ACC_PUBLIC, "run", "()V").unwrap().is_none());
        body.insn(RETURN).unwrap();
        writer.visit_method(Member::generated(body.finish().unwrap())).unwrap();
        assert!(writer.define_method(ACC_PUBLIC, "run", "()V").unwrap().is_none());
        writer.visit_end().unwrap();
        assert!(writer.define_method(ACC_PUBLIC, "other", "()V").unwrap().is_none());
    }

    #[test]
    fn duplicate_declarations_are_fatal() {
        let mut writer = ClassWriter::new();
        writer.visit(&header("a/B")).unwrap();
        let member = Member {
            access_flags: ACC_PUBLIC | ACC_ABSTRACT,
            name: "run".to_string(),
            descriptor: "()V".to_string(),
            body: MemberBody::Decoded(Vec::new()),
        };
        writer.visit_method(member.clone()).unwrap();
        assert!(matches!(writer.visit_method(member), Err(Error::DuplicateMember { .. })));
    }

    #[test]
    fn class_annotations_are_reassembled() {
        let mut writer = ClassWriter::new();
        writer.visit(&header("a/B")).unwrap();
        writer.visit_annotation(Annotation::marker("La/Marker;"), false).unwrap();
        writer.visit_end().unwrap();
        let class = writer.into_class_file().unwrap();
        assert_eq!(class.attributes.len(), 1);
        assert_eq!(class.annotations(false).unwrap(), vec![Annotation::marker("La/Marker;")]);
    }
}
