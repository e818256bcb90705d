//! Attributes and exception table structures for Java class files

use super::bytes::ByteReader;
use super::constpool::ConstantPool;
use super::defs::attribute_names;
use super::error::{ClassFormatError, ClassFormatResult, ConstPoolResult};

/// An attribute as it appears on the wire: name index plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }

    /// Create an attribute, interning its name in `pool`.
    pub fn named(pool: &mut ConstantPool, name: &str, info: Vec<u8>) -> ConstPoolResult<Self> {
        Ok(Self::new(pool.try_add_utf8(name)?, info))
    }

    pub fn name<'p>(&self, pool: &'p ConstantPool) -> ConstPoolResult<&'p str> {
        pool.get_utf8(self.name_index)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(6 + self.info.len());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(self.info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.info);
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> ClassFormatResult<Self> {
        let name_index = reader.u16()?;
        let length = reader.u32()? as usize;
        let info = reader.bytes(length)?.to_vec();
        Ok(Self { name_index, info })
    }

    pub(crate) fn read_list(reader: &mut ByteReader<'_>) -> ClassFormatResult<Vec<Self>> {
        let count = reader.u16()?;
        (0..count).map(|_| Self::read(reader)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn parse(info: &[u8]) -> ClassFormatResult<Self> {
        let mut reader = ByteReader::new(info);
        let max_stack = reader.u16()?;
        let max_locals = reader.u16()?;
        let code_length = reader.u32()? as usize;
        if code_length == 0 {
            return Err(ClassFormatError::malformed(attribute_names::CODE, "empty code array"));
        }
        let code = reader.bytes(code_length)?.to_vec();
        let handlers = reader.u16()?;
        let mut exception_table = Vec::with_capacity(handlers as usize);
        for _ in 0..handlers {
            exception_table.push(ExceptionTableEntry {
                start_pc: reader.u16()?,
                end_pc: reader.u16()?,
                handler_pc: reader.u16()?,
                catch_type: reader.u16()?,
            });
        }
        let attributes = AttributeInfo::read_list(&mut reader)?;
        if !reader.is_empty() {
            return Err(ClassFormatError::malformed(
                attribute_names::CODE,
                format!("{} bytes after nested attributes", reader.remaining()),
            ));
        }
        Ok(Self { max_stack, max_locals, code, exception_table, attributes })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&(self.exception_table.len() as u16).to_be_bytes());
        for entry in &self.exception_table {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8);
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.end_pc.to_be_bytes());
        bytes.extend_from_slice(&self.handler_pc.to_be_bytes());
        bytes.extend_from_slice(&self.catch_type.to_be_bytes());
        bytes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVariableTableAttribute {
    pub local_variable_table: Vec<LocalVariableEntry>,
}

impl LocalVariableTableAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.local_variable_table.is_empty()
    }

    pub fn parse(info: &[u8]) -> ClassFormatResult<Self> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let mut local_variable_table = Vec::with_capacity(count as usize);
        for _ in 0..count {
            local_variable_table.push(LocalVariableEntry {
                start_pc: reader.u16()?,
                length: reader.u16()?,
                name_index: reader.u16()?,
                descriptor_index: reader.u16()?,
                index: reader.u16()?,
            });
        }
        Ok(Self { local_variable_table })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + 10 * self.local_variable_table.len());
        bytes.extend_from_slice(&(self.local_variable_table.len() as u16).to_be_bytes());
        for entry in &self.local_variable_table {
            bytes.extend_from_slice(&entry.start_pc.to_be_bytes());
            bytes.extend_from_slice(&entry.length.to_be_bytes());
            bytes.extend_from_slice(&entry.name_index.to_be_bytes());
            bytes.extend_from_slice(&entry.descriptor_index.to_be_bytes());
            bytes.extend_from_slice(&entry.index.to_be_bytes());
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

/// One entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapMethods {
    pub methods: Vec<BootstrapMethod>,
}

impl BootstrapMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Index of an identical entry, appending one if none exists.
    pub fn add(&mut self, method_ref: u16, arguments: Vec<u16>) -> u16 {
        if let Some(position) = self
            .methods
            .iter()
            .position(|m| m.method_ref == method_ref && m.arguments == arguments)
        {
            return position as u16;
        }
        self.methods.push(BootstrapMethod { method_ref, arguments });
        (self.methods.len() - 1) as u16
    }

    pub fn parse(info: &[u8]) -> ClassFormatResult<Self> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let method_ref = reader.u16()?;
            let argc = reader.u16()?;
            let arguments = (0..argc).map(|_| reader.u16()).collect::<ClassFormatResult<Vec<_>>>()?;
            methods.push(BootstrapMethod { method_ref, arguments });
        }
        if !reader.is_empty() {
            return Err(ClassFormatError::malformed(attribute_names::BOOTSTRAP_METHODS, "trailing bytes"));
        }
        Ok(Self { methods })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            bytes.extend_from_slice(&method.method_ref.to_be_bytes());
            bytes.extend_from_slice(&(method.arguments.len() as u16).to_be_bytes());
            for argument in &method.arguments {
                bytes.extend_from_slice(&argument.to_be_bytes());
            }
        }
        bytes
    }
}

/// A single annotation. Only the type is decoded; the element-value pairs
/// are carried verbatim (count included) since their indices refer to the
/// pool the annotation was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub descriptor: String,
    pub elements: Vec<u8>,
}

impl Annotation {
    /// An annotation without element-value pairs.
    pub fn marker(descriptor: &str) -> Self {
        Self { descriptor: descriptor.to_string(), elements: vec![0, 0] }
    }

    pub fn is_marker(&self) -> bool {
        self.elements == [0, 0]
    }
}

/// Split the payload of a `Runtime{Visible,Invisible}Annotations` attribute.
pub fn split_annotations(info: &[u8], pool: &ConstantPool) -> ClassFormatResult<Vec<Annotation>> {
    let mut reader = ByteReader::new(info);
    let count = reader.u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(read_annotation(&mut reader, info, pool)?);
    }
    if !reader.is_empty() {
        return Err(ClassFormatError::malformed(
            attribute_names::RUNTIME_VISIBLE_ANNOTATIONS,
            format!("{} trailing bytes", reader.remaining()),
        ));
    }
    Ok(annotations)
}

fn read_annotation(reader: &mut ByteReader<'_>, info: &[u8], pool: &ConstantPool) -> ClassFormatResult<Annotation> {
    let type_index = reader.u16()?;
    let descriptor = pool.get_utf8(type_index)?.to_string();
    let start = reader.position();
    skip_pairs(reader)?;
    Ok(Annotation { descriptor, elements: info[start..reader.position()].to_vec() })
}

fn skip_pairs(reader: &mut ByteReader<'_>) -> ClassFormatResult<()> {
    let pairs = reader.u16()?;
    for _ in 0..pairs {
        reader.u16()?;
        skip_element_value(reader)?;
    }
    Ok(())
}

fn skip_element_value(reader: &mut ByteReader<'_>) -> ClassFormatResult<()> {
    let tag = reader.u8()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => reader.skip(2),
        b'e' => reader.skip(4),
        b'@' => {
            reader.u16()?;
            skip_pairs(reader)
        }
        b'[' => {
            let values = reader.u16()?;
            for _ in 0..values {
                skip_element_value(reader)?;
            }
            Ok(())
        }
        _ => Err(ClassFormatError::malformed(
            attribute_names::RUNTIME_VISIBLE_ANNOTATIONS,
            format!("unknown element value tag {:?}", tag as char),
        )),
    }
}

/// Encode an annotations attribute payload, interning type descriptors.
pub fn annotations_to_bytes(annotations: &[Annotation], pool: &mut ConstantPool) -> ConstPoolResult<Vec<u8>> {
    annotations_to_bytes_with(annotations, |descriptor| pool.try_add_utf8(descriptor))
}

/// Encode an annotations attribute payload, taking each type index from
/// `type_index`.
pub fn annotations_to_bytes_with<F>(annotations: &[Annotation], mut type_index: F) -> ConstPoolResult<Vec<u8>>
where
    F: FnMut(&str) -> ConstPoolResult<u16>,
{
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
    for annotation in annotations {
        bytes.extend_from_slice(&type_index(&annotation.descriptor)?.to_be_bytes());
        bytes.extend_from_slice(&annotation.elements);
    }
    Ok(bytes)
}

/// Type indices of the annotations in an annotations attribute payload,
/// paired with their descriptors.
pub fn annotation_type_indices(info: &[u8], pool: &ConstantPool) -> ClassFormatResult<Vec<(String, u16)>> {
    let mut position = 2;
    let mut indices = Vec::new();
    for annotation in split_annotations(info, pool)? {
        let index = u16::from_be_bytes([info[position], info[position + 1]]);
        position += 2 + annotation.elements.len();
        indices.push((annotation.descriptor, index));
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotations_split_and_reassemble_identically() {
        let mut pool = ConstantPool::new();
        let marker = pool.try_add_utf8("Lcom/example/Marker;").unwrap();
        let other = pool.try_add_utf8("Lcom/example/Sub;").unwrap();
        let key = pool.try_add_utf8("value").unwrap();
        let text = pool.try_add_utf8("x").unwrap();

        let mut info = vec![0, 2];
        info.extend_from_slice(&marker.to_be_bytes());
        info.extend_from_slice(&[0, 0]);
        info.extend_from_slice(&other.to_be_bytes());
        info.extend_from_slice(&[0, 1]);
        info.extend_from_slice(&key.to_be_bytes());
        info.push(b'[');
        info.extend_from_slice(&[0, 1, b's']);
        info.extend_from_slice(&text.to_be_bytes());

        let annotations = split_annotations(&info, &pool).unwrap();
        assert_eq!(annotations.len(), 2);
        assert!(annotations[0].is_marker());
        assert_eq!(annotations[1].descriptor, "Lcom/example/Sub;");
        assert_eq!(annotations_to_bytes(&annotations, &mut pool).unwrap(), info);
        assert_eq!(
            annotation_type_indices(&info, &pool).unwrap(),
            vec![("Lcom/example/Marker;".to_string(), marker), ("Lcom/example/Sub;".to_string(), other)]
        );
    }

    #[test]
    fn bootstrap_methods_are_shared() {
        let mut table = BootstrapMethods::new();
        assert_eq!(table.add(4, vec![1, 2, 3]), 0);
        assert_eq!(table.add(4, vec![1, 2, 5]), 1);
        assert_eq!(table.add(4, vec![1, 2, 3]), 0);
        assert_eq!(BootstrapMethods::parse(&table.to_bytes()).unwrap(), table);
    }
}
