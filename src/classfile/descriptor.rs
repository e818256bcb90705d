//! Field and method descriptor grammar

use std::fmt;

use super::error::{ClassFormatError, ClassFormatResult};
use super::frame::VerificationType;

const MAX_ARRAY_DIMENSIONS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    /// Internal class name, e.g. `java/lang/Object`.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Local variable / operand stack slots taken by a value of this type.
    pub fn slot_size(&self) -> u16 {
        match self {
            FieldType::Long | FieldType::Double => 2,
            _ => 1,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    pub fn verification_type(&self) -> VerificationType {
        match self {
            FieldType::Byte | FieldType::Char | FieldType::Int | FieldType::Short | FieldType::Boolean => {
                VerificationType::Integer
            }
            FieldType::Float => VerificationType::Float,
            FieldType::Long => VerificationType::Long,
            FieldType::Double => VerificationType::Double,
            FieldType::Object(name) => VerificationType::Object(name.clone()),
            FieldType::Array(_) => VerificationType::Object(self.to_string()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => f.write_str("B"),
            FieldType::Char => f.write_str("C"),
            FieldType::Double => f.write_str("D"),
            FieldType::Float => f.write_str("F"),
            FieldType::Int => f.write_str("I"),
            FieldType::Long => f.write_str("J"),
            FieldType::Short => f.write_str("S"),
            FieldType::Boolean => f.write_str("Z"),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(component) => write!(f, "[{}", component),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    /// `None` for `void`.
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> ClassFormatResult<Self> {
        let rest = descriptor
            .strip_prefix('(')
            .ok_or_else(|| ClassFormatError::invalid_descriptor(descriptor, "missing '('"))?;
        let mut parameters = Vec::new();
        let mut rest = rest;
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(ClassFormatError::invalid_descriptor(descriptor, "missing ')'"));
            }
            let (ty, after) = parse_one(rest, descriptor)?;
            parameters.push(ty);
            rest = after;
        }
        let return_type = if rest == "V" {
            None
        } else {
            let (ty, after) = parse_one(rest, descriptor)?;
            if !after.is_empty() {
                return Err(ClassFormatError::invalid_descriptor(descriptor, "trailing characters"));
            }
            Some(ty)
        };
        Ok(Self { parameters, return_type })
    }

    /// Slots taken by the declared parameters, excluding any receiver.
    pub fn parameter_slots(&self) -> u16 {
        self.parameters.iter().map(FieldType::slot_size).sum()
    }

    pub fn return_slots(&self) -> u16 {
        self.return_type.as_ref().map_or(0, FieldType::slot_size)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for parameter in &self.parameters {
            write!(f, "{}", parameter)?;
        }
        f.write_str(")")?;
        match &self.return_type {
            Some(ty) => write!(f, "{}", ty),
            None => f.write_str("V"),
        }
    }
}

pub fn parse_field_descriptor(descriptor: &str) -> ClassFormatResult<FieldType> {
    let (ty, rest) = parse_one(descriptor, descriptor)?;
    if !rest.is_empty() {
        return Err(ClassFormatError::invalid_descriptor(descriptor, "trailing characters"));
    }
    Ok(ty)
}

/// Validate an internal class name, or an array descriptor used in its place.
pub fn check_class_name(name: &str) -> ClassFormatResult<()> {
    if name.starts_with('[') {
        return parse_field_descriptor(name).map(|_| ());
    }
    if name.is_empty() || name.split('/').any(|part| part.is_empty() || part.contains(['.', ';', '[']))
    {
        return Err(ClassFormatError::invalid_descriptor(name, "invalid class name"));
    }
    Ok(())
}

fn parse_one<'a>(input: &'a str, whole: &str) -> ClassFormatResult<(FieldType, &'a str)> {
    let dims = input.bytes().take_while(|&b| b == b'[').count();
    if dims > MAX_ARRAY_DIMENSIONS {
        return Err(ClassFormatError::invalid_descriptor(whole, "too many array dimensions"));
    }
    let rest = &input[dims..];
    let first = rest
        .chars()
        .next()
        .ok_or_else(|| ClassFormatError::invalid_descriptor(whole, "unexpected end"))?;
    let (mut ty, rest) = match first {
        'B' => (FieldType::Byte, &rest[1..]),
        'C' => (FieldType::Char, &rest[1..]),
        'D' => (FieldType::Double, &rest[1..]),
        'F' => (FieldType::Float, &rest[1..]),
        'I' => (FieldType::Int, &rest[1..]),
        'J' => (FieldType::Long, &rest[1..]),
        'S' => (FieldType::Short, &rest[1..]),
        'Z' => (FieldType::Boolean, &rest[1..]),
        'L' => {
            let end = rest
                .find(';')
                .ok_or_else(|| ClassFormatError::invalid_descriptor(whole, "unterminated class name"))?;
            let name = &rest[1..end];
            if name.starts_with('[') {
                return Err(ClassFormatError::invalid_descriptor(whole, "invalid class name"));
            }
            check_class_name(name).map_err(|_| ClassFormatError::invalid_descriptor(whole, "invalid class name"))?;
            (FieldType::Object(name.to_string()), &rest[end + 1..])
        }
        _ => return Err(ClassFormatError::invalid_descriptor(whole, "unknown type character")),
    };
    for _ in 0..dims {
        ty = FieldType::Array(Box::new(ty));
    }
    Ok((ty, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_descriptors() {
        let d = MethodDescriptor::parse("(Ljava/lang/Class;[[IJ)Lnet/minecraftforge/eventbus/ListenerList;").unwrap();
        assert_eq!(d.parameters.len(), 3);
        assert_eq!(d.parameter_slots(), 4);
        assert_eq!(d.return_type, Some(FieldType::Object("net/minecraftforge/eventbus/ListenerList".into())));
        assert_eq!(d.to_string(), "(Ljava/lang/Class;[[IJ)Lnet/minecraftforge/eventbus/ListenerList;");
        assert_eq!(MethodDescriptor::parse("()Z").unwrap().return_slots(), 1);
        assert_eq!(MethodDescriptor::parse("()V").unwrap().return_type, None);
    }

    #[test]
    fn rejects_malformed_descriptors() {
        for bad in ["", "()", "(V)V", "(I", "()ZZ", "(Ljava/lang/Object)V", "()L;", "(Lfoo.Bar;)V", "Q"] {
            assert!(MethodDescriptor::parse(bad).is_err(), "{bad}");
        }
        assert!(parse_field_descriptor("II").is_err());
        assert!(parse_field_descriptor("[Ljava/lang/String;").is_ok());
    }

    #[test]
    fn array_types_verify_as_their_descriptor() {
        let ty = parse_field_descriptor("[Ljava/lang/String;").unwrap();
        assert_eq!(ty.verification_type(), VerificationType::Object("[Ljava/lang/String;".into()));
    }
}
