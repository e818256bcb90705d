use crate::classfile::defs::major_versions;
use crate::classfile::flag::access_flags::*;
use crate::classfile::verify::verify;
use crate::classfile::{ClassHeader, ClassVisitor, ClassWriter, ClassfileWritable, Member};
use crate::consts::REGISTRAR_METHOD_DESCRIPTOR;
use crate::model::{SubscriberAnnotation, SubscriberMetadata};
use crate::{Config, Error, Result};

use super::registrar;

const OBJECT_CLASS: &str = "java/lang/Object";

#[derive(Debug, Clone)]
struct RegistrarSpec {
    /// `None` means `Config::registrar_method_name`.
    method_name: Option<String>,
    metadata: SubscriberMetadata,
    annotation: Option<SubscriberAnnotation>,
}

impl RegistrarSpec {
    fn method_name<'a>(&'a self, config: &'a Config) -> &'a str {
        self.method_name.as_deref().unwrap_or(&config.registrar_method_name)
    }
}

/// Builds a holder class with one `public static synthetic` registrar
/// method per subscriber class.
#[derive(Debug, Clone)]
pub struct RegistrarClassBuilder {
    owner: String,
    registrars: Vec<RegistrarSpec>,
}

impl RegistrarClassBuilder {
    /// `owner` is the internal name of the class to build.
    pub fn new(owner: impl Into<String>) -> Self {
        Self { owner: owner.into(), registrars: Vec::new() }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Add a registrar method. `method_name` defaults to
    /// `Config::registrar_method_name` when `None`.
    pub fn subscriber(
        mut self,
        method_name: Option<&str>,
        metadata: SubscriberMetadata,
        annotation: Option<SubscriberAnnotation>,
    ) -> Self {
        self.registrars.push(RegistrarSpec {
            method_name: method_name.map(str::to_string),
            metadata,
            annotation,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrars.is_empty()
    }

    /// Encode the holder class.
    pub fn build(&self, config: &Config) -> Result<Vec<u8>> {
        let mut writer = ClassWriter::new();
        writer.visit(&ClassHeader {
            minor_version: 0,
            major_version: major_versions::JAVA_8,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            name: self.owner.clone(),
            super_name: Some(OBJECT_CLASS.to_string()),
            interfaces: Vec::new(),
        })?;

        for registrar in &self.registrars {
            let name = registrar.method_name(config);
            let Some(mut method) =
                writer.define_method(ACC_PUBLIC | ACC_STATIC | ACC_SYNTHETIC, name, REGISTRAR_METHOD_DESCRIPTOR)?
            else {
                return Err(Error::duplicate_member(&self.owner, name, REGISTRAR_METHOD_DESCRIPTOR));
            };
            registrar::generate(&mut method, registrar.annotation.as_ref(), &registrar.metadata)?;
            writer.visit_method(Member::generated(method.finish()?))?;
            log::debug!("generated {}.{} for {}", self.owner, name, registrar.metadata.class_name);
        }

        writer.visit_end()?;
        let class = writer.into_class_file()?;
        if config.verify {
            verify(&class)?;
        }
        Ok(class.to_classfile_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_method_names_are_rejected() {
        let builder = RegistrarClassBuilder::new("a/Registrars")
            .subscriber(None, SubscriberMetadata::new("a/One"), None)
            .subscriber(None, SubscriberMetadata::new("a/Two"), None);
        assert_eq!(builder.len(), 2);
        assert!(matches!(builder.build(&Config::default()), Err(Error::DuplicateMember { .. })));
    }

    #[test]
    fn explicit_method_names_are_kept_verbatim() {
        let config = Config::default();
        let builder = RegistrarClassBuilder::new("a/Registrars")
            .subscriber(None, SubscriberMetadata::new("a/One"), None)
            .subscriber(Some(""), SubscriberMetadata::new("a/Two"), None)
            .subscriber(Some("registerThree"), SubscriberMetadata::new("a/Three"), None);
        let names: Vec<_> = builder.registrars.iter().map(|r| r.method_name(&config)).collect();
        assert_eq!(names, vec![config.registrar_method_name.as_str(), "", "registerThree"]);
    }

    #[test]
    fn explicit_default_name_collides_with_omitted_name() {
        let config = Config::default();
        let builder = RegistrarClassBuilder::new("a/Registrars")
            .subscriber(None, SubscriberMetadata::new("a/One"), None)
            .subscriber(Some(&config.registrar_method_name), SubscriberMetadata::new("a/Two"), None);
        assert!(matches!(builder.build(&config), Err(Error::DuplicateMember { .. })));
    }

    #[test]
    fn empty_holder_is_a_valid_class() {
        let bytes = RegistrarClassBuilder::new("a/Registrars").build(&Config::default()).unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    }
}
