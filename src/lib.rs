//! classpatch
//!
//! Bytecode passes that let Forge-style event classes and subscribers run on
//! a Fabric-hosted event bus.
//!
//! ## Architecture
//!
//! - **classfile**: class file decoding, the visitor protocol, method body
//!   emission and encoding
//! - **event**: the event class transformer and the registrar generator
//! - **lambda**: `invokedynamic` closure call sites
//! - **model**: method signatures, markers and subscriber metadata
//! - **bin**: command-line interface
//!
//! ## Transformation Flow
//!
//! ```text
//! class bytes → ClassReader → EventSubclassTransformer → ClassWriter → class bytes
//!                                       ↓
//!                          strip accessors, consume markers,
//!                          synthesize isCancelable / hasResult
//! ```

pub mod classfile;
pub mod config;
pub mod consts;
pub mod error;
pub mod event;
pub mod lambda;
pub mod model;

pub use config::Config;
pub use error::{Error, Result};
pub use event::{EventSubclassTransformer, RegistrarClassBuilder};
pub use model::{Bus, SubscriberAnnotation, SubscriberMetadata};

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use classfile::verify::verify;
use classfile::{ClassReader, ClassWriter, ClassfileWritable};

/// Transform one event class.
///
/// Legacy listener list accessors are removed, `@Cancelable` and
/// `@Event.HasResult` are replaced by `isCancelable()` / `hasResult()`
/// overrides returning `true`. A class without any of these re-encodes to
/// identical bytes.
pub fn transform_event_class(bytes: &[u8], config: &Config) -> Result<Vec<u8>> {
    let reader = ClassReader::new(bytes)?;
    let mut transformer = EventSubclassTransformer::new(ClassWriter::from_reader(&reader), config);
    reader.accept(&mut transformer)?;
    let class = transformer.into_inner().into_class_file()?;
    if config.verify {
        verify(&class)?;
    }
    Ok(class.to_classfile_bytes())
}

/// Transform many classes in parallel. Results keep the input order; a
/// failing class does not affect the others.
pub fn transform_event_classes(classes: Vec<(String, Vec<u8>)>, config: &Config) -> Vec<(String, Result<Vec<u8>>)> {
    classes
        .into_par_iter()
        .map(|(name, bytes)| {
            let result = transform_event_class(&bytes, config);
            if let Err(e) = &result {
                log::error!("failed to transform {}: {}", name, e);
            }
            (name, result)
        })
        .collect()
}

/// Transform the class at `input` and write it to `output`, creating parent
/// directories as needed.
pub fn transform_class_file(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let bytes = fs::read(input)?;
    let transformed = transform_event_class(&bytes, config)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, transformed)?;
    Ok(())
}

/// Transform every `.class` file under `input` into the same relative path
/// under `output`. Returns each file's outcome.
pub fn transform_directory(input: &Path, output: &Path, config: &Config) -> Result<Vec<(PathBuf, Result<()>)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == "class") {
            files.push(entry.into_path());
        }
    }
    log::info!("transforming {} classes from {}", files.len(), input.display());

    Ok(files
        .into_par_iter()
        .map(|path| {
            let relative = path.strip_prefix(input).unwrap_or(&path).to_path_buf();
            let result = transform_class_file(&path, &output.join(&relative), config);
            if let Err(e) = &result {
                log::error!("failed to transform {}: {}", path.display(), e);
            }
            (relative, result)
        })
        .collect())
}
