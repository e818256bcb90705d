//! Event bus bytecode passes
//!
//! - **transformer**: rewrites event classes for the Fabric-hosted event bus
//! - **synth**: constant `boolean` method synthesis
//! - **registrar**: registrar method bodies for subscriber classes
//! - **builder**: holder classes carrying registrar methods

pub mod builder;
pub mod registrar;
pub mod synth;
pub mod transformer;

pub use builder::RegistrarClassBuilder;
pub use transformer::{Capability, ClassContext, EventSubclassTransformer, MethodAction};
