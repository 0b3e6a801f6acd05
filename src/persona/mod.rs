//! Persona attributes, prompt compilation and name extraction.
//!
//! An educator describes a religious persona with a handful of attributes.
//! The compiler turns those into an introduction request and a roleplay
//! system prompt; the name extractor pulls a display name out of whatever
//! introduction the provider wrote.

pub mod compiler;
pub mod name;
pub mod types;

pub use compiler::{PersonaCompiler, REFUSAL_LINE};
pub use name::extract_name;
pub use types::{
    Attitude, CompiledPersona, IntroductionSource, Level, PersonaAttributes,
};
