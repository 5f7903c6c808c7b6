//! Message-to-HTML conversion pipeline.
//!
//! Everything in here is pure: it reads a [`crate::model::Message`] and
//! returns values. Files, renderers and logging live in [`crate::export`]
//! and [`crate::render`].

pub mod body;
pub mod charset;
pub mod inline;
pub mod nested;
pub mod orchestrator;

pub use inline::{InlineResource, InlineStrategy, Inlined};
pub use nested::{Artifact, ResolveOptions, Resolved, Target};
pub use orchestrator::{Conversion, ConvertOptions, Converter, Operation, Output, Stage};
