//! Core data model: the message tree consumed by the conversion pipeline.

pub mod message;

pub use message::{Disposition, Message, MimeType, Part, PartBody};
