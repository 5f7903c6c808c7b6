//! `emlrender` — turn `.eml` messages into HTML or PDF.
//!
//! This crate provides the core library: loading messages, finding the most
//! deeply nested message or document attachment, decoding bodies, inlining
//! `cid:` images, and writing the results.

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod render;
