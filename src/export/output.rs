//! Converting one `.eml` file end to end: load, convert, write, tidy up.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, SourceConfig};
use crate::convert::{Converter, InlineStrategy, Operation, Output};
use crate::error::{ConvertError, Result};
use crate::parser::eml::load_eml;
use crate::render::Renderer;

use super::naming::{attachment_extension, output_path, resource_dir, unique_path};
use super::source::{finish_source, SourceOutcome};

/// Kind of file a conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    /// Rendered document (HTML or the renderer's format).
    Rendered,
    /// Extracted attachment bytes.
    Attachment,
    /// The message had nothing to convert.
    Nothing,
}

/// Summary of one converted file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub kind: OutputKind,
    /// Nesting depth of the rendered message or extracted attachment.
    pub depth: usize,
    /// Size of the written output in bytes.
    pub size: u64,
    pub source_outcome: SourceOutcome,
}

/// Settings shared by every file of a run.
pub struct Job<'a> {
    converter: Converter,
    operation: Operation,
    renderer: &'a dyn Renderer,
    output_dir: Option<PathBuf>,
    source: SourceConfig,
}

impl<'a> Job<'a> {
    pub fn new(config: &Config, renderer: &'a dyn Renderer) -> Self {
        Self {
            converter: Converter::new(config.convert_options()),
            operation: config.operation(),
            renderer,
            output_dir: None,
            source: config.source.clone(),
        }
    }

    /// Write outputs into `dir` instead of next to each source.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Replace the operation picked from the configuration.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Convert a single file.
    pub fn run(&self, source: &Path) -> Result<FileReport> {
        let message = load_eml(source)?;
        let output_dir = self.output_dir.as_deref();

        // Side-file images live in a folder of their own, named after the output.
        let html_path = unique_path(&output_path(source, output_dir, self.renderer.extension()));
        let conversion = match self.converter.options().inline_images {
            InlineStrategy::SideFile => {
                let mut options = self.converter.options().clone();
                options.resource_dir = resource_dir(&html_path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                Converter::new(options).convert(&message, &self.operation)?
            }
            InlineStrategy::DataUri => self.converter.convert(&message, &self.operation)?,
        };

        if conversion.is_empty() {
            warn!(path = %source.display(), "Nothing to convert");
            return Ok(FileReport {
                source: source.to_path_buf(),
                output: None,
                kind: OutputKind::Nothing,
                depth: conversion.depth,
                size: 0,
                source_outcome: SourceOutcome::Kept,
            });
        }

        if let Some(dir) = output_dir {
            std::fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;
        }

        let (output, kind) = match &conversion.output {
            Output::Attachment { filename, data } => {
                let fallback = match &self.operation {
                    Operation::ExtractAttachment { suffix } => suffix.as_str(),
                    Operation::RenderHtml => "bin",
                };
                let ext = attachment_extension(filename.as_deref(), fallback);
                let path = unique_path(&output_path(source, output_dir, &ext));
                write_bytes(&path, data)?;
                (path, OutputKind::Attachment)
            }
            Output::Html(html) => {
                self.renderer.render(html, &html_path)?;
                (html_path, OutputKind::Rendered)
            }
        };

        let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        info!(
            source = %source.display(),
            output = %output.display(),
            depth = conversion.depth,
            "Converted"
        );

        let source_outcome = finish_source(source, &self.source)?;

        Ok(FileReport {
            source: source.to_path_buf(),
            output: Some(output),
            kind,
            depth: conversion.depth,
            size,
            source_outcome,
        })
    }
}

/// Write extracted bytes to `path`.
pub fn write_bytes(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).map_err(|e| ConvertError::io(path, e))
}
