//! Turning converted HTML into an output document.
//!
//! The conversion pipeline stops at HTML text. A [`Renderer`] writes it out,
//! either as-is ([`HtmlRenderer`]) or through an external program such as a
//! headless browser printing to PDF ([`CommandRenderer`]).

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::{RenderConfig, RendererKind};
use crate::convert::Inlined;
use crate::error::{ConvertError, Result};

/// Produces an output file from converted HTML.
pub trait Renderer {
    /// Extension of the files this renderer writes (without the dot).
    fn extension(&self) -> &str;

    /// Render `html` into `output`.
    fn render(&self, html: &Inlined, output: &Path) -> Result<()>;
}

/// Build the renderer selected in the configuration.
pub fn from_config(config: &RenderConfig) -> Box<dyn Renderer> {
    match config.renderer {
        RendererKind::Html => Box::new(HtmlRenderer),
        RendererKind::Command => Box::new(CommandRenderer {
            program: config.command.clone(),
            args: config.args.clone(),
            extension: config.output_extension.clone(),
        }),
    }
}

/// Writes the HTML file plus any side resources next to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn extension(&self) -> &str {
        "html"
    }

    fn render(&self, html: &Inlined, output: &Path) -> Result<()> {
        write_resources(html, output)?;
        std::fs::write(output, &html.html).map_err(|e| ConvertError::io(output, e))?;
        debug!(path = %output.display(), "Wrote HTML");
        Ok(())
    }
}

/// Runs an external program on a temporary HTML file.
///
/// `{input}` and `{output}` in the arguments are replaced by the temporary
/// HTML path and the requested output path.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    pub program: String,
    pub args: Vec<String>,
    pub extension: String,
}

impl Renderer for CommandRenderer {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn render(&self, html: &Inlined, output: &Path) -> Result<()> {
        let input = output.with_extension("render.html");
        let written = write_resources(html, &input)?;
        std::fs::write(&input, &html.html).map_err(|e| ConvertError::io(&input, e))?;

        let result = self.run(&input, output);

        for path in written.iter().chain(std::iter::once(&input)) {
            if let Err(e) = std::fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "Could not remove temporary file");
            }
        }
        // Resource folders are left behind only if something else is in them.
        let base = output.parent().unwrap_or(Path::new("."));
        for dir in written.iter().filter_map(|p| p.parent()) {
            if dir != base {
                if let Err(e) = std::fs::remove_dir(dir) {
                    debug!(path = %dir.display(), error = %e, "Keeping resource directory");
                }
            }
        }
        result
    }
}

impl CommandRenderer {
    fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let input = input.to_string_lossy();
        let output_str = output.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output_str))
            .collect();

        info!(program = %self.program, ?args, "Running renderer");
        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| ConvertError::Render(format!("cannot run '{}': {e}", self.program)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConvertError::Render(format!(
                "'{}' exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(ConvertError::Render(format!(
                "'{}' succeeded but wrote no {}",
                self.program,
                output.display()
            )));
        }
        Ok(())
    }
}

/// Write side resources relative to the directory of `html_path`.
fn write_resources(html: &Inlined, html_path: &Path) -> Result<Vec<PathBuf>> {
    let dir = html_path.parent().unwrap_or(Path::new("."));
    let mut written = Vec::with_capacity(html.resources.len());
    for resource in &html.resources {
        let path = dir.join(&resource.name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
        }
        std::fs::write(&path, &resource.data).map_err(|e| ConvertError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
