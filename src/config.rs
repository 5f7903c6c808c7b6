//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLRENDER_CONFIG` (environment variable)
//! 2. `~/.config/emlrender/config.toml` (Linux/macOS)
//!    `%APPDATA%\emlrender\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::convert::{ConvertOptions, InlineStrategy, Operation, ResolveOptions};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// What to convert and how deep to look.
    pub conversion: ConversionConfig,
    /// How HTML becomes the output document.
    pub render: RenderConfig,
    /// What happens to a source file after a successful conversion.
    pub source: SourceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Write the deepest matching attachment instead of rendering, when there is one.
    pub extract_attachment: bool,
    /// File-name suffix of the attachment to extract.
    pub attachment_suffix: String,
    /// File-name suffix of attachments holding a serialized message.
    pub message_suffix: String,
    /// Embedding levels searched before giving up on a branch.
    pub max_depth: usize,
    /// How inline `cid:` images end up in the HTML.
    pub inline_images: InlineStrategy,
}

/// Renderer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Write the HTML itself.
    Html,
    /// Run an external program on a temporary HTML file.
    Command,
}

/// Renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub renderer: RendererKind,
    /// Program used by the `command` renderer.
    pub command: String,
    /// Arguments; `{input}` and `{output}` are replaced by the file paths.
    pub args: Vec<String>,
    /// Extension of files produced by the `command` renderer.
    pub output_extension: String,
}

/// Source file handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceAction {
    Keep,
    Delete,
    Backup,
}

/// Source file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub after_success: SourceAction,
    /// Backup directory; defaults to `backup/` next to the source.
    pub backup_dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let resolve = ResolveOptions::default();
        Self {
            extract_attachment: false,
            attachment_suffix: ".pdf".to_string(),
            message_suffix: resolve.message_suffix,
            max_depth: resolve.max_depth,
            inline_images: InlineStrategy::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::Html,
            command: "chromium".to_string(),
            args: vec![
                "--headless".to_string(),
                "--disable-gpu".to_string(),
                "--no-pdf-header-footer".to_string(),
                "--print-to-pdf={output}".to_string(),
                "{input}".to_string(),
            ],
            output_extension: "pdf".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            after_success: SourceAction::Keep,
            backup_dir: None,
        }
    }
}

impl Config {
    /// Options for the conversion pipeline.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            resolve: ResolveOptions {
                message_suffix: self.conversion.message_suffix.clone(),
                max_depth: self.conversion.max_depth,
            },
            inline_images: self.conversion.inline_images,
            resource_dir: None,
        }
    }

    /// The operation selected by the `extract_attachment` toggle.
    pub fn operation(&self) -> Operation {
        if self.conversion.extract_attachment {
            Operation::ExtractAttachment {
                suffix: self.conversion.attachment_suffix.clone(),
            }
        } else {
            Operation::RenderHtml
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) => load_config_from(&path),
        None => Config::default(),
    }
}

/// Load configuration from an explicit path, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EMLRENDER_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("emlrender").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emlrender")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert!(!cfg.conversion.extract_attachment);
        assert_eq!(cfg.conversion.attachment_suffix, ".pdf");
        assert_eq!(cfg.conversion.message_suffix, ".eml");
        assert_eq!(cfg.conversion.max_depth, 50);
        assert_eq!(cfg.render.renderer, RendererKind::Html);
        assert_eq!(cfg.source.after_success, SourceAction::Keep);
        assert_eq!(cfg.operation(), Operation::RenderHtml);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.render.args, cfg.render.args);
        assert_eq!(parsed.conversion.inline_images, cfg.conversion.inline_images);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[conversion]
extract_attachment = true
inline_images = "side-file"

[source]
after_success = "backup"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.conversion.inline_images, InlineStrategy::SideFile);
        assert_eq!(cfg.source.after_success, SourceAction::Backup);
        assert_eq!(
            cfg.operation(),
            Operation::ExtractAttachment {
                suffix: ".pdf".into()
            }
        );
        // Other fields use defaults
        assert_eq!(cfg.conversion.max_depth, 50);
        assert_eq!(cfg.render.output_extension, "pdf");
    }

    #[test]
    fn test_convert_options_follow_config() {
        let mut cfg = Config::default();
        cfg.conversion.max_depth = 3;
        cfg.conversion.message_suffix = ".msg.eml".into();
        let options = cfg.convert_options();
        assert_eq!(options.resolve.max_depth, 3);
        assert_eq!(options.resolve.message_suffix, ".msg.eml");
        assert_eq!(options.inline_images, InlineStrategy::DataUri);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = load_config_from(Path::new("/nonexistent/emlrender/config.toml"));
        assert_eq!(cfg.conversion.attachment_suffix, ".pdf");
    }

    #[test]
    fn test_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[conversion\nmax_depth = ").unwrap();
        let cfg = load_config_from(&path);
        assert_eq!(cfg.conversion.max_depth, 50);
    }
}
