//! File naming for conversion outputs.

use std::path::{Path, PathBuf};

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// Path of the output for `source` with the given extension.
///
/// Lands in `output_dir` when given, next to the source otherwise.
pub fn output_path(source: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| sanitize_filename_part(s, 150))
        .unwrap_or_else(|| "message".to_string());

    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    dir.join(format!("{stem}.{extension}"))
}

/// Extension of an extracted attachment, from its own file name.
pub fn attachment_extension(filename: Option<&str>, fallback: &str) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .map(|e| sanitize_filename_part(&e.to_ascii_lowercase(), 10))
        .unwrap_or_else(|| fallback.trim_start_matches('.').to_string())
}

/// Free directory next to `output` for the files its HTML links to:
/// `<stem>_files`, with a counter when taken.
pub fn resource_dir(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("message");
    let parent = output.parent().unwrap_or(Path::new("."));
    unique_path(&parent.join(format!("{stem}_files")))
}

/// If `path` already exists, append a counter to make it unique.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}
