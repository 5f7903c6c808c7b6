//! What happens to a source file once it has been converted.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{SourceAction, SourceConfig};
use crate::error::{ConvertError, Result};

use super::naming::unique_path;

/// Where the source file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "path", rename_all = "kebab-case")]
pub enum SourceOutcome {
    Kept,
    Deleted,
    BackedUp(PathBuf),
}

/// Apply the configured after-success action to `source`.
pub fn finish_source(source: &Path, config: &SourceConfig) -> Result<SourceOutcome> {
    match config.after_success {
        SourceAction::Keep => Ok(SourceOutcome::Kept),
        SourceAction::Delete => {
            std::fs::remove_file(source).map_err(|e| ConvertError::io(source, e))?;
            tracing::info!(path = %source.display(), "Deleted source");
            Ok(SourceOutcome::Deleted)
        }
        SourceAction::Backup => {
            let target = backup_path(source, config.backup_dir.as_deref())?;
            move_file(source, &target)?;
            tracing::info!(
                path = %source.display(),
                backup = %target.display(),
                "Moved source to backup"
            );
            Ok(SourceOutcome::BackedUp(target))
        }
    }
}

/// Free path inside the backup directory for `source`.
///
/// A name already taken gets a timestamp, then a counter if still taken.
fn backup_path(source: &Path, backup_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match backup_dir {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .unwrap_or(Path::new("."))
            .join("backup"),
    };
    std::fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;

    let name = source
        .file_name()
        .ok_or_else(|| ConvertError::InvalidPath(source.display().to_string()))?;
    let target = dir.join(name);
    if !target.exists() {
        return Ok(target);
    }

    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("message");
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let stamped = match source.extension().and_then(|e| e.to_str()) {
        Some(ext) => dir.join(format!("{stem}_{stamp}.{ext}")),
        None => dir.join(format!("{stem}_{stamp}")),
    };
    Ok(unique_path(&stamped))
}

/// Rename, falling back to copy + delete across file systems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| ConvertError::io(to, e))?;
    std::fs::remove_file(from).map_err(|e| ConvertError::io(from, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(after_success: SourceAction, backup_dir: Option<PathBuf>) -> SourceConfig {
        SourceConfig {
            after_success,
            backup_dir,
        }
    }

    #[test]
    fn test_keep_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.eml");
        std::fs::write(&source, b"x").unwrap();
        let outcome = finish_source(&source, &config(SourceAction::Keep, None)).unwrap();
        assert_eq!(outcome, SourceOutcome::Kept);
        assert!(source.exists());
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.eml");
        std::fs::write(&source, b"x").unwrap();
        let outcome = finish_source(&source, &config(SourceAction::Delete, None)).unwrap();
        assert_eq!(outcome, SourceOutcome::Deleted);
        assert!(!source.exists());
    }

    #[test]
    fn test_backup_default_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.eml");
        std::fs::write(&source, b"x").unwrap();
        let outcome = finish_source(&source, &config(SourceAction::Backup, None)).unwrap();
        let expected = dir.path().join("backup").join("a.eml");
        assert_eq!(outcome, SourceOutcome::BackedUp(expected.clone()));
        assert!(!source.exists());
        assert_eq!(std::fs::read(expected).unwrap(), b"x");
    }

    #[test]
    fn test_backup_name_collision_gets_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().join("old");
        std::fs::create_dir_all(&backups).unwrap();
        std::fs::write(backups.join("a.eml"), b"old").unwrap();

        let source = dir.path().join("a.eml");
        std::fs::write(&source, b"new").unwrap();
        let outcome =
            finish_source(&source, &config(SourceAction::Backup, Some(backups.clone()))).unwrap();

        let SourceOutcome::BackedUp(path) = outcome else {
            panic!("expected a backup");
        };
        assert_ne!(path, backups.join("a.eml"));
        assert!(path.starts_with(&backups));
        assert_eq!(std::fs::read(path).unwrap(), b"new");
        assert_eq!(std::fs::read(backups.join("a.eml")).unwrap(), b"old");
    }
}
