/*
 * backup.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Timestamped backup copies of configuration files.
 */

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::error::{Result, UpdateError};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// `<dir>/<file name>.<yyyyMMddHHmm>`, with `dir` defaulting to the
/// file's own directory.
pub fn backup_path<Tz>(target: &Path, dir: Option<&Path>, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}.{}", name, at.format(TIMESTAMP_FORMAT));
    match dir {
        Some(dir) => dir.join(file_name),
        None => target.with_file_name(file_name),
    }
}

/// Copy `target` to its backup location, creating `dir` if needed.
pub fn create_backup(target: &Path, dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(|e| UpdateError::io("create backup directory", dir, e))?;
    }
    let path = backup_path(target, dir, &Local::now());
    fs::copy(target, &path).map_err(|e| UpdateError::io("write backup", &path, e))?;
    tracing::debug!(backup = %path.display(), "backup created");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_backup_path_alongside_target() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(
            backup_path(Path::new("/etc/app/app.yml"), None, &at),
            PathBuf::from("/etc/app/app.yml.202403070905")
        );
    }

    #[test]
    fn test_backup_path_in_directory() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            backup_path(Path::new("app.yml"), Some(Path::new("/backups")), &at),
            PathBuf::from("/backups/app.yml.202412312359")
        );
    }

    #[test]
    fn test_create_backup_copies_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.yml");
        fs::write(&target, "a: 1\n").unwrap();
        let backups = dir.path().join("backups");

        let path = create_backup(&target, Some(&backups)).unwrap();
        assert!(path.starts_with(&backups));
        assert_eq!(fs::read_to_string(path).unwrap(), "a: 1\n");
    }
}
