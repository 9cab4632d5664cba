//! Directory scanner producing canonically ordered backup lists.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::errors::{Result, SinkError};
use crate::filename::{parse_backup, BackupFile};
use crate::options::TimeZone;

/// List `dir` and return every file the grammar accepts, oldest first.
///
/// Subdirectories are skipped, non-matching names (gzipped backups,
/// foreign files) are dropped silently. The result is sorted by days-ago
/// descending, ties broken by version ascending; when the newest entry is
/// dated today it is the active file and is removed from the result.
pub(crate) fn scan_backups(
    dir: &Path,
    prefix: &str,
    pattern: &Regex,
    now: DateTime<Utc>,
    tz: TimeZone,
) -> Result<Vec<BackupFile>> {
    if dir.as_os_str().is_empty() {
        return Err(SinkError::DirectoryNotSet);
    }

    let entries = fs::read_dir(dir).map_err(|source| SinkError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut backups = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|source| SinkError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_type = entry.file_type().map_err(|source| SinkError::ReadDir {
            path: entry.path(),
            source,
        })?;
        if file_type.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if let Some(backup) = parse_backup(dir, name, prefix, pattern, now, tz)? {
            backups.push(backup);
        }
    }

    backups.sort_by(|a, b| {
        b.days_ago
            .cmp(&a.days_ago)
            .then(a.version.cmp(&b.version))
    });

    // The newest entry dated today is the writer's active file.
    if backups.last().is_some_and(|b| b.days_ago == 0) {
        backups.pop();
    }

    Ok(backups)
}
