//! The filename grammar: `{prefix}-{YYYY-MM-DD}.{version}.log`.
//!
//! The grammar is the only coordination medium between the writer and the
//! background policies. The writer always emits a version; files found on
//! disk may omit it, in which case the parsed version is 0. Gzipped
//! backups (`.log.gz`) never match and are therefore invisible to every
//! policy.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::errors::{Result, SinkError};
use crate::options::TimeZone;

pub(crate) const LOG_EXT: &str = ".log";
pub(crate) const GZ_EXT: &str = ".gz";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Compile the backup matcher for `prefix`.
pub(crate) fn backup_pattern(prefix: &str) -> Regex {
    Regex::new(&format!(
        r"^{}-(?P<date>\d{{4}}-\d{{2}}-\d{{2}})(?:\.(?P<version>\d{{1,4}}))?\.log$",
        regex::escape(prefix)
    ))
    .expect("backup filename pattern is a valid regex")
}

/// Path of the active log file for `instant` and `version`.
pub(crate) fn resolve_path(
    dir: &Path,
    prefix: &str,
    instant: DateTime<Utc>,
    version: u32,
    tz: TimeZone,
) -> PathBuf {
    let date = tz.date_of(instant).format(DATE_FORMAT);
    dir.join(format!("{prefix}-{date}.{version}{LOG_EXT}"))
}

/// `path` with the gzip extension appended.
pub(crate) fn gzipped_name(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(GZ_EXT);
    PathBuf::from(name)
}

/// A log file on disk whose name matched the grammar and which is not
/// today's active file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BackupFile {
    /// Whole days between now and the file date, both in the sink's zone.
    pub(crate) days_ago: i64,
    /// Parsed version, 0 when the filename carries none.
    pub(crate) version: u32,
    pub(crate) dir: PathBuf,
    pub(crate) name: String,
}

impl BackupFile {
    pub(crate) fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// Offer a directory entry to the grammar.
///
/// Returns `Ok(None)` for names that do not belong to this sink. A name
/// the pattern accepts but whose date the calendar rejects is an error,
/// never a panic.
pub(crate) fn parse_backup(
    dir: &Path,
    name: &str,
    prefix: &str,
    pattern: &Regex,
    now: DateTime<Utc>,
    tz: TimeZone,
) -> Result<Option<BackupFile>> {
    if !name.ends_with(LOG_EXT) || !name.starts_with(prefix) {
        return Ok(None);
    }

    let Some(caps) = pattern.captures(name) else {
        return Ok(None);
    };

    let version = caps
        .name("version")
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0);

    let days_ago = match caps.name("date") {
        Some(m) => day_diff(m.as_str(), now, tz)?,
        None => 0,
    };

    Ok(Some(BackupFile {
        days_ago,
        version,
        dir: dir.to_path_buf(),
        name: name.to_string(),
    }))
}

/// Whole days between `now` and midnight of `date`, both taken in `tz`.
///
/// Integer hour division: a file stamped 23h59m ago is 0 days old, one
/// stamped exactly 24h ago is 1 day old.
pub(crate) fn day_diff(date: &str, now: DateTime<Utc>, tz: TimeZone) -> Result<i64> {
    let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|source| {
        SinkError::MalformedDate {
            date: date.to_string(),
            source,
        }
    })?;

    let midnight = parsed
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time of day");
    let local_now = tz.localize(now).naive_local();

    Ok((local_now - midnight).num_hours() / 24)
}
