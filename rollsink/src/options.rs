//! Builder-style configuration for the sink.
//!
//! Every knob has a `with_`-free, chainable method; `build()` validates the
//! configuration and spawns the background supervisor, so it must be called
//! inside a Tokio runtime.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

use crate::errors::Result;
use crate::uploader::Uploader;
use crate::writer::RollSink;

/// Injectable clock returning the current instant in UTC.
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Injectable stat syscall.
pub type StatFn = Arc<dyn Fn(&Path) -> io::Result<Metadata> + Send + Sync>;

pub(crate) const MEGABYTE: u64 = 1024 * 1024;

const DEFAULT_MAX_MEGABYTES: u64 = 50;
const DEFAULT_MAX_BACKUPS: usize = 5;
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Time zone used for filename dating and day arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub enum TimeZone {
    /// Coordinated universal time (the default).
    #[default]
    Utc,
    /// The system local time zone.
    Local,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl TimeZone {
    /// `instant` expressed in this zone with a fixed offset.
    pub(crate) fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            TimeZone::Utc => instant.fixed_offset(),
            TimeZone::Local => instant.with_timezone(&Local).fixed_offset(),
            TimeZone::Fixed(offset) => instant.with_timezone(offset),
        }
    }

    /// Calendar date of `instant` in this zone.
    pub(crate) fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.localize(instant).date_naive()
    }
}

/// Which background strategy runs against aged backups.
#[derive(Clone)]
pub(crate) enum PolicyKind {
    Retention,
    LocalCompression,
    CloudCompression(Arc<dyn Uploader>),
}

/// Fully resolved sink configuration, immutable after `build()`.
pub(crate) struct SinkConfig {
    pub(crate) prefix: String,
    pub(crate) directory: PathBuf,
    pub(crate) max_file_bytes: u64,
    pub(crate) max_backups: usize,
    pub(crate) timezone: TimeZone,
    pub(crate) tick_interval: Duration,
    pub(crate) policy: PolicyKind,
    pub(crate) now: NowFn,
    pub(crate) stat: StatFn,
}

/// Configures and creates a [`RollSink`].
///
/// ```no_run
/// # async fn demo() -> rollsink::Result<()> {
/// let sink = rollsink::RollSinkBuilder::new("app", "/var/log/app")
///     .max_megabytes(100)
///     .max_backups(7)
///     .compression()
///     .build()?;
/// # Ok(()) }
/// ```
pub struct RollSinkBuilder {
    prefix: String,
    directory: PathBuf,
    max_file_bytes: u64,
    max_backups: usize,
    timezone: TimeZone,
    tick_interval: Duration,
    policy: PolicyKind,
    now: NowFn,
    stat: StatFn,
}

impl RollSinkBuilder {
    pub fn new(prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            directory: directory.into(),
            max_file_bytes: DEFAULT_MAX_MEGABYTES * MEGABYTE,
            max_backups: DEFAULT_MAX_BACKUPS,
            timezone: TimeZone::Utc,
            tick_interval: DEFAULT_TICK_INTERVAL,
            policy: PolicyKind::Retention,
            now: Arc::new(Utc::now),
            stat: Arc::new(|path: &Path| std::fs::metadata(path)),
        }
    }

    /// Rotation threshold in mebibytes.
    pub fn max_megabytes(mut self, n: u64) -> Self {
        self.max_file_bytes = n * MEGABYTE;
        self
    }

    /// Rotation threshold as an exact byte count.
    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.max_file_bytes = n;
        self
    }

    /// Time zone for filename dating and day arithmetic.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// How many backups the retention policy keeps.
    pub fn max_backups(mut self, n: usize) -> Self {
        self.max_backups = n;
        self
    }

    /// Gzip aged backups in place instead of trimming them.
    pub fn compression(mut self) -> Self {
        self.policy = PolicyKind::LocalCompression;
        self
    }

    /// Gzip aged backups, ship them through `uploader`, then delete the
    /// local copy.
    pub fn compression_and_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.policy = PolicyKind::CloudCompression(uploader);
        self
    }

    /// How often the supervisor wakes the storage policy.
    pub fn next_tick(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Inject a clock. Used by tests to freeze time.
    pub fn now_fn(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    /// Inject a stat syscall. Used by tests to fake filesystem answers.
    pub fn stat_fn(mut self, stat: StatFn) -> Self {
        self.stat = stat;
        self
    }

    /// Validate the configuration and start the sink.
    ///
    /// Spawns the background supervisor, so this must run inside a Tokio
    /// runtime.
    ///
    /// # Errors
    /// Returns [`crate::SinkError::DirectoryNotSet`] when the directory is
    /// empty.
    pub fn build(self) -> Result<RollSink> {
        RollSink::new(SinkConfig {
            prefix: self.prefix,
            directory: self.directory,
            max_file_bytes: self.max_file_bytes,
            max_backups: self.max_backups,
            timezone: self.timezone,
            tick_interval: self.tick_interval,
            policy: self.policy,
            now: self.now,
            stat: self.stat,
        })
    }
}
