//! The sink itself: a thread-safe append stream with size-based and
//! date-based rotation.
//!
//! `RollSink` presents itself as a plain byte sink (`io::Write`); behind
//! that façade every write runs the rotation decision: continue appending
//! to the current file, bump the version because the size cap would be
//! crossed, or start a new day. The background supervisor and storage
//! policy share the directory with the writer but coordinate with it only
//! through the filename grammar.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::errors::{Result, SinkError};
use crate::filename::{backup_pattern, resolve_path};
use crate::options::{PolicyKind, SinkConfig};
use crate::storage::{PolicyContext, StoragePolicy};
use crate::supervisor::{spawn_supervisor, ObserverList};

struct WriterState {
    /// Version counter for the cached date, always ≥ 1.
    version: u32,
    /// Path of the file currently open for writing.
    path: PathBuf,
    file: Option<File>,
    /// Bytes written through the handle since it was opened, plus the
    /// size observed on disk at open time.
    size: u64,
    /// Cached calendar date in the sink's zone.
    date: NaiveDate,
}

/// A rotating log sink.
///
/// Writes append to `{dir}/{prefix}-{date}.{version}.log`, rotating to the
/// next version when the size cap would be crossed and to version 1 of a
/// new file when the calendar date advances. Create one with
/// [`crate::RollSinkBuilder`].
pub struct RollSink {
    config: SinkConfig,
    state: RwLock<WriterState>,
    observers: ObserverList,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl std::fmt::Debug for RollSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RollSink")
            .field("prefix", &self.config.prefix)
            .field("directory", &self.config.directory)
            .field("max_file_bytes", &self.config.max_file_bytes)
            .field("version", &state.version)
            .field("path", &state.path)
            .field("size", &state.size)
            .finish()
    }
}

impl RollSink {
    pub(crate) fn new(config: SinkConfig) -> Result<Self> {
        if config.directory.as_os_str().is_empty() {
            return Err(SinkError::DirectoryNotSet);
        }

        let observers: ObserverList = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let policy = match &config.policy {
            PolicyKind::Retention => StoragePolicy::Retention {
                max_backups: config.max_backups,
            },
            PolicyKind::LocalCompression => StoragePolicy::LocalCompression,
            PolicyKind::CloudCompression(uploader) => StoragePolicy::CloudCompression {
                uploader: Arc::clone(uploader),
            },
        };
        let ctx = PolicyContext {
            dir: config.directory.clone(),
            prefix: config.prefix.clone(),
            pattern: backup_pattern(&config.prefix),
            tz: config.timezone,
            now: Arc::clone(&config.now),
            stat: Arc::clone(&config.stat),
        };
        spawn_supervisor(
            policy,
            ctx,
            config.tick_interval,
            shutdown_rx,
            Arc::clone(&observers),
        );

        let date = config.timezone.date_of((config.now)());

        Ok(Self {
            state: RwLock::new(WriterState {
                version: 1,
                path: PathBuf::new(),
                file: None,
                size: 0,
                date,
            }),
            config,
            observers,
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }

    /// Register a channel that receives background policy errors.
    /// Delivery is best-effort: a full channel loses the notification.
    pub fn notify_on_error(&self, observer: mpsc::Sender<Arc<SinkError>>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Path of the file writes currently target. Empty before the first
    /// write.
    pub fn current_path(&self) -> PathBuf {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .path
            .clone()
    }

    /// Flush the active handle, signal the supervisor to stop, and clear
    /// the writer state. Idempotent; writes after `close` reopen files but
    /// no policy runs against them.
    pub fn close(&self) -> Result<()> {
        if let Some(shutdown) = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = shutdown.send(());
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = state.file.take() {
            let path = std::mem::take(&mut state.path);
            state.size = 0;
            file.sync_all()
                .map_err(|source| SinkError::Close { path, source })?;
        }
        Ok(())
    }

    fn write_bytes(&self, payload: &[u8]) -> Result<usize> {
        let max = self.config.max_file_bytes;
        if payload.len() as u64 > max {
            return Err(SinkError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.juggle(&mut state, payload.len() as u64)?;

        let mut handle = state
            .file
            .as_ref()
            .expect("rotation always leaves an open handle");
        let written = handle.write(payload).map_err(|source| SinkError::Write {
            path: state.path.clone(),
            source,
        })?;
        state.size += written as u64;
        Ok(written)
    }

    /// The rotation decision. On return the state holds an open handle
    /// whose file can absorb `incoming` more bytes without crossing the
    /// cap.
    ///
    /// A file already at the cap bumps the version and retries, so a
    /// rotation never truncates an existing file; the loop terminates as
    /// soon as it reaches a version with room, at worst one past the
    /// versions already on disk.
    fn juggle(&self, state: &mut WriterState, incoming: u64) -> Result<()> {
        let max = self.config.max_file_bytes;

        loop {
            let now = (self.config.now)();
            let today = self.config.timezone.date_of(now);
            if today != state.date {
                // A new calendar day starts its own version space.
                self.close_handle(state)?;
                state.date = today;
                state.version = 1;
            }

            let target = resolve_path(
                &self.config.directory,
                &self.config.prefix,
                now,
                state.version,
                self.config.timezone,
            );

            match (self.config.stat)(&target) {
                Err(source) if source.kind() == io::ErrorKind::NotFound => {
                    self.close_handle(state)?;
                    self.create(state, &target)?;
                    return Ok(());
                }
                Err(source) => {
                    return Err(SinkError::Stat {
                        path: target,
                        source,
                    });
                }
                Ok(meta) => {
                    let on_disk = meta.len();
                    if on_disk + incoming >= max || state.size + incoming > max {
                        self.close_handle(state)?;
                        state.version += 1;
                        debug!(version = state.version, "log file at cap, rotating");
                        continue;
                    }
                    if state.path == target && state.file.is_some() && state.size == on_disk {
                        return Ok(());
                    }
                    self.close_handle(state)?;
                    self.open_append(state, &target, on_disk)?;
                    return Ok(());
                }
            }
        }
    }

    fn create(&self, state: &mut WriterState, target: &Path) -> Result<()> {
        let mut dir_builder = DirBuilder::new();
        dir_builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            dir_builder.mode(0o755);
        }
        dir_builder
            .create(&self.config.directory)
            .map_err(|source| SinkError::CreateDir {
                path: self.config.directory.clone(),
                source,
            })?;

        let mut open_options = OpenOptions::new();
        open_options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open_options.mode(0o600);
        }
        let file = open_options
            .open(target)
            .map_err(|source| SinkError::Create {
                path: target.to_path_buf(),
                source,
            })?;

        debug!(path = %target.display(), "created log file");
        state.file = Some(file);
        state.path = target.to_path_buf();
        state.size = 0;
        Ok(())
    }

    fn open_append(&self, state: &mut WriterState, target: &Path, on_disk: u64) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(target)
            .map_err(|source| SinkError::Open {
                path: target.to_path_buf(),
                source,
            })?;

        state.file = Some(file);
        state.path = target.to_path_buf();
        state.size = on_disk;
        Ok(())
    }

    fn close_handle(&self, state: &mut WriterState) -> Result<()> {
        if let Some(file) = state.file.take() {
            file.sync_all().map_err(|source| SinkError::Close {
                path: state.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl Write for RollSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl Write for &RollSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = state.file.as_ref() {
            let mut handle = file;
            handle.flush()?;
        }
        Ok(())
    }
}

impl Drop for RollSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
