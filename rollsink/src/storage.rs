//! Background storage policies operating on scanned backups.
//!
//! A policy reacts to each pulse on its run channel with one scan-and-act
//! cycle. Cycles never overlap: pulses that arrive while a cycle is in
//! flight are dropped, which bounds parallelism when the work is slower
//! than the supervisor tick.

use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::compress::compress_and_remove;
use crate::errors::SinkError;
use crate::filename::BackupFile;
use crate::options::{NowFn, StatFn, TimeZone};
use crate::scan::scan_backups;
use crate::uploader::Uploader;

/// Fields every policy needs to scan and act on the sink's directory.
pub(crate) struct PolicyContext {
    pub(crate) dir: PathBuf,
    pub(crate) prefix: String,
    pub(crate) pattern: Regex,
    pub(crate) tz: TimeZone,
    pub(crate) now: NowFn,
    pub(crate) stat: StatFn,
}

pub(crate) enum StoragePolicy {
    /// Trim the backup set down to `max_backups`, oldest first.
    Retention { max_backups: usize },
    /// Gzip every backup in place.
    LocalCompression,
    /// Gzip every backup, ship it, delete the local copy.
    CloudCompression { uploader: Arc<dyn Uploader> },
}

impl StoragePolicy {
    /// Policy loop: one cycle per pulse until the run channel closes.
    pub(crate) async fn start(
        self,
        ctx: PolicyContext,
        mut run_rx: mpsc::Receiver<()>,
        err_tx: mpsc::Sender<SinkError>,
    ) {
        while run_rx.recv().await.is_some() {
            self.run_cycle(&ctx, &err_tx).await;
            // Pulses that arrived mid-cycle are stale, not queued work.
            while run_rx.try_recv().is_ok() {}
        }
    }

    async fn run_cycle(&self, ctx: &PolicyContext, err_tx: &mpsc::Sender<SinkError>) {
        let backups = {
            let dir = ctx.dir.clone();
            let prefix = ctx.prefix.clone();
            let pattern = ctx.pattern.clone();
            let now = (ctx.now)();
            let tz = ctx.tz;
            match spawn_blocking(move || scan_backups(&dir, &prefix, &pattern, now, tz)).await {
                Ok(Ok(backups)) => backups,
                Ok(Err(err)) => {
                    let _ = err_tx.send(err).await;
                    return;
                }
                Err(join_err) => {
                    warn!("backup scan task failed: {join_err}");
                    return;
                }
            }
        };

        match self {
            StoragePolicy::Retention { max_backups } => {
                retention_cycle(backups, *max_backups, err_tx).await;
            }
            StoragePolicy::LocalCompression => {
                compression_cycle(ctx, backups, err_tx, None).await;
            }
            StoragePolicy::CloudCompression { uploader } => {
                cloud_cycle(ctx, backups, Arc::clone(uploader), err_tx).await;
            }
        }
    }
}

/// Delete the oldest backups in excess of `max_backups`, concurrently.
///
/// The deletion set is materialised up front; exactly those files are
/// removed. Per-file failures are reported and skipped, never aborting
/// the cycle.
async fn retention_cycle(
    backups: Vec<BackupFile>,
    max_backups: usize,
    err_tx: &mpsc::Sender<SinkError>,
) {
    if backups.len() <= max_backups {
        return;
    }

    let excess = backups.len() - max_backups;
    let doomed: Vec<PathBuf> = backups[..excess].iter().map(BackupFile::path).collect();
    debug!(count = doomed.len(), "trimming old backups");

    let mut workers = Vec::with_capacity(doomed.len());
    for path in doomed {
        let err_tx = err_tx.clone();
        workers.push(spawn_blocking(move || {
            if let Err(source) = std::fs::remove_file(&path) {
                let _ = err_tx.blocking_send(SinkError::Remove { path, source });
            }
        }));
    }
    for worker in workers {
        let _ = worker.await;
    }
}

/// Gzip every backup, one blocking worker per file, and wait for the
/// whole batch.
async fn compression_cycle(
    ctx: &PolicyContext,
    backups: Vec<BackupFile>,
    err_tx: &mpsc::Sender<SinkError>,
    followup: Option<mpsc::Sender<PathBuf>>,
) {
    if !backups.is_empty() {
        debug!(count = backups.len(), "compressing backups");
    }

    let mut workers = Vec::with_capacity(backups.len());
    for backup in backups {
        let stat = Arc::clone(&ctx.stat);
        let err_tx = err_tx.clone();
        let followup = followup.clone();
        workers.push(spawn_blocking(move || {
            compress_and_remove(&backup.path(), &stat, &err_tx, followup.as_ref());
        }));
    }
    for worker in workers {
        let _ = worker.await;
    }
}

/// Gzip every backup and hand each resulting `.gz` to an upload fan-out,
/// which deletes the local copy once the uploader accepts it.
///
/// At-least-once: a `.gz` whose deletion fails is reported and left
/// behind, invisible to future scans.
async fn cloud_cycle(
    ctx: &PolicyContext,
    backups: Vec<BackupFile>,
    uploader: Arc<dyn Uploader>,
    err_tx: &mpsc::Sender<SinkError>,
) {
    let (gz_tx, mut gz_rx) = mpsc::channel::<PathBuf>(backups.len().max(1));

    let upload_err_tx = err_tx.clone();
    let shipper = tokio::spawn(async move {
        let mut uploads = Vec::new();
        while let Some(gz_path) = gz_rx.recv().await {
            let uploader = Arc::clone(&uploader);
            let err_tx = upload_err_tx.clone();
            uploads.push(spawn_blocking(move || {
                match uploader.upload(&gz_path) {
                    Ok(()) => {
                        if let Err(source) = std::fs::remove_file(&gz_path) {
                            let _ = err_tx.blocking_send(SinkError::Remove {
                                path: gz_path,
                                source,
                            });
                        }
                    }
                    Err(source) => {
                        let _ = err_tx.blocking_send(SinkError::Upload {
                            path: gz_path,
                            source,
                        });
                    }
                }
            }));
        }
        for upload in uploads {
            let _ = upload.await;
        }
    });

    compression_cycle(ctx, backups, err_tx, Some(gz_tx)).await;

    // All compression workers have dropped their channel clones by now;
    // wait for the in-flight uploads to drain.
    let _ = shipper.await;
}
