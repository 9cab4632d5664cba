//! Streaming gzip of aged backups.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::mpsc;

use crate::errors::SinkError;
use crate::filename::gzipped_name;
use crate::options::StatFn;

/// Gzip `src` into `src + ".gz"` and remove the source on success.
///
/// The destination inherits the source's file mode and (on Unix) its
/// ownership. Runs on the blocking pool. Every failure is reported through
/// `errors` and the function returns; the source is left in place so the
/// next scan retries, and a destination that could not be completed is
/// removed. When `followup` is given the gzipped path is pushed onto it
/// for the next stage.
pub(crate) fn compress_and_remove(
    src: &Path,
    stat: &StatFn,
    errors: &mpsc::Sender<SinkError>,
    followup: Option<&mpsc::Sender<PathBuf>>,
) {
    let report = |err: SinkError| {
        let _ = errors.blocking_send(err);
    };

    let mut reader = match File::open(src) {
        Ok(file) => file,
        Err(source) => {
            report(SinkError::Open {
                path: src.to_path_buf(),
                source,
            });
            return;
        }
    };

    let meta = match stat(src) {
        Ok(meta) => meta,
        Err(source) => {
            report(SinkError::Stat {
                path: src.to_path_buf(),
                source,
            });
            return;
        }
    };

    let dst = gzipped_name(src);

    let mut open_options = OpenOptions::new();
    open_options.create(true).truncate(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        open_options.mode(meta.permissions().mode());
    }

    let destination = match open_options.open(&dst) {
        Ok(file) => file,
        Err(source) => {
            report(SinkError::Create {
                path: dst.clone(),
                source,
            });
            return;
        }
    };

    #[cfg(unix)]
    if let Err(err) = chown_to_owner(&dst, &meta) {
        report(err);
        drop(destination);
        let _ = fs::remove_file(&dst);
        return;
    }

    let mut encoder = GzEncoder::new(destination, Compression::default());

    if let Err(source) = io::copy(&mut reader, &mut encoder) {
        report(SinkError::Compress {
            path: src.to_path_buf(),
            source,
        });
        drop(encoder);
        let _ = fs::remove_file(&dst);
        return;
    }

    match encoder.finish() {
        Ok(destination) => drop(destination),
        Err(source) => {
            report(SinkError::Compress {
                path: src.to_path_buf(),
                source,
            });
            let _ = fs::remove_file(&dst);
            return;
        }
    }

    if let Err(source) = fs::remove_file(src) {
        report(SinkError::Remove {
            path: src.to_path_buf(),
            source,
        });
        return;
    }

    if let Some(next) = followup {
        let _ = next.blocking_send(dst);
    }
}

/// Transfer the source file's ownership onto the freshly created
/// destination. No-op on platforms without POSIX owners.
#[cfg(unix)]
fn chown_to_owner(dst: &Path, meta: &fs::Metadata) -> Result<(), SinkError> {
    use std::os::unix::fs::MetadataExt;

    use nix::unistd::{chown, Gid, Uid};

    chown(
        dst,
        Some(Uid::from_raw(meta.uid())),
        Some(Gid::from_raw(meta.gid())),
    )
    .map_err(|errno| SinkError::Chown {
        path: dst.to_path_buf(),
        source: io::Error::from_raw_os_error(errno as i32),
    })
}
