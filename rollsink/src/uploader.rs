//! Cloud off-load capability.

use std::path::Path;

/// Ships a gzipped backup to remote storage.
///
/// The cloud-compression policy calls `upload` once per gzipped backup and
/// deletes the local copy when it returns `Ok`. Endpoint, bucket, ACL and
/// credentials are the implementor's business; implementations should
/// expect at-least-once delivery.
pub trait Uploader: Send + Sync {
    fn upload(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
