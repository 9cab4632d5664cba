//! Rotating log-sink: date-stamped, size-capped append files with
//! background retention, compression and cloud off-load.
//!
//! A [`RollSink`] is a write-only byte stream. Every write appends to
//! `{dir}/{prefix}-{YYYY-MM-DD}.{version}.log`, rotating to the next
//! version when the size cap would be crossed and starting at version 1
//! when the calendar date advances. A background supervisor periodically
//! runs one storage policy against the aged backups in the same
//! directory: trim them to a count, gzip them in place, or gzip and ship
//! them through an injected [`Uploader`]. Writer and policies coordinate
//! only through the filename grammar, so there is no cross-component
//! locking to corrupt.
//!
//! ```no_run
//! use std::io::Write;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sink = rollsink::RollSinkBuilder::new("app", "/var/log/app")
//!         .max_megabytes(100)
//!         .max_backups(7)
//!         .build()?;
//!
//!     writeln!(sink, "hello")?;
//!     sink.close()?;
//!     Ok(())
//! }
//! ```

mod compress;
mod filename;
mod scan;
mod storage;
mod supervisor;

pub mod errors;
pub mod options;
pub mod uploader;
pub mod writer;

pub use errors::{Result, SinkError};
pub use options::{NowFn, RollSinkBuilder, StatFn, TimeZone};
pub use uploader::Uploader;
pub use writer::RollSink;
