//! Seeded log files mimicking what the sink leaves on disk.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// The versioned filename the sink emits for `date`.
pub fn log_name(prefix: &str, date: &str, version: u32) -> String {
    format!("{prefix}-{date}.{version}.log")
}

/// `path` with the gzip extension appended.
pub fn gzipped(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Drop a plain log file into `dir` and return its path.
pub fn seed_log(dir: &Path, prefix: &str, date: &str, version: u32, content: &str) -> PathBuf {
    let path = dir.join(log_name(prefix, date, version));
    fs::write(&path, content).unwrap();
    path
}

/// Drop an already-gzipped backup into `dir` and return its path.
pub fn seed_gzipped_log(
    dir: &Path,
    prefix: &str,
    date: &str,
    version: u32,
    content: &str,
) -> PathBuf {
    let path = gzipped(&dir.join(log_name(prefix, date, version)));
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

/// Decode a gzipped backup back into its original bytes.
pub fn read_gzipped(path: &Path) -> Vec<u8> {
    let mut decoder = GzDecoder::new(File::open(path).unwrap());
    let mut content = Vec::new();
    decoder.read_to_end(&mut content).unwrap();
    content
}
