use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("target directory is not set")]
    DirectoryNotSet,

    #[error("cannot write {size} bytes at once, the file size cap is {max}")]
    PayloadTooLarge { size: usize, max: u64 },

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create log file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open {path} for append: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write to {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not close {path}: {source}")]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse date {date} in log file name: {source}")]
    MalformedDate {
        date: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to compress {path}: {source}")]
    Compress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to change ownership of {path}: {source}")]
    Chown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to upload {path}: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<SinkError> for io::Error {
    fn from(err: SinkError) -> Self {
        let kind = match &err {
            SinkError::PayloadTooLarge { .. } | SinkError::DirectoryNotSet => {
                io::ErrorKind::InvalidInput
            }
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;
