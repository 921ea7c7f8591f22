//! Error types shared by every qrep command

use thiserror::Error;

/// Failures of the report byte format, independent of where the bytes came from
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("report is empty")]
    Empty,

    #[error("corrupt or truncated compression frame: {0}")]
    Compression(String),

    #[error("malformed report payload: {0}")]
    Serialization(#[from] bincode::Error),
}

#[derive(Debug, Error)]
pub enum QrepError {
    #[error("{0}")]
    Config(String),

    #[error("{path}: {source}")]
    Codec {
        path: String,
        #[source]
        source: CodecError,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no common queries across all files")]
    EmptyResult,

    #[error("database error: {0}")]
    Database(String),

    #[error("host {host}: {source}")]
    Host {
        host: String,
        #[source]
        source: Box<QrepError>,
    },
}

impl QrepError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().display().to_string(), source }
    }

    pub fn codec(path: impl AsRef<std::path::Path>, source: CodecError) -> Self {
        Self::Codec { path: path.as_ref().display().to_string(), source }
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn for_host(self, host: impl Into<String>) -> Self {
        Self::Host { host: host.into(), source: Box::new(self) }
    }
}

/// Result type alias for qrep operations
pub type QrepResult<T> = Result<T, QrepError>;
