use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("header HMAC verification failed")]
    HmacMismatch,

    #[error("authentication failed (wrong password or corrupted data)")]
    Auth,

    #[error("invalid metadata: {0}")]
    InvalidMetadata(&'static str),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("{what}: {got} exceeds limit {max}")]
    SizeBound {
        what: &'static str,
        got: u64,
        max: u64,
    },

    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("output file {0} exists (pass force to overwrite)")]
    Exists(std::path::PathBuf),
}

pub type Result<T> = std::result::Result<T, SlmError>;
