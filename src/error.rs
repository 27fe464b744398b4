use std::io;

/// Errors that can abort an installation run.
///
/// Every variant is fatal: the run stops at the first error, the temporary
/// workspace is removed, and nothing is placed at the destination.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid user configuration (bad checksum option, unknown algorithm,
    /// missing template variable). Surfaced before any network activity
    /// where possible.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP failure: connection error or an unexpected non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Computed digest does not match the trusted digest, or no trusted
    /// digest could be found for the asset.
    #[error("checksum verification failed: {0}")]
    Verification(String),

    /// Unsupported archive type or requested member missing from the
    /// archive.
    #[error("extraction error: {0}")]
    Extraction(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
