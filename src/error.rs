use thiserror::Error;

/// Top-level error type for the crate
///
/// Facade operations return [`TransportError`](crate::TransportError)
/// directly; this type covers configuration and the binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key error: {0}")]
    Key(#[from] russh::keys::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
