//! Error types

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tor error
    #[error("Tor error: {0}")]
    Tor(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Shutdown was requested while waiting
    #[error("Interrupted")]
    Interrupted,

    /// Setup routine exited without opening the barrier
    #[error("Tor bootstrap ended without becoming ready")]
    BootstrapAbandoned,

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),

    /// Parameter or config error
    #[error(transparent)]
    Params(#[from] umbra_params::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
