/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint string could not be interpreted.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The serial port could not be opened or configured. Only
    /// `SerialDevice` produces it, so builds without `serial` never see it.
    #[error("serial port {path}: {message}")]
    Serial { path: String, message: String },

    /// The requested transport is not available in this build.
    #[error("unsupported transport: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, TransportError>;
