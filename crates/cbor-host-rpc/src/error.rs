use cbor_host_transport::TransportError;

/// Errors from the CBOR payload codec.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The value could not be serialized.
    #[error("cbor encode failed: {0}")]
    Encode(String),

    /// The bytes are not a valid CBOR item (truncated, corrupt, or empty).
    #[error("cbor decode failed: {0}")]
    Decode(String),

    /// A complete item was decoded but bytes remained after it.
    #[error("{trailing} trailing bytes after cbor item")]
    TrailingBytes { trailing: usize },

    /// The value decoded but does not have the requested shape.
    #[error("unexpected value shape: {0}")]
    Shape(String),
}

/// Protocol-level failures. Each leaves the stream in an unknown framing
/// state, so the transport should be reset or reopened before reuse.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Fewer than 4 length-prefix bytes arrived.
    #[error("short frame header ({received} of 4 bytes)")]
    ShortHeader { received: usize },

    /// The declared payload did not arrive in full.
    #[error("short frame payload ({received} of {expected} bytes)")]
    ShortPayload { expected: usize, received: usize },

    /// A frame exceeded the size policy for its direction.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload was not a decodable structured value.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[source] PayloadError),
}

/// Failure of one exchange, as returned by [`crate::SessionOutcome::into_result`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Framing or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Nothing arrived before the read deadline. The stream is still aligned.
    #[error("timed out waiting for response")]
    Timeout,

    /// The transport failed (write error, disconnection).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
