/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The read deadline elapsed before any byte of the frame arrived.
    ///
    /// The stream is still byte-aligned, so the caller may retry.
    #[error("timed out waiting for frame")]
    Timeout,

    /// Fewer than 4 length-prefix bytes were available.
    #[error("short frame header ({received} of 4 bytes)")]
    ShortHeader { received: usize },

    /// The stream ended or timed out before the declared payload was complete.
    #[error("short frame payload ({received} of {expected} bytes)")]
    ShortPayload { expected: usize, received: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a frame started, or a write made no progress.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true if the stream can no longer be trusted to be frame-aligned.
    pub fn loses_sync(&self) -> bool {
        matches!(
            self,
            FrameError::ShortHeader { .. }
                | FrameError::ShortPayload { .. }
                | FrameError::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
