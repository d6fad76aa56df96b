use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::Bytes;
use cbor_host_transport::{is_deadline_error, ByteTransport};
use tracing::{debug, warn};

use crate::codec::{decode_length_prefix, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Why a fill stopped short.
enum Fill {
    Complete,
    Deadline(usize),
    Closed(usize),
}

/// Reads complete frames from any `Read` stream.
///
/// Reads exactly the bytes of one frame and nothing more, so whatever
/// follows a frame stays in the stream for the next caller.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame payload. Each read blocks up to the
    /// stream's own timeout; see [`read_frame_bounded`](Self::read_frame_bounded)
    /// for a limit on the whole frame.
    ///
    /// - nothing arrives before the deadline: [`FrameError::Timeout`]
    /// - the stream ends before a frame starts: [`FrameError::ConnectionClosed`]
    /// - 1 to 3 header bytes: [`FrameError::ShortHeader`]
    /// - declared length above the limit: [`FrameError::PayloadTooLarge`],
    ///   with none of the payload consumed
    /// - payload cut short: [`FrameError::ShortPayload`]
    pub fn read_frame(&mut self) -> Result<Bytes> {
        self.read_frame_with(fill)
    }

    fn read_frame_with<F>(&mut self, mut fill: F) -> Result<Bytes>
    where
        F: FnMut(&mut T, &mut [u8]) -> Result<Fill>,
    {
        let mut header = [0u8; HEADER_SIZE];
        match fill(&mut self.inner, &mut header)? {
            Fill::Complete => {}
            Fill::Deadline(0) => return Err(FrameError::Timeout),
            Fill::Closed(0) => return Err(FrameError::ConnectionClosed),
            Fill::Deadline(received) | Fill::Closed(received) => {
                warn!(received, "frame header cut short");
                return Err(FrameError::ShortHeader { received });
            }
        }

        let len = decode_length_prefix(&header)? as usize;
        if len > self.config.max_payload_size {
            warn!(
                len,
                max = self.config.max_payload_size,
                "rejecting oversized frame"
            );
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.config.max_payload_size,
            });
        }
        debug!(len, "frame header decoded");

        let mut payload = vec![0u8; len];
        match fill(&mut self.inner, &mut payload)? {
            Fill::Complete => Ok(Bytes::from(payload)),
            Fill::Deadline(received) | Fill::Closed(received) => {
                warn!(expected = len, received, "frame payload cut short");
                Err(FrameError::ShortPayload {
                    expected: len,
                    received,
                })
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: ByteTransport> FrameReader<T> {
    /// Read the next frame with the header read and the payload read each
    /// bounded as a whole by the read timeout.
    ///
    /// The limit is `config.read_timeout`, or the transport's own timeout
    /// when the config sets none. A peer that trickles bytes cannot hold
    /// either read open past its deadline: whatever arrived by then is a
    /// [`FrameError::ShortHeader`] or [`FrameError::ShortPayload`]. The
    /// transport's timeout is restored before returning.
    pub fn read_frame_bounded(&mut self) -> Result<Bytes> {
        let configured = self.inner.read_timeout();
        let Some(limit) = self.config.read_timeout.or(configured) else {
            return self.read_frame();
        };

        let result = self.read_frame_with(|inner, buf| fill_within(inner, buf, limit));
        let restored = self
            .inner
            .set_read_timeout(configured)
            .map_err(transport_to_frame_error);
        let frame = result?;
        restored?;
        Ok(frame)
    }
}

/// Read into `buf` until it is full, the deadline elapses, or the stream ends.
fn fill<T: Read>(inner: &mut T, buf: &mut [u8]) -> Result<Fill> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => return Ok(Fill::Closed(filled)),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_deadline_error(&err) => return Ok(Fill::Deadline(filled)),
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(Fill::Complete)
}

/// Like [`fill`], but every read waits only for what is left of `limit`.
fn fill_within<T: ByteTransport>(inner: &mut T, buf: &mut [u8], limit: Duration) -> Result<Fill> {
    let Some(deadline) = Instant::now().checked_add(limit) else {
        return fill(inner, buf);
    };

    let mut filled = 0usize;
    while filled < buf.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(Fill::Deadline(filled));
        }
        inner
            .set_read_timeout(Some(remaining))
            .map_err(transport_to_frame_error)?;
        match inner.read(&mut buf[filled..]) {
            Ok(0) => return Ok(Fill::Closed(filled)),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_deadline_error(&err) => return Ok(Fill::Deadline(filled)),
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(Fill::Complete)
}

pub(crate) fn transport_to_frame_error(err: cbor_host_transport::TransportError) -> FrameError {
    match err {
        cbor_host_transport::TransportError::Io(io) => FrameError::Io(io),
        cbor_host_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
