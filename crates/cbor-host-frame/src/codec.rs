use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: big-endian payload length = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Cap used by [`FrameConfig::default`], and so by `FrameReader::new` and
/// `FrameWriter::new`: 16 MiB. Sessions replace it with per-direction
/// limits sized to the device.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Largest response a device is expected to send.
pub const DEFAULT_MAX_RESPONSE_PAYLOAD: usize = 1024;

/// Encode a payload into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────────┐
/// │ Length (4B BE) │ Payload          │
/// │                │ (Length bytes)   │
/// └────────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a payload into a freshly allocated frame.
pub fn encode(payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    encode_frame(payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Interpret the first 4 bytes of `header` as a big-endian length.
///
/// Bytes past the fourth are ignored.
pub fn decode_length_prefix(header: &[u8]) -> Result<u32> {
    match header.get(..HEADER_SIZE) {
        Some(&[b0, b1, b2, b3]) => Ok(u32::from_be_bytes([b0, b1, b2, b3])),
        _ => Err(FrameError::ShortHeader {
            received: header.len(),
        }),
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: [`DEFAULT_MAX_PAYLOAD`].
    pub max_payload_size: usize,
    /// Limit on the whole header read and on the whole payload read in
    /// `FrameReader::read_frame_bounded`. `None` defers to the transport.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
        }
    }
}
