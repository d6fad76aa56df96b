//! Length-prefixed message framing.
//!
//! Every message on the wire is framed as:
//! - A 4-byte big-endian payload length
//! - Exactly that many payload bytes
//!
//! There is no magic number, version field or checksum, so a stream that
//! loses framing cannot resynchronize. Every short read is terminal for the
//! exchange it happens in.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_length_prefix, encode, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD,
    DEFAULT_MAX_RESPONSE_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
