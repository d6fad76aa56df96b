//! Host-side tools for a display device that speaks CBOR RPC over a serial link.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream transports (TCP serial emulation, serial ports)
//! - [`frame`]: 4-byte big-endian length-prefixed framing
//! - [`rpc`]: Request/response sessions, client, and a simulated device
//! - [`image`]: RGB565 pixel packing and C array generation

pub mod image;

/// Re-export transport types.
pub mod transport {
    pub use cbor_host_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cbor_host_frame::*;
}

/// Re-export RPC types.
pub mod rpc {
    pub use cbor_host_rpc::*;
}
