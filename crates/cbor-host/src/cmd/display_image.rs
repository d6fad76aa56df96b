use std::fs;

use cbor_host::image::{pack_rgb888, to_device_order, ByteOrder};
use cbor_host_rpc::{Request, IMAGE_DATA_SIZE};
use tracing::{debug, warn};

use crate::cmd::{call, DisplayImageArgs};
use crate::exit::{image_error, io_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: DisplayImageArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let pixels = device_pixels(&raw, args.rgb888, args.endian)?;

    if pixels.len() != IMAGE_DATA_SIZE {
        warn!(
            bytes = pixels.len(),
            expected = IMAGE_DATA_SIZE,
            "image does not cover the full display"
        );
    }
    debug!(bytes = pixels.len(), "sending image");

    call::execute(&args.connection, &Request::display_image(pixels), format)
}

/// RGB565 bytes in device (little-endian) order.
fn device_pixels(raw: &[u8], rgb888: bool, endian: ByteOrder) -> CliResult<Vec<u8>> {
    if rgb888 {
        pack_rgb888(raw, ByteOrder::Little).map_err(|err| image_error("invalid image", err))
    } else {
        to_device_order(raw, endian).map_err(|err| image_error("invalid image", err))
    }
}
