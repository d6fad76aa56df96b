//! RGB565 pixel data helpers.

use std::fmt::Write as _;

/// Errors from pixel conversion.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("input data size must be even (complete 16-bit values), got {len} bytes")]
    OddLength { len: usize },

    #[error("RGB888 input must be a whole number of 3-byte pixels, got {len} bytes")]
    PartialPixel { len: usize },

    #[error("columns must be greater than zero")]
    ZeroColumns,
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Byte order of 16-bit pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Pack 8-bit channels into one RGB565 value.
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((u16::from(r) & 0xF8) << 8) | ((u16::from(g) & 0xFC) << 3) | (u16::from(b) >> 3)
}

/// Convert packed RGB888 triples into RGB565 bytes in `order`.
pub fn pack_rgb888(data: &[u8], order: ByteOrder) -> Result<Vec<u8>> {
    if data.len() % 3 != 0 {
        return Err(ImageError::PartialPixel { len: data.len() });
    }

    let mut out = Vec::with_capacity(data.len() / 3 * 2);
    for pixel in data.chunks_exact(3) {
        let value = rgb565(pixel[0], pixel[1], pixel[2]);
        out.extend_from_slice(&to_bytes(value, order));
    }
    Ok(out)
}

/// Interpret raw bytes as 16-bit RGB565 values.
pub fn rgb565_values(data: &[u8], order: ByteOrder) -> Result<Vec<u16>> {
    if data.len() % 2 != 0 {
        return Err(ImageError::OddLength { len: data.len() });
    }

    Ok(data
        .chunks_exact(2)
        .map(|pair| match order {
            ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
            ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .collect())
}

/// Re-encode RGB565 data in the device's little-endian layout.
pub fn to_device_order(data: &[u8], order: ByteOrder) -> Result<Vec<u8>> {
    match order {
        ByteOrder::Little => {
            rgb565_values(data, order)?;
            Ok(data.to_vec())
        }
        ByteOrder::Big => Ok(rgb565_values(data, order)?
            .into_iter()
            .flat_map(u16::to_le_bytes)
            .collect()),
    }
}

/// Render values as a C initializer fragment, `columns` values per line.
///
/// ```text
/// // Generated automatically - do not edit
/// 0x0000, 0xFFFF, ...
/// ```
pub fn render_c_array(values: &[u16], columns: usize) -> Result<String> {
    if columns == 0 {
        return Err(ImageError::ZeroColumns);
    }

    let mut out = String::with_capacity(values.len() * 8 + 48);
    out.push_str("// Generated automatically - do not edit\n");
    for (i, value) in values.iter().enumerate() {
        let _ = write!(out, "0x{value:04X}");
        if i + 1 < values.len() {
            out.push_str(", ");
            if (i + 1) % columns == 0 {
                out.push('\n');
            }
        } else {
            out.push('\n');
        }
    }
    Ok(out)
}

fn to_bytes(value: u16, order: ByteOrder) -> [u8; 2] {
    match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    }
}
