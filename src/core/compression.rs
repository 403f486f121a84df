//! Compression support for package bodies.
//!
//! Packages may store their body zlib-compressed; the header carries the
//! uncompressed length, which is checked after inflating but only trusted
//! up to a bound when reserving the output buffer.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Compress data using zlib.
///
/// # Arguments
/// * `data` - Data to compress
/// * `level` - Compression level (1-9, where 1 is fastest and 9 is smallest)
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let compression_level = match level {
        0 | 1 => Compression::fast(),
        2..=5 => Compression::default(),
        _ => Compression::best(),
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), compression_level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Largest up-front reservation, as a multiple of the compressed size.
const MAX_RESERVE_RATIO: usize = 16;

/// Decompress a zlib stream whose uncompressed size is recorded alongside it.
///
/// Inflating stops one byte past `expected_len`, so an oversized stream is
/// reported as a length mismatch instead of being read to the end.
pub fn decompress(data: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let reserve = usize::try_from(expected_len)
        .unwrap_or(usize::MAX)
        .min(data.len().saturating_mul(MAX_RESERVE_RATIO));
    let mut decompressed = Vec::with_capacity(reserve);
    ZlibDecoder::new(data)
        .take(expected_len.saturating_add(1))
        .read_to_end(&mut decompressed)?;

    if decompressed.len() as u64 != expected_len {
        return Err(Error::invalid(format!(
            "decompressed body is {} bytes, header says {}",
            decompressed.len(),
            expected_len
        )));
    }
    Ok(decompressed)
}

/// Check if data appears to be a zlib stream.
pub fn is_compressed(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }

    // zlib header: 0x78 followed by 0x01, 0x5E, 0x9C, or 0xDA
    data[0] == 0x78 && matches!(data[1], 0x01 | 0x5E | 0x9C | 0xDA)
}
