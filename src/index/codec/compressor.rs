//! Pluggable integer-stream compressors used by the block codec.
//!
//! A block stream is compressed in one shot; the compressor does not store
//! the value count, the block header does. Decompression must fail instead of
//! yielding a partially decoded stream.

use crate::error::{Error, Result};
use crate::index::types::CompressorKind;
use crate::utils::{MAX_VARINT_LEN, VarIntReader, encode_varint};
use std::sync::Arc;

/// Compresses a block of unsigned integers.
pub trait BlockCompressor: Send + Sync {
    /// Append the compressed form of `input` to `output`.
    fn compress(&self, input: &[u32], output: &mut Vec<u8>);

    /// Decode exactly `count` values from `input`, which must be consumed entirely.
    fn decompress(&self, input: &[u8], count: usize, output: &mut Vec<u32>) -> Result<()>;

    /// Fixed per-stream overhead in bytes.
    fn header_size(&self) -> usize;

    /// Worst-case bytes per compressed value.
    fn max_compressed_value_size(&self) -> usize;

    /// Most values `input` can decode to. A larger declared count is corrupt.
    fn max_values(&self, input: &[u8]) -> usize;

    /// Capacity needed to compress `count` values without reallocating.
    fn max_compressed_len(&self, count: usize) -> usize {
        self.max_compressed_value_size() * count + self.header_size()
    }
}

pub type SharedCompressor = Arc<dyn BlockCompressor>;

/// Build the compressor registered for `kind`.
pub fn compressor_for(kind: CompressorKind) -> SharedCompressor {
    match kind {
        CompressorKind::VarInt => Arc::new(VarIntCompressor),
        CompressorKind::BitPack => Arc::new(BitPackCompressor),
    }
}

/// LEB128 varints, one per value.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarIntCompressor;

impl BlockCompressor for VarIntCompressor {
    fn compress(&self, input: &[u32], output: &mut Vec<u8>) {
        for &value in input {
            encode_varint(value, output);
        }
    }

    fn decompress(&self, input: &[u8], count: usize, output: &mut Vec<u32>) -> Result<()> {
        output.clear();
        if count > self.max_values(input) {
            return Err(Error::corrupt(
                "varint stream",
                format!("{} values declared in {} bytes", count, input.len()),
            ));
        }
        output.reserve(count);
        let mut reader = VarIntReader::new(input, "varint stream");
        for _ in 0..count {
            match reader.read() {
                Ok(value) => output.push(value),
                Err(err) => {
                    output.clear();
                    return Err(err);
                }
            }
        }
        if !reader.is_empty() {
            output.clear();
            return Err(Error::corrupt(
                "varint stream",
                format!("{} trailing bytes after {} values", input.len() - reader.position(), count),
            ));
        }
        Ok(())
    }

    fn header_size(&self) -> usize {
        0
    }

    fn max_compressed_value_size(&self) -> usize {
        MAX_VARINT_LEN
    }

    fn max_values(&self, input: &[u8]) -> usize {
        input.len()
    }
}

/// Frame-of-reference bit packing.
///
/// Layout: `width: u8`, `min: u32 LE`, then `count * width` bits holding
/// `value - min`, least significant bits first.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitPackCompressor;

const BITPACK_HEADER: usize = 5;

/// Longest run stored with zero width; longer constant runs use one bit per value.
pub const MAX_CONSTANT_RUN: usize = 1 << 16;

impl BlockCompressor for BitPackCompressor {
    fn compress(&self, input: &[u32], output: &mut Vec<u8>) {
        let min = input.iter().copied().min().unwrap_or(0);
        let max = input.iter().copied().max().unwrap_or(0);
        let mut width = 32 - (max - min).leading_zeros();
        if width == 0 && input.len() > MAX_CONSTANT_RUN {
            width = 1;
        }

        output.push(width as u8);
        output.extend_from_slice(&min.to_le_bytes());

        if width == 0 {
            return;
        }

        let mut acc: u64 = 0;
        let mut bits = 0u32;
        for &value in input {
            acc |= ((value - min) as u64) << bits;
            bits += width;
            while bits >= 8 {
                output.push(acc as u8);
                acc >>= 8;
                bits -= 8;
            }
        }
        if bits > 0 {
            output.push(acc as u8);
        }
    }

    fn decompress(&self, input: &[u8], count: usize, output: &mut Vec<u32>) -> Result<()> {
        output.clear();
        if input.len() < BITPACK_HEADER {
            return Err(Error::corrupt(
                "bitpack stream",
                format!("{} bytes is shorter than the header", input.len()),
            ));
        }
        let width = input[0] as u32;
        if width > 32 {
            return Err(Error::corrupt("bitpack stream", format!("invalid bit width {}", width)));
        }
        if count > self.max_values(input) {
            return Err(Error::corrupt(
                "bitpack stream",
                format!("{} values of {} bits declared in {} bytes", count, width, input.len()),
            ));
        }
        let min = u32::from_le_bytes([input[1], input[2], input[3], input[4]]);
        let payload = &input[BITPACK_HEADER..];
        let expected = (count * width as usize).div_ceil(8);
        if payload.len() != expected {
            return Err(Error::corrupt(
                "bitpack stream",
                format!(
                    "{} values of {} bits need {} bytes, found {}",
                    count,
                    width,
                    expected,
                    payload.len()
                ),
            ));
        }

        output.reserve(count);
        if width == 0 {
            output.resize(count, min);
            return Ok(());
        }

        let mask: u64 = (1u64 << width) - 1;
        let mut acc: u64 = 0;
        let mut bits = 0u32;
        let mut bytes = payload.iter();
        for _ in 0..count {
            while bits < width {
                // length was checked above
                let byte = bytes.next().copied().unwrap_or(0);
                acc |= (byte as u64) << bits;
                bits += 8;
            }
            let delta = (acc & mask) as u32;
            output.push(min.wrapping_add(delta));
            acc >>= width;
            bits -= width;
        }
        Ok(())
    }

    fn header_size(&self) -> usize {
        BITPACK_HEADER
    }

    fn max_compressed_value_size(&self) -> usize {
        4
    }

    fn max_values(&self, input: &[u8]) -> usize {
        match input.first().map(|&w| w as usize) {
            None => 0,
            Some(0) => MAX_CONSTANT_RUN,
            Some(width) if width <= 32 => {
                input.len().saturating_sub(BITPACK_HEADER) * 8 / width
            }
            Some(_) => 0,
        }
    }
}
