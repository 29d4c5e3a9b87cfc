use crate::error::{Error, Result};

/// Upper bound on the encoded size of a u32 varint
pub const MAX_VARINT_LEN: usize = 5;

/// Encode a u32 as a variable-length integer
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 32 {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Sequential varint reader over a byte slice.
///
/// Every read is bounds checked; running off the end of the slice is reported
/// as corruption of `context` rather than a panic.
pub struct VarIntReader<'a> {
    buf: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> VarIntReader<'a> {
    pub fn new(buf: &'a [u8], context: &'static str) -> Self {
        Self {
            buf,
            pos: 0,
            context,
        }
    }

    pub fn read(&mut self) -> Result<u32> {
        match decode_varint(&self.buf[self.pos..]) {
            Some((value, consumed)) => {
                self.pos += consumed;
                Ok(value)
            }
            None => Err(Error::corrupt(
                self.context,
                format!("truncated or overlong varint at byte {}", self.pos),
            )),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let values = [0, 1, 127, 128, 16383, 16384, u32::MAX];
        for value in values {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert!(buf.len() <= MAX_VARINT_LEN);
            let (decoded, _) = decode_varint(&buf).unwrap();
            assert_eq!(value, decoded);
        }
    }

    #[test]
    fn test_reader_reports_truncation() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        buf.pop();

        let mut reader = VarIntReader::new(&buf, "test");
        let err = reader.read().unwrap_err();
        assert!(err.is_corruption());
    }
}
