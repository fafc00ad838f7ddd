use std::io::{self, Read, Write};

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

/// Delta-encode a sorted list of u32s
pub fn delta_encode(values: &[u32], buf: &mut Vec<u8>) {
    let mut prev = 0u32;
    for &value in values {
        let delta = value - prev;
        encode_varint(delta, buf);
        prev = value;
    }
}

/// Delta-decode exactly `count` values from a slice.
///
/// Returns None if the buffer is truncated or carries trailing bytes.
pub fn delta_decode(buf: &[u8], count: usize) -> Option<Vec<u32>> {
    let mut result = Vec::with_capacity(count);
    let mut prev = 0u32;
    let mut pos = 0;

    for _ in 0..count {
        let (delta, consumed) = decode_varint(&buf[pos..])?;
        prev = prev.checked_add(delta)?;
        result.push(prev);
        pos += consumed;
    }

    if pos != buf.len() {
        return None;
    }
    Some(result)
}

/// Write a u16 in little-endian format
pub fn write_u16_le<W: Write>(writer: &mut W, value: u16) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u16 in little-endian format
pub fn read_u16_le<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u32 in little-endian format
pub fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
