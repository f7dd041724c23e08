//! Encoded polyline codec (precision 1e-5).
//!
//! Each value is a zig-zag encoded delta split into 5-bit groups,
//! least significant first, with 0x20 as the continuation bit and 63
//! added to land in printable ASCII. Latitude and longitude deltas
//! alternate within each point.

use crate::error::DecodeError;
use crate::types::Coordinate;

const PRECISION: f64 = 1e-5;

const CHAR_OFFSET: u8 = 63;
const CONTINUATION: i64 = 0x20;
const GROUP_MASK: i64 = 0x1f;

/// Seven groups (35 bits) already cover ±180° at 1e-5 precision
const MAX_SHIFT: u32 = 30;

/// Decode an encoded polyline into coordinates, in the order they appear.
///
/// Fails instead of reading past the end of the string when the last
/// value is cut short or a point is missing its longitude.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        let offset = index;
        let d_lat = read_value(encoded, &mut index)?;
        let d_lon = read_value(encoded, &mut index)?;

        lat = lat
            .checked_add(d_lat)
            .ok_or(DecodeError::Overflow { offset })?;
        lon = lon
            .checked_add(d_lon)
            .ok_or(DecodeError::Overflow { offset })?;

        points.push(Coordinate::new(lat as f64 * PRECISION, lon as f64 * PRECISION));
    }

    Ok(points)
}

/// Encode coordinates with the same scheme `decode` reads.
pub fn encode(points: &[Coordinate]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for point in points {
        let lat = (point.latitude / PRECISION).round() as i64;
        let lon = (point.longitude / PRECISION).round() as i64;
        write_value(lat - prev_lat, &mut out);
        write_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn read_value(encoded: &str, index: &mut usize) -> Result<i64, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let offset = *index;
        let byte = *bytes.get(offset).ok_or(DecodeError::Truncated { offset })?;

        if !(CHAR_OFFSET..=CHAR_OFFSET + 63).contains(&byte) {
            // Everything before `offset` was ASCII, so it is a char boundary
            let ch = encoded[offset..].chars().next().unwrap_or(byte as char);
            return Err(DecodeError::InvalidCharacter { offset, ch });
        }
        if shift > MAX_SHIFT {
            return Err(DecodeError::Overflow { offset });
        }

        let chunk = (byte - CHAR_OFFSET) as i64;
        result |= (chunk & GROUP_MASK) << shift;
        shift += 5;
        *index += 1;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn write_value(value: i64, out: &mut String) {
    let mut v = (if value < 0 { !(value << 1) } else { value << 1 }) as u64;

    while v >= CONTINUATION as u64 {
        let group = (CONTINUATION as u64 | (v & GROUP_MASK as u64)) as u8;
        out.push((group + CHAR_OFFSET) as char);
        v >>= 5;
    }
    out.push((v as u8 + CHAR_OFFSET) as char);
}
