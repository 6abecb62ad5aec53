//! Encoded polyline decoding (precision 6, as returned by Valhalla).

use crate::domain::Coord;

const PRECISION: f64 = 1e6;

/// Error decoding an encoded polyline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolylineError {
    #[error("polyline truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid polyline byte {byte:#x} at {index}")]
    InvalidByte { byte: u8, index: usize },

    #[error("polyline point out of range: {0}")]
    OutOfRange(String),
}

/// Decode a precision-6 polyline into coordinates.
///
/// Points are encoded as (lat, lon) deltas; the result is in travel order.
///
/// # Examples
///
/// ```
/// use street_network::http::decode_polyline;
///
/// let coords = decode_polyline("_izlhA~rlgdF_{geC~ywl@").unwrap();
/// assert_eq!(coords.len(), 2);
/// assert!((coords[0].lat() - 38.5).abs() < 1e-6);
/// assert!((coords[0].lon() + 120.2).abs() < 1e-6);
/// ```
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coord>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coords = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        lon += next_value(bytes, &mut index)?;

        let coord = Coord::new(lon as f64 / PRECISION, lat as f64 / PRECISION)
            .map_err(|e| PolylineError::OutOfRange(e.to_string()))?;
        coords.push(coord);
    }

    Ok(coords)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*index).ok_or(PolylineError::Truncated(*index))?;
        if !(63..127).contains(&byte) || shift > 60 {
            return Err(PolylineError::InvalidByte {
                byte,
                index: *index,
            });
        }
        *index += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}
