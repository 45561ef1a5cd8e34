//! Decoder for the Google encoded polyline format.
//!
//! Each coordinate is stored as a zig-zag encoded delta from the previous
//! point, scaled by `1e5`, split into 5-bit chunks offset by 63 so the
//! result is printable ASCII. Values are accumulated in `i32`, which holds
//! any valid latitude or longitude at precision 5.

use lifeline_types::Waypoint;

use crate::error::RoutingError;

/// Fixed-point scale of the standard (precision 5) format.
const PRECISION: f64 = 1e5;

/// Decode an encoded polyline into waypoints in traversal order.
///
/// # Errors
///
/// Returns [`RoutingError::InvalidPolyline`] if the input contains bytes
/// outside the encoding alphabet, ends in the middle of a value, has a
/// latitude without a longitude, or overflows.
pub fn decode(encoded: &str) -> Result<Vec<Waypoint>, RoutingError> {
    let mut bytes = encoded.bytes();
    let mut points = Vec::new();
    let mut lat: i32 = 0;
    let mut lng: i32 = 0;

    while let Some(d_lat) = next_value(&mut bytes)? {
        let d_lng = next_value(&mut bytes)?
            .ok_or_else(|| RoutingError::InvalidPolyline("latitude without longitude".to_owned()))?;

        lat = lat
            .checked_add(d_lat)
            .ok_or_else(|| RoutingError::InvalidPolyline("latitude overflow".to_owned()))?;
        lng = lng
            .checked_add(d_lng)
            .ok_or_else(|| RoutingError::InvalidPolyline("longitude overflow".to_owned()))?;

        points.push(Waypoint::new(
            f64::from(lat) / PRECISION,
            f64::from(lng) / PRECISION,
        ));
    }

    Ok(points)
}

/// Read one zig-zag encoded delta. Returns `Ok(None)` at a clean end of input.
fn next_value(bytes: &mut impl Iterator<Item = u8>) -> Result<Option<i32>, RoutingError> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;
    let mut started = false;

    loop {
        let Some(byte) = bytes.next() else {
            if started {
                return Err(RoutingError::InvalidPolyline("truncated value".to_owned()));
            }
            return Ok(None);
        };
        started = true;

        let chunk = u32::from(byte.checked_sub(63).ok_or_else(|| {
            RoutingError::InvalidPolyline(format!("byte {byte:#04x} outside alphabet"))
        })?);
        if chunk > 0x3f {
            return Err(RoutingError::InvalidPolyline(format!(
                "byte {byte:#04x} outside alphabet"
            )));
        }

        let five = chunk & 0x1f;
        let bits = five
            .checked_shl(shift)
            .filter(|bits| bits.checked_shr(shift) == Some(five))
            .ok_or_else(|| RoutingError::InvalidPolyline("value too long".to_owned()))?;
        result |= bits;
        shift = shift.saturating_add(5);

        if chunk < 0x20 {
            break;
        }
    }

    // Zig-zag: the low bit carries the sign.
    let magnitude = i32::try_from(result >> 1)
        .map_err(|e| RoutingError::InvalidPolyline(format!("value out of range: {e}")))?;
    if result & 1 == 1 {
        Ok(Some(!magnitude))
    } else {
        Ok(Some(magnitude))
    }
}
