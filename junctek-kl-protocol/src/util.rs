/// Calculates the checksum of `value`
///
/// The protocol uses `(value mod 255) + 1`, so the result is always in `1..=255`.
/// Outgoing frames carry the checksum of the command parameter, incoming frames
/// the checksum of the sum of all payload fields.
///
/// ## Example
/// The parameter `1440` (an over voltage threshold of 14.40V) has the checksum `166`,
/// the frame is `:W20=1,166,1440,\r\n`.
pub fn checksum(value: u32) -> u32 {
    (value % 255) + 1
}

/// Checksum over a (possibly negative) sum of payload fields
pub fn checksum_of_sum(sum: i64) -> u32 {
    checksum(sum.rem_euclid(255) as u32)
}

/// Parse a decimal integer the way the device firmware tolerates it
///
/// Accepts an optional sign followed by decimal digits and ignores whatever
/// follows the digits. Anything unparsable, including an empty field, yields `0`.
pub fn parse_int(ascii: &[u8]) -> i32 {
    let (negative, digits) = match ascii.first() {
        Some(b'-') => (true, &ascii[1..]),
        Some(b'+') => (false, &ascii[1..]),
        _ => (false, ascii),
    };
    let value = digits
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .fold(0i32, |acc, c| {
            acc.saturating_mul(10).saturating_add((c - b'0') as i32)
        });
    if negative { -value } else { value }
}

/// Convert a physical value into the fixed point integer sent to the device
///
/// `value * scale + offset` rounded to the nearest integer. Returns `None` for
/// NaN and for values outside of the `u32` range, the protocol has no signed
/// parameters.
pub fn to_raw(value: f32, scale: f32, offset: f32) -> Option<u32> {
    let raw = value * scale + offset;
    if raw.is_nan() || raw < 0.0 || raw >= u32::MAX as f32 {
        return None;
    }
    Some((raw + 0.5) as u32)
}

/// Convert a fixed point integer received from the device into a physical value
pub fn from_raw(raw: i32, scale: f32) -> f32 {
    raw as f32 / scale
}
