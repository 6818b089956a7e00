//! Normalization of arbitrary numeric input onto the discrete 1-5 scale

/// Lowest valid score
pub const SCORE_MIN: u8 = 1;
/// Highest valid score
pub const SCORE_MAX: u8 = 5;

/// Clamp and round a raw value onto the discrete 1-5 domain.
///
/// Missing or non-finite input maps to `None` ("no data"); everything else
/// rounds to the nearest integer and clamps to `[1, 5]`. Never fails.
pub fn normalize(value: Option<f64>) -> Option<u8> {
    let v = value?;
    if !v.is_finite() {
        return None;
    }
    let rounded = v.round();
    let clamped = rounded.clamp(f64::from(SCORE_MIN), f64::from(SCORE_MAX));
    Some(clamped as u8)
}
