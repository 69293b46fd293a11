//! Value-range normalization to 0..=255

use crate::array::{NumericArray, Sample};
use serde::{Deserialize, Serialize};

/// How array values are mapped into the 0..=255 pixel range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalize {
    /// Use values as they are, clipped to 0..=255
    #[default]
    Off,
    /// Scale and clip `0..=max`
    Max(f64),
    /// Scale and clip `min..=max`
    Range(f64, f64),
    /// Scale the array's own min..=max; booleans map to 0/255
    Auto,
}

impl Normalize {
    /// Resolve to an explicit input range
    fn bounds<T: Sample>(&self, array: &NumericArray<T>) -> Option<(f64, f64)> {
        match *self {
            Normalize::Off => None,
            Normalize::Max(max) => Some((0.0, max)),
            Normalize::Range(min, max) => Some((min, max)),
            Normalize::Auto if T::IS_BOOL => Some((0.0, 1.0)),
            Normalize::Auto => array.min_max(),
        }
    }

    /// Convert `array` into 8-bit samples
    ///
    /// Scaled values are clipped to 0..=255 and truncate toward zero. A
    /// degenerate range (min == max) only shifts by min.
    pub fn apply<T: Sample>(&self, array: &NumericArray<T>) -> Vec<u8> {
        let (offset, span) = match self.bounds(array) {
            Some((min, max)) if max != min => (min, Some(max - min)),
            Some((min, _)) => (min, None),
            None => (0.0, None),
        };
        array
            .as_slice()
            .iter()
            .map(|v| {
                let shifted = v.to_f64() - offset;
                let scaled = match span {
                    Some(span) => shifted * 255.0 / span,
                    None => shifted,
                };
                if scaled.is_nan() {
                    0
                } else {
                    scaled.clamp(0.0, 255.0) as u8
                }
            })
            .collect()
    }
}
