//! Per-pixel color transforms

use crate::array::NumericArray;
use crate::error::Result;
use crate::worker::ArrayTransform;

/// BT.601 luma of an R,G,B triple, integer weights
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

/// Replace every sample v with 255 - v
#[derive(Debug, Clone, Copy, Default)]
pub struct Invert;

impl ArrayTransform for Invert {
    fn process_array(&mut self, mut array: NumericArray) -> Result<NumericArray> {
        for v in array.as_mut_slice() {
            *v = 255 - *v;
        }
        Ok(array)
    }
}

/// Replace the color channels of every pixel with its luma
///
/// Arrays with fewer than 3 channels are already gray and pass unchanged; a
/// 4th channel is kept as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl ArrayTransform for Grayscale {
    fn process_array(&mut self, mut array: NumericArray) -> Result<NumericArray> {
        if array.ndim() != 3 {
            return Ok(array);
        }
        let (_, _, channels) = array.dims3()?;
        if channels < 3 {
            return Ok(array);
        }
        for px in array.as_mut_slice().chunks_exact_mut(channels) {
            let y = luma(px[0], px[1], px[2]);
            px[..3].fill(y);
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert() {
        let array = NumericArray::from_shape_vec([1, 1, 3], vec![0u8, 100, 255]).unwrap();
        let out = Invert.process_array(array).unwrap();
        assert_eq!(out.as_slice(), &[255, 155, 0]);
    }

    #[test]
    fn test_grayscale_keeps_alpha() {
        let array = NumericArray::from_shape_vec([1, 2, 4], vec![255u8, 0, 0, 7, 10, 10, 10, 9])
            .unwrap();
        let out = Grayscale.process_array(array).unwrap();
        assert_eq!(out.as_slice(), &[76, 76, 76, 7, 10, 10, 10, 9]);
    }

    #[test]
    fn test_grayscale_passes_gray() {
        let array = NumericArray::from_shape_vec([1, 2], vec![3u8, 4]).unwrap();
        assert_eq!(Grayscale.process_array(array.clone()).unwrap(), array);
    }
}
