//! Neighborhood filters with clamp-to-edge borders

use super::convert::luma;
use crate::array::NumericArray;
use crate::error::{Error, Result};
use crate::worker::ArrayTransform;

/// (height, width, channels) of a 2D or 3D array
fn dims(array: &NumericArray) -> Result<(usize, usize, usize)> {
    match *array.shape() {
        [h, w] => Ok((h, w, 1)),
        [_, _, 0] => Err(Error::ChannelCount(0)),
        [h, w, c] => Ok((h, w, c)),
        _ => Err(Error::Dimension(array.ndim())),
    }
}

/// Number of leading channels that carry color (the rest is alpha)
fn color_channels(channels: usize) -> usize {
    if channels >= 3 {
        3
    } else {
        1
    }
}

/// Mean over a (2r+1) x (2r+1) window, per color channel
#[derive(Debug, Clone, Copy)]
pub struct BoxBlur {
    pub radius: usize,
}

impl Default for BoxBlur {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

impl BoxBlur {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// One separable pass along rows (`horizontal`) or columns
    fn pass(&self, src: &[u8], h: usize, w: usize, c: usize, horizontal: bool) -> Vec<u8> {
        let r = self.radius as isize;
        let taps = (2 * r + 1) as u32;
        let mut dst = src.to_vec();
        for y in 0..h {
            for x in 0..w {
                for ch in 0..color_channels(c) {
                    let mut sum = 0u32;
                    for k in -r..=r {
                        let (sx, sy) = if horizontal {
                            ((x as isize + k).clamp(0, w as isize - 1) as usize, y)
                        } else {
                            (x, (y as isize + k).clamp(0, h as isize - 1) as usize)
                        };
                        sum += src[(sy * w + sx) * c + ch] as u32;
                    }
                    dst[(y * w + x) * c + ch] = ((sum + taps / 2) / taps) as u8;
                }
            }
        }
        dst
    }
}

impl ArrayTransform for BoxBlur {
    fn process_array(&mut self, array: NumericArray) -> Result<NumericArray> {
        let (h, w, c) = dims(&array)?;
        if self.radius == 0 || h == 0 || w == 0 {
            return Ok(array);
        }
        let shape = array.shape().to_vec();
        let rows = self.pass(array.as_slice(), h, w, c, true);
        let blurred = self.pass(&rows, h, w, c, false);
        NumericArray::from_shape_vec(shape, blurred)
    }
}

/// Sobel gradient magnitude of the luma, written to every color channel
#[derive(Debug, Clone, Copy, Default)]
pub struct SobelEdges;

impl ArrayTransform for SobelEdges {
    fn process_array(&mut self, mut array: NumericArray) -> Result<NumericArray> {
        let (h, w, c) = dims(&array)?;
        if h == 0 || w == 0 {
            return Ok(array);
        }
        let gray: Vec<i32> = array
            .as_slice()
            .chunks_exact(c)
            .map(|px| {
                if c >= 3 {
                    luma(px[0], px[1], px[2]) as i32
                } else {
                    px[0] as i32
                }
            })
            .collect();
        let at = |x: isize, y: isize| {
            let x = x.clamp(0, w as isize - 1) as usize;
            let y = y.clamp(0, h as isize - 1) as usize;
            gray[y * w + x]
        };

        let out = array.as_mut_slice();
        for y in 0..h as isize {
            for x in 0..w as isize {
                let gx = at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2 * at(x - 1, y)
                    - at(x - 1, y + 1);
                let gy = at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2 * at(x, y - 1)
                    - at(x + 1, y - 1);
                let magnitude = ((gx * gx + gy * gy) as f64).sqrt().min(255.0) as u8;
                let start = (y as usize * w + x as usize) * c;
                out[start..start + color_channels(c)].fill(magnitude);
            }
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_constant_is_unchanged() {
        let array = NumericArray::filled([5, 5, 3], 80u8);
        let out = BoxBlur::new(1).process_array(array.clone()).unwrap();
        assert_eq!(out, array);
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut data = vec![0u8; 9];
        data[4] = 90;
        let array = NumericArray::from_shape_vec([3, 3], data).unwrap();
        let out = BoxBlur::new(1).process_array(array).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 10));
    }

    #[test]
    fn test_blur_keeps_alpha() {
        let mut array = NumericArray::filled([2, 2, 4], 0u8);
        array.as_mut_slice()[0] = 200;
        array.as_mut_slice()[3] = 33;
        let out = BoxBlur::new(1).process_array(array).unwrap();
        assert_eq!(out.get(&[0, 0, 3]), Some(33));
        assert_eq!(out.get(&[1, 1, 3]), Some(0));
    }

    #[test]
    fn test_sobel_flat_and_edge() {
        let flat = NumericArray::filled([4, 4, 3], 128u8);
        let out = SobelEdges.process_array(flat).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0));

        // Left half black, right half white
        let data: Vec<u8> = (0..4 * 4).map(|i| if i % 4 >= 2 { 255 } else { 0 }).collect();
        let edge = NumericArray::from_shape_vec([4, 4], data).unwrap();
        let out = SobelEdges.process_array(edge).unwrap();
        assert_eq!(out.get(&[1, 1]), Some(255));
        assert_eq!(out.get(&[1, 2]), Some(255));
        assert_eq!(out.get(&[1, 0]), Some(0));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let hollow = NumericArray::filled([3, 3, 0], 0u8);
        assert!(matches!(
            BoxBlur::new(1).process_array(hollow.clone()),
            Err(Error::ChannelCount(0))
        ));
        assert!(matches!(
            SobelEdges.process_array(hollow),
            Err(Error::ChannelCount(0))
        ));
    }

    #[test]
    fn test_rejects_1d() {
        let flat = NumericArray::filled([4], 0u8);
        assert!(SobelEdges.process_array(flat).is_err());
    }
}
