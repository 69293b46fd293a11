//! Owned n-dimensional sample arrays with an optional mask
//!
//! Arrays are row-major. Decoded frames are always `(height, width,
//! channels)`; the codec also accepts 2D `(height, width)` input.

use crate::error::{Error, Result};

/// Element type that can be normalized into 8-bit pixel values
pub trait Sample: Copy + Send + Sync + PartialOrd + std::fmt::Debug + 'static {
    /// True for boolean data, which normalizes to 0/255
    const IS_BOOL: bool = false;

    fn to_f64(self) -> f64;
}

impl Sample for u8 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for u16 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}

impl Sample for bool {
    const IS_BOOL: bool = true;

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

/// Row-major array with a dynamic shape
///
/// The mask, when present, has one entry per element; `true` marks the
/// element as undefined (a transparent pixel once encoded).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray<T = u8> {
    shape: Vec<usize>,
    data: Vec<T>,
    mask: Option<Vec<bool>>,
}

impl<T: Sample> NumericArray<T> {
    /// Build an array from a shape and row-major data
    pub fn from_shape_vec(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::Shape(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            shape,
            data,
            mask: None,
        })
    }

    /// Array of `shape` filled with `value`
    pub fn filled(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![value; len],
            mask: None,
        }
    }

    /// Attach a per-element mask
    pub fn with_mask(mut self, mask: Vec<bool>) -> Result<Self> {
        if mask.len() != self.data.len() {
            return Err(Error::Shape(format!(
                "mask has {} entries, array has {}",
                mask.len(),
                self.data.len()
            )));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    /// Mask every channel of the pixel at (`y`, `x`) of a 3D array
    pub fn mask_pixel(&mut self, y: usize, x: usize) -> Result<()> {
        let (h, w, c) = self.dims3()?;
        if y >= h || x >= w {
            return Err(Error::Shape(format!(
                "pixel ({y}, {x}) outside {h}x{w} array"
            )));
        }
        let len = self.data.len();
        let mask = self.mask.get_or_insert_with(|| vec![false; len]);
        let start = (y * w + x) * c;
        mask[start..start + c].iter_mut().for_each(|m| *m = true);
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `(height, width, channels)` of a 3D array
    pub fn dims3(&self) -> Result<(usize, usize, usize)> {
        match self.shape[..] {
            [h, w, c] => Ok((h, w, c)),
            _ => Err(Error::Dimension(self.ndim())),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// True if at least one element is masked
    pub fn is_masked(&self) -> bool {
        self.mask
            .as_ref()
            .map(|m| m.iter().any(|&masked| masked))
            .unwrap_or(false)
    }

    /// Element at a multi-dimensional index
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        self.data.get(offset).copied()
    }

    /// Apply `f` element-wise, keeping shape and mask
    pub fn map<U: Sample>(&self, f: impl Fn(T) -> U) -> NumericArray<U> {
        NumericArray {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
            mask: self.mask.clone(),
        }
    }

    /// Minimum and maximum over unmasked elements
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut bounds: Option<(f64, f64)> = None;
        for (i, v) in self.data.iter().enumerate() {
            if self.mask.as_ref().is_some_and(|m| m[i]) {
                continue;
            }
            let v = v.to_f64();
            bounds = Some(match bounds {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        bounds
    }
}

impl NumericArray<u8> {
    /// The `(0, 0, 0)` array produced for null frames
    pub fn empty() -> Self {
        Self {
            shape: vec![0, 0, 0],
            data: Vec::new(),
            mask: None,
        }
    }
}
