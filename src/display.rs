//! Scaling helpers for displaying arrays in a sized area

use crate::array::{NumericArray, Sample};
use crate::error::{Error, Result};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};

/// When an image is rescaled to fit its display area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleMode {
    /// Always show at the original size
    NoScale,
    /// Shrink to fit, never enlarge
    #[default]
    DownScaleOnly,
    /// Enlarge to fit, never shrink
    UpScaleOnly,
    /// Always fit the area
    AllScale,
}

impl ScaleMode {
    /// Whether an image of size `image` should be rescaled to `area`
    pub fn should_scale(&self, image: Resolution, area: Resolution) -> bool {
        match self {
            ScaleMode::NoScale => false,
            ScaleMode::DownScaleOnly => area.width < image.width || area.height < image.height,
            ScaleMode::UpScaleOnly => area.width > image.width || area.height > image.height,
            ScaleMode::AllScale => true,
        }
    }
}

/// Largest size inside `area` with the aspect ratio of `image`
pub fn fit_keep_aspect(image: Resolution, area: Resolution) -> Resolution {
    if image.is_empty() || area.is_empty() {
        return Resolution::new(0, 0);
    }
    let (w, h) = (image.width as u64, image.height as u64);
    let (aw, ah) = (area.width as u64, area.height as u64);
    let width_at_full_height = ah * w / h;
    if width_at_full_height <= aw {
        Resolution::new(width_at_full_height.max(1) as u32, area.height)
    } else {
        Resolution::new(area.width, (aw * h / w).max(1) as u32)
    }
}

/// Nearest-neighbor resize of a (H, W) or (H, W, C) array
pub fn scale_nearest<T: Sample>(array: &NumericArray<T>, size: Resolution) -> Result<NumericArray<T>> {
    let (src_h, src_w, channels) = match *array.shape() {
        [h, w] => (h, w, 1),
        [h, w, c] => (h, w, c),
        _ => return Err(Error::Dimension(array.ndim())),
    };
    let (dst_w, dst_h) = (size.width as usize, size.height as usize);
    if (src_w, src_h) == (dst_w, dst_h) {
        return Ok(array.clone());
    }
    if src_w == 0 || src_h == 0 {
        return Err(Error::Shape("cannot scale an empty array".into()));
    }

    let input = array.as_slice();
    let mut output = Vec::with_capacity(dst_w * dst_h * channels);
    for y in 0..dst_h {
        let src_y = y * src_h / dst_h;
        for x in 0..dst_w {
            let src_x = x * src_w / dst_w;
            let src_idx = (src_y * src_w + src_x) * channels;
            output.extend_from_slice(&input[src_idx..src_idx + channels]);
        }
    }

    if array.ndim() == 2 {
        NumericArray::from_shape_vec([dst_h, dst_w], output)
    } else {
        NumericArray::from_shape_vec([dst_h, dst_w, channels], output)
    }
}

/// Headless label that shows an array scaled to its current size
///
/// The original array is kept, so repeated resizes never compound scaling
/// artifacts.
#[derive(Debug, Clone)]
pub struct ArrayLabel {
    original: NumericArray,
    rendered: NumericArray,
    size: Resolution,
    mode: ScaleMode,
}

impl ArrayLabel {
    pub fn new(size: Resolution) -> Self {
        Self {
            original: NumericArray::empty(),
            rendered: NumericArray::empty(),
            size,
            mode: ScaleMode::default(),
        }
    }

    pub fn original(&self) -> &NumericArray {
        &self.original
    }

    /// The array as it would be painted
    pub fn rendered(&self) -> &NumericArray {
        &self.rendered
    }

    /// Size of the rendered image, (0, 0) when empty
    pub fn rendered_size(&self) -> Resolution {
        match *self.rendered.shape() {
            [h, w, ..] => Resolution::new(w as u32, h as u32),
            _ => Resolution::new(0, 0),
        }
    }

    pub fn size(&self) -> Resolution {
        self.size
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) -> Result<()> {
        self.mode = mode;
        self.render()
    }

    pub fn resize(&mut self, size: Resolution) -> Result<()> {
        self.size = size;
        self.render()
    }

    pub fn set_array(&mut self, array: NumericArray) -> Result<()> {
        self.original = array;
        self.render()
    }

    fn render(&mut self) -> Result<()> {
        if self.original.is_empty() {
            self.rendered = NumericArray::empty();
            return Ok(());
        }
        let (h, w, _) = match *self.original.shape() {
            [h, w] => (h, w, 1),
            _ => self.original.dims3()?,
        };
        let image = Resolution::new(w as u32, h as u32);
        self.rendered = if self.mode.should_scale(image, self.size) {
            scale_nearest(&self.original, fit_keep_aspect(image, self.size))?
        } else {
            self.original.clone()
        };
        Ok(())
    }
}

impl Default for ArrayLabel {
    fn default() -> Self {
        Self::new(Resolution::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> NumericArray {
        NumericArray::from_shape_vec([40, 60, 3], (0..40 * 60 * 3).map(|v| v as u8).collect())
            .unwrap()
    }

    #[test]
    fn test_fit_keep_aspect() {
        let image = Resolution::new(60, 40);
        assert_eq!(fit_keep_aspect(image, Resolution::new(30, 20)), Resolution::new(30, 20));
        assert_eq!(fit_keep_aspect(image, Resolution::new(30, 100)), Resolution::new(30, 20));
        assert_eq!(fit_keep_aspect(image, Resolution::new(600, 80)), Resolution::new(120, 80));
    }

    #[test]
    fn test_scale_nearest() {
        let array = NumericArray::from_shape_vec([2, 2], vec![1u8, 2, 3, 4]).unwrap();
        let up = scale_nearest(&array, Resolution::new(4, 4)).unwrap();
        assert_eq!(up.shape(), &[4, 4]);
        assert_eq!(&up.as_slice()[..8], &[1, 1, 2, 2, 1, 1, 2, 2]);
        let down = scale_nearest(&up, Resolution::new(2, 2)).unwrap();
        assert_eq!(down, array);
    }

    #[test]
    fn test_label_scale_modes() {
        let full = Resolution::new(60, 40);
        let small = Resolution::new(30, 20);
        let large = Resolution::new(120, 80);
        let mut label = ArrayLabel::new(full);
        label.set_array(image()).unwrap();

        let cases = [
            (ScaleMode::NoScale, full, full),
            (ScaleMode::DownScaleOnly, small, full),
            (ScaleMode::UpScaleOnly, full, large),
            (ScaleMode::AllScale, small, large),
        ];
        for (mode, expect_small, expect_large) in cases {
            label.set_scale_mode(mode).unwrap();
            label.resize(small).unwrap();
            assert_eq!(label.rendered_size(), expect_small, "{mode:?} shrink");
            label.resize(large).unwrap();
            assert_eq!(label.rendered_size(), expect_large, "{mode:?} grow");
        }
        assert_eq!(label.original(), &image());
    }

    #[test]
    fn test_label_empty_array() {
        let mut label = ArrayLabel::new(Resolution::QVGA);
        label.set_array(NumericArray::empty()).unwrap();
        assert_eq!(label.rendered_size(), Resolution::new(0, 0));
    }
}
