//! Borrowed views over a frame's packed pixel memory
//!
//! A view exists only while the frame is borrowed; dropping it is the unmap.
//! Writes through [`PixelBufferMut`] land directly in the frame's memory, so
//! nothing needs committing afterwards.

use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::types::PixelFormat;

/// Bytes per pixel of every supported format
pub const BYTES_PER_PIXEL: usize = 4;

/// Byte layout of one packed pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedLayout {
    pub format: PixelFormat,
    /// Memory index of the blue, green and red bytes
    pub bgr: [usize; 3],
    /// Memory index of the 4th byte
    pub alpha: usize,
    /// Whether the 4th byte is real alpha (false: padding)
    pub has_alpha: bool,
}

const PACKED_LAYOUTS: [PackedLayout; 2] = [
    PackedLayout {
        format: PixelFormat::Bgra8888,
        bgr: [0, 1, 2],
        alpha: 3,
        has_alpha: true,
    },
    PackedLayout {
        format: PixelFormat::Bgrx8888,
        bgr: [0, 1, 2],
        alpha: 3,
        has_alpha: false,
    },
];

/// Look up the byte layout of `format`
pub fn packed_layout(format: PixelFormat) -> Result<PackedLayout> {
    PACKED_LAYOUTS
        .iter()
        .find(|layout| layout.format == format)
        .copied()
        .ok_or(Error::Format(format))
}

fn check_frame(frame: &VideoFrame) -> Result<PackedLayout> {
    if !frame.is_valid() {
        return Err(Error::InvalidFrame("cannot map a null frame".into()));
    }
    packed_layout(frame.pixel_format())
}

/// Read-only view of a mapped frame
#[derive(Debug)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    bytes_per_line: usize,
    layout: PackedLayout,
}

impl<'a> PixelBuffer<'a> {
    /// Map `frame` for reading
    pub fn map(frame: &'a VideoFrame) -> Result<Self> {
        let layout = check_frame(frame)?;
        Ok(Self {
            data: frame.bits(),
            width: frame.width() as usize,
            height: frame.height() as usize,
            bytes_per_line: frame.bytes_per_line(),
            layout,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    pub fn layout(&self) -> PackedLayout {
        self.layout
    }

    /// Pixel bytes of row `y`, without padding
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.bytes_per_line;
        &self.data[start..start + self.width * BYTES_PER_PIXEL]
    }

    /// Iterate over rows, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// The 4 memory bytes of pixel (`x`, `y`)
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let start = x * BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[start], row[start + 1], row[start + 2], row[start + 3]]
    }
}

/// Writable view of a mapped frame
#[derive(Debug)]
pub struct PixelBufferMut<'a> {
    data: &'a mut [u8],
    width: usize,
    height: usize,
    bytes_per_line: usize,
    layout: PackedLayout,
}

impl<'a> PixelBufferMut<'a> {
    /// Map `frame` for writing
    pub fn map(frame: &'a mut VideoFrame) -> Result<Self> {
        let layout = check_frame(frame)?;
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let bytes_per_line = frame.bytes_per_line();
        Ok(Self {
            data: frame.bits_mut(),
            width,
            height,
            bytes_per_line,
            layout,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> PackedLayout {
        self.layout
    }

    /// Mutable pixel bytes of row `y`, without padding
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.bytes_per_line;
        let len = self.width * BYTES_PER_PIXEL;
        &mut self.data[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_table() {
        assert!(packed_layout(PixelFormat::Bgra8888).unwrap().has_alpha);
        assert!(!packed_layout(PixelFormat::Bgrx8888).unwrap().has_alpha);
        for format in [PixelFormat::Rgba8888, PixelFormat::Nv12, PixelFormat::Invalid] {
            assert!(matches!(packed_layout(format), Err(Error::Format(f)) if f == format));
        }
    }

    #[test]
    fn test_padded_rows() {
        // 2x2 frame with 4 bytes of padding per row
        let data: Vec<u8> = (0..24).collect();
        let frame = VideoFrame::from_raw(data, 2, 2, 12, PixelFormat::Bgra8888).unwrap();
        let buffer = PixelBuffer::map(&frame).unwrap();
        assert_eq!(buffer.row(0), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(buffer.row(1), &[12, 13, 14, 15, 16, 17, 18, 19]);
        assert_eq!(buffer.pixel(1, 1), [16, 17, 18, 19]);
        assert_eq!(buffer.rows().count(), 2);
    }

    #[test]
    fn test_map_rejects_null_and_planar() {
        assert!(matches!(
            PixelBuffer::map(&VideoFrame::invalid()),
            Err(Error::InvalidFrame(_))
        ));
        let nv12 = VideoFrame::new(4, 4, PixelFormat::Nv12);
        assert!(matches!(PixelBuffer::map(&nv12), Err(Error::Format(PixelFormat::Nv12))));
    }

    #[test]
    fn test_write_through() {
        let mut frame = VideoFrame::new(1, 2, PixelFormat::Bgrx8888);
        {
            let mut buffer = PixelBufferMut::map(&mut frame).unwrap();
            buffer.row_mut(1).copy_from_slice(&[9, 8, 7, 6]);
        }
        assert_eq!(frame.bits(), &[0, 0, 0, 0, 9, 8, 7, 6]);
    }
}
