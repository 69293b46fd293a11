//! Conversion between packed video frames and numeric arrays
//!
//! Frames must be one of the packed 32-bit formats (see
//! [`buffer::packed_layout`]). Decoding always copies, so arrays never alias
//! frame memory.

pub mod buffer;
mod normalize;

pub use normalize::Normalize;

use crate::array::{NumericArray, Sample};
use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::metadata::FrameMetadata;
use crate::types::{ArrayLayout, ByteOrder, PixelFormat};
use buffer::{PixelBuffer, PixelBufferMut, BYTES_PER_PIXEL};

/// Reorder the 4 memory bytes of one pixel
#[inline]
fn ordered(pixel: &[u8], order: ByteOrder) -> [u8; 4] {
    match order {
        ByteOrder::Little => [pixel[0], pixel[1], pixel[2], pixel[3]],
        ByteOrder::Big => [pixel[3], pixel[2], pixel[1], pixel[0]],
    }
}

/// Collect `channels` bytes per pixel, picked by `pick` from the ordered pixel
fn collect_view(
    frame: &VideoFrame,
    order: ByteOrder,
    channels: usize,
    pick: impl Fn(&[u8; 4], &mut Vec<u8>),
) -> Result<NumericArray> {
    let buffer = PixelBuffer::map(frame)?;
    let (h, w) = (buffer.height(), buffer.width());
    let mut data = Vec::with_capacity(h * w * channels);
    for row in buffer.rows() {
        for pixel in row.chunks_exact(BYTES_PER_PIXEL) {
            pick(&ordered(pixel, order), &mut data);
        }
    }
    if channels == 1 {
        NumericArray::from_shape_vec([h, w], data)
    } else {
        NumericArray::from_shape_vec([h, w, channels], data)
    }
}

/// (H, W, 4) copy of the pixel bytes in `order`
pub fn byte_view(frame: &VideoFrame, order: ByteOrder) -> Result<NumericArray> {
    collect_view(frame, order, 4, |px, out| out.extend_from_slice(px))
}

/// (H, W, 3) copy of the color bytes
///
/// `Little` yields B,G,R and `Big` yields R,G,B.
pub fn rgb_view(frame: &VideoFrame, order: ByteOrder) -> Result<NumericArray> {
    collect_view(frame, order, 3, |px, out| match order {
        ByteOrder::Little => out.extend_from_slice(&px[..3]),
        ByteOrder::Big => out.extend_from_slice(&px[1..]),
    })
}

/// (H, W) copy of the 4th memory byte of every pixel
pub fn alpha_view(frame: &VideoFrame) -> Result<NumericArray> {
    collect_view(frame, ByteOrder::Little, 1, |px, out| out.push(px[3]))
}

/// Decode `frame` into an array and its metadata
///
/// A null frame decodes to the empty array and default metadata. `Rgba`
/// appends alpha as the 4th channel after the color channels.
pub fn decode(
    frame: &VideoFrame,
    layout: ArrayLayout,
    order: ByteOrder,
) -> Result<(NumericArray, FrameMetadata)> {
    if !frame.is_valid() {
        return Ok((NumericArray::empty(), FrameMetadata::default()));
    }
    let array = match layout {
        ArrayLayout::Rgb => rgb_view(frame, order)?,
        ArrayLayout::Rgba => collect_view(frame, order, 4, |px, out| {
            match order {
                ByteOrder::Little => out.extend_from_slice(&px[..3]),
                ByteOrder::Big => out.extend_from_slice(&px[1..]),
            }
            out.push(match order {
                ByteOrder::Little => px[3],
                ByteOrder::Big => px[0],
            });
        })?,
    };
    Ok((array, FrameMetadata::capture(frame)))
}

/// Encode `array` into a new packed frame
///
/// Accepts (H, W) or (H, W, C) with C in 1..=4. One and two channel arrays
/// are expanded to gray; the last channel of a 2 or 4 channel array is alpha.
/// Masked pixels become fully transparent. A zero-sized array encodes to the
/// null frame.
pub fn encode<T: Sample>(array: &NumericArray<T>, normalize: Normalize) -> Result<VideoFrame> {
    let (h, w, channels) = match *array.shape() {
        [h, w] => (h, w, 1),
        [h, w, c] => (h, w, c),
        _ => return Err(Error::Dimension(array.ndim())),
    };
    if !(1..=4).contains(&channels) {
        return Err(Error::ChannelCount(channels));
    }
    if h == 0 || w == 0 {
        return Ok(VideoFrame::invalid());
    }

    let has_alpha = channels == 2 || channels == 4 || array.is_masked();
    let format = if has_alpha {
        PixelFormat::Bgra8888
    } else {
        PixelFormat::Bgrx8888
    };
    let samples = normalize.apply(array);
    let mask = array.mask().filter(|_| array.is_masked());

    let mut frame = VideoFrame::new(w as u32, h as u32, format);
    {
        let mut buffer = PixelBufferMut::map(&mut frame)?;
        let layout = buffer.layout();
        for y in 0..h {
            let row = buffer.row_mut(y);
            for (x, out) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let start = (y * w + x) * channels;
                let px = &samples[start..start + channels];
                let (r, g, b) = if channels >= 3 {
                    (px[0], px[1], px[2])
                } else {
                    (px[0], px[0], px[0])
                };
                let mut alpha = if channels == 2 || channels == 4 {
                    px[channels - 1]
                } else {
                    255
                };
                if let Some(mask) = mask {
                    if mask[start..start + channels].iter().any(|&m| m) {
                        alpha = 0;
                    }
                }
                out[layout.bgr[0]] = b;
                out[layout.bgr[1]] = g;
                out[layout.bgr[2]] = r;
                out[layout.alpha] = alpha;
            }
        }
    }
    Ok(frame)
}
