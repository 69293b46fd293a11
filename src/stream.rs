//! Frame <-> array converter stages
//!
//! Each converter performs one conversion per call and publishes the result
//! on its signal, so stages can be chained by connecting signals.

use crate::array::NumericArray;
use crate::codec::{self, Normalize};
use crate::config::ConverterConfig;
use crate::error::Result;
use crate::frame::VideoFrame;
use crate::metadata::FrameMetadata;
use crate::signal::Signal;
use crate::types::{ArrayLayout, ByteOrder};

/// Decodes frames into arrays
#[derive(Debug, Default)]
pub struct FrameToArrayConverter {
    ignore_null_frame: bool,
    byte_order: ByteOrder,
    layout: ArrayLayout,
    array_converted: Signal<(NumericArray, FrameMetadata)>,
}

impl FrameToArrayConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            ignore_null_frame: config.ignore_null_frame,
            byte_order: config.byte_order,
            layout: config.layout,
            array_converted: Signal::new(),
        }
    }

    pub fn ignore_null_frame(&self) -> bool {
        self.ignore_null_frame
    }

    /// When set, null frames produce no output at all
    pub fn set_ignore_null_frame(&mut self, ignore: bool) {
        self.ignore_null_frame = ignore;
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    pub fn layout(&self) -> ArrayLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: ArrayLayout) {
        self.layout = layout;
    }

    /// Emitted with every decoded array and the source frame's metadata
    pub fn array_converted(&self) -> &Signal<(NumericArray, FrameMetadata)> {
        &self.array_converted
    }

    /// Decode `frame` and publish the result
    ///
    /// Unsupported formats are returned as errors and publish nothing.
    pub fn convert_video_frame(&self, frame: &VideoFrame) -> Result<()> {
        if !frame.is_valid() && self.ignore_null_frame {
            tracing::trace!("ignoring null frame");
            return Ok(());
        }
        match codec::decode(frame, self.layout, self.byte_order) {
            Ok(converted) => {
                self.array_converted.emit(&converted);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Frame conversion failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Encodes arrays into frames
#[derive(Debug, Default)]
pub struct ArrayToFrameConverter {
    normalize: Normalize,
    frame_converted: Signal<VideoFrame>,
}

impl ArrayToFrameConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            normalize: config.normalize,
            frame_converted: Signal::new(),
        }
    }

    pub fn normalize(&self) -> Normalize {
        self.normalize
    }

    pub fn set_normalize(&mut self, normalize: Normalize) {
        self.normalize = normalize;
    }

    pub fn frame_converted(&self) -> &Signal<VideoFrame> {
        &self.frame_converted
    }

    /// Encode `array`, stamp it with `metadata` and publish the frame
    ///
    /// An empty array publishes a null frame carrying the metadata.
    pub fn convert_array(&self, array: &NumericArray, metadata: &FrameMetadata) -> Result<()> {
        let mut frame = if array.is_empty() {
            VideoFrame::invalid()
        } else {
            codec::encode(array, self.normalize).map_err(|e| {
                tracing::error!("Array conversion failed: {}", e);
                e
            })?
        };
        metadata.apply(&mut frame);
        self.frame_converted.emit(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{MapMode, PixelFormat};

    #[test]
    fn test_null_frame_policy() {
        let mut converter = FrameToArrayConverter::new();
        let (_, rx) = converter.array_converted().subscribe();

        converter.convert_video_frame(&VideoFrame::invalid()).unwrap();
        let (array, metadata) = rx.try_recv().unwrap();
        assert_eq!(array.shape(), &[0, 0, 0]);
        assert_eq!(metadata, FrameMetadata::default());

        converter.set_ignore_null_frame(true);
        converter.convert_video_frame(&VideoFrame::invalid()).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsupported_format_publishes_nothing() {
        let converter = FrameToArrayConverter::new();
        let (_, rx) = converter.array_converted().subscribe();
        let err = converter
            .convert_video_frame(&VideoFrame::new(2, 2, PixelFormat::Yuv420p))
            .unwrap_err();
        assert!(matches!(err, Error::Format(PixelFormat::Yuv420p)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_chain_preserves_pixels_and_metadata() {
        let decoder = FrameToArrayConverter::new();
        let encoder = ArrayToFrameConverter::new();
        let (_, arrays) = decoder.array_converted().subscribe();
        let (_, frames) = encoder.frame_converted().subscribe();

        let mut source = codec::encode(
            &NumericArray::from_shape_vec([1, 2, 3], vec![1u8, 2, 3, 4, 5, 6]).unwrap(),
            Normalize::Off,
        )
        .unwrap();
        source.map(MapMode::ReadOnly);
        source.set_start_time(100);
        source.set_subtitle_text("line");

        decoder.convert_video_frame(&source).unwrap();
        let (array, metadata) = arrays.try_recv().unwrap();
        encoder.convert_array(&array, &metadata).unwrap();
        let frame = frames.try_recv().unwrap();

        assert_eq!(frame.bits(), source.bits());
        assert_eq!(FrameMetadata::capture(&frame), metadata);
    }

    #[test]
    fn test_empty_array_gives_null_frame() {
        let encoder = ArrayToFrameConverter::new();
        let (_, frames) = encoder.frame_converted().subscribe();
        let metadata = FrameMetadata {
            start_time: 7,
            ..Default::default()
        };
        encoder.convert_array(&NumericArray::empty(), &metadata).unwrap();
        let frame = frames.try_recv().unwrap();
        assert!(!frame.is_valid());
        assert_eq!(frame.start_time(), 7);
    }
}
