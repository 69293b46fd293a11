//! Owned video frame with presentation metadata

use crate::error::{Error, Result};
use crate::types::{MapMode, PixelFormat, Resolution, RotationAngle};

/// A video frame
///
/// Pixel memory is only reachable through the borrow-scoped views in
/// [`crate::codec::buffer`], so no view can outlive an unmap.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    bytes_per_line: usize,
    format: PixelFormat,
    map_mode: MapMode,
    start_time: i64,
    end_time: i64,
    mirrored: bool,
    rotation: RotationAngle,
    subtitle_text: String,
}

impl VideoFrame {
    /// Create a zero-filled frame
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let (size, bytes_per_line) = format.buffer_layout(width, height);
        Self {
            data: vec![0u8; size],
            width,
            height,
            bytes_per_line,
            format,
            ..Self::invalid()
        }
    }

    /// The null frame, as sent by sources at end of stream
    pub fn invalid() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            bytes_per_line: 0,
            format: PixelFormat::Invalid,
            map_mode: MapMode::NotMapped,
            start_time: -1,
            end_time: -1,
            mirrored: false,
            rotation: RotationAngle::Rotation0,
            subtitle_text: String::new(),
        }
    }

    /// Wrap existing pixel memory, possibly with padded rows
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        bytes_per_line: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        let (_, min_line) = format.buffer_layout(width, 1);
        if bytes_per_line < min_line {
            return Err(Error::InvalidFrame(format!(
                "bytes per line {} smaller than {} for {} pixels of {}",
                bytes_per_line, min_line, width, format
            )));
        }
        let needed = bytes_per_line * height as usize;
        if data.len() < needed {
            return Err(Error::InvalidFrame(format!(
                "buffer holds {} bytes, {}x{} {} needs {}",
                data.len(),
                width,
                height,
                format,
                needed
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            bytes_per_line,
            format,
            ..Self::invalid()
        })
    }

    /// Valid frames have a format, a non-zero size and enough memory
    pub fn is_valid(&self) -> bool {
        self.format != PixelFormat::Invalid
            && self.width > 0
            && self.height > 0
            && self.data.len() >= self.bytes_per_line * self.height as usize
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Raw memory, including row padding
    pub fn bits(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn bits_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn map_mode(&self) -> MapMode {
        self.map_mode
    }

    pub fn is_mapped(&self) -> bool {
        self.map_mode != MapMode::NotMapped
    }

    /// Record `mode` as the frame's map state
    ///
    /// Returns false for invalid frames and for `NotMapped`, which the frame
    /// keeps as its state.
    pub fn map(&mut self, mode: MapMode) -> bool {
        if !self.is_valid() || mode == MapMode::NotMapped {
            return false;
        }
        self.map_mode = mode;
        true
    }

    pub fn unmap(&mut self) {
        self.map_mode = MapMode::NotMapped;
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn set_start_time(&mut self, time: i64) {
        self.start_time = time;
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn set_end_time(&mut self, time: i64) {
        self.end_time = time;
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    pub fn rotation_angle(&self) -> RotationAngle {
        self.rotation
    }

    pub fn set_rotation_angle(&mut self, angle: RotationAngle) {
        self.rotation = angle;
    }

    pub fn subtitle_text(&self) -> &str {
        &self.subtitle_text
    }

    pub fn set_subtitle_text(&mut self, text: impl Into<String>) {
        self.subtitle_text = text.into();
    }
}

impl Default for VideoFrame {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_frame_defaults() {
        let frame = VideoFrame::invalid();
        assert!(!frame.is_valid());
        assert_eq!(frame.start_time(), -1);
        assert_eq!(frame.end_time(), -1);
        assert_eq!(frame, VideoFrame::default());
    }

    #[test]
    fn test_map_state() {
        let mut frame = VideoFrame::new(2, 2, PixelFormat::Bgrx8888);
        assert!(frame.is_valid());
        assert!(frame.map(MapMode::ReadOnly));
        assert_eq!(frame.map_mode(), MapMode::ReadOnly);
        frame.unmap();
        assert!(!frame.is_mapped());

        let mut null = VideoFrame::invalid();
        assert!(!null.map(MapMode::ReadWrite));
        assert_eq!(null.map_mode(), MapMode::NotMapped);
    }

    #[test]
    fn test_from_raw_checks_size() {
        assert!(VideoFrame::from_raw(vec![0; 16], 2, 2, 8, PixelFormat::Bgra8888).is_ok());
        assert!(VideoFrame::from_raw(vec![0; 24], 2, 2, 12, PixelFormat::Bgra8888).is_ok());
        assert!(VideoFrame::from_raw(vec![0; 15], 2, 2, 8, PixelFormat::Bgra8888).is_err());
        assert!(VideoFrame::from_raw(vec![0; 16], 2, 2, 4, PixelFormat::Bgra8888).is_err());
    }
}
