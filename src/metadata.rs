//! Frame metadata carried across a frame -> array -> frame round trip

use crate::frame::VideoFrame;
use crate::types::{MapMode, RotationAngle};
use serde::{Deserialize, Serialize};

/// Presentation metadata of a frame, detached from its pixels
///
/// The default value describes "no frame": unmapped, unset times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameMetadata {
    pub map_mode: MapMode,
    /// Start time in microseconds, -1 when unset
    pub start_time: i64,
    /// End time in microseconds, -1 when unset
    pub end_time: i64,
    pub mirrored: bool,
    pub rotation: RotationAngle,
    pub subtitle_text: String,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            map_mode: MapMode::NotMapped,
            start_time: -1,
            end_time: -1,
            mirrored: false,
            rotation: RotationAngle::Rotation0,
            subtitle_text: String::new(),
        }
    }
}

impl FrameMetadata {
    /// Read the metadata of `frame`
    pub fn capture(frame: &VideoFrame) -> Self {
        if !frame.is_valid() {
            return Self::default();
        }
        Self {
            map_mode: frame.map_mode(),
            start_time: frame.start_time(),
            end_time: frame.end_time(),
            mirrored: frame.mirrored(),
            rotation: frame.rotation_angle(),
            subtitle_text: frame.subtitle_text().to_owned(),
        }
    }

    /// Write every field onto `frame`
    pub fn apply(&self, frame: &mut VideoFrame) {
        self.apply_timing(frame);
        frame.set_mirrored(self.mirrored);
        frame.set_rotation_angle(self.rotation);
        frame.set_subtitle_text(self.subtitle_text.clone());
    }

    /// Write map mode and start/end time only
    pub fn apply_timing(&self, frame: &mut VideoFrame) {
        if self.map_mode == MapMode::NotMapped || !frame.map(self.map_mode) {
            frame.unmap();
        }
        frame.set_start_time(self.start_time);
        frame.set_end_time(self.end_time);
    }
}

/// Which metadata a frame worker copies onto its output frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetadataPolicy {
    /// Map mode and start/end time
    #[default]
    Timing,
    /// Everything, including rotation, mirroring and subtitle
    Full,
}

impl MetadataPolicy {
    pub fn apply(&self, metadata: &FrameMetadata, frame: &mut VideoFrame) {
        match self {
            MetadataPolicy::Timing => metadata.apply_timing(frame),
            MetadataPolicy::Full => metadata.apply(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;

    fn stamped_frame() -> VideoFrame {
        let mut frame = VideoFrame::new(2, 2, PixelFormat::Bgrx8888);
        frame.map(MapMode::ReadOnly);
        frame.set_start_time(1_000);
        frame.set_end_time(2_000);
        frame.set_mirrored(true);
        frame.set_rotation_angle(RotationAngle::Rotation90);
        frame.set_subtitle_text("hello");
        frame
    }

    #[test]
    fn test_capture_invalid_is_default() {
        assert_eq!(FrameMetadata::capture(&VideoFrame::invalid()), FrameMetadata::default());
    }

    #[test]
    fn test_capture_apply_round_trip() {
        let metadata = FrameMetadata::capture(&stamped_frame());
        assert_eq!(metadata.start_time, 1_000);
        assert_eq!(metadata.rotation, RotationAngle::Rotation90);

        let mut target = VideoFrame::new(2, 2, PixelFormat::Bgra8888);
        metadata.apply(&mut target);
        assert_eq!(FrameMetadata::capture(&target), metadata);
    }

    #[test]
    fn test_timing_policy_skips_presentation() {
        let metadata = FrameMetadata::capture(&stamped_frame());
        let mut target = VideoFrame::new(2, 2, PixelFormat::Bgra8888);
        MetadataPolicy::Timing.apply(&metadata, &mut target);
        assert_eq!(target.map_mode(), MapMode::ReadOnly);
        assert_eq!(target.end_time(), 2_000);
        assert!(!target.mirrored());
        assert_eq!(target.subtitle_text(), "");
    }

    #[test]
    fn test_not_mapped_unmaps() {
        let mut target = stamped_frame();
        FrameMetadata::default().apply(&mut target);
        assert!(!target.is_mapped());
        assert_eq!(target.start_time(), -1);
    }

    #[test]
    fn test_toml_round_trip() {
        let metadata = FrameMetadata::capture(&stamped_frame());
        let text = toml::to_string(&metadata).unwrap();
        let parsed: FrameMetadata = toml::from_str(&text).unwrap();
        assert_eq!(parsed, metadata);
    }
}
