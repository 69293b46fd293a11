//! Common types used throughout vidarray

use serde::{Deserialize, Serialize};

/// Frame resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    // Common resolutions
    pub const QVGA: Self = Self::new(320, 240);
    pub const VGA: Self = Self::new(640, 480);
    pub const HD_720P: Self = Self::new(1280, 720);

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width = w.trim().parse().map_err(|_| format!("bad width {w:?}"))?;
        let height = h.trim().parse().map_err(|_| format!("bad height {h:?}"))?;
        Ok(Self::new(width, height))
    }
}

/// Pixel format tag carried by a frame
///
/// Only the packed 32-bit formats can be converted to arrays; the rest exist
/// so sources can hand over frames the codec has to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    /// No format (null frame)
    #[default]
    Invalid,
    /// 32-bit B,G,R,A in memory order
    Bgra8888,
    /// 32-bit B,G,R,X in memory order (4th byte is padding)
    Bgrx8888,
    /// 32-bit R,G,B,A in memory order
    Rgba8888,
    /// NV12 - Y plane + interleaved UV
    Nv12,
    /// YUV420P - Planar YUV 4:2:0
    Yuv420p,
}

impl PixelFormat {
    /// Size in bytes of a `width` x `height` image, and its bytes per line
    pub fn buffer_layout(&self, width: u32, height: u32) -> (usize, usize) {
        let (w, h) = (width as usize, height as usize);
        match self {
            PixelFormat::Invalid => (0, 0),
            PixelFormat::Bgra8888 | PixelFormat::Bgrx8888 | PixelFormat::Rgba8888 => {
                (w * 4 * h, w * 4)
            }
            PixelFormat::Nv12 | PixelFormat::Yuv420p => (w * h * 3 / 2, w),
        }
    }

    /// Is this one of the packed 32-bit formats the codec can convert?
    pub fn is_supported(&self) -> bool {
        matches!(self, PixelFormat::Bgra8888 | PixelFormat::Bgrx8888)
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How a frame's memory is currently mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MapMode {
    #[default]
    NotMapped,
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Rotation to apply when presenting a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RotationAngle {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl RotationAngle {
    /// Angle in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            RotationAngle::Rotation0 => 0,
            RotationAngle::Rotation90 => 90,
            RotationAngle::Rotation180 => 180,
            RotationAngle::Rotation270 => 270,
        }
    }
}

/// Channel order of the 4 bytes of a packed pixel
///
/// `Little` is memory order (B,G,R,A for the supported formats); `Big` is the
/// reversed A,R,G,B order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    #[default]
    Big,
}

/// Channel layout of a decoded array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArrayLayout {
    /// (H, W, 3) color only
    #[default]
    Rgb,
    /// (H, W, 4) color followed by alpha
    Rgba,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        let res: Resolution = "320x240".parse().unwrap();
        assert_eq!(res, Resolution::QVGA);
        assert!("320".parse::<Resolution>().is_err());
        assert!("ax2".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_buffer_layout() {
        assert_eq!(PixelFormat::Bgra8888.buffer_layout(3, 2), (24, 12));
        assert_eq!(PixelFormat::Nv12.buffer_layout(4, 4), (24, 4));
        assert_eq!(PixelFormat::Invalid.buffer_layout(4, 4), (0, 0));
        assert!(PixelFormat::Bgrx8888.is_supported());
        assert!(!PixelFormat::Rgba8888.is_supported());
    }
}
