//! Frame sources
//!
//! A source yields frames until it returns a null frame, which marks the end
//! of the stream.

use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::types::{PixelFormat, Resolution};
use futures::stream::{self, Stream};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Trait for frame sources
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Get next frame; a null frame means end of stream
    async fn next_frame(&mut self) -> Result<VideoFrame>;

    /// Frame size, if known
    fn resolution(&self) -> Option<Resolution>;

    /// False once the end of stream has been reached
    fn is_active(&self) -> bool;
}

/// Adapt a source into a stream that ends at the first null frame
///
/// An error is yielded once and also ends the stream.
pub fn frames<S: FrameSource>(source: S) -> impl Stream<Item = Result<VideoFrame>> {
    stream::unfold(Some(source), |state| async move {
        let mut source = state?;
        match source.next_frame().await {
            Ok(frame) if frame.is_valid() => Some((Ok(frame), Some(source))),
            Ok(_) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Deterministic moving-gradient test pattern
///
/// Frames are Bgrx8888 and stamped with start/end times in microseconds.
/// After `frame_count` frames (0 = endless) a single null frame is returned
/// and the source becomes inactive.
pub struct SyntheticSource {
    resolution: Resolution,
    fps: u32,
    frame_count: u64,
    index: u64,
    active: bool,
    interval: Option<tokio::time::Interval>,
}

impl SyntheticSource {
    pub fn new(resolution: Resolution, fps: u32, frame_count: u64) -> Result<Self> {
        if fps == 0 {
            return Err(Error::Source("fps must be positive".into()));
        }
        if resolution.is_empty() {
            return Err(Error::Source(format!("empty resolution {resolution}")));
        }
        Ok(Self {
            resolution,
            fps,
            frame_count,
            index: 0,
            active: true,
            interval: None,
        })
    }

    pub fn from_config(config: &crate::config::SourceConfig) -> Result<Self> {
        Self::new(config.resolution, config.fps, config.frame_count)
    }

    /// Deliver frames at the configured rate instead of as fast as possible
    ///
    /// Must be called from within a tokio runtime.
    pub fn paced(mut self) -> Self {
        let period = Duration::from_secs_f64(1.0 / self.fps as f64);
        let mut interval = tokio::time::interval_at(Instant::now(), period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self
    }

    pub fn frames_produced(&self) -> u64 {
        self.index
    }

    /// Render frame number `index` of the pattern
    pub fn render(&self, index: u64) -> VideoFrame {
        let Resolution { width, height } = self.resolution;
        let mut frame = VideoFrame::new(width, height, PixelFormat::Bgrx8888);
        let w = width as usize;
        let shift = index as usize;
        for (i, px) in frame.bits_mut().chunks_exact_mut(4).enumerate() {
            let (x, y) = (i % w, i / w);
            px[0] = (x + shift) as u8;
            px[1] = (y + shift) as u8;
            px[2] = ((x ^ y) + 2 * shift) as u8;
            px[3] = 255;
        }
        let micros = 1_000_000 / self.fps as i64;
        frame.set_start_time(index as i64 * micros);
        frame.set_end_time((index as i64 + 1) * micros);
        frame
    }
}

#[async_trait::async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<VideoFrame> {
        if !self.active {
            return Ok(VideoFrame::invalid());
        }
        if self.frame_count > 0 && self.index >= self.frame_count {
            self.active = false;
            tracing::debug!("Synthetic source finished after {} frames", self.index);
            return Ok(VideoFrame::invalid());
        }
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
        let frame = self.render(self.index);
        self.index += 1;
        Ok(frame)
    }

    fn resolution(&self) -> Option<Resolution> {
        Some(self.resolution)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Push side of a [`ChannelSource`]
#[derive(Debug, Clone)]
pub struct FrameSender {
    sender: mpsc::Sender<VideoFrame>,
}

impl FrameSender {
    /// Send a frame, waiting while the channel is full
    pub async fn send(&self, frame: VideoFrame) -> std::result::Result<(), VideoFrame> {
        self.sender.send(frame).await.map_err(|e| e.0)
    }

    /// Send without waiting; gives the frame back if full or closed
    pub fn try_send(&self, frame: VideoFrame) -> std::result::Result<(), VideoFrame> {
        self.sender.try_send(frame).map_err(|e| e.into_inner())
    }
}

/// Source fed by pushing frames from elsewhere
///
/// The stream ends when every [`FrameSender`] is dropped.
pub struct ChannelSource {
    receiver: mpsc::Receiver<VideoFrame>,
    resolution: Option<Resolution>,
    active: bool,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (FrameSender, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            FrameSender { sender },
            Self {
                receiver,
                resolution: None,
                active: true,
            },
        )
    }
}

#[async_trait::async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<VideoFrame> {
        match self.receiver.recv().await {
            Some(frame) => {
                if frame.is_valid() {
                    self.resolution = Some(frame.resolution());
                }
                Ok(frame)
            }
            None => {
                self.active = false;
                Ok(VideoFrame::invalid())
            }
        }
    }

    fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::types::{ArrayLayout, ByteOrder};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_synthetic_source_ends_with_null_frame() {
        let mut source = SyntheticSource::new(Resolution::new(4, 2), 25, 3).unwrap();
        for i in 0..3 {
            let frame = source.next_frame().await.unwrap();
            assert!(frame.is_valid());
            assert_eq!(frame.start_time(), i * 40_000);
            assert_eq!(frame.end_time(), (i + 1) * 40_000);
        }
        assert!(!source.next_frame().await.unwrap().is_valid());
        assert!(!source.is_active());
        assert!(!source.next_frame().await.unwrap().is_valid());
    }

    #[test]
    fn test_pattern_is_deterministic() {
        let source = SyntheticSource::new(Resolution::new(8, 8), 30, 0).unwrap();
        assert_eq!(source.render(5), source.render(5));
        assert_ne!(source.render(5).bits(), source.render(6).bits());
        let (array, _) =
            codec::decode(&source.render(1), ArrayLayout::Rgb, ByteOrder::Big).unwrap();
        // (x=0, y=0): r = 2, g = 1, b = 1
        assert_eq!(&array.as_slice()[..3], &[2, 1, 1]);
    }

    #[test]
    fn test_rejects_zero_fps() {
        assert!(SyntheticSource::new(Resolution::QVGA, 0, 1).is_err());
    }

    #[tokio::test]
    async fn test_frames_stream() {
        let source = SyntheticSource::new(Resolution::new(2, 2), 30, 4).unwrap();
        let collected: Vec<_> = frames(source).collect().await;
        assert_eq!(collected.len(), 4);
        assert!(collected.iter().all(|f| f.is_ok()));
    }

    #[tokio::test]
    async fn test_channel_source() {
        let (sender, mut source) = ChannelSource::new(2);
        sender.send(VideoFrame::new(3, 1, PixelFormat::Bgra8888)).await.unwrap();
        drop(sender);
        let frame = source.next_frame().await.unwrap();
        assert!(frame.is_valid());
        assert_eq!(source.resolution(), Some(Resolution::new(3, 1)));
        assert!(!source.next_frame().await.unwrap().is_valid());
        assert!(!source.is_active());
    }
}
