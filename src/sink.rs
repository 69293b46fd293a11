//! Display sinks: consumers of frames and arrays
//!
//! Rendering itself is external. These sinks cover the headless part: keeping
//! the most recent value and forwarding it.

use crate::array::NumericArray;
use crate::display::ArrayLabel;
use crate::frame::VideoFrame;
use crate::signal::{ConnectionId, Signal};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives values to show; must not block the caller
pub trait DisplaySink<T>: Send + Sync {
    fn display(&self, item: &T);
}

/// Connect `sink` so it receives every value emitted by `signal`
pub fn connect_sink<T, S>(signal: &Signal<T>, sink: Arc<S>) -> ConnectionId
where
    T: 'static,
    S: DisplaySink<T> + 'static,
{
    signal.connect(move |item: &T| sink.display(item))
}

/// Depth-1 sink: only the latest value is kept
#[derive(Debug)]
pub struct LatestSink<T> {
    slot: Mutex<Option<T>>,
    updates: AtomicU64,
}

impl<T: Clone> LatestSink<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            updates: AtomicU64::new(0),
        }
    }

    /// Copy of the latest value, leaving it in place
    pub fn latest(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    /// Remove and return the latest value
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Number of values received so far
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl<T: Clone> Default for LatestSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> DisplaySink<T> for LatestSink<T> {
    fn display(&self, item: &T) {
        *self.slot.lock() = Some(item.clone());
        self.updates.fetch_add(1, Ordering::Relaxed);
    }
}

/// Keeps the last valid frame; null frames leave it untouched
#[derive(Debug, Default)]
pub struct ValidFrameSink {
    last: Mutex<Option<VideoFrame>>,
    frame_changed: Signal<VideoFrame>,
}

impl ValidFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<VideoFrame> {
        self.last.lock().clone()
    }

    /// Emitted for every accepted frame
    pub fn frame_changed(&self) -> &Signal<VideoFrame> {
        &self.frame_changed
    }
}

impl DisplaySink<VideoFrame> for ValidFrameSink {
    fn display(&self, frame: &VideoFrame) {
        if !frame.is_valid() {
            return;
        }
        *self.last.lock() = Some(frame.clone());
        self.frame_changed.emit(frame);
    }
}

impl DisplaySink<NumericArray> for Mutex<ArrayLabel> {
    fn display(&self, array: &NumericArray) {
        if let Err(e) = self.lock().set_array(array.clone()) {
            tracing::error!("Cannot display array: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, Resolution};

    #[test]
    fn test_latest_wins() {
        let signal = Signal::<u32>::new();
        let sink = Arc::new(LatestSink::new());
        connect_sink(&signal, sink.clone());
        for v in 0..5 {
            signal.emit(&v);
        }
        assert_eq!(sink.latest(), Some(4));
        assert_eq!(sink.update_count(), 5);
        assert_eq!(sink.take(), Some(4));
        assert_eq!(sink.take(), None);
    }

    #[test]
    fn test_valid_frame_sink_skips_null() {
        let sink = ValidFrameSink::new();
        let (_, changed) = sink.frame_changed().subscribe();
        let frame = VideoFrame::new(2, 2, PixelFormat::Bgrx8888);
        sink.display(&frame);
        sink.display(&VideoFrame::invalid());
        assert_eq!(sink.last_frame(), Some(frame));
        assert_eq!(changed.try_iter().count(), 1);
    }

    #[test]
    fn test_label_sink() {
        let label = Arc::new(Mutex::new(ArrayLabel::new(Resolution::new(2, 2))));
        label.display(&NumericArray::filled([4, 4, 3], 9u8));
        assert_eq!(label.lock().rendered_size(), Resolution::new(2, 2));
    }
}
