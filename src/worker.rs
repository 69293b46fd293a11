//! Workers: one processing step with a shared ready flag
//!
//! A worker is owned by the thread that runs it. Producers only ever see its
//! [`ReadyFlag`], which is false for the whole step, publish included.

use crate::array::NumericArray;
use crate::codec::{self, Normalize};
use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::metadata::{FrameMetadata, MetadataPolicy};
use crate::types::{ArrayLayout, ByteOrder};
use std::panic::{self, AssertUnwindSafe};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result published for every processed input
pub type Outcome<T> = std::result::Result<T, Arc<Error>>;

#[derive(Debug)]
struct FlagState {
    ready: AtomicBool,
    lock: Mutex<()>,
    released: Condvar,
}

/// Shared "not processing" flag of a worker
#[derive(Debug, Clone)]
pub struct ReadyFlag(Arc<FlagState>);

impl ReadyFlag {
    pub fn new() -> Self {
        Self(Arc::new(FlagState {
            ready: AtomicBool::new(true),
            lock: Mutex::new(()),
            released: Condvar::new(),
        }))
    }

    pub fn is_ready(&self) -> bool {
        self.0.ready.load(Ordering::Acquire)
    }

    /// Atomically take the flag (true -> false); false if already busy
    pub fn try_claim(&self) -> bool {
        self.0
            .ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark busy until the returned guard is dropped
    pub fn enter(&self) -> BusyGuard {
        self.0.ready.store(false, Ordering::Release);
        BusyGuard(self.clone())
    }

    pub fn release(&self) {
        self.0.ready.store(true, Ordering::Release);
        // Taking the lock orders the store before any waiter's re-check
        let _lock = self.0.lock.lock();
        self.0.released.notify_all();
    }

    /// Block until the flag is ready, up to `timeout`; false on timeout
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut lock = self.0.lock.lock();
        while !self.is_ready() {
            if self.0.released.wait_until(&mut lock, deadline).timed_out() {
                return self.is_ready();
            }
        }
        true
    }
}

impl Default for ReadyFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets the flag back to ready on drop, including during unwinding
#[derive(Debug)]
pub struct BusyGuard(ReadyFlag);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// One step of processing, run on a processor thread
pub trait Worker: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn ready_flag(&self) -> &ReadyFlag;

    /// False from the start of a step until its result is published
    fn ready(&self) -> bool {
        self.ready_flag().is_ready()
    }

    fn process(&mut self, input: Self::Input) -> Result<Self::Output>;

    /// Output produced for `input` when no worker is installed
    fn passthrough(input: Self::Input) -> Self::Output;

    /// Run one step and hand its outcome to `publish`
    ///
    /// Ready turns true only after `publish` returns, even when `process`
    /// fails or panics. A panic is published as [`Error::Transform`].
    fn run_step<F>(&mut self, input: Self::Input, publish: F)
    where
        F: FnOnce(Outcome<Self::Output>),
    {
        let _busy = self.ready_flag().enter();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process(input)))
            .unwrap_or_else(|payload| Err(Error::Transform(panic_message(payload.as_ref()))));
        if let Err(e) = &result {
            tracing::warn!("worker step failed: {}", e);
        }
        publish(result.map_err(Arc::new));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("transform panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("transform panicked: {s}")
    } else {
        "transform panicked".to_string()
    }
}

/// User-supplied array -> array function
pub trait ArrayTransform: Send + 'static {
    fn process_array(&mut self, array: NumericArray) -> Result<NumericArray>;
}

impl<F> ArrayTransform for F
where
    F: FnMut(NumericArray) -> Result<NumericArray> + Send + 'static,
{
    fn process_array(&mut self, array: NumericArray) -> Result<NumericArray> {
        self(array)
    }
}

/// Returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ArrayTransform for Identity {
    fn process_array(&mut self, array: NumericArray) -> Result<NumericArray> {
        Ok(array)
    }
}

/// Worker that transforms arrays
pub struct ArrayWorker {
    transform: Box<dyn ArrayTransform>,
    ready: ReadyFlag,
}

impl ArrayWorker {
    pub fn new(transform: impl ArrayTransform) -> Self {
        Self::from_boxed(Box::new(transform))
    }

    pub fn from_boxed(transform: Box<dyn ArrayTransform>) -> Self {
        Self {
            transform,
            ready: ReadyFlag::new(),
        }
    }
}

impl Default for ArrayWorker {
    fn default() -> Self {
        Self::new(Identity)
    }
}

impl std::fmt::Debug for ArrayWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayWorker")
            .field("ready", &self.ready())
            .finish_non_exhaustive()
    }
}

impl Worker for ArrayWorker {
    type Input = NumericArray;
    type Output = NumericArray;

    fn ready_flag(&self) -> &ReadyFlag {
        &self.ready
    }

    fn process(&mut self, input: NumericArray) -> Result<NumericArray> {
        self.transform.process_array(input)
    }

    fn passthrough(input: NumericArray) -> NumericArray {
        input
    }
}

/// A processed frame and the array it was encoded from
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    pub frame: VideoFrame,
    /// None when the frame was passed through untouched
    pub array: Option<NumericArray>,
}

impl ProcessedFrame {
    pub fn passthrough(frame: VideoFrame) -> Self {
        Self { frame, array: None }
    }
}

/// Worker that decodes frames, transforms the array and re-encodes it
pub struct FrameWorker {
    transform: Box<dyn ArrayTransform>,
    ready: ReadyFlag,
    byte_order: ByteOrder,
    normalize: Normalize,
    metadata_policy: MetadataPolicy,
}

impl FrameWorker {
    pub fn new(transform: impl ArrayTransform) -> Self {
        Self::from_boxed(Box::new(transform))
    }

    /// Wrap a transform picked at runtime, e.g. by [`crate::processing::by_name`]
    pub fn from_boxed(transform: Box<dyn ArrayTransform>) -> Self {
        Self {
            transform,
            ready: ReadyFlag::new(),
            byte_order: ByteOrder::default(),
            normalize: Normalize::default(),
            metadata_policy: MetadataPolicy::default(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata_policy = policy;
        self
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

impl Default for FrameWorker {
    fn default() -> Self {
        Self::new(Identity)
    }
}

impl std::fmt::Debug for FrameWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWorker")
            .field("ready", &self.ready())
            .field("byte_order", &self.byte_order)
            .field("normalize", &self.normalize)
            .field("metadata_policy", &self.metadata_policy)
            .finish_non_exhaustive()
    }
}

impl Worker for FrameWorker {
    type Input = VideoFrame;
    type Output = ProcessedFrame;

    fn ready_flag(&self) -> &ReadyFlag {
        &self.ready
    }

    fn process(&mut self, frame: VideoFrame) -> Result<ProcessedFrame> {
        let (array, metadata) = if frame.is_valid() {
            codec::decode(&frame, ArrayLayout::Rgb, self.byte_order)?
        } else {
            (NumericArray::empty(), FrameMetadata::default())
        };
        let processed = self.transform.process_array(array)?;
        if processed.is_empty() {
            return Ok(ProcessedFrame {
                frame,
                array: Some(processed),
            });
        }
        let mut out = codec::encode(&processed, self.normalize)?;
        self.metadata_policy.apply(&metadata, &mut out);
        Ok(ProcessedFrame {
            frame: out,
            array: Some(processed),
        })
    }

    fn passthrough(frame: VideoFrame) -> ProcessedFrame {
        ProcessedFrame::passthrough(frame)
    }
}
