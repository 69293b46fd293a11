//! Frame processing pipeline
//!
//! Connects source -> frame processor -> output signals. Frames are pulled on
//! a tokio task and submitted to a [`FrameProcessor`]; whatever the worker
//! publishes is fanned out to [`Pipeline::frame_output`] and
//! [`Pipeline::array_output`].

use crate::array::NumericArray;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::processing;
use crate::processor::{FrameProcessor, ProcessorStats};
use crate::signal::Signal;
use crate::source::FrameSource;
use crate::worker::{ArrayTransform, FrameWorker};

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

/// How long a stopping pipeline waits for a blocked source
const STOP_GRACE: Duration = Duration::from_secs(1);

/// How long end of stream waits for the worker before submitting the null frame
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Statistics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Valid frames pulled from the source
    pub frames_pulled: u64,
    /// Recoverable source errors that were skipped
    pub source_errors: u64,
    /// Frames published on `frame_output`
    pub frames_out: u64,
    /// Arrays published on `array_output`
    pub arrays_out: u64,
    /// Worker steps that failed
    pub failures: u64,
    /// True once the source returned a null frame
    pub end_of_stream: bool,
    /// Seconds since `start`
    pub elapsed_secs: f64,
    pub processor: ProcessorStats,
}

impl PipelineStats {
    /// Published frames per second since `start`
    pub fn output_fps(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.frames_out as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    frames_pulled: AtomicU64,
    source_errors: AtomicU64,
    frames_out: AtomicU64,
    arrays_out: AtomicU64,
    failures: AtomicU64,
    end_of_stream: AtomicBool,
}

/// Source -> processor -> signals
pub struct Pipeline {
    config: PipelineConfig,
    processor: Arc<FrameProcessor>,
    frame_output: Arc<Signal<VideoFrame>>,
    array_output: Arc<Signal<NumericArray>>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    counters: Arc<Counters>,
    started: parking_lot::Mutex<Option<Instant>>,
    task: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Pipeline {
    /// Create a pipeline from config, installing the configured stock transform
    pub fn new(config: PipelineConfig) -> Result<Self> {
        PipelineBuilder::new().config(config).build()
    }

    fn from_parts(config: PipelineConfig, worker: FrameWorker) -> Result<Self> {
        config.validate()?;
        let processor = Arc::new(FrameProcessor::with_config(&config.processor)?);
        processor.set_worker(Some(worker))?;

        let frame_output = Arc::new(Signal::new());
        let array_output = Arc::new(Signal::new());
        let counters = Arc::new(Counters::default());

        {
            let frame_output = frame_output.clone();
            let array_output = array_output.clone();
            let counters = counters.clone();
            processor.output().connect(move |outcome| match outcome {
                Ok(processed) => {
                    counters.frames_out.fetch_add(1, Ordering::Relaxed);
                    frame_output.emit(&processed.frame);
                    if let Some(array) = &processed.array {
                        counters.arrays_out.fetch_add(1, Ordering::Relaxed);
                        array_output.emit(array);
                    }
                }
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Frame dropped: {}", e);
                }
            });
        }

        Ok(Self {
            config,
            processor,
            frame_output,
            array_output,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            counters,
            started: parking_lot::Mutex::new(None),
            task: Mutex::new(None),
        })
    }

    /// Start pulling frames from `source`
    pub async fn start(&self, source: Box<dyn FrameSource>) -> Result<()> {
        if self.processor.is_stopped() {
            return Err(Error::Lifecycle("pipeline was stopped".into()));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Lifecycle("pipeline already running".into()));
        }

        tracing::info!(
            "Pipeline starting (source: {}, skip_if_running: {})",
            source
                .resolution()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".into()),
            self.processor.skip_if_running()
        );
        *self.started.lock() = Some(Instant::now());

        let handle = tokio::spawn(pump(
            source,
            self.processor.clone(),
            self.running.clone(),
            self.shutdown.clone(),
            self.counters.clone(),
            self.config.converter.ignore_null_frame,
        ));
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Wait until the source reaches end of stream (or fails)
    ///
    /// Results of in-flight steps may still arrive afterwards; call
    /// [`Pipeline::stop`] to flush them.
    pub async fn wait(&self) -> Result<()> {
        let handle = self.task.lock().await.take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| Error::Internal(format!("pipeline task failed: {}", e)))?,
            None => Ok(()),
        }
    }

    /// Stop pulling frames, finish queued work and stop the processor
    pub async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
        tracing::info!("Pipeline stop requested");

        let handle = self.task.lock().await.take();
        let mut result = Ok(());
        if let Some(mut handle) = handle {
            match tokio::time::timeout(STOP_GRACE, &mut handle).await {
                Ok(Ok(r)) => result = r,
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => result = Err(Error::Internal(format!("pipeline task failed: {}", e))),
                Err(_) => {
                    tracing::warn!("Source did not yield within {:?}, aborting", STOP_GRACE);
                    handle.abort();
                }
            }
        }

        let processor = self.processor.clone();
        tokio::task::spawn_blocking(move || processor.stop())
            .await
            .map_err(|e| Error::Internal(format!("processor stop failed: {}", e)))?;
        tracing::info!("Pipeline stopped");
        result
    }

    /// Check if pipeline is pulling frames
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get current statistics
    pub fn stats(&self) -> PipelineStats {
        let elapsed_secs = self
            .started
            .lock()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        PipelineStats {
            frames_pulled: self.counters.frames_pulled.load(Ordering::Relaxed),
            source_errors: self.counters.source_errors.load(Ordering::Relaxed),
            frames_out: self.counters.frames_out.load(Ordering::Relaxed),
            arrays_out: self.counters.arrays_out.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            end_of_stream: self.counters.end_of_stream.load(Ordering::Relaxed),
            elapsed_secs,
            processor: self.processor.stats(),
        }
    }

    /// Processed frames, including the null frame at end of stream
    pub fn frame_output(&self) -> &Signal<VideoFrame> {
        &self.frame_output
    }

    /// Arrays produced by the worker
    pub fn array_output(&self) -> &Signal<NumericArray> {
        &self.array_output
    }

    /// The processor, e.g. to swap the worker while running
    pub fn processor(&self) -> &FrameProcessor {
        &self.processor
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("running", &self.is_running())
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

/// Pull frames until end of stream, shutdown or a fatal source error
async fn pump(
    mut source: Box<dyn FrameSource>,
    processor: Arc<FrameProcessor>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    counters: Arc<Counters>,
    ignore_null_frame: bool,
) -> Result<()> {
    let result = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(());
        }

        let next = tokio::select! {
            _ = shutdown.notified() => break Ok(()),
            next = source.next_frame() => next,
        };

        let frame = match next {
            Ok(frame) => frame,
            Err(e) if e.is_recoverable() => {
                counters.source_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Source error, skipping frame: {}", e);
                tokio::task::yield_now().await;
                continue;
            }
            Err(e) => {
                tracing::error!("Source failed: {}", e);
                break Err(e);
            }
        };

        if !frame.is_valid() {
            counters.end_of_stream.store(true, Ordering::Relaxed);
            tracing::info!(
                "End of stream after {} frames",
                counters.frames_pulled.load(Ordering::Relaxed)
            );
            if !ignore_null_frame {
                break flush_null_frame(&processor, frame).await;
            }
            break Ok(());
        }

        counters.frames_pulled.fetch_add(1, Ordering::Relaxed);
        match processor.submit(frame) {
            Ok(dispatch) => tracing::trace!(?dispatch, "frame submitted"),
            Err(e) => break Err(e),
        }
        // Unpaced sources never return Pending
        tokio::task::yield_now().await;
    };

    running.store(false, Ordering::SeqCst);
    result
}

/// Submit the null frame once the worker is idle so it is not skipped
async fn flush_null_frame(processor: &Arc<FrameProcessor>, frame: VideoFrame) -> Result<()> {
    let waiter = processor.clone();
    let idle = tokio::task::spawn_blocking(move || waiter.wait_idle(FLUSH_TIMEOUT))
        .await
        .map_err(|e| Error::Internal(format!("flush failed: {}", e)))?;
    if !idle {
        tracing::warn!("Worker still busy after {:?}, null frame may be skipped", FLUSH_TIMEOUT);
    }
    processor.submit(frame)?;
    Ok(())
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    transform: Option<Box<dyn ArrayTransform>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            transform: None,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `transform` instead of the stock transform named in the config
    pub fn transform(mut self, transform: impl ArrayTransform) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Select a stock transform by name
    pub fn transform_name(mut self, name: impl Into<String>) -> Self {
        self.config.processor.transform = name.into();
        self.transform = None;
        self
    }

    pub fn skip_if_running(mut self, skip: bool) -> Self {
        self.config.processor.skip_if_running = skip;
        self
    }

    pub fn ignore_null_frame(mut self, ignore: bool) -> Self {
        self.config.converter.ignore_null_frame = ignore;
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let transform = match self.transform {
            Some(transform) => transform,
            None => processing::by_name(&self.config.processor.transform)?,
        };
        let worker = FrameWorker::from_boxed(transform)
            .with_byte_order(self.config.converter.byte_order)
            .with_normalize(self.config.converter.normalize)
            .with_metadata_policy(self.config.processor.metadata_policy);
        Pipeline::from_parts(self.config, worker)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
