//! Processor: runs one worker on a dedicated thread
//!
//! The producer calls [`Processor::submit`], which never blocks. With
//! skip-if-running enabled (the default) an input arriving while the worker is
//! busy is dropped; otherwise it is queued behind the running step. Results
//! are published on [`Processor::output`] from the processor thread, in
//! dispatch order.

use crate::config::ProcessorConfig;
use crate::error::{Error, Result};
use crate::signal::Signal;
use crate::worker::{ArrayWorker, FrameWorker, Outcome, ReadyFlag, Worker};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Processor over array workers
pub type ArrayProcessor = Processor<ArrayWorker>;

/// Processor over frame workers
pub type FrameProcessor = Processor<FrameWorker>;

/// What [`Processor::submit`] did with an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Sent to an idle worker
    Dispatched,
    /// Sent behind a running step (queue policy)
    Queued,
    /// Dropped because the worker was busy (skip policy)
    Skipped,
    /// No worker installed; the input was published as is
    PassedThrough,
}

/// Snapshot of processor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub submitted: u64,
    pub dispatched: u64,
    pub queued: u64,
    pub skipped: u64,
    pub passed_through: u64,
    pub published: u64,
    pub failed: u64,
    /// Results of a replaced worker that were not published
    pub stale: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    queued: AtomicU64,
    skipped: AtomicU64,
    passed_through: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ProcessorStats {
        ProcessorStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

enum Command<W: Worker> {
    Process(W::Input),
    SetWorker { worker: Option<W>, generation: u64 },
    Stop,
}

/// Owns a worker thread and dispatches inputs to it
pub struct Processor<W: Worker> {
    commands: Sender<Command<W>>,
    /// Ready flag of the installed worker, None when processing is disabled
    ready: Mutex<Option<ReadyFlag>>,
    generation: Arc<AtomicU64>,
    skip_if_running: AtomicBool,
    stopped: AtomicBool,
    output: Arc<Signal<Outcome<W::Output>>>,
    counters: Arc<Counters>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<W: Worker> Processor<W> {
    /// Spawn a processor thread with default settings and no worker
    pub fn new() -> Result<Self> {
        Self::with_config(&ProcessorConfig::default())
    }

    pub fn with_config(config: &ProcessorConfig) -> Result<Self> {
        let (tx, rx) = unbounded();
        let generation = Arc::new(AtomicU64::new(0));
        let output = Arc::new(Signal::new());
        let counters = Arc::new(Counters::default());

        let handle = {
            let generation = generation.clone();
            let output = output.clone();
            let counters = counters.clone();
            thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || run(rx, generation, output, counters))?
        };
        tracing::info!("Processor thread '{}' started", config.thread_name);

        Ok(Self {
            commands: tx,
            ready: Mutex::new(None),
            generation,
            skip_if_running: AtomicBool::new(config.skip_if_running),
            stopped: AtomicBool::new(false),
            output,
            counters,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Install `worker` on the processor thread, or disable processing
    ///
    /// Results of the previous worker still in flight are not published.
    pub fn set_worker(&self, worker: Option<W>) -> Result<()> {
        self.ensure_running()?;
        let mut ready = self.ready.lock();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *ready = worker.as_ref().map(|w| w.ready_flag().clone());
        let enabled = worker.is_some();
        self.commands
            .send(Command::SetWorker { worker, generation })
            .map_err(|_| Error::Lifecycle("processor thread exited".into()))?;
        tracing::debug!(generation, enabled, "worker replaced");
        Ok(())
    }

    pub fn has_worker(&self) -> bool {
        self.ready.lock().is_some()
    }

    /// True while the installed worker is running (or claimed for) a step
    pub fn is_busy(&self) -> bool {
        self.ready
            .lock()
            .as_ref()
            .map(|flag| !flag.is_ready())
            .unwrap_or(false)
    }

    /// Block until the installed worker is ready, up to `timeout`
    ///
    /// Returns false on timeout. Without a worker this returns immediately.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let installed = self.ready.lock().clone();
        match installed {
            Some(flag) => flag.wait_ready(timeout),
            None => true,
        }
    }

    pub fn skip_if_running(&self) -> bool {
        self.skip_if_running.load(Ordering::Relaxed)
    }

    pub fn set_skip_if_running(&self, skip: bool) {
        self.skip_if_running.store(skip, Ordering::Relaxed);
    }

    /// Hand `input` to the worker without blocking
    pub fn submit(&self, input: W::Input) -> Result<Dispatch> {
        self.ensure_running()?;
        Counters::bump(&self.counters.submitted);

        let installed = self.ready.lock().clone();
        let Some(ready) = installed else {
            Counters::bump(&self.counters.passed_through);
            self.output.emit(&Ok(W::passthrough(input)));
            return Ok(Dispatch::PassedThrough);
        };

        let skip = self.skip_if_running();
        let dispatch = if skip {
            if !ready.try_claim() {
                Counters::bump(&self.counters.skipped);
                tracing::trace!("worker busy, input skipped");
                return Ok(Dispatch::Skipped);
            }
            Dispatch::Dispatched
        } else if ready.is_ready() {
            Dispatch::Dispatched
        } else {
            Dispatch::Queued
        };

        if self.commands.send(Command::Process(input)).is_err() {
            if skip {
                ready.release();
            }
            return Err(Error::Lifecycle("processor thread exited".into()));
        }
        match dispatch {
            Dispatch::Queued => Counters::bump(&self.counters.queued),
            _ => Counters::bump(&self.counters.dispatched),
        }
        Ok(dispatch)
    }

    /// Signal carrying one outcome per processed (or passed-through) input
    pub fn output(&self) -> &Signal<Outcome<W::Output>> {
        &self.output
    }

    pub fn stats(&self) -> ProcessorStats {
        self.counters.snapshot()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Finish queued work and join the processor thread
    ///
    /// Inputs submitted before the call are still processed and published.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.commands.send(Command::Stop);
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Stopped from an output listener; the loop exits after this step
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Processor thread panicked");
        }
        tracing::info!("Processor stopped");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::Lifecycle("processor stopped".into()));
        }
        Ok(())
    }
}

impl<W: Worker> Drop for Processor<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<W: Worker> std::fmt::Debug for Processor<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("has_worker", &self.has_worker())
            .field("skip_if_running", &self.skip_if_running())
            .field("stopped", &self.is_stopped())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Processor thread main loop
fn run<W: Worker>(
    commands: Receiver<Command<W>>,
    generation: Arc<AtomicU64>,
    output: Arc<Signal<Outcome<W::Output>>>,
    counters: Arc<Counters>,
) {
    let mut current: Option<(W, u64)> = None;

    for command in commands.iter() {
        match command {
            Command::Process(input) => match current.as_mut() {
                Some((worker, worker_generation)) => {
                    let worker_generation = *worker_generation;
                    worker.run_step(input, |outcome| {
                        if generation.load(Ordering::Acquire) != worker_generation {
                            Counters::bump(&counters.stale);
                            tracing::debug!(worker_generation, "dropping result of replaced worker");
                            return;
                        }
                        match &outcome {
                            Ok(_) => Counters::bump(&counters.published),
                            Err(_) => Counters::bump(&counters.failed),
                        }
                        output.emit(&outcome);
                    });
                }
                None => {
                    Counters::bump(&counters.passed_through);
                    output.emit(&Ok(W::passthrough(input)));
                }
            },
            Command::SetWorker { worker, generation } => {
                current = worker.map(|w| (w, generation));
            }
            Command::Stop => break,
        }
    }

    tracing::debug!("Processor thread exiting");
}
