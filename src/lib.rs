//! vidarray: video frames as numeric arrays
//!
//! Converts packed 32-bit video frames to (height, width, channels) arrays and
//! back, and runs array transforms on a background thread without ever
//! blocking the thread that produces frames.
//!
//! # Features
//!
//! - **Codec**: Bgra8888/Bgrx8888 frames to arrays and back, with selectable
//!   byte order, alpha handling and normalization of wide or float samples
//! - **Processing**: workers with a ready flag, processors that drop frames
//!   arriving while the worker is busy (or queue them)
//! - **Plumbing**: signals, converters, display sinks, a playback controller
//!   and a tokio pipeline from a frame source to output signals
//!
//! # Example
//!
//! ```rust,no_run
//! use vidarray::{processing::Invert, FrameProcessor, FrameWorker, Resolution, SyntheticSource};
//!
//! fn main() -> vidarray::Result<()> {
//!     let processor = FrameProcessor::new()?;
//!     processor.set_worker(Some(FrameWorker::new(Invert)))?;
//!     processor.output().connect(|outcome| match outcome {
//!         Ok(processed) => println!("frame {}", processed.frame.start_time()),
//!         Err(e) => eprintln!("failed: {}", e),
//!     });
//!
//!     let source = SyntheticSource::new(Resolution::QVGA, 30, 10)?;
//!     for i in 0..10 {
//!         processor.submit(source.render(i))?;
//!     }
//!     processor.stop();
//!     Ok(())
//! }
//! ```

pub mod array;
pub mod codec;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod pipeline;
pub mod processing;
pub mod processor;
pub mod signal;
pub mod sink;
pub mod source;
pub mod stream;
pub mod testing;
pub mod types;
pub mod util;
pub mod worker;

// Re-exports for convenience
pub use array::{NumericArray, Sample};
pub use codec::{alpha_view, byte_view, decode, encode, rgb_view, Normalize};
pub use config::{ConverterConfig, PipelineConfig, ProcessorConfig, SourceConfig};
pub use error::{Error, Result};
pub use frame::VideoFrame;
pub use metadata::{FrameMetadata, MetadataPolicy};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineStats};
pub use processor::{ArrayProcessor, Dispatch, FrameProcessor, Processor, ProcessorStats};
pub use signal::{ConnectionId, Signal};
pub use source::{ChannelSource, FrameSource, SyntheticSource};
pub use stream::{ArrayToFrameConverter, FrameToArrayConverter};
pub use types::{ArrayLayout, ByteOrder, MapMode, PixelFormat, Resolution, RotationAngle};
pub use util::data_path;
pub use worker::{ArrayTransform, ArrayWorker, FrameWorker, Outcome, ProcessedFrame, ReadyFlag, Worker};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
