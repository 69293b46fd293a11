//! vidarray CLI
//!
//! Runs synthetic frames through a processor and reports what happened.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vidarray::{
    processing::TRANSFORM_NAMES, Pipeline, PipelineConfig, PixelFormat, Resolution,
    SyntheticSource,
};

#[derive(Parser)]
#[command(name = "vidarray")]
#[command(about = "Video frame <-> array conversion and threaded frame processing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, defaults and available transforms
    Info,

    /// List pixel formats and whether they can be converted
    Formats,

    /// Process synthetic frames through a transform
    Run {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stock transform (identity, invert, grayscale, blur, sobel)
        #[arg(short, long)]
        transform: Option<String>,

        /// Number of frames (0 = until Ctrl+C)
        #[arg(short, long)]
        frames: Option<u64>,

        /// Source framerate
        #[arg(long)]
        fps: Option<u32>,

        /// Frame size (e.g., 320x240)
        #[arg(short, long)]
        size: Option<Resolution>,

        /// Queue frames that arrive while the worker is busy instead of dropping them
        #[arg(short, long)]
        queue: bool,

        /// Deliver frames at the source framerate
        #[arg(long)]
        paced: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidarray=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info => cmd_info(),
        Commands::Formats => cmd_formats(),
        Commands::Run {
            config,
            transform,
            frames,
            fps,
            size,
            queue,
            paced,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(transform) = transform {
                config.processor.transform = transform;
            }
            if let Some(frames) = frames {
                config.source.frame_count = frames;
            }
            if let Some(fps) = fps {
                config.source.fps = fps;
            }
            if let Some(size) = size {
                config.source.resolution = size;
            }
            if queue {
                config.processor.skip_if_running = false;
            }
            cmd_run(config, paced).await
        }
    }
}

fn cmd_info() -> anyhow::Result<()> {
    println!("vidarray {}", vidarray::VERSION);
    println!("==============\n");

    println!("Transforms: {}", TRANSFORM_NAMES.join(", "));
    println!("Data directory: {}", vidarray::data_path(&[]).display());

    println!("\nDefault configuration:");
    print!("{}", PipelineConfig::default().to_toml_string()?);
    Ok(())
}

fn cmd_formats() -> anyhow::Result<()> {
    println!("Pixel Formats");
    println!("=============\n");

    let formats = [
        PixelFormat::Bgra8888,
        PixelFormat::Bgrx8888,
        PixelFormat::Rgba8888,
        PixelFormat::Nv12,
        PixelFormat::Yuv420p,
    ];
    for format in formats {
        let (size, _) = format.buffer_layout(Resolution::QVGA.width, Resolution::QVGA.height);
        println!(
            "  {:10} {:>8} bytes @ {}  {}",
            format.to_string(),
            size,
            Resolution::QVGA,
            if format.is_supported() { "convertible" } else { "-" }
        );
    }
    Ok(())
}

async fn cmd_run(config: PipelineConfig, paced: bool) -> anyhow::Result<()> {
    config.validate()?;

    println!("Configuration:");
    println!("  Transform: {}", config.processor.transform);
    println!("  Resolution: {}", config.source.resolution);
    println!("  FPS: {}", config.source.fps);
    println!("  Frames: {}", config.source.frame_count);
    println!(
        "  Busy policy: {}",
        if config.processor.skip_if_running { "skip" } else { "queue" }
    );
    println!();

    let mut source = SyntheticSource::from_config(&config.source)?;
    if paced {
        source = source.paced();
    }
    let pipeline = Pipeline::new(config)?;

    let arrays = Arc::new(AtomicU64::new(0));
    {
        let arrays = arrays.clone();
        pipeline.array_output().connect(move |array| {
            if !array.is_empty() {
                arrays.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    pipeline.start(Box::new(source)).await?;
    println!("Processing. Press Ctrl+C to stop.\n");

    tokio::select! {
        result = pipeline.wait() => result?,
        _ = tokio::signal::ctrl_c() => println!("\nStopping..."),
    }
    pipeline.stop().await?;

    let stats = pipeline.stats();
    println!("Statistics:");
    println!("  Frames pulled: {}", stats.frames_pulled);
    println!("  Frames processed: {}", stats.processor.published);
    println!("  Frames skipped: {}", stats.processor.skipped);
    println!("  Failures: {}", stats.failures);
    println!("  Arrays received: {}", arrays.load(Ordering::Relaxed));
    println!("  Elapsed: {:.2}s", stats.elapsed_secs);
    println!("  Output FPS: {:.1}", stats.output_fps());

    Ok(())
}
