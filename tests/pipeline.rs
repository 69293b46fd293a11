//! Source -> processor -> signal pipelines on a tokio runtime

use std::time::Duration;
use vidarray::config::PipelineConfig;
use vidarray::processing::Invert;
use vidarray::{
    decode, ArrayLayout, ByteOrder, ChannelSource, NumericArray, PipelineBuilder, Resolution,
    SyntheticSource, VideoFrame,
};

fn source(frames: u64) -> SyntheticSource {
    SyntheticSource::new(Resolution::new(16, 8), 30, frames).unwrap()
}

fn queueing() -> PipelineBuilder {
    PipelineBuilder::new().skip_if_running(false)
}

#[tokio::test]
async fn synthetic_frames_reach_both_outputs() {
    let pipeline = queueing().build().unwrap();
    let (_, arrays) = pipeline.array_output().subscribe();
    let (_, frames) = pipeline.frame_output().subscribe();

    pipeline.start(Box::new(source(5))).await.unwrap();
    pipeline.wait().await.unwrap();
    pipeline.stop().await.unwrap();

    let arrays: Vec<NumericArray> = arrays.try_iter().collect();
    let frames: Vec<VideoFrame> = frames.try_iter().collect();
    assert_eq!(arrays.len(), 6);
    assert_eq!(frames.len(), 6);

    // End of stream is forwarded as an empty array and a null frame
    assert!(arrays[5].is_empty());
    assert!(!frames[5].is_valid());

    let reference = source(5);
    for (i, array) in arrays[..5].iter().enumerate() {
        let (expected, _) =
            decode(&reference.render(i as u64), ArrayLayout::Rgb, ByteOrder::Big).unwrap();
        assert_eq!(array, &expected);
        assert_eq!(frames[i].start_time(), reference.render(i as u64).start_time());
    }

    let stats = pipeline.stats();
    assert_eq!(stats.frames_pulled, 5);
    assert!(stats.end_of_stream);
    assert_eq!(stats.frames_out, 6);
    assert_eq!(stats.arrays_out, 6);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.processor.skipped, 0);
}

#[tokio::test]
async fn ignored_null_frame_is_not_forwarded() {
    let pipeline = queueing().ignore_null_frame(true).build().unwrap();
    let (_, frames) = pipeline.frame_output().subscribe();

    pipeline.start(Box::new(source(3))).await.unwrap();
    pipeline.wait().await.unwrap();
    pipeline.stop().await.unwrap();

    let frames: Vec<VideoFrame> = frames.try_iter().collect();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(VideoFrame::is_valid));
    assert!(pipeline.stats().end_of_stream);
}

#[tokio::test]
async fn custom_transform_is_applied() {
    let pipeline = queueing().transform(Invert).build().unwrap();
    let (_, arrays) = pipeline.array_output().subscribe();

    pipeline.start(Box::new(source(1))).await.unwrap();
    pipeline.wait().await.unwrap();
    pipeline.stop().await.unwrap();

    let first = arrays.try_recv().unwrap();
    let (input, _) = decode(&source(1).render(0), ArrayLayout::Rgb, ByteOrder::Big).unwrap();
    assert_eq!(first, input.map(|v| 255 - v));
}

#[tokio::test]
async fn config_selects_stock_transform() {
    let config = PipelineConfig::from_toml_str(
        r#"
        [processor]
        transform = "grayscale"
        skip_if_running = false
        "#,
    )
    .unwrap();
    let pipeline = PipelineBuilder::new().config(config).build().unwrap();
    let (_, arrays) = pipeline.array_output().subscribe();

    pipeline.start(Box::new(source(2))).await.unwrap();
    pipeline.wait().await.unwrap();
    pipeline.stop().await.unwrap();

    let first = arrays.try_recv().unwrap();
    for px in first.as_slice().chunks_exact(3) {
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }
}

#[tokio::test]
async fn stop_does_not_wait_for_idle_source() {
    let pipeline = PipelineBuilder::new().build().unwrap();
    let (sender, source) = ChannelSource::new(4);
    pipeline.start(Box::new(source)).await.unwrap();
    assert!(pipeline.is_running());

    tokio::time::timeout(Duration::from_secs(5), pipeline.stop())
        .await
        .expect("stop hung")
        .unwrap();
    assert!(!pipeline.is_running());
    assert!(!pipeline.stats().end_of_stream);
    drop(sender);
}

#[tokio::test]
async fn pushed_frames_are_processed() {
    let pipeline = queueing().build().unwrap();
    let (_, arrays) = pipeline.array_output().subscribe();
    let (sender, channel) = ChannelSource::new(4);
    pipeline.start(Box::new(channel)).await.unwrap();

    let frames = source(3);
    for i in 0..3 {
        sender.send(frames.render(i)).await.unwrap();
    }
    drop(sender);
    pipeline.wait().await.unwrap();
    pipeline.stop().await.unwrap();

    let arrays: Vec<NumericArray> = arrays.try_iter().collect();
    assert_eq!(arrays.len(), 4);
    assert_eq!(arrays[0].shape(), &[8, 16, 3]);
    assert_eq!(pipeline.stats().frames_pulled, 3);
}
