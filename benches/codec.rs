use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vidarray::processing::{BoxBlur, Grayscale, SobelEdges};
use vidarray::{
    decode, encode, ArrayLayout, ArrayTransform, ByteOrder, FrameWorker, Normalize, NumericArray,
    Resolution, SyntheticSource, Worker,
};

const SIZES: [Resolution; 2] = [Resolution::QVGA, Resolution::HD_720P];

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for size in SIZES {
        let frame = SyntheticSource::new(size, 30, 0).unwrap().render(0);
        for layout in [ArrayLayout::Rgb, ArrayLayout::Rgba] {
            group.bench_with_input(
                BenchmarkId::new(format!("{layout:?}"), size),
                &frame,
                |b, frame| b.iter(|| decode(black_box(frame), layout, ByteOrder::Big).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for size in SIZES {
        let frame = SyntheticSource::new(size, 30, 0).unwrap().render(0);
        let (array, _) = decode(&frame, ArrayLayout::Rgb, ByteOrder::Big).unwrap();
        group.bench_with_input(BenchmarkId::new("u8", size), &array, |b, array| {
            b.iter(|| encode(black_box(array), Normalize::Off).unwrap())
        });

        let wide: NumericArray<f32> = array.map(|v| v as f32 * 4.0);
        group.bench_with_input(BenchmarkId::new("f32_auto", size), &wide, |b, array| {
            b.iter(|| encode(black_box(array), Normalize::Auto).unwrap())
        });
    }
    group.finish();
}

fn bench_transforms(c: &mut Criterion) {
    let frame = SyntheticSource::new(Resolution::QVGA, 30, 0).unwrap().render(0);
    let (array, _) = decode(&frame, ArrayLayout::Rgb, ByteOrder::Big).unwrap();

    let mut group = c.benchmark_group("transform");
    group.bench_function("grayscale", |b| {
        b.iter(|| Grayscale.process_array(black_box(array.clone())).unwrap())
    });
    group.bench_function("blur_r2", |b| {
        b.iter(|| BoxBlur::new(2).process_array(black_box(array.clone())).unwrap())
    });
    group.bench_function("sobel", |b| {
        b.iter(|| SobelEdges.process_array(black_box(array.clone())).unwrap())
    });
    group.finish();

    let mut worker = FrameWorker::new(Grayscale);
    c.bench_function("frame_worker_step", |b| {
        b.iter(|| worker.process(black_box(frame.clone())).unwrap())
    });
}

criterion_group!(benches, bench_decode, bench_encode, bench_transforms);
criterion_main!(benches);
