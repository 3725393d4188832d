//! Benchmarks for the SHAC container format: write, index, decode and metadata parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shac_format::{
    decode, parse_index, LayerMetadata, MetadataParse, SampleEncoding, ShacReader, ShacWriter,
};

const SAMPLE_RATE: u32 = 48000;
const SAMPLES: u32 = 48000; // 1 second

/// One second of a 440 Hz sine in every channel of an `order` layer.
fn sine_channels(order: u16) -> Vec<Vec<f32>> {
    let channels = (order as usize + 1).pow(2);
    let sine: Vec<f32> = (0..SAMPLES)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
        .collect();
    vec![sine; channels]
}

/// Build a complete SHAC buffer with `layers` order-1 layers.
fn build_buffer(layers: usize, encoding: SampleEncoding) -> Vec<u8> {
    let channels = sine_channels(1);
    let mut writer = ShacWriter::new(1, SAMPLE_RATE, encoding, SAMPLES);
    for i in 0..layers {
        let meta = LayerMetadata::at([i as f64, 1.0, 0.0]).with_gain(0.8);
        writer.add_layer(&format!("layer_{i}"), &meta, &channels).unwrap();
    }
    writer.to_bytes().unwrap()
}

fn bench_write(c: &mut Criterion) {
    let channels = sine_channels(1);

    let mut group = c.benchmark_group("shac_write");
    for encoding in [SampleEncoding::Int16, SampleEncoding::Float32] {
        group.bench_with_input(
            BenchmarkId::new("bit_depth", encoding.bit_depth()),
            &encoding,
            |b, &encoding| {
                b.iter(|| {
                    let mut writer = ShacWriter::new(1, SAMPLE_RATE, encoding, SAMPLES);
                    writer
                        .add_layer("voice", &LayerMetadata::default(), black_box(&channels))
                        .unwrap();
                    black_box(writer.to_bytes().unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("shac_index");
    for layers in [1usize, 8, 32] {
        let bytes = build_buffer(layers, SampleEncoding::Int16);
        group.bench_with_input(BenchmarkId::new("layers", layers), &bytes, |b, bytes| {
            b.iter(|| black_box(parse_index(black_box(bytes)).unwrap()));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("shac_decode");
    for layers in [1usize, 4, 8] {
        let bytes = build_buffer(layers, SampleEncoding::Float32);
        group.bench_with_input(BenchmarkId::new("parallel", layers), &bytes, |b, bytes| {
            b.iter(|| black_box(decode(black_box(bytes)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("sequential", layers), &bytes, |b, bytes| {
            b.iter(|| {
                let reader = ShacReader::new(black_box(bytes)).unwrap();
                for entry in reader.layers() {
                    black_box(reader.read_layer(entry).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_metadata(c: &mut Criterion) {
    let json = br#"{"position": [1.5, -2.0, 0.25], "gain": 0.8, "premixed": false}"#;
    let legacy = b"{'position': (1.5, -2.0, 0.25), 'gain': 0.8, 'premixed': False,}";

    let mut group = c.benchmark_group("metadata_parse");
    group.bench_function("json", |b| {
        b.iter(|| black_box(MetadataParse::parse(black_box(json))));
    });
    group.bench_function("legacy", |b| {
        b.iter(|| black_box(MetadataParse::parse(black_box(legacy))));
    });
    group.finish();
}

criterion_group!(benches, bench_write, bench_index, bench_decode, bench_metadata);
criterion_main!(benches);
