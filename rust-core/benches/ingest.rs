use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::f32::consts::PI;
use streaming_analyzer::SpectrumAnalyzer;

const SAMPLE_RATE: u32 = 48000;
const BLOCK: usize = 512;

fn tone(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| (2.0 * PI * 1000.0 * n as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_block");
    let block = tone(BLOCK);

    for rank in [10usize, 12, 14] {
        let mut analyzer = SpectrumAnalyzer::with_limits(2, 14, SAMPLE_RATE, 1.0)
            .expect("analyzer allocation");
        analyzer.set_sample_rate(SAMPLE_RATE);
        analyzer.set_rank(rank).expect("rank within limits");
        analyzer.set_rate(60.0);
        analyzer.set_reactivity(0.2);

        group.bench_with_input(BenchmarkId::from_parameter(1 << rank), &rank, |b, _| {
            b.iter(|| {
                for ch in 0..2 {
                    black_box(analyzer.ingest(ch, black_box(&block)));
                }
            })
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut analyzer =
        SpectrumAnalyzer::with_limits(1, 12, SAMPLE_RATE, 1.0).expect("analyzer allocation");
    analyzer.set_sample_rate(SAMPLE_RATE);
    analyzer.set_rate(20.0);
    analyzer.ingest(0, &tone(SAMPLE_RATE as usize));

    let mut freqs = vec![0.0f32; 640];
    let mut indices = vec![0usize; 640];
    analyzer.get_frequencies(&mut freqs, &mut indices, 10.0, 24000.0);
    let mut out = vec![0.0f32; 640];

    c.bench_function("get_spectrum_640", |b| {
        b.iter(|| analyzer.get_spectrum(0, black_box(&mut out), &indices))
    });
}

criterion_group!(benches, bench_ingest, bench_read);
criterion_main!(benches);
