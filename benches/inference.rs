use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use har_gru::activity::NUM_FEATURES;
use har_gru::export::QuantizedNetwork;
use har_gru::inference::{InferenceConfig, InferenceEngine};
use har_gru::model::{HarNetwork, ModelConfig};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

fn create_rows(n_rows: usize) -> Vec<Vec<f32>> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    (0..n_rows)
        .map(|_| (0..NUM_FEATURES).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect())
        .collect()
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict");

    let network = HarNetwork::new(ModelConfig::default()).unwrap();
    let quantized = QuantizedNetwork::from_network(&network).to_network().unwrap();
    let engines = [
        ("float32", InferenceEngine::from_network(network, InferenceConfig::default()).unwrap()),
        ("int8", InferenceEngine::from_network(quantized, InferenceConfig::default()).unwrap()),
    ];

    let row = create_rows(1).remove(0);
    for (name, engine) in &engines {
        group.bench_with_input(BenchmarkId::new("single", name), &row, |b, row| {
            b.iter(|| engine.predict(black_box(row)).unwrap())
        });
    }

    group.finish();
}

fn bench_predict_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_batch");
    group.sample_size(20);

    let network = HarNetwork::new(ModelConfig::default()).unwrap();
    let engine = InferenceEngine::from_network(network, InferenceConfig::default()).unwrap();

    for n_rows in [64, 512, 2048].iter() {
        let rows = create_rows(*n_rows);
        group.bench_with_input(BenchmarkId::new("rows", n_rows), &rows, |b, rows| {
            b.iter(|| engine.predict_batch(black_box(rows)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_predict, bench_predict_batch);
criterion_main!(benches);
