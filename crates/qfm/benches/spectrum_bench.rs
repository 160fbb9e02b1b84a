//! Benchmarks for spectrum extraction and coefficient statistics
//!
//! Run with: cargo bench -p qfm

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qfm::{
    CoefficientStatistics, Model, ModelConfig, NoiseConfig, NoiseKind, Spectrum, SpectrumOptions,
    sample_spectra,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn model(n_qubits: usize, n_layers: usize) -> Model {
    Model::new(ModelConfig {
        n_qubits,
        n_layers,
        ansatz: "Circuit_19".into(),
        ..ModelConfig::default()
    })
    .unwrap()
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrum_extract");
    let options = SpectrumOptions::default();
    let noise = NoiseConfig::single(NoiseKind::Depolarizing, 0.01).unwrap();

    for n in [1usize, 2, 3, 4] {
        let m = model(n, 1);
        group.bench_with_input(BenchmarkId::new("noiseless", n), &m, |b, m| {
            b.iter(|| Spectrum::extract(black_box(m), &options, None).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("depolarizing", n), &m, |b, m| {
            b.iter(|| Spectrum::extract(black_box(m), &options, Some(&noise)).unwrap());
        });
    }

    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("coefficient_statistics");
    let options = SpectrumOptions::default();

    for n_samples in [10usize, 50] {
        let mut m = model(2, 1);
        let mut rng = StdRng::seed_from_u64(1000);
        let spectra = sample_spectra(&mut m, n_samples, &mut rng, &options, None).unwrap();
        group.bench_with_input(
            BenchmarkId::new("from_spectra", n_samples),
            &spectra,
            |b, spectra| {
                b.iter(|| CoefficientStatistics::from_spectra(black_box(spectra), true).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_extract, bench_statistics);
criterion_main!(benches);
