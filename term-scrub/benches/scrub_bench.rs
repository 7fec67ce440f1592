use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use term_scrub::cleaner::RecordCleaner;
use term_scrub::scanner::QualityScanner;
use term_scrub::test_fixtures::{batch_from_rows, random_rows};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn benchmark_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_scan");
    let scanner = QualityScanner::new();

    for n in SIZES {
        let mut rng = StdRng::seed_from_u64(7);
        let batch = batch_from_rows(&random_rows(&mut rng, n, 0.2));
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n), &batch, |b, batch| {
            b.iter(|| scanner.scan(std::hint::black_box(batch)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_clean(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_clean");
    let cleaner = RecordCleaner::new();

    for dirty_fraction in [0.0, 0.2, 0.8] {
        let n = 10_000;
        let mut rng = StdRng::seed_from_u64(11);
        let batch = batch_from_rows(&random_rows(&mut rng, n, dirty_fraction));
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("dirty{dirty_fraction}")),
            &batch,
            |b, batch| {
                b.iter(|| cleaner.clean(std::hint::black_box(batch.clone())).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_scan, benchmark_clean);
criterion_main!(benches);
