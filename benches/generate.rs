//! Scene generation throughput.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use firlight::config::TreeConfig;
use firlight::foliage::FoliageData;
use firlight::spawn::SpawnContext;
use firlight::{ornaments, ribbons};

fn bench_generation(c: &mut Criterion) {
    let config = TreeConfig::default();

    c.bench_function("foliage_120k", |b| {
        b.iter_batched(
            || SpawnContext::from_seed(42),
            |mut ctx| FoliageData::generate(&config, &mut ctx).unwrap(),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("full_scene", |b| {
        b.iter_batched(
            || SpawnContext::from_seed(42),
            |mut ctx| {
                let foliage = FoliageData::generate(&config, &mut ctx).unwrap();
                let ornaments = ornaments::generate(&config, &mut ctx).unwrap();
                let ribbons = ribbons::generate(&config, &mut ctx).unwrap();
                (foliage, ornaments, ribbons)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("foliage_vertices", |b| {
        let mut ctx = SpawnContext::from_seed(42);
        let data = FoliageData::generate(&config, &mut ctx).unwrap();
        b.iter(|| data.to_vertices())
    });
}

criterion_group!(benches, bench_generation);
criterion_main!(benches);
