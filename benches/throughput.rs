use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use matchcard::{
    config::JudgingConfig,
    core::store::{AtomicStateStore, StoreError},
    dataset::{ClassDataset, DatasetByClass, RobotInfo},
    generate_schedule,
    persist::memory::MemoryStateBackend,
    reconcile,
    schedule::card::ScheduledCard,
};

fn dataset(classes: usize, per_class: usize, met_every: usize) -> DatasetByClass {
    let mut ds = DatasetByClass::new();
    for c in 0..classes {
        let mut class = ClassDataset::default();
        for i in 0..per_class {
            class = class.with_robot(&format!("robot {c}-{i}"), RobotInfo::present());
        }
        for i in (0..per_class).step_by(met_every.max(1)) {
            let j = (i + 1) % per_class;
            class = class.with_history(&format!("robot {c}-{i}"), &format!("Robot {c}-{j}"));
        }
        ds.insert(format!("class {c}"), class);
    }
    ds
}

fn bench_schedule_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_schedule");
    for per_class in [8usize, 16, 32] {
        let ds = dataset(3, per_class, 3);
        group.bench_with_input(BenchmarkId::from_parameter(per_class), &ds, |b, ds| {
            b.iter(|| generate_schedule(3, ds, Some(42)));
        });
    }
    group.finish();
}

fn bench_store_updates(c: &mut Criterion) {
    let config = JudgingConfig::default();
    let cards: Vec<ScheduledCard> = (0..64)
        .map(|i| ScheduledCard::new("Featherweights", &format!("red {i}"), &format!("white {i}")))
        .collect();

    c.bench_function("store_reconcile_noop_1k", |b| {
        let store = AtomicStateStore::new(Box::new(MemoryStateBackend::new()));
        b.iter(|| {
            for _ in 0..1_000 {
                store
                    .update(|s| Ok::<_, StoreError>(reconcile(&config, s, &cards, 1).0))
                    .expect("update");
            }
        });
    });
}

criterion_group!(benches, bench_schedule_sizes, bench_store_updates);
criterion_main!(benches);
