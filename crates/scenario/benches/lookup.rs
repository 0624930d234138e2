use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use physics::{Action, TireCompound, Weather};
use scenario::{
    CompilerConfig, Coverage, LiveQuery, LookupConfig, LookupService, PolicySource, ScenarioDatabase, ScenarioIndex,
    ScenarioKey, ScenarioRecord,
};

/// A full default grid over `positions` buckets, without running the compiler.
fn synthetic_index(positions: u32) -> ScenarioIndex {
    let track = track::reference_circuit().expect("reference circuit");
    let config = CompilerConfig::default();
    let speeds = config.grid.speed_buckets();
    let mut records = Vec::new();
    for compound in TireCompound::ALL {
        for weather in Weather::ALL {
            for position in 0..positions {
                for speed in 0..speeds {
                    records.push(ScenarioRecord {
                        key: ScenarioKey { compound, weather, position, speed },
                        action: Action::new(100.0, 0.0, (position % 7) as f32 * 0.1 - 0.3),
                        predicted_delta: speed as f32 * 0.01,
                        coverage: Coverage::Converged,
                        samples: 1,
                    });
                }
            }
        }
    }
    let source = PolicySource::new("synthetic", None);
    let db = ScenarioDatabase::new(&track, &config, &source, 1.0, records).expect("database");
    ScenarioIndex::build(db, LookupConfig::default()).expect("index")
}

fn queries(n: usize, positions: u32) -> Vec<LiveQuery> {
    let mut rng = fastrand::Rng::with_seed(7);
    (0..n)
        .map(|_| {
            LiveQuery::new(
                rng.f32() * positions as f32 * 5.0,
                60.0 + rng.f32() * 260.0,
                TireCompound::ALL[rng.usize(..3)],
                Weather::ALL[rng.usize(..3)],
            )
        })
        .collect()
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_lookup");
    for positions in [100, 1_000, 10_000] {
        let index = synthetic_index(positions);
        let qs = queries(1024, positions);
        let mut i = 0;
        group.bench_with_input(BenchmarkId::new("index", index.len()), &index, |b, index| {
            b.iter(|| {
                i = (i + 1) % qs.len();
                black_box(index.lookup(&qs[i]).ok())
            });
        });
    }
    group.finish();
}

fn bench_service(c: &mut Criterion) {
    let service = LookupService::new(synthetic_index(1_000));
    let qs = queries(1024, 1_000);
    let mut i = 0;
    c.bench_function("scenario_service_lookup", |b| {
        b.iter(|| {
            i = (i + 1) % qs.len();
            black_box(service.lookup(&qs[i]).ok())
        });
    });
}

criterion_group!(benches, bench_lookup, bench_service);
criterion_main!(benches);
