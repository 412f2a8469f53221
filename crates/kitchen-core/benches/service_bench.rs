//! Criterion benchmarks for the service engine.
//!
//! Two benchmark groups:
//! - `service_tick`: one 1/60 s frame of a busy default service
//! - `service_day`: a full default service run to finish at 30 frames/s

use criterion::{Criterion, criterion_group, criterion_main};
use kitchen_core::config::{KitchenPolicy, ServiceConfig, TableLayout, TableSpec};
use kitchen_core::menu::Menu;
use kitchen_core::service::ServiceSim;
use kitchen_core::table::Position;
use kitchen_core::test_utils::*;

/// Twenty six-tops and a fast spawn cadence so many customers are seated.
fn build_busy_service() -> ServiceSim {
    let layout = TableLayout::new(
        (0..20)
            .map(|i| TableSpec {
                position: Position::new(i * 80, 0),
                capacity: 6,
            })
            .collect(),
    );
    let config = ServiceConfig {
        spawn_interval: fixed(0.5),
        group_sizes: vec![2, 4, 6],
        kitchen: KitchenPolicy::Auto {
            cooks: 8,
            waiters: 8,
        },
        service_duration: fixed(100_000.0),
        ..ServiceConfig::default()
    };
    let mut sim = ServiceSim::new(config, Menu::default(), &layout).unwrap();
    // Warm up until the room is full.
    run_ticks(&mut sim, 600, fixed(1.0 / 60.0));
    sim
}

fn bench_service_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("service_tick");
    group.sample_size(50);

    let mut sim = build_busy_service();

    group.bench_function("20_tables_busy_frame", |b| {
        b.iter(|| {
            sim.tick(fixed(1.0 / 60.0));
        });
    });

    group.finish();
}

fn bench_service_day(c: &mut Criterion) {
    let mut group = c.benchmark_group("service_day");
    group.sample_size(10);

    group.bench_function("default_day_30fps", |b| {
        b.iter(|| {
            let mut sim = default_service(1);
            run_to_finish(&mut sim, fixed(1.0 / 30.0), 100_000)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_service_tick, bench_service_day);
criterion_main!(benches);
