//! Cross-crate service days: data files feed the engine, statistics follow
//! the event stream, and closing folds each day into the ledger.

use std::path::PathBuf;

use kitchen_core::command_queue::Command;
use kitchen_core::config::KitchenPolicy;
use kitchen_core::customer::CustomerKind;
use kitchen_core::event::{Event, EventKind};
use kitchen_core::fixed::Fixed64;
use kitchen_core::restaurant::{Restaurant, Role};
use kitchen_core::service::{ServiceError, ServiceSim};
use kitchen_core::test_utils::fixed;
use kitchen_data::{ServiceData, load_service_data};
use kitchen_stats::{ServiceStats, StatsConfig};

/// Ticks per simulated second.
const FPS: u32 = 30;
/// Upper bound well past closing for a full day at [`FPS`].
const MAX_TICKS: usize = 720 * 30 * 2;

fn try_init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn shipped_data() -> ServiceData {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../kitchen-data/data");
    load_service_data(&dir).unwrap()
}

fn frame() -> Fixed64 {
    fixed(1.0 / FPS as f64)
}

fn staffed_restaurant() -> Restaurant {
    let mut restaurant = Restaurant::new("Kitchen Rush");
    restaurant.hire("Ana", Role::Chef);
    restaurant.hire("Rui", Role::Cook);
    restaurant.hire("Leo", Role::Waiter);
    restaurant
}

/// Run a service until every guest is gone, feeding `stats` each tick.
fn run_day(sim: &mut ServiceSim, stats: &std::cell::RefCell<ServiceStats>) -> usize {
    let mut ticks = 0;
    while !sim.is_finished() && ticks < MAX_TICKS {
        let report = sim.tick(frame());
        stats.borrow_mut().end_tick(report.tick);
        ticks += 1;
    }
    ticks
}

#[test]
fn data_driven_day_settles_into_the_ledger() {
    try_init_logger();
    let data = shipped_data();
    let mut restaurant = staffed_restaurant();
    let mut sim =
        ServiceSim::for_restaurant(data.config, data.menu, &data.layout, &restaurant).unwrap();
    assert_eq!(
        sim.config().kitchen,
        KitchenPolicy::Auto {
            cooks: 2,
            waiters: 1
        }
    );

    let stats = ServiceStats::attach(&mut sim, StatsConfig::default());
    let ticks = run_day(&mut sim, &stats);
    assert!(sim.is_finished(), "still open after {ticks} ticks");

    let tally = sim.tally().clone();
    let stats = stats.borrow();
    assert!(stats.closed_at().is_some());
    assert_eq!(stats.totals().arrived, tally.arrived as u64);
    assert_eq!(stats.totals().finished, tally.finished as u64);
    assert_eq!(stats.totals().left, tally.left as u64);
    assert_eq!(stats.totals().tips, tally.tips as u64);
    assert_eq!(stats.in_restaurant(), 0);

    let report = sim.close_service(&mut restaurant).unwrap();
    assert_eq!(report.earnings, tally.earnings());
    assert_eq!(report.finished, tally.finished);
    assert_eq!(restaurant.money(), 100 + tally.earnings() as u64);
    assert!(matches!(
        sim.close_service(&mut restaurant),
        Err(ServiceError::AlreadySettled)
    ));
}

#[test]
fn consecutive_days_accumulate() {
    let mut restaurant = staffed_restaurant();
    let mut earned = 0u64;

    for day in 1..=3u64 {
        let mut data = shipped_data();
        data.config.seed = day;
        let mut sim =
            ServiceSim::for_restaurant(data.config, data.menu, &data.layout, &restaurant).unwrap();
        let stats = ServiceStats::attach(&mut sim, StatsConfig::default());
        run_day(&mut sim, &stats);

        let report = sim.close_service(&mut restaurant).unwrap();
        assert_eq!(report.day as u64, day);
        assert!(report.reputation_after <= Fixed64::from_num(5));
        earned += report.earnings as u64;
    }

    assert_eq!(restaurant.day(), 4);
    assert_eq!(restaurant.money(), 100 + earned);
    assert_eq!(restaurant.total_money_earned(), earned);
}

#[test]
fn reactive_waiter_handles_a_manual_kitchen() {
    let mut data = shipped_data();
    data.config.kitchen = KitchenPolicy::Manual;
    let mut sim = ServiceSim::new(data.config, data.menu, &data.layout).unwrap();

    sim.on_reactive(
        EventKind::CustomerArrived,
        Box::new(|e| match e {
            Event::CustomerArrived { customer, .. } => vec![Command::StartOrder {
                customer: *customer,
            }],
            _ => Vec::new(),
        }),
    );
    sim.on_reactive(
        EventKind::OrderReady,
        Box::new(|e| match e {
            Event::OrderReady { customer, .. } => vec![Command::Serve {
                customer: *customer,
            }],
            _ => Vec::new(),
        }),
    );

    let stats = ServiceStats::attach(&mut sim, StatsConfig::default());
    run_day(&mut sim, &stats);

    let tally = sim.tally();
    assert!(tally.finished > 0);
    assert!(tally.finished > tally.left);
    assert!(stats.borrow().average_satisfaction() > Fixed64::ZERO);
}

#[test]
fn unattended_manual_kitchen_fails_the_day() {
    let mut data = shipped_data();
    data.config.kitchen = KitchenPolicy::Manual;
    let mut restaurant = Restaurant::new("Empty Kitchen");
    assert_eq!(restaurant.kitchen_policy(), KitchenPolicy::Manual);

    let mut sim =
        ServiceSim::for_restaurant(data.config, data.menu, &data.layout, &restaurant).unwrap();
    let stats = ServiceStats::attach(&mut sim, StatsConfig::default());
    run_day(&mut sim, &stats);

    assert_eq!(sim.tally().finished, 0);
    let common = stats.borrow().kind_stats(CustomerKind::Common);
    assert!(common.left > 0);
    assert_eq!(common.abandonment_rate(), Fixed64::from_num(1));
    assert_eq!(stats.borrow().totals().left, sim.tally().left as u64);

    let report = sim.close_service(&mut restaurant).unwrap();
    assert!(report.failed);
    assert_eq!(report.earnings, 0);
    assert_eq!(restaurant.total_failed_days(), 1);
}

#[test]
fn restored_snapshot_finishes_the_same_day() {
    let data = shipped_data();
    let mut sim = ServiceSim::new(data.config, data.menu, &data.layout).unwrap();
    for _ in 0..(FPS * 120) {
        sim.tick(frame());
    }

    let mut restored = ServiceSim::deserialize(&sim.serialize().unwrap()).unwrap();
    let stats = ServiceStats::attach(&mut restored, StatsConfig::default());
    run_day(&mut restored, &stats);
    let quiet = std::cell::RefCell::new(ServiceStats::new(StatsConfig::default()));
    run_day(&mut sim, &quiet);

    assert_eq!(restored.state_hash(), sim.state_hash());
    assert_eq!(restored.tally(), sim.tally());
}
