//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::{KitchenPolicy, ServiceConfig, TableLayout, TableSpec};
use crate::customer::{Customer, CustomerKind, KindPolicyTable};
use crate::fixed::{Fixed64, Seconds, secs};
use crate::id::{CustomerId, DishId};
use crate::menu::{Dish, Menu};
use crate::order::Order;
use crate::service::ServiceSim;
use crate::sim::TickReport;
use crate::table::Position;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Menus and customers
// ===========================================================================

/// A one-dish menu: "Burger" with the given prep time and price.
pub fn single_dish_menu(prep_time: u32, price: u32) -> Menu {
    let dish = Dish::new("Burger", price, 1, secs(prep_time)).expect("valid dish");
    Menu::new(vec![dish]).expect("non-empty menu")
}

/// A waiting customer with a fixed patience and one burger order.
pub fn make_customer(id: u64, kind: CustomerKind, patience: f64, price: u32) -> Customer {
    let dish = Dish::new("Burger", price, 1, secs(4)).expect("valid dish");
    let order = Order::new(CustomerId(id), DishId(0), dish);
    let multiplier = KindPolicyTable::default().get(kind).reward_multiplier;
    Customer::with_patience(CustomerId(id), kind, order, fixed(patience), multiplier)
}

/// Policies that only ever spawn Common customers with exactly `patience`
/// seconds of patience.
pub fn common_only(patience: u32) -> KindPolicyTable {
    let mut policies = KindPolicyTable::default();
    policies.common.patience_min = secs(patience);
    policies.common.patience_max = secs(patience);
    policies.impatient.spawn_weight = 0;
    policies.boss.spawn_weight = 0;
    policies
}

// ===========================================================================
// Configurations
// ===========================================================================

/// Predictable service: single customers every 5 s, Common only with 20 s
/// of patience, manual kitchen, 6 s meals.
pub fn manual_config() -> ServiceConfig {
    ServiceConfig {
        group_sizes: vec![1],
        kitchen: KitchenPolicy::Manual,
        policies: common_only(20),
        seed: 7,
        ..ServiceConfig::default()
    }
}

pub fn layout_of(capacities: &[u32]) -> TableLayout {
    TableLayout::new(
        capacities
            .iter()
            .enumerate()
            .map(|(i, &capacity)| TableSpec {
                position: Position::new(100 * i as i32, 0),
                capacity,
            })
            .collect(),
    )
}

/// The default service on the default room and menu.
pub fn default_service(seed: u64) -> ServiceSim {
    let config = ServiceConfig {
        seed,
        ..ServiceConfig::default()
    };
    ServiceSim::new(config, Menu::default(), &TableLayout::default()).expect("default service")
}

// ===========================================================================
// Driving
// ===========================================================================

/// Tick `n` times with a fixed `dt`, collecting the reports.
pub fn run_ticks(sim: &mut ServiceSim, n: usize, dt: Seconds) -> Vec<TickReport> {
    (0..n).map(|_| sim.tick(dt)).collect()
}

/// Tick until the service is finished or `max_ticks` is hit. Returns the
/// number of ticks run.
pub fn run_to_finish(sim: &mut ServiceSim, dt: Seconds, max_ticks: usize) -> usize {
    let mut ticks = 0;
    while !sim.is_finished() && ticks < max_ticks {
        sim.tick(dt);
        ticks += 1;
    }
    ticks
}
