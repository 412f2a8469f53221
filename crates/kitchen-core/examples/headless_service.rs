//! Headless service example: one full day with staff, events and a ledger.
//!
//! Runs the default room and menu at 30 frames per second, prints a line
//! per finished or departed customer, and settles the day into a ledger.
//!
//! Run with: `RUST_LOG=debug cargo run -p kitchen-core --example headless_service`

use std::cell::RefCell;
use std::rc::Rc;

use kitchen_core::config::{ServiceConfig, TableLayout};
use kitchen_core::event::{Event, EventKind};
use kitchen_core::fixed::{Fixed64, fixed64_to_f64};
use kitchen_core::menu::Menu;
use kitchen_core::restaurant::{Restaurant, Role};
use kitchen_core::service::ServiceSim;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let mut restaurant = Restaurant::new("Kitchen Rush");
    restaurant.hire("Ana", Role::Cook);
    restaurant.hire("Leo", Role::Waiter);

    let config = ServiceConfig {
        seed: 42,
        ..ServiceConfig::default()
    };
    let mut sim =
        ServiceSim::for_restaurant(config, Menu::default(), &TableLayout::default(), &restaurant)?;

    let lines = Rc::new(RefCell::new(Vec::new()));
    for kind in [EventKind::CustomerFinished, EventKind::CustomerLeft] {
        let sink = Rc::clone(&lines);
        sim.on_passive(
            kind,
            Box::new(move |e| match e {
                Event::CustomerFinished {
                    customer,
                    table,
                    price,
                    tip,
                    ..
                } => sink
                    .borrow_mut()
                    .push(format!("{customer} paid {price} + {tip} tip at {table}")),
                Event::CustomerLeft { customer, table, .. } => sink
                    .borrow_mut()
                    .push(format!("{customer} walked out of {table}")),
                _ => {}
            }),
        );
    }

    let dt = Fixed64::from_num(1) / Fixed64::from_num(30);
    while !sim.is_finished() {
        sim.tick(dt);
        for line in lines.borrow_mut().drain(..) {
            println!("[{}] {line}", sim.clock());
        }
    }

    let tally = sim.tally().clone();
    let report = sim.close_service(&mut restaurant)?;

    println!();
    println!("=== Day {} ===", report.day);
    println!("  Arrived:      {}", tally.arrived);
    println!("  Finished:     {}", tally.finished);
    println!("  Left:         {}", tally.left);
    println!("  Turned away:  {} groups", tally.groups_turned_away);
    println!("  Earnings:     {}", report.earnings);
    println!(
        "  Reputation:   {:.2} -> {:.2}",
        fixed64_to_f64(report.reputation_before),
        fixed64_to_f64(report.reputation_after)
    );
    println!("  Money:        {}", restaurant.money());
    Ok(())
}
