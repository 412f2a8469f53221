//! Kitchen Core -- the service-phase simulation engine for restaurant games.
//!
//! This crate runs one service: customers arrive in groups, sit at tables,
//! wait for their orders, eat, tip and leave. The host calls
//! [`service::ServiceSim::tick`] once per frame and renders from snapshots
//! and events; nothing here draws, plays audio or touches files.
//!
//! # Tick Pipeline
//!
//! Each call to `tick(dt)` runs:
//!
//! 1. **Commands** -- Apply queued player commands (start order, serve).
//! 2. **Spawn** -- On the spawn interval, create a group and seat it
//!    first-fit, or turn it away.
//! 3. **Kitchen** -- Staff start and serve orders under the kitchen policy.
//! 4. **Tables** -- Tick every table, cascading to customers and orders.
//! 5. **Clock** -- Advance towards closing time.
//! 6. **Post-tick** -- Deliver buffered events; collect reactive commands.
//! 7. **Bookkeeping** -- Increment the tick counter and compute the state hash.
//!
//! # Key Types
//!
//! - [`service::ServiceSim`] -- The driver and pipeline orchestrator.
//! - [`table::Table`] -- Seats one group at a time and clears itself.
//! - [`customer::Customer`] -- Waiting, eating, done or left.
//! - [`order::Order`] -- Timed dish preparation.
//! - [`restaurant::Restaurant`] -- The ledger a closed service folds into.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- Subscription-based event bus with buffered delivery.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod command_queue;
pub mod config;
pub mod customer;
pub mod event;
pub mod fixed;
pub mod id;
pub mod menu;
pub mod order;
pub mod query;
pub mod restaurant;
pub mod rng;
pub mod serialize;
pub mod service;
pub mod sim;
pub mod table;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
