//! The service driver: owns the dining room and runs the per-tick pipeline.
//!
//! # Architecture
//!
//! A [`ServiceSim`] owns:
//! - the ordered [`Table`] list (each table owns its seated customers)
//! - the [`Menu`], the [`ServiceConfig`] and a seeded [`SimRng`]
//! - a [`ServiceClock`], a [`ServiceTally`] and the [`SimState`]
//! - a [`CommandQueue`] and an [`EventBus`]
//!
//! # Pipeline
//!
//! Each `tick(dt)` runs:
//! 1. **Commands** -- apply queued player commands (including reactive ones)
//! 2. **Spawn** -- accumulate time; on the interval, create a group and seat
//!    it first-fit or turn it away
//! 3. **Kitchen** -- staff start and serve orders per the [`KitchenPolicy`]
//! 4. **Tables** -- tick every table in order; record outcomes, auto-clear
//! 5. **Clock** -- advance towards closing time
//! 6. **Post-tick** -- deliver buffered events to subscribers
//! 7. **Bookkeeping** -- bump the tick counter, compute the state hash
//!
//! Spawning runs before the tables tick, so a table vacated during a tick is
//! only seatable at the next spawn.

use crate::command_queue::{Command, CommandError, CommandQueue, RejectedCommand};
use crate::config::{ConfigError, KitchenPolicy, ServiceConfig, TableLayout};
use crate::customer::{Customer, CustomerOutcome, CustomerStatus, TransitionError};
use crate::event::{Event, EventBus, EventKind, PassiveListener, ReactiveHandler};
use crate::fixed::{Fixed64, Seconds};
use crate::id::{CustomerId, TableId};
use crate::menu::Menu;
use crate::order::OrderStatus;
use crate::query::{CustomerSnapshot, ServiceSnapshot, TableSnapshot};
use crate::restaurant::{DayReport, Restaurant};
use crate::rng::SimRng;
use crate::sim::{ServiceClock, ServiceTally, SimState, StateHash, TickReport};
use crate::table::{Table, TableError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("this service was already settled into the ledger")]
    AlreadySettled,
}

#[derive(Debug)]
pub struct ServiceSim {
    pub(crate) config: ServiceConfig,
    pub(crate) menu: Menu,
    pub(crate) tables: Vec<Table>,
    pub(crate) rng: SimRng,
    pub(crate) next_customer: CustomerId,
    pub(crate) clock: ServiceClock,
    pub(crate) tally: ServiceTally,
    pub sim_state: SimState,
    pub(crate) commands: CommandQueue,
    pub(crate) event_bus: EventBus,
    /// Set once the tally has been folded into a ledger.
    pub(crate) settled: bool,
    pub(crate) last_state_hash: u64,
}

impl ServiceSim {
    /// Validate the configuration and layout and open the service.
    pub fn new(
        config: ServiceConfig,
        menu: Menu,
        layout: &TableLayout,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        layout.validate()?;
        let tables = layout
            .tables
            .iter()
            .enumerate()
            .map(|(i, spec)| Table::new(TableId(i as u32), spec.position, spec.capacity))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "service opened: {} tables, {} dishes, closes after {}s",
            tables.len(),
            menu.len(),
            config.service_duration
        );

        let mut sim = Self {
            rng: SimRng::new(config.seed),
            clock: ServiceClock::new(config.service_duration),
            event_bus: EventBus::new(config.event_capacity),
            config,
            menu,
            tables,
            next_customer: CustomerId(1),
            tally: ServiceTally::default(),
            sim_state: SimState::new(),
            commands: CommandQueue::new(),
            settled: false,
            last_state_hash: 0,
        };
        sim.last_state_hash = sim.compute_state_hash();
        Ok(sim)
    }

    /// Open a service with the kitchen staffed from the restaurant's roster.
    pub fn for_restaurant(
        mut config: ServiceConfig,
        menu: Menu,
        layout: &TableLayout,
        restaurant: &Restaurant,
    ) -> Result<Self, ServiceError> {
        config.kitchen = restaurant.kitchen_policy();
        Self::new(config, menu, layout)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id() == id)
    }

    /// A seated customer, wherever they sit.
    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.tables.iter().find_map(|t| t.customer(id))
    }

    pub fn clock(&self) -> &ServiceClock {
        &self.clock
    }

    pub fn tally(&self) -> &ServiceTally {
        &self.tally
    }

    /// Id the next spawned customer will get.
    pub fn next_customer_id(&self) -> CustomerId {
        self.next_customer
    }

    pub fn is_closed(&self) -> bool {
        self.clock.is_closed()
    }

    /// Closed and every table empty.
    pub fn is_finished(&self) -> bool {
        self.clock.is_closed() && self.tables.iter().all(Table::is_available)
    }

    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------------

    /// While paused, `tick()` is a no-op. Commands can still be submitted.
    pub fn pause(&mut self) {
        self.sim_state.paused = true;
    }

    pub fn resume(&mut self) {
        self.sim_state.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.sim_state.paused
    }

    // -----------------------------------------------------------------------
    // Commands and events
    // -----------------------------------------------------------------------

    /// Queue a command for the next tick.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn command_queue(&self) -> &CommandQueue {
        &self.commands
    }

    /// Record executed commands, keeping at most `max_history`.
    pub fn keep_command_history(&mut self, max_history: usize) {
        let pending: Vec<Command> = self.commands.drain(self.sim_state.tick);
        self.commands = CommandQueue::with_max_history(max_history);
        self.commands.push_batch(pending);
    }

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.event_bus.on_reactive(kind, handler);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn event_bus_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            tick: self.sim_state.tick,
            elapsed: self.clock.elapsed(),
            remaining: self.clock.remaining(),
            clock: self.clock.to_string(),
            closed: self.clock.is_closed(),
            paused: self.sim_state.paused,
            tally: self.tally.clone(),
            tables: self.tables.iter().map(TableSnapshot::from).collect(),
        }
    }

    pub fn customer_snapshot(&self, id: CustomerId) -> Option<CustomerSnapshot> {
        self.customer(id).map(CustomerSnapshot::from)
    }

    // -----------------------------------------------------------------------
    // Closing
    // -----------------------------------------------------------------------

    /// Fold this service's tally into the ledger and advance its day.
    /// Customers still seated do not count.
    pub fn close_service(&mut self, restaurant: &mut Restaurant) -> Result<DayReport, ServiceError> {
        if self.settled {
            return Err(ServiceError::AlreadySettled);
        }
        if !self.is_finished() {
            log::warn!(
                "settling service early at {} with {} customers seated",
                self.clock,
                self.tables.iter().map(|t| t.customers().len()).sum::<usize>()
            );
        }
        self.settled = true;
        Ok(restaurant.apply_service(&self.tally))
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the service by `dt` seconds.
    pub fn tick(&mut self, dt: Seconds) -> TickReport {
        if self.sim_state.paused || dt <= Fixed64::ZERO {
            return TickReport::default();
        }
        let mut report = TickReport {
            ran: true,
            tick: self.sim_state.tick,
            ..TickReport::default()
        };

        // Phase 1: Commands.
        self.phase_commands(&mut report);
        // Phase 2: Spawn.
        self.phase_spawn(dt, &mut report);
        // Phase 3: Kitchen.
        self.phase_kitchen();
        // Phase 4: Tables.
        self.phase_tables(dt, &mut report);
        // Phase 5: Clock.
        self.phase_clock(dt, &mut report);
        // Phase 6: Post-tick.
        self.event_bus.deliver();
        // Phase 7: Bookkeeping.
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();

        report
    }

    // -----------------------------------------------------------------------
    // Phase 1: Commands
    // -----------------------------------------------------------------------

    fn phase_commands(&mut self, report: &mut TickReport) {
        // Reactive handlers from the previous tick go after host commands.
        let reactive = self.event_bus.drain_commands();
        self.commands.push_batch(reactive);

        let tick = self.sim_state.tick;
        for command in self.commands.drain(tick) {
            if let Err(error) = self.apply_command(command) {
                log::warn!("rejected {command:?} at tick {tick}: {error}");
                report.rejected.push(RejectedCommand {
                    command,
                    error,
                    tick,
                });
            }
        }
    }

    fn apply_command(&mut self, command: Command) -> Result<(), CommandError> {
        let id = command.customer();
        let tick = self.sim_state.tick;
        let (table, customer) = self
            .tables
            .iter_mut()
            .find_map(|t| {
                let table = t.id();
                t.customer_mut(id).map(|c| (table, c))
            })
            .ok_or(CommandError::UnknownCustomer(id))?;

        match command {
            Command::StartOrder { .. } => {
                require_waiting(customer, "place an order")?;
                customer.order_mut().start_preparing()?;
                self.event_bus.emit(Event::OrderStarted { customer: id, tick });
            }
            Command::Serve { .. } => {
                require_waiting(customer, "be served")?;
                customer.order_mut().serve()?;
                customer.serve()?;
                self.event_bus.emit(Event::CustomerServed {
                    customer: id,
                    table,
                    tick,
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 2: Spawn
    // -----------------------------------------------------------------------

    fn phase_spawn(&mut self, dt: Seconds, report: &mut TickReport) {
        if self.clock.is_closed() {
            return;
        }
        self.sim_state.spawn_accumulator = self.sim_state.spawn_accumulator.saturating_add(dt);
        if self.sim_state.spawn_accumulator < self.config.spawn_interval {
            return;
        }
        self.sim_state.spawn_accumulator = Fixed64::ZERO;

        let tick = self.sim_state.tick;
        let sizes = &self.config.group_sizes;
        let size = sizes[self.rng.index(sizes.len())];

        let mut group = Vec::with_capacity(size as usize);
        for _ in 0..size {
            let id = self.next_customer;
            self.next_customer = id.next();
            let kind = self.config.policies.pick_kind(&mut self.rng);
            let customer =
                Customer::spawn(id, kind, &self.config.policies, &self.menu, &mut self.rng);
            self.event_bus.emit(Event::CustomerArrived {
                customer: id,
                kind,
                dish: customer.order().dish_id(),
                tick,
            });
            report.spawned.push(id);
            group.push(customer);
        }
        self.tally.arrived += size;

        let ids = report.spawned.clone();
        match seat_first_fit(&mut self.tables, group) {
            Ok(table) => {
                log::debug!("tick {tick}: seated {ids:?} at {table}");
                report.seated_at = Some(table);
                self.event_bus.emit(Event::GroupSeated {
                    table,
                    customers: ids,
                    tick,
                });
            }
            Err(_dropped) => {
                log::debug!("tick {tick}: no table for a group of {size}, turned away");
                self.tally.record_turned_away(size);
                report.turned_away = Some(size);
                self.event_bus.emit(Event::GroupTurnedAway { size, tick });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Kitchen
    // -----------------------------------------------------------------------

    fn phase_kitchen(&mut self) {
        let KitchenPolicy::Auto { cooks, waiters } = self.config.kitchen else {
            return;
        };
        let tick = self.sim_state.tick;

        // Waiting customers in id order, with the table they sit at.
        let mut queue: Vec<(CustomerId, usize)> = self
            .tables
            .iter()
            .enumerate()
            .flat_map(|(ti, t)| {
                t.customers()
                    .iter()
                    .filter(|c| c.status() == CustomerStatus::Waiting)
                    .map(move |c| (c.id(), ti))
            })
            .collect();
        queue.sort_unstable();

        let mut preparing = queue
            .iter()
            .filter(|&&(id, ti)| {
                self.tables[ti]
                    .customer(id)
                    .is_some_and(|c| c.order().status() == OrderStatus::Preparing)
            })
            .count() as u32;

        let mut served = 0u32;
        for &(id, ti) in &queue {
            let table = &mut self.tables[ti];
            let table_id = table.id();
            let Some(customer) = table.customer_mut(id) else {
                continue;
            };
            match customer.order().status() {
                OrderStatus::Waiting if preparing < cooks => {
                    if customer.order_mut().start_preparing().is_ok() {
                        preparing += 1;
                        log::debug!("tick {tick}: kitchen started order for {id}");
                        self.event_bus.emit(Event::OrderStarted { customer: id, tick });
                    }
                }
                OrderStatus::Ready if served < waiters => {
                    if customer.order_mut().serve().is_ok() && customer.serve().is_ok() {
                        served += 1;
                        log::debug!("tick {tick}: waiter served {id} at {table_id}");
                        self.event_bus.emit(Event::CustomerServed {
                            customer: id,
                            table: table_id,
                            tick,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Tables
    // -----------------------------------------------------------------------

    fn phase_tables(&mut self, dt: Seconds, report: &mut TickReport) {
        let tick = self.sim_state.tick;
        let eating = self.config.eating_duration;

        for table in &mut self.tables {
            let table_id = table.id();
            let result = table.tick(dt, eating);

            for &customer in &result.orders_ready {
                self.event_bus.emit(Event::OrderReady { customer, tick });
            }

            for &(customer, outcome) in &result.outcomes {
                report.outcomes.push((customer, outcome));
                match outcome {
                    CustomerOutcome::Left => {
                        log::debug!("tick {tick}: {customer} left {table_id} unserved");
                        self.tally.record_left();
                        self.event_bus.emit(Event::CustomerLeft {
                            customer,
                            table: table_id,
                            tick,
                        });
                    }
                    CustomerOutcome::Finished { tip } => {
                        let Some(c) = table
                            .customer(customer)
                            .or_else(|| result.released.iter().find(|c| c.id() == customer))
                        else {
                            continue;
                        };
                        let price = c.order().dish().price;
                        let satisfaction = c.satisfaction();
                        self.tally.record_finished(price, tip, satisfaction);
                        self.event_bus.emit(Event::CustomerFinished {
                            customer,
                            table: table_id,
                            price,
                            tip,
                            satisfaction,
                            tick,
                        });
                    }
                }
            }

            if result.cleared() {
                report.cleared.push(table_id);
                self.event_bus.emit(Event::TableCleared {
                    table: table_id,
                    tick,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 5: Clock
    // -----------------------------------------------------------------------

    fn phase_clock(&mut self, dt: Seconds, report: &mut TickReport) {
        if self.clock.advance(dt) {
            let tick = self.sim_state.tick;
            log::info!(
                "service closed at tick {tick}: {} finished, {} left, {} groups turned away",
                self.tally.finished,
                self.tally.left,
                self.tally.groups_turned_away
            );
            report.closed = true;
            self.event_bus.emit(Event::ServiceClosed { tick });
        }
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    pub(crate) fn compute_state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim_state.tick);
        h.write_fixed64(self.sim_state.spawn_accumulator);
        h.write_u64(self.next_customer.0);
        h.write_u64(self.rng.state());
        h.write_fixed64(self.clock.elapsed());

        let t = &self.tally;
        for v in [
            t.arrived,
            t.finished,
            t.left,
            t.groups_turned_away,
            t.customers_turned_away,
            t.revenue,
            t.tips,
        ] {
            h.write_u32(v);
        }
        h.write_fixed64(t.satisfaction_sum);

        for table in &self.tables {
            h.write_u32(table.id().0);
            h.write_u32(table.customers().len() as u32);
            for c in table.customers() {
                h.write_u64(c.id().0);
                h.write_u8(c.status() as u8);
                h.write_fixed64(c.timer());
                h.write_fixed64(c.satisfaction());
                h.write_u8(c.order().status() as u8);
                h.write_fixed64(c.order().progress());
            }
        }
        h.finish()
    }
}

/// Seat at the first table that takes the whole group, or hand it back.
fn seat_first_fit(tables: &mut [Table], mut group: Vec<Customer>) -> Result<TableId, Vec<Customer>> {
    for table in tables.iter_mut() {
        if !table.fits(group.len()) {
            continue;
        }
        match table.seat_customers(group) {
            Ok(()) => return Ok(table.id()),
            Err(rejected) => group = rejected.group,
        }
    }
    Err(group)
}

fn require_waiting(customer: &Customer, action: &'static str) -> Result<(), TransitionError> {
    if customer.status() != CustomerStatus::Waiting {
        return Err(TransitionError {
            customer: customer.id(),
            status: customer.status(),
            action,
        });
    }
    Ok(())
}
