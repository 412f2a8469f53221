//! Service statistics for Kitchen Rush.
//!
//! Tracks tips, revenue, satisfaction, walkouts and turn-aways over a
//! rolling tick window, plus per-variant and per-table totals. Listens to
//! core events (`CustomerArrived`, `GroupSeated`, `GroupTurnedAway`,
//! `CustomerLeft`, `CustomerFinished`, `ServiceClosed`) and aggregates them
//! with [`Fixed64`] arithmetic.
//!
//! # Usage
//!
//! ```ignore
//! let stats = ServiceStats::attach(&mut sim, StatsConfig::default());
//! let report = sim.tick(dt);
//! stats.borrow_mut().end_tick(report.tick);
//! let tips = stats.borrow().tips_in_window();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::{AddAssign, SubAssign};
use std::rc::Rc;

use kitchen_core::customer::CustomerKind;
use kitchen_core::event::{Event, EventKind};
use kitchen_core::fixed::{Fixed64, Ticks};
use kitchen_core::id::{CustomerId, TableId};
use kitchen_core::service::ServiceSim;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for rolling figures. At 60 ticks per second the
    /// default covers the last ten seconds.
    pub window_size: Ticks,
    /// Maximum number of per-tick snapshots kept for each history.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 600,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of [`Fixed64`] values for trend charts.
///
/// When full, the oldest entry is overwritten. Iterates oldest-to-newest.
/// A requested capacity of zero is raised to one.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<Fixed64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![Fixed64::ZERO; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Push a value, overwriting the oldest entry if at capacity.
    pub fn push(&mut self, value: Fixed64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The most recently pushed value, if any.
    pub fn latest(&self) -> Option<Fixed64> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(self.data[idx])
    }

    /// Iterate values from oldest to newest.
    pub fn iter(&self) -> RingBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        RingBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn to_vec(&self) -> Vec<Fixed64> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.data.fill(Fixed64::ZERO);
        self.head = 0;
        self.len = 0;
    }
}

pub struct RingBufferIter<'a> {
    buffer: &'a RingBuffer,
    index: usize,
    remaining: usize,
}

impl Iterator for RingBufferIter<'_> {
    type Item = Fixed64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.buffer.data[self.index];
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RingBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Rolling window
// ---------------------------------------------------------------------------

/// A running sum over the most recent N ticks.
///
/// Call [`add`](Self::add) any number of times during a tick, then
/// [`commit`](Self::commit) once at end-of-tick. Queries include the
/// uncommitted current tick.
#[derive(Debug, Clone)]
struct RollingWindow<T> {
    tick_values: Vec<T>,
    write_pos: usize,
    committed_total: T,
    current: T,
    committed_count: usize,
}

impl<T> RollingWindow<T>
where
    T: Copy + Default + PartialEq + AddAssign + SubAssign,
{
    fn new(window_size: usize) -> Self {
        Self {
            tick_values: vec![T::default(); window_size.max(1)],
            write_pos: 0,
            committed_total: T::default(),
            current: T::default(),
            committed_count: 0,
        }
    }

    fn window_size(&self) -> usize {
        self.tick_values.len()
    }

    fn add(&mut self, value: T) {
        self.current += value;
    }

    /// Write the current tick into the window, evicting the oldest tick
    /// when full.
    fn commit(&mut self) {
        if self.committed_count == self.window_size() {
            self.committed_total -= self.tick_values[self.write_pos];
        }
        self.tick_values[self.write_pos] = self.current;
        self.committed_total += self.current;
        self.current = T::default();
        self.write_pos = (self.write_pos + 1) % self.window_size();
        if self.committed_count < self.window_size() {
            self.committed_count += 1;
        }
    }

    fn total(&self) -> T {
        let mut total = self.committed_total;
        total += self.current;
        total
    }

    /// Ticks contributing to [`total`](Self::total).
    fn contributing_ticks(&self) -> usize {
        if self.current != T::default() {
            self.committed_count + 1
        } else {
            self.committed_count
        }
    }
}

impl RollingWindow<u64> {
    /// Average per tick over the contributing ticks.
    fn rate(&self) -> Fixed64 {
        match self.contributing_ticks() {
            0 => Fixed64::ZERO,
            n => Fixed64::from_num(self.total()) / Fixed64::from_num(n),
        }
    }
}

fn ratio(part: u64, whole: u64) -> Fixed64 {
    if whole == 0 {
        return Fixed64::ZERO;
    }
    Fixed64::from_num(part) / Fixed64::from_num(whole)
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Whole-service counters, never windowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTotals {
    pub arrived: u64,
    pub seated_groups: u64,
    pub groups_turned_away: u64,
    pub customers_turned_away: u64,
    pub finished: u64,
    pub left: u64,
    pub revenue: u64,
    pub tips: u64,
}

/// Lifetime outcomes for one customer variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindStats {
    pub finished: u64,
    pub left: u64,
    pub tips: u64,
}

impl KindStats {
    /// Fraction of this variant's resolved customers who walked out.
    pub fn abandonment_rate(&self) -> Fixed64 {
        ratio(self.left, self.left + self.finished)
    }
}

#[derive(Debug, Clone)]
struct TableStats {
    seatings: RollingWindow<u64>,
    customers_served: u64,
    revenue: u64,
    tips: u64,
}

impl TableStats {
    fn new(window_size: usize) -> Self {
        Self {
            seatings: RollingWindow::new(window_size),
            customers_served: 0,
            revenue: 0,
            tips: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceStats
// ---------------------------------------------------------------------------

/// Event kinds [`ServiceStats`] reads.
pub const TRACKED_KINDS: [EventKind; 6] = [
    EventKind::CustomerArrived,
    EventKind::GroupSeated,
    EventKind::GroupTurnedAway,
    EventKind::CustomerLeft,
    EventKind::CustomerFinished,
    EventKind::ServiceClosed,
];

/// Rolling and lifetime service statistics.
///
/// Accepts events via [`process_event`](ServiceStats::process_event) and
/// advances time via [`end_tick`](ServiceStats::end_tick).
#[derive(Debug)]
pub struct ServiceStats {
    config: StatsConfig,
    current_tick: Ticks,
    closed_at: Option<Ticks>,

    arrivals: RollingWindow<u64>,
    finished: RollingWindow<u64>,
    left: RollingWindow<u64>,
    turned_away: RollingWindow<u64>,
    tips: RollingWindow<u64>,
    revenue: RollingWindow<u64>,
    satisfaction: RollingWindow<Fixed64>,

    tip_history: RingBuffer,
    satisfaction_history: RingBuffer,

    totals: ServiceTotals,
    kinds: HashMap<CustomerKind, KindStats>,
    tables: HashMap<TableId, TableStats>,

    /// Variant of each customer still in the restaurant.
    seated_kinds: HashMap<CustomerId, CustomerKind>,
    /// Arrivals of the current tick not yet matched to a seating.
    unseated: Vec<CustomerId>,
}

impl ServiceStats {
    pub fn new(config: StatsConfig) -> Self {
        let window = config.window_size as usize;
        Self {
            current_tick: 0,
            closed_at: None,
            arrivals: RollingWindow::new(window),
            finished: RollingWindow::new(window),
            left: RollingWindow::new(window),
            turned_away: RollingWindow::new(window),
            tips: RollingWindow::new(window),
            revenue: RollingWindow::new(window),
            satisfaction: RollingWindow::new(window),
            tip_history: RingBuffer::new(config.history_capacity),
            satisfaction_history: RingBuffer::new(config.history_capacity),
            totals: ServiceTotals::default(),
            kinds: HashMap::new(),
            tables: HashMap::new(),
            seated_kinds: HashMap::new(),
            unseated: Vec::new(),
            config,
        }
    }

    /// Subscribe a shared tracker to every kind in [`TRACKED_KINDS`].
    ///
    /// The host still calls [`end_tick`](Self::end_tick) after each
    /// `sim.tick()`.
    pub fn attach(sim: &mut ServiceSim, config: StatsConfig) -> Rc<RefCell<ServiceStats>> {
        let stats = Rc::new(RefCell::new(ServiceStats::new(config)));
        for kind in TRACKED_KINDS {
            if sim.event_bus().is_suppressed(kind) {
                log::warn!("{kind:?} events are suppressed; statistics will be incomplete");
            }
            let sink = Rc::clone(&stats);
            sim.on_passive(kind, Box::new(move |e| sink.borrow_mut().process_event(e)));
        }
        stats
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    /// Tick of the `ServiceClosed` event, once seen.
    pub fn closed_at(&self) -> Option<Ticks> {
        self.closed_at
    }

    // -- Event processing ---------------------------------------------------

    pub fn process_event(&mut self, event: &Event) {
        match event {
            Event::CustomerArrived { customer, kind, .. } => {
                self.arrivals.add(1);
                self.totals.arrived += 1;
                self.seated_kinds.insert(*customer, *kind);
                self.unseated.push(*customer);
            }

            Event::GroupSeated {
                table, customers, ..
            } => {
                self.totals.seated_groups += 1;
                self.unseated.retain(|id| !customers.contains(id));
                self.get_or_create_table(*table).seatings.add(1);
            }

            Event::GroupTurnedAway { size, .. } => {
                self.turned_away.add(*size as u64);
                self.totals.groups_turned_away += 1;
                self.totals.customers_turned_away += *size as u64;
            }

            Event::CustomerLeft { customer, .. } => {
                self.left.add(1);
                self.totals.left += 1;
                if let Some(kind) = self.seated_kinds.remove(customer) {
                    self.kinds.entry(kind).or_default().left += 1;
                }
            }

            Event::CustomerFinished {
                customer,
                table,
                price,
                tip,
                satisfaction,
                ..
            } => {
                let (price, tip) = (*price as u64, *tip as u64);
                self.finished.add(1);
                self.tips.add(tip);
                self.revenue.add(price);
                self.satisfaction.add(*satisfaction);
                self.totals.finished += 1;
                self.totals.tips += tip;
                self.totals.revenue += price;

                if let Some(kind) = self.seated_kinds.remove(customer) {
                    let stats = self.kinds.entry(kind).or_default();
                    stats.finished += 1;
                    stats.tips += tip;
                }
                let table = self.get_or_create_table(*table);
                table.customers_served += 1;
                table.revenue += price;
                table.tips += tip;
            }

            Event::ServiceClosed { tick } => {
                self.closed_at = Some(*tick);
            }

            // Kitchen and table-clearing events are not tracked here.
            _ => {}
        }
    }

    /// Finalize the current tick and advance all rolling windows.
    pub fn end_tick(&mut self, tick: Ticks) {
        self.current_tick = tick;

        // Arrivals that found no table this tick were turned away.
        for id in self.unseated.drain(..) {
            self.seated_kinds.remove(&id);
        }

        self.tip_history.push(self.tips.rate());
        self.satisfaction_history.push(self.average_satisfaction());

        self.arrivals.commit();
        self.finished.commit();
        self.left.commit();
        self.turned_away.commit();
        self.tips.commit();
        self.revenue.commit();
        self.satisfaction.commit();
        for table in self.tables.values_mut() {
            table.seatings.commit();
        }
    }

    // -- Window queries -----------------------------------------------------

    pub fn tips_in_window(&self) -> u64 {
        self.tips.total()
    }

    /// Average tips per tick over the window.
    pub fn tip_rate(&self) -> Fixed64 {
        self.tips.rate()
    }

    pub fn revenue_in_window(&self) -> u64 {
        self.revenue.total()
    }

    pub fn arrivals_in_window(&self) -> u64 {
        self.arrivals.total()
    }

    /// Mean satisfaction of customers who finished within the window, or
    /// zero if nobody did.
    pub fn average_satisfaction(&self) -> Fixed64 {
        let finished = self.finished.total();
        if finished == 0 {
            return Fixed64::ZERO;
        }
        self.satisfaction.total() / Fixed64::from_num(finished)
    }

    /// Walkouts over resolved customers (walkouts plus finishers) within
    /// the window.
    pub fn abandonment_rate(&self) -> Fixed64 {
        let left = self.left.total();
        ratio(left, left + self.finished.total())
    }

    /// Customers turned away over customers arrived within the window.
    pub fn turn_away_rate(&self) -> Fixed64 {
        ratio(self.turned_away.total(), self.arrivals.total())
    }

    // -- Lifetime queries ---------------------------------------------------

    pub fn totals(&self) -> &ServiceTotals {
        &self.totals
    }

    pub fn kind_stats(&self, kind: CustomerKind) -> KindStats {
        self.kinds.get(&kind).cloned().unwrap_or_default()
    }

    /// Seatings at a table within the window.
    pub fn table_turnover(&self, table: TableId) -> u64 {
        self.tables
            .get(&table)
            .map(|t| t.seatings.total())
            .unwrap_or(0)
    }

    pub fn table_customers_served(&self, table: TableId) -> u64 {
        self.tables
            .get(&table)
            .map(|t| t.customers_served)
            .unwrap_or(0)
    }

    /// Menu price plus tips taken at a table over the service.
    pub fn table_earnings(&self, table: TableId) -> u64 {
        self.tables
            .get(&table)
            .map(|t| t.revenue + t.tips)
            .unwrap_or(0)
    }

    /// Customers still seated, as far as the events tell.
    pub fn in_restaurant(&self) -> usize {
        self.seated_kinds.len()
    }

    // -- History ------------------------------------------------------------

    /// Tip rate snapshots, oldest to newest.
    pub fn tip_history(&self) -> Vec<Fixed64> {
        self.tip_history.to_vec()
    }

    pub fn satisfaction_history(&self) -> Vec<Fixed64> {
        self.satisfaction_history.to_vec()
    }

    /// Reset everything, keeping the configuration.
    pub fn clear(&mut self) {
        *self = ServiceStats::new(self.config.clone());
    }

    fn get_or_create_table(&mut self, table: TableId) -> &mut TableStats {
        let window = self.config.window_size as usize;
        self.tables
            .entry(table)
            .or_insert_with(|| TableStats::new(window))
    }
}
