//! Service state types: clock, tally, per-tick report and state hash.

use crate::command_queue::RejectedCommand;
use crate::customer::CustomerOutcome;
use crate::fixed::{Fixed64, Seconds, Ticks, checked_div_64};
use crate::id::{CustomerId, TableId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// Ticks executed so far.
    pub tick: Ticks,
    /// Seconds gathered towards the next spawn attempt.
    pub spawn_accumulator: Seconds,
    /// Set by `pause()`; a paused service ignores ticks.
    pub paused: bool,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Service clock
// ---------------------------------------------------------------------------

/// Minutes of in-game time the service spans on the wall clock (noon to
/// midnight).
const WALL_MINUTES: i64 = 12 * 60;
const OPENING_HOUR: i64 = 12;

/// Elapsed service time against the closing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClock {
    elapsed: Seconds,
    duration: Seconds,
    closed: bool,
}

impl ServiceClock {
    pub fn new(duration: Seconds) -> Self {
        Self {
            elapsed: Fixed64::ZERO,
            duration,
            closed: false,
        }
    }

    /// Advance by `dt`. Returns `true` on the call that closes the service.
    /// Elapsed time never runs past the duration.
    pub fn advance(&mut self, dt: Seconds) -> bool {
        if self.closed {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        if self.elapsed >= self.duration {
            self.closed = true;
            return true;
        }
        false
    }

    pub fn elapsed(&self) -> Seconds {
        self.elapsed
    }

    pub fn duration(&self) -> Seconds {
        self.duration
    }

    pub fn remaining(&self) -> Seconds {
        self.duration - self.elapsed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fraction of the service elapsed, in `[0, 1]`.
    pub fn ratio(&self) -> Fixed64 {
        checked_div_64(self.elapsed, self.duration).unwrap_or(Fixed64::ZERO)
    }

    /// In-game wall time as `(hour, minute)`, running 12:00 at opening to
    /// 00:00 at closing.
    pub fn wall_time(&self) -> (u32, u32) {
        let scaled = self.elapsed.saturating_mul(Fixed64::from_num(WALL_MINUTES));
        let minutes = checked_div_64(scaled, self.duration)
            .unwrap_or(Fixed64::ZERO)
            .to_num::<i64>()
            .clamp(0, WALL_MINUTES);
        let hours = (OPENING_HOUR + minutes / 60) % 24;
        (hours as u32, (minutes % 60) as u32)
    }
}

impl std::fmt::Display for ServiceClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (h, m) = self.wall_time();
        write!(f, "{h:02}:{m:02}")
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Running totals for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTally {
    pub arrived: u32,
    pub finished: u32,
    pub left: u32,
    /// Groups that found no table.
    pub groups_turned_away: u32,
    /// Customers in those groups.
    pub customers_turned_away: u32,
    /// Dish prices of finished customers.
    pub revenue: u32,
    pub tips: u32,
    /// Sum of satisfaction over finished and departed customers.
    pub satisfaction_sum: Fixed64,
}

impl ServiceTally {
    pub fn record_finished(&mut self, price: u32, tip: u32, satisfaction: Fixed64) {
        self.finished += 1;
        self.revenue = self.revenue.saturating_add(price);
        self.tips = self.tips.saturating_add(tip);
        self.satisfaction_sum = self.satisfaction_sum.saturating_add(satisfaction);
    }

    /// Departed customers count with zero satisfaction.
    pub fn record_left(&mut self) {
        self.left += 1;
    }

    pub fn record_turned_away(&mut self, group_size: u32) {
        self.groups_turned_away += 1;
        self.customers_turned_away += group_size;
    }

    /// Customers that reached a terminal state.
    pub fn terminal(&self) -> u32 {
        self.finished + self.left
    }

    /// Average satisfaction over terminal customers, `None` before any.
    pub fn average_satisfaction(&self) -> Option<Fixed64> {
        if self.terminal() == 0 {
            return None;
        }
        checked_div_64(self.satisfaction_sum, Fixed64::from_num(self.terminal()))
    }

    /// Revenue plus tips.
    pub fn earnings(&self) -> u32 {
        self.revenue.saturating_add(self.tips)
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// What one `tick()` did. Empty when the service is paused or `dt` is not
/// positive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// False when the tick was skipped.
    pub ran: bool,
    pub tick: Ticks,
    /// Customers created this tick, seated or not.
    pub spawned: Vec<CustomerId>,
    /// Table that took this tick's group, if any.
    pub seated_at: Option<TableId>,
    /// Size of a group that found no table.
    pub turned_away: Option<u32>,
    pub outcomes: Vec<(CustomerId, CustomerOutcome)>,
    pub cleared: Vec<TableId>,
    pub rejected: Vec<RejectedCommand>,
    /// Set on the tick the clock reached closing time.
    pub closed: bool,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// Deterministic FNV-1a (64-bit) hash of service state for desync checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::secs;

    #[test]
    fn clock_closes_once_and_clamps() {
        let mut clock = ServiceClock::new(secs(10));
        assert!(!clock.advance(secs(6)));
        assert!(clock.advance(secs(6)));
        assert_eq!(clock.elapsed(), secs(10));
        assert!(clock.is_closed());
        assert!(!clock.advance(secs(1)));
        assert_eq!(clock.remaining(), Fixed64::ZERO);
    }

    #[test]
    fn wall_time_runs_noon_to_midnight() {
        let mut clock = ServiceClock::new(secs(720));
        assert_eq!(clock.to_string(), "12:00");
        clock.advance(secs(90));
        assert_eq!(clock.to_string(), "13:30");
        clock.advance(secs(629));
        assert_eq!(clock.to_string(), "23:59");
        clock.advance(secs(1));
        assert_eq!(clock.to_string(), "00:00");
    }

    #[test]
    fn wall_time_scales_with_duration() {
        let mut clock = ServiceClock::new(secs(360));
        clock.advance(secs(180));
        assert_eq!(clock.wall_time(), (18, 0));
    }

    #[test]
    fn tally_average_counts_departures_as_zero() {
        let mut tally = ServiceTally::default();
        assert_eq!(tally.average_satisfaction(), None);
        tally.record_finished(10, 10, Fixed64::from_num(1));
        tally.record_left();
        assert_eq!(tally.terminal(), 2);
        assert_eq!(tally.average_satisfaction(), Some(Fixed64::from_num(0.5)));
        assert_eq!(tally.earnings(), 20);
    }

    #[test]
    fn turn_aways_count_groups_and_heads() {
        let mut tally = ServiceTally::default();
        tally.record_turned_away(2);
        tally.record_turned_away(1);
        assert_eq!(tally.groups_turned_away, 2);
        assert_eq!(tally.customers_turned_away, 3);
    }

    #[test]
    fn state_hash_deterministic_and_order_sensitive() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);
        let mut h2 = StateHash::new();
        h2.write_u32(1);
        h2.write_u32(2);
        let mut h3 = StateHash::new();
        h3.write_u32(2);
        h3.write_u32(1);
        assert_eq!(h1.finish(), h2.finish());
        assert_ne!(h1.finish(), h3.finish());
    }
}
