//! Customers and the per-variant policy table.
//!
//! Variants differ only in data (patience range, tip multiplier, spawn
//! weight), so a customer carries a [`CustomerKind`] tag and the values it
//! drew from the [`KindPolicyTable`] at creation. There is no per-variant
//! behaviour beyond that.
//!
//! # State machine
//!
//! ```text
//! Waiting --serve--> Eating --finish--> Done
//!    |
//!    +--patience exhausted--> Left
//! ```

use crate::fixed::{Fixed64, Seconds, checked_div_64};
use crate::id::CustomerId;
use crate::menu::Menu;
use crate::order::Order;
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Satisfaction floor for any customer who was actually served.
pub const MIN_SERVED_SATISFACTION: f64 = 0.4;

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerKind {
    Common,
    Impatient,
    Boss,
}

impl CustomerKind {
    pub const ALL: [CustomerKind; 3] = [
        CustomerKind::Common,
        CustomerKind::Impatient,
        CustomerKind::Boss,
    ];

    /// Short tag used by the presentation layer (`C`, `I`, `B`).
    pub fn tag(self) -> char {
        match self {
            CustomerKind::Common => 'C',
            CustomerKind::Impatient => 'I',
            CustomerKind::Boss => 'B',
        }
    }
}

/// Parameters a customer variant draws from at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindPolicy {
    pub patience_min: Seconds,
    pub patience_max: Seconds,
    pub reward_multiplier: Fixed64,
    /// Relative spawn weight against the other variants.
    pub spawn_weight: u32,
}

impl KindPolicy {
    fn new(patience: (u32, u32), multiplier: f64, spawn_weight: u32) -> Self {
        Self {
            patience_min: Fixed64::from_num(patience.0),
            patience_max: Fixed64::from_num(patience.1),
            reward_multiplier: Fixed64::from_num(multiplier),
            spawn_weight,
        }
    }
}

/// Lookup table from variant to policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindPolicyTable {
    pub common: KindPolicy,
    pub impatient: KindPolicy,
    pub boss: KindPolicy,
}

impl KindPolicyTable {
    pub fn get(&self, kind: CustomerKind) -> &KindPolicy {
        match kind {
            CustomerKind::Common => &self.common,
            CustomerKind::Impatient => &self.impatient,
            CustomerKind::Boss => &self.boss,
        }
    }

    /// Draw a variant using the spawn weights. Falls back to `Common` if
    /// every weight is zero.
    pub fn pick_kind(&self, rng: &mut SimRng) -> CustomerKind {
        let weights = CustomerKind::ALL.map(|k| self.get(k).spawn_weight);
        rng.weighted_index(&weights)
            .map(|i| CustomerKind::ALL[i])
            .unwrap_or(CustomerKind::Common)
    }
}

impl Default for KindPolicyTable {
    fn default() -> Self {
        Self {
            common: KindPolicy::new((15, 20), 1.0, 70),
            impatient: KindPolicy::new((8, 12), 1.0, 25),
            boss: KindPolicy::new((25, 30), 2.0, 5),
        }
    }
}

// ---------------------------------------------------------------------------
// Status and transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerStatus {
    Waiting,
    Eating,
    Done,
    Left,
}

impl CustomerStatus {
    /// `Done` and `Left` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, CustomerStatus::Done | CustomerStatus::Left)
    }
}

/// A customer transition requested from the wrong status. The customer is
/// left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{customer} cannot {action} while {status:?}")]
pub struct TransitionError {
    pub customer: CustomerId,
    pub status: CustomerStatus,
    pub action: &'static str,
}

/// A terminal state reached during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerOutcome {
    /// Patience ran out before being served.
    Left,
    /// Finished eating; carries the tip earned.
    Finished { tip: u32 },
}

/// What happened to one customer during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomerTick {
    /// The order finished preparing this tick.
    pub order_ready: bool,
    pub outcome: Option<CustomerOutcome>,
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    kind: CustomerKind,
    status: CustomerStatus,
    /// Seconds spent waiting, then seconds spent eating after `serve`.
    timer: Seconds,
    satisfaction: Fixed64,
    patience: Seconds,
    max_patience: Seconds,
    reward_multiplier: Fixed64,
    order: Order,
}

impl Customer {
    /// Create a customer of the given variant, drawing patience from its
    /// policy and a dish uniformly from the menu.
    pub fn spawn(
        id: CustomerId,
        kind: CustomerKind,
        policies: &KindPolicyTable,
        menu: &Menu,
        rng: &mut SimRng,
    ) -> Self {
        let policy = policies.get(kind);
        let patience = rng.range(policy.patience_min, policy.patience_max);
        let (dish_id, dish) = menu.choose(rng);
        let order = Order::new(id, dish_id, dish.clone());
        Self::with_patience(id, kind, order, patience, policy.reward_multiplier)
    }

    /// Create a customer with an explicit patience bound.
    pub fn with_patience(
        id: CustomerId,
        kind: CustomerKind,
        order: Order,
        patience: Seconds,
        reward_multiplier: Fixed64,
    ) -> Self {
        Self {
            id,
            kind,
            status: CustomerStatus::Waiting,
            timer: Fixed64::ZERO,
            satisfaction: Fixed64::from_num(1),
            patience,
            max_patience: patience,
            reward_multiplier,
            order,
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn kind(&self) -> CustomerKind {
        self.kind
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn timer(&self) -> Seconds {
        self.timer
    }

    pub fn satisfaction(&self) -> Fixed64 {
        self.satisfaction
    }

    pub fn patience(&self) -> Seconds {
        self.patience
    }

    pub fn max_patience(&self) -> Seconds {
        self.max_patience
    }

    pub fn reward_multiplier(&self) -> Fixed64 {
        self.reward_multiplier
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub(crate) fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }

    /// Seconds left before a waiting customer walks out. Zero once served or
    /// gone.
    pub fn patience_remaining(&self) -> Seconds {
        match self.status {
            CustomerStatus::Waiting => (self.patience - self.timer).max(Fixed64::ZERO),
            _ => Fixed64::ZERO,
        }
    }

    /// Advance this customer by `dt` seconds.
    ///
    /// Waiting customers tick their order and lose patience; eating
    /// customers finish after `eating_duration`. Terminal customers ignore
    /// the call.
    pub fn tick(&mut self, dt: Seconds, eating_duration: Seconds) -> CustomerTick {
        let mut result = CustomerTick::default();
        if dt <= Fixed64::ZERO {
            return result;
        }
        match self.status {
            CustomerStatus::Waiting => {
                result.order_ready = self.order.advance(dt);
                self.timer = self.timer.saturating_add(dt);
                if self.timer >= self.patience {
                    self.status = CustomerStatus::Left;
                    self.satisfaction = Fixed64::ZERO;
                    result.outcome = Some(CustomerOutcome::Left);
                }
            }
            CustomerStatus::Eating => {
                self.timer = self.timer.saturating_add(dt);
                if self.timer >= eating_duration && self.finish().is_ok() {
                    result.outcome = Some(CustomerOutcome::Finished {
                        tip: self.get_tip(),
                    });
                }
            }
            CustomerStatus::Done | CustomerStatus::Left => {}
        }
        result
    }

    /// Seat the dish in front of the customer: waiting -> eating. The timer
    /// restarts and now measures eating time.
    pub fn serve(&mut self) -> Result<(), TransitionError> {
        self.require(CustomerStatus::Waiting, "be served")?;
        self.status = CustomerStatus::Eating;
        self.timer = Fixed64::ZERO;
        Ok(())
    }

    /// eating -> done. Satisfaction becomes `max(0.4, patience / max_patience)`.
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        self.require(CustomerStatus::Eating, "finish")?;
        self.status = CustomerStatus::Done;
        let ratio = checked_div_64(self.patience, self.max_patience).unwrap_or(Fixed64::from_num(1));
        self.satisfaction = ratio
            .max(Fixed64::from_num(MIN_SERVED_SATISFACTION))
            .min(Fixed64::from_num(1));
        Ok(())
    }

    /// `floor(price * satisfaction)`, then scaled by the variant multiplier
    /// and floored again. Flooring the base first can give a boss one unit
    /// less than `floor(price * satisfaction * multiplier)` would.
    ///
    /// Computed on the raw Q32.32 bits in integer arithmetic, so any price
    /// is safe. Results beyond `u32::MAX` saturate; a negative multiplier
    /// or satisfaction counts as zero.
    pub fn get_tip(&self) -> u32 {
        let price = self.order.dish().price as u128;
        let base = mul_frac(price, self.satisfaction);
        u32::try_from(mul_frac(base, self.reward_multiplier)).unwrap_or(u32::MAX)
    }

    fn require(&self, status: CustomerStatus, action: &'static str) -> Result<(), TransitionError> {
        if self.status != status {
            return Err(TransitionError {
                customer: self.id,
                status: self.status,
                action,
            });
        }
        Ok(())
    }
}

/// `floor(whole * factor)` for a non-negative fixed-point factor.
fn mul_frac(whole: u128, factor: Fixed64) -> u128 {
    let bits = factor.to_bits().max(0) as u128;
    (whole * bits) >> Fixed64::FRAC_NBITS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::DishId;
    use crate::menu::Dish;
    use crate::order::OrderStatus;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn customer(kind: CustomerKind, patience: f64, price: u32) -> Customer {
        let dish = Dish::new("Burger", price, 1, fixed(4.0)).unwrap();
        let order = Order::new(CustomerId(1), DishId(0), dish);
        let multiplier = KindPolicyTable::default().get(kind).reward_multiplier;
        Customer::with_patience(CustomerId(1), kind, order, fixed(patience), multiplier)
    }

    #[test]
    fn unserved_customer_leaves_when_patience_runs_out() {
        let mut c = customer(CustomerKind::Common, 10.0, 10);
        let eat = fixed(6.0);

        assert_eq!(c.tick(fixed(9.9), eat).outcome, None);
        assert_eq!(c.status(), CustomerStatus::Waiting);

        assert_eq!(c.tick(fixed(0.2), eat).outcome, Some(CustomerOutcome::Left));
        assert_eq!(c.status(), CustomerStatus::Left);
        assert_eq!(c.satisfaction(), Fixed64::ZERO);
        assert_eq!(c.get_tip(), 0);
    }

    #[test]
    fn leaving_exactly_at_patience() {
        let mut c = customer(CustomerKind::Impatient, 10.0, 10);
        c.tick(fixed(10.0), fixed(6.0));
        assert_eq!(c.status(), CustomerStatus::Left);
    }

    #[test]
    fn served_and_finished_common_tips_full_price() {
        let mut c = customer(CustomerKind::Common, 20.0, 10);
        c.tick(fixed(5.0), fixed(6.0));
        c.serve().unwrap();
        assert_eq!(c.timer(), Fixed64::ZERO);
        c.finish().unwrap();
        assert_eq!(c.satisfaction(), fixed(1.0));
        assert_eq!(c.get_tip(), 10);
    }

    #[test]
    fn boss_doubles_the_tip() {
        let mut c = customer(CustomerKind::Boss, 20.0, 10);
        c.tick(fixed(5.0), fixed(6.0));
        c.serve().unwrap();
        c.finish().unwrap();
        assert_eq!(c.get_tip(), 20);
    }

    #[test]
    fn tip_floors_before_multiplying() {
        let mut c = customer(CustomerKind::Boss, 20.0, 15);
        c.serve().unwrap();
        c.finish().unwrap();
        // Force a fractional base: 15 * 0.5 = 7.5 -> 7 -> 14.
        c.satisfaction = fixed(0.5);
        assert_eq!(c.get_tip(), 14);
    }

    #[test]
    fn tip_on_a_price_beyond_fixed_range() {
        let mut c = customer(CustomerKind::Boss, 20.0, 3_000_000_000);
        c.serve().unwrap();
        c.finish().unwrap();
        assert_eq!(c.get_tip(), u32::MAX);

        c.satisfaction = fixed(0.5);
        assert_eq!(c.get_tip(), 3_000_000_000);
    }

    #[test]
    fn negative_multiplier_tips_nothing() {
        let dish = Dish::new("Burger", 10, 1, fixed(4.0)).unwrap();
        let order = Order::new(CustomerId(1), DishId(0), dish);
        let mut c = Customer::with_patience(
            CustomerId(1),
            CustomerKind::Common,
            order,
            fixed(20.0),
            fixed(-1.0),
        );
        c.serve().unwrap();
        c.finish().unwrap();
        assert_eq!(c.get_tip(), 0);
    }

    #[test]
    fn eating_customer_finishes_after_eating_duration() {
        let mut c = customer(CustomerKind::Common, 20.0, 10);
        c.serve().unwrap();
        let eat = fixed(6.0);
        assert_eq!(c.tick(fixed(5.0), eat).outcome, None);
        assert_eq!(c.status(), CustomerStatus::Eating);
        assert_eq!(
            c.tick(fixed(1.0), eat).outcome,
            Some(CustomerOutcome::Finished { tip: 10 })
        );
        assert_eq!(c.status(), CustomerStatus::Done);
    }

    #[test]
    fn eating_customer_does_not_lose_patience() {
        let mut c = customer(CustomerKind::Impatient, 8.0, 10);
        c.serve().unwrap();
        c.tick(fixed(7.0), fixed(30.0));
        c.tick(fixed(7.0), fixed(30.0));
        assert_eq!(c.status(), CustomerStatus::Eating);
    }

    #[test]
    fn invalid_transitions_are_rejected_without_change() {
        let mut c = customer(CustomerKind::Common, 10.0, 10);
        let err = c.finish().unwrap_err();
        assert_eq!(err.status, CustomerStatus::Waiting);
        assert_eq!(c.status(), CustomerStatus::Waiting);

        c.tick(fixed(11.0), fixed(6.0));
        let err = c.serve().unwrap_err();
        assert_eq!(err.status, CustomerStatus::Left);
        assert_eq!(err.action, "be served");
        assert_eq!(c.status(), CustomerStatus::Left);
    }

    #[test]
    fn terminal_customers_ignore_ticks() {
        let mut c = customer(CustomerKind::Common, 1.0, 10);
        c.tick(fixed(2.0), fixed(6.0));
        let timer = c.timer();
        assert_eq!(c.tick(fixed(5.0), fixed(6.0)), CustomerTick::default());
        assert_eq!(c.timer(), timer);
        assert_eq!(c.satisfaction(), Fixed64::ZERO);
    }

    #[test]
    fn waiting_customer_ticks_its_order() {
        let mut c = customer(CustomerKind::Boss, 30.0, 10);
        c.order_mut().start_preparing().unwrap();
        assert!(!c.tick(fixed(2.0), fixed(6.0)).order_ready);
        assert!(c.tick(fixed(2.0), fixed(6.0)).order_ready);
        assert_eq!(c.order().status(), OrderStatus::Ready);
    }

    #[test]
    fn patience_remaining_counts_down() {
        let mut c = customer(CustomerKind::Common, 15.0, 10);
        c.tick(fixed(5.0), fixed(6.0));
        assert_eq!(c.patience_remaining(), fixed(10.0));
        c.serve().unwrap();
        assert_eq!(c.patience_remaining(), Fixed64::ZERO);
    }

    #[test]
    fn spawn_draws_patience_from_policy_range() {
        let policies = KindPolicyTable::default();
        let menu = Menu::default();
        let mut rng = SimRng::new(77);
        for i in 0..200 {
            for kind in CustomerKind::ALL {
                let c = Customer::spawn(CustomerId(i), kind, &policies, &menu, &mut rng);
                let p = policies.get(kind);
                assert!(c.patience() >= p.patience_min && c.patience() < p.patience_max);
                assert_eq!(c.patience(), c.max_patience());
                assert_eq!(c.order().customer(), c.id());
            }
        }
    }

    #[test]
    fn pick_kind_falls_back_to_common() {
        let mut policies = KindPolicyTable::default();
        policies.common.spawn_weight = 0;
        policies.impatient.spawn_weight = 0;
        policies.boss.spawn_weight = 0;
        let mut rng = SimRng::new(1);
        assert_eq!(policies.pick_kind(&mut rng), CustomerKind::Common);
    }

    #[test]
    fn pick_kind_respects_single_weight() {
        let mut policies = KindPolicyTable::default();
        policies.common.spawn_weight = 0;
        policies.impatient.spawn_weight = 0;
        let mut rng = SimRng::new(1);
        for _ in 0..50 {
            assert_eq!(policies.pick_kind(&mut rng), CustomerKind::Boss);
        }
    }
}
