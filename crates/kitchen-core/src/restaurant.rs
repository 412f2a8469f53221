//! The restaurant ledger: money, reputation, stock and staff that persist
//! across service days.

use crate::config::KitchenPolicy;
use crate::fixed::{Fixed64, clamp_unit};
use crate::id::EmployeeId;
use crate::sim::ServiceTally;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STARTING_MONEY: u64 = 100;
pub const STARTING_REPUTATION: f64 = 3.0;
pub const MAX_REPUTATION: u32 = 5;
/// Weight of one day's satisfaction in the reputation average.
pub const REPUTATION_BLEND: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("cannot spend {needed}, only {available} available")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("not enough {item}: need {needed}, have {available}")]
    InsufficientStock {
        item: String,
        needed: u32,
        available: u32,
    },
    #[error("no employee with id {0:?}")]
    UnknownEmployee(EmployeeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Waiter,
    Cook,
    Chef,
    Manager,
}

impl Role {
    /// Cooks and chefs both prepare orders.
    pub fn prepares_orders(self) -> bool {
        matches!(self, Role::Cook | Role::Chef)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub role: Role,
    pub level: u32,
}

/// How a closed service changed the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    /// The day that was just played.
    pub day: u32,
    pub earnings: u32,
    pub finished: u32,
    pub left: u32,
    pub reputation_before: Fixed64,
    pub reputation_after: Fixed64,
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    day: u32,
    money: u64,
    reputation: Fixed64,
    stock: BTreeMap<String, u32>,
    staff: Vec<Employee>,
    next_employee: u32,
    total_clients_served: u64,
    total_money_earned: u64,
    total_failed_days: u32,
}

impl Restaurant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            day: 1,
            money: STARTING_MONEY,
            reputation: Fixed64::from_num(STARTING_REPUTATION),
            stock: BTreeMap::new(),
            staff: Vec::new(),
            next_employee: 0,
            total_clients_served: 0,
            total_money_earned: 0,
            total_failed_days: 0,
        }
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn money(&self) -> u64 {
        self.money
    }

    /// Stars, `0..=5`.
    pub fn reputation(&self) -> Fixed64 {
        self.reputation
    }

    pub fn staff(&self) -> &[Employee] {
        &self.staff
    }

    pub fn total_clients_served(&self) -> u64 {
        self.total_clients_served
    }

    pub fn total_money_earned(&self) -> u64 {
        self.total_money_earned
    }

    pub fn total_failed_days(&self) -> u32 {
        self.total_failed_days
    }

    pub fn add_money(&mut self, amount: u64) {
        self.money = self.money.saturating_add(amount);
        self.total_money_earned = self.total_money_earned.saturating_add(amount);
    }

    /// Fails without change when funds are short.
    pub fn spend(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.money = self
            .money
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                needed: amount,
                available: self.money,
            })?;
        Ok(())
    }

    pub fn stock(&self, item: &str) -> u32 {
        self.stock.get(item).copied().unwrap_or(0)
    }

    pub fn stock_levels(&self) -> &BTreeMap<String, u32> {
        &self.stock
    }

    /// Add (positive) or consume (negative) an ingredient. Stock never goes
    /// below zero; returns the new quantity.
    pub fn update_ingredient(&mut self, item: &str, delta: i64) -> Result<u32, LedgerError> {
        let available = self.stock(item);
        let updated = available as i64 + delta;
        if updated < 0 {
            return Err(LedgerError::InsufficientStock {
                item: item.to_string(),
                needed: delta.unsigned_abs().min(u32::MAX as u64) as u32,
                available,
            });
        }
        let updated = updated.min(u32::MAX as i64) as u32;
        if updated == 0 {
            self.stock.remove(item);
        } else {
            self.stock.insert(item.to_string(), updated);
        }
        Ok(updated)
    }

    pub fn hire(&mut self, name: impl Into<String>, role: Role) -> EmployeeId {
        let id = EmployeeId(self.next_employee);
        self.next_employee += 1;
        self.staff.push(Employee {
            id,
            name: name.into(),
            role,
            level: 1,
        });
        log::info!("hired {id:?} as {role:?}");
        id
    }

    pub fn fire(&mut self, id: EmployeeId) -> Result<Employee, LedgerError> {
        let pos = self
            .staff
            .iter()
            .position(|e| e.id == id)
            .ok_or(LedgerError::UnknownEmployee(id))?;
        Ok(self.staff.remove(pos))
    }

    pub fn upgrade(&mut self, id: EmployeeId) -> Result<u32, LedgerError> {
        let employee = self
            .staff
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(LedgerError::UnknownEmployee(id))?;
        employee.level += 1;
        Ok(employee.level)
    }

    /// Kitchen behaviour implied by the roster. Without staff the player
    /// runs everything by hand.
    pub fn kitchen_policy(&self) -> KitchenPolicy {
        let cooks = self.staff.iter().filter(|e| e.role.prepares_orders()).count() as u32;
        let waiters = self.staff.iter().filter(|e| e.role == Role::Waiter).count() as u32;
        if cooks == 0 && waiters == 0 {
            KitchenPolicy::Manual
        } else {
            KitchenPolicy::Auto { cooks, waiters }
        }
    }

    /// Fold a finished service into the ledger and move to the next day.
    pub fn apply_service(&mut self, tally: &ServiceTally) -> DayReport {
        let reputation_before = self.reputation;
        let earnings = tally.earnings();
        self.add_money(earnings as u64);
        self.total_clients_served += tally.finished as u64;

        if let Some(avg) = tally.average_satisfaction() {
            let max = Fixed64::from_num(MAX_REPUTATION);
            let target = clamp_unit(avg) * max;
            let blend = Fixed64::from_num(REPUTATION_BLEND);
            self.reputation = (self.reputation + (target - self.reputation) * blend)
                .clamp(Fixed64::ZERO, max);
        }

        let failed = tally.finished == 0 && tally.left > 0;
        if failed {
            self.total_failed_days += 1;
        }
        let day = self.day;
        self.advance_day();
        log::info!(
            "day {day} closed: earned {earnings}, reputation {reputation_before} -> {}",
            self.reputation
        );

        DayReport {
            day,
            earnings,
            finished: tally.finished,
            left: tally.left,
            reputation_before,
            reputation_after: self.reputation,
            failed,
        }
    }

    pub fn advance_day(&mut self) {
        self.day += 1;
    }
}
