//! Read-only views of the dining room for rendering and UI.
//!
//! All types are owned copies; nothing borrows from the running service.

use crate::customer::{Customer, CustomerKind, CustomerStatus};
use crate::fixed::{Fixed64, Seconds, Ticks};
use crate::id::{CustomerId, TableId};
use crate::order::OrderStatus;
use crate::sim::ServiceTally;
use crate::table::{Position, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    pub kind: CustomerKind,
    pub status: CustomerStatus,
    pub patience_remaining: Seconds,
    pub satisfaction: Fixed64,
    pub dish: String,
    pub order_status: OrderStatus,
    /// 0..=100.
    pub order_progress: Fixed64,
}

impl From<&Customer> for CustomerSnapshot {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id(),
            kind: c.kind(),
            status: c.status(),
            patience_remaining: c.patience_remaining(),
            satisfaction: c.satisfaction(),
            dish: c.order().dish().name.clone(),
            order_status: c.order().status(),
            order_progress: c.order().progress(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub id: TableId,
    pub position: Position,
    pub capacity: u32,
    pub occupied_chairs: usize,
    pub customers: Vec<CustomerSnapshot>,
}

impl From<&Table> for TableSnapshot {
    fn from(t: &Table) -> Self {
        Self {
            id: t.id(),
            position: t.position(),
            capacity: t.capacity(),
            occupied_chairs: t.occupied_chairs(),
            customers: t.customers().iter().map(CustomerSnapshot::from).collect(),
        }
    }
}

/// The whole service at one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
    pub tick: Ticks,
    pub elapsed: Seconds,
    pub remaining: Seconds,
    /// `HH:MM` wall clock.
    pub clock: String,
    pub closed: bool,
    pub paused: bool,
    pub tally: ServiceTally,
    pub tables: Vec<TableSnapshot>,
}

impl ServiceSnapshot {
    pub fn seated_customers(&self) -> usize {
        self.tables.iter().map(|t| t.customers.len()).sum()
    }

    pub fn table(&self, id: TableId) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.id == id)
    }
}
