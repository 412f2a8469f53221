//! Tables: seat one group at a time, tick it, and clear themselves once the
//! whole group is done or gone.

use crate::customer::{Customer, CustomerOutcome, CustomerTick};
use crate::fixed::Seconds;
use crate::id::{CustomerId, TableId};
use serde::{Deserialize, Serialize};

/// Most seats a table can have.
pub const MAX_CAPACITY: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("table capacity {0} outside 1..={MAX_CAPACITY}")]
pub struct TableError(pub u32);

/// Position of a table in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// Chairs
// ---------------------------------------------------------------------------

/// Where a chair sits around its table. Filled in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChairSlot {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl ChairSlot {
    pub const ORDER: [ChairSlot; 6] = [
        ChairSlot::TopLeft,
        ChairSlot::TopCenter,
        ChairSlot::TopRight,
        ChairSlot::BottomLeft,
        ChairSlot::BottomCenter,
        ChairSlot::BottomRight,
    ];

    /// Offset from the table centre.
    pub fn offset(self) -> (i32, i32) {
        match self {
            ChairSlot::TopLeft => (-70, -40),
            ChairSlot::TopCenter => (0, -60),
            ChairSlot::TopRight => (70, -40),
            ChairSlot::BottomLeft => (-70, 20),
            ChairSlot::BottomCenter => (0, 40),
            ChairSlot::BottomRight => (70, 20),
        }
    }

    /// Back-row chairs are drawn behind the table.
    pub fn is_back_row(self) -> bool {
        matches!(
            self,
            ChairSlot::TopLeft | ChairSlot::TopCenter | ChairSlot::TopRight
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chair {
    pub slot: ChairSlot,
    pub position: Position,
    pub occupied: bool,
}

// ---------------------------------------------------------------------------
// Seating results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Someone is already seated.
    Occupied,
    /// The group is larger than the table.
    OverCapacity { group: usize, capacity: u32 },
    /// Nobody to seat.
    EmptyGroup,
}

/// A seating attempt that failed. The group is handed back so the caller
/// can try the next table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatingRejected {
    pub reason: RejectReason,
    pub group: Vec<Customer>,
}

/// Result of ticking one table.
#[derive(Debug, Default)]
pub struct TableTick {
    /// Customers whose order became ready this tick.
    pub orders_ready: Vec<CustomerId>,
    /// Terminal states reached this tick.
    pub outcomes: Vec<(CustomerId, CustomerOutcome)>,
    /// Customers removed by the automatic clear, if it happened.
    pub released: Vec<Customer>,
}

impl TableTick {
    pub fn cleared(&self) -> bool {
        !self.released.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    id: TableId,
    position: Position,
    capacity: u32,
    customers: Vec<Customer>,
    chairs: Vec<Chair>,
}

impl Table {
    pub fn new(id: TableId, position: Position, capacity: u32) -> Result<Self, TableError> {
        if !(1..=MAX_CAPACITY).contains(&capacity) {
            return Err(TableError(capacity));
        }
        let chairs = ChairSlot::ORDER
            .iter()
            .take(capacity as usize)
            .map(|&slot| {
                let (dx, dy) = slot.offset();
                Chair {
                    slot,
                    position: Position::new(position.x + dx, position.y + dy),
                    occupied: false,
                }
            })
            .collect();
        Ok(Self {
            id,
            position,
            capacity,
            customers: Vec::new(),
            chairs,
        })
    }

    /// Re-check the capacity rule of [`Table::new`] and that the seated
    /// group fits.
    pub fn validate(&self) -> Result<(), TableError> {
        let fits = self.customers.len() <= self.capacity as usize
            && self.chairs.len() == self.capacity as usize;
        if !(1..=MAX_CAPACITY).contains(&self.capacity) || !fits {
            return Err(TableError(self.capacity));
        }
        Ok(())
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn chairs(&self) -> &[Chair] {
        &self.chairs
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id() == id)
    }

    pub(crate) fn customer_mut(&mut self, id: CustomerId) -> Option<&mut Customer> {
        self.customers.iter_mut().find(|c| c.id() == id)
    }

    pub(crate) fn customers_mut(&mut self) -> &mut [Customer] {
        &mut self.customers
    }

    pub fn occupied_chairs(&self) -> usize {
        self.chairs.iter().filter(|c| c.occupied).count()
    }

    /// True iff nobody is seated.
    pub fn is_available(&self) -> bool {
        self.customers.is_empty()
    }

    /// Whether a group of `size` could be seated right now.
    pub fn fits(&self, size: usize) -> bool {
        self.is_available() && size >= 1 && size <= self.capacity as usize
    }

    /// Seat a whole group. On rejection the table is unchanged.
    pub fn seat_customers(&mut self, group: Vec<Customer>) -> Result<(), SeatingRejected> {
        let reason = if group.is_empty() {
            Some(RejectReason::EmptyGroup)
        } else if !self.is_available() {
            Some(RejectReason::Occupied)
        } else if group.len() > self.capacity as usize {
            Some(RejectReason::OverCapacity {
                group: group.len(),
                capacity: self.capacity,
            })
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(SeatingRejected { reason, group });
        }

        for chair in self.chairs.iter_mut().take(group.len()) {
            chair.occupied = true;
        }
        self.customers = group;
        Ok(())
    }

    /// Tick every seated customer, then clear the table if all of them are
    /// terminal.
    pub fn tick(&mut self, dt: Seconds, eating_duration: Seconds) -> TableTick {
        let mut result = TableTick::default();
        for customer in &mut self.customers {
            let CustomerTick {
                order_ready,
                outcome,
            } = customer.tick(dt, eating_duration);
            if order_ready {
                result.orders_ready.push(customer.id());
            }
            if let Some(outcome) = outcome {
                result.outcomes.push((customer.id(), outcome));
            }
        }
        if !self.customers.is_empty() && self.customers.iter().all(|c| c.status().is_terminal()) {
            result.released = self.clear();
        }
        result
    }

    /// Remove everyone and free the chairs.
    pub fn clear(&mut self) -> Vec<Customer> {
        for chair in &mut self.chairs {
            chair.occupied = false;
        }
        std::mem::take(&mut self.customers)
    }
}
