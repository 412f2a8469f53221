//! A single dish request tied to one customer.

use crate::fixed::{Fixed64, Seconds, checked_div_64};
use crate::id::{CustomerId, DishId};
use crate::menu::Dish;
use serde::{Deserialize, Serialize};

/// Progress value at which an order is ready.
pub const FULL_PROGRESS: u32 = 100;

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Waiting,
    Preparing,
    Ready,
    Served,
}

/// An order transition requested from the wrong status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order for {customer} cannot {action} while {status:?}")]
pub struct OrderError {
    pub customer: CustomerId,
    pub status: OrderStatus,
    pub action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    customer: CustomerId,
    dish_id: DishId,
    dish: Dish,
    status: OrderStatus,
    /// 0..=100.
    progress: Fixed64,
}

impl Order {
    pub fn new(customer: CustomerId, dish_id: DishId, dish: Dish) -> Self {
        Self {
            customer,
            dish_id,
            dish,
            status: OrderStatus::Waiting,
            progress: Fixed64::ZERO,
        }
    }

    pub fn customer(&self) -> CustomerId {
        self.customer
    }

    pub fn dish_id(&self) -> DishId {
        self.dish_id
    }

    pub fn dish(&self) -> &Dish {
        &self.dish
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn progress(&self) -> Fixed64 {
        self.progress
    }

    /// Hand the order to the kitchen.
    pub fn start_preparing(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Waiting, OrderStatus::Preparing, "start preparing")
    }

    /// Deliver a ready dish to the table.
    pub fn serve(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Ready, OrderStatus::Served, "be served")
    }

    /// Advance preparation by `dt` seconds. Returns `true` on the tick the
    /// order becomes ready.
    ///
    /// Progress grows by `dt * 100 / prep_time` and only while preparing.
    pub fn advance(&mut self, dt: Seconds) -> bool {
        if self.status != OrderStatus::Preparing || dt <= Fixed64::ZERO {
            return false;
        }
        let full = Fixed64::from_num(FULL_PROGRESS);
        let Some(rate) = checked_div_64(full, self.dish.prep_time()) else {
            return false;
        };
        self.progress = self.progress.saturating_add(dt.saturating_mul(rate));
        if self.progress >= full {
            self.progress = full;
            self.status = OrderStatus::Ready;
            return true;
        }
        false
    }

    fn transition(
        &mut self,
        from: OrderStatus,
        to: OrderStatus,
        action: &'static str,
    ) -> Result<(), OrderError> {
        if self.status != from {
            return Err(OrderError {
                customer: self.customer,
                status: self.status,
                action,
            });
        }
        self.status = to;
        Ok(())
    }
}
