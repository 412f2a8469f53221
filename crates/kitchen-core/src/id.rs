use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a customer. Issued sequentially by the service driver,
/// starting at 1, and never reused within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CustomerId(pub u64);

/// Identifies a table by its position in the layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TableId(pub u32);

/// Identifies a dish by its index in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DishId(pub u32);

/// Identifies an employee on the restaurant's roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub u32);

impl CustomerId {
    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_ids_order_by_issue() {
        let a = CustomerId(1);
        let b = a.next();
        assert!(a < b);
        assert_eq!(b, CustomerId(2));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(TableId(0), "window");
        map.insert(TableId(1), "patio");
        assert_eq!(map[&TableId(1)], "patio");
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(CustomerId(7).to_string(), "C7");
        assert_eq!(TableId(3).to_string(), "T3");
    }
}
