//! Service configuration and the dining-room layout.

use crate::customer::{CustomerKind, KindPolicyTable};
use crate::fixed::{Fixed64, Seconds, secs};
use crate::table::{MAX_CAPACITY, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Fixed64 },
    #[error("group sizes must not be empty")]
    NoGroupSizes,
    #[error("group size {0} outside 1..={MAX_CAPACITY}")]
    InvalidGroupSize(u32),
    #[error("all customer spawn weights are zero")]
    ZeroSpawnWeights,
    #[error("{kind:?} patience range is inverted ({min} > {max})")]
    InvertedPatience {
        kind: CustomerKind,
        min: Fixed64,
        max: Fixed64,
    },
    #[error("{kind:?} patience must be positive")]
    NonPositivePatience { kind: CustomerKind },
    #[error("{kind:?} reward multiplier {multiplier} is negative")]
    NegativeRewardMultiplier {
        kind: CustomerKind,
        multiplier: Fixed64,
    },
    #[error("layout has no tables")]
    EmptyLayout,
    #[error("layout table {index} has capacity {capacity}, expected 1..={MAX_CAPACITY}")]
    InvalidCapacity { index: usize, capacity: u32 },
}

/// How orders move through the kitchen without player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KitchenPolicy {
    /// Orders move only when the host submits commands.
    Manual,
    /// Staff work on their own: at most `cooks` orders in preparation, at
    /// most `waiters` ready orders served per tick.
    Auto { cooks: u32, waiters: u32 },
}

impl Default for KitchenPolicy {
    fn default() -> Self {
        KitchenPolicy::Auto {
            cooks: 1,
            waiters: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Seconds between spawn attempts.
    pub spawn_interval: Seconds,
    /// Group sizes drawn uniformly at each spawn.
    pub group_sizes: Vec<u32>,
    /// How long a served customer eats before finishing.
    pub eating_duration: Seconds,
    /// Length of the service. No spawns after this.
    pub service_duration: Seconds,
    pub seed: u64,
    pub kitchen: KitchenPolicy,
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
    pub policies: KindPolicyTable,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            spawn_interval: secs(5),
            group_sizes: vec![1, 2],
            eating_duration: secs(6),
            service_duration: secs(720),
            seed: 0,
            kitchen: KitchenPolicy::default(),
            event_capacity: 256,
            policies: KindPolicyTable::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("spawn_interval", self.spawn_interval),
            ("eating_duration", self.eating_duration),
            ("service_duration", self.service_duration),
        ] {
            if value <= Fixed64::ZERO {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if self.group_sizes.is_empty() {
            return Err(ConfigError::NoGroupSizes);
        }
        if let Some(&bad) = self
            .group_sizes
            .iter()
            .find(|&&s| s == 0 || s > MAX_CAPACITY)
        {
            return Err(ConfigError::InvalidGroupSize(bad));
        }

        let mut total_weight = 0u64;
        for kind in CustomerKind::ALL {
            let policy = self.policies.get(kind);
            if policy.patience_min <= Fixed64::ZERO {
                return Err(ConfigError::NonPositivePatience { kind });
            }
            if policy.patience_min > policy.patience_max {
                return Err(ConfigError::InvertedPatience {
                    kind,
                    min: policy.patience_min,
                    max: policy.patience_max,
                });
            }
            if policy.reward_multiplier < Fixed64::ZERO {
                return Err(ConfigError::NegativeRewardMultiplier {
                    kind,
                    multiplier: policy.reward_multiplier,
                });
            }
            total_weight += policy.spawn_weight as u64;
        }
        if total_weight == 0 {
            return Err(ConfigError::ZeroSpawnWeights);
        }
        Ok(())
    }
}

/// One table in a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub position: Position,
    pub capacity: u32,
}

/// Ordered list of tables. Order decides first-fit seating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub tables: Vec<TableSpec>,
}

impl TableLayout {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self { tables }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tables.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        for (index, spec) in self.tables.iter().enumerate() {
            if !(1..=MAX_CAPACITY).contains(&spec.capacity) {
                return Err(ConfigError::InvalidCapacity {
                    index,
                    capacity: spec.capacity,
                });
            }
        }
        Ok(())
    }

    /// Largest table in the room.
    pub fn max_capacity(&self) -> u32 {
        self.tables.iter().map(|t| t.capacity).max().unwrap_or(0)
    }
}

impl Default for TableLayout {
    /// The starter dining room: a two-top, a four-top, a single and a
    /// six-top.
    fn default() -> Self {
        let spec = |x, y, capacity| TableSpec {
            position: Position::new(x, y),
            capacity,
        };
        Self {
            tables: vec![
                spec(251, 150, 2),
                spec(569, 150, 4),
                spec(223, 350, 1),
                spec(600, 350, 6),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ServiceConfig::default().validate().unwrap();
        TableLayout::default().validate().unwrap();
        assert_eq!(TableLayout::default().max_capacity(), 6);
    }

    #[test]
    fn zero_spawn_interval_rejected() {
        let config = ServiceConfig {
            spawn_interval: Fixed64::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::NonPositive {
                field: "spawn_interval",
                value: Fixed64::ZERO
            }
        );
    }

    #[test]
    fn group_sizes_checked() {
        let mut config = ServiceConfig {
            group_sizes: vec![],
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoGroupSizes);
        config.group_sizes = vec![1, 7];
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::InvalidGroupSize(7)
        );
        config.group_sizes = vec![0];
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::InvalidGroupSize(0)
        );
    }

    #[test]
    fn inverted_patience_rejected() {
        let mut config = ServiceConfig::default();
        config.policies.boss.patience_min = secs(40);
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvertedPatience {
                kind: CustomerKind::Boss,
                ..
            }
        ));
    }

    #[test]
    fn negative_reward_multiplier_rejected() {
        let mut config = ServiceConfig::default();
        config.policies.impatient.reward_multiplier = Fixed64::from_num(-1);
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::NegativeRewardMultiplier {
                kind: CustomerKind::Impatient,
                multiplier: Fixed64::from_num(-1),
            }
        );

        config.policies.impatient.reward_multiplier = Fixed64::ZERO;
        config.validate().unwrap();
    }

    #[test]
    fn zero_weights_rejected() {
        let mut config = ServiceConfig::default();
        config.policies.common.spawn_weight = 0;
        config.policies.impatient.spawn_weight = 0;
        config.policies.boss.spawn_weight = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::ZeroSpawnWeights);
    }

    #[test]
    fn layout_capacity_checked() {
        let layout = TableLayout::new(vec![
            TableSpec {
                position: Position::default(),
                capacity: 2,
            },
            TableSpec {
                position: Position::default(),
                capacity: 9,
            },
        ]);
        assert_eq!(
            layout.validate().unwrap_err(),
            ConfigError::InvalidCapacity {
                index: 1,
                capacity: 9
            }
        );
        assert_eq!(
            TableLayout::new(vec![]).validate().unwrap_err(),
            ConfigError::EmptyLayout
        );
    }
}
