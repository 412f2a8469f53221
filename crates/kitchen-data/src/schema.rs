//! Serde schemas for the data files.
//!
//! These mirror the core types but use plain `f64` seconds, so files read
//! naturally in every format. Conversion into core types validates the
//! values and is the only place `f64` crosses into `Fixed64`.

use crate::loader::DataLoadError;
use kitchen_core::config::{KitchenPolicy, ServiceConfig, TableLayout, TableSpec};
use kitchen_core::customer::{KindPolicy, KindPolicyTable};
use kitchen_core::fixed::{Fixed64, fixed64_to_f64};
use kitchen_core::menu::{Dish, Menu};
use kitchen_core::table::Position;
use serde::Deserialize;

/// Convert a data-file number into `Fixed64`, rejecting values that do not
/// fit (including NaN and infinities).
pub fn to_fixed(field: &'static str, value: f64) -> Result<Fixed64, DataLoadError> {
    Fixed64::checked_from_num(value).ok_or(DataLoadError::OutOfRange { field, value })
}

// ===========================================================================
// Menu
// ===========================================================================

fn default_difficulty() -> u8 {
    1
}

/// A dish entry in `menu.{ron,toml,json}`. TOML files use `[[dishes]]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DishData {
    pub name: String,
    pub price: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    /// Seconds.
    pub prep_time: f64,
}

impl DishData {
    pub fn into_dish(self) -> Result<Dish, DataLoadError> {
        let prep_time = to_fixed("prep_time", self.prep_time)?;
        Ok(Dish::new(self.name, self.price, self.difficulty, prep_time)?)
    }
}

// ===========================================================================
// Service configuration
// ===========================================================================

/// Kitchen staffing. `manual = true` leaves every order to the player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KitchenData {
    pub manual: bool,
    pub cooks: u32,
    pub waiters: u32,
}

impl Default for KitchenData {
    fn default() -> Self {
        KitchenPolicy::default().into()
    }
}

impl From<KitchenPolicy> for KitchenData {
    fn from(policy: KitchenPolicy) -> Self {
        match policy {
            KitchenPolicy::Manual => Self {
                manual: true,
                cooks: 0,
                waiters: 0,
            },
            KitchenPolicy::Auto { cooks, waiters } => Self {
                manual: false,
                cooks,
                waiters,
            },
        }
    }
}

impl From<KitchenData> for KitchenPolicy {
    fn from(data: KitchenData) -> Self {
        if data.manual {
            KitchenPolicy::Manual
        } else {
            KitchenPolicy::Auto {
                cooks: data.cooks,
                waiters: data.waiters,
            }
        }
    }
}

/// Patience range, tip multiplier and spawn weight for one customer variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicyData {
    pub patience_min: f64,
    pub patience_max: f64,
    pub reward_multiplier: f64,
    pub spawn_weight: u32,
}

impl From<&KindPolicy> for PolicyData {
    fn from(policy: &KindPolicy) -> Self {
        Self {
            patience_min: fixed64_to_f64(policy.patience_min),
            patience_max: fixed64_to_f64(policy.patience_max),
            reward_multiplier: fixed64_to_f64(policy.reward_multiplier),
            spawn_weight: policy.spawn_weight,
        }
    }
}

impl PolicyData {
    fn into_policy(self) -> Result<KindPolicy, DataLoadError> {
        Ok(KindPolicy {
            patience_min: to_fixed("patience_min", self.patience_min)?,
            patience_max: to_fixed("patience_max", self.patience_max)?,
            reward_multiplier: to_fixed("reward_multiplier", self.reward_multiplier)?,
            spawn_weight: self.spawn_weight,
        })
    }
}

/// Per-variant policies. A variant left out of the file keeps its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CustomersData {
    pub common: PolicyData,
    pub impatient: PolicyData,
    pub boss: PolicyData,
}

impl Default for CustomersData {
    fn default() -> Self {
        let table = KindPolicyTable::default();
        Self {
            common: (&table.common).into(),
            impatient: (&table.impatient).into(),
            boss: (&table.boss).into(),
        }
    }
}

/// Contents of `service.{ron,toml,json}`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfigData {
    pub spawn_interval: f64,
    pub group_sizes: Vec<u32>,
    pub eating_duration: f64,
    pub service_duration: f64,
    pub seed: u64,
    pub kitchen: KitchenData,
    pub event_capacity: usize,
    pub customers: CustomersData,
}

impl Default for ServiceConfigData {
    fn default() -> Self {
        let config = ServiceConfig::default();
        Self {
            spawn_interval: fixed64_to_f64(config.spawn_interval),
            group_sizes: config.group_sizes,
            eating_duration: fixed64_to_f64(config.eating_duration),
            service_duration: fixed64_to_f64(config.service_duration),
            seed: config.seed,
            kitchen: config.kitchen.into(),
            event_capacity: config.event_capacity,
            customers: CustomersData::default(),
        }
    }
}

impl ServiceConfigData {
    /// Build and validate a [`ServiceConfig`].
    pub fn into_config(self) -> Result<ServiceConfig, DataLoadError> {
        let config = ServiceConfig {
            spawn_interval: to_fixed("spawn_interval", self.spawn_interval)?,
            group_sizes: self.group_sizes,
            eating_duration: to_fixed("eating_duration", self.eating_duration)?,
            service_duration: to_fixed("service_duration", self.service_duration)?,
            seed: self.seed,
            kitchen: self.kitchen.into(),
            event_capacity: self.event_capacity,
            policies: KindPolicyTable {
                common: self.customers.common.into_policy()?,
                impatient: self.customers.impatient.into_policy()?,
                boss: self.customers.boss.into_policy()?,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

// ===========================================================================
// Layout
// ===========================================================================

/// A table entry in `layout.{ron,toml,json}`. TOML files use `[[tables]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TableData {
    pub x: i32,
    pub y: i32,
    pub capacity: u32,
}

impl From<TableData> for TableSpec {
    fn from(data: TableData) -> Self {
        TableSpec {
            position: Position::new(data.x, data.y),
            capacity: data.capacity,
        }
    }
}

/// Build and validate a [`TableLayout`] from file entries, in file order.
pub fn into_layout(tables: Vec<TableData>) -> Result<TableLayout, DataLoadError> {
    let layout = TableLayout::new(tables.into_iter().map(TableSpec::from).collect());
    layout.validate()?;
    Ok(layout)
}

/// Build a [`Menu`] from file entries, in file order.
pub fn into_menu(dishes: Vec<DishData>) -> Result<Menu, DataLoadError> {
    let dishes = dishes
        .into_iter()
        .map(DishData::into_dish)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Menu::new(dishes)?)
}
