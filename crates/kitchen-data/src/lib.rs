//! Data-driven setup for Kitchen Rush services.
//!
//! Loads the menu, service configuration and dining-room layout from data
//! files in RON, TOML or JSON and converts them into validated
//! `kitchen-core` types.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, ServiceData, load_service_data};
