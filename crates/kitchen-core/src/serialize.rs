//! Binary snapshots of a running service via `bitcode`, with a versioned
//! header.

use crate::command_queue::{Command, CommandQueue};
use crate::config::{ConfigError, ServiceConfig};
use crate::event::EventBus;
use crate::id::CustomerId;
use crate::menu::{Menu, MenuError};
use crate::rng::SimRng;
use crate::service::ServiceSim;
use crate::sim::{ServiceClock, ServiceTally, SimState};
use crate::table::{Table, TableError};
use serde::{Deserialize, Serialize};

/// Magic number identifying a service snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x4B52_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot config is invalid: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("snapshot menu is invalid: {0}")]
    InvalidMenu(#[from] MenuError),
    #[error("snapshot table is invalid: {0}")]
    InvalidTable(#[from] TableError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count when the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Serializable part of a service. The event bus holds closures and is
/// rebuilt on restore with only its undelivered reactive commands.
#[derive(Debug, Serialize, Deserialize)]
struct ServiceSnapshotData {
    header: SnapshotHeader,
    config: ServiceConfig,
    menu: Menu,
    tables: Vec<Table>,
    rng: SimRng,
    next_customer: CustomerId,
    clock: ServiceClock,
    tally: ServiceTally,
    sim_state: SimState,
    commands: CommandQueue,
    reactive_commands: Vec<Command>,
    settled: bool,
    last_state_hash: u64,
}

impl ServiceSnapshotData {
    /// Decoded values skip the constructors, so their invariants are
    /// checked again here.
    fn validate(&self) -> Result<(), DeserializeError> {
        self.header.validate()?;
        self.config.validate()?;
        self.menu.validate()?;
        for table in &self.tables {
            table.validate()?;
            for customer in table.customers() {
                customer.order().dish().validate()?;
            }
        }
        Ok(())
    }
}

/// Decode only the header, e.g. to show the tick of a saved snapshot.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: ServiceSnapshotData =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

impl ServiceSim {
    /// Encode the service state. Subscribers are not included.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = ServiceSnapshotData {
            header: SnapshotHeader::new(self.sim_state.tick),
            config: self.config.clone(),
            menu: self.menu.clone(),
            tables: self.tables.clone(),
            rng: self.rng.clone(),
            next_customer: self.next_customer,
            clock: self.clock.clone(),
            tally: self.tally.clone(),
            sim_state: self.sim_state.clone(),
            commands: self.commands.clone(),
            reactive_commands: self.event_bus.pending_commands().to_vec(),
            settled: self.settled,
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode a service. The header, config, menu and tables are checked
    /// before any state is used; subscribers must be registered again
    /// afterwards.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: ServiceSnapshotData =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.validate()?;

        let mut event_bus = EventBus::new(snapshot.config.event_capacity);
        event_bus.restore_commands(snapshot.reactive_commands);
        Ok(ServiceSim {
            event_bus,
            config: snapshot.config,
            menu: snapshot.menu,
            tables: snapshot.tables,
            rng: snapshot.rng,
            next_customer: snapshot.next_customer,
            clock: snapshot.clock,
            tally: snapshot.tally,
            sim_state: snapshot.sim_state,
            commands: snapshot.commands,
            settled: snapshot.settled,
            last_state_hash: snapshot.last_state_hash,
        })
    }
}
