//! Player commands, queued by the host and executed at tick boundaries.
//!
//! Each command is a single kitchen or floor action. Commands returned by
//! reactive event handlers land in the same queue and run on the next tick.

use crate::customer::TransitionError;
use crate::fixed::Ticks;
use crate::id::CustomerId;
use crate::order::OrderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Send a customer's waiting order to the kitchen.
    StartOrder { customer: CustomerId },
    /// Bring a ready dish to its waiting customer.
    Serve { customer: CustomerId },
}

impl Command {
    pub fn customer(&self) -> CustomerId {
        match self {
            Command::StartOrder { customer } | Command::Serve { customer } => *customer,
        }
    }
}

/// Why a command was rejected. Nothing is mutated when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{0} is not seated")]
    UnknownCustomer(CustomerId),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Customer(#[from] TransitionError),
}

/// A command that failed, with the tick it was attempted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedCommand {
    pub command: Command,
    pub error: CommandError,
    pub tick: Ticks,
}

/// Commands waiting for the next tick, plus optional history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// (tick, command) for every drained command.
    history: Vec<(Ticks, Command)>,
    /// 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Take all pending commands in submission order, recording them in
    /// history under `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands = std::mem::take(&mut self.pending);
        if self.max_history > 0 {
            self.history.extend(commands.iter().map(|&c| (tick, c)));
            let excess = self.history.len().saturating_sub(self.max_history);
            self.history.drain(..excess);
        }
        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(Ticks, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: u64) -> Command {
        Command::StartOrder {
            customer: CustomerId(id),
        }
    }

    #[test]
    fn drain_returns_submission_order() {
        let mut q = CommandQueue::new();
        q.push(start(2));
        q.push_batch([start(1), Command::Serve { customer: CustomerId(2) }]);
        assert_eq!(q.pending_count(), 3);
        let drained = q.drain(0);
        assert_eq!(drained[0], start(2));
        assert_eq!(drained[2].customer(), CustomerId(2));
        assert!(q.is_empty());
    }

    #[test]
    fn no_history_by_default() {
        let mut q = CommandQueue::new();
        q.push(start(1));
        q.drain(5);
        assert!(q.history().is_empty());
    }

    #[test]
    fn history_is_trimmed_to_limit() {
        let mut q = CommandQueue::with_max_history(2);
        for tick in 0..4 {
            q.push(start(tick));
            q.drain(tick);
        }
        assert_eq!(q.history(), &[(2, start(2)), (3, start(3))]);
        q.clear_history();
        assert!(q.history().is_empty());
    }
}
