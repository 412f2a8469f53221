//! Typed service events with pre-allocated ring buffers.
//!
//! Events are emitted while the service ticks (spawning, kitchen, tables,
//! clock) and delivered in batch at the end of the tick. Each event kind has
//! its own [`EventBuffer`] with a configurable capacity.
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only, used for animation triggers, audio,
//!   statistics.
//! - **Reactive handlers**: return [`Command`]s to enqueue for the next tick.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::command_queue::Command;
use crate::customer::CustomerKind;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{CustomerId, DishId, TableId};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A service event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Arrivals --
    CustomerArrived {
        customer: CustomerId,
        kind: CustomerKind,
        dish: DishId,
        tick: Ticks,
    },
    GroupSeated {
        table: TableId,
        customers: Vec<CustomerId>,
        tick: Ticks,
    },
    GroupTurnedAway {
        size: u32,
        tick: Ticks,
    },

    // -- Kitchen --
    OrderStarted {
        customer: CustomerId,
        tick: Ticks,
    },
    OrderReady {
        customer: CustomerId,
        tick: Ticks,
    },

    // -- Dining --
    CustomerServed {
        customer: CustomerId,
        table: TableId,
        tick: Ticks,
    },
    CustomerLeft {
        customer: CustomerId,
        table: TableId,
        tick: Ticks,
    },
    CustomerFinished {
        customer: CustomerId,
        table: TableId,
        price: u32,
        tip: u32,
        satisfaction: Fixed64,
        tick: Ticks,
    },
    TableCleared {
        table: TableId,
        tick: Ticks,
    },

    // -- Clock --
    ServiceClosed {
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CustomerArrived,
    GroupSeated,
    GroupTurnedAway,
    OrderStarted,
    OrderReady,
    CustomerServed,
    CustomerLeft,
    CustomerFinished,
    TableCleared,
    ServiceClosed,
}

const EVENT_KIND_COUNT: usize = 10;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CustomerArrived { .. } => EventKind::CustomerArrived,
            Event::GroupSeated { .. } => EventKind::GroupSeated,
            Event::GroupTurnedAway { .. } => EventKind::GroupTurnedAway,
            Event::OrderStarted { .. } => EventKind::OrderStarted,
            Event::OrderReady { .. } => EventKind::OrderReady,
            Event::CustomerServed { .. } => EventKind::CustomerServed,
            Event::CustomerLeft { .. } => EventKind::CustomerLeft,
            Event::CustomerFinished { .. } => EventKind::CustomerFinished,
            Event::TableCleared { .. } => EventKind::TableCleared,
            Event::ServiceClosed { .. } => EventKind::ServiceClosed,
        }
    }

    /// The tick this event was emitted on.
    pub fn tick(&self) -> Ticks {
        match self {
            Event::CustomerArrived { tick, .. }
            | Event::GroupSeated { tick, .. }
            | Event::GroupTurnedAway { tick, .. }
            | Event::OrderStarted { tick, .. }
            | Event::OrderReady { tick, .. }
            | Event::CustomerServed { tick, .. }
            | Event::CustomerLeft { tick, .. }
            | Event::CustomerFinished { tick, .. }
            | Event::TableCleared { tick, .. }
            | Event::ServiceClosed { tick } => *tick,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::CustomerArrived,
        EventKind::GroupSeated,
        EventKind::GroupTurnedAway,
        EventKind::OrderStarted,
        EventKind::OrderReady,
        EventKind::CustomerServed,
        EventKind::CustomerLeft,
        EventKind::CustomerFinished,
        EventKind::TableCleared,
        EventKind::ServiceClosed,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
    /// Events overwritten before anyone read them.
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.len == self.capacity() {
            self.dropped += 1;
        }
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events lost because the buffer was full when they arrived.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        // Once full, head is also the oldest slot.
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Receives an event and returns commands to run on the next tick.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<Command>>;

enum Subscriber {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Passive(_) => write!(f, "Passive(<fn>)"),
            Subscriber::Reactive(_) => write!(f, "Reactive(<fn>)"),
        }
    }
}

/// Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct SubscriberEntry {
    subscriber: Subscriber,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("subscriber", &self.subscriber)
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("insertion_order", &self.insertion_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, subscriber lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    /// Commands returned by reactive handlers, drained by the service.
    pending_commands: Vec<Command>,
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("pending_commands", &self.pending_commands)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: Default::default(),
            pending_commands: Vec::new(),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppressed kinds are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.on_reactive_filtered(kind, SubscriberPriority::Normal, None, handler);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.subscribe(kind, priority, filter, Subscriber::Passive(listener));
    }

    pub fn on_reactive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        handler: ReactiveHandler,
    ) {
        self.subscribe(kind, priority, filter, Subscriber::Reactive(handler));
    }

    fn subscribe(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        subscriber: Subscriber,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.subscribers[kind.index()].push(SubscriberEntry {
            subscriber,
            priority,
            filter,
            insertion_order: order,
        });
    }

    /// Deliver all buffered events to subscribers, then clear the buffers.
    ///
    /// Subscribers of a kind run in `(priority, insertion_order)` order, each
    /// seeing that kind's events oldest-to-newest. Commands from reactive
    /// handlers accumulate until [`drain_commands`](Self::drain_commands).
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();

            self.subscribers[idx]
                .sort_by_key(|entry| (entry.priority as u8, entry.insertion_order));

            for entry in &mut self.subscribers[idx] {
                for event in &events {
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    match &mut entry.subscriber {
                        Subscriber::Passive(listener) => listener(event),
                        Subscriber::Reactive(handler) => {
                            self.pending_commands.extend(handler(event));
                        }
                    }
                }
            }
        }
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Commands from reactive handlers not yet picked up by a tick.
    pub fn pending_commands(&self) -> &[Command] {
        &self.pending_commands
    }

    pub(crate) fn restore_commands(&mut self, commands: Vec<Command>) {
        self.pending_commands = commands;
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear buffers and pending commands. Subscribers and suppression stay.
    pub fn clear_all(&mut self) {
        for b in self.buffers.iter_mut().flatten() {
            b.clear();
        }
        self.pending_commands.clear();
    }

    /// Suppressed kinds, for carrying settings across a snapshot restore.
    pub fn suppressed_kinds(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|k| self.suppressed[k.index()])
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
