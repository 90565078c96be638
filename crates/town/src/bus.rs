//! Host message bus. Handlers are wired and unwired per event kind; events
//! published while nobody listens are dropped.

use std::collections::{HashSet, VecDeque};

use villagers::{MessageArg, NpcRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NpcEnabled,
    HourTick,
    Transition,
    ModMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The population simulator is about to show an NPC.
    NpcEnabled(NpcRecord),
    /// The world clock crossed an hour boundary.
    HourTick,
    /// The player entered a location.
    Transition,
    /// Another mod sent a request.
    ModMessage { name: String, data: MessageArg },
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::NpcEnabled(_) => EventKind::NpcEnabled,
            HostEvent::HourTick => EventKind::HourTick,
            HostEvent::Transition => EventKind::Transition,
            HostEvent::ModMessage { .. } => EventKind::ModMessage,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribed: HashSet<EventKind>,
    queue: VecDeque<HostEvent>,
    dropped: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind) {
        if self.subscribed.insert(kind) {
            log::debug!("Subscribed to {:?}", kind);
        }
    }

    pub fn unsubscribe(&mut self, kind: EventKind) {
        if self.subscribed.remove(&kind) {
            log::debug!("Unsubscribed from {:?}", kind);
        }
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.subscribed.contains(&kind)
    }

    pub fn publish(&mut self, event: HostEvent) {
        if self.is_subscribed(event.kind()) {
            self.queue.push_back(event);
        } else {
            self.dropped += 1;
        }
    }

    pub fn pop(&mut self) -> Option<HostEvent> {
        self.queue.pop_front()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
