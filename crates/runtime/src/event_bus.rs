use std::collections::VecDeque;

/// Events older than this are dropped.
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A layer generation was attached.
    Layers,
    /// Single/compare switch.
    Mode,
    Camera,
    Frame,
    /// Address bar rewritten.
    Url,
    Playback,
}

/// Trace record of one session step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Monotonic across the bus lifetime, including dropped events.
    pub seq: u64,
    pub kind: EventKind,
    pub message: String,
}

/// Bounded, ordered trace of what a session did.
///
/// Useful for asserting ordering (layers rebuilt before the URL is written)
/// and for tooling that wants to replay what happened.
#[derive(Debug)]
pub struct EventBus {
    next_seq: u64,
    capacity: usize,
    events: VecDeque<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    pub fn emit(&mut self, kind: EventKind, message: impl Into<String>) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(Event {
            seq: self.next_seq,
            kind,
            message: message.into(),
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn last(&self, kind: EventKind) -> Option<&Event> {
        self.events.iter().rev().find(|e| e.kind == kind)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, EventKind};

    #[test]
    fn records_events_in_order() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::Layers, "single A");
        bus.emit(EventKind::Url, "compare=0");
        let kinds: Vec<_> = bus.events().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Layers, EventKind::Url]);
        assert_eq!(bus.last(EventKind::Url).map(|e| e.seq), Some(1));
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::Frame, "2024-01-01");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(bus.events().count(), 0);
    }

    #[test]
    fn capacity_drops_oldest_but_keeps_numbering() {
        let mut bus = EventBus::with_capacity(2);
        bus.emit(EventKind::Camera, "a");
        bus.emit(EventKind::Camera, "b");
        bus.emit(EventKind::Camera, "c");
        let msgs: Vec<_> = bus.events().map(|e| (e.seq, e.message.as_str())).collect();
        assert_eq!(msgs, vec![(1, "b"), (2, "c")]);
        assert_eq!(bus.count(EventKind::Camera), 2);
    }
}
