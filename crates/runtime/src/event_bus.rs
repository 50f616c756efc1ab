use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OverlayAdded,
    BoundsExtended,
    ViewFitted,
    ControlRebuilt,
    BaseLayerChanged,
    OverlayToggled,
    LoadFailed,
    Rejected,
}

impl EventKind {
    pub fn is_error(&self) -> bool {
        matches!(self, EventKind::LoadFailed)
    }
}

/// One entry of the session's diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub seq: u64,
    pub kind: EventKind,
    pub message: String,
}

/// Ordered record of everything that changed the session.
///
/// Front-ends drain it after each mutation to forward entries to their log
/// sink; tests read it to check what happened.
#[derive(Debug, Default)]
pub struct EventBus {
    next_seq: u64,
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: EventKind, message: impl Into<String>) {
        self.events.push(Event {
            seq: self.next_seq,
            kind,
            message: message.into(),
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, EventKind};

    #[test]
    fn records_events_in_order() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::OverlayAdded, "Points");
        bus.emit(EventKind::LoadFailed, "Polygons error: 404");
        assert_eq!(bus.events().len(), 2);
        assert_eq!(bus.events()[1].seq, 1);
        assert_eq!(bus.count(EventKind::LoadFailed), 1);
        assert!(bus.events()[1].kind.is_error());
    }

    #[test]
    fn drain_clears_events_but_keeps_sequence() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::ControlRebuilt, "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.events().is_empty());

        bus.emit(EventKind::ControlRebuilt, "m");
        assert_eq!(bus.events()[0].seq, 1);
    }
}
