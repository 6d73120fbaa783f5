use wf_core::{ItemKey, PlaceRef, PortalRef, ThingRef};

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEventKind {
    /// A thing entered a portal.
    Departed {
        /// The thing that departed.
        thing: ThingRef,
        /// The place it left.
        from: PlaceRef,
        /// The portal it entered.
        portal: PortalRef,
    },
    /// A thing came out of a portal at its destination.
    Arrived {
        /// The thing that arrived.
        thing: ThingRef,
        /// The place it arrived at.
        at: PlaceRef,
    },
    /// A thing stopped travelling, possibly inside a portal.
    Halted {
        /// The thing that stopped.
        thing: ThingRef,
        /// The portal it was in, if any.
        portal: Option<PortalRef>,
    },
}

impl SimEventKind {
    /// Check whether a given item is involved in this event.
    pub fn involves(&self, key: &ItemKey) -> bool {
        match self {
            Self::Departed {
                thing,
                from,
                portal,
            } => thing == key || from == key || portal == key,
            Self::Arrived { thing, at } => thing == key || at == key,
            Self::Halted { thing, portal } => thing == key || portal.as_ref() == Some(key),
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// The simulation tick when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// Create a new simulation event with the given tick, kind, and description.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given item.
    pub fn events_for_item(&self, key: &ItemKey) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(key)).collect()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ItemKey {
        ItemKey::new("d", name)
    }

    fn arrived(tick: u64, thing: &str, at: &str) -> SimEvent {
        SimEvent::new(
            tick,
            SimEventKind::Arrived {
                thing: key(thing),
                at: key(at),
            },
            "test",
        )
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        log.push(arrived(1, "Hero", "Inn"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for_item(&key("Hero")).len(), 1);
        assert_eq!(log.events_for_item(&key("Inn")).len(), 1);
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        for i in 0..5 {
            log.push(arrived(i, "Hero", "Inn"));
        }
        assert_eq!(log.len(), 2);
        // Oldest events were dropped, newest remain
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn event_kind_involves_item() {
        let kind = SimEventKind::Departed {
            thing: key("Hero"),
            from: key("Inn"),
            portal: key("door"),
        };
        assert!(kind.involves(&key("Hero")));
        assert!(kind.involves(&key("Inn")));
        assert!(kind.involves(&key("door")));
        assert!(!kind.involves(&key("Road")));

        let kind = SimEventKind::Halted {
            thing: key("Hero"),
            portal: None,
        };
        assert!(kind.involves(&key("Hero")));
        assert!(!kind.involves(&key("door")));
    }

    #[test]
    fn same_name_in_another_dimension_is_not_involved() {
        let kind = SimEventKind::Arrived {
            thing: key("Hero"),
            at: key("Inn"),
        };
        assert!(!kind.involves(&ItemKey::new("dream", "Hero")));
    }

    #[test]
    fn event_log_clear() {
        let mut log = EventLog::new(0);
        log.push(arrived(1, "Hero", "Inn"));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn event_log_multi_tick_filtering() {
        let mut log = EventLog::new(0);
        log.push(arrived(1, "Hero", "Inn"));
        log.push(arrived(1, "Squire", "Road"));
        log.push(arrived(2, "Hero", "Road"));

        assert_eq!(log.events_at_tick(1).len(), 2);
        assert_eq!(log.events_at_tick(3).len(), 0);
        assert_eq!(log.events_for_item(&key("Hero")).len(), 2);
        assert_eq!(log.events_for_item(&key("Road")).len(), 2);
    }
}
