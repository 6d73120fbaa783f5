use wf_core::World;

use crate::clock::SimClock;
use crate::event::{EventLog, SimEvent, SimEventKind};

/// Mutable context passed to each system during a tick.
///
/// `dimension` names the part of the world being simulated; systems leave
/// items of other dimensions alone.
pub struct SimContext<'a> {
    pub world: &'a mut World,
    pub dimension: &'a str,
    pub clock: &'a SimClock,
    pub events: &'a mut EventLog,
}

impl SimContext<'_> {
    /// Emit a simulation event at the current tick.
    pub fn emit(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events
            .push(SimEvent::new(self.clock.tick(), kind, description));
    }

    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }
}
