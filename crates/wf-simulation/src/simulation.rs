use tracing::debug;
use wf_core::World;

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::EventLog;
use crate::system::System;

/// The top-level simulation orchestrator.
///
/// Owns the clock, event log, and registered systems. The world is lent in
/// on every call together with the dimension being simulated, so the same
/// simulation can run against a world held by a storage cache.
pub struct Simulation {
    clock: SimClock,
    events: EventLog,
    systems: Vec<Box<dyn System>>,
    initialized: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("systems", &self.systems.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create a new simulation with no systems.
    pub fn new(config: SimConfig) -> Self {
        Self {
            clock: SimClock::new(),
            events: EventLog::new(config.max_events),
            systems: Vec::new(),
            initialized: false,
        }
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Initialize all registered systems.
    pub fn init(&mut self, world: &mut World, dimension: &str) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let mut ctx = SimContext {
                world: &mut *world,
                dimension,
                clock: &self.clock,
                events: &mut self.events,
            };
            let result = system.init(&mut ctx);
            self.systems[i] = system;
            result?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, world: &mut World, dimension: &str) -> SimResult<()> {
        if !self.initialized {
            self.init(world, dimension)?;
        }

        let tick = self.clock.advance();
        debug!(tick, dimension, "tick");

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let mut ctx = SimContext {
                world: &mut *world,
                dimension,
                clock: &self.clock,
                events: &mut self.events,
            };
            let result = system.tick(&mut ctx);
            self.systems[i] = system;
            result?;
        }
        Ok(())
    }

    /// Advance the simulation by `n` ticks.
    pub fn run(&mut self, world: &mut World, dimension: &str, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.tick(world, dimension)?;
        }
        Ok(())
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl System for NoopSystem {
    fn name(&self) -> &str {
        "noop"
    }
    fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use wf_core::{Container, ItemKey, WorldMeta};

    use super::*;
    use crate::error::SimError;
    use crate::event::SimEventKind;
    use crate::travel::TravelSystem;

    fn small_world() -> World {
        let mut world = World::new(WorldMeta::new("Test"));
        world.add_place("d", "A", BTreeMap::new()).unwrap();
        world.add_place("d", "B", BTreeMap::new()).unwrap();
        world.add_portal("d", "ab", "A", "B", 1.0).unwrap();
        world
            .add_thing("d", "Kael", Container::Place("A".into()))
            .unwrap();
        world
    }

    #[test]
    fn custom_system_registration() {
        #[derive(Debug)]
        struct CustomSystem {
            ticked: bool,
        }
        impl System for CustomSystem {
            fn name(&self) -> &str {
                "custom"
            }
            fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
                self.ticked = true;
                Ok(())
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let mut world = World::new(WorldMeta::new("Test"));
        let mut sim = Simulation::new(SimConfig::default());
        sim.add_system(CustomSystem { ticked: false });

        sim.tick(&mut world, "d").unwrap();

        let custom = sim.get_system::<CustomSystem>().unwrap();
        assert!(custom.ticked);
    }

    #[test]
    fn systems_see_the_dimension_and_can_emit() {
        /// Reports every thing of the simulated dimension as standing still.
        #[derive(Debug)]
        struct Census;
        impl System for Census {
            fn name(&self) -> &str {
                "census"
            }
            fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
                let things: Vec<ItemKey> = ctx
                    .world
                    .dimension(ctx.dimension)
                    .map(|d| d.things().map(|t| t.key().clone()).collect())
                    .unwrap_or_default();
                for thing in things {
                    let description = format!("{} stands still", thing.name);
                    ctx.emit(
                        SimEventKind::Halted {
                            thing,
                            portal: None,
                        },
                        description,
                    );
                }
                Ok(())
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let mut world = small_world();
        let mut sim = Simulation::new(SimConfig::default());
        sim.add_system(Census);
        sim.run(&mut world, "d", 3).unwrap();

        assert_eq!(sim.current_tick(), 3);
        assert_eq!(sim.events().len(), 3);
        assert_eq!(
            sim.events()
                .events_for_item(&ItemKey::new("d", "Kael"))
                .len(),
            3
        );
    }

    #[test]
    fn failing_system_stays_registered() {
        #[derive(Debug)]
        struct Grumpy;
        impl System for Grumpy {
            fn name(&self) -> &str {
                "grumpy"
            }
            fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
                Err(SimError::SystemError("no".into()))
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let mut world = small_world();
        let mut sim = Simulation::new(SimConfig::default());
        sim.add_system(Grumpy);
        assert!(sim.tick(&mut world, "d").is_err());
        assert!(sim.get_system::<Grumpy>().is_some());
    }

    #[test]
    fn event_log_respects_max_events() {
        let mut world = small_world();
        let mut sim = Simulation::new(SimConfig::default().with_max_events(1));
        sim.add_system(TravelSystem::new(0.5));
        sim.get_system_mut::<TravelSystem>()
            .unwrap()
            .send_to(&world, &ItemKey::new("d", "Kael"), &ItemKey::new("d", "B"))
            .unwrap();
        sim.run(&mut world, "d", 2).unwrap();

        assert_eq!(sim.events().len(), 1);
        assert!(matches!(
            sim.events().events()[0].kind,
            SimEventKind::Arrived { .. }
        ));
    }

    #[test]
    fn empty_world_no_crash() {
        let mut world = World::new(WorldMeta::new("Empty"));
        let mut sim = Simulation::new(SimConfig::default());
        sim.add_system(TravelSystem::default());
        sim.run(&mut world, "nowhere", 100).unwrap();
        assert_eq!(sim.current_tick(), 100);
        assert!(sim.events().is_empty());
    }
}
