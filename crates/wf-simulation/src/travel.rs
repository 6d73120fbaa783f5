use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};
use wf_core::{Container, PlaceRef, PortalRef, ThingRef, World, WorldError};

use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::journey::{JourneyEngine, JourneyState, Step, Whereabouts};
use crate::pathing::PathBuilder;
use crate::system::System;

/// Moves things along their routes, one speed's worth per tick.
///
/// The journey engine only tracks progress. This system turns crossed steps
/// into `move_thing` calls on the world and reports them as events.
#[derive(Debug)]
pub struct TravelSystem {
    engine: JourneyEngine,
    speeds: HashMap<ThingRef, f64>,
    default_speed: f64,
    departing: BTreeSet<ThingRef>,
    halted: Vec<(ThingRef, Option<PortalRef>)>,
}

impl Default for TravelSystem {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

impl TravelSystem {
    /// A travel system moving everyone `default_speed` route steps per tick.
    pub fn new(default_speed: f64) -> Self {
        Self {
            engine: JourneyEngine::new(),
            speeds: HashMap::new(),
            default_speed: clamp_speed(default_speed),
            departing: BTreeSet::new(),
            halted: Vec::new(),
        }
    }

    /// A travel system using the configured default speed.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.default_speed)
    }

    /// The underlying journey state.
    pub fn engine(&self) -> &JourneyEngine {
        &self.engine
    }

    /// Set a per-thing speed in route steps per tick.
    ///
    /// Travel only runs forwards; negative or non-finite speeds count as zero.
    pub fn set_speed(&mut self, thing: &ThingRef, speed: f64) {
        self.speeds.insert(thing.clone(), clamp_speed(speed));
    }

    /// Speed used for `thing`.
    pub fn speed(&self, thing: &ThingRef) -> f64 {
        self.speeds
            .get(thing)
            .copied()
            .unwrap_or(self.default_speed)
    }

    /// Send `thing` along an explicit route of portals.
    pub fn send(
        &mut self,
        world: &World,
        thing: &ThingRef,
        route: &[PortalRef],
    ) -> SimResult<()> {
        self.engine.assign_route(world, thing, route)?;
        if route.is_empty() {
            self.departing.remove(thing);
        } else {
            self.departing.insert(thing.clone());
        }
        Ok(())
    }

    /// Send `thing` to `destination` along the fewest-step route it may take.
    ///
    /// The thing must stand directly in a place. Returns the number of steps;
    /// zero when it is already there.
    pub fn send_to(
        &mut self,
        world: &World,
        thing: &ThingRef,
        destination: &PlaceRef,
    ) -> SimResult<usize> {
        let traveler = world
            .thing(thing)
            .ok_or_else(|| WorldError::NotFound(thing.clone()))?;
        let Container::Place(start) = traveler.location() else {
            return Err(SimError::NotInPlace(thing.clone()));
        };

        let route = PathBuilder::find_route(
            world,
            &thing.sibling(start.as_str()),
            destination,
            Some(traveler),
        )?;
        self.send(world, thing, &route)?;
        Ok(route.len())
    }

    /// Stop `thing` where it is, possibly inside a portal.
    pub fn halt(&mut self, thing: &ThingRef) {
        if self.engine.state(thing) != JourneyState::Traveling {
            return;
        }
        self.engine.halt(thing);
        self.departing.remove(thing);
        let portal = match self.engine.whereabouts(thing) {
            Whereabouts::InTransit { portal, .. } => Some(portal),
            _ => None,
        };
        self.halted.push((thing.clone(), portal));
    }

    /// Finish the current step, then stop.
    pub fn cancel(&mut self, thing: &ThingRef) {
        self.engine.cancel(thing);
    }

    fn depart(ctx: &mut SimContext<'_>, thing: &ThingRef, step: &Step) {
        ctx.emit(
            SimEventKind::Departed {
                thing: thing.clone(),
                from: step.origin.clone(),
                portal: step.portal.clone(),
            },
            format!(
                "{} departed {} through {}",
                thing.name, step.origin.name, step.portal.name
            ),
        );
    }

    fn arrive(ctx: &mut SimContext<'_>, thing: &ThingRef, step: &Step) -> SimResult<()> {
        ctx.world
            .move_thing(thing, Container::Place(step.destination.name.clone()))?;
        debug!(thing = %thing, at = %step.destination, "arrived");
        ctx.emit(
            SimEventKind::Arrived {
                thing: thing.clone(),
                at: step.destination.clone(),
            },
            format!("{} arrived at {}", thing.name, step.destination.name),
        );
        Ok(())
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() { speed.max(0.0) } else { 0.0 }
}

impl System for TravelSystem {
    fn name(&self) -> &str {
        "travel"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (halted, elsewhere): (Vec<_>, Vec<_>) = std::mem::take(&mut self.halted)
            .into_iter()
            .partition(|(thing, _)| thing.dimension == ctx.dimension);
        self.halted = elsewhere;
        for (thing, portal) in halted {
            let description = match &portal {
                Some(p) => format!("{} halted inside {}", thing.name, p.name),
                None => format!("{} halted", thing.name),
            };
            ctx.emit(SimEventKind::Halted { thing, portal }, description);
        }

        let travelers: Vec<ThingRef> = self
            .engine
            .travelers()
            .filter(|t| t.dimension == ctx.dimension)
            .cloned()
            .collect();

        for thing in travelers {
            if ctx.world.thing(&thing).is_none() {
                warn!(thing = %thing, "traveller left the world, dropping its journey");
                self.engine.forget(&thing);
                self.departing.remove(&thing);
                continue;
            }
            let (Some(steps), Some(before)) = (
                self.engine.route(&thing).map(<[Step]>::to_vec),
                self.engine.progress(&thing),
            ) else {
                continue;
            };

            if self.departing.remove(&thing) {
                Self::depart(ctx, &thing, &steps[before.step]);
            }

            let speed = self.speed(&thing);
            let Some(after) = self.engine.advance(&thing, speed) else {
                continue;
            };
            let crossed = match after.state {
                JourneyState::Traveling => before.step..after.step,
                JourneyState::Idle => before.step..steps.len(),
            };
            for index in crossed {
                let step = &steps[index];
                if let Err(e) = Self::arrive(ctx, &thing, step) {
                    warn!(
                        thing = %thing,
                        at = %step.destination,
                        error = %e,
                        "arrival failed, dropping the journey"
                    );
                    self.engine.forget(&thing);
                    ctx.emit(
                        SimEventKind::Halted {
                            thing: thing.clone(),
                            portal: Some(step.portal.clone()),
                        },
                        format!("{} halted, {} is gone", thing.name, step.destination.name),
                    );
                    break;
                }
                if let Some(next) = steps.get(index + 1) {
                    Self::depart(ctx, &thing, next);
                }
            }
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
