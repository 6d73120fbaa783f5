use std::collections::BTreeMap;

use tracing::{debug, info, trace};
use wf_core::{ItemKey, PlaceRef, PortalRef, ThingRef, World, WorldError, WorldResult};

/// Whether a thing is following a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyState {
    /// No route.
    Idle,
    /// A route is assigned and being followed.
    Traveling,
}

/// Where the journey engine last saw a thing.
#[derive(Debug, Clone, PartialEq)]
pub enum Whereabouts {
    /// Resting at a place.
    At(PlaceRef),
    /// Somewhere inside a portal, `progress` of the way through.
    InTransit {
        /// The portal being traversed.
        portal: PortalRef,
        /// Fraction of the portal already covered, in `[0, 1)`.
        progress: f64,
    },
    /// The engine has never tracked this thing.
    Unplaced,
}

/// One portal of a route, with its endpoints resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The portal.
    pub portal: PortalRef,
    /// Where the portal starts.
    pub origin: PlaceRef,
    /// Where the portal leads.
    pub destination: PlaceRef,
}

/// Position along a route after an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Index of the current step.
    pub step: usize,
    /// Fraction of the current step covered.
    pub progress: f64,
    /// State after the update.
    pub state: JourneyState,
}

#[derive(Debug, Clone)]
struct Journey {
    steps: Vec<Step>,
    index: usize,
    progress: f64,
}

impl Journey {
    fn current(&self) -> &Step {
        &self.steps[self.index]
    }

    fn snapshot(&self, state: JourneyState) -> Progress {
        Progress {
            step: self.index,
            progress: self.progress,
            state,
        }
    }
}

#[derive(Debug, Clone)]
enum Tracked {
    Traveling(Journey),
    Resting(Whereabouts),
}

/// Per-thing motion along routes of portals.
///
/// Progress is a fraction of the current step. One [`advance`](Self::advance)
/// may cross several steps in either direction. Journey state is held only in
/// memory; nothing here touches the world or storage.
#[derive(Debug, Clone, Default)]
pub struct JourneyEngine {
    tracked: BTreeMap<ThingRef, Tracked>,
}

impl JourneyEngine {
    /// An engine tracking nobody.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `thing` on `route` from the beginning of its first step.
    ///
    /// Every portal must exist and lead into the next one. On failure any
    /// previous route is left as it was. An empty route leaves the thing idle.
    pub fn assign_route(
        &mut self,
        world: &World,
        thing: &ThingRef,
        route: &[PortalRef],
    ) -> WorldResult<()> {
        if world.thing(thing).is_none() {
            return Err(WorldError::NotFound(thing.clone()));
        }

        let mut portals = Vec::with_capacity(route.len());
        for key in route {
            portals.push(
                world
                    .portal(key)
                    .ok_or_else(|| WorldError::NotFound(key.clone()))?,
            );
        }
        for (index, pair) in portals.windows(2).enumerate() {
            if !pair[0].leads_into(pair[1]) {
                return Err(WorldError::DisconnectedRoute {
                    index,
                    from: pair[0].key().clone(),
                    to: pair[1].key().clone(),
                });
            }
        }

        if portals.is_empty() {
            self.halt(thing);
            return Ok(());
        }
        let steps: Vec<Step> = portals
            .iter()
            .map(|p| Step {
                portal: p.key().clone(),
                origin: p.origin_key(),
                destination: p.destination_key(),
            })
            .collect();
        debug!(thing = %thing, steps = steps.len(), "assigned route");
        self.tracked.insert(
            thing.clone(),
            Tracked::Traveling(Journey {
                steps,
                index: 0,
                progress: 0.0,
            }),
        );
        Ok(())
    }

    /// Move `thing` by `delta` steps (negative moves backwards).
    ///
    /// Running past the end completes the route: the thing rests at the last
    /// destination. Running before the start stops it at the first origin.
    /// Returns `None` for a thing that is not traveling.
    pub fn advance(&mut self, thing: &ThingRef, delta: f64) -> Option<Progress> {
        let Some(Tracked::Traveling(journey)) = self.tracked.get_mut(thing) else {
            return None;
        };
        if !delta.is_finite() {
            return Some(journey.snapshot(JourneyState::Traveling));
        }

        let last = journey.steps.len() - 1;
        journey.progress += delta;
        let rest = loop {
            if journey.progress >= 1.0 {
                journey.progress -= 1.0;
                if journey.index == last {
                    break Some(journey.steps[last].destination.clone());
                }
                journey.index += 1;
            } else if journey.progress < 0.0 {
                if journey.index == 0 {
                    break Some(journey.steps[0].origin.clone());
                }
                journey.progress += 1.0;
                journey.index -= 1;
            } else {
                break None;
            }
        };
        trace!(thing = %thing, step = journey.index, progress = journey.progress, "advanced");

        match rest {
            None => Some(journey.snapshot(JourneyState::Traveling)),
            Some(place) => {
                let progress = Progress {
                    step: journey.index,
                    progress: 0.0,
                    state: JourneyState::Idle,
                };
                info!(thing = %thing, at = %place, "journey ended");
                self.tracked
                    .insert(thing.clone(), Tracked::Resting(Whereabouts::At(place)));
                Some(progress)
            }
        }
    }

    /// Drop every queued step after the current one.
    pub fn cancel(&mut self, thing: &ThingRef) {
        if let Some(Tracked::Traveling(journey)) = self.tracked.get_mut(thing) {
            let current = journey.current().clone();
            journey.steps = vec![current];
            journey.index = 0;
            debug!(thing = %thing, "route cancelled after current step");
        }
    }

    /// Clear the route. A thing caught inside a portal stays there.
    pub fn halt(&mut self, thing: &ThingRef) {
        if let Some(Tracked::Traveling(journey)) = self.tracked.get(thing) {
            let step = journey.current();
            let whereabouts = if journey.progress == 0.0 {
                Whereabouts::At(step.origin.clone())
            } else {
                Whereabouts::InTransit {
                    portal: step.portal.clone(),
                    progress: journey.progress,
                }
            };
            debug!(thing = %thing, "halted");
            self.tracked
                .insert(thing.clone(), Tracked::Resting(whereabouts));
        }
    }

    /// Stop tracking a thing entirely.
    pub fn forget(&mut self, thing: &ThingRef) {
        self.tracked.remove(thing);
    }

    /// Idle or traveling.
    pub fn state(&self, thing: &ThingRef) -> JourneyState {
        match self.tracked.get(thing) {
            Some(Tracked::Traveling(_)) => JourneyState::Traveling,
            _ => JourneyState::Idle,
        }
    }

    /// Current step index and progress of a traveling thing.
    pub fn progress(&self, thing: &ThingRef) -> Option<Progress> {
        match self.tracked.get(thing) {
            Some(Tracked::Traveling(journey)) => Some(journey.snapshot(JourneyState::Traveling)),
            _ => None,
        }
    }

    /// Remaining and completed steps of a traveling thing.
    pub fn route(&self, thing: &ThingRef) -> Option<&[Step]> {
        match self.tracked.get(thing) {
            Some(Tracked::Traveling(journey)) => Some(&journey.steps),
            _ => None,
        }
    }

    /// Where the thing is as far as journeys are concerned.
    pub fn whereabouts(&self, thing: &ThingRef) -> Whereabouts {
        match self.tracked.get(thing) {
            Some(Tracked::Traveling(journey)) => Whereabouts::InTransit {
                portal: journey.current().portal.clone(),
                progress: journey.progress,
            },
            Some(Tracked::Resting(whereabouts)) => whereabouts.clone(),
            None => Whereabouts::Unplaced,
        }
    }

    /// Every thing currently traveling.
    pub fn travelers(&self) -> impl Iterator<Item = &ThingRef> {
        self.tracked.iter().filter_map(|(key, tracked)| match tracked {
            Tracked::Traveling(_) => Some(key),
            Tracked::Resting(_) => None,
        })
    }

    /// Drawing position of a thing, interpolated between the spots of the
    /// current portal's endpoints. `None` when the spots are unknown.
    pub fn display_position(&self, world: &World, thing: &ThingRef) -> Option<(f64, f64)> {
        let spot_of = |key: &ItemKey| world.place(key).and_then(|p| p.spot());
        match self.whereabouts(thing) {
            Whereabouts::At(place) => spot_of(&place).map(|s| (s.x, s.y)),
            Whereabouts::InTransit { portal, progress } => {
                let portal = world.portal(&portal)?;
                let from = spot_of(&portal.origin_key())?;
                let to = spot_of(&portal.destination_key())?;
                Some(from.lerp(to, progress))
            }
            Whereabouts::Unplaced => {
                // Fall back to the thing's place in the world graph.
                let place = world.thing(thing)?.location().key_in(&thing.dimension);
                spot_of(&place).map(|s| (s.x, s.y))
            }
        }
    }
}
