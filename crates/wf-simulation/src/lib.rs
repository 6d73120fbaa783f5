//! Tick-based travel for Wayfarer worlds.
//!
//! Provides route suggestion over a dimension's portals ([`PathBuilder`]),
//! per-thing journey state ([`JourneyEngine`]), and a system-based
//! [`Simulation`] that moves travellers through a borrowed
//! [`wf_core::World`]. Journey state lives here and is never persisted; the
//! world only sees the resulting `move_thing` calls.

/// Simulation clock for tracking ticks.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Mutable context passed to systems each tick.
pub mod context;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Journey state machine: routes, progress, whereabouts.
pub mod journey;
/// Spanning trees and fewest-step routes.
pub mod pathing;
/// Top-level simulation orchestrator.
pub mod simulation;
/// The trait that all simulation systems implement.
pub mod system;
/// Travel system: advances journeys and relocates travellers.
pub mod travel;

/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-export of [`context::SimContext`].
pub use context::SimContext;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the journey types.
pub use journey::{JourneyEngine, JourneyState, Progress, Step, Whereabouts};
/// Re-exports of [`pathing::PathBuilder`] and [`pathing::SpanningTree`].
pub use pathing::{PathBuilder, SpanningTree};
/// Re-export of [`simulation::Simulation`].
pub use simulation::Simulation;
/// Re-export of [`system::System`].
pub use system::System;
/// Re-export of [`travel::TravelSystem`].
pub use travel::TravelSystem;
