//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Time is passed in explicitly (milliseconds), never read from a clock
//! - Seeded RNG only
//! - Stable iteration order (player slot, then item id)
//! - No rendering, network or platform dependencies

pub mod entity;
pub mod state;
pub mod tick;
pub mod timer;
pub mod world;

pub use entity::{Basket, Bounds, Entity, EntityKind, GripOutcome, Gripper, Item, Player};
pub use state::{Game, GamePhase, MatchClock, RoundTimings, Transition};
pub use tick::{StepReport, step};
pub use timer::{TimerId, TimerManager};
pub use world::SimulationWorld;
