//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - Collaborators (physics, render, audio) are borrowed per call, never owned

pub mod chain;
pub mod collision;
pub mod effects;
pub mod entity;
pub mod grid;
pub mod phase;
pub mod physics;
pub mod spawner;
pub mod state;
pub mod sync;
pub mod tick;

pub use chain::{Blast, Detonation, detonate, detonate_at};
pub use collision::{ContactEvent, classify};
pub use effects::{Effect, resolve};
pub use entity::{EnemyKind, Entity, EntityId, EntityKind, PickupKind};
pub use grid::{Grid, LevelLayout, Tile};
pub use phase::{GamePhase, PhaseEvent, Transition};
pub use physics::{BodyDesc, BodyHandle, KinematicWorld, PhysicsWorld, Transform};
pub use spawner::{PositionRule, Repeat, SpawnEvent, SpawnKind, Spawner};
pub use state::{Collaborators, Registry, SimContext};
pub use sync::sync_render;
pub use tick::{FrameDriver, FrameReport, StepReport, tick};
