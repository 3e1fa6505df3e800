//! Arcade Sim - fixed-step simulation core for a grid-arena arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, blasts, spawning, phases)
//! - `renderer`: Render collaborator interface and an in-memory scene
//! - `platform`: Input collaborator interface
//! - `audio`: Audio collaborator interface
//! - `tuning`: Data-driven game balance and level layout

pub mod audio;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod sim;
pub mod tuning;

pub use error::{CollaboratorError, ConfigError};
pub use tuning::Tuning;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for stable contacts)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest wall-clock frame delta accepted before clamping
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Slack used when comparing accumulated float timers against schedules
    pub const TIME_EPSILON: f32 = 1e-4;
    /// Extra distance at which touching bodies still report a contact
    pub const CONTACT_SLOP: f32 = 0.5;
}

/// Heading angle (radians) of a direction vector
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}
