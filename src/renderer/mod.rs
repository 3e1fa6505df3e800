//! Render collaborator
//!
//! The simulation creates one handle per entity, pushes transforms once per
//! frame and destroys the handle together with the entity's body. It never
//! reads anything back from the scene.

pub mod recording;

pub use recording::RecordingScene;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// Opaque scene object reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderHandle(pub u32);

/// Visual archetype requested for a new handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderKind {
    Player,
    Chaser,
    Turret,
    Projectile,
    Bomb,
    Pickup,
    Wall,
    Crate,
}

/// Render collaborator interface
pub trait RenderScene {
    fn create_handle(&mut self, kind: RenderKind) -> Result<RenderHandle, CollaboratorError>;
    fn destroy_handle(&mut self, handle: RenderHandle);
    fn set_transform(&mut self, handle: RenderHandle, pos: Vec2, rotation: f32);
}
