//! Gameplay collision classification
//!
//! Physics reports which bodies touched. `classify` decides what that means
//! for the game by looking at the two entities involved and nothing else.

use glam::Vec2;

use super::effects::Effect;
use super::entity::{Entity, EntityId, EntityKind};
use super::grid::Grid;
use super::physics::RawContact;
use super::state::Registry;

/// A physics contact translated to entity identities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub a: EntityId,
    /// `None` for static world geometry (arena bounds)
    pub b: Option<EntityId>,
    pub point: Vec2,
    pub normal: Vec2,
}

impl ContactEvent {
    /// Map body handles to entities. Contacts involving unregistered bodies
    /// are stale and dropped.
    pub fn from_raw(raw: &RawContact, registry: &Registry) -> Option<Self> {
        let a = registry.by_body(raw.a)?;
        let b = match raw.b {
            Some(body) => Some(registry.by_body(body)?),
            None => None,
        };
        Some(Self {
            a,
            b,
            point: raw.point,
            normal: raw.normal,
        })
    }
}

/// Decide the gameplay effect of a contact, if any.
///
/// Pure: the result depends only on the two entities' current state, so
/// classifying the same contact twice yields the same effect.
pub fn classify(contact: &ContactEvent, registry: &Registry, grid: &Grid) -> Option<Effect> {
    let a = registry.get(contact.a).filter(|e| e.is_alive())?;
    let Some(b_id) = contact.b else {
        return (a.kind == EntityKind::Projectile).then_some(Effect::Remove { target: a.id });
    };
    let b = registry.get(b_id).filter(|e| e.is_alive())?;
    classify_pair(a, b, grid).or_else(|| classify_pair(b, a, grid))
}

/// Rules with `x` as the acting side
fn classify_pair(x: &Entity, y: &Entity, grid: &Grid) -> Option<Effect> {
    match (x.kind, y.kind) {
        (EntityKind::Projectile, target) if target.is_actor() => {
            (x.owner != Some(y.id)).then_some(Effect::Damage {
                target: y.id,
                amount: x.damage,
                source: Some(x.id),
            })
        }
        (EntityKind::Projectile, EntityKind::Obstacle { .. }) => {
            Some(Effect::Remove { target: x.id })
        }
        (EntityKind::Projectile, EntityKind::Bomb) if !y.exploded => Some(Effect::TriggerChain {
            hazard: y.id,
            origin: grid.world_to_cell(y.transform.pos),
            radius: y.range,
        }),
        (EntityKind::Enemy(_), EntityKind::Player) if x.attack_cooldown <= 0.0 && x.damage > 0 => {
            Some(Effect::Damage {
                target: y.id,
                amount: x.damage,
                source: Some(x.id),
            })
        }
        (EntityKind::Player, EntityKind::Pickup(kind)) => Some(Effect::Pickup {
            target: x.id,
            pickup: y.id,
            kind,
        }),
        _ => None,
    }
}
