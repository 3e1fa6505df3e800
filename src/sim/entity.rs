//! Simulated game objects
//!
//! An entity holds non-owning handles into the physics world and the render
//! scene. Both handles are created and destroyed together by `SimContext`.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyDesc, BodyHandle, Shape, Transform};
use crate::platform::FrameInput;
use crate::renderer::{RenderHandle, RenderKind};
use crate::tuning::{EnemyStats, Tuning};

/// Opaque entity identity, unique within a `SimContext`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Walks straight at the player
    Chaser,
    /// Stands still and shoots at the player
    Turret,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    ExtraBomb,
    BlastUp,
    SpeedUp,
    Heal,
    Shield,
}

impl PickupKind {
    pub const ALL: [PickupKind; 5] = [
        PickupKind::ExtraBomb,
        PickupKind::BlastUp,
        PickupKind::SpeedUp,
        PickupKind::Heal,
        PickupKind::Shield,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy(EnemyKind),
    Projectile,
    /// Area-effect hazard waiting on its fuse
    Bomb,
    Pickup(PickupKind),
    Obstacle { destructible: bool },
}

impl EntityKind {
    /// Player or enemy: things that have health and can be hit
    pub fn is_actor(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Enemy(_))
    }

    pub fn render_kind(self) -> RenderKind {
        match self {
            EntityKind::Player => RenderKind::Player,
            EntityKind::Enemy(EnemyKind::Chaser) => RenderKind::Chaser,
            EntityKind::Enemy(EnemyKind::Turret) => RenderKind::Turret,
            EntityKind::Projectile => RenderKind::Projectile,
            EntityKind::Bomb => RenderKind::Bomb,
            EntityKind::Pickup(_) => RenderKind::Pickup,
            EntityKind::Obstacle { destructible: false } => RenderKind::Wall,
            EntityKind::Obstacle { destructible: true } => RenderKind::Crate,
        }
    }
}

/// Player stat block modified by pickups
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Loadout {
    /// World units per second
    pub speed: f32,
    pub bomb_capacity: u32,
    pub blast_range: i32,
}

/// Result of applying damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target already dead or removed
    Ignored,
    /// Target is invincible
    Blocked,
    Hurt,
    /// Health crossed from above zero to zero (reported once)
    Killed,
}

/// Something an entity asks the frame driver to do on its behalf
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    PlaceBomb,
    Fire { direction: Vec2 },
    /// Fuse ran out
    Detonate,
    /// Lifetime ran out
    Expire,
}

/// Output of `Entity::update`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntityUpdate {
    /// Velocity to request from the physics body
    pub velocity: Option<Vec2>,
    pub intent: Option<Intent>,
}

/// Read-only view handed to `Entity::update`
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Elapsed round time
    pub now: f32,
    pub input: &'a FrameInput,
    pub player_pos: Option<Vec2>,
    pub tuning: &'a Tuning,
}

/// A simulated game object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub transform: Transform,
    /// Collision radius (unused by obstacles, which fill their tile)
    pub radius: f32,
    #[serde(skip)]
    pub body: Option<BodyHandle>,
    #[serde(skip)]
    pub render: Option<RenderHandle>,
    pub health: i32,
    pub max_health: i32,
    pub loadout: Loadout,
    /// Seconds until this entity may deal contact damage again
    pub attack_cooldown: f32,
    /// Seconds until the next shot
    pub reload: f32,
    /// Seconds until a bomb detonates
    pub fuse: Option<f32>,
    /// Seconds until the entity expires on its own
    pub ttl: Option<f32>,
    /// Blast range in cells (bombs)
    pub range: i32,
    /// Damage dealt by this entity (bombs, projectiles)
    pub damage: i32,
    /// Entity that created this one (bomb or projectile owner)
    pub owner: Option<EntityId>,
    /// Direction of travel (projectiles)
    pub heading: Vec2,
    /// Round time until which damage is blocked
    pub invincible_until: f32,
    /// Bomb has been claimed by a blast
    pub exploded: bool,
    alive: bool,
    removal_pending: bool,
}

impl Entity {
    /// New entity with stats taken from the tuning for its kind
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, tuning: &Tuning) -> Self {
        let mut entity = Self {
            id,
            kind,
            transform: Transform::at(pos),
            radius: 1.0,
            body: None,
            render: None,
            health: 1,
            max_health: 1,
            loadout: Loadout::default(),
            attack_cooldown: 0.0,
            reload: 0.0,
            fuse: None,
            ttl: None,
            range: 0,
            damage: 0,
            owner: None,
            heading: Vec2::ZERO,
            invincible_until: 0.0,
            exploded: false,
            alive: true,
            removal_pending: false,
        };

        match kind {
            EntityKind::Player => {
                entity.radius = tuning.player.radius;
                entity.health = tuning.player.health;
                entity.loadout = Loadout {
                    speed: tuning.player.speed,
                    bomb_capacity: tuning.player.bomb_capacity,
                    blast_range: tuning.player.blast_range,
                };
            }
            EntityKind::Enemy(enemy) => {
                let stats = enemy_stats(tuning, enemy);
                entity.radius = stats.radius;
                entity.health = stats.health;
                entity.loadout.speed = stats.speed;
                entity.damage = stats.contact_damage;
                entity.reload = stats.fire_interval;
            }
            EntityKind::Bomb => {
                entity.radius = tuning.bomb.radius;
                entity.fuse = Some(tuning.bomb.fuse);
                entity.range = tuning.player.blast_range;
                entity.damage = tuning.bomb.damage;
            }
            EntityKind::Projectile => {
                entity.radius = tuning.enemies.turret.projectile_radius;
            }
            EntityKind::Pickup(_) => {
                entity.radius = tuning.pickups.radius;
            }
            EntityKind::Obstacle { .. } => {}
        }
        entity.max_health = entity.health;
        entity
    }

    /// Physics body matching this entity's kind
    pub fn body_desc(&self, tuning: &Tuning) -> BodyDesc {
        let circle = |radius: f32, mass: f32, sensor: bool| BodyDesc {
            shape: Shape::Circle { radius },
            mass,
            position: self.transform.pos,
            sensor,
        };
        match self.kind {
            EntityKind::Player | EntityKind::Enemy(_) => circle(self.radius, 1.0, false),
            EntityKind::Projectile => circle(self.radius, 0.1, true),
            EntityKind::Bomb | EntityKind::Pickup(_) => circle(self.radius, 0.0, true),
            EntityKind::Obstacle { .. } => BodyDesc {
                shape: Shape::Box {
                    half_extents: glam::Vec2::splat(tuning.arena.tile_size * 0.5),
                },
                mass: 0.0,
                position: self.transform.pos,
                sensor: false,
            },
        }
    }

    /// Alive and not waiting to be pruned
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive && !self.removal_pending
    }

    #[inline]
    pub fn is_pending_removal(&self) -> bool {
        self.removal_pending
    }

    /// Flag for the prune pass; never removes anything itself
    pub fn mark_for_removal(&mut self) {
        self.removal_pending = true;
    }

    pub fn is_invincible(&self, now: f32) -> bool {
        now < self.invincible_until
    }

    /// Subtract health, clamping at zero. `Killed` is returned at most once.
    pub fn apply_damage(&mut self, amount: i32, now: f32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored;
        }
        if self.is_invincible(now) {
            return DamageOutcome::Blocked;
        }
        let before = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        if before > 0 && self.health == 0 {
            self.alive = false;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hurt
        }
    }

    /// Claim a bomb for detonation. Returns false if it already went off.
    pub fn claim_detonation(&mut self) -> bool {
        if self.kind != EntityKind::Bomb || self.exploded || self.removal_pending {
            return false;
        }
        self.exploded = true;
        self.fuse = None;
        true
    }

    /// Apply a pickup to this entity's stat block
    pub fn apply_pickup(&mut self, kind: PickupKind, tuning: &Tuning, now: f32) {
        if !self.is_alive() {
            return;
        }
        let caps = &tuning.pickups;
        match kind {
            PickupKind::ExtraBomb => {
                self.loadout.bomb_capacity = (self.loadout.bomb_capacity + 1).min(caps.max_bomb_capacity);
            }
            PickupKind::BlastUp => {
                self.loadout.blast_range = (self.loadout.blast_range + 1).min(caps.max_blast_range);
            }
            PickupKind::SpeedUp => {
                self.loadout.speed = (self.loadout.speed + caps.speed_bonus).min(caps.max_speed);
            }
            PickupKind::Heal => {
                self.health = (self.health + caps.heal).min(self.max_health);
            }
            PickupKind::Shield => {
                self.invincible_until = self.invincible_until.max(now + caps.shield_duration);
            }
        }
    }

    /// Advance timers and AI. Never touches another entity.
    pub fn update(&mut self, dt: f32, cx: &UpdateContext<'_>) -> EntityUpdate {
        if !self.is_alive() {
            return EntityUpdate::default();
        }
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);

        match self.kind {
            EntityKind::Player => EntityUpdate {
                velocity: Some(cx.input.movement * self.loadout.speed),
                intent: cx.input.fire.then_some(Intent::PlaceBomb),
            },
            EntityKind::Enemy(enemy) => {
                let stats = enemy_stats(cx.tuning, enemy);
                let velocity = match enemy {
                    EnemyKind::Chaser => cx
                        .player_pos
                        .map(|target| (target - self.transform.pos).normalize_or_zero())
                        .unwrap_or(Vec2::ZERO)
                        * self.loadout.speed,
                    EnemyKind::Turret => Vec2::ZERO,
                };
                EntityUpdate {
                    velocity: Some(velocity),
                    intent: self.aim(stats.fire_interval, dt, cx.player_pos),
                }
            }
            EntityKind::Projectile => EntityUpdate {
                velocity: None,
                intent: tick_down(&mut self.ttl, dt).then_some(Intent::Expire),
            },
            EntityKind::Bomb => EntityUpdate {
                velocity: None,
                intent: (!self.exploded && tick_down(&mut self.fuse, dt)).then_some(Intent::Detonate),
            },
            EntityKind::Pickup(_) => EntityUpdate {
                velocity: None,
                intent: tick_down(&mut self.ttl, dt).then_some(Intent::Expire),
            },
            EntityKind::Obstacle { .. } => EntityUpdate::default(),
        }
    }

    /// Reload and fire at the target every `interval` seconds (0 = never)
    fn aim(&mut self, interval: f32, dt: f32, target: Option<Vec2>) -> Option<Intent> {
        if interval <= 0.0 {
            return None;
        }
        self.reload -= dt;
        if self.reload > 0.0 {
            return None;
        }
        self.reload += interval;
        let direction = (target? - self.transform.pos).normalize_or_zero();
        (direction != Vec2::ZERO).then_some(Intent::Fire { direction })
    }
}

/// Count a timer down; true once it reaches zero
fn tick_down(timer: &mut Option<f32>, dt: f32) -> bool {
    match timer {
        Some(t) => {
            *t -= dt;
            *t <= 0.0
        }
        None => false,
    }
}

pub fn enemy_stats(tuning: &Tuning, kind: EnemyKind) -> &EnemyStats {
    match kind {
        EnemyKind::Chaser => &tuning.enemies.chaser,
        EnemyKind::Turret => &tuning.enemies.turret,
    }
}
