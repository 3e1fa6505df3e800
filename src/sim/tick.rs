//! Fixed timestep frame driver
//!
//! Each frame clamps the wall-clock delta, runs as many fixed sub-steps as
//! the accumulator allows (capped), syncs the render scene once and checks
//! for the end of the round once. Gameplay inside a sub-step always runs in
//! the same order: physics, contacts, entity updates, spawner, effects,
//! prune.

use glam::Vec2;

use super::chain::Blast;
use super::collision::{ContactEvent, classify};
use super::effects::{Effect, resolve};
use super::entity::{EntityId, EntityKind, Intent, UpdateContext, enemy_stats};
use super::phase::{GamePhase, PhaseEvent, Transition, evaluate_round, transition};
use super::state::{Collaborators, SimContext};
use super::sync::sync_render;
use crate::audio::SoundEffect;
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::platform::{FrameInput, InputSource};

/// Outcome of one fixed sub-step
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub contacts: usize,
    pub effects: usize,
    pub spawned: usize,
    pub pruned: usize,
    pub blasts: Vec<Blast>,
}

/// Outcome of one frame
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub substeps: u32,
    pub contacts: usize,
    pub effects: usize,
    pub spawned: usize,
    pub pruned: usize,
    pub blasts: Vec<Blast>,
    /// Render handles updated by the end-of-frame sync
    pub synced: usize,
    pub transitions: Vec<Transition>,
    /// Phase after the frame
    pub phase: GamePhase,
}

impl FrameReport {
    fn absorb(&mut self, step: StepReport) {
        self.contacts += step.contacts;
        self.effects += step.effects;
        self.spawned += step.spawned;
        self.pruned += step.pruned;
        self.blasts.extend(step.blasts);
    }
}

/// Accumulator-based driver for variable-rate frames
#[derive(Debug, Clone, Default)]
pub struct FrameDriver {
    accumulator: f32,
    /// A fire press that arrived in a frame with no sub-step
    fire_latched: bool,
    frames: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsimulated time carried to the next frame
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame of `wall_dt` seconds
    pub fn frame(
        &mut self,
        ctx: &mut SimContext,
        io: &mut Collaborators<'_>,
        source: &dyn InputSource,
        wall_dt: f32,
    ) -> FrameReport {
        self.frames += 1;
        let input = FrameInput::poll(source);
        let mut report = FrameReport::default();

        for (pressed, event) in [
            (input.start, PhaseEvent::Start),
            (input.restart, PhaseEvent::Restart),
        ] {
            if pressed {
                if let Some(t) = transition(ctx, io, event) {
                    report.transitions.push(t);
                    self.accumulator = 0.0;
                    self.fire_latched = false;
                }
            }
        }

        if ctx.phase != GamePhase::Playing {
            self.accumulator = 0.0;
            report.phase = ctx.phase;
            return report;
        }

        let dt = if wall_dt.is_finite() {
            wall_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += dt;
        self.fire_latched |= input.fire;

        let mut step_input = FrameInput {
            fire: self.fire_latched,
            ..input.held_only()
        };
        while self.accumulator >= SIM_DT && report.substeps < MAX_SUBSTEPS {
            report.absorb(tick(ctx, io, &step_input, SIM_DT));
            self.accumulator -= SIM_DT;
            report.substeps += 1;

            // One-shot actions belong to the first sub-step only
            step_input = step_input.held_only();
            self.fire_latched = false;
        }
        if self.accumulator >= SIM_DT {
            log::trace!("Dropping {:.4}s of simulation backlog", self.accumulator);
            self.accumulator %= SIM_DT;
        }

        report.synced = sync_render(ctx, io);
        if let Some(event) = evaluate_round(ctx) {
            if let Some(t) = transition(ctx, io, event) {
                report.transitions.push(t);
            }
        }
        report.phase = ctx.phase;
        report
    }
}

/// Advance the PLAYING simulation by one fixed step
pub fn tick(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    input: &FrameInput,
    dt: f32,
) -> StepReport {
    let mut report = StepReport::default();

    io.physics.step(dt);
    ctx.round_time += dt;
    refresh_transforms(ctx, io);

    // Contacts are pulled now and resolved after the update and spawn passes
    let contacts: Vec<ContactEvent> = io
        .physics
        .drain_contacts()
        .iter()
        .filter_map(|raw| ContactEvent::from_raw(raw, &ctx.registry))
        .collect();
    report.contacts = contacts.len();

    let mut timed = Vec::new();
    for (id, intent) in update_entities(ctx, io, input, dt) {
        match intent {
            Intent::PlaceBomb => place_bomb(ctx, io, id),
            Intent::Fire { direction } => fire_projectile(ctx, io, id, direction),
            Intent::Detonate => {
                if let Some(bomb) = ctx.registry.get(id) {
                    timed.push(Effect::TriggerChain {
                        hazard: id,
                        origin: ctx.grid.world_to_cell(bomb.transform.pos),
                        radius: bomb.range,
                    });
                }
            }
            Intent::Expire => {
                if let Some(entity) = ctx.registry.get_mut(id) {
                    entity.mark_for_removal();
                }
            }
        }
    }

    for request in ctx.spawner.update(ctx.round_time) {
        if ctx.fulfil(io, &request).is_some() {
            report.spawned += 1;
        }
    }

    // Contact effects first, then fuses that ran out this step. Each contact
    // is classified against the state left by the effects before it.
    for contact in &contacts {
        if let Some(effect) = classify(contact, &ctx.registry, &ctx.grid) {
            report.effects += 1;
            if let Some(blast) = resolve(ctx, io, effect) {
                report.blasts.push(blast);
            }
        }
    }
    for effect in timed {
        report.effects += 1;
        if let Some(blast) = resolve(ctx, io, effect) {
            report.blasts.push(blast);
        }
    }

    report.pruned = ctx.prune(io);
    report
}

/// Pull body transforms into entities and cull anything that left the grid
fn refresh_transforms(ctx: &mut SimContext, io: &mut Collaborators<'_>) {
    let grid = ctx.grid;
    for entity in ctx.registry.iter_mut() {
        if !entity.is_alive() {
            continue;
        }
        if let Some(transform) = entity.body.and_then(|body| io.physics.transform(body)) {
            entity.transform = transform;
        }
        if !grid.contains(entity.transform.pos) {
            log::debug!("{} left the arena", entity.id);
            entity.mark_for_removal();
        }
    }
}

fn update_entities(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    input: &FrameInput,
    dt: f32,
) -> Vec<(EntityId, Intent)> {
    let cx = UpdateContext {
        now: ctx.round_time,
        input,
        player_pos: ctx.player_pos(),
        tuning: &ctx.tuning,
    };
    let mut intents = Vec::new();
    for entity in ctx.registry.iter_mut() {
        let update = entity.update(dt, &cx);
        if let (Some(velocity), Some(body)) = (update.velocity, entity.body) {
            io.physics.set_velocity(body, velocity);
        }
        if let Some(intent) = update.intent {
            intents.push((entity.id, intent));
        }
    }
    intents
}

/// Drop a bomb on the owner's cell if capacity allows and the cell is free
fn place_bomb(ctx: &mut SimContext, io: &mut Collaborators<'_>, owner: EntityId) {
    let Some(player) = ctx.registry.get(owner).filter(|e| e.is_alive()) else {
        return;
    };
    let cell = ctx.grid.world_to_cell(player.transform.pos);
    let capacity = player.loadout.bomb_capacity as usize;
    let range = player.loadout.blast_range;

    let live = ctx.registry.count(|e| {
        e.kind == EntityKind::Bomb && e.owner == Some(owner) && e.is_alive()
    });
    if live >= capacity || ctx.registry.bomb_at(&ctx.grid, cell).is_some() {
        return;
    }

    let pos = ctx.grid.cell_to_world(cell);
    let placed = ctx.spawn(io, EntityKind::Bomb, pos, |bomb| {
        bomb.range = range;
        bomb.owner = Some(owner);
    });
    if let Some(id) = placed {
        io.audio.play(SoundEffect::BombPlaced);
        log::debug!("{owner} placed bomb {id} at {cell}");
    }
}

/// Launch a projectile from an enemy toward `direction`
fn fire_projectile(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    shooter: EntityId,
    direction: Vec2,
) {
    let Some(src) = ctx.registry.get(shooter).filter(|e| e.is_alive()) else {
        return;
    };
    let EntityKind::Enemy(kind) = src.kind else {
        return;
    };
    let stats = enemy_stats(&ctx.tuning, kind).clone();
    let pos = src.transform.pos + direction * (src.radius + stats.projectile_radius + 1.0);

    let fired = ctx.spawn(io, EntityKind::Projectile, pos, |shot| {
        shot.radius = stats.projectile_radius;
        shot.heading = direction;
        shot.transform.rotation = crate::heading(direction);
        shot.loadout.speed = stats.projectile_speed;
        shot.damage = stats.projectile_damage;
        shot.ttl = Some(stats.projectile_lifetime);
        shot.owner = Some(shooter);
    });
    if fired.is_some() {
        io.audio.play(SoundEffect::Shot);
    }
}
