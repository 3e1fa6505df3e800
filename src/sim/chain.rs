//! Blast propagation and chain reactions
//!
//! A detonation sweeps its origin cell and up to `range` cells in each
//! cardinal direction. Walls stop a sweep, crates break without stopping it,
//! actors take damage and bombs caught in the blast are queued and detonated
//! in the same call. The queue is an explicit worklist, so arbitrarily long
//! chains (cycles included) cannot grow the call stack.

use std::collections::{HashSet, VecDeque};

use glam::IVec2;
use rand::Rng;

use super::effects::damage_entity;
use super::entity::{DamageOutcome, EntityId, EntityKind, PickupKind};
use super::grid::CARDINALS;
use super::state::{Collaborators, SimContext};
use crate::audio::SoundEffect;

/// Detonation parameters captured when the bomb was claimed
#[derive(Debug, Clone, Copy)]
struct Pending {
    hazard: EntityId,
    origin: IVec2,
    range: i32,
    damage: i32,
}

/// One bomb's sweep
#[derive(Debug, Clone, PartialEq)]
pub struct Detonation {
    pub hazard: EntityId,
    pub origin: IVec2,
    /// Cells in visit order, origin first
    pub cells: Vec<IVec2>,
}

/// Everything a chain reaction touched
#[derive(Debug, Clone, Default)]
pub struct Blast {
    pub detonations: Vec<Detonation>,
    pub affected: HashSet<IVec2>,
    pub crates_destroyed: u32,
    /// Actors killed by the blast
    pub casualties: u32,
}

impl Blast {
    /// Detonated hazards in processing order
    pub fn detonated(&self) -> Vec<EntityId> {
        self.detonations.iter().map(|d| d.hazard).collect()
    }
}

/// Detonate `hazard` and every bomb it reaches.
///
/// Returns `None` if the hazard is gone or already exploded.
pub fn detonate(ctx: &mut SimContext, io: &mut Collaborators<'_>, hazard: EntityId) -> Option<Blast> {
    let first = claim(ctx, hazard)?;
    Some(propagate(ctx, io, first))
}

/// Detonate `hazard` with the origin cell and range captured when the
/// trigger was raised, ignoring any later change to the bomb itself.
pub fn detonate_at(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    hazard: EntityId,
    origin: IVec2,
    range: i32,
) -> Option<Blast> {
    let mut first = claim(ctx, hazard)?;
    first.origin = origin;
    first.range = range.max(0);
    Some(propagate(ctx, io, first))
}

fn propagate(ctx: &mut SimContext, io: &mut Collaborators<'_>, first: Pending) -> Blast {
    let hazard = first.hazard;
    let mut queue = VecDeque::from([first]);
    let mut struck = HashSet::new();
    let mut blast = Blast::default();

    while let Some(pending) = queue.pop_front() {
        let cells = sweep(ctx, io, &pending, &mut struck, &mut queue, &mut blast);
        blast.affected.extend(cells.iter().copied());
        blast.detonations.push(Detonation {
            hazard: pending.hazard,
            origin: pending.origin,
            cells,
        });
    }

    io.audio.play(SoundEffect::Explosion);
    log::debug!(
        "Blast from {hazard}: {} detonation(s), {} cells, {} crate(s), {} casualtie(s)",
        blast.detonations.len(),
        blast.affected.len(),
        blast.crates_destroyed,
        blast.casualties
    );
    blast
}

/// Mark a bomb exploded and snapshot its parameters
fn claim(ctx: &mut SimContext, hazard: EntityId) -> Option<Pending> {
    let grid = ctx.grid;
    let bomb = ctx.registry.get_mut(hazard)?;
    if !bomb.claim_detonation() {
        return None;
    }
    bomb.mark_for_removal();
    Some(Pending {
        hazard,
        origin: grid.world_to_cell(bomb.transform.pos),
        range: bomb.range.max(0),
        damage: bomb.damage,
    })
}

fn sweep(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    pending: &Pending,
    struck: &mut HashSet<EntityId>,
    queue: &mut VecDeque<Pending>,
    blast: &mut Blast,
) -> Vec<IVec2> {
    let mut seen = HashSet::from([pending.origin]);
    let mut cells = vec![pending.origin];
    strike(ctx, io, pending, pending.origin, struck, queue, blast);

    for dir in CARDINALS {
        for step in 1..=pending.range {
            let cell = pending.origin + dir * step;
            if !ctx.grid.in_bounds(cell) {
                break;
            }
            let first_visit = seen.insert(cell);
            debug_assert!(first_visit, "{cell} swept twice by {}", pending.hazard);
            if !first_visit {
                break;
            }
            cells.push(cell);

            let obstacle = ctx.registry.obstacle_at(cell).map(|o| (o.id, o.kind));
            match obstacle {
                Some((_, EntityKind::Obstacle { destructible: false })) => break,
                Some((id, _)) => break_crate(ctx, io, id, cell, blast),
                None => strike(ctx, io, pending, cell, struck, queue, blast),
            }
        }
    }
    cells
}

/// Hit the actors in a cell and queue the bombs sitting on it
fn strike(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    pending: &Pending,
    cell: IVec2,
    struck: &mut HashSet<EntityId>,
    queue: &mut VecDeque<Pending>,
    blast: &mut Blast,
) {
    for id in ctx.registry.in_cell(&ctx.grid, cell) {
        let Some(kind) = ctx.registry.get(id).map(|e| e.kind) else {
            continue;
        };
        if kind.is_actor() {
            // Overlapping blasts in one chain hurt an actor once
            if struck.insert(id)
                && damage_entity(ctx, io, id, pending.damage) == DamageOutcome::Killed
            {
                blast.casualties += 1;
            }
        } else if kind == EntityKind::Bomb {
            if let Some(next) = claim(ctx, id) {
                log::debug!("{} set off {id} at {}", pending.hazard, next.origin);
                queue.push_back(next);
            }
        }
    }
}

fn break_crate(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    id: EntityId,
    cell: IVec2,
    blast: &mut Blast,
) {
    if let Some(obstacle) = ctx.registry.get_mut(id) {
        obstacle.mark_for_removal();
    }
    blast.crates_destroyed += 1;
    ctx.score += ctx.tuning.scoring.crate_destroyed;
    io.audio.play(SoundEffect::CrateBreak);

    let chance = f64::from(ctx.tuning.bomb.pickup_chance.clamp(0.0, 1.0));
    if ctx.rng.random_bool(chance) {
        let kind = PickupKind::ALL[ctx.rng.random_range(0..PickupKind::ALL.len())];
        if let Some(pickup) = ctx.spawn_at_cell(io, EntityKind::Pickup(kind), cell) {
            log::debug!("Crate at {cell} dropped {kind:?} {pickup}");
        }
    }
}
