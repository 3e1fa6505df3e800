//! Effect resolution
//!
//! Effects are applied one at a time, in the order their contacts were
//! classified. Every effect re-checks liveness, so a descriptor that went
//! stale earlier in the same step is a no-op.

use glam::IVec2;

use super::chain::{self, Blast};
use super::entity::{DamageOutcome, EntityId, EntityKind, PickupKind, enemy_stats};
use super::state::{Collaborators, SimContext};
use crate::audio::SoundEffect;

/// A gameplay consequence of a contact or timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Damage {
        target: EntityId,
        amount: i32,
        source: Option<EntityId>,
    },
    Pickup {
        target: EntityId,
        pickup: EntityId,
        kind: PickupKind,
    },
    Remove {
        target: EntityId,
    },
    /// Detonate a hazard and everything it sets off
    TriggerChain {
        hazard: EntityId,
        origin: IVec2,
        radius: i32,
    },
}

/// Apply one effect. Returns the blast when the effect detonated something.
pub fn resolve(ctx: &mut SimContext, io: &mut Collaborators<'_>, effect: Effect) -> Option<Blast> {
    match effect {
        Effect::Damage {
            target,
            amount,
            source,
        } => {
            if let Some(source) = source {
                let Some(source_kind) = ctx
                    .registry
                    .get(source)
                    .filter(|e| e.is_alive())
                    .map(|e| e.kind)
                else {
                    return None;
                };
                match source_kind {
                    EntityKind::Projectile => {
                        if let Some(src) = ctx.registry.get_mut(source) {
                            src.mark_for_removal();
                        }
                    }
                    EntityKind::Enemy(kind) => {
                        let cooldown = enemy_stats(&ctx.tuning, kind).attack_cooldown;
                        if let Some(src) = ctx.registry.get_mut(source) {
                            src.attack_cooldown = cooldown;
                        }
                    }
                    _ => {}
                }
            }
            damage_entity(ctx, io, target, amount);
            None
        }
        Effect::Pickup {
            target,
            pickup,
            kind,
        } => {
            let collectable = ctx.registry.get(pickup).is_some_and(|e| e.is_alive())
                && ctx.registry.get(target).is_some_and(|e| e.is_alive());
            if !collectable {
                return None;
            }
            let now = ctx.round_time;
            if let Some(entity) = ctx.registry.get_mut(target) {
                entity.apply_pickup(kind, &ctx.tuning, now);
            }
            if let Some(entity) = ctx.registry.get_mut(pickup) {
                entity.mark_for_removal();
            }
            ctx.score += ctx.tuning.scoring.pickup_collected;
            io.audio.play(SoundEffect::PickupCollect);
            log::debug!("{target} collected {kind:?}");
            None
        }
        Effect::Remove { target } => {
            if let Some(entity) = ctx.registry.get_mut(target) {
                entity.mark_for_removal();
            }
            None
        }
        Effect::TriggerChain {
            hazard,
            origin,
            radius,
        } => chain::detonate_at(ctx, io, hazard, origin, radius),
    }
}

/// Damage an entity and apply the consequences of a kill
pub fn damage_entity(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    target: EntityId,
    amount: i32,
) -> DamageOutcome {
    let now = ctx.round_time;
    let Some(entity) = ctx.registry.get_mut(target) else {
        return DamageOutcome::Ignored;
    };
    let outcome = entity.apply_damage(amount, now);
    let kind = entity.kind;

    match outcome {
        DamageOutcome::Killed => {
            entity.mark_for_removal();
            match kind {
                EntityKind::Enemy(enemy) => {
                    ctx.score += enemy_stats(&ctx.tuning, enemy).score;
                    ctx.kills += 1;
                    io.audio.play(SoundEffect::EnemyDown);
                    log::debug!("{enemy:?} {target} destroyed");
                }
                EntityKind::Player => {
                    io.audio.play(SoundEffect::PlayerDown);
                    log::info!("Player {target} died at t={now:.2}");
                }
                _ => {}
            }
        }
        DamageOutcome::Hurt if kind.is_actor() => io.audio.play(SoundEffect::Hurt),
        _ => {}
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EnemyKind;
    use std::collections::HashSet;
    use crate::sim::state::tests::{TestRig, tuning_with_layout};

    fn setup() -> (TestRig, SimContext) {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#######", "#P....#", "#######"])).unwrap();
        ctx.build_level(&mut rig.io());
        (rig, ctx)
    }

    #[test]
    fn test_simultaneous_hits_kill_player_once() {
        // Two sources each dealing 6 to a player with 10 health, same step
        let (mut rig, mut ctx) = setup();
        let player = ctx.player.unwrap();
        ctx.registry.get_mut(player).unwrap().health = 10;
        let a = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Projectile, IVec2::new(2, 1))
            .unwrap();
        let b = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Projectile, IVec2::new(2, 1))
            .unwrap();

        for source in [a, b] {
            resolve(
                &mut ctx,
                &mut rig.io(),
                Effect::Damage {
                    target: player,
                    amount: 6,
                    source: Some(source),
                },
            );
        }

        let p = ctx.registry.get(player).unwrap();
        assert_eq!(p.health, 0);
        assert!(!ctx.player_alive());
        assert_eq!(rig.audio.count(SoundEffect::PlayerDown), 1);
        assert!(ctx.registry.get(a).unwrap().is_pending_removal());
        assert!(ctx.registry.get(b).unwrap().is_pending_removal());
    }

    #[test]
    fn test_consumed_projectile_cannot_hit_again() {
        let (mut rig, mut ctx) = setup();
        let player = ctx.player.unwrap();
        let shot = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Projectile, IVec2::new(2, 1))
            .unwrap();
        let hit = Effect::Damage {
            target: player,
            amount: 2,
            source: Some(shot),
        };
        let before = ctx.registry.get(player).unwrap().health;
        resolve(&mut ctx, &mut rig.io(), hit);
        resolve(&mut ctx, &mut rig.io(), hit);
        assert_eq!(ctx.registry.get(player).unwrap().health, before - 2);
    }

    #[test]
    fn test_enemy_contact_restarts_cooldown() {
        let (mut rig, mut ctx) = setup();
        let player = ctx.player.unwrap();
        let chaser = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Enemy(EnemyKind::Chaser), IVec2::new(2, 1))
            .unwrap();
        let amount = ctx.tuning.enemies.chaser.contact_damage;
        resolve(
            &mut ctx,
            &mut rig.io(),
            Effect::Damage {
                target: player,
                amount,
                source: Some(chaser),
            },
        );
        assert_eq!(
            ctx.registry.get(chaser).unwrap().attack_cooldown,
            ctx.tuning.enemies.chaser.attack_cooldown
        );
        assert_eq!(rig.audio.count(SoundEffect::Hurt), 1);
    }

    #[test]
    fn test_enemy_kill_scores() {
        let (mut rig, mut ctx) = setup();
        let turret = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Enemy(EnemyKind::Turret), IVec2::new(4, 1))
            .unwrap();
        let outcome = damage_entity(&mut ctx, &mut rig.io(), turret, 1_000);
        assert_eq!(outcome, DamageOutcome::Killed);
        assert_eq!(ctx.score, ctx.tuning.enemies.turret.score);
        assert_eq!(ctx.kills, 1);
        assert_eq!(damage_entity(&mut ctx, &mut rig.io(), turret, 1), DamageOutcome::Ignored);
        assert_eq!(ctx.kills, 1);
    }

    #[test]
    fn test_overkill_clamps_to_zero() {
        let (mut rig, mut ctx) = setup();
        let chaser = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Enemy(EnemyKind::Chaser), IVec2::new(3, 1))
            .unwrap();
        ctx.registry.get_mut(chaser).unwrap().health = 3;
        assert_eq!(damage_entity(&mut ctx, &mut rig.io(), chaser, 5), DamageOutcome::Killed);
        let entity = ctx.registry.get(chaser).unwrap();
        assert_eq!(entity.health, 0);
        assert!(entity.is_pending_removal());
        assert_eq!(ctx.prune(&mut rig.io()), 1);
        assert!(ctx.registry.get(chaser).is_none());
    }

    #[test]
    fn test_pickup_collected_once() {
        let (mut rig, mut ctx) = setup();
        let player = ctx.player.unwrap();
        let pickup = ctx
            .spawn_at_cell(&mut rig.io(), EntityKind::Pickup(PickupKind::ExtraBomb), IVec2::new(2, 1))
            .unwrap();
        let effect = Effect::Pickup {
            target: player,
            pickup,
            kind: PickupKind::ExtraBomb,
        };
        resolve(&mut ctx, &mut rig.io(), effect);
        resolve(&mut ctx, &mut rig.io(), effect);

        let capacity = ctx.registry.get(player).unwrap().loadout.bomb_capacity;
        assert_eq!(capacity, ctx.tuning.player.bomb_capacity + 1);
        assert_eq!(ctx.score, ctx.tuning.scoring.pickup_collected);
        assert_eq!(rig.audio.count(SoundEffect::PickupCollect), 1);
    }

    #[test]
    fn test_trigger_chain_uses_captured_origin_and_radius() {
        let (mut rig, mut ctx) = setup();
        let cell = IVec2::new(4, 1);
        let bomb = ctx.spawn_at_cell(&mut rig.io(), EntityKind::Bomb, cell).unwrap();
        let effect = Effect::TriggerChain {
            hazard: bomb,
            origin: cell,
            radius: 1,
        };

        // The bomb's own range changes after the trigger was raised
        ctx.registry.get_mut(bomb).unwrap().range = 5;
        let blast = resolve(&mut ctx, &mut rig.io(), effect).unwrap();

        let expected: HashSet<IVec2> = [cell, IVec2::new(5, 1), IVec2::new(3, 1), IVec2::new(4, 0), IVec2::new(4, 2)]
            .into_iter()
            .collect();
        assert_eq!(blast.affected, expected);
        assert_eq!(blast.detonations[0].origin, cell);
        assert!(resolve(&mut ctx, &mut rig.io(), effect).is_none());
    }
}
