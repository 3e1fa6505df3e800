//! Round phase state machine
//!
//! `GamePhase::on` is the whole transition table. `transition` applies a
//! transition to a context and runs the entry actions of the new phase.

use serde::{Deserialize, Serialize};

use super::state::{Collaborators, SimContext};

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the start input
    #[default]
    Title,
    /// Active gameplay
    Playing,
    /// Round ended in victory
    Won,
    /// Round ended with the player dead
    Lost,
}

/// Something that may move the game to another phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Start,
    Victory,
    Defeat,
    Restart,
}

impl GamePhase {
    /// Next phase for an event, or `None` if the event does nothing here
    pub fn on(self, event: PhaseEvent) -> Option<GamePhase> {
        match (self, event) {
            (GamePhase::Title, PhaseEvent::Start) => Some(GamePhase::Playing),
            (GamePhase::Playing, PhaseEvent::Victory) => Some(GamePhase::Won),
            (GamePhase::Playing, PhaseEvent::Defeat) => Some(GamePhase::Lost),
            (GamePhase::Won | GamePhase::Lost, PhaseEvent::Restart) => Some(GamePhase::Title),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Won | GamePhase::Lost)
    }
}

/// A phase change that actually happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: GamePhase,
    pub to: GamePhase,
}

/// Apply `event` to the context's phase and run the entry actions
pub fn transition(
    ctx: &mut SimContext,
    io: &mut Collaborators<'_>,
    event: PhaseEvent,
) -> Option<Transition> {
    let from = ctx.phase;
    let to = from.on(event)?;

    if from == GamePhase::Playing {
        ctx.spawner.cancel_all();
    }
    ctx.phase = to;
    log::info!("Phase {from:?} -> {to:?}");

    match to {
        GamePhase::Playing => ctx.start_round(io),
        GamePhase::Won => ctx.end_round(io, true),
        GamePhase::Lost => ctx.end_round(io, false),
        GamePhase::Title => ctx.reset_round(io),
    }
    Some(Transition { from, to })
}

/// Win/lose check for the end of a frame. Defeat wins ties.
pub fn evaluate_round(ctx: &SimContext) -> Option<PhaseEvent> {
    if ctx.phase != GamePhase::Playing {
        return None;
    }
    if !ctx.player_alive() {
        Some(PhaseEvent::Defeat)
    } else if ctx.victory_reached() {
        Some(PhaseEvent::Victory)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SoundEffect;
    use crate::sim::physics::PhysicsWorld;
    use crate::sim::state::tests::{TestRig, tuning_with_layout};
    use crate::tuning::Tuning;

    const ALL_PHASES: [GamePhase; 4] = [
        GamePhase::Title,
        GamePhase::Playing,
        GamePhase::Won,
        GamePhase::Lost,
    ];
    const ALL_EVENTS: [PhaseEvent; 4] = [
        PhaseEvent::Start,
        PhaseEvent::Victory,
        PhaseEvent::Defeat,
        PhaseEvent::Restart,
    ];

    #[test]
    fn test_transition_table() {
        let mut allowed = 0;
        for phase in ALL_PHASES {
            for event in ALL_EVENTS {
                if let Some(next) = phase.on(event) {
                    allowed += 1;
                    assert_ne!(next, phase);
                }
            }
        }
        assert_eq!(allowed, 5);
        assert_eq!(GamePhase::Title.on(PhaseEvent::Start), Some(GamePhase::Playing));
        assert_eq!(GamePhase::Lost.on(PhaseEvent::Restart), Some(GamePhase::Title));
        assert_eq!(GamePhase::Playing.on(PhaseEvent::Start), None);
        assert_eq!(GamePhase::Title.on(PhaseEvent::Defeat), None);
    }

    #[test]
    fn test_entry_actions() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(Tuning::default()).unwrap();

        assert!(transition(&mut ctx, &mut rig.io(), PhaseEvent::Restart).is_none());
        let t = transition(&mut ctx, &mut rig.io(), PhaseEvent::Start).unwrap();
        assert_eq!((t.from, t.to), (GamePhase::Title, GamePhase::Playing));
        assert!(ctx.spawner.is_running());
        assert!(!ctx.registry.is_empty());
        assert_eq!(rig.audio.current_loop, Some(SoundEffect::AmbientLoop));

        ctx.spawner.update(100.0);
        assert!(ctx.spawner.pending_timers() > 0);
        transition(&mut ctx, &mut rig.io(), PhaseEvent::Defeat).unwrap();
        assert_eq!(ctx.phase, GamePhase::Lost);
        assert_eq!(ctx.spawner.pending_timers(), 0);
        assert!(!ctx.spawner.is_running());
        assert_eq!(rig.audio.current_loop, None);
        assert_eq!(rig.audio.count(SoundEffect::GameOver), 1);

        transition(&mut ctx, &mut rig.io(), PhaseEvent::Restart).unwrap();
        assert_eq!(ctx.phase, GamePhase::Title);
        assert!(ctx.registry.is_empty());
        assert_eq!(rig.physics.body_count(), 0);
        assert!(rig.scene.is_empty());
    }

    #[test]
    fn test_evaluate_round() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#+P#"])).unwrap();
        assert_eq!(evaluate_round(&ctx), None);

        transition(&mut ctx, &mut rig.io(), PhaseEvent::Start).unwrap();
        assert_eq!(evaluate_round(&ctx), None);

        let crate_cell = glam::IVec2::new(1, 0);
        let crate_id = ctx.registry.obstacle_at(crate_cell).unwrap().id;
        ctx.registry.get_mut(crate_id).unwrap().mark_for_removal();
        assert_eq!(evaluate_round(&ctx), Some(PhaseEvent::Victory));

        // Dead player outranks a simultaneous victory
        let player = ctx.player.unwrap();
        ctx.registry.get_mut(player).unwrap().apply_damage(1_000, 0.0);
        assert_eq!(evaluate_round(&ctx), Some(PhaseEvent::Defeat));
    }
}
