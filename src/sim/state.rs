//! Simulation context and entity registry
//!
//! `SimContext` owns every piece of mutable gameplay state: the registry, the
//! spawner, the current phase, the round clock and the RNG. Collaborators are
//! borrowed per call through `Collaborators`, never stored.

use std::collections::{BTreeMap, HashMap};

use glam::{IVec2, Vec2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::entity::{Entity, EntityId, EntityKind};
use super::grid::{Grid, LevelLayout, Tile};
use super::phase::GamePhase;
use super::physics::{BodyHandle, PhysicsWorld};
use super::spawner::{PositionRule, SpawnKind, SpawnRequest, Spawner};
use crate::audio::{AudioSink, SoundEffect};
use crate::error::ConfigError;
use crate::renderer::RenderScene;
use crate::tuning::{Tuning, VictoryRule};

/// Random spawns keep at least this many cells (Manhattan) from the player
const SPAWN_CLEARANCE: i32 = 3;

/// The external systems the simulation drives
pub struct Collaborators<'a> {
    pub physics: &'a mut dyn PhysicsWorld,
    pub scene: &'a mut dyn RenderScene,
    pub audio: &'a mut dyn AudioSink,
}

/// Live entities plus the lookup indices the classifier and blasts need
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: BTreeMap<EntityId, Entity>,
    bodies: HashMap<BodyHandle, EntityId>,
    obstacles: HashMap<IVec2, EntityId>,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Entity owning a physics body, if it is still registered
    pub fn by_body(&self, body: BodyHandle) -> Option<EntityId> {
        self.bodies.get(&body).copied()
    }

    /// Live obstacle occupying a cell
    pub fn obstacle_at(&self, cell: IVec2) -> Option<&Entity> {
        self.obstacles
            .get(&cell)
            .and_then(|id| self.entities.get(id))
            .filter(|e| e.is_alive())
    }

    /// Live entities whose position falls inside a cell, in id order
    pub fn in_cell(&self, grid: &Grid, cell: IVec2) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.is_alive() && grid.world_to_cell(e.transform.pos) == cell)
            .map(|e| e.id)
            .collect()
    }

    /// Unexploded bomb sitting on a cell
    pub fn bomb_at(&self, grid: &Grid, cell: IVec2) -> Option<EntityId> {
        self.entities
            .values()
            .find(|e| {
                e.kind == EntityKind::Bomb
                    && e.is_alive()
                    && !e.exploded
                    && grid.world_to_cell(e.transform.pos) == cell
            })
            .map(|e| e.id)
    }

    pub fn count(&self, pred: impl Fn(&Entity) -> bool) -> usize {
        self.entities.values().filter(|e| pred(e)).count()
    }

    fn insert(&mut self, entity: Entity, cell: IVec2) {
        if let Some(body) = entity.body {
            self.bodies.insert(body, entity.id);
        }
        if matches!(entity.kind, EntityKind::Obstacle { .. }) {
            self.obstacles.insert(cell, entity.id);
        }
        self.entities.insert(entity.id, entity);
    }

    fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(body) = entity.body {
            self.bodies.remove(&body);
        }
        self.obstacles.retain(|_, owner| *owner != id);
        Some(entity)
    }

    fn drain(&mut self) -> Vec<Entity> {
        self.bodies.clear();
        self.obstacles.clear();
        std::mem::take(&mut self.entities).into_values().collect()
    }
}

/// All mutable simulation state, passed explicitly to every system
#[derive(Debug, Clone)]
pub struct SimContext {
    pub tuning: Tuning,
    pub level: LevelLayout,
    pub grid: Grid,
    pub registry: Registry,
    pub spawner: Spawner,
    pub phase: GamePhase,
    /// Seconds of PLAYING simulated this round
    pub round_time: f32,
    pub score: u64,
    pub kills: u32,
    /// The player entity of the current round
    pub player: Option<EntityId>,
    /// Round RNG, reseeded from the tuning at every round start
    pub rng: Pcg32,
    next_id: u32,
}

impl SimContext {
    /// Validate the tuning and build an idle context in the title phase
    pub fn new(tuning: Tuning) -> Result<Self, ConfigError> {
        tuning.validate()?;
        let level = tuning.level()?;
        let grid = level.grid(tuning.arena.tile_size);
        Ok(Self {
            spawner: Spawner::new(tuning.spawns.clone()),
            rng: Pcg32::seed_from_u64(tuning.seed),
            tuning,
            level,
            grid,
            registry: Registry::default(),
            phase: GamePhase::Title,
            round_time: 0.0,
            score: 0,
            kills: 0,
            player: None,
            next_id: 1,
        })
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create an entity together with its body and render handle.
    ///
    /// `configure` runs before the body is created, so it may adjust radius,
    /// heading or stats. On collaborator failure nothing is left behind and
    /// `None` is returned.
    pub fn spawn(
        &mut self,
        io: &mut Collaborators<'_>,
        kind: EntityKind,
        pos: Vec2,
        configure: impl FnOnce(&mut Entity),
    ) -> Option<EntityId> {
        let id = self.next_entity_id();
        let mut entity = Entity::new(id, kind, pos, &self.tuning);
        configure(&mut entity);

        let body = match io.physics.create_body(&entity.body_desc(&self.tuning)) {
            Ok(body) => body,
            Err(err) => {
                log::warn!("Could not create {kind:?} {id}: {err}");
                return None;
            }
        };
        let render = match io.scene.create_handle(kind.render_kind()) {
            Ok(handle) => handle,
            Err(err) => {
                io.physics.remove_body(body);
                log::warn!("Could not create {kind:?} {id}: {err}");
                return None;
            }
        };
        if kind == EntityKind::Projectile {
            io.physics
                .set_velocity(body, entity.heading * entity.loadout.speed);
        }
        io.scene
            .set_transform(render, entity.transform.pos, entity.transform.rotation);
        entity.body = Some(body);
        entity.render = Some(render);

        let cell = self.grid.world_to_cell(pos);
        self.registry.insert(entity, cell);
        Some(id)
    }

    /// Create an entity centred on a grid cell
    pub fn spawn_at_cell(
        &mut self,
        io: &mut Collaborators<'_>,
        kind: EntityKind,
        cell: IVec2,
    ) -> Option<EntityId> {
        let pos = self.grid.cell_to_world(cell);
        self.spawn(io, kind, pos, |_| {})
    }

    /// Carry out a spawner request
    pub fn fulfil(&mut self, io: &mut Collaborators<'_>, request: &SpawnRequest) -> Option<EntityId> {
        let cell = match request.position {
            PositionRule::Cell(cell) => cell,
            PositionRule::RandomEmpty => match self.random_free_cell() {
                Some(cell) => cell,
                None => {
                    log::warn!("No free cell for spawn event {}", request.event);
                    return None;
                }
            },
        };
        if self.registry.obstacle_at(cell).is_some() {
            log::debug!("Spawn cell {cell} is blocked, skipping event {}", request.event);
            return None;
        }
        let kind = match request.kind {
            SpawnKind::Enemy(enemy) => EntityKind::Enemy(enemy),
            SpawnKind::Pickup(pickup) => EntityKind::Pickup(pickup),
            SpawnKind::Crate => EntityKind::Obstacle { destructible: true },
        };
        let id = self.spawn_at_cell(io, kind, cell)?;
        log::debug!("Spawned {kind:?} {id} at {cell} (t={:.2})", request.time);
        Some(id)
    }

    /// A layout-empty cell with no obstacle or entity, away from the player
    pub fn random_free_cell(&mut self) -> Option<IVec2> {
        let player_cell = self
            .player_pos()
            .map(|pos| self.grid.world_to_cell(pos));
        let occupied: Vec<IVec2> = self
            .registry
            .iter()
            .filter(|e| e.is_alive())
            .map(|e| self.grid.world_to_cell(e.transform.pos))
            .collect();
        let candidates: Vec<IVec2> = self
            .level
            .empty_cells()
            .filter(|cell| !occupied.contains(cell))
            .filter(|cell| {
                player_cell.is_none_or(|p| (*cell - p).abs().element_sum() >= SPAWN_CLEARANCE)
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[self.rng.random_range(0..candidates.len())])
    }

    /// Remove every entity flagged for removal, with its body and handle
    pub fn prune(&mut self, io: &mut Collaborators<'_>) -> usize {
        let doomed: Vec<EntityId> = self
            .registry
            .iter()
            .filter(|e| e.is_pending_removal())
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            if let Some(entity) = self.registry.remove(*id) {
                detach(io, &entity);
            }
        }
        doomed.len()
    }

    /// Remove every entity, body, render handle and spawn timer; the context
    /// is left as a fresh title screen would leave it.
    pub fn reset_round(&mut self, io: &mut Collaborators<'_>) {
        let entities = self.registry.drain();
        let removed = entities.len();
        for entity in &entities {
            detach(io, entity);
        }
        self.spawner.reset();
        self.round_time = 0.0;
        self.score = 0;
        self.kills = 0;
        self.player = None;
        self.next_id = 1;
        self.rng = Pcg32::seed_from_u64(self.tuning.seed);
        log::debug!("Round reset: removed {removed} entities");
    }

    /// Populate obstacles and the player from the layout
    pub fn build_level(&mut self, io: &mut Collaborators<'_>) {
        let obstacles: Vec<(IVec2, Tile)> = self.level.obstacles().collect();
        for (cell, tile) in obstacles {
            let kind = EntityKind::Obstacle {
                destructible: tile == Tile::Crate,
            };
            self.spawn_at_cell(io, kind, cell);
        }
        self.player = self.spawn_at_cell(io, EntityKind::Player, self.level.player_start);
        if self.player.is_none() {
            log::warn!("Round started without a player");
        }
    }

    /// Fresh round: reset, rebuild the level, restart the timeline and music
    pub fn start_round(&mut self, io: &mut Collaborators<'_>) {
        self.reset_round(io);
        self.spawner.reload(self.tuning.spawns.clone());
        self.build_level(io);
        self.spawner.start();
        io.audio.play_loop(SoundEffect::AmbientLoop);
        log::info!(
            "Round started: {} entities, {} spawn events",
            self.registry.len(),
            self.spawner.events().len()
        );
    }

    /// Freeze the round on a terminal screen
    pub fn end_round(&mut self, io: &mut Collaborators<'_>, won: bool) {
        self.spawner.stop();
        io.audio.stop_loop();
        io.audio.play(if won {
            SoundEffect::Victory
        } else {
            SoundEffect::GameOver
        });
        log::info!(
            "Round {} at t={:.2}s: score {}, kills {}",
            if won { "won" } else { "lost" },
            self.round_time,
            self.score,
            self.kills
        );
    }

    pub fn player_entity(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.registry.get(id))
    }

    pub fn player_pos(&self) -> Option<Vec2> {
        self.player_entity()
            .filter(|p| p.is_alive())
            .map(|p| p.transform.pos)
    }

    pub fn player_alive(&self) -> bool {
        self.player_entity().is_some_and(|p| p.is_alive())
    }

    pub fn crates_remaining(&self) -> usize {
        self.registry.count(|e| {
            e.is_alive() && e.kind == EntityKind::Obstacle { destructible: true }
        })
    }

    pub fn enemies_remaining(&self) -> usize {
        self.registry
            .count(|e| e.is_alive() && matches!(e.kind, EntityKind::Enemy(_)))
    }

    /// Whether the configured victory rule holds
    pub fn victory_reached(&self) -> bool {
        match self.tuning.victory {
            VictoryRule::ClearCrates => self.crates_remaining() == 0,
            VictoryRule::Score(target) => self.score >= target,
            VictoryRule::WavesCleared => {
                self.spawner.is_exhausted() && self.enemies_remaining() == 0
            }
        }
    }
}

/// Release an entity's collaborator resources
fn detach(io: &mut Collaborators<'_>, entity: &Entity) {
    if let Some(body) = entity.body {
        io.physics.remove_body(body);
    }
    if let Some(handle) = entity.render {
        io.scene.destroy_handle(handle);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::renderer::{RecordingScene, RenderKind};
    use crate::sim::entity::{EnemyKind, PickupKind};
    use crate::sim::physics::KinematicWorld;

    /// Owned collaborators for tests
    #[derive(Default)]
    pub(crate) struct TestRig {
        pub physics: KinematicWorld,
        pub scene: RecordingScene,
        pub audio: RecordingAudio,
    }

    impl TestRig {
        pub(crate) fn io(&mut self) -> Collaborators<'_> {
            Collaborators {
                physics: &mut self.physics,
                scene: &mut self.scene,
                audio: &mut self.audio,
            }
        }
    }

    /// Tuning for a custom layout with no spawn events
    pub(crate) fn tuning_with_layout(rows: &[&str]) -> Tuning {
        let mut tuning = Tuning::default();
        tuning.arena.layout = rows.iter().map(|r| r.to_string()).collect();
        tuning.spawns.clear();
        tuning
    }

    #[test]
    fn test_build_level_pairs_bodies_and_handles() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#####", "#P+.#", "#####"])).unwrap();
        ctx.build_level(&mut rig.io());

        assert_eq!(ctx.registry.len(), 14);
        assert_eq!(rig.physics.body_count(), 14);
        assert_eq!(rig.scene.len(), 14);
        assert_eq!(rig.scene.count(RenderKind::Wall), 12);
        assert_eq!(ctx.crates_remaining(), 1);
        assert!(ctx.player_alive());
        assert_eq!(
            ctx.grid.world_to_cell(ctx.player_pos().unwrap()),
            IVec2::new(1, 1)
        );
        assert!(ctx.registry.obstacle_at(IVec2::new(2, 1)).is_some());
        assert!(ctx.registry.obstacle_at(IVec2::new(3, 1)).is_none());
    }

    #[test]
    fn test_failed_handle_rolls_back_body() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#P#"])).unwrap();
        rig.scene.fail_next = 1;
        let heal = EntityKind::Pickup(PickupKind::Heal);
        let id = ctx.spawn_at_cell(&mut rig.io(), heal, IVec2::new(1, 0));
        assert!(id.is_none());
        assert_eq!(rig.physics.body_count(), 0);
        assert!(ctx.registry.is_empty());

        // Body creation failure leaves no render handle behind
        rig.physics = KinematicWorld::new().with_capacity_limit(0);
        assert!(ctx.spawn_at_cell(&mut rig.io(), EntityKind::Player, IVec2::new(1, 0)).is_none());
        assert!(rig.scene.is_empty());
    }

    #[test]
    fn test_prune_releases_resources() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#+P#"])).unwrap();
        ctx.build_level(&mut rig.io());
        let crate_id = ctx.registry.obstacle_at(IVec2::new(1, 0)).unwrap().id;
        ctx.registry.get_mut(crate_id).unwrap().mark_for_removal();

        assert!(ctx.registry.obstacle_at(IVec2::new(1, 0)).is_none());
        assert_eq!(ctx.prune(&mut rig.io()), 1);
        assert!(ctx.registry.get(crate_id).is_none());
        assert_eq!(rig.physics.body_count(), 3);
        assert_eq!(rig.scene.len(), 3);
    }

    #[test]
    fn test_reset_round_clears_everything() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(Tuning::default()).unwrap();
        ctx.start_round(&mut rig.io());
        ctx.spawner.update(100.0);
        assert!(ctx.spawner.pending_timers() > 0);

        ctx.reset_round(&mut rig.io());
        assert!(ctx.registry.is_empty());
        assert_eq!(rig.physics.body_count(), 0);
        assert!(rig.scene.is_empty());
        assert_eq!(ctx.spawner.pending_timers(), 0);
        assert!(ctx.spawner.events().iter().all(|e| !e.has_fired()));
        assert_eq!(ctx.next_entity_id(), EntityId(1));
    }

    #[test]
    fn test_fulfil_skips_blocked_cell() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#####", "#P+.#", "#####"])).unwrap();
        ctx.build_level(&mut rig.io());
        let before = ctx.registry.len();

        let request = |cell| SpawnRequest {
            event: 0,
            kind: SpawnKind::Enemy(EnemyKind::Chaser),
            position: PositionRule::Cell(cell),
            time: 1.0,
        };
        assert!(ctx.fulfil(&mut rig.io(), &request(IVec2::new(2, 1))).is_none());
        assert_eq!(ctx.registry.len(), before);
        assert_eq!(rig.physics.body_count(), before);

        assert!(ctx.fulfil(&mut rig.io(), &request(IVec2::new(3, 1))).is_some());
        assert_eq!(ctx.enemies_remaining(), 1);
    }

    #[test]
    fn test_random_free_cell_avoids_occupied_and_player() {
        let mut rig = TestRig::default();
        let mut ctx = SimContext::new(tuning_with_layout(&["#######", "#P.+..#", "#######"])).unwrap();
        ctx.build_level(&mut rig.io());
        for _ in 0..20 {
            let cell = ctx.random_free_cell().unwrap();
            assert!(cell == IVec2::new(4, 1) || cell == IVec2::new(5, 1), "{cell}");
        }
    }

    #[test]
    fn test_victory_rules() {
        let mut rig = TestRig::default();
        let mut tuning = tuning_with_layout(&["#+P#"]);
        tuning.victory = VictoryRule::Score(50);
        let mut ctx = SimContext::new(tuning).unwrap();
        ctx.start_round(&mut rig.io());
        assert!(!ctx.victory_reached());
        ctx.score = 50;
        assert!(ctx.victory_reached());

        ctx.tuning.victory = VictoryRule::ClearCrates;
        assert!(!ctx.victory_reached());
        ctx.tuning.victory = VictoryRule::WavesCleared;
        assert!(ctx.victory_reached());
    }

    #[test]
    fn test_invalid_tuning_is_rejected() {
        let mut tuning = Tuning::default();
        tuning.arena.layout = vec!["###".into()];
        assert!(matches!(SimContext::new(tuning), Err(ConfigError::Invalid { .. })));
    }
}
