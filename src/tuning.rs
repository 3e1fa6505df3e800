//! Data-driven game balance
//!
//! Loaded once before the loop starts and treated as read-only afterwards.
//! Loading is all-or-nothing: any problem rejects the whole document.

use std::path::Path;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::grid::LevelLayout;
use crate::sim::spawner::{PositionRule, SpawnEvent};

/// Arena geometry and starting layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    /// World units per grid cell
    pub tile_size: f32,
    /// Rows of `#` (wall), `+` (crate), `P` (player start), `.` (empty)
    pub layout: Vec<String>,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            layout: [
                "#############",
                "#P..+.+.+...#",
                "#.#+#.#.#+#.#",
                "#..+..+...+.#",
                "#.#.#+#.#.#.#",
                "#+..+...+..+#",
                "#.#.#.#+#.#.#",
                "#...+..+..+.#",
                "#.#+#.#.#+#.#",
                "#..+...+....#",
                "#############",
            ]
            .iter()
            .map(|row| row.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub health: i32,
    /// World units per second
    pub speed: f32,
    pub radius: f32,
    /// Bombs the player may have on the field at once
    pub bomb_capacity: u32,
    /// Blast range in cells
    pub blast_range: i32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            health: 10,
            speed: 110.0,
            radius: 11.0,
            bomb_capacity: 1,
            blast_range: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BombTuning {
    /// Seconds from placement to detonation
    pub fuse: f32,
    /// Damage dealt to every actor caught in the blast
    pub damage: i32,
    /// Chance that a destroyed crate drops a pickup
    pub pickup_chance: f32,
    pub radius: f32,
}

impl Default for BombTuning {
    fn default() -> Self {
        Self {
            fuse: 2.5,
            damage: 10,
            pickup_chance: 0.3,
            radius: 12.0,
        }
    }
}

/// Stats shared by every enemy archetype
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyStats {
    pub health: i32,
    pub speed: f32,
    pub radius: f32,
    /// Damage dealt when touching the player
    pub contact_damage: i32,
    /// Seconds between two contact hits from the same enemy
    pub attack_cooldown: f32,
    /// Seconds between shots (0 = never fires)
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub projectile_damage: i32,
    pub projectile_radius: f32,
    /// Seconds before an unspent projectile fizzles
    pub projectile_lifetime: f32,
    /// Points awarded for the kill
    pub score: u64,
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            health: 3,
            speed: 60.0,
            radius: 11.0,
            contact_damage: 2,
            attack_cooldown: 1.0,
            fire_interval: 0.0,
            projectile_speed: 160.0,
            projectile_damage: 2,
            projectile_radius: 4.0,
            projectile_lifetime: 3.0,
            score: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub chaser: EnemyStats,
    pub turret: EnemyStats,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            chaser: EnemyStats::default(),
            turret: EnemyStats {
                health: 5,
                speed: 0.0,
                radius: 13.0,
                contact_damage: 1,
                fire_interval: 2.0,
                score: 250,
                ..EnemyStats::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    pub radius: f32,
    pub speed_bonus: f32,
    pub max_speed: f32,
    pub max_bomb_capacity: u32,
    pub max_blast_range: i32,
    pub heal: i32,
    /// Seconds of invincibility granted by a shield
    pub shield_duration: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            radius: 10.0,
            speed_bonus: 20.0,
            max_speed: 200.0,
            max_bomb_capacity: 5,
            max_blast_range: 6,
            heal: 4,
            shield_duration: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    pub crate_destroyed: u64,
    pub pickup_collected: u64,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            crate_destroyed: 10,
            pickup_collected: 25,
        }
    }
}

/// Condition that ends a round in victory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryRule {
    /// No destructible obstacles remain
    #[default]
    ClearCrates,
    /// Score reaches the target
    Score(u64),
    /// Every spawn has fired and no enemy is left standing
    WavesCleared,
}

/// Complete tuning document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Seed for every round's RNG (pickup drops, random spawn cells)
    pub seed: u64,
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub bomb: BombTuning,
    pub enemies: EnemyTuning,
    pub pickups: PickupTuning,
    pub scoring: ScoreTuning,
    /// Spawn timeline for a round
    pub spawns: Vec<SpawnEvent>,
    pub victory: VictoryRule,
}

impl Default for Tuning {
    fn default() -> Self {
        use crate::sim::entity::EnemyKind;
        use crate::sim::spawner::{Repeat, SpawnKind};

        Self {
            seed: 0x5eed_cafe,
            arena: ArenaTuning::default(),
            player: PlayerTuning::default(),
            bomb: BombTuning::default(),
            enemies: EnemyTuning::default(),
            pickups: PickupTuning::default(),
            scoring: ScoreTuning::default(),
            spawns: vec![
                SpawnEvent::new(
                    3.0,
                    SpawnKind::Enemy(EnemyKind::Chaser),
                    PositionRule::Cell(IVec2::new(11, 9)),
                )
                .with_repeat(Repeat {
                    count: 3,
                    interval: 4.0,
                }),
                SpawnEvent::new(
                    10.0,
                    SpawnKind::Enemy(EnemyKind::Turret),
                    PositionRule::Cell(IVec2::new(11, 1)),
                ),
                SpawnEvent::new(
                    20.0,
                    SpawnKind::Enemy(EnemyKind::Chaser),
                    PositionRule::RandomEmpty,
                )
                .with_repeat(Repeat {
                    count: 2,
                    interval: 1.5,
                }),
            ],
            victory: VictoryRule::default(),
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Read, parse and validate a tuning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json(&text)?;
        log::info!(
            "Loaded tuning from {} ({} spawn events)",
            path.display(),
            tuning.spawns.len()
        );
        Ok(tuning)
    }

    /// Parse the arena layout (already validated for loaded documents)
    pub fn level(&self) -> Result<LevelLayout, ConfigError> {
        LevelLayout::parse(&self.arena.layout).map_err(|problems| ConfigError::Invalid { problems })
    }

    /// Check every rule and report all problems at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if !(self.arena.tile_size > 0.0) {
            problems.push(format!("arena.tile_size must be > 0 (got {})", self.arena.tile_size));
        }

        let level = match LevelLayout::parse(&self.arena.layout) {
            Ok(level) => Some(level),
            Err(layout_problems) => {
                problems.extend(layout_problems);
                None
            }
        };

        if self.player.health <= 0 {
            problems.push("player.health must be > 0".to_string());
        }
        if self.player.speed < 0.0 {
            problems.push("player.speed must be >= 0".to_string());
        }
        if self.player.radius <= 0.0 {
            problems.push("player.radius must be > 0".to_string());
        }
        if self.player.blast_range < 1 {
            problems.push("player.blast_range must be >= 1".to_string());
        }
        if self.player.bomb_capacity == 0 {
            problems.push("player.bomb_capacity must be >= 1".to_string());
        }

        if !(self.bomb.fuse > 0.0) {
            problems.push("bomb.fuse must be > 0".to_string());
        }
        if self.bomb.damage <= 0 {
            problems.push("bomb.damage must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.bomb.pickup_chance) {
            problems.push(format!(
                "bomb.pickup_chance must be within [0, 1] (got {})",
                self.bomb.pickup_chance
            ));
        }

        for (name, stats) in [("chaser", &self.enemies.chaser), ("turret", &self.enemies.turret)] {
            if stats.health <= 0 {
                problems.push(format!("enemies.{name}.health must be > 0"));
            }
            if stats.speed < 0.0 || stats.radius <= 0.0 {
                problems.push(format!("enemies.{name} needs speed >= 0 and radius > 0"));
            }
            if stats.fire_interval < 0.0 || stats.attack_cooldown < 0.0 {
                problems.push(format!("enemies.{name} timers must be >= 0"));
            }
            if stats.fire_interval > 0.0 && stats.projectile_lifetime <= 0.0 {
                problems.push(format!("enemies.{name}.projectile_lifetime must be > 0"));
            }
        }

        for (index, event) in self.spawns.iter().enumerate() {
            if !(event.trigger_time >= 0.0) {
                problems.push(format!("spawns[{index}].trigger_time must be >= 0"));
            }
            if let Some(repeat) = event.repeat {
                if repeat.count == 0 {
                    problems.push(format!("spawns[{index}].repeat.count must be >= 1"));
                }
                if repeat.count > 1 && !(repeat.interval > 0.0) {
                    problems.push(format!("spawns[{index}].repeat.interval must be > 0"));
                }
            }
            if let (PositionRule::Cell(cell), Some(level)) = (event.position, level.as_ref()) {
                if !level.in_bounds(cell) {
                    problems.push(format!("spawns[{index}] cell {cell} is outside the arena"));
                } else if level.tile(cell).is_solid() {
                    problems.push(format!("spawns[{index}] cell {cell} is inside an obstacle"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        let tuning = Tuning::default();
        assert!(tuning.validate().is_ok());
        let level = tuning.level().unwrap();
        assert_eq!(level.width, 13);
        assert_eq!(level.height, 11);
        assert_eq!(level.player_start, IVec2::new(1, 1));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "seed": 7, "player": { "health": 4 } }"#).unwrap();
        assert_eq!(tuning.seed, 7);
        assert_eq!(tuning.player.health, 4);
        assert_eq!(tuning.player.blast_range, PlayerTuning::default().blast_range);
        assert_eq!(tuning.victory, VictoryRule::ClearCrates);
    }

    #[test]
    fn test_victory_rule_forms() {
        let tuning = Tuning::from_json(r#"{ "victory": { "score": 500 } }"#).unwrap();
        assert_eq!(tuning.victory, VictoryRule::Score(500));
        let tuning = Tuning::from_json(r#"{ "victory": "waves_cleared" }"#).unwrap();
        assert_eq!(tuning.victory, VictoryRule::WavesCleared);
    }

    #[test]
    fn test_problems_are_aggregated() {
        let text = r####"{
            "arena": { "tile_size": 0, "layout": ["###", "#P#", "###"] },
            "player": { "health": 0 },
            "bomb": { "pickup_chance": 1.5 },
            "spawns": [
                { "trigger_time": 1.0, "kind": { "enemy": "chaser" }, "position": { "cell": [0, 0] } }
            ]
        }"####;
        match Tuning::from_json(text) {
            Err(ConfigError::Invalid { problems }) => {
                // tile size, player health, pickup chance, spawn inside wall
                assert_eq!(problems.len(), 4, "{problems:?}");
            }
            other => panic!("expected aggregated validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Tuning::load("/definitely/not/here/tuning.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
