//! Game configuration
//!
//! Everything tunable lives here and can be loaded from JSON. Missing fields
//! fall back to their defaults; `validate` rejects values the loop, the
//! quadtree or the entity pool cannot work with.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::BoundingBox;
use crate::sim::wave::{CELL, TOP_MARGIN};

/// Narrowest playfield: one formation column, and room for the player
pub const MIN_PLAYFIELD_WIDTH: f32 = if CELL.x > PLAYER_WIDTH {
    CELL.x
} else {
    PLAYER_WIDTH
};
/// Shortest playfield: one formation row above the player's baseline
pub const MIN_PLAYFIELD_HEIGHT: f32 = TOP_MARGIN + CELL.y + PLAYER_BASELINE + PLAYER_HEIGHT;

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Enemy speed multiplier
    pub fn enemy_speed(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.35,
        }
    }

    /// Chance per enemy per second to fire
    pub fn enemy_fire_rate(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.05,
            Difficulty::Normal => 0.1,
            Difficulty::Hard => 0.2,
        }
    }

    /// Starting lives
    pub fn lives(&self) -> u8 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Normal => 3,
            Difficulty::Hard => 2,
        }
    }
}

/// Fixed-timestep loop timing, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Simulation step handed to every fixed update
    pub fixed_step: f64,
    /// Lower clamp for a frame's delta
    pub min_frame_delta: f64,
    /// Upper clamp for a frame's delta
    pub max_frame_delta: f64,
    /// Fixed updates allowed per frame before the backlog is discarded
    pub max_steps_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_step: SIM_DT as f64,
            min_frame_delta: 0.0,
            max_frame_delta: MAX_FRAME_DELTA,
            max_steps_per_frame: MAX_SUBSTEPS,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_step.is_finite() || self.fixed_step <= 0.0 {
            return Err(ConfigError::InvalidFixedStep(self.fixed_step));
        }
        let bounds_ok = self.min_frame_delta.is_finite()
            && self.max_frame_delta.is_finite()
            && self.min_frame_delta >= 0.0
            && self.min_frame_delta <= self.max_frame_delta
            && self.max_frame_delta >= self.fixed_step;
        if !bounds_ok {
            return Err(ConfigError::InvalidStepBounds {
                min: self.min_frame_delta,
                max: self.max_frame_delta,
                fixed_step: self.fixed_step,
            });
        }
        if self.max_steps_per_frame == 0 {
            return Err(ConfigError::InvalidMaxSteps);
        }
        Ok(())
    }
}

/// Quadtree limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeConfig {
    /// Items a leaf holds before it tries to split
    pub max_objects: usize,
    /// Deepest level a node may be created at
    pub max_levels: u32,
    /// Smallest width/height a child node may have
    pub min_node_size: f32,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            max_objects: QUADTREE_MAX_OBJECTS,
            max_levels: QUADTREE_MAX_LEVELS,
            min_node_size: QUADTREE_MIN_NODE_SIZE,
        }
    }
}

impl QuadtreeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_objects == 0 {
            return Err(ConfigError::InvalidMaxObjects);
        }
        if !self.min_node_size.is_finite() || self.min_node_size <= 0.0 {
            return Err(ConfigError::InvalidMinNodeSize(self.min_node_size));
        }
        Ok(())
    }
}

/// Playfield and gameplay tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Playfield rectangle (also the quadtree root)
    pub bounds: BoundingBox,
    /// Entity pool capacity
    pub max_entities: usize,
    pub difficulty: Difficulty,
    /// Player speed (pixels/s)
    pub player_speed: f32,
    /// Seconds between player shots
    pub player_fire_cooldown: f32,
    /// Player shot speed (pixels/s)
    pub projectile_speed: f32,
    /// Enemy shot speed (pixels/s)
    pub enemy_projectile_speed: f32,
    /// Base enemy sweep speed (pixels/s)
    pub enemy_speed: f32,
    /// Particles spawned per destroyed enemy
    pub particles_per_explosion: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::new(0.0, 0.0, WORLD_WIDTH, WORLD_HEIGHT),
            max_entities: DEFAULT_MAX_ENTITIES,
            difficulty: Difficulty::Normal,
            player_speed: PLAYER_SPEED,
            player_fire_cooldown: PLAYER_FIRE_COOLDOWN,
            projectile_speed: PROJECTILE_SPEED,
            enemy_projectile_speed: ENEMY_PROJECTILE_SPEED,
            enemy_speed: ENEMY_SPEED,
            particles_per_explosion: PARTICLES_PER_EXPLOSION,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;
        if self.bounds.width < MIN_PLAYFIELD_WIDTH || self.bounds.height < MIN_PLAYFIELD_HEIGHT {
            return Err(ConfigError::PlayfieldTooSmall {
                width: self.bounds.width,
                height: self.bounds.height,
                min_width: MIN_PLAYFIELD_WIDTH,
                min_height: MIN_PLAYFIELD_HEIGHT,
            });
        }
        if self.max_entities < MIN_ENTITY_POOL {
            return Err(ConfigError::InvalidPoolSize {
                capacity: self.max_entities,
                min: MIN_ENTITY_POOL,
            });
        }
        let tuning = [
            ("player_speed", self.player_speed),
            ("player_fire_cooldown", self.player_fire_cooldown),
            ("projectile_speed", self.projectile_speed),
            ("enemy_projectile_speed", self.enemy_projectile_speed),
            ("enemy_speed", self.enemy_speed),
        ];
        for (field, value) in tuning {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }
        Ok(())
    }
}

/// Complete configuration for a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run seed (waves and enemy fire are derived from it)
    pub seed: u64,
    pub timing: LoopConfig,
    pub spatial: QuadtreeConfig,
    pub world: WorldConfig,
}

impl Config {
    /// Create a config using a difficulty preset
    pub fn from_preset(difficulty: Difficulty) -> Self {
        let mut config = Self::default();
        config.world.difficulty = difficulty;
        config
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        log::info!(
            "Loaded config: difficulty {}, step {:.4}s",
            config.world.difficulty.as_str(),
            config.timing.fixed_step
        );
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        self.spatial.validate()?;
        self.world.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            Config::from_json(r#"{ "seed": 7, "world": { "difficulty": "Hard" } }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.world.difficulty, Difficulty::Hard);
        assert_eq!(config.timing, LoopConfig::default());
        assert_eq!(config.spatial, QuadtreeConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = Config::from_preset(Difficulty::Easy);
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_timing() {
        let mut config = Config::default();
        config.timing.fixed_step = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFixedStep(_))
        ));

        let mut config = Config::default();
        config.timing.min_frame_delta = 0.5;
        config.timing.max_frame_delta = 0.25;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStepBounds { .. })
        ));

        let mut config = Config::default();
        config.timing.max_steps_per_frame = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxSteps)));
    }

    #[test]
    fn test_rejects_bad_world() {
        let mut config = Config::default();
        config.world.bounds.width = -5.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBoundary(_))
        ));

        let mut config = Config::default();
        config.world.bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PlayfieldTooSmall { .. })
        ));

        // Smallest accepted playfield still fits a row and the player
        let mut config = Config::default();
        config.world.bounds =
            BoundingBox::new(0.0, 0.0, MIN_PLAYFIELD_WIDTH, MIN_PLAYFIELD_HEIGHT);
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.world.max_entities = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPoolSize { .. })
        ));

        let mut config = Config::default();
        config.world.player_speed = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTuning { field: "player_speed", .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("norm"), Some(Difficulty::Normal));
        assert_eq!(Difficulty::from_str("nightmare"), None);
        assert_eq!(Difficulty::Easy.as_str(), "Easy");
    }
}
