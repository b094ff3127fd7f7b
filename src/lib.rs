//! Void Raiders - a fixed-timestep arcade shooter
//!
//! Core modules:
//! - `game_loop`: Accumulator-based fixed-timestep scheduler with interpolation
//! - `sim`: Deterministic simulation (entities, quadtree broad-phase, collisions, waves)
//! - `session`: Game session context wiring the simulation to the loop
//! - `config`: Data-driven timing, spatial and gameplay tuning
//! - `error`: Error types

pub mod config;
pub mod error;
pub mod game_loop;
pub mod session;
pub mod sim;

pub use config::{Config, Difficulty, LoopConfig, QuadtreeConfig, WorldConfig};
pub use error::{
    CallbackError, CollisionError, ConfigError, LoopError, LoopPhase, SimError, ValidationError,
};
pub use game_loop::{FrameReport, GameLoop, StepOverflow};
pub use session::{Session, Sprite};
pub use sim::TickInput;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum fixed steps per frame before the backlog is dropped
    pub const MAX_SUBSTEPS: u32 = 10;
    /// Largest frame delta fed to the accumulator (seconds)
    pub const MAX_FRAME_DELTA: f64 = 0.25;

    /// Playfield dimensions
    pub const WORLD_WIDTH: f32 = 480.0;
    pub const WORLD_HEIGHT: f32 = 640.0;

    /// Quadtree defaults
    pub const QUADTREE_MAX_OBJECTS: usize = 10;
    pub const QUADTREE_MAX_LEVELS: u32 = 5;
    pub const QUADTREE_MIN_NODE_SIZE: f32 = 16.0;

    /// Entity pool
    pub const DEFAULT_MAX_ENTITIES: usize = 1024;
    pub const MIN_ENTITY_POOL: usize = 128;

    /// Player defaults
    pub const PLAYER_WIDTH: f32 = 28.0;
    pub const PLAYER_HEIGHT: f32 = 16.0;
    pub const PLAYER_SPEED: f32 = 240.0;
    pub const PLAYER_FIRE_COOLDOWN: f32 = 0.25;
    /// Distance from the bottom of the playfield to the player's center
    pub const PLAYER_BASELINE: f32 = 40.0;
    /// Invulnerability after being hit (ticks, 1.5 seconds at 120 Hz)
    pub const PLAYER_INVULNERABLE_TICKS: u32 = 180;

    /// Projectiles
    pub const PROJECTILE_WIDTH: f32 = 4.0;
    pub const PROJECTILE_HEIGHT: f32 = 10.0;
    pub const PROJECTILE_SPEED: f32 = 480.0;
    pub const ENEMY_PROJECTILE_SPEED: f32 = 220.0;
    /// Enemy shots expire after travelling this far
    pub const ENEMY_PROJECTILE_RANGE: f32 = 900.0;

    /// Enemies
    pub const ENEMY_WIDTH: f32 = 24.0;
    pub const ENEMY_HEIGHT: f32 = 18.0;
    pub const ENEMY_SPEED: f32 = 40.0;
    /// How far the formation drops when it reverses
    pub const ENEMY_DESCENT: f32 = 12.0;
    /// Seconds an enemy waits after firing
    pub const ENEMY_FIRE_COOLDOWN: f32 = 1.5;

    /// Particles
    pub const PARTICLES_PER_EXPLOSION: usize = 8;
    pub const PARTICLE_SIZE: f32 = 3.0;
    pub const PARTICLE_LIFETIME: f32 = 0.6;
    pub const PARTICLE_SPEED: f32 = 90.0;

    /// Between-wave rest (2 seconds at 120 Hz)
    pub const BREATHER_TICKS: u32 = 2 * 120;
}
