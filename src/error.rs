//! Error types
//!
//! Construction-time problems are `ConfigError`s, per-call geometry problems
//! are `ValidationError`s, and tick failures bubble up through `SimError` to
//! the loop, which reports them as `LoopError::Callback`.

use thiserror::Error;

/// Boxed error returned by loop callbacks
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid configuration, detected when an object is constructed
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fixed step must be finite and positive, got {0}")]
    InvalidFixedStep(f64),

    #[error("invalid frame delta bounds: min {min}, max {max} (fixed step {fixed_step})")]
    InvalidStepBounds { min: f64, max: f64, fixed_step: f64 },

    #[error("max steps per frame must be at least 1")]
    InvalidMaxSteps,

    #[error("quadtree max_objects must be at least 1")]
    InvalidMaxObjects,

    #[error("quadtree min_node_size must be finite and positive, got {0}")]
    InvalidMinNodeSize(f32),

    #[error("entity pool capacity must be at least {min}, got {capacity}")]
    InvalidPoolSize { capacity: usize, min: usize },

    #[error("invalid boundary: {0}")]
    InvalidBoundary(#[from] ValidationError),

    #[error("playfield {width}x{height} is smaller than the minimum {min_width}x{min_height}")]
    PlayfieldTooSmall {
        width: f32,
        height: f32,
        min_width: f32,
        min_height: f32,
    },

    #[error("invalid tuning value `{field}`: {value}")]
    InvalidTuning { field: &'static str, value: f32 },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A malformed bounding box passed to an insert or query
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValidationError {
    #[error("bounding box has non-finite coordinates ({x}, {y}, {width}, {height})")]
    NonFinite { x: f32, y: f32, width: f32, height: f32 },

    #[error("bounding box size must be positive, got {width}x{height}")]
    NonPositiveSize { width: f32, height: f32 },

    #[error("bounding box ({x}, {y}) lies outside the indexed region")]
    OutOfBounds { x: f32, y: f32 },
}

/// Collision system failures
#[derive(Debug, Error)]
pub enum CollisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("entity {0} has no collision group")]
    Unassigned(String),
}

/// Simulation tick failures
#[derive(Debug, Error)]
pub enum SimError {
    #[error("collision: {0}")]
    Collision(#[from] CollisionError),

    #[error("entity pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Which loop callback failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Update,
    Render,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Update => f.write_str("fixed update"),
            LoopPhase::Render => f.write_str("render"),
        }
    }
}

/// Game loop failures
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("game loop is already running")]
    AlreadyRunning,

    #[error("{phase} callback failed: {source}")]
    Callback {
        phase: LoopPhase,
        #[source]
        source: CallbackError,
    },
}
