//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (slot arena order, insertion order per group)
//! - No rendering or platform dependencies

pub mod aabb;
pub mod collision;
pub mod quadtree;
pub mod state;
pub mod tick;
pub mod wave;

pub use aabb::BoundingBox;
pub use collision::{CollisionResult, CollisionSystem, Contact, check_collision};
pub use quadtree::{QuadNode, Quadtree, QuadtreeStats};
pub use state::{
    CollisionGroup, EnemyKind, Entity, EntityId, EntityKind, Expiry, ExpiryReason, GameEvent,
    GamePhase, GameState, Owner, Score,
};
pub use tick::{Collisions, TickInput, tick};
pub use wave::{formation_size, generate_wave};
