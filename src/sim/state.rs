//! Game state and core simulation types
//!
//! Entities live in a generational slot arena: a destroyed entity's slot is
//! reused, but its old `EntityId` never resolves to the new occupant.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use super::aabb::BoundingBox;
use crate::config::WorldConfig;
use crate::consts::*;
use crate::error::SimError;

new_key_type! {
    /// Slot-keyed handle to an entity in the arena
    pub struct EntityId;
}

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Between-wave rest period
    Breather,
    /// Game is paused
    Paused,
    /// Run ended
    GameOver,
}

/// Named collision groups. Particles have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionGroup {
    Player,
    Enemies,
    PlayerShots,
    EnemyShots,
}

/// Who fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy,
}

/// Enemy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyKind {
    #[default]
    Drone,
    Striker,
    Tank,
}

impl EnemyKind {
    pub fn hp(&self) -> u8 {
        match self {
            EnemyKind::Drone => 1,
            EnemyKind::Striker => 1,
            EnemyKind::Tank => 3,
        }
    }

    /// Base points for destroying one
    pub fn points(&self) -> u64 {
        match self {
            EnemyKind::Drone => 100,
            EnemyKind::Striker => 150,
            EnemyKind::Tank => 300,
        }
    }

    /// Fire chance multiplier
    pub fn aggression(&self) -> f32 {
        match self {
            EnemyKind::Drone => 1.0,
            EnemyKind::Striker => 2.0,
            EnemyKind::Tank => 0.5,
        }
    }
}

/// Entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy(EnemyKind),
    Projectile(Owner),
    Particle,
}

impl EntityKind {
    pub fn collision_group(&self) -> Option<CollisionGroup> {
        match self {
            EntityKind::Player => Some(CollisionGroup::Player),
            EntityKind::Enemy(_) => Some(CollisionGroup::Enemies),
            EntityKind::Projectile(Owner::Player) => Some(CollisionGroup::PlayerShots),
            EntityKind::Projectile(Owner::Enemy) => Some(CollisionGroup::EnemyShots),
            EntityKind::Particle => None,
        }
    }
}

/// Why an entity expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryReason {
    Age,
    Distance,
    OutOfBounds,
}

/// Expiry policy, evaluated after movement each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Expiry {
    /// Seconds alive before expiring
    pub max_age: Option<f32>,
    /// Distance from the spawn point before expiring
    pub max_distance: Option<f32>,
    /// Expire once the bounding box no longer overlaps the playfield
    pub outside_bounds: bool,
}

impl Expiry {
    pub const NEVER: Expiry = Expiry {
        max_age: None,
        max_distance: None,
        outside_bounds: false,
    };

    pub fn age(seconds: f32) -> Self {
        Self {
            max_age: Some(seconds),
            ..Self::NEVER
        }
    }

    pub fn offscreen() -> Self {
        Self {
            outside_bounds: true,
            ..Self::NEVER
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.max_distance = Some(distance);
        self
    }
}

/// A simulated entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Center position
    pub pos: Vec2,
    /// Position at the start of the current tick (for render interpolation)
    pub prev_pos: Vec2,
    /// Spawn point (for distance-based expiry)
    pub origin: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub active: bool,
    pub hp: u8,
    /// Seconds alive
    pub age: f32,
    pub expiry: Expiry,
    /// Seconds until this entity may fire again
    pub cooldown: f32,
}

impl Entity {
    pub fn new(kind: EntityKind, pos: Vec2, size: Vec2) -> Self {
        Self {
            kind,
            pos,
            prev_pos: pos,
            origin: pos,
            vel: Vec2::ZERO,
            size,
            active: true,
            hp: 1,
            age: 0.0,
            expiry: Expiry::NEVER,
            cooldown: 0.0,
        }
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_hp(mut self, hp: u8) -> Self {
        self.hp = hp;
        self
    }

    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_center(self.pos, self.size)
    }

    #[inline]
    pub fn group(&self) -> Option<CollisionGroup> {
        self.kind.collision_group()
    }

    /// Position blended between the last two ticks
    #[inline]
    pub fn render_position(&self, alpha: f32) -> Vec2 {
        self.prev_pos + (self.pos - self.prev_pos) * alpha
    }

    /// Check the expiry policy against the playfield
    pub fn expiry_reason(&self, world: &BoundingBox) -> Option<ExpiryReason> {
        if self.expiry.max_age.is_some_and(|max_age| self.age >= max_age) {
            return Some(ExpiryReason::Age);
        }
        if self
            .expiry
            .max_distance
            .is_some_and(|max_distance| self.pos.distance(self.origin) >= max_distance)
        {
            return Some(ExpiryReason::Distance);
        }
        if self.expiry.outside_bounds && !world.intersects(&self.bounds()) {
            return Some(ExpiryReason::OutOfBounds);
        }
        None
    }
}

/// Events for the host (sound, UI). Not gameplay-affecting.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    EnemyDestroyed {
        id: EntityId,
        kind: EnemyKind,
        points: u64,
    },
    PlayerHit {
        lives: u8,
    },
    EntityExpired {
        id: EntityId,
        reason: ExpiryReason,
    },
    /// An entity with a collision group was removed from the arena
    EntityDestroyed {
        id: EntityId,
    },
    WaveCleared {
        wave: u32,
    },
    WaveStarted {
        wave: u32,
        enemies: usize,
    },
    GameOver {
        score: u64,
        wave: u32,
    },
}

/// Score and combo tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u64,
    pub combo: u32,
    pub best_combo: u32,
    pub kills: u32,
}

impl Score {
    /// Record a kill and return the points awarded
    pub fn register_kill(&mut self, points: u64) -> u64 {
        self.combo += 1;
        self.best_combo = self.best_combo.max(self.combo);
        self.kills += 1;
        // +10% per 5 chained kills
        let awarded = points + points * u64::from(self.combo / 5) / 10;
        self.score += awarded;
        awarded
    }

    pub fn break_combo(&mut self) {
        self.combo = 0;
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Fresh generator for the next consumer; each call uses a new stream
    pub fn next_rng(&mut self) -> Pcg32 {
        let rng = Pcg32::new(self.seed, self.stream);
        self.stream += 1;
        rng
    }
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng_state: RngState,
    pub config: WorldConfig,
    /// Current wave index (0-based)
    pub wave_index: u32,
    pub lives: u8,
    pub score: Score,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    /// Breather timer (ticks remaining)
    pub breather_ticks: u32,
    /// Ticks of invulnerability left after a hit
    pub invulnerable_ticks: u32,
    /// Formation sweep direction (+1 right, -1 left)
    pub enemy_direction: f32,
    pub player: EntityId,
    pub entities: SlotMap<EntityId, Entity>,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new game state with the player spawned and no enemies
    pub fn new(seed: u64, config: WorldConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut entities = SlotMap::with_capacity_and_key(config.max_entities);
        let bounds = config.bounds;
        let player_pos = Vec2::new(
            bounds.center().x,
            bounds.bottom() - PLAYER_BASELINE,
        );
        let player = entities.insert(Entity::new(
            EntityKind::Player,
            player_pos,
            Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
        ));

        Ok(Self {
            seed,
            rng_state: RngState::new(seed),
            lives: config.difficulty.lives(),
            config,
            wave_index: 0,
            score: Score::default(),
            time_ticks: 0,
            phase: GamePhase::Playing,
            breather_ticks: 0,
            invulnerable_ticks: 0,
            enemy_direction: 1.0,
            player,
            entities,
            events: Vec::new(),
        })
    }

    pub fn bounds(&self) -> BoundingBox {
        self.config.bounds
    }

    /// Add an entity to the arena
    pub fn spawn(&mut self, entity: Entity) -> Result<EntityId, SimError> {
        if self.entities.len() >= self.config.max_entities {
            return Err(SimError::PoolExhausted {
                capacity: self.config.max_entities,
            });
        }
        Ok(self.entities.insert(entity))
    }

    pub fn spawn_enemy(&mut self, kind: EnemyKind, pos: Vec2) -> Result<EntityId, SimError> {
        let mut enemy = Entity::new(
            EntityKind::Enemy(kind),
            pos,
            Vec2::new(ENEMY_WIDTH, ENEMY_HEIGHT),
        )
        .with_hp(kind.hp());
        // Stagger the first volley
        enemy.cooldown = ENEMY_FIRE_COOLDOWN * (1 + self.entities.len() % 3) as f32;
        self.spawn(enemy)
    }

    pub fn spawn_projectile(
        &mut self,
        owner: Owner,
        pos: Vec2,
        vel: Vec2,
    ) -> Result<EntityId, SimError> {
        let expiry = match owner {
            Owner::Player => Expiry::offscreen(),
            Owner::Enemy => Expiry::offscreen().with_distance(ENEMY_PROJECTILE_RANGE),
        };
        self.spawn(
            Entity::new(
                EntityKind::Projectile(owner),
                pos,
                Vec2::new(PROJECTILE_WIDTH, PROJECTILE_HEIGHT),
            )
            .with_velocity(vel)
            .with_expiry(expiry),
        )
    }

    /// Burst of particles. Cosmetic, so a full pool just drops the rest.
    pub fn spawn_explosion(&mut self, center: Vec2) {
        let count = self.config.particles_per_explosion;
        for i in 0..count {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            let vel = Vec2::from_angle(angle) * PARTICLE_SPEED;
            let particle = Entity::new(
                EntityKind::Particle,
                center,
                Vec2::splat(PARTICLE_SIZE),
            )
            .with_velocity(vel)
            .with_expiry(Expiry::age(PARTICLE_LIFETIME));
            if self.spawn(particle).is_err() {
                log::debug!("Entity pool full, dropping {} particles", count - i);
                break;
            }
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(self.player)
    }

    /// True if the entity exists and has not been deactivated this tick
    pub fn is_active(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(|e| e.active)
    }

    pub fn enemy_count(&self) -> usize {
        self.entities
            .values()
            .filter(|e| e.active && matches!(e.kind, EntityKind::Enemy(_)))
            .count()
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
