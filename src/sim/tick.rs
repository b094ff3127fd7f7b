//! Fixed timestep simulation tick
//!
//! One call advances every active entity by `dt`:
//! movement, expiry, collision rebuild and resolution, then removal of
//! everything deactivated during the tick.

use glam::Vec2;
use rand::Rng;

use super::collision::CollisionSystem;
use super::state::{
    CollisionGroup, EntityId, EntityKind, GameEvent, GamePhase, GameState, Owner,
};
use super::wave::generate_wave;
use crate::consts::*;
use crate::error::SimError;

/// Collision system keyed the way the simulation uses it
pub type Collisions = CollisionSystem<CollisionGroup, EntityId>;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement direction, each axis in [-1, 1]
    pub move_axis: Vec2,
    /// Hold to fire
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(
    state: &mut GameState,
    collisions: &mut Collisions,
    input: &TickInput,
    dt: f32,
) -> Result<(), SimError> {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing | GamePhase::Breather => {
                state.phase = GamePhase::Paused;
                return Ok(());
            }
            GamePhase::Paused => {
                state.phase = if state.enemy_count() > 0 {
                    GamePhase::Playing
                } else {
                    GamePhase::Breather
                };
            }
            GamePhase::GameOver => {}
        }
    }

    // Don't tick if paused or game over
    if matches!(state.phase, GamePhase::Paused | GamePhase::GameOver) {
        return Ok(());
    }

    let input = if input.idle_mode {
        idle_input(state)
    } else {
        input.clone()
    };

    state.time_ticks += 1;
    state.invulnerable_ticks = state.invulnerable_ticks.saturating_sub(1);

    for entity in state.entities.values_mut() {
        entity.prev_pos = entity.pos;
    }

    update_player(state, &input, dt)?;
    update_enemies(state, dt)?;
    integrate(state, dt);
    expire(state);
    resolve_collisions(state, collisions)?;
    sweep(state, collisions);
    update_wave(state)?;

    Ok(())
}

/// Demo AI: chase the lowest enemy and keep firing
fn idle_input(state: &GameState) -> TickInput {
    let Some(player) = state.player() else {
        return TickInput::default();
    };

    let target = state
        .entities
        .values()
        .filter(|e| e.active && matches!(e.kind, EntityKind::Enemy(_)))
        .max_by(|a, b| {
            a.pos
                .y
                .partial_cmp(&b.pos.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    // Add oscillating offset based on time to avoid perfect tracking
    let time_factor = state.time_ticks as f32 * 0.01;
    let wobble = time_factor.sin() * 12.0;

    let dx = match target {
        Some(enemy) => enemy.pos.x + wobble - player.pos.x,
        None => state.bounds().center().x - player.pos.x,
    };

    TickInput {
        move_axis: Vec2::new((dx / 8.0).clamp(-1.0, 1.0), 0.0),
        fire: target.is_some(),
        pause: false,
        idle_mode: true,
    }
}

fn update_player(state: &mut GameState, input: &TickInput, dt: f32) -> Result<(), SimError> {
    let speed = state.config.player_speed;
    let fire_cooldown = state.config.player_fire_cooldown;
    let projectile_speed = state.config.projectile_speed;

    let Some(player) = state.entities.get_mut(state.player) else {
        return Ok(());
    };

    let axis = input.move_axis.clamp(Vec2::NEG_ONE, Vec2::ONE);
    player.vel = if axis.length_squared() > 1.0 {
        axis.normalize() * speed
    } else {
        axis * speed
    };
    player.cooldown = (player.cooldown - dt).max(0.0);

    if input.fire && player.cooldown <= 0.0 {
        player.cooldown = fire_cooldown;
        let muzzle = player.pos - Vec2::new(0.0, player.size.y / 2.0 + PROJECTILE_HEIGHT / 2.0);
        state.spawn_projectile(Owner::Player, muzzle, Vec2::new(0.0, -projectile_speed))?;
    }

    Ok(())
}

fn update_enemies(state: &mut GameState, dt: f32) -> Result<(), SimError> {
    let bounds = state.bounds();
    let difficulty = state.config.difficulty;
    let speed =
        state.config.enemy_speed * difficulty.enemy_speed() * (1.0 + state.wave_index as f32 * 0.1);
    let fire_rate = difficulty.enemy_fire_rate();
    let shot_speed = state.config.enemy_projectile_speed;

    // Reverse and drop the whole formation when any member would leave the field
    let step = state.enemy_direction * speed * dt;
    let hits_edge = state
        .entities
        .values()
        .filter(|e| e.active && matches!(e.kind, EntityKind::Enemy(_)))
        .any(|e| {
            let b = e.bounds();
            b.x + step < bounds.x || b.right() + step > bounds.right()
        });
    if hits_edge {
        state.enemy_direction = -state.enemy_direction;
    }

    let mut rng = state.rng_state.next_rng();
    let mut shots = Vec::new();

    for enemy in state.entities.values_mut() {
        let EntityKind::Enemy(kind) = enemy.kind else {
            continue;
        };
        if !enemy.active {
            continue;
        }
        enemy.vel = Vec2::new(state.enemy_direction * speed, 0.0);
        if hits_edge {
            enemy.pos.y += ENEMY_DESCENT;
        }

        enemy.cooldown = (enemy.cooldown - dt).max(0.0);
        if enemy.cooldown <= 0.0 && rng.random::<f32>() < fire_rate * kind.aggression() * dt {
            enemy.cooldown = ENEMY_FIRE_COOLDOWN;
            shots.push(enemy.pos + Vec2::new(0.0, enemy.size.y / 2.0 + PROJECTILE_HEIGHT / 2.0));
        }
    }

    for muzzle in shots {
        state.spawn_projectile(Owner::Enemy, muzzle, Vec2::new(0.0, shot_speed))?;
    }

    Ok(())
}

/// Move everything by its velocity. Order doesn't matter here.
fn integrate(state: &mut GameState, dt: f32) {
    let bounds = state.bounds();
    for (id, entity) in state.entities.iter_mut() {
        if !entity.active {
            continue;
        }
        entity.pos += entity.vel * dt;
        entity.age += dt;

        if id == state.player {
            let half = entity.size / 2.0;
            let min = Vec2::new(bounds.x, bounds.y) + half;
            let max = Vec2::new(bounds.right(), bounds.bottom()) - half;
            entity.pos = entity.pos.clamp(min, max);
        }
    }
}

/// Age, distance and boundary expiry, after movement and before the rebuild
fn expire(state: &mut GameState) {
    let bounds = state.bounds();
    let mut expired = Vec::new();
    let mut landed = 0;

    for (id, entity) in state.entities.iter_mut() {
        if !entity.active {
            continue;
        }
        if let Some(reason) = entity.expiry_reason(&bounds) {
            entity.active = false;
            expired.push((id, reason));
        } else if matches!(entity.kind, EntityKind::Enemy(_)) && entity.bounds().bottom() >= bounds.bottom() {
            // Reached the bottom of the field
            entity.active = false;
            landed += 1;
        }
    }

    for (id, reason) in expired {
        state.push_event(GameEvent::EntityExpired { id, reason });
    }
    for _ in 0..landed {
        player_hit(state);
    }
}

fn resolve_collisions(state: &mut GameState, collisions: &mut Collisions) -> Result<(), SimError> {
    collisions.clear();
    for (id, entity) in state.entities.iter() {
        if !entity.active {
            continue;
        }
        let Some(group) = entity.group() else {
            continue;
        };
        if collisions.group_of(id).is_none() {
            collisions.assign(id, group);
        }
        collisions.insert(id, entity.bounds())?;
    }

    // Player shots vs enemies
    let mut explosions = Vec::new();
    for contact in collisions.collide_groups(CollisionGroup::PlayerShots, CollisionGroup::Enemies)? {
        if !state.is_active(contact.a) || !state.is_active(contact.b) {
            continue;
        }
        if let Some(shot) = state.get_mut(contact.a) {
            shot.active = false;
        }
        let Some(enemy) = state.get_mut(contact.b) else {
            continue;
        };
        enemy.hp = enemy.hp.saturating_sub(1);
        if enemy.hp > 0 {
            continue;
        }
        enemy.active = false;
        let center = enemy.pos;
        let EntityKind::Enemy(kind) = enemy.kind else {
            continue;
        };
        let points = state.score.register_kill(kind.points());
        state.push_event(GameEvent::EnemyDestroyed {
            id: contact.b,
            kind,
            points,
        });
        explosions.push(center);
    }
    for center in explosions {
        state.spawn_explosion(center);
    }

    // Enemy shots vs player
    for contact in collisions.collide_groups(CollisionGroup::EnemyShots, CollisionGroup::Player)? {
        if !state.is_active(contact.a) || !state.is_active(contact.b) {
            continue;
        }
        if let Some(shot) = state.get_mut(contact.a) {
            shot.active = false;
        }
        player_hit(state);
    }

    // Enemies ramming the player: push the player out along the shallower axis
    for contact in collisions.collide_groups(CollisionGroup::Enemies, CollisionGroup::Player)? {
        if !state.is_active(contact.a) || !state.is_active(contact.b) {
            continue;
        }
        let Some(enemy_pos) = state.get(contact.a).map(|e| e.pos) else {
            continue;
        };
        if let Some(player) = state.get_mut(contact.b) {
            player.pos += push_out(player.pos, enemy_pos, contact.overlap);
        }
        player_hit(state);
    }

    Ok(())
}

/// Minimum translation moving a box at `pos` off one at `other`
fn push_out(pos: Vec2, other: Vec2, overlap: Vec2) -> Vec2 {
    let away = pos - other;
    if overlap.x < overlap.y {
        Vec2::new(if away.x < 0.0 { -overlap.x } else { overlap.x }, 0.0)
    } else {
        Vec2::new(0.0, if away.y < 0.0 { -overlap.y } else { overlap.y })
    }
}

fn player_hit(state: &mut GameState) {
    if state.invulnerable_ticks > 0 || state.phase == GamePhase::GameOver {
        return;
    }
    state.lives = state.lives.saturating_sub(1);
    state.score.break_combo();
    state.invulnerable_ticks = PLAYER_INVULNERABLE_TICKS;
    state.push_event(GameEvent::PlayerHit { lives: state.lives });

    if state.lives == 0 {
        state.phase = GamePhase::GameOver;
        state.push_event(GameEvent::GameOver {
            score: state.score.score,
            wave: state.wave_index,
        });
        log::info!(
            "Game over: score {} on wave {}",
            state.score.score,
            state.wave_index + 1
        );
    }
}

/// Remove deactivated entities and tell the collision system they are gone
fn sweep(state: &mut GameState, collisions: &mut Collisions) {
    let dead: Vec<EntityId> = state
        .entities
        .iter()
        .filter(|(id, e)| !e.active && *id != state.player)
        .map(|(id, _)| id)
        .collect();

    for id in dead {
        state.entities.remove(id);
        if collisions.forget(id) {
            state.push_event(GameEvent::EntityDestroyed { id });
        }
    }
}

fn update_wave(state: &mut GameState) -> Result<(), SimError> {
    match state.phase {
        GamePhase::Playing if state.enemy_count() == 0 => {
            state.phase = GamePhase::Breather;
            state.breather_ticks = BREATHER_TICKS;
            state.push_event(GameEvent::WaveCleared {
                wave: state.wave_index,
            });
            log::info!("Wave {} cleared", state.wave_index + 1);
        }
        GamePhase::Breather => {
            state.breather_ticks = state.breather_ticks.saturating_sub(1);
            if state.breather_ticks == 0 {
                state.wave_index += 1;
                generate_wave(state)?;
                state.phase = GamePhase::Playing;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QuadtreeConfig, WorldConfig};
    use crate::sim::state::{EnemyKind, Entity, ExpiryReason};

    fn setup() -> (GameState, Collisions) {
        let config = WorldConfig::default();
        let collisions = CollisionSystem::new(config.bounds, QuadtreeConfig::default()).unwrap();
        let state = GameState::new(12345, config).unwrap();
        (state, collisions)
    }

    fn player_pos(state: &GameState) -> Vec2 {
        state.player().unwrap().pos
    }

    #[test]
    fn test_player_moves_and_is_clamped() {
        let (mut state, mut collisions) = setup();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0)).unwrap();
        let start = player_pos(&state);

        let input = TickInput {
            move_axis: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        tick(&mut state, &mut collisions, &input, SIM_DT).unwrap();
        let moved = player_pos(&state);
        assert!((moved.x - (start.x + PLAYER_SPEED * SIM_DT)).abs() < 0.001);
        assert_eq!(state.player().unwrap().prev_pos, start);

        for _ in 0..600 {
            tick(&mut state, &mut collisions, &input, SIM_DT).unwrap();
        }
        let right = state.player().unwrap().bounds().right();
        assert!((right - state.bounds().right()).abs() < 0.001);
    }

    #[test]
    fn test_shot_destroys_enemy() {
        let (mut state, mut collisions) = setup();
        let enemy = state.spawn_enemy(EnemyKind::Drone, Vec2::new(240.0, 300.0)).unwrap();
        state.get_mut(enemy).unwrap().cooldown = 100.0;
        // Second enemy keeps the wave alive
        let other = state.spawn_enemy(EnemyKind::Drone, Vec2::new(60.0, 100.0)).unwrap();
        state.get_mut(other).unwrap().cooldown = 100.0;
        let shot = state
            .spawn_projectile(Owner::Player, Vec2::new(240.0, 312.0), Vec2::new(0.0, -480.0))
            .unwrap();

        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();

        assert!(state.get(enemy).is_none());
        assert!(state.get(shot).is_none());
        assert_eq!(state.score.kills, 1);
        assert_eq!(state.score.score, EnemyKind::Drone.points());
        assert!(collisions.group_of(enemy).is_none());

        let events = state.drain_events();
        assert!(events.contains(&GameEvent::EnemyDestroyed {
            id: enemy,
            kind: EnemyKind::Drone,
            points: 100
        }));
        assert!(events.contains(&GameEvent::EntityDestroyed { id: enemy }));
        assert!(events.contains(&GameEvent::EntityDestroyed { id: shot }));
        let particles = state
            .entities
            .values()
            .filter(|e| e.kind == EntityKind::Particle)
            .count();
        assert_eq!(particles, PARTICLES_PER_EXPLOSION);
    }

    #[test]
    fn test_one_shot_damages_one_enemy() {
        let (mut state, mut collisions) = setup();
        // Two overlapping tanks, one shot between them
        let a = state.spawn_enemy(EnemyKind::Tank, Vec2::new(236.0, 300.0)).unwrap();
        let b = state.spawn_enemy(EnemyKind::Tank, Vec2::new(244.0, 300.0)).unwrap();
        state
            .spawn_projectile(Owner::Player, Vec2::new(240.0, 305.0), Vec2::ZERO)
            .unwrap();

        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();

        let hp_a = state.get(a).unwrap().hp;
        let hp_b = state.get(b).unwrap().hp;
        assert_eq!(hp_a + hp_b, 2 * EnemyKind::Tank.hp() - 1);
    }

    #[test]
    fn test_expired_projectile_removed() {
        let (mut state, mut collisions) = setup();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0)).unwrap();
        let shot = state
            .spawn_projectile(Owner::Player, Vec2::new(400.0, 2.0), Vec2::new(0.0, -480.0))
            .unwrap();

        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        assert!(state.get(shot).is_some());

        for _ in 0..5 {
            tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        }
        assert!(state.get(shot).is_none());
        assert!(state.drain_events().contains(&GameEvent::EntityExpired {
            id: shot,
            reason: ExpiryReason::OutOfBounds
        }));
    }

    #[test]
    fn test_enemy_shot_hits_player_once() {
        let (mut state, mut collisions) = setup();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0)).unwrap();
        let target = player_pos(&state);
        for dx in [-2.0, 2.0] {
            state
                .spawn_projectile(Owner::Enemy, target + Vec2::new(dx, 0.0), Vec2::ZERO)
                .unwrap();
        }

        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();

        // Second shot lands during invulnerability
        assert_eq!(state.lives, 2);
        assert_eq!(state.invulnerable_ticks, PLAYER_INVULNERABLE_TICKS);
        assert_eq!(state.score.combo, 0);
    }

    #[test]
    fn test_ramming_enemy_pushes_player() {
        let (mut state, mut collisions) = setup();
        let p = player_pos(&state);
        let enemy = state
            .spawn_enemy(EnemyKind::Drone, p + Vec2::new(20.0, 0.0))
            .unwrap();
        state.get_mut(enemy).unwrap().cooldown = 100.0;

        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();

        // Pushed left along x, the shallower axis
        let player = state.player().unwrap();
        let enemy = state.get(enemy).unwrap().bounds();
        assert!((player.bounds().right() - enemy.x).abs() < 0.001);
        assert_eq!(player.pos.y, p.y);
        assert_eq!(state.lives, 2);
    }

    #[test]
    fn test_last_life_ends_game() {
        let (mut state, mut collisions) = setup();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0)).unwrap();
        state.lives = 1;
        let target = player_pos(&state);
        state
            .spawn_projectile(Owner::Enemy, target, Vec2::ZERO)
            .unwrap();

        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        assert_eq!(state.phase, GamePhase::GameOver);

        let ticks = state.time_ticks;
        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_wave_cleared_then_next_wave() {
        let (mut state, mut collisions) = setup();
        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        assert_eq!(state.phase, GamePhase::Breather);
        assert!(state.drain_events().contains(&GameEvent::WaveCleared { wave: 0 }));

        for _ in 0..BREATHER_TICKS {
            tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        }
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.wave_index, 1);
        assert!(state.enemy_count() > 0);
    }

    #[test]
    fn test_tick_pause() {
        let (mut state, mut collisions) = setup();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0)).unwrap();

        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &mut collisions, &input, SIM_DT).unwrap();
        assert_eq!(state.phase, GamePhase::Paused);

        let ticks = state.time_ticks;
        tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        assert_eq!(state.time_ticks, ticks);

        tick(&mut state, &mut collisions, &input, SIM_DT).unwrap();
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_particles_expire_by_age() {
        let (mut state, mut collisions) = setup();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0)).unwrap();
        let particle = state
            .spawn(
                Entity::new(EntityKind::Particle, Vec2::new(200.0, 200.0), Vec2::ONE)
                    .with_expiry(crate::sim::state::Expiry::age(0.05)),
            )
            .unwrap();

        for _ in 0..5 {
            tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        }
        assert!(state.get(particle).is_some());
        for _ in 0..2 {
            tick(&mut state, &mut collisions, &TickInput::default(), SIM_DT).unwrap();
        }
        assert!(state.get(particle).is_none());
        // Particles have no collision group, so no destroyed notification
        assert!(
            !state
                .drain_events()
                .contains(&GameEvent::EntityDestroyed { id: particle })
        );
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let (mut state, mut collisions) = setup();
            generate_wave(&mut state).unwrap();
            let input = TickInput {
                idle_mode: true,
                ..Default::default()
            };
            for _ in 0..1200 {
                tick(&mut state, &mut collisions, &input, SIM_DT).unwrap();
            }
            let positions: Vec<Vec2> = state.entities.values().map(|e| e.pos).collect();
            (state.time_ticks, state.score.clone(), state.lives, positions)
        };
        assert_eq!(run(), run());
    }
}
