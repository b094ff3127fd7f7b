//! Enemy wave generation
//!
//! A wave is a formation of rows laid out from a seed derived from the run
//! seed and the wave index, so the same run always replays the same waves.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::{EnemyKind, GameEvent, GameState};
use crate::consts::*;
use crate::error::SimError;

/// Horizontal/vertical cell size of the formation grid
pub const CELL: Vec2 = Vec2::new(ENEMY_WIDTH * 1.6, ENEMY_HEIGHT * 1.8);
/// Gap between the top of the playfield and the first row
pub const TOP_MARGIN: f32 = 60.0;

/// Rows and columns for a wave
pub fn formation_size(wave: u32) -> (u32, u32) {
    let rows = (3 + wave / 2).min(6);
    let cols = (6 + wave / 3).min(10);
    (rows, cols)
}

/// Spawn the formation for `state.wave_index` alongside any enemies still alive
pub fn generate_wave(state: &mut GameState) -> Result<usize, SimError> {
    let wave = state.wave_index;
    let bounds = state.bounds();
    let mut rng = Pcg32::seed_from_u64(state.seed ^ u64::from(wave).wrapping_mul(0x9E37_79B9_7F4A_7C15));

    let (rows, cols) = formation_size(wave);
    let cols = cols.min((bounds.width / CELL.x).floor().max(1.0) as u32);
    let origin_x = bounds.center().x - (cols as f32 - 1.0) * CELL.x / 2.0;

    let mut spawned = 0;
    for row in 0..rows {
        for col in 0..cols {
            // Gaps after the first wave
            if wave > 0 && spawned > 0 && rng.random_range(0..100) < 12 {
                continue;
            }
            let kind = determine_enemy_kind(wave, row, rng.random_range(0..100));
            let pos = Vec2::new(
                origin_x + col as f32 * CELL.x,
                bounds.y + TOP_MARGIN + row as f32 * CELL.y,
            );
            state.spawn_enemy(kind, pos)?;
            spawned += 1;
        }
    }

    state.enemy_direction = 1.0;
    state.push_event(GameEvent::WaveStarted {
        wave,
        enemies: spawned,
    });
    log::info!("Wave {}: {} enemies ({}x{})", wave + 1, spawned, rows, cols);
    Ok(spawned)
}

/// Enemy type based on wave progression and row (top rows are tougher)
fn determine_enemy_kind(wave: u32, row: u32, roll: u32) -> EnemyKind {
    // Wave 0: drones only (tutorial wave)
    if wave == 0 {
        return EnemyKind::Drone;
    }

    // Tanks from wave 2, top row only
    if wave >= 2 && row == 0 && roll < 30 + wave * 5 {
        return EnemyKind::Tank;
    }

    // Strikers get more common each wave
    let striker_chance = (10 + wave * 8).min(45);
    if roll < striker_chance {
        return EnemyKind::Striker;
    }

    EnemyKind::Drone
}
