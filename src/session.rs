//! Game session
//!
//! Owns everything one run needs (state, collision system, current input)
//! and adapts it to the loop's update/render callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::config::Config;
use crate::error::SimError;
use crate::game_loop::GameLoop;
use crate::sim::{
    CollisionSystem, Collisions, EntityId, EntityKind, GameEvent, GamePhase, GameState, TickInput,
    generate_wave, tick,
};

/// One entity as the renderer should draw it this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Interpolated center
    pub pos: Vec2,
    pub size: Vec2,
}

/// A single run of the game
#[derive(Debug)]
pub struct Session {
    config: Config,
    state: GameState,
    collisions: Collisions,
    input: TickInput,
    /// Sprites from the most recent render callback
    snapshot: Vec<Sprite>,
}

impl Session {
    /// Validate the config, spawn the player and the first wave
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        let collisions = CollisionSystem::new(config.world.bounds, config.spatial)?;
        let mut state = GameState::new(config.seed, config.world.clone())?;
        generate_wave(&mut state)?;

        log::info!(
            "New session: seed {}, difficulty {}",
            config.seed,
            config.world.difficulty.as_str()
        );

        Ok(Self {
            config,
            state,
            collisions,
            input: TickInput::default(),
            snapshot: Vec::new(),
        })
    }

    /// Start over with a new seed, keeping the config and held input
    pub fn restart(&mut self, seed: u64) -> Result<(), SimError> {
        let mut config = self.config.clone();
        config.seed = seed;
        let input = TickInput {
            pause: false,
            ..self.input.clone()
        };
        *self = Self::new(config)?;
        self.input = input;
        Ok(())
    }

    /// Run one fixed simulation step
    pub fn fixed_update(&mut self, dt: f32) -> Result<(), SimError> {
        tick(&mut self.state, &mut self.collisions, &self.input, dt)?;
        // Clear one-shot inputs after processing
        self.input.pause = false;
        Ok(())
    }

    /// Interpolated draw list for the current frame
    pub fn render_frame(&self, alpha: f32) -> Vec<Sprite> {
        self.state
            .entities
            .iter()
            .filter(|(_, e)| e.active)
            .map(|(id, e)| Sprite {
                id,
                kind: e.kind,
                pos: e.render_position(alpha),
                size: e.size,
            })
            .collect()
    }

    pub fn set_input(&mut self, input: TickInput) {
        self.input = input;
    }

    pub fn input_mut(&mut self) -> &mut TickInput {
        &mut self.input
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn collisions(&self) -> &Collisions {
        &self.collisions
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> &[Sprite] {
        &self.snapshot
    }

    pub fn is_game_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// Register this session's update and render callbacks on `game_loop`
    pub fn attach(session: &Rc<RefCell<Session>>, game_loop: &mut GameLoop) {
        let update = Rc::clone(session);
        let render = Rc::clone(session);
        game_loop
            .on_update(move |dt| {
                update.borrow_mut().fixed_update(dt)?;
                Ok(())
            })
            .on_render(move |alpha| {
                let mut session = render.borrow_mut();
                session.snapshot = session.render_frame(alpha);
                Ok(())
            });
    }
}
