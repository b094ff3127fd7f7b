//! Void Raiders entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use void_raiders::{Config, GameLoop, Session, TickInput};

    /// Game instance holding the loop and the session it drives
    struct Game {
        session: Rc<RefCell<Session>>,
        game_loop: GameLoop,
    }

    impl Game {
        fn new(seed: u64) -> Result<Self, JsValue> {
            let config = Config {
                seed,
                ..Config::default()
            };
            let mut session = Session::new(config.clone()).map_err(to_js)?;
            session.set_input(TickInput {
                idle_mode: true,
                ..Default::default()
            });
            let session = Rc::new(RefCell::new(session));

            let mut game_loop = GameLoop::new(config.timing).map_err(to_js)?;
            Session::attach(&session, &mut game_loop);
            game_loop.on_step_overflow(|overflow| {
                log::debug!("Dropped {:.3}s after {} steps", overflow.discarded, overflow.steps);
            });
            game_loop.start().map_err(to_js)?;

            Ok(Self { session, game_loop })
        }

        /// Run one animation frame. `time` is the rAF timestamp in milliseconds.
        fn frame(&mut self, time: f64) {
            if let Err(e) = self.game_loop.frame(time / 1000.0) {
                log::error!("Frame failed: {}", e);
                self.restart();
                return;
            }

            let events = self.session.borrow_mut().drain_events();
            for event in events {
                log::debug!("{:?}", event);
            }

            if self.session.borrow().is_game_over() {
                self.restart();
            }
        }

        fn restart(&mut self) {
            let seed = js_sys::Date::now() as u64;
            if let Err(e) = self.session.borrow_mut().restart(seed) {
                log::error!("Restart failed: {}", e);
                return;
            }
            self.game_loop.stop();
            if let Err(e) = self.game_loop.start() {
                log::error!("Loop restart failed: {}", e);
            }
        }
    }

    fn to_js(e: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(to_js)?;

        log::info!("Void Raiders starting...");

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)?));
        request_animation_frame(game);
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            log::error!("No window, stopping");
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Void Raiders (native) starting...");
    log::info!("Native mode runs a headless demo - build for wasm32 to play in the browser");

    if let Err(e) = demo::run(std::env::args().nth(1)) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless demo: the idle AI plays against a synthetic 60 Hz clock
#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::{Cell, RefCell};
    use std::error::Error;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use void_raiders::sim::GameEvent;
    use void_raiders::{Config, GameLoop, Session, TickInput};

    /// Simulated wall-clock length of the demo (seconds)
    const DEMO_SECONDS: f64 = 120.0;
    const FRAME: f64 = 1.0 / 60.0;
    /// Every this many frames the synthetic clock stalls
    const HITCH_EVERY: u64 = 600;
    const HITCH: f64 = 0.4;

    #[derive(Debug, Default)]
    struct Summary {
        frames: u64,
        runs: u32,
        kills: u32,
        hits: u32,
        waves_cleared: u32,
        best_score: u64,
        best_wave: u32,
    }

    pub fn run(config_path: Option<String>) -> Result<(), Box<dyn Error>> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading config from {}", path);
                Config::from_json(&std::fs::read_to_string(path)?)?
            }
            None => Config {
                seed: SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
                ..Config::default()
            },
        };

        let mut session = Session::new(config.clone())?;
        session.set_input(TickInput {
            idle_mode: true,
            ..Default::default()
        });
        let session = Rc::new(RefCell::new(session));

        let mut game_loop = GameLoop::new(config.timing)?;
        Session::attach(&session, &mut game_loop);
        let overflows = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&overflows);
        game_loop.on_step_overflow(move |_| counter.set(counter.get() + 1));
        game_loop.start()?;

        let mut summary = Summary {
            runs: 1,
            ..Default::default()
        };
        let mut now = 0.0;
        let mut next_seed = config.seed;

        while now < DEMO_SECONDS {
            summary.frames += 1;
            now += if summary.frames % HITCH_EVERY == 0 { HITCH } else { FRAME };
            game_loop.frame(now)?;

            let mut s = session.borrow_mut();
            for event in s.drain_events() {
                match event {
                    GameEvent::EnemyDestroyed { .. } => summary.kills += 1,
                    GameEvent::PlayerHit { .. } => summary.hits += 1,
                    GameEvent::WaveCleared { .. } => summary.waves_cleared += 1,
                    GameEvent::GameOver { score, wave } => {
                        summary.best_score = summary.best_score.max(score);
                        summary.best_wave = summary.best_wave.max(wave + 1);
                    }
                    _ => {}
                }
            }

            if s.is_game_over() {
                next_seed = next_seed.wrapping_add(1);
                s.restart(next_seed)?;
                summary.runs += 1;
            }
        }

        game_loop.stop();
        let s = session.borrow();
        summary.best_score = summary.best_score.max(s.state().score.score);
        summary.best_wave = summary.best_wave.max(s.state().wave_index + 1);

        log::info!(
            "Demo finished: {} frames, {} ticks, {} runs, {} step overflows",
            summary.frames,
            game_loop.total_steps(),
            summary.runs,
            overflows.get()
        );
        log::info!(
            "Kills {}, hits taken {}, waves cleared {}, best score {} (wave {})",
            summary.kills,
            summary.hits,
            summary.waves_cleared,
            summary.best_score,
            summary.best_wave
        );
        log::info!(
            "Final frame: {} sprites, {} entities in the enemy tree",
            s.snapshot().len(),
            s.collisions()
                .tree(void_raiders::sim::CollisionGroup::Enemies)
                .map_or(0, |tree| tree.stats().entries)
        );
        Ok(())
    }
}
