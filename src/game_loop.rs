//! Fixed-timestep game loop
//!
//! The host calls [`GameLoop::frame`] once per animation frame with its own
//! clock. Elapsed time is clamped and accumulated, then drained in whole
//! fixed steps; whatever is left over becomes the render interpolation
//! factor. A step cap per frame keeps a long stall from turning into a
//! spiral of catch-up updates.

use crate::config::LoopConfig;
use crate::error::{CallbackError, ConfigError, LoopError, LoopPhase};

type StepCallback = Box<dyn FnMut(f32) -> Result<(), CallbackError>>;
type OverflowCallback = Box<dyn FnMut(StepOverflow)>;

/// Reported when a frame hits the step cap with time still pending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOverflow {
    /// Fixed updates run this frame
    pub steps: u32,
    /// Seconds of simulation time thrown away
    pub discarded: f64,
}

/// What one call to `frame` did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed updates run
    pub steps: u32,
    /// Render blend factor in [0, 1)
    pub interpolation: f32,
    /// The step cap was hit and the backlog discarded
    pub overflowed: bool,
}

/// Accumulator-based fixed-timestep scheduler
pub struct GameLoop {
    config: LoopConfig,
    running: bool,
    /// Host timestamp of the previous frame, None until the first frame after start
    last_time: Option<f64>,
    accumulator: f64,
    total_steps: u64,
    on_update: Option<StepCallback>,
    on_render: Option<StepCallback>,
    on_step_overflow: Option<OverflowCallback>,
}

impl std::fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("config", &self.config)
            .field("running", &self.running)
            .field("last_time", &self.last_time)
            .field("accumulator", &self.accumulator)
            .field("total_steps", &self.total_steps)
            .finish_non_exhaustive()
    }
}

impl GameLoop {
    pub fn new(config: LoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            running: false,
            last_time: None,
            accumulator: 0.0,
            total_steps: 0,
            on_update: None,
            on_render: None,
            on_step_overflow: None,
        })
    }

    /// Called once per fixed step with the step length in seconds
    pub fn on_update(
        &mut self,
        callback: impl FnMut(f32) -> Result<(), CallbackError> + 'static,
    ) -> &mut Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Called once per frame with the interpolation factor
    pub fn on_render(
        &mut self,
        callback: impl FnMut(f32) -> Result<(), CallbackError> + 'static,
    ) -> &mut Self {
        self.on_render = Some(Box::new(callback));
        self
    }

    /// Called when a frame's backlog is discarded
    pub fn on_step_overflow(&mut self, callback: impl FnMut(StepOverflow) + 'static) -> &mut Self {
        self.on_step_overflow = Some(Box::new(callback));
        self
    }

    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.running {
            return Err(LoopError::AlreadyRunning);
        }
        self.running = true;
        self.last_time = None;
        self.accumulator = 0.0;
        log::info!(
            "Game loop started (step {:.4}s, max {} steps/frame)",
            self.config.fixed_step,
            self.config.max_steps_per_frame
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            log::info!("Game loop stopped after {} steps", self.total_steps);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Unsimulated time carried into the next frame
    pub fn accumulated(&self) -> f64 {
        self.accumulator
    }

    pub fn fixed_step(&self) -> f64 {
        self.config.fixed_step
    }

    /// Fixed updates completed since construction
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Advance by one host frame. `now` is the host clock in seconds.
    pub fn frame(&mut self, now: f64) -> Result<FrameReport, LoopError> {
        if !self.running {
            return Ok(FrameReport::default());
        }

        let raw = match self.last_time {
            Some(last) => now - last,
            None => 0.0,
        };
        self.last_time = Some(now);

        // A clock that jumps backwards or returns garbage counts as the shortest frame
        let delta = if raw.is_finite() {
            raw.clamp(self.config.min_frame_delta, self.config.max_frame_delta)
        } else {
            self.config.min_frame_delta
        };
        self.accumulator += delta;

        let step = self.config.fixed_step;
        let mut steps = 0;
        while self.accumulator >= step && steps < self.config.max_steps_per_frame {
            if let Some(update) = self.on_update.as_mut() {
                if let Err(source) = update(step as f32) {
                    return Err(self.fail(LoopPhase::Update, source));
                }
            }
            self.accumulator -= step;
            steps += 1;
            self.total_steps += 1;
        }

        let overflowed = self.accumulator >= step;
        if overflowed {
            let overflow = StepOverflow {
                steps,
                discarded: self.accumulator,
            };
            self.accumulator = 0.0;
            log::warn!(
                "Frame hit the {} step cap, discarding {:.4}s of simulation",
                steps,
                overflow.discarded
            );
            if let Some(notify) = self.on_step_overflow.as_mut() {
                notify(overflow);
            }
        }

        let interpolation = self.interpolation();
        if let Some(render) = self.on_render.as_mut() {
            if let Err(source) = render(interpolation) {
                return Err(self.fail(LoopPhase::Render, source));
            }
        }

        Ok(FrameReport {
            steps,
            interpolation,
            overflowed,
        })
    }

    /// Fraction of a step left in the accumulator
    pub fn interpolation(&self) -> f32 {
        let alpha = (self.accumulator / self.config.fixed_step) as f32;
        // Rounding to f32 can land exactly on 1.0
        alpha.clamp(0.0, 1.0 - f32::EPSILON)
    }

    fn fail(&mut self, phase: LoopPhase, source: CallbackError) -> LoopError {
        log::error!("Stopping game loop: {} callback failed: {}", phase, source);
        self.running = false;
        LoopError::Callback { phase, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn config() -> LoopConfig {
        LoopConfig {
            fixed_step: 0.125,
            min_frame_delta: 0.0,
            max_frame_delta: 1.0,
            max_steps_per_frame: 5,
        }
    }

    fn counting_loop(config: LoopConfig) -> (GameLoop, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let mut game_loop = GameLoop::new(config).unwrap();
        let c = count.clone();
        game_loop.on_update(move |_| {
            c.set(c.get() + 1);
            Ok(())
        });
        (game_loop, count)
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut bad = config();
        bad.fixed_step = -1.0;
        assert!(GameLoop::new(bad).is_err());

        let mut bad = config();
        bad.max_frame_delta = 0.001;
        assert!(GameLoop::new(bad).is_err());
    }

    #[test]
    fn test_first_frame_primes_clock() {
        let (mut game_loop, count) = counting_loop(config());
        game_loop.start().unwrap();
        let report = game_loop.frame(100.0).unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.interpolation, 0.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_steps_and_interpolation() {
        let (mut game_loop, count) = counting_loop(config());
        game_loop.start().unwrap();
        game_loop.frame(1.0).unwrap();

        let report = game_loop.frame(1.4375).unwrap();
        assert_eq!(report.steps, 3);
        assert!(!report.overflowed);
        assert_eq!(report.interpolation, 0.5);
        assert_eq!(count.get(), 3);
        assert_eq!(game_loop.total_steps(), 3);
        assert_eq!(game_loop.accumulated(), 0.0625);
    }

    #[test]
    fn test_update_receives_fixed_step() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut game_loop = GameLoop::new(config()).unwrap();
        let s = seen.clone();
        game_loop.on_update(move |dt| {
            s.borrow_mut().push(dt);
            Ok(())
        });
        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();
        game_loop.frame(0.3).unwrap();
        assert_eq!(*seen.borrow(), vec![0.125f32, 0.125]);
    }

    #[test]
    fn test_not_running_is_idle() {
        let (mut game_loop, count) = counting_loop(config());
        assert_eq!(game_loop.frame(5.0).unwrap(), FrameReport::default());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_start_twice() {
        let (mut game_loop, _) = counting_loop(config());
        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();
        game_loop.frame(0.05).unwrap();
        let acc = game_loop.accumulated();

        assert!(matches!(game_loop.start(), Err(LoopError::AlreadyRunning)));
        assert_eq!(game_loop.accumulated(), acc);
        assert!(game_loop.is_running());

        game_loop.stop();
        game_loop.stop();
        assert!(!game_loop.is_running());
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let mut cfg = config();
        cfg.max_frame_delta = 0.375;
        let (mut game_loop, count) = counting_loop(cfg);
        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();

        // A ten second hitch only counts as three steps
        let report = game_loop.frame(10.0).unwrap();
        assert_eq!(report.steps, 3);
        assert!(!report.overflowed);
        assert_eq!(count.get(), 3);

        // Clock going backwards counts as the minimum delta
        let report = game_loop.frame(5.0).unwrap();
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn test_min_delta_forces_progress() {
        let mut cfg = config();
        cfg.min_frame_delta = 0.125;
        let (mut game_loop, count) = counting_loop(cfg);
        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();
        assert_eq!(count.get(), 1);
        game_loop.frame(0.0).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_step_overflow_discards_backlog() {
        let overflows = Rc::new(RefCell::new(Vec::new()));
        let (mut game_loop, count) = counting_loop(config());
        let o = overflows.clone();
        game_loop.on_step_overflow(move |overflow| o.borrow_mut().push(overflow));
        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();

        let report = game_loop.frame(1.0).unwrap();
        assert_eq!(report.steps, 5);
        assert!(report.overflowed);
        assert_eq!(report.interpolation, 0.0);
        assert_eq!(game_loop.accumulated(), 0.0);
        assert_eq!(count.get(), 5);

        let overflows = overflows.borrow();
        assert_eq!(overflows.len(), 1);
        assert_eq!(overflows[0].steps, 5);
        assert_eq!(overflows[0].discarded, 0.375);
    }

    #[test]
    fn test_exact_cap_is_not_overflow() {
        let (mut game_loop, _) = counting_loop(config());
        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();
        let report = game_loop.frame(0.6875).unwrap();
        assert_eq!(report.steps, 5);
        assert!(!report.overflowed);
    }

    #[test]
    fn test_callback_failure_stops_loop() {
        let (mut game_loop, count) = counting_loop(config());
        let c = count.clone();
        game_loop.on_update(move |_| {
            c.set(c.get() + 1);
            if c.get() == 2 {
                Err("boom".into())
            } else {
                Ok(())
            }
        });
        let rendered = Rc::new(Cell::new(0));
        let r = rendered.clone();
        game_loop.on_render(move |_| {
            r.set(r.get() + 1);
            Ok(())
        });

        game_loop.start().unwrap();
        game_loop.frame(0.0).unwrap();
        let err = game_loop.frame(0.5).unwrap_err();
        assert!(matches!(
            err,
            LoopError::Callback {
                phase: LoopPhase::Update,
                ..
            }
        ));
        assert!(err.to_string().contains("boom"));
        assert!(!game_loop.is_running());
        assert_eq!(game_loop.total_steps(), 1);
        // Render for the priming frame only
        assert_eq!(rendered.get(), 1);

        // Stopped: frames are ignored, stop is a no-op, start recovers
        assert_eq!(game_loop.frame(1.0).unwrap().steps, 0);
        game_loop.stop();
        game_loop.start().unwrap();
        game_loop.frame(2.0).unwrap();
        assert_eq!(game_loop.frame(2.25).unwrap().steps, 2);
        assert_eq!(rendered.get(), 3);
    }

    #[test]
    fn test_render_failure_reports_phase() {
        let (mut game_loop, _) = counting_loop(config());
        game_loop.on_render(|_| Err("no surface".into()));
        game_loop.start().unwrap();
        assert!(matches!(
            game_loop.frame(0.0),
            Err(LoopError::Callback {
                phase: LoopPhase::Render,
                ..
            })
        ));
        assert!(!game_loop.is_running());
    }

    proptest! {
        #[test]
        fn prop_accumulator_stays_bounded(deltas in prop::collection::vec(0.0f64..2.0, 1..60)) {
            let cfg = config();
            let (mut game_loop, count) = counting_loop(cfg);
            game_loop.start().unwrap();
            let mut now = 0.0;
            game_loop.frame(now).unwrap();
            let mut expected_steps = 0u64;
            let mut fed = 0.0;

            for delta in deltas {
                now += delta;
                fed += delta.clamp(cfg.min_frame_delta, cfg.max_frame_delta);
                let report = game_loop.frame(now).unwrap();
                expected_steps += u64::from(report.steps);
                // Simulated time never runs ahead of the clock
                prop_assert!(expected_steps as f64 * cfg.fixed_step <= fed + cfg.fixed_step);
                prop_assert!(report.steps <= cfg.max_steps_per_frame);
                prop_assert!(report.interpolation >= 0.0 && report.interpolation < 1.0);
                prop_assert!(game_loop.accumulated() >= 0.0);
                prop_assert!(game_loop.accumulated() < cfg.fixed_step);
                if report.overflowed {
                    prop_assert_eq!(report.steps, cfg.max_steps_per_frame);
                    prop_assert_eq!(game_loop.accumulated(), 0.0);
                }
            }
            prop_assert_eq!(u64::from(count.get()), expected_steps);
            prop_assert_eq!(game_loop.total_steps(), expected_steps);
        }
    }
}
