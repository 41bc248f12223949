//! Fixed-period render loop driving the behavior engine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::animation::AnimationTable;
use crate::capture::CommandCapture;
use crate::error::Result;
use crate::sensor::Sampler;
use crate::state::{BehaviorEngine, Senses, State};
use crate::wake::{ListenerGuard, WakeListener};

use super::display::SpriteDisplay;

/// Tick period and sensor cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub period: Duration,
    /// Sample the camera on every Nth tick, N > 0
    pub sample_every: u64,
}

/// I/O collaborators owned by the render loop
pub struct Peripherals {
    pub sampler: Sampler,
    pub capture: CommandCapture,
    pub listener: WakeListener,
    pub display: Box<dyn SpriteDisplay>,
}

/// Side effects available to the engine during one tick
struct TickSenses<'a> {
    sampler: &'a mut Sampler,
    capture: &'a mut CommandCapture,
}

impl Senses for TickSenses<'_> {
    fn face_present(&mut self) -> Option<bool> {
        self.sampler.sample(true).usable().and_then(|s| s.face_present)
    }

    fn capture_command(&mut self) -> Result<Vec<String>> {
        self.capture.capture_and_transcribe()
    }
}

/// Drives engine, animation and display once per tick
pub struct RenderLoop {
    engine: BehaviorEngine,
    animations: AnimationTable,
    peripherals: Peripherals,
    timing: LoopTiming,
    stop: Arc<AtomicBool>,
    ticks: u64,
    deadline_misses: u64,
    /// Dropped after `peripherals`, so the camera goes first
    _listener_guard: ListenerGuard,
}

impl RenderLoop {
    /// Build the loop; fails if any state lacks an animation
    pub fn new(
        engine: BehaviorEngine,
        animations: AnimationTable,
        peripherals: Peripherals,
        timing: LoopTiming,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener_guard = peripherals.listener.guard();
        animations.validate()?;

        Ok(Self {
            engine,
            animations,
            peripherals,
            timing: LoopTiming {
                sample_every: timing.sample_every.max(1),
                ..timing
            },
            stop,
            ticks: 0,
            deadline_misses: 0,
            _listener_guard: listener_guard,
        })
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn state(&self) -> State {
        self.engine.state()
    }

    /// Tick until the stop flag is raised or a fatal error occurs
    ///
    /// The flag is only checked between ticks, so shutdown waits for an
    /// in-flight command capture. Camera and wakeword listener are
    /// released when `self` drops, on every exit path.
    pub fn run(mut self) -> Result<()> {
        info!(
            period_ms = self.timing.period.as_millis() as u64,
            sample_every = self.timing.sample_every,
            "render loop started"
        );

        while !self.stop.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            self.tick()?;

            let elapsed = cycle_start.elapsed();
            if elapsed < self.timing.period {
                std::thread::sleep(self.timing.period - elapsed);
            } else {
                self.deadline_misses += 1;
                debug!(elapsed_ms = elapsed.as_millis() as u64, "tick overran its period");
            }
        }

        info!(
            ticks = self.ticks,
            deadline_misses = self.deadline_misses,
            "render loop stopped"
        );
        Ok(())
    }

    /// One iteration: sample, advance, look up frame, display
    pub fn tick(&mut self) -> Result<State> {
        let sample = if self.ticks % self.timing.sample_every == 0 {
            let sample = self.peripherals.sampler.sample(false);
            if !sample.frame_captured {
                debug!(tick = self.ticks, "sensor unavailable, no sample this tick");
            }
            Some(sample)
        } else {
            None
        };

        let wake = self.peripherals.listener.signal().consume();

        let mut senses = TickSenses {
            sampler: &mut self.peripherals.sampler,
            capture: &mut self.peripherals.capture,
        };
        let state = self.engine.advance(wake, sample, &mut senses)?;

        let frames = self.engine.frames_in_state();
        let origin = self.animations.get_frame(state, frames)?;
        self.peripherals.display.show(origin);

        trace!(tick = self.ticks, %state, frames, ?origin, "tick");
        self.ticks += 1;
        Ok(state)
    }
}
