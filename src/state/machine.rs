//! Core behavior state machine
//!
//! Ticked once per render loop iteration with the wake flag and an
//! optional sensor sample. Wake events are checked before any sensor
//! driven guard in every state that looks at both.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::BehaviorConfig;
use crate::error::Result;
use crate::events::StateEvent;
use crate::sensor::SensorSample;

/// franklin's moods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Bubble loop, waiting for a wake word or darkness
    #[default]
    Idle,
    /// Just heard its name
    Startle,
    /// About to record a command
    Listen,
    /// Peek-a-boo: looking for a face
    Search,
    /// Peek-a-boo: face in view
    Found,
    /// Lights went out, dozing off
    FallAsleep,
    /// Asleep until the lights come back
    Sleep,
}

impl State {
    pub const ALL: [State; 7] = [
        State::Idle,
        State::Startle,
        State::Listen,
        State::Search,
        State::Found,
        State::FallAsleep,
        State::Sleep,
    ];
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Startle => write!(f, "Startle"),
            State::Listen => write!(f, "Listen"),
            State::Search => write!(f, "Search"),
            State::Found => write!(f, "Found"),
            State::FallAsleep => write!(f, "FallAsleep"),
            State::Sleep => write!(f, "Sleep"),
        }
    }
}

/// Side effects the engine triggers from inside a tick
pub trait Senses {
    /// On-demand face check. `None` when the camera gave nothing.
    fn face_present(&mut self) -> Option<bool>;

    /// Blocking record-and-transcribe round trip
    fn capture_command(&mut self) -> Result<Vec<String>>;
}

/// Everything the engine remembers between ticks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BehaviorContext {
    pub current_state: State,
    /// Ticks since the last transition
    pub frames_in_state: u64,
    /// A wake event arrived and no transition has consumed it yet
    pub wake_pending: bool,
    /// Peek-a-boo started by a spoken command
    pub game_active: bool,
    /// Peek-a-boo target has been seen
    pub target_spotted: bool,
}

/// The state machine that drives franklin's behavior
pub struct BehaviorEngine {
    ctx: BehaviorContext,
    config: BehaviorConfig,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<StateEvent>,
}

impl BehaviorEngine {
    /// Create a new engine in `Idle`
    pub fn new(config: BehaviorConfig, event_tx: broadcast::Sender<StateEvent>) -> Self {
        Self {
            ctx: BehaviorContext::default(),
            config,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.ctx.current_state
    }

    pub fn frames_in_state(&self) -> u64 {
        self.ctx.frames_in_state
    }

    pub fn context(&self) -> &BehaviorContext {
        &self.ctx
    }

    /// Run one tick of the state machine
    ///
    /// `wake_event` is whatever the wake flag held this tick; it stays
    /// pending until a transition consumes it. A sample without a frame
    /// carries no information and never causes a transition.
    ///
    /// The current tick counts as held before the guards run, so a guard
    /// on N ticks fires on the Nth tick in the state.
    pub fn advance(
        &mut self,
        wake_event: bool,
        sample: Option<SensorSample>,
        senses: &mut dyn Senses,
    ) -> Result<State> {
        if wake_event {
            if !self.ctx.wake_pending {
                let _ = self.event_tx.send(StateEvent::WakeHeard);
            }
            self.ctx.wake_pending = true;
            debug!(state = %self.ctx.current_state, "wake event pending");
        }

        let sample = sample.and_then(SensorSample::usable);
        self.ctx.frames_in_state = self.ctx.frames_in_state.saturating_add(1);

        let next = match self.ctx.current_state {
            State::Idle => self.from_idle(sample),
            State::Startle => self.from_startle(),
            State::Listen => self.from_listen(senses)?,
            State::Search => self.from_search(sample, senses),
            State::Found => self.from_found(sample, senses),
            State::FallAsleep => self.from_fall_asleep(sample),
            State::Sleep => self.from_sleep(sample),
        };

        if let Some(state) = next {
            self.transition_to(state);
        }

        Ok(self.ctx.current_state)
    }

    fn from_idle(&self, sample: Option<SensorSample>) -> Option<State> {
        if self.ctx.wake_pending {
            Some(State::Startle)
        } else if sample.is_some_and(|s| s.brightness < self.config.dark_threshold) {
            Some(State::FallAsleep)
        } else {
            None
        }
    }

    fn from_startle(&mut self) -> Option<State> {
        if self.ctx.frames_in_state > u64::from(self.config.startle_ticks) {
            self.ctx.wake_pending = false;
            Some(State::Listen)
        } else {
            None
        }
    }

    fn from_listen(&mut self, senses: &mut dyn Senses) -> Result<Option<State>> {
        if self.ctx.frames_in_state <= u64::from(self.config.listen_ticks) {
            return Ok(None);
        }

        let tokens = senses.capture_command()?;
        let matched = tokens.iter().any(|t| *t == self.config.play_keyword);
        info!(?tokens, matched, "command heard");
        let _ = self.event_tx.send(StateEvent::CommandHeard { tokens, matched });

        if matched {
            self.ctx.game_active = true;
            self.ctx.target_spotted = false;
            Ok(Some(State::Search))
        } else {
            Ok(Some(State::Idle))
        }
    }

    fn from_search(
        &mut self,
        sample: Option<SensorSample>,
        senses: &mut dyn Senses,
    ) -> Option<State> {
        if self.ctx.wake_pending {
            self.ctx.wake_pending = false;
            Some(State::Idle)
        } else if face_check(sample, senses) == Some(true) {
            Some(State::Found)
        } else if self.ctx.frames_in_state >= u64::from(self.config.search_ticks) {
            Some(State::Idle)
        } else {
            None
        }
    }

    fn from_found(
        &mut self,
        sample: Option<SensorSample>,
        senses: &mut dyn Senses,
    ) -> Option<State> {
        if self.ctx.wake_pending {
            self.ctx.wake_pending = false;
            return Some(State::Idle);
        }
        if self.ctx.frames_in_state < u64::from(self.config.found_recheck_ticks) {
            return None;
        }

        match face_check(sample, senses) {
            Some(false) => Some(State::Search),
            // still in view (or camera silent): wait another round
            _ => {
                debug!("face still in view");
                self.ctx.frames_in_state = 0;
                None
            }
        }
    }

    fn from_fall_asleep(&self, sample: Option<SensorSample>) -> Option<State> {
        if self.ctx.wake_pending {
            return Some(State::Startle);
        }
        if sample.is_some_and(|s| s.brightness > self.config.bright_threshold) {
            Some(State::Startle)
        } else if self.ctx.frames_in_state >= u64::from(self.config.fall_asleep_ticks) {
            Some(State::Sleep)
        } else {
            None
        }
    }

    fn from_sleep(&self, sample: Option<SensorSample>) -> Option<State> {
        if sample.is_some_and(|s| s.brightness > self.config.bright_threshold) {
            Some(State::Startle)
        } else {
            None
        }
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: State) {
        let old_state = self.ctx.current_state;
        let dwell_ticks = self.ctx.frames_in_state;

        info!(
            from = %old_state,
            to = %new_state,
            dwell_ticks,
            "state transition"
        );

        match new_state {
            State::Idle => {
                self.ctx.game_active = false;
                self.ctx.target_spotted = false;
            }
            State::Found => self.ctx.target_spotted = true,
            State::Search => self.ctx.target_spotted = false,
            _ => {}
        }

        self.ctx.current_state = new_state;
        self.ctx.frames_in_state = 0;

        let _ = self.event_tx.send(StateEvent::StateChanged {
            from: old_state,
            to: new_state,
            dwell_ticks,
        });
    }
}

/// Face presence from the tick's sample if it has one, else on demand
fn face_check(sample: Option<SensorSample>, senses: &mut dyn Senses) -> Option<bool> {
    sample
        .and_then(|s| s.face_present)
        .or_else(|| senses.face_present())
}
