//! Events module for behavior transitions
//!
//! Structured events emitted by the engine and command capture, fanned
//! out over a broadcast channel.

use serde::{Deserialize, Serialize};

use crate::state::State;

/// Events emitted while franklin runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The engine moved between states
    StateChanged {
        from: State,
        to: State,
        /// Ticks spent in `from` before leaving
        dwell_ticks: u64,
    },

    /// A wake event reached the engine
    WakeHeard,

    /// A spoken command was transcribed
    CommandHeard {
        tokens: Vec<String>,
        /// Whether the command started the game
        matched: bool,
    },

    /// Wakeword detection paused for a recording
    ListeningPaused,

    /// Wakeword detection resumed after a recording
    ListeningResumed,
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::StateChanged {
                from,
                to,
                dwell_ticks,
            } => write!(f, "STATE_CHANGED {from} -> {to} ({dwell_ticks} ticks)"),
            StateEvent::WakeHeard => write!(f, "WAKE_HEARD"),
            StateEvent::CommandHeard { tokens, matched } => {
                write!(f, "COMMAND_HEARD [{}]", tokens.join(" "))?;
                if *matched {
                    write!(f, " (matched)")?;
                }
                Ok(())
            }
            StateEvent::ListeningPaused => write!(f, "LISTENING_PAUSED"),
            StateEvent::ListeningResumed => write!(f, "LISTENING_RESUMED"),
        }
    }
}
