//! Behavior engine
//!
//! An explicit state machine over seven moods:
//! - Idle: bubble loop, default
//! - Startle / Listen: wake word heard, then a command is recorded
//! - Search / Found: peek-a-boo game
//! - FallAsleep / Sleep: driven by ambient light

mod machine;

pub use machine::{BehaviorContext, BehaviorEngine, Senses, State};
