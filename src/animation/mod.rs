//! Sprite animations for each behavior state
//!
//! Sprites are 16x16 tiles on a single sheet. Every state owns an
//! ordered list of tiles, each shown for a number of ticks.

mod table;

pub use table::{Animation, AnimationTable, FrameSpec, SpriteOrigin};

use crate::error::Result;
use crate::state::State;

/// Width and height of one sprite tile
pub const SPRITE_SIZE: u32 = 16;

/// Frames of the stock franklin sprite sheet
pub fn default_frames(state: State) -> Vec<FrameSpec> {
    let row = |y: u32, count: u32, duration: u32| -> Vec<FrameSpec> {
        (0..count)
            .map(|i| FrameSpec::new(i * SPRITE_SIZE, y, duration))
            .collect()
    };

    match state {
        // bubble loop
        State::Idle => row(0, 3, 10),
        State::Startle => row(32, 1, 1),
        State::FallAsleep => row(48, 8, 5),
        State::Sleep => row(64, 3, 10),
        State::Search => row(80, 3, 10),
        State::Found => row(96, 3, 10),
        State::Listen => row(80, 1, 10),
    }
}

/// Animation table for the stock sprite sheet
pub fn default_table() -> Result<AnimationTable> {
    AnimationTable::from_frames(State::ALL.iter().map(|&s| (s, default_frames(s))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_complete() {
        let table = default_table().unwrap();
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_default_durations() {
        let table = default_table().unwrap();
        assert_eq!(table.get(State::Idle).unwrap().total_duration(), 30);
        assert_eq!(table.get(State::Startle).unwrap().total_duration(), 1);
        assert_eq!(table.get(State::FallAsleep).unwrap().total_duration(), 40);
        assert_eq!(table.get_frame(State::FallAsleep, 7).unwrap(), (16, 48));
    }
}
