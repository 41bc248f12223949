//! Per-state sprite animations and frame lookup

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::state::State;

/// Top-left corner of a sprite on the sheet
pub type SpriteOrigin = (u32, u32);

/// One frame of an animation: sprite origin and how many ticks it shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub x: u32,
    pub y: u32,
    pub duration: u32,
}

impl FrameSpec {
    pub const fn new(x: u32, y: u32, duration: u32) -> Self {
        Self { x, y, duration }
    }
}

/// An immutable, weighted frame sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    frames: Vec<FrameSpec>,
    total_duration: u64,
}

impl Animation {
    /// Build an animation, rejecting empty or zero-length sequences
    pub fn new(frames: Vec<FrameSpec>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::Configuration("animation has no frames".to_string()));
        }

        let total_duration = frames.iter().map(|f| u64::from(f.duration)).sum();
        if total_duration == 0 {
            return Err(Error::Configuration(
                "animation total duration is zero".to_string(),
            ));
        }

        Ok(Self {
            frames,
            total_duration,
        })
    }

    /// Sum of all frame durations, always > 0
    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }

    /// Sprite origin shown `frame_number` ticks into the animation
    pub fn frame_at(&self, frame_number: u64) -> SpriteOrigin {
        let mut remainder = frame_number % self.total_duration;
        for frame in &self.frames {
            let span = u64::from(frame.duration);
            if remainder < span {
                return (frame.x, frame.y);
            }
            remainder -= span;
        }
        // remainder < total_duration guarantees a hit above
        let last = self.frames[self.frames.len() - 1];
        (last.x, last.y)
    }
}

/// Maps every state to its animation
#[derive(Debug, Clone, Default)]
pub struct AnimationTable {
    animations: HashMap<State, Animation>,
}

impl AnimationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from raw frame lists, validating each animation
    pub fn from_frames<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (State, Vec<FrameSpec>)>,
    {
        let mut table = Self::new();
        for (state, frames) in entries {
            let animation = Animation::new(frames).map_err(|e| {
                Error::Configuration(format!("animation for {state}: {e}"))
            })?;
            table.insert(state, animation);
        }
        Ok(table)
    }

    pub fn insert(&mut self, state: State, animation: Animation) {
        self.animations.insert(state, animation);
    }

    pub fn get(&self, state: State) -> Option<&Animation> {
        self.animations.get(&state)
    }

    /// Ensure every state the engine can reach has an animation
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = State::ALL
            .iter()
            .filter(|state| !self.animations.contains_key(*state))
            .map(ToString::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "no animation registered for: {}",
                missing.join(", ")
            )))
        }
    }

    /// Sprite origin for `state` after `frame_number` ticks in it
    pub fn get_frame(&self, state: State, frame_number: u64) -> Result<SpriteOrigin> {
        self.get(state)
            .map(|animation| animation.frame_at(frame_number))
            .ok_or_else(|| Error::Configuration(format!("no animation registered for {state}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::default_table;

    fn bubble() -> Animation {
        Animation::new(vec![
            FrameSpec::new(0, 0, 10),
            FrameSpec::new(16, 0, 10),
            FrameSpec::new(32, 0, 10),
        ])
        .unwrap()
    }

    #[test]
    fn test_frame_walk() {
        let anim = bubble();
        assert_eq!(anim.total_duration(), 30);
        assert_eq!(anim.frame_at(0), (0, 0));
        assert_eq!(anim.frame_at(9), (0, 0));
        assert_eq!(anim.frame_at(10), (16, 0));
        assert_eq!(anim.frame_at(29), (32, 0));
        assert_eq!(anim.frame_at(30), (0, 0));
    }

    #[test]
    fn test_weighted_frames() {
        let anim =
            Animation::new(vec![FrameSpec::new(0, 0, 1), FrameSpec::new(16, 0, 4)]).unwrap();
        assert_eq!(anim.frame_at(0), (0, 0));
        for n in 1..5 {
            assert_eq!(anim.frame_at(n), (16, 0));
        }
    }

    #[test]
    fn test_zero_duration_frame_is_skipped() {
        let anim =
            Animation::new(vec![FrameSpec::new(0, 0, 0), FrameSpec::new(16, 0, 2)]).unwrap();
        assert_eq!(anim.frame_at(0), (16, 0));
    }

    #[test]
    fn test_get_frame_is_periodic() {
        let table = default_table().unwrap();
        for state in State::ALL {
            let total = table.get(state).unwrap().total_duration();
            for n in 0..200 {
                assert_eq!(
                    table.get_frame(state, n).unwrap(),
                    table.get_frame(state, n + total).unwrap(),
                    "{state} not periodic at {n}"
                );
            }
        }
    }

    #[test]
    fn test_empty_animation_rejected() {
        assert!(matches!(Animation::new(vec![]), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_zero_total_rejected() {
        let result = Animation::new(vec![FrameSpec::new(0, 0, 0)]);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_state_fails() {
        let mut table = AnimationTable::new();
        table.insert(State::Idle, bubble());

        assert!(table.get_frame(State::Idle, 3).is_ok());
        assert!(matches!(
            table.get_frame(State::Sleep, 0),
            Err(Error::Configuration(_))
        ));

        let err = table.validate().unwrap_err().to_string();
        assert!(err.contains("Sleep"));
        assert!(!err.contains("Idle,"));
    }

    #[test]
    fn test_from_frames_names_bad_state() {
        let err = AnimationTable::from_frames(vec![(State::Found, vec![])]).unwrap_err();
        assert!(err.to_string().contains("Found"));
    }
}
