//! Command capture: record a spoken command and transcribe it
//!
//! Wakeword listening is paused for the whole round trip so the
//! detector and the recorder never share the microphone.

mod audio;
mod command;

pub use audio::{
    AudioClip, CommandRecorder, CommandTranscriber, Recorder, Transcriber, UnconfiguredTranscriber,
};
pub use command::CommandCapture;
