//! Microphone recording and speech-to-text backends

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::process::CommandTemplate;

/// A recorded utterance on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub path: PathBuf,
    pub duration: Duration,
}

/// Fixed-duration, blocking audio recording
pub trait Recorder: Send {
    fn record(&mut self, duration: Duration) -> Result<AudioClip>;
}

/// Blocking speech-to-text
pub trait Transcriber: Send {
    fn transcribe(&mut self, clip: &AudioClip) -> Result<Vec<String>>;
}

/// Split a transcript into lowercase word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Records through an external program such as `arecord`
pub struct CommandRecorder {
    command: CommandTemplate,
    path: PathBuf,
}

impl CommandRecorder {
    pub fn new(command: CommandTemplate, path: PathBuf) -> Self {
        Self { command, path }
    }
}

impl Recorder for CommandRecorder {
    fn record(&mut self, duration: Duration) -> Result<AudioClip> {
        // a stale clip must never be transcribed as the new command
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }

        let seconds = duration.as_secs().max(1).to_string();
        let path = self.path.to_string_lossy().into_owned();
        debug!(command = %self.command, %seconds, %path, "recording audio");

        let status = self
            .command
            .command(&[("seconds", &seconds), ("path", &path)])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Audio(format!("failed to run recorder: {e}")))?;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(Error::Audio(format!("recorder exited with code {code}")));
        }
        if !self.path.exists() {
            return Err(Error::Audio(format!("recorder produced no file at {path}")));
        }

        Ok(AudioClip {
            path: self.path.clone(),
            duration,
        })
    }
}

/// Transcribes through an external program such as `deepspeech`
pub struct CommandTranscriber {
    command: CommandTemplate,
}

impl CommandTranscriber {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&mut self, clip: &AudioClip) -> Result<Vec<String>> {
        let path = clip.path.to_string_lossy().into_owned();
        let output = self
            .command
            .command(&[("path", &path)])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::TranscriptionFailed(format!("failed to run transcriber: {e}")))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(Error::TranscriptionFailed(format!(
                "transcriber exited with code {code}"
            )));
        }

        let tokens = tokenize(&String::from_utf8_lossy(&output.stdout));
        if tokens.is_empty() {
            return Err(Error::TranscriptionFailed("empty transcript".to_string()));
        }
        Ok(tokens)
    }
}

/// Stand-in when no transcriber is configured
#[derive(Debug, Default)]
pub struct UnconfiguredTranscriber;

impl Transcriber for UnconfiguredTranscriber {
    fn transcribe(&mut self, _clip: &AudioClip) -> Result<Vec<String>> {
        Err(Error::TranscriptionFailed("no transcriber configured".to_string()))
    }
}
