//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::process::CommandTemplate;

const DEFAULT_RECORD_COMMAND: &str = "arecord -q -d {seconds} -f S16_LE -r 16000 -c 1 {path}";

/// Thresholds and dwell limits driving the behavior engine
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorConfig {
    /// Idle falls asleep when brightness drops strictly below this
    pub dark_threshold: f32,
    /// FallAsleep/Sleep startle when brightness rises strictly above this
    pub bright_threshold: f32,
    /// Startle moves to Listen once the dwell counter exceeds this
    pub startle_ticks: u32,
    /// Listen captures a command once the dwell counter exceeds this
    pub listen_ticks: u32,
    /// Search gives up after this many ticks without a face
    pub search_ticks: u32,
    /// Found re-checks for a face every this many ticks
    pub found_recheck_ticks: u32,
    /// FallAsleep settles into Sleep after this many ticks
    pub fall_asleep_ticks: u32,
    /// Spoken token that starts the peek-a-boo game
    pub play_keyword: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 40.0,
            bright_threshold: 50.0,
            startle_ticks: 30,
            listen_ticks: 10,
            search_ticks: 100,
            found_recheck_ticks: 30,
            fall_asleep_ticks: 8,
            play_keyword: "play".to_string(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data (audio recordings)
    pub data_dir: PathBuf,

    /// Render loop period
    pub tick_period: Duration,

    /// Take a sensor sample every this many ticks
    pub sample_every: u32,

    /// Length of a command recording
    pub listen_duration: Duration,

    /// Binary PPM sprite sheet, if a terminal display is wanted
    pub sprite_sheet: Option<PathBuf>,

    /// Long-running wakeword runner, one stdout line per activation
    pub wake_command: Option<CommandTemplate>,

    /// Prints one PPM frame per invocation
    pub camera_command: Option<CommandTemplate>,

    /// Reads a PPM frame on stdin, exits 0 when a face is present
    pub face_command: Option<CommandTemplate>,

    /// Records `{seconds}` of audio into `{path}`
    pub record_command: CommandTemplate,

    /// Prints the transcript of `{path}` on stdout
    pub transcribe_command: Option<CommandTemplate>,

    /// State machine thresholds
    pub behavior: BehaviorConfig,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("franklin");

        let tick_ms: u64 = parse_var(&lookup, "FRANKLIN_TICK_MS", 16)?;
        if tick_ms == 0 {
            bail!("FRANKLIN_TICK_MS must be greater than zero");
        }

        let sample_every: u32 = parse_var(&lookup, "FRANKLIN_SAMPLE_EVERY", 10)?;
        if sample_every == 0 {
            bail!("FRANKLIN_SAMPLE_EVERY must be greater than zero");
        }

        let listen_secs: u64 = parse_var(&lookup, "FRANKLIN_LISTEN_SECS", 5)?;

        let record_command = match template_var(&lookup, "FRANKLIN_RECORD_CMD")? {
            Some(template) => template,
            None => CommandTemplate::parse(DEFAULT_RECORD_COMMAND)?,
        };

        Ok(Self {
            data_dir,
            tick_period: Duration::from_millis(tick_ms),
            sample_every,
            listen_duration: Duration::from_secs(listen_secs),
            sprite_sheet: lookup("FRANKLIN_SPRITE_SHEET").map(PathBuf::from),
            wake_command: template_var(&lookup, "FRANKLIN_WAKE_CMD")?,
            camera_command: template_var(&lookup, "FRANKLIN_CAMERA_CMD")?,
            face_command: template_var(&lookup, "FRANKLIN_FACE_CMD")?,
            record_command,
            transcribe_command: template_var(&lookup, "FRANKLIN_STT_CMD")?,
            behavior: BehaviorConfig::default(),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }

    /// Where command recordings are written
    pub fn recording_path(&self) -> PathBuf {
        self.data_dir.join("command.wav")
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn template_var<F>(lookup: &F, key: &str) -> Result<Option<CommandTemplate>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => CommandTemplate::parse(&raw)
            .map(Some)
            .with_context(|| format!("invalid command in {key}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[("HOME", "/home/pi")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/home/pi/.local/share/franklin"));
        assert_eq!(config.tick_period, Duration::from_millis(16));
        assert_eq!(config.sample_every, 10);
        assert_eq!(config.listen_duration, Duration::from_secs(5));
        assert!(config.wake_command.is_none());
        assert_eq!(config.record_command.program(), "arecord");
        assert_eq!(config.behavior, BehaviorConfig::default());
        assert!(config.recording_path().ends_with("command.wav"));
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOME", "/home/pi"),
            ("FRANKLIN_TICK_MS", "33"),
            ("FRANKLIN_SAMPLE_EVERY", "5"),
            ("FRANKLIN_STT_CMD", "deepspeech --audio {path}"),
        ]))
        .unwrap();
        assert_eq!(config.tick_period, Duration::from_millis(33));
        assert_eq!(config.sample_every, 5);
        assert_eq!(config.transcribe_command.unwrap().program(), "deepspeech");
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        assert!(Config::from_lookup(lookup_from(&[
            ("HOME", "/home/pi"),
            ("FRANKLIN_TICK_MS", "fast"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup_from(&[
            ("HOME", "/home/pi"),
            ("FRANKLIN_SAMPLE_EVERY", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn test_config_requires_home() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_blank_command_is_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOME", "/home/pi"),
            ("FRANKLIN_CAMERA_CMD", "  "),
        ]))
        .unwrap();
        assert!(config.camera_command.is_none());
    }
}
