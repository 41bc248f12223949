//! franklin-daemon: behavior engine for franklin, the LED-matrix companion
//!
//! franklin reacts to a spoken wake phrase, listens for a command, plays
//! peek-a-boo by looking for faces, and dozes off when the lights go out.
//! Its mood is shown as a sprite animation.
//!
//! Two threads of control:
//! - the render loop (blocking thread): samples the camera, advances the
//!   state machine, shows the current frame, once per tick
//! - the wakeword runner reader: only ever raises the wake flag
//!
//! Camera, face detection, recording, transcription and wakeword
//! inference are external programs configured through the environment.

mod animation;
mod capture;
mod config;
mod error;
mod events;
mod lifecycle;
mod process;
mod render;
mod sensor;
mod state;
mod wake;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::capture::{
    CommandCapture, CommandRecorder, CommandTranscriber, Transcriber, UnconfiguredTranscriber,
};
use crate::config::Config;
use crate::events::StateEvent;
use crate::lifecycle::ShutdownSignal;
use crate::render::{
    load_sprite_sheet, LoopTiming, Peripherals, RenderLoop, SpriteDisplay, TerminalDisplay,
    TraceDisplay,
};
use crate::sensor::{
    Camera, CommandCamera, CommandFaceDetector, FaceDetector, NoFaceDetector, Sampler,
    UnavailableCamera,
};
use crate::state::BehaviorEngine;
use crate::wake::{ProcessDetector, SilentDetector, WakeDetector, WakeListener, WakeSignal};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "franklin-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        data_dir = ?config.data_dir,
        tick_ms = config.tick_period.as_millis() as u64,
        sample_every = config.sample_every,
        "configuration loaded"
    );

    // Missing animations must stop us before anything starts
    let animations = animation::default_table().context("invalid animation table")?;

    let (event_tx, _event_rx) = broadcast::channel::<StateEvent>(64);

    let detector: Arc<dyn WakeDetector> = match &config.wake_command {
        Some(command) => Arc::new(ProcessDetector::new(command.clone())),
        None => {
            warn!("FRANKLIN_WAKE_CMD not set, wake word disabled");
            Arc::new(SilentDetector::default())
        }
    };
    let listener = WakeListener::new(detector, WakeSignal::new());
    listener
        .resume()
        .context("failed to start wakeword listener")?;
    info!("wakeword listener started");

    let camera: Box<dyn Camera> = match &config.camera_command {
        Some(command) => Box::new(CommandCamera::new(command.clone())),
        None => {
            warn!("FRANKLIN_CAMERA_CMD not set, running without light or face sensing");
            Box::new(UnavailableCamera)
        }
    };
    let faces: Box<dyn FaceDetector> = match &config.face_command {
        Some(command) => Box::new(CommandFaceDetector::new(command.clone())),
        None => Box::new(NoFaceDetector),
    };

    let transcriber: Box<dyn Transcriber> = match &config.transcribe_command {
        Some(command) => Box::new(CommandTranscriber::new(command.clone())),
        None => {
            warn!("FRANKLIN_STT_CMD not set, every command will be ignored");
            Box::new(UnconfiguredTranscriber)
        }
    };
    let capture = CommandCapture::new(
        listener.clone(),
        Box::new(CommandRecorder::new(
            config.record_command.clone(),
            config.recording_path(),
        )),
        transcriber,
        config.listen_duration,
        event_tx.clone(),
    );

    let display: Box<dyn SpriteDisplay> = match &config.sprite_sheet {
        Some(path) => Box::new(TerminalDisplay::new(
            load_sprite_sheet(path)?,
            std::io::stdout(),
        )),
        None => Box::new(TraceDisplay::default()),
    };

    let shutdown = ShutdownSignal::new();

    let render_loop = RenderLoop::new(
        BehaviorEngine::new(config.behavior.clone(), event_tx.clone()),
        animations,
        Peripherals {
            sampler: Sampler::new(camera, faces),
            capture,
            listener,
            display,
        },
        LoopTiming {
            period: config.tick_period,
            sample_every: u64::from(config.sample_every),
        },
        shutdown.flag(),
    )?;

    // Log state events
    let mut event_rx = event_tx.subscribe();
    drop(event_tx);
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    info!(%event, "state event");
                    if let Ok(payload) = serde_json::to_string(&event) {
                        debug!(%payload, "state event payload");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "state event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!("daemon initialized, entering render loop");

    let mut render_task = tokio::task::spawn_blocking(move || render_loop.run());

    let outcome = tokio::select! {
        joined = &mut render_task => joined,

        // Wait for shutdown signal
        waited = shutdown.wait() => {
            match waited {
                Ok(()) => info!("shutdown signal received, finishing current tick"),
                Err(e) => error!(?e, "cannot listen for shutdown signals"),
            }
            render_task.await
        }
    };

    match outcome.context("render loop panicked")? {
        Ok(()) => {
            info!("franklin-daemon stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "render loop failed");
            Err(e.into())
        }
    }
}
