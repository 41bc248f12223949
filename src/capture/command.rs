//! Spoken command capture around a paused wakeword listener

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::events::StateEvent;
use crate::wake::WakeListener;

use super::audio::{Recorder, Transcriber};

/// Records and transcribes one command while wakeword detection is paused
pub struct CommandCapture {
    listener: WakeListener,
    recorder: Box<dyn Recorder>,
    transcriber: Box<dyn Transcriber>,
    duration: Duration,
    event_tx: broadcast::Sender<StateEvent>,
}

impl CommandCapture {
    pub fn new(
        listener: WakeListener,
        recorder: Box<dyn Recorder>,
        transcriber: Box<dyn Transcriber>,
        duration: Duration,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        Self {
            listener,
            recorder,
            transcriber,
            duration,
            event_tx,
        }
    }

    /// Stop the listener, record, transcribe, restart the listener
    ///
    /// Blocks for the recording plus however long transcription takes.
    /// Recording or transcription failures yield an empty token list; a
    /// listener that cannot be restarted is fatal.
    pub fn capture_and_transcribe(&mut self) -> Result<Vec<String>> {
        let started = Instant::now();

        self.listener.pause();
        let _ = self.event_tx.send(StateEvent::ListeningPaused);

        let tokens = match self.record_and_transcribe() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "command capture failed, treating as empty");
                Vec::new()
            }
        };

        if let Err(e) = self.listener.resume() {
            error!(error = %e, "wakeword listener did not come back");
            return Err(Error::DetectorRestartFailed(e.to_string()));
        }
        let _ = self.event_tx.send(StateEvent::ListeningResumed);

        info!(
            ?tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command captured"
        );
        Ok(tokens)
    }

    fn record_and_transcribe(&mut self) -> Result<Vec<String>> {
        let clip = self.recorder.record(self.duration)?;
        debug!(path = %clip.path.display(), "recording complete, transcribing");
        self.transcriber.transcribe(&clip)
    }
}
