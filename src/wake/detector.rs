//! Wakeword detector backends
//!
//! The real detector is an external runner process that prints one line
//! per activation. It is read on a dedicated thread which only ever
//! invokes the activation callback.

use std::io::{BufRead, BufReader};
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::process::CommandTemplate;

use super::signal::WakeSignal;

/// Invoked from the detector thread on every activation
pub type ActivationCallback = Arc<dyn Fn() + Send + Sync>;

/// A stoppable, restartable wakeword detector
pub trait WakeDetector: Send + Sync {
    /// Begin listening; `on_activate` may fire from another thread
    fn start(&self, on_activate: ActivationCallback) -> Result<()>;

    /// Stop listening
    ///
    /// Blocks until an activation already in flight has returned; no
    /// activation fires after this returns.
    fn stop(&self);

    /// Check if the detector is currently listening
    fn is_running(&self) -> bool;
}

/// Wakeword runner backed by a child process
pub struct ProcessDetector {
    command: CommandTemplate,
    running: Arc<AtomicBool>,
    /// Bumped on every start/stop so a stale reader thread goes quiet
    generation: Arc<AtomicU64>,
    /// Also held by the reader across its generation check and callback
    child: Arc<Mutex<Option<Child>>>,
}

impl ProcessDetector {
    pub fn new(command: CommandTemplate) -> Self {
        Self {
            command,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            child: Arc::new(Mutex::new(None)),
        }
    }
}

impl WakeDetector for ProcessDetector {
    fn start(&self, on_activate: ActivationCallback) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Detector("wakeword detector is already running".to_string()));
        }

        let spawned = self
            .command
            .command(&[])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(Error::Detector(format!(
                    "failed to spawn `{}`: {e}",
                    self.command
                )));
            }
        };

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            self.running.store(false, Ordering::SeqCst);
            return Err(Error::Detector("wakeword runner has no stdout".to_string()));
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let running = Arc::clone(&self.running);
        let gate = Arc::clone(&self.child);

        let spawn_result = thread::Builder::new()
            .name("wakeword-listener".to_string())
            .spawn(move || {
                info!(generation, "wakeword listener thread started");

                for line in BufReader::new(stdout).lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(?e, "failed to read wakeword runner output");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    // stop() bumps the generation under this lock
                    let _held = gate.lock().unwrap_or_else(|e| e.into_inner());
                    if current.load(Ordering::SeqCst) != generation {
                        break;
                    }
                    debug!(output = %line.trim(), "wakeword activation");
                    on_activate();
                }

                // Runner died on its own rather than through stop()
                if current.load(Ordering::SeqCst) == generation {
                    running.store(false, Ordering::SeqCst);
                    warn!("wakeword runner exited unexpectedly");
                }
                info!(generation, "wakeword listener thread stopped");
            });

        if let Err(e) = spawn_result {
            let _ = child.kill();
            let _ = child.wait();
            self.running.store(false, Ordering::SeqCst);
            return Err(Error::Detector(format!("failed to spawn listener thread: {e}")));
        }

        *self.child.lock().unwrap_or_else(|e| e.into_inner()) = Some(child);
        Ok(())
    }

    fn stop(&self) {
        let child = {
            let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.running.store(false, Ordering::SeqCst);
            slot.take()
        };

        if let Some(mut child) = child {
            if let Err(e) = child.kill() {
                debug!(?e, "wakeword runner already exited");
            }
            if let Err(e) = child.wait() {
                error!(?e, "failed to reap wakeword runner");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Detector used when no wakeword runner is configured; never fires
#[derive(Debug, Default)]
pub struct SilentDetector {
    running: AtomicBool,
}

impl WakeDetector for SilentDetector {
    fn start(&self, _on_activate: ActivationCallback) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Detector("wakeword detector is already running".to_string()));
        }
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Couples a detector with the wake flag it feeds
#[derive(Clone)]
pub struct WakeListener {
    detector: Arc<dyn WakeDetector>,
    signal: WakeSignal,
}

impl WakeListener {
    pub fn new(detector: Arc<dyn WakeDetector>, signal: WakeSignal) -> Self {
        Self { detector, signal }
    }

    /// Start (or restart) the detector feeding the wake flag
    pub fn resume(&self) -> Result<()> {
        let signal = self.signal.clone();
        self.detector.start(Arc::new(move || signal.set()))?;
        debug!("wakeword listening resumed");
        Ok(())
    }

    pub fn pause(&self) {
        self.detector.stop();
        debug!("wakeword listening paused");
    }

    pub fn is_listening(&self) -> bool {
        self.detector.is_running()
    }

    pub fn signal(&self) -> &WakeSignal {
        &self.signal
    }

    /// Guard that stops the detector when dropped
    pub fn guard(&self) -> ListenerGuard {
        ListenerGuard {
            listener: self.clone(),
        }
    }
}

/// Stops the wakeword detector on every exit path of its owner
pub struct ListenerGuard {
    listener: WakeListener,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.listener.pause();
        info!("wakeword listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn shell(script: &str) -> CommandTemplate {
        CommandTemplate::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    #[test]
    fn test_process_detector_fires_per_line() {
        let detector = ProcessDetector::new(shell("echo wake; echo; echo wake; sleep 5"));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        detector
            .start(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(detector.is_running());

        assert!(wait_for(Duration::from_secs(3), || count.load(Ordering::SeqCst) == 2));

        detector.stop();
        assert!(!detector.is_running());
    }

    #[test]
    fn test_no_activation_after_stop() {
        let detector = ProcessDetector::new(shell("while true; do echo wake; sleep 0.01; done"));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        detector
            .start(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(wait_for(Duration::from_secs(3), || count.load(Ordering::SeqCst) > 0));

        detector.stop();
        let after_stop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_process_detector_restart() {
        let detector = ProcessDetector::new(shell("sleep 5"));
        detector.start(Arc::new(|| {})).unwrap();
        assert!(matches!(
            detector.start(Arc::new(|| {})),
            Err(Error::Detector(_))
        ));

        detector.stop();
        detector.start(Arc::new(|| {})).unwrap();
        assert!(detector.is_running());
        detector.stop();
    }

    #[test]
    fn test_process_detector_spawn_failure() {
        let detector = ProcessDetector::new(CommandTemplate::new(
            "/nonexistent/precise-runner",
            vec![],
        ));
        assert!(detector.start(Arc::new(|| {})).is_err());
        assert!(!detector.is_running());
    }

    #[test]
    fn test_listener_feeds_signal() {
        let signal = WakeSignal::new();
        let listener = WakeListener::new(
            Arc::new(ProcessDetector::new(shell("echo ok-franklin; sleep 5"))),
            signal.clone(),
        );

        listener.resume().unwrap();
        assert!(wait_for(Duration::from_secs(3), || signal.is_set()));
        listener.pause();
        assert!(!listener.is_listening());
        assert!(signal.consume());
    }

    #[test]
    fn test_guard_stops_detector() {
        let listener = WakeListener::new(Arc::new(SilentDetector::default()), WakeSignal::new());
        listener.resume().unwrap();
        {
            let _guard = listener.guard();
            assert!(listener.is_listening());
        }
        assert!(!listener.is_listening());
    }
}
