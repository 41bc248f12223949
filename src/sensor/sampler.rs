//! Camera sampling: brightness every few ticks, faces on demand

use std::io::Write;
use std::process::Stdio;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::process::CommandTemplate;

use super::frame::Frame;

/// Image-capture device
pub trait Camera: Send {
    /// Acquire the device
    fn open(&mut self) -> Result<()>;

    /// Capture the next frame
    fn read(&mut self) -> Result<Frame>;

    /// Release the device. Called once per successful `open`.
    fn release(&mut self);
}

/// Face-presence inference over a single frame
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> bool;
}

/// One sensor reading, discarded after the tick that took it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub frame_captured: bool,
    /// Mean HSV value channel, `[0, 255]`
    pub brightness: f32,
    /// Only computed when explicitly requested
    pub face_present: Option<bool>,
}

impl SensorSample {
    /// "No new information" sample
    pub fn unavailable() -> Self {
        Self {
            frame_captured: false,
            brightness: 0.0,
            face_present: None,
        }
    }

    pub fn with_brightness(brightness: f32) -> Self {
        Self {
            frame_captured: true,
            brightness,
            face_present: None,
        }
    }

    /// The sample if it carries data, `None` otherwise
    pub fn usable(self) -> Option<Self> {
        self.frame_captured.then_some(self)
    }
}

/// Owns the camera and face detector; releases the camera on drop
pub struct Sampler {
    camera: Box<dyn Camera>,
    faces: Box<dyn FaceDetector>,
    opened: bool,
}

impl Sampler {
    pub fn new(camera: Box<dyn Camera>, faces: Box<dyn FaceDetector>) -> Self {
        Self {
            camera,
            faces,
            opened: false,
        }
    }

    /// Capture one frame; run face detection only when `want_face`
    pub fn sample(&mut self, want_face: bool) -> SensorSample {
        match self.capture() {
            Ok(frame) => {
                let brightness = frame.brightness();
                let face_present = want_face.then(|| self.faces.detect(&frame));
                debug!(brightness, ?face_present, "sensor sample");
                SensorSample {
                    frame_captured: true,
                    brightness,
                    face_present,
                }
            }
            Err(e) => {
                debug!(error = %e, "no sensor sample");
                SensorSample::unavailable()
            }
        }
    }

    fn capture(&mut self) -> Result<Frame> {
        if !self.opened {
            self.camera.open()?;
            self.opened = true;
            info!("camera opened");
        }

        self.camera.read()
    }

    /// Release the camera now; it is reopened on the next sample
    pub fn release(&mut self) {
        if self.opened {
            self.camera.release();
            self.opened = false;
            info!("camera released");
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.release();
    }
}

/// Camera backed by a command printing one PPM frame per run
pub struct CommandCamera {
    command: CommandTemplate,
}

impl CommandCamera {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }
}

impl Camera for CommandCamera {
    fn open(&mut self) -> Result<()> {
        debug!(command = %self.command, "using command camera");
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        let output = self
            .command
            .command(&[])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::SensorUnavailable(format!("failed to run camera: {e}")))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(Error::SensorUnavailable(format!(
                "camera exited with code {code}"
            )));
        }

        Frame::from_ppm(&output.stdout)
    }

    fn release(&mut self) {}
}

/// Stand-in when no camera is configured
#[derive(Debug, Default)]
pub struct UnavailableCamera;

impl Camera for UnavailableCamera {
    fn open(&mut self) -> Result<()> {
        Err(Error::SensorUnavailable("no camera configured".to_string()))
    }

    fn read(&mut self) -> Result<Frame> {
        Err(Error::SensorUnavailable("no camera configured".to_string()))
    }

    fn release(&mut self) {}
}

/// Face detector backed by a command; frame on stdin, exit 0 = face
pub struct CommandFaceDetector {
    command: CommandTemplate,
}

impl CommandFaceDetector {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }

    fn run(&self, frame: &Frame) -> std::io::Result<bool> {
        let mut child = self
            .command
            .command(&[])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // detector may exit before reading everything
            if let Err(e) = stdin.write_all(&frame.to_ppm()) {
                debug!(?e, "face detector closed stdin early");
            }
        }

        Ok(child.wait()?.success())
    }
}

impl FaceDetector for CommandFaceDetector {
    fn detect(&mut self, frame: &Frame) -> bool {
        match self.run(frame) {
            Ok(found) => found,
            Err(e) => {
                warn!(?e, "face detector failed");
                false
            }
        }
    }
}

/// Stand-in when no face detector is configured
#[derive(Debug, Default)]
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn detect(&mut self, _frame: &Frame) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Scripted camera recording open/release calls
    struct MockCamera {
        frames: Vec<Result<Frame>>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Camera for MockCamera {
        fn open(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("open");
            Ok(())
        }

        fn read(&mut self) -> Result<Frame> {
            self.log.lock().unwrap().push("read");
            if self.frames.is_empty() {
                Err(Error::SensorUnavailable("out of frames".into()))
            } else {
                self.frames.remove(0)
            }
        }

        fn release(&mut self) {
            self.log.lock().unwrap().push("release");
        }
    }

    struct CountingFaces(Arc<Mutex<u32>>);

    impl FaceDetector for CountingFaces {
        fn detect(&mut self, _frame: &Frame) -> bool {
            *self.0.lock().unwrap() += 1;
            true
        }
    }

    fn sampler(
        frames: Vec<Result<Frame>>,
    ) -> (Sampler, Arc<Mutex<Vec<&'static str>>>, Arc<Mutex<u32>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(Mutex::new(0));
        let camera = MockCamera {
            frames,
            log: Arc::clone(&log),
        };
        (
            Sampler::new(Box::new(camera), Box::new(CountingFaces(Arc::clone(&calls)))),
            log,
            calls,
        )
    }

    #[test]
    fn test_face_detection_only_on_demand() {
        let (mut sampler, _, calls) = sampler(vec![
            Ok(Frame::filled(2, 2, [60, 0, 0])),
            Ok(Frame::filled(2, 2, [60, 0, 0])),
        ]);

        let plain = sampler.sample(false);
        assert!(plain.frame_captured);
        assert_eq!(plain.brightness, 60.0);
        assert_eq!(plain.face_present, None);
        assert_eq!(*calls.lock().unwrap(), 0);

        let with_face = sampler.sample(true);
        assert_eq!(with_face.face_present, Some(true));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_read_failure_is_no_information() {
        let (mut sampler, _, calls) = sampler(vec![]);
        let sample = sampler.sample(true);
        assert!(!sample.frame_captured);
        assert_eq!(sample.face_present, None);
        assert!(sample.usable().is_none());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_camera_opened_once_and_released_on_drop() {
        let (mut sampler, log, _) = sampler(vec![
            Ok(Frame::filled(1, 1, [0, 0, 0])),
            Ok(Frame::filled(1, 1, [0, 0, 0])),
        ]);
        sampler.sample(false);
        sampler.sample(false);
        drop(sampler);

        assert_eq!(*log.lock().unwrap(), vec!["open", "read", "read", "release"]);
    }

    #[test]
    fn test_unavailable_camera_never_released() {
        let mut sampler = Sampler::new(Box::new(UnavailableCamera), Box::new(NoFaceDetector));
        assert!(!sampler.sample(false).frame_captured);
        sampler.release();
    }

    #[test]
    fn test_command_camera_reads_ppm() {
        let cmd = CommandTemplate::new(
            "sh",
            vec![
                "-c".to_string(),
                r"printf 'P6\n1 1\n255\n\144\144\144'".to_string(),
            ],
        );
        let mut camera = CommandCamera::new(cmd);
        camera.open().unwrap();
        let frame = camera.read().unwrap();
        assert_eq!(frame.brightness(), 100.0);
    }

    #[test]
    fn test_command_camera_failure() {
        let mut camera = CommandCamera::new(CommandTemplate::new("false", vec![]));
        assert!(matches!(camera.read(), Err(Error::SensorUnavailable(_))));
    }

    #[test]
    fn test_command_face_detector_exit_status() {
        let frame = Frame::filled(2, 2, [1, 2, 3]);
        let mut yes = CommandFaceDetector::new(CommandTemplate::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null".to_string()],
        ));
        assert!(yes.detect(&frame));

        let mut no = CommandFaceDetector::new(CommandTemplate::new("false", vec![]));
        assert!(!no.detect(&frame));
    }
}
