//! Sensor sampling over the camera and face detector
//!
//! Brightness is the mean HSV value channel of a frame. Face detection
//! is expensive, so it only runs when a caller asks for it.

mod frame;
mod sampler;

pub use frame::Frame;
pub use sampler::{
    Camera, CommandCamera, CommandFaceDetector, FaceDetector, NoFaceDetector, Sampler,
    SensorSample, UnavailableCamera,
};
