//! Wakeword detection
//!
//! A background detector sets a thread-safe flag; the render loop polls
//! and clears it once per tick.

mod detector;
mod signal;

pub use detector::{
    ActivationCallback, ListenerGuard, ProcessDetector, SilentDetector, WakeDetector,
    WakeListener,
};
pub use signal::WakeSignal;
