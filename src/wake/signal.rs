//! Single-slot wake flag shared between the detector thread and the engine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// "A wake event occurred since last consumed"
///
/// The detector thread only ever calls [`WakeSignal::set`]; the render
/// loop calls [`WakeSignal::consume`] once per tick. The swap in
/// `consume` makes read-and-clear a single step, so an activation that
/// lands between the read and the clear is never lost.
#[derive(Debug, Clone, Default)]
pub struct WakeSignal {
    pending: Arc<AtomicBool>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an activation. Idempotent.
    pub fn set(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Read and clear the flag
    pub fn consume(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Peek without clearing
    pub fn is_set(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
