//! Reference [`Dispatcher`] implementations.
//!
//! Jobs never touch session state directly: they post their outcome into the
//! session's completion channel, and the UI thread applies it in `pump()`.
//! That makes the choice of dispatcher invisible to the crop logic.

use crate::host::{Dispatcher, Job};

/// Runs every job immediately on the calling thread.
///
/// Used where threads are unavailable (WebAssembly) and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Runs jobs on the global rayon thread pool.
#[cfg(feature = "threads")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonDispatcher;

#[cfg(feature = "threads")]
impl Dispatcher for RayonDispatcher {
    fn dispatch(&self, job: Job) {
        rayon::spawn(job);
    }
}
