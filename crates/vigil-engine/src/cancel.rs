//! Cooperative cancellation for batch jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use vigil_core::{VigilError, VigilResult};

/// Shared cancellation flag checked between units of work.
///
/// Batch jobs (anomaly windows, vulnerability scans) poll the flag at
/// step boundaries; a cancelled job stops with [`VigilError::Cancelled`]
/// and performs no further store writes. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Errors with [`VigilError::Cancelled`] once the flag is set.
    pub fn check(&self) -> VigilResult<()> {
        if self.is_cancelled() {
            Err(VigilError::Cancelled)
        } else {
            Ok(())
        }
    }
}
