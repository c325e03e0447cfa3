//! Cooperative cancellation for batch builds
//!
//! One token covers one batch. `BatchPipeline` checks it before scheduling
//! each paper, again before each generator call starts, and between the
//! sequential stages. Ranking loops check it once per iteration. A paper
//! whose generator call is already running finishes that call; everything
//! not yet started is skipped and the batch fails with `Cancelled`, so no
//! half-built snapshot is ever published.

use crate::graph::{ScholiaError, ScholiaResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token, shared by clone.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// `Err(Cancelled)` once cancellation was requested; the form used at
    /// paper and stage boundaries
    pub fn check(&self) -> ScholiaResult<()> {
        if self.is_cancelled() {
            Err(ScholiaError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
