use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::ForecastError;

/// Shared flag the caller raises to abort a running fit.
///
/// Long loops poll it through [`CancelFlag::check`] and bail out with
/// `ForecastError::Cancelled`, so a cancelled run never yields a result.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), ForecastError> {
        if self.is_cancelled() {
            Err(ForecastError::Cancelled)
        } else {
            Ok(())
        }
    }
}
