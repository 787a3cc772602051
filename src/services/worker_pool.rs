use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::errors::AppError;

/// Bounded pool for CPU-heavy model fits
///
/// Fits run on tokio's blocking threads so they never stall the request
/// executor. The semaphore caps how many run at once; extra jobs wait for a
/// permit.
#[derive(Clone)]
pub struct FitWorkerPool {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl FitWorkerPool {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Run `job` on a blocking thread once a permit is free.
    ///
    /// The permit moves into the blocking task, so it stays held until the
    /// job actually finishes even if the caller stops waiting.
    pub async fn run<T, F>(&self, job: F) -> Result<T, AppError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("Fit worker pool closed: {}", e)))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| AppError::Internal(format!("Fit worker failed: {}", e)))
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
