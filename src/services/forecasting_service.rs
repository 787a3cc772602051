use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, ForecastError};
use crate::models::{ForecastRequest, ForecastResult, ModelChoice, TransactionRecord};
use crate::services::alternate_model::AlternateModelAdapter;
use crate::services::cancellation::CancelFlag;
use crate::services::forecast_strategy::{ForecastStrategy, PrimaryStrategy};
use crate::services::response_assembler::assemble;
use crate::services::series_builder::build_monthly_series;
use crate::services::worker_pool::FitWorkerPool;

/// Synchronous forecasting core: records in, forecast out.
pub struct ForecastEngine {
    primary: Arc<dyn ForecastStrategy>,
    alternate: Arc<dyn ForecastStrategy>,
}

impl ForecastEngine {
    pub fn new(primary: Arc<dyn ForecastStrategy>, alternate: Arc<dyn ForecastStrategy>) -> Self {
        Self { primary, alternate }
    }

    /// ARIMA primary plus the given alternate adapter.
    pub fn with_alternate(alternate: AlternateModelAdapter) -> Self {
        Self::new(Arc::new(PrimaryStrategy), Arc::new(alternate))
    }

    fn strategy(&self, choice: ModelChoice) -> &dyn ForecastStrategy {
        match choice {
            ModelChoice::Primary => self.primary.as_ref(),
            ModelChoice::Alternate => self.alternate.as_ref(),
        }
    }

    pub fn compute_forecast(
        &self,
        records: &[TransactionRecord],
        request: &ForecastRequest,
    ) -> Result<ForecastResult, ForecastError> {
        self.compute_forecast_cancellable(records, request, &CancelFlag::new())
    }

    /// Build the monthly series for the request target, fit the chosen
    /// strategy and assemble the response. Records are expected to be
    /// filtered by org, date range and currency already.
    pub fn compute_forecast_cancellable(
        &self,
        records: &[TransactionRecord],
        request: &ForecastRequest,
        cancel: &CancelFlag,
    ) -> Result<ForecastResult, ForecastError> {
        let series = build_monthly_series(records, request.target)?;

        let strategy = self.strategy(request.model);
        if series.len() < strategy.minimum_points() {
            return Err(ForecastError::Validation(format!(
                "Insufficient data: need at least {} monthly points for the {} model, got {}. Widen the date range.",
                strategy.minimum_points(),
                request.model,
                series.len()
            )));
        }

        cancel.check()?;
        let (points, model_info) = strategy.fit_and_forecast(&series, request.horizon, cancel)?;
        Ok(assemble(&series, &points, model_info))
    }
}

/// Raises the flag when dropped, so a caller that stops waiting (timeout or a
/// dropped request future) also stops the blocking fit.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Runs the engine off the async executor, bounded and with a deadline.
#[derive(Clone)]
pub struct ForecastService {
    engine: Arc<ForecastEngine>,
    pool: FitWorkerPool,
    timeout: Duration,
}

impl ForecastService {
    pub fn new(engine: ForecastEngine, pool: FitWorkerPool, timeout: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            pool,
            timeout,
        }
    }

    pub async fn run(
        &self,
        records: Vec<TransactionRecord>,
        request: ForecastRequest,
    ) -> Result<ForecastResult, AppError> {
        let run_id = Uuid::new_v4();
        info!(
            "Forecast run {}: target={:?} model={} horizon={} records={}",
            run_id,
            request.target,
            request.model,
            request.horizon.get(),
            records.len()
        );

        let cancel = CancelFlag::new();
        let job_cancel = cancel.clone();
        let _guard = CancelOnDrop(cancel.clone());
        let engine = self.engine.clone();
        let started = Instant::now();

        let job = self.pool.run(move || {
            engine.compute_forecast_cancellable(&records, &request, &job_cancel)
        });

        match tokio::time::timeout(self.timeout, job).await {
            Ok(Ok(Ok(result))) => {
                info!(
                    "Forecast run {} finished in {:?} ({} history, {} forecast points)",
                    run_id,
                    started.elapsed(),
                    result.history.len(),
                    result.forecast.len()
                );
                Ok(result)
            }
            Ok(Ok(Err(e))) => {
                warn!("Forecast run {} failed ({}): {}", run_id, e.code(), e);
                Err(AppError::Forecast(e))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                cancel.cancel();
                warn!(
                    "Forecast run {} exceeded {}s, cancelling",
                    run_id,
                    self.timeout.as_secs()
                );
                Err(AppError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
