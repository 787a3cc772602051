use std::sync::Arc;

use tracing::warn;

use crate::errors::ForecastError;
use crate::models::{ForecastPoint, Horizon, ModelChoice, ModelInfo, Series};
use crate::services::cancellation::CancelFlag;
use crate::services::forecast_strategy::ForecastStrategy;
use crate::services::forecaster::build_interval_points;
use crate::services::trend_model::TrendModel;

/// Minimum monthly points for the trend model.
pub const MIN_POINTS: usize = 2;

/// Strategy backed by an optional trend model.
///
/// When no backend is configured every request fails with
/// `ModelUnavailable`, after the usual length check.
#[derive(Clone)]
pub struct AlternateModelAdapter {
    backend: Option<Arc<dyn TrendModel>>,
}

impl AlternateModelAdapter {
    pub fn new(backend: Arc<dyn TrendModel>) -> Self {
        Self { backend: Some(backend) }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// Built-in backend when it is both compiled in and enabled.
    pub fn from_runtime(enabled: bool) -> Self {
        if !enabled {
            return Self::unavailable();
        }
        match builtin_backend() {
            Some(backend) => Self::new(backend),
            None => {
                warn!("TREND_MODEL_ENABLED is set but the trend-model feature is not compiled in");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }
}

#[cfg(feature = "trend-model")]
fn builtin_backend() -> Option<Arc<dyn TrendModel>> {
    Some(Arc::new(crate::services::trend_model::PiecewiseTrendModel::default()))
}

#[cfg(not(feature = "trend-model"))]
fn builtin_backend() -> Option<Arc<dyn TrendModel>> {
    None
}

impl ForecastStrategy for AlternateModelAdapter {
    fn minimum_points(&self) -> usize {
        MIN_POINTS
    }

    fn fit_and_forecast(
        &self,
        series: &Series,
        horizon: Horizon,
        cancel: &CancelFlag,
    ) -> Result<(Vec<ForecastPoint>, ModelInfo), ForecastError> {
        if series.len() < MIN_POINTS {
            return Err(ForecastError::Validation(format!(
                "Insufficient data: need at least {} monthly points for the alternate model, got {}. Widen the date range.",
                MIN_POINTS,
                series.len()
            )));
        }

        let backend = self.backend.as_ref().ok_or_else(|| {
            warn!("Alternate model requested but no trend model is available");
            ForecastError::ModelUnavailable(
                "The alternate forecasting model is not available on this server".to_string(),
            )
        })?;

        let steps = backend.fit_predict(&series.values(), horizon.get(), cancel)?;
        let points = build_interval_points(&series.future_periods(horizon), &steps)?;

        let info = ModelInfo {
            model: ModelChoice::Alternate,
            implementation: backend.name().to_string(),
            order: None,
            aic: None,
            fallback: None,
        };
        Ok((points, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MonthlySeriesPoint, YearMonth};

    struct FlatModel;

    impl TrendModel for FlatModel {
        fn name(&self) -> &'static str {
            "flat"
        }

        fn fit_predict(
            &self,
            values: &[f64],
            horizon: usize,
            _cancel: &CancelFlag,
        ) -> Result<Vec<(f64, f64)>, ForecastError> {
            let last = values[values.len() - 1];
            Ok(vec![(last, 1.0); horizon])
        }
    }

    fn series(values: &[f64]) -> Series {
        let mut period = YearMonth::new(2024, 5).unwrap();
        let mut points = Vec::new();
        for &value in values {
            points.push(MonthlySeriesPoint { period, value });
            period = period.succ();
        }
        Series::from_points(points).unwrap()
    }

    #[test]
    fn test_delegates_to_backend() {
        let adapter = AlternateModelAdapter::new(Arc::new(FlatModel));
        let (points, info) = adapter
            .fit_and_forecast(&series(&[3.0, 7.0]), Horizon::new(2).unwrap(), &CancelFlag::new())
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].period, YearMonth::new(2024, 8).unwrap());
        assert_eq!(points[0].mean, 7.0);
        assert_eq!(info.model, ModelChoice::Alternate);
        assert_eq!(info.implementation, "flat");
        assert!(info.order.is_none());
    }

    #[test]
    fn test_unavailable_backend() {
        let adapter = AlternateModelAdapter::unavailable();
        assert!(!adapter.is_available());
        let err = adapter
            .fit_and_forecast(&series(&[1.0, 2.0, 3.0]), Horizon::new(1).unwrap(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelUnavailable(_)));
    }

    #[test]
    fn test_length_checked_before_capability() {
        let err = AlternateModelAdapter::unavailable()
            .fit_and_forecast(&series(&[1.0]), Horizon::new(1).unwrap(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn test_disabled_at_runtime() {
        assert!(!AlternateModelAdapter::from_runtime(false).is_available());
    }
}
