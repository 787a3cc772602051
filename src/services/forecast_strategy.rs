use crate::errors::ForecastError;
use crate::models::{ForecastPoint, Horizon, ModelChoice, ModelInfo, Series};
use crate::services::cancellation::CancelFlag;
use crate::services::forecaster::forecast_arima;
use crate::services::model_selection::{self, select_model};

/// One forecasting method: fits a series and extends it `horizon` months.
///
/// Implementations run on blocking worker threads and must poll `cancel`
/// between expensive steps.
pub trait ForecastStrategy: Send + Sync {
    /// Shortest series the strategy accepts
    fn minimum_points(&self) -> usize;

    fn fit_and_forecast(
        &self,
        series: &Series,
        horizon: Horizon,
        cancel: &CancelFlag,
    ) -> Result<(Vec<ForecastPoint>, ModelInfo), ForecastError>;
}

/// ARIMA order search scored by AIC
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryStrategy;

impl ForecastStrategy for PrimaryStrategy {
    fn minimum_points(&self) -> usize {
        model_selection::MIN_POINTS
    }

    fn fit_and_forecast(
        &self,
        series: &Series,
        horizon: Horizon,
        cancel: &CancelFlag,
    ) -> Result<(Vec<ForecastPoint>, ModelInfo), ForecastError> {
        let selection = select_model(&series.values(), cancel)?;
        cancel.check()?;
        let points = forecast_arima(&selection.fit, series, horizon)?;

        let info = ModelInfo {
            model: ModelChoice::Primary,
            implementation: "css-arima".to_string(),
            order: Some(selection.fit.order),
            aic: Some(selection.fit.aic),
            fallback: Some(selection.used_fallback),
        };
        Ok((points, info))
    }
}
