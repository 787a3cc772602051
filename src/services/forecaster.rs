use crate::errors::ForecastError;
use crate::models::{ForecastPoint, Horizon, Series, YearMonth};
use crate::services::arima::ArimaFit;

/// Two-sided standard normal quantile for the fixed 80% band.
pub const Z_80: f64 = 1.2815515655446004;

/// Extend a fitted ARIMA model `horizon` months past the end of `series`.
pub fn forecast_arima(
    fit: &ArimaFit,
    series: &Series,
    horizon: Horizon,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let steps = fit.forecast(horizon.get());
    build_interval_points(&series.future_periods(horizon), &steps)
}

/// Turn (mean, standard error) pairs into forecast points with 80% bands.
///
/// Fails with `ComputationError` rather than emitting a non-finite value or an
/// inverted band, so `lower <= mean <= upper` holds for every returned point.
pub fn build_interval_points(
    periods: &[YearMonth],
    steps: &[(f64, f64)],
) -> Result<Vec<ForecastPoint>, ForecastError> {
    if periods.len() != steps.len() {
        return Err(ForecastError::Computation(format!(
            "Model produced {} steps for {} requested periods",
            steps.len(),
            periods.len()
        )));
    }

    periods
        .iter()
        .zip(steps)
        .map(|(&period, &(mean, std_error))| {
            let half_width = Z_80 * std_error.abs();
            let point = ForecastPoint {
                period,
                mean,
                lower: mean - half_width,
                upper: mean + half_width,
            };
            if !(point.mean.is_finite() && point.lower.is_finite() && point.upper.is_finite()) {
                return Err(ForecastError::Computation(format!(
                    "Forecast for {} is not finite",
                    period
                )));
            }
            if point.lower > point.mean || point.mean > point.upper {
                return Err(ForecastError::Computation(format!(
                    "Forecast interval for {} is inverted",
                    period
                )));
            }
            Ok(point)
        })
        .collect()
}
