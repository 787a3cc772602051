use crate::models::{ForecastEntry, ForecastPoint, ForecastResult, HistoryEntry, ModelInfo, Series};

/// Shape a series and its forecast into the response payload.
pub fn assemble(series: &Series, forecast: &[ForecastPoint], model_info: ModelInfo) -> ForecastResult {
    let history = series
        .points()
        .iter()
        .map(|point| HistoryEntry {
            period: point.period.to_string(),
            value: point.value,
        })
        .collect();

    let forecast = forecast
        .iter()
        .map(|point| ForecastEntry {
            period: point.period.to_string(),
            yhat: point.mean,
            yhat_lower: point.lower,
            yhat_upper: point.upper,
        })
        .collect();

    ForecastResult {
        history,
        forecast,
        model_info,
    }
}
