use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::ForecastError;
use crate::models::period::YearMonth;

/// Interval width used for every forecast band.
pub const CONFIDENCE_LEVEL: f64 = 0.80;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Signal a monthly series is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastTarget {
    Net,
    Expense,
    Income,
}

impl FromStr for ForecastTarget {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "net" => Ok(ForecastTarget::Net),
            "expense" => Ok(ForecastTarget::Expense),
            "income" => Ok(ForecastTarget::Income),
            other => Err(ForecastError::Validation(format!(
                "Unsupported target '{}'. Must be 'net', 'expense', or 'income'",
                other
            ))),
        }
    }
}

/// Forecasting strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// ARIMA family with AIC order selection
    Primary,
    /// Additive trend model
    Alternate,
}

impl FromStr for ModelChoice {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "arima" => Ok(ModelChoice::Primary),
            "alternate" | "prophet" => Ok(ModelChoice::Alternate),
            other => Err(ForecastError::Validation(format!(
                "Unsupported model '{}'. Must be 'primary' (arima) or 'alternate' (prophet)",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelChoice::Primary => write!(f, "primary"),
            ModelChoice::Alternate => write!(f, "alternate"),
        }
    }
}

/// Number of future months to forecast, always within 1..=36.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon(usize);

impl Horizon {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 36;

    pub fn new(months: i64) -> Result<Self, ForecastError> {
        if !(Self::MIN..=Self::MAX).contains(&months) {
            return Err(ForecastError::Validation(format!(
                "Forecast horizon must be between {} and {} months, got {}",
                Self::MIN,
                Self::MAX,
                months
            )));
        }
        Ok(Self(months as usize))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

/// Forecast request as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequestPayload {
    pub target: String,
    #[serde(default)]
    pub model: Option<String>,
    pub horizon: i64,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Validated forecast request. Only constructible through validation,
/// so the horizon is in range and the date window is ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub target: ForecastTarget,
    pub model: ModelChoice,
    pub horizon: Horizon,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub currency: String,
}

impl ForecastRequest {
    pub fn new(target: ForecastTarget, model: ModelChoice, horizon: Horizon) -> Self {
        Self {
            target,
            model,
            horizon,
            date_from: None,
            date_to: None,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_date_range(
        mut self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Self, ForecastError> {
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(ForecastError::Validation(
                    "date_from must be <= date_to".to_string(),
                ));
            }
        }
        self.date_from = date_from;
        self.date_to = date_to;
        Ok(self)
    }

    /// Currency codes are matched exactly as stored, so only whitespace is trimmed.
    pub fn with_currency(mut self, currency: Option<&str>) -> Self {
        self.currency = match currency.map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => DEFAULT_CURRENCY.to_string(),
        };
        self
    }
}

impl TryFrom<ForecastRequestPayload> for ForecastRequest {
    type Error = ForecastError;

    fn try_from(payload: ForecastRequestPayload) -> Result<Self, Self::Error> {
        let target = payload.target.parse::<ForecastTarget>()?;
        let model = match payload.model.as_deref() {
            Some(name) => name.parse::<ModelChoice>()?,
            None => ModelChoice::Primary,
        };
        let horizon = Horizon::new(payload.horizon)?;

        Ok(ForecastRequest::new(target, model, horizon)
            .with_date_range(payload.date_from, payload.date_to)?
            .with_currency(payload.currency.as_deref()))
    }
}

/// One month of an observed series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlySeriesPoint {
    pub period: YearMonth,
    pub value: f64,
}

/// Gap-free monthly series: strictly increasing periods with no missing month.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    points: Vec<MonthlySeriesPoint>,
}

impl Series {
    pub fn from_points(points: Vec<MonthlySeriesPoint>) -> Result<Self, ForecastError> {
        if points.is_empty() {
            return Err(ForecastError::Data(
                "No data available for the selected filters.".to_string(),
            ));
        }
        for pair in points.windows(2) {
            if pair[0].period.succ() != pair[1].period {
                return Err(ForecastError::Computation(format!(
                    "Series is not gap-free between {} and {}",
                    pair[0].period, pair[1].period
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[MonthlySeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn value_at(&self, period: YearMonth) -> Option<f64> {
        self.points.iter().find(|p| p.period == period).map(|p| p.value)
    }

    pub fn last_period(&self) -> YearMonth {
        // never empty: enforced by `from_points`
        self.points[self.points.len() - 1].period
    }

    /// The `horizon` months following the last observed month.
    pub fn future_periods(&self, horizon: Horizon) -> Vec<YearMonth> {
        let mut period = self.last_period();
        (0..horizon.get())
            .map(|_| {
                period = period.succ();
                period
            })
            .collect()
    }
}

/// A single forecast month with its interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub period: YearMonth,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// ARIMA structural order (p, d, q). Serialized as `[p, d, q]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl Serialize for ArimaOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.p, self.d, self.q].serialize(serializer)
    }
}

/// Describes which strategy produced a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model: ModelChoice,
    #[serde(rename = "impl")]
    pub implementation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<ArimaOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub period: String,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Response body of a forecast request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub history: Vec<HistoryEntry>,
    pub forecast: Vec<ForecastEntry>,
    pub model_info: ModelInfo,
}
