pub mod forecast;
pub mod period;
mod transaction;

pub use forecast::{
    ArimaOrder, ForecastEntry, ForecastPoint, ForecastRequest, ForecastRequestPayload,
    ForecastResult, ForecastTarget, HistoryEntry, Horizon, ModelChoice, ModelInfo,
    MonthlySeriesPoint, Series, CONFIDENCE_LEVEL, DEFAULT_CURRENCY,
};
pub use period::YearMonth;
pub use transaction::{TransactionKind, TransactionRecord, TransactionRow};
