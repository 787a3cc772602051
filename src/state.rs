use std::sync::Arc;

use crate::services::forecasting_service::ForecastService;
use crate::services::transaction_source::TransactionSource;

#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<dyn TransactionSource>,
    pub forecasts: Arc<ForecastService>,
}
