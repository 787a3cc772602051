pub mod alternate_model;
pub mod arima;
pub mod cancellation;
pub mod forecast_strategy;
pub mod forecaster;
pub mod forecasting_service;
pub mod model_selection;
pub mod optimizer;
pub mod response_assembler;
pub mod series_builder;
pub mod transaction_source;
pub mod trend_model;
pub mod worker_pool;
