use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use expense_forecast_backend::app::create_app;
use expense_forecast_backend::config::AppConfig;
use expense_forecast_backend::logging::{init_logging, LoggingConfig};
use expense_forecast_backend::services::alternate_model::AlternateModelAdapter;
use expense_forecast_backend::services::forecasting_service::{ForecastEngine, ForecastService};
use expense_forecast_backend::services::transaction_source::PgTransactionSource;
use expense_forecast_backend::services::worker_pool::FitWorkerPool;
use expense_forecast_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;

    let alternate = AlternateModelAdapter::from_runtime(config.forecast.trend_model_enabled);
    tracing::info!(
        "Alternate model {}",
        if alternate.is_available() { "available" } else { "unavailable" }
    );

    let forecasts = ForecastService::new(
        ForecastEngine::with_alternate(alternate),
        FitWorkerPool::new(config.forecast.max_concurrent_fits),
        config.forecast.fit_timeout,
    );

    let state = AppState {
        transactions: Arc::new(PgTransactionSource::new(pool)),
        forecasts: Arc::new(forecasts),
    };
    let app = create_app(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(
        "Expense forecast backend running at http://{}/ ({} concurrent fits, {}s timeout)",
        config.bind_addr,
        config.forecast.max_concurrent_fits,
        config.forecast.fit_timeout.as_secs()
    );
    axum::serve(listener, app).await?;

    Ok(())
}
