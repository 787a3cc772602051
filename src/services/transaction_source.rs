use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, error};

use crate::db::transaction_queries;
use crate::errors::AppError;
use crate::models::{ForecastRequest, TransactionKind, TransactionRecord};
use crate::services::series_builder::kinds_for_target;

/// Filters applied before records reach the forecasting core
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub currency: String,
    pub kinds: Vec<TransactionKind>,
}

impl RecordFilter {
    pub fn for_request(request: &ForecastRequest) -> Self {
        Self {
            date_from: request.date_from,
            date_to: request.date_to,
            currency: request.currency.clone(),
            kinds: kinds_for_target(request.target).to_vec(),
        }
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let day = record.date.date_naive();
        self.kinds.contains(&record.kind)
            && record.currency == self.currency
            && self.date_from.map_or(true, |from| day >= from)
            && self.date_to.map_or(true, |to| day <= to)
    }
}

/// Where org-scoped transaction records come from.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_for_forecast(
        &self,
        org_id: i64,
        filter: &RecordFilter,
    ) -> Result<Vec<TransactionRecord>, AppError>;
}

pub struct PgTransactionSource {
    pool: PgPool,
}

impl PgTransactionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionSource for PgTransactionSource {
    async fn fetch_for_forecast(
        &self,
        org_id: i64,
        filter: &RecordFilter,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let kinds: Vec<String> = filter.kinds.iter().map(|k| k.as_str().to_string()).collect();
        let rows = transaction_queries::fetch_for_forecast(
            &self.pool,
            org_id,
            &kinds,
            filter.date_from,
            filter.date_to,
            &filter.currency,
        )
        .await?;
        debug!("Loaded {} transactions for org {}", rows.len(), org_id);

        rows.into_iter()
            .map(|row| {
                TransactionRecord::try_from(row).map_err(|e| {
                    error!("Unreadable transaction row for org {}: {}", org_id, e);
                    AppError::Internal(e)
                })
            })
            .collect()
    }
}

/// Fixed per-org record lists, filtered in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransactionSource {
    records: Vec<(i64, TransactionRecord)>,
}

impl InMemoryTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, org_id: i64, records: impl IntoIterator<Item = TransactionRecord>) -> Self {
        self.records.extend(records.into_iter().map(|r| (org_id, r)));
        self
    }
}

#[async_trait]
impl TransactionSource for InMemoryTransactionSource {
    async fn fetch_for_forecast(
        &self,
        org_id: i64,
        filter: &RecordFilter,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .filter(|(org, record)| *org == org_id && filter.matches(record))
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForecastTarget, Horizon, ModelChoice};
    use bigdecimal::BigDecimal;
    use chrono::{TimeZone, Utc};

    fn record(day: u32, kind: TransactionKind, currency: &str) -> TransactionRecord {
        TransactionRecord::new(
            Utc.with_ymd_and_hms(2024, 3, day, 23, 30, 0).unwrap(),
            BigDecimal::from(10),
            kind,
            currency,
        )
    }

    fn filter(target: ForecastTarget) -> RecordFilter {
        let request = ForecastRequest::new(target, ModelChoice::Primary, Horizon::new(1).unwrap())
            .with_date_range(NaiveDate::from_ymd_opt(2024, 3, 5), NaiveDate::from_ymd_opt(2024, 3, 10))
            .unwrap();
        RecordFilter::for_request(&request)
    }

    #[test]
    fn test_date_bounds_cover_whole_days() {
        let f = filter(ForecastTarget::Expense);
        assert!(f.matches(&record(5, TransactionKind::Expense, "USD")));
        assert!(f.matches(&record(10, TransactionKind::Expense, "USD")));
        assert!(!f.matches(&record(4, TransactionKind::Expense, "USD")));
        assert!(!f.matches(&record(11, TransactionKind::Expense, "USD")));
    }

    #[test]
    fn test_kind_and_currency_filters() {
        let f = filter(ForecastTarget::Net);
        assert!(f.matches(&record(6, TransactionKind::Income, "USD")));
        assert!(!f.matches(&record(6, TransactionKind::Transfer, "USD")));
        assert!(!f.matches(&record(6, TransactionKind::Income, "EUR")));
    }

    #[tokio::test]
    async fn test_in_memory_source_scopes_by_org() {
        let source = InMemoryTransactionSource::new()
            .with_records(1, vec![record(7, TransactionKind::Expense, "USD")])
            .with_records(2, vec![record(8, TransactionKind::Expense, "USD")]);

        let found = source
            .fetch_for_forecast(1, &filter(ForecastTarget::Expense))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
    }
}
