use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::TransactionRow;

/// Transactions of one org matching the forecast filters, oldest first.
///
/// Both date bounds are inclusive whole days.
pub async fn fetch_for_forecast(
    pool: &PgPool,
    org_id: i64,
    kinds: &[String],
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    currency: &str,
) -> Result<Vec<TransactionRow>, sqlx::Error> {
    sqlx::query_as::<_, TransactionRow>(
        "SELECT date, amount, type, currency
         FROM transactions
         WHERE org_id = $1
           AND type = ANY($2)
           AND ($3::date IS NULL OR date::date >= $3)
           AND ($4::date IS NULL OR date::date <= $4)
           AND currency = $5
         ORDER BY date",
    )
    .bind(org_id)
    .bind(kinds)
    .bind(date_from)
    .bind(date_to)
    .bind(currency)
    .fetch_all(pool)
    .await
}
