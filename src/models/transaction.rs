use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(format!("Unknown transaction type '{}'", other)),
        }
    }
}

/// An already-authorized transaction handed to the forecasting engine.
/// Amounts are non-negative; the kind carries the sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: DateTime<Utc>,
    pub amount: BigDecimal,
    pub kind: TransactionKind,
    pub currency: String,
}

impl TransactionRecord {
    pub fn new(date: DateTime<Utc>, amount: BigDecimal, kind: TransactionKind, currency: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            kind,
            currency: currency.into(),
        }
    }
}

/// Row shape of the `transactions` table as read for forecasting.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub date: DateTime<Utc>,
    pub amount: BigDecimal,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub currency: Option<String>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = String;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            date: row.date,
            amount: row.amount,
            kind: row.kind.parse()?,
            currency: row.currency.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_known_values() {
        assert_eq!("income".parse::<TransactionKind>().unwrap(), TransactionKind::Income);
        assert_eq!("expense".parse::<TransactionKind>().unwrap(), TransactionKind::Expense);
        assert_eq!("transfer".parse::<TransactionKind>().unwrap(), TransactionKind::Transfer);
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_row_conversion_rejects_unknown_kind() {
        let row = TransactionRow {
            date: Utc::now(),
            amount: BigDecimal::from(10),
            kind: "gift".to_string(),
            currency: Some("USD".to_string()),
        };
        assert!(TransactionRecord::try_from(row).is_err());
    }
}
