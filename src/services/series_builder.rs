//! Turns irregular transaction records into a gap-free monthly series.

use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, ToPrimitive};
use tracing::debug;

use crate::errors::ForecastError;
use crate::models::{
    ForecastTarget, MonthlySeriesPoint, Series, TransactionKind, TransactionRecord, YearMonth,
};

#[derive(Debug, Default, Clone)]
struct MonthTotals {
    income: BigDecimal,
    expense: BigDecimal,
}

/// Transaction kinds that feed a target. Transfers never do.
pub fn kinds_for_target(target: ForecastTarget) -> &'static [TransactionKind] {
    match target {
        ForecastTarget::Income => &[TransactionKind::Income],
        ForecastTarget::Expense => &[TransactionKind::Expense],
        ForecastTarget::Net => &[TransactionKind::Income, TransactionKind::Expense],
    }
}

/// Build the monthly series for `target`.
///
/// Only records whose kind feeds the target are considered; the month range
/// spans the earliest to the latest of those records and every month inside
/// it without records is zero-filled.
pub fn build_monthly_series(
    records: &[TransactionRecord],
    target: ForecastTarget,
) -> Result<Series, ForecastError> {
    let kinds = kinds_for_target(target);
    let mut totals: BTreeMap<YearMonth, MonthTotals> = BTreeMap::new();

    for record in records.iter().filter(|r| kinds.contains(&r.kind)) {
        let month = totals
            .entry(YearMonth::from_date(record.date.date_naive()))
            .or_default();
        match record.kind {
            TransactionKind::Income => month.income += &record.amount,
            TransactionKind::Expense => month.expense += record.amount.abs(),
            TransactionKind::Transfer => {}
        }
    }

    if totals.is_empty() {
        return Err(ForecastError::Data(
            "No data available for the selected filters.".to_string(),
        ));
    }

    let mut observed = BTreeMap::new();
    for (period, month) in totals {
        let value = match target {
            ForecastTarget::Income => month.income,
            ForecastTarget::Expense => month.expense,
            ForecastTarget::Net => month.income - month.expense,
        };
        let value = value.to_f64().ok_or_else(|| {
            ForecastError::Computation(format!("Monthly total for {} is not representable", period))
        })?;
        observed.insert(period, value);
    }

    debug!(
        "Aggregated {} records into {} observed months for target {:?}",
        records.len(),
        observed.len(),
        target
    );

    regularize(&observed)
}

/// Zero-fill every missing month between the first and last observed month.
///
/// Observed months keep their value untouched; no interpolation happens.
pub fn regularize(observed: &BTreeMap<YearMonth, f64>) -> Result<Series, ForecastError> {
    let (first, last) = match (observed.keys().next(), observed.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ForecastError::Data(
                "No data available for the selected filters.".to_string(),
            ))
        }
    };

    let mut points = Vec::with_capacity(first.months_until(&last) as usize + 1);
    let mut period = first;
    loop {
        points.push(MonthlySeriesPoint {
            period,
            value: observed.get(&period).copied().unwrap_or(0.0),
        });
        if period == last {
            break;
        }
        period = period.succ();
    }

    Series::from_points(points)
}
