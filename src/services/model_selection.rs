use tracing::{debug, info, warn};

use crate::errors::ForecastError;
use crate::models::ArimaOrder;
use crate::services::arima::{fit_arima, ArimaFit};
use crate::services::cancellation::CancelFlag;

/// Orders searched, in this exact sequence. Earlier entries win AIC ties.
pub const CANDIDATE_ORDERS: [ArimaOrder; 4] = [
    ArimaOrder::new(1, 1, 0),
    ArimaOrder::new(1, 1, 1),
    ArimaOrder::new(0, 1, 1),
    ArimaOrder::new(2, 1, 1),
];

/// Order fitted directly when no candidate converges.
pub const FALLBACK_ORDER: ArimaOrder = ArimaOrder::new(1, 1, 1);

/// Minimum monthly points for the ARIMA family.
pub const MIN_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Converged { aic: f64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub order: ArimaOrder,
    pub outcome: CandidateOutcome,
}

/// Outcome of the order search
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub fit: ArimaFit,
    pub used_fallback: bool,
    pub candidates: Vec<CandidateResult>,
}

/// Search the standard candidate orders and keep the lowest-AIC converged fit.
pub fn select_model(values: &[f64], cancel: &CancelFlag) -> Result<ModelSelection, ForecastError> {
    select_from_candidates(values, &CANDIDATE_ORDERS, FALLBACK_ORDER, cancel)
}

/// Order search over an explicit candidate list.
///
/// Candidates that fail or do not converge are skipped. Ties on AIC keep the
/// earlier candidate. With no survivor, `fallback` is fitted directly and only
/// needs admissible, finite parameters; if even that fails the whole search is
/// a `ComputationError`.
pub fn select_from_candidates(
    values: &[f64],
    candidates: &[ArimaOrder],
    fallback: ArimaOrder,
    cancel: &CancelFlag,
) -> Result<ModelSelection, ForecastError> {
    if values.len() < MIN_POINTS {
        return Err(ForecastError::Validation(format!(
            "Insufficient data: need at least {} monthly points for the primary model, got {}. Widen the date range.",
            MIN_POINTS,
            values.len()
        )));
    }

    let mut best: Option<ArimaFit> = None;
    let mut results = Vec::with_capacity(candidates.len());

    for &order in candidates {
        cancel.check()?;

        let outcome = match fit_arima(values, order, cancel) {
            Ok(fit) if fit.converged => {
                debug!(
                    "ARIMA{} converged with log-likelihood {:.4}, AIC {:.4}",
                    order, fit.log_likelihood, fit.aic
                );
                let aic = fit.aic;
                let improves = best.as_ref().map_or(true, |current| aic < current.aic);
                if improves {
                    best = Some(fit);
                }
                CandidateOutcome::Converged { aic }
            }
            Ok(_) => {
                debug!("ARIMA{} did not converge", order);
                CandidateOutcome::Failed { reason: "optimizer did not converge".to_string() }
            }
            Err(ForecastError::Cancelled) => return Err(ForecastError::Cancelled),
            Err(e) => {
                debug!("ARIMA{} skipped: {}", order, e);
                CandidateOutcome::Failed { reason: e.to_string() }
            }
        };
        results.push(CandidateResult { order, outcome });
    }

    if let Some(fit) = best {
        info!("Selected ARIMA{} (AIC {:.4})", fit.order, fit.aic);
        return Ok(ModelSelection { fit, used_fallback: false, candidates: results });
    }

    warn!("No candidate order converged, fitting fallback ARIMA{}", fallback);
    let fit = fit_arima(values, fallback, cancel).map_err(|e| match e {
        ForecastError::Cancelled => ForecastError::Cancelled,
        other => ForecastError::Computation(format!(
            "Model fitting failed for every candidate order and the fallback ARIMA{}: {}",
            fallback, other
        )),
    })?;

    Ok(ModelSelection { fit, used_fallback: true, candidates: results })
}
