//! ARIMA(p, d, q) estimation by conditional sum of squares.
//!
//! The series is differenced `d` times, ARMA(p, q) coefficients are found by
//! minimising the conditional residual sum of squares, and forecasts are
//! integrated back to the original scale. Pre-sample values and shocks are
//! held at zero, so every order with the same `d` is scored on the same
//! observations and AIC values stay comparable across `p` and `q`. Forecast variance comes from the
//! psi-weights of the integrated model:
//!
//! Var(h) = σ² · Σ_{j<h} ψⱼ²
//!
//! Constraints: AR polynomial stationary, MA polynomial invertible.

use std::f64::consts::PI;

use tracing::debug;

use crate::errors::ForecastError;
use crate::models::ArimaOrder;
use crate::services::cancellation::CancelFlag;
use crate::services::optimizer::{nelder_mead, NelderMeadOptions};

/// Lower bound on the residual variance so a perfect fit keeps a finite likelihood.
/// Relative to the mean square of the differenced series, absolute when that is zero.
const RELATIVE_VARIANCE_FLOOR: f64 = 1e-12;
const VARIANCE_FLOOR: f64 = 1e-10;

/// A fitted ARIMA model ready to forecast.
#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Sample mean removed before fitting; only estimated when d = 0
    pub mean: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    /// Whether the optimizer met its tolerance within the iteration budget
    pub converged: bool,
    /// Last observed value of each differencing level 0..d
    levels: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

/// Difference a series `d` times.
pub fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut result = values.to_vec();
    for _ in 0..d {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Stationarity of `x_t = Σ coeffs[i] · x_{t-1-i} + e_t`, via the step-down
/// (reverse Levinson-Durbin) recursion: every partial autocorrelation must
/// lie strictly inside (-1, 1).
pub fn is_stationary(coeffs: &[f64]) -> bool {
    let mut a = coeffs.to_vec();
    while let Some(&last) = a.last() {
        if !last.is_finite() || last.abs() >= 1.0 {
            return false;
        }
        let k = a.len();
        let denom = 1.0 - last * last;
        let reduced: Vec<f64> = (0..k - 1)
            .map(|j| (a[j] + last * a[k - 2 - j]) / denom)
            .collect();
        a = reduced;
    }
    true
}

/// Invertibility of the MA polynomial `1 + Σ θⱼ Bʲ`.
pub fn is_invertible(ma: &[f64]) -> bool {
    let negated: Vec<f64> = ma.iter().map(|theta| -theta).collect();
    is_stationary(&negated)
}

/// Conditional residuals of an ARMA model on `w`, one per observation.
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = vec![0.0; w.len()];
    for t in 0..w.len() {
        let mut prediction = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            if t > i {
                prediction += phi * w[t - i - 1];
            }
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                prediction += theta * residuals[t - j - 1];
            }
        }
        residuals[t] = w[t] - prediction;
    }
    residuals
}

fn sum_of_squares(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Fit an ARIMA model of the given order to `values`.
///
/// Returns a `ComputationError` when the order cannot be estimated at all
/// (no observations left after differencing, non-finite data, or
/// inadmissible optimum). A fit
/// whose optimizer did not converge is still returned with `converged = false`
/// so the caller decides whether to accept it.
pub fn fit_arima(
    values: &[f64],
    order: ArimaOrder,
    cancel: &CancelFlag,
) -> Result<ArimaFit, ForecastError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::Computation(
            "Series contains non-finite values".to_string(),
        ));
    }
    if values.len() <= order.d {
        return Err(ForecastError::Computation(format!(
            "ARIMA{} needs more than {} observations",
            order, order.d
        )));
    }

    let levels: Vec<f64> = (0..order.d)
        .filter_map(|k| difference(values, k).last().copied())
        .collect();

    let mut differenced = difference(values, order.d);
    let mean = if order.d == 0 {
        differenced.iter().sum::<f64>() / differenced.len() as f64
    } else {
        0.0
    };
    for w in differenced.iter_mut() {
        *w -= mean;
    }

    let (p, q) = (order.p, order.q);
    let objective = |params: &[f64]| {
        let (ar, ma) = params.split_at(p);
        if !is_stationary(ar) || !is_invertible(ma) {
            return f64::INFINITY;
        }
        sum_of_squares(&css_residuals(&differenced, ar, ma))
    };

    let start = vec![0.0; p + q];
    let minimum = nelder_mead(objective, &start, NelderMeadOptions::default(), cancel)?;
    if !minimum.value.is_finite() {
        return Err(ForecastError::Computation(format!(
            "ARIMA{} has no admissible parameters for this series",
            order
        )));
    }

    debug!(
        "ARIMA{} simplex stopped after {} iterations (converged: {})",
        order, minimum.iterations, minimum.converged
    );

    let (ar, ma) = minimum.x.split_at(p);
    let residuals = css_residuals(&differenced, ar, ma);
    let n = differenced.len() as f64;
    let spread = sum_of_squares(&differenced) / n;
    let floor = if spread > 0.0 { spread * RELATIVE_VARIANCE_FLOOR } else { VARIANCE_FLOOR };
    let sigma2 = (sum_of_squares(&residuals) / n).max(floor);
    let log_likelihood = -0.5 * n * ((2.0 * PI * sigma2).ln() + 1.0);
    let parameters = p + q + 1 + usize::from(order.d == 0);
    let aic = -2.0 * log_likelihood + 2.0 * parameters as f64;

    if !aic.is_finite() {
        return Err(ForecastError::Computation(format!(
            "ARIMA{} produced a non-finite likelihood",
            order
        )));
    }

    Ok(ArimaFit {
        order,
        ar: ar.to_vec(),
        ma: ma.to_vec(),
        mean,
        sigma2,
        log_likelihood,
        aic,
        converged: minimum.converged,
        levels,
        differenced,
        residuals,
    })
}

impl ArimaFit {
    /// Psi-weights ψ₀..ψ_{n-1} of the integrated model (ψ₀ = 1).
    pub fn psi_weights(&self, n: usize) -> Vec<f64> {
        // AR polynomial 1 - Σφᵢ Bⁱ multiplied by (1 - B)^d
        let mut poly = vec![1.0];
        poly.extend(self.ar.iter().map(|phi| -phi));
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = Vec::with_capacity(n);
        for j in 0..n {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..=j.min(phi_star.len()) {
                value += phi_star[i - 1] * psi[j - i];
            }
            psi.push(value);
        }
        psi
    }

    /// Point forecasts and their standard errors for the next `horizon` steps.
    pub fn forecast(&self, horizon: usize) -> Vec<(f64, f64)> {
        let observed = self.differenced.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();

        for _ in 0..horizon {
            let t = w.len();
            let mut next = 0.0;
            for (i, phi) in self.ar.iter().enumerate() {
                if t > i {
                    next += phi * w[t - i - 1];
                }
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if t > j {
                    next += theta * e[t - j - 1];
                }
            }
            w.push(next);
            e.push(0.0);
        }

        let mut means: Vec<f64> = w[observed..].iter().map(|x| x + self.mean).collect();
        for level in self.levels.iter().rev() {
            let mut running = *level;
            means = means
                .iter()
                .map(|step| {
                    running += step;
                    running
                })
                .collect();
        }

        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        means
            .into_iter()
            .zip(psi)
            .map(|(mean, weight)| {
                cumulative += weight * weight;
                (mean, (self.sigma2 * cumulative).sqrt())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise in [-0.5, 0.5)
    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_difference() {
        assert_eq!(difference(&[1.0, 4.0, 9.0, 16.0], 1), vec![3.0, 5.0, 7.0]);
        assert_eq!(difference(&[1.0, 4.0, 9.0, 16.0], 2), vec![2.0, 2.0]);
        assert_eq!(difference(&[1.0, 2.0], 0), vec![1.0, 2.0]);
    }

    #[test]
    fn test_stationarity_region() {
        assert!(is_stationary(&[]));
        assert!(is_stationary(&[0.5]));
        assert!(!is_stationary(&[1.0]));
        assert!(!is_stationary(&[-1.2]));
        // AR(2) triangle: φ1 + φ2 < 1, φ2 - φ1 < 1, |φ2| < 1
        assert!(is_stationary(&[0.5, 0.3]));
        assert!(!is_stationary(&[0.7, 0.4]));
        assert!(!is_stationary(&[-0.5, 0.6]));
        assert!(!is_stationary(&[0.1, -1.0]));
    }

    #[test]
    fn test_invertibility() {
        assert!(is_invertible(&[0.4]));
        assert!(is_invertible(&[-0.9]));
        assert!(!is_invertible(&[1.0]));
        assert!(!is_invertible(&[-1.5]));
    }

    #[test]
    fn test_random_walk_psi_weights_are_ones() {
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let fit = fit_arima(&values, ArimaOrder::new(0, 1, 0), &CancelFlag::new()).unwrap();
        assert_eq!(fit.psi_weights(4), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_psi_weights_for_ar1_with_differencing() {
        let values: Vec<f64> = (0..12).map(|i| (i as f64).sqrt()).collect();
        let mut fit = fit_arima(&values, ArimaOrder::new(1, 1, 0), &CancelFlag::new()).unwrap();
        fit.ar = vec![0.5];
        // (1 - 0.5B)(1 - B) = 1 - 1.5B + 0.5B²  =>  ψ = 1, 1.5, 1.75, 1.875
        let psi = fit.psi_weights(4);
        let expected = [1.0, 1.5, 1.75, 1.875];
        for (a, b) in psi.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_recovers_ar_coefficient() {
        let shocks = noise(200, 7);
        let mut w = vec![0.0; 200];
        for t in 1..200 {
            w[t] = 0.6 * w[t - 1] + shocks[t];
        }
        // integrate once so the model sees an I(1) series
        let mut level = 100.0;
        let values: Vec<f64> = w
            .iter()
            .map(|step| {
                level += step;
                level
            })
            .collect();

        let fit = fit_arima(&values, ArimaOrder::new(1, 1, 0), &CancelFlag::new()).unwrap();
        assert!(fit.converged);
        assert!((fit.ar[0] - 0.6).abs() < 0.15, "ar = {:?}", fit.ar);
        assert!(fit.aic.is_finite());
    }

    #[test]
    fn test_forecast_continues_linear_trend() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 + 5.0 * i as f64).collect();
        let fit = fit_arima(&values, ArimaOrder::new(1, 1, 0), &CancelFlag::new()).unwrap();
        let forecast = fit.forecast(3);

        assert_eq!(forecast.len(), 3);
        // constant increments: the AR(1) on differences converges near φ = 1 - ε, so
        // the forecast keeps climbing from the last value
        assert!(forecast[0].0 > values[23]);
        for pair in forecast.windows(2) {
            assert!(pair[1].1 >= pair[0].1);
        }
    }

    #[test]
    fn test_constant_series_has_finite_aic() {
        let values = vec![250.0; 8];
        let fit = fit_arima(&values, ArimaOrder::new(1, 1, 1), &CancelFlag::new()).unwrap();
        assert!(fit.aic.is_finite());
        let forecast = fit.forecast(2);
        assert!((forecast[0].0 - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_every_order_is_scored_on_the_same_observations() {
        let values: Vec<f64> = noise(30, 11)
            .iter()
            .enumerate()
            .map(|(i, x)| 500.0 + 4.0 * i as f64 + 40.0 * x)
            .collect();
        let n = (values.len() - 1) as f64;

        for order in [ArimaOrder::new(1, 1, 0), ArimaOrder::new(0, 1, 1), ArimaOrder::new(2, 1, 1)] {
            let fit = fit_arima(&values, order, &CancelFlag::new()).unwrap();
            let expected_ll = -0.5 * n * ((2.0 * PI * fit.sigma2).ln() + 1.0);
            assert!((fit.log_likelihood - expected_ll).abs() < 1e-9, "{}", order);

            let k = (order.p + order.q + 1) as f64;
            assert!((fit.aic - (-2.0 * fit.log_likelihood + 2.0 * k)).abs() < 1e-9, "{}", order);
        }
    }

    #[test]
    fn test_aic_gap_between_orders_ignores_units() {
        let values: Vec<f64> = noise(24, 5)
            .iter()
            .enumerate()
            .map(|(i, x)| 1000.0 + 10.0 * i as f64 + 150.0 * x)
            .collect();
        // power-of-two factor keeps the rescaling exact in floating point
        let scaled: Vec<f64> = values.iter().map(|v| v / 16384.0).collect();

        let gap = |series: &[f64]| {
            let a = fit_arima(series, ArimaOrder::new(1, 1, 0), &CancelFlag::new()).unwrap();
            let b = fit_arima(series, ArimaOrder::new(2, 1, 1), &CancelFlag::new()).unwrap();
            a.aic - b.aic
        };
        assert!((gap(&values) - gap(&scaled)).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_order_without_observations() {
        let err = fit_arima(&[1.0, 2.0, 3.0], ArimaOrder::new(0, 3, 0), &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, ForecastError::Computation(_)));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let err = fit_arima(&[1.0, f64::NAN, 3.0, 4.0], ArimaOrder::new(0, 1, 1), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, ForecastError::Computation(_)));
    }

    #[test]
    fn test_stationary_model_estimates_mean() {
        let values: Vec<f64> = noise(60, 3).iter().map(|x| 10.0 + x).collect();
        let fit = fit_arima(&values, ArimaOrder::new(1, 0, 0), &CancelFlag::new()).unwrap();
        assert!((fit.mean - 10.0).abs() < 0.2);
        let forecast = fit.forecast(12);
        assert!((forecast[11].0 - fit.mean).abs() < 0.5);
    }
}
