//! Additive piecewise-linear trend model.
//!
//! Time is scaled to [0, 1] over the history. The trend is
//! `y(t) = k + m·t + Σ δⱼ·(t - sⱼ)₊` with changepoints `sⱼ` spread evenly over
//! the first 80% of the history. Deltas carry a ridge penalty so the trend
//! only bends where the data insists. Values are scaled by max |y| before
//! fitting.
//!
//! Forecast spread combines the in-sample residual RMS with trend uncertainty
//! that grows with the distance past the last observation:
//! sd(t) = sqrt(σ² + (δ̄·(t - 1))²)

use crate::errors::ForecastError;
use crate::services::cancellation::CancelFlag;

/// A trend-fitting backend the alternate strategy can delegate to.
pub trait TrendModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit `values` (one per month, oldest first) and return
    /// `(mean, standard deviation)` for each of the next `horizon` months.
    fn fit_predict(
        &self,
        values: &[f64],
        horizon: usize,
        cancel: &CancelFlag,
    ) -> Result<Vec<(f64, f64)>, ForecastError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PiecewiseTrendModel {
    /// Share of the history in which changepoints may sit
    pub changepoint_range: f64,
    pub max_changepoints: usize,
    /// Smaller values pull changepoint deltas harder toward zero
    pub changepoint_prior_scale: f64,
}

impl Default for PiecewiseTrendModel {
    fn default() -> Self {
        Self {
            changepoint_range: 0.8,
            max_changepoints: 25,
            changepoint_prior_scale: 0.05,
        }
    }
}

/// Fitted coefficients in scaled units
#[derive(Debug, Clone)]
struct TrendFit {
    intercept: f64,
    slope: f64,
    changepoints: Vec<f64>,
    deltas: Vec<f64>,
    residual_rms: f64,
}

impl TrendFit {
    fn trend_at(&self, t: f64) -> f64 {
        let bends: f64 = self
            .changepoints
            .iter()
            .zip(&self.deltas)
            .map(|(s, delta)| delta * (t - s).max(0.0))
            .sum();
        self.intercept + self.slope * t + bends
    }

    fn mean_abs_delta(&self) -> f64 {
        if self.deltas.is_empty() {
            0.0
        } else {
            self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len() as f64
        }
    }
}

impl PiecewiseTrendModel {
    /// Changepoint locations (scaled time) for a history of `n` points.
    fn changepoints(&self, n: usize) -> Vec<f64> {
        let span = ((n as f64) * self.changepoint_range).floor() as usize;
        let count = self.max_changepoints.min(span.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }
        let last_index = (span - 1) as f64;
        (1..=count)
            .map(|k| {
                let index = (k as f64 * last_index / count as f64).round();
                index / (n - 1) as f64
            })
            .collect()
    }

    fn fit(&self, scaled: &[f64]) -> Result<TrendFit, ForecastError> {
        let n = scaled.len();
        let times: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        let changepoints = self.changepoints(n);
        let columns = 2 + changepoints.len();
        let penalty = 1.0 / (2.0 * self.changepoint_prior_scale * self.changepoint_prior_scale);

        let row = |t: f64| -> Vec<f64> {
            let mut features = vec![1.0, t];
            features.extend(changepoints.iter().map(|s| (t - s).max(0.0)));
            features
        };

        // normal equations (XᵀX + λD) β = Xᵀy, D penalising deltas only
        let mut gram = vec![vec![0.0; columns]; columns];
        let mut rhs = vec![0.0; columns];
        for (&t, &y) in times.iter().zip(scaled) {
            let x = row(t);
            for i in 0..columns {
                rhs[i] += x[i] * y;
                for j in 0..columns {
                    gram[i][j] += x[i] * x[j];
                }
            }
        }
        for (i, gram_row) in gram.iter_mut().enumerate().skip(2) {
            gram_row[i] += penalty;
        }

        let beta = solve_linear_system(gram, rhs).ok_or_else(|| {
            ForecastError::Computation("Trend model normal equations are singular".to_string())
        })?;

        let mut fit = TrendFit {
            intercept: beta[0],
            slope: beta[1],
            deltas: beta[2..].to_vec(),
            changepoints,
            residual_rms: 0.0,
        };
        let sse: f64 = times
            .iter()
            .zip(scaled)
            .map(|(&t, &y)| (y - fit.trend_at(t)).powi(2))
            .sum();
        fit.residual_rms = (sse / n as f64).sqrt();
        Ok(fit)
    }
}

impl TrendModel for PiecewiseTrendModel {
    fn name(&self) -> &'static str {
        "piecewise-trend"
    }

    fn fit_predict(
        &self,
        values: &[f64],
        horizon: usize,
        cancel: &CancelFlag,
    ) -> Result<Vec<(f64, f64)>, ForecastError> {
        if values.len() < 2 {
            return Err(ForecastError::Validation(format!(
                "Trend model needs at least 2 monthly points, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Computation(
                "Series contains non-finite values".to_string(),
            ));
        }
        cancel.check()?;

        let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();

        let fit = self.fit(&scaled)?;
        cancel.check()?;

        let last = (values.len() - 1) as f64;
        let drift = fit.mean_abs_delta();
        Ok((1..=horizon)
            .map(|step| {
                let t = (last + step as f64) / last;
                let mean = fit.trend_at(t);
                let spread = (fit.residual_rms.powi(2) + (drift * (t - 1.0)).powi(2)).sqrt();
                (mean * scale, spread * scale)
            })
            .collect())
    }
}

/// Gaussian elimination with partial pivoting. `None` when the system is singular.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_points_extrapolate_line() {
        let model = PiecewiseTrendModel::default();
        let out = model.fit_predict(&[100.0, 120.0], 3, &CancelFlag::new()).unwrap();
        let means: Vec<f64> = out.iter().map(|(m, _)| *m).collect();
        for (got, want) in means.iter().zip([140.0, 160.0, 180.0]) {
            assert!((got - want).abs() < 1e-9, "{:?}", means);
        }
        // perfect fit and no changepoints: no spread
        assert!(out.iter().all(|(_, sd)| sd.abs() < 1e-9));
    }

    #[test]
    fn test_linear_history_continues_without_bending() {
        let values: Vec<f64> = (0..18).map(|i| 50.0 + 3.0 * i as f64).collect();
        let model = PiecewiseTrendModel::default();
        let out = model.fit_predict(&values, 2, &CancelFlag::new()).unwrap();
        assert!((out[0].0 - 104.0).abs() < 1e-6);
        assert!((out[1].0 - 107.0).abs() < 1e-6);
    }

    #[test]
    fn test_spread_grows_with_horizon() {
        let values = vec![10.0, 30.0, 15.0, 40.0, 22.0, 55.0, 30.0, 70.0, 20.0, 35.0];
        let model = PiecewiseTrendModel::default();
        let out = model.fit_predict(&values, 6, &CancelFlag::new()).unwrap();
        assert_eq!(out.len(), 6);
        for pair in out.windows(2) {
            assert!(pair[1].1 >= pair[0].1);
        }
        assert!(out[0].1 > 0.0);
    }

    #[test]
    fn test_changepoints_stay_in_leading_history() {
        let model = PiecewiseTrendModel::default();
        let points = model.changepoints(20);
        assert!(!points.is_empty());
        assert!(points.iter().all(|s| *s > 0.0 && *s <= 0.8));
        assert!(model.changepoints(2).is_empty());
    }

    #[test]
    fn test_all_zero_series() {
        let model = PiecewiseTrendModel::default();
        let out = model.fit_predict(&[0.0, 0.0, 0.0], 2, &CancelFlag::new()).unwrap();
        assert!(out.iter().all(|(m, sd)| m.abs() < 1e-12 && *sd < 1e-12));
    }

    #[test]
    fn test_rejects_single_point() {
        let model = PiecewiseTrendModel::default();
        let err = model.fit_predict(&[5.0], 1, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn test_solver() {
        let x = solve_linear_system(vec![vec![2.0, 1.0], vec![1.0, 3.0]], vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        assert!(solve_linear_system(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_none());
    }
}
