use crate::errors::ForecastError;
use crate::services::cancellation::CancelFlag;

/// Tuning knobs for [`nelder_mead`]
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    pub max_iterations: usize,
    /// Relative spread of simplex values below which the search stops
    pub f_tolerance: f64,
    /// Coordinate spread of the simplex below which the search stops
    pub x_tolerance: f64,
    pub initial_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            f_tolerance: 1e-8,
            x_tolerance: 1e-7,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    /// False when the iteration budget ran out before either tolerance was met
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Derivative-free minimisation with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as +inf, which lets callers encode
/// hard constraints (stationarity, invertibility) by returning `f64::INFINITY`.
/// The search is fully deterministic for a given start point.
pub fn nelder_mead<F>(
    mut objective: F,
    start: &[f64],
    options: NelderMeadOptions,
    cancel: &CancelFlag,
) -> Result<Minimum, ForecastError>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    let dim = start.len();
    if dim == 0 {
        let value = eval(start);
        return Ok(Minimum { x: Vec::new(), value, iterations: 0, converged: value.is_finite() });
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(start.to_vec());
    for i in 0..dim {
        let mut vertex = start.to_vec();
        vertex[i] += options.initial_step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|x| eval(x)).collect();

    for iteration in 0..options.max_iterations {
        cancel.check()?;

        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[dim];
        if best.is_finite() && has_converged(&simplex, best, worst, &options) {
            return Ok(Minimum { x: simplex[0].clone(), value: best, iterations: iteration, converged: true });
        }

        // centroid of every vertex but the worst
        let mut centroid = vec![0.0; dim];
        for vertex in &simplex[..dim] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / dim as f64;
            }
        }

        let reflected = along(&centroid, &simplex[dim], -REFLECTION);
        let f_reflected = eval(&reflected);

        if f_reflected < best {
            let expanded = along(&centroid, &reflected, EXPANSION);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
            continue;
        }

        let (contracted, f_limit) = if f_reflected < worst {
            (along(&centroid, &reflected, CONTRACTION), f_reflected)
        } else {
            (along(&centroid, &simplex[dim], CONTRACTION), worst)
        };
        let f_contracted = eval(&contracted);
        if f_contracted < f_limit {
            simplex[dim] = contracted;
            values[dim] = f_contracted;
            continue;
        }

        let anchor = simplex[0].clone();
        for i in 1..=dim {
            simplex[i] = along(&anchor, &simplex[i], SHRINK);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = (0..=dim)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    Ok(Minimum {
        x: simplex[best].clone(),
        value: values[best],
        iterations: options.max_iterations,
        converged: false,
    })
}

/// Point `origin + t * (target - origin)`.
fn along(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, x)| o + t * (x - o))
        .collect()
}

fn has_converged(simplex: &[Vec<f64>], best: f64, worst: f64, options: &NelderMeadOptions) -> bool {
    // relative only, so rescaling the objective by a constant leaves the path unchanged
    if worst.is_finite() && worst - best <= options.f_tolerance * (best.abs() + worst.abs()) {
        return true;
    }
    let x_spread = simplex[1..]
        .iter()
        .flat_map(|vertex| vertex.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
        .fold(0.0_f64, f64::max);
    x_spread <= options.x_tolerance
}
