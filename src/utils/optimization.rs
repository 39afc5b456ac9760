//! Derivative-free minimisation used for model parameter estimation.

use std::cmp::Ordering;

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex met the tolerance before `max_iter`.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on both the value spread and the simplex size.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrinkage coefficient.
    pub sigma: f64,
    /// Initial simplex step (relative for non-zero coordinates).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

struct Simplex<'a, F> {
    objective: F,
    bounds: Option<&'a [(f64, f64)]>,
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl<'a, F> Simplex<'a, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn new(objective: F, initial: &[f64], bounds: Option<&'a [(f64, f64)]>, step: f64) -> Self {
        let start = clamp_to_bounds(initial.to_vec(), bounds);
        let mut vertices = vec![start.clone()];
        for i in 0..start.len() {
            let mut v = start.clone();
            v[i] += if start[i].abs() > 1e-10 {
                step * start[i].abs()
            } else {
                step
            };
            vertices.push(clamp_to_bounds(v, bounds));
        }

        let values = vertices.iter().map(|v| sanitize(objective(v))).collect();
        Self {
            objective,
            bounds,
            vertices,
            values,
        }
    }

    fn eval(&self, point: Vec<f64>) -> (Vec<f64>, f64) {
        let point = clamp_to_bounds(point, self.bounds);
        let value = sanitize((self.objective)(&point));
        (point, value)
    }

    /// Reorder vertices from best to worst.
    fn sort(&mut self) {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| {
            self.values[a]
                .partial_cmp(&self.values[b])
                .unwrap_or(Ordering::Equal)
        });
        self.vertices = order.iter().map(|&i| self.vertices[i].clone()).collect();
        self.values = order.iter().map(|&i| self.values[i]).collect();
    }

    /// Centroid of all vertices except the worst.
    fn centroid(&self) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let count = self.vertices.len() - 1;
        let mut c = vec![0.0; dim];
        for v in &self.vertices[..count] {
            for (cj, vj) in c.iter_mut().zip(v.iter()) {
                *cj += vj;
            }
        }
        c.iter_mut().for_each(|cj| *cj /= count as f64);
        c
    }

    fn replace_worst(&mut self, point: Vec<f64>, value: f64) {
        let last = self.vertices.len() - 1;
        self.vertices[last] = point;
        self.values[last] = value;
    }

    fn shrink(&mut self, sigma: f64) {
        let best = self.vertices[0].clone();
        for i in 1..self.vertices.len() {
            let moved = best
                .iter()
                .zip(self.vertices[i].iter())
                .map(|(b, x)| b + sigma * (x - b))
                .collect();
            let (point, value) = self.eval(moved);
            self.vertices[i] = point;
            self.values[i] = value;
        }
    }

    fn diameter(&self) -> f64 {
        let best = &self.vertices[0];
        self.vertices
            .iter()
            .map(|v| {
                v.iter()
                    .zip(best.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0, f64::max)
    }
}

/// Minimise `objective` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `+inf`, so an objective may
/// signal an infeasible region by returning `NaN` or `f64::MAX`.
///
/// # Example
/// ```
/// use elecsales::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut simplex = Simplex::new(objective, initial, bounds, config.initial_step);
    let worst = simplex.vertices.len() - 1;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort();

        let spread = simplex.values[worst] - simplex.values[0];
        if (spread.is_finite() && spread < config.tolerance)
            || simplex.diameter() < config.tolerance
        {
            converged = true;
            break;
        }

        let centroid = simplex.centroid();
        let towards = |from: &[f64], coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(from.iter())
                .map(|(c, x)| c + coef * (x - c))
                .collect()
        };

        let (reflected, f_r) = simplex.eval(towards(&simplex.vertices[worst], -config.alpha));

        if f_r < simplex.values[0] {
            let (expanded, f_e) = simplex.eval(towards(&reflected, config.gamma));
            if f_e < f_r {
                simplex.replace_worst(expanded, f_e);
            } else {
                simplex.replace_worst(reflected, f_r);
            }
            continue;
        }

        if f_r < simplex.values[worst - 1] {
            simplex.replace_worst(reflected, f_r);
            continue;
        }

        let (contracted, f_c) = if f_r < simplex.values[worst] {
            simplex.eval(towards(&reflected, config.rho))
        } else {
            simplex.eval(towards(&simplex.vertices[worst], config.rho))
        };

        if f_c < f_r.min(simplex.values[worst]) {
            simplex.replace_worst(contracted, f_c);
        } else {
            simplex.shrink(config.sigma);
        }
    }

    simplex.sort();
    NelderMeadResult {
        optimal_point: simplex.vertices[0].clone(),
        optimal_value: simplex.values[0],
        iterations,
        converged,
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::INFINITY
    }
}

fn clamp_to_bounds(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(b) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(b.iter()) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}
