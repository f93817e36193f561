//! ARIMA estimation by conditional sum of squares.
//!
//! The model on the `d`-times differenced series `w` is
//!
//! ```text
//! (w[t] - mu) = sum(phi[i] * (w[t-i] - mu)) + e[t] + sum(theta[j] * e[t-j])
//! ```
//!
//! with `mu` the sample mean when `d = 0` and zero otherwise. Residuals are
//! computed recursively, conditioning on the first `p` differenced values and
//! taking pre-sample residuals as zero. The coefficients minimise the sum of
//! squared residuals; each one is optimised as `tanh(u)` so it stays inside
//! (-1, 1), with a Nelder-Mead simplex over `u`.
//!
//! Every call to [`fit`] owns its buffers, so concurrent fits share nothing.

use serde::{Deserialize, Serialize};

use crate::model::AnalyticsError;

/// Largest AR or MA order accepted.
pub const MAX_ARMA_ORDER: usize = 3;

/// Largest differencing order accepted.
pub const MAX_DIFFERENCING: usize = 2;

/// Edge length of the initial simplex, in the unconstrained parameter space.
const INITIAL_STEP: f64 = 0.5;

/// Simplex diameter below which the optimizer stops regardless of `f`.
const MIN_SIMPLEX_SIZE: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Model order
// ---------------------------------------------------------------------------

/// `(p, d, q)`: AR lags, differencing order, MA lags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    /// ARIMA(1, 1, 1), the order every forecast uses unless configured
    /// otherwise. It is a fixed policy, not selected from the data; order
    /// selection would plug in here.
    pub const FIXED: ArimaOrder = ArimaOrder { p: 1, d: 1, q: 1 };

    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of estimated AR and MA coefficients.
    pub fn n_params(&self) -> usize {
        self.p + self.q
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.p > MAX_ARMA_ORDER {
            return Err(AnalyticsError::InvalidParameter {
                name: "p".to_string(),
                reason: format!("AR order must be <= {}", MAX_ARMA_ORDER),
            });
        }
        if self.d > MAX_DIFFERENCING {
            return Err(AnalyticsError::InvalidParameter {
                name: "d".to_string(),
                reason: format!("differencing order must be <= {}", MAX_DIFFERENCING),
            });
        }
        if self.q > MAX_ARMA_ORDER {
            return Err(AnalyticsError::InvalidParameter {
                name: "q".to_string(),
                reason: format!("MA order must be <= {}", MAX_ARMA_ORDER),
            });
        }
        Ok(())
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::FIXED
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Optimizer limits for a single fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Relative spread of the objective across the simplex at convergence.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}

// ---------------------------------------------------------------------------
// Fitted model
// ---------------------------------------------------------------------------

/// An ARIMA model estimated on one series.
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    /// Residual variance, CSS / number of residuals.
    sigma2: f64,
    iterations: usize,
    /// Differenced series minus `mean`.
    centered: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value of each differencing level 0..d, for integrating forecasts.
    tails: Vec<f64>,
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Optimizer iterations used by the fit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Point forecasts for the next `steps` periods on the original scale.
    ///
    /// Future shocks are taken as zero, so MA terms only affect the first
    /// `q` steps.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, AnalyticsError> {
        let mut z = self.centered.clone();
        let mut e = self.residuals.clone();
        let mut differenced = Vec::with_capacity(steps);

        for _ in 0..steps {
            let mut next = 0.0;
            for (i, phi) in self.ar.iter().enumerate() {
                if let Some(&past) = z.len().checked_sub(i + 1).and_then(|idx| z.get(idx)) {
                    next += phi * past;
                }
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if let Some(&shock) = e.len().checked_sub(j + 1).and_then(|idx| e.get(idx)) {
                    next += theta * shock;
                }
            }
            z.push(next);
            e.push(0.0);
            differenced.push(next + self.mean);
        }

        let mut values = differenced;
        for &tail in self.tails.iter().rev() {
            let mut level = tail;
            for v in values.iter_mut() {
                level += *v;
                *v = level;
            }
        }

        if let Some(bad) = values.iter().position(|v| !v.is_finite()) {
            return Err(AnalyticsError::Forecast(format!(
                "projection at step {} is not finite",
                bad + 1
            )));
        }
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Fits an ARIMA model of the given order to `series`.
///
/// Fails with `ModelFit` if the series holds non-finite values, is too
/// short for the order, is constant after differencing, or if the optimizer
/// does not converge.
pub fn fit(
    series: &[f64],
    order: ArimaOrder,
    options: &FitOptions,
) -> Result<FittedArima, AnalyticsError> {
    order.validate()?;

    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::ModelFit(
            "series contains NaN or infinite values".to_string(),
        ));
    }
    if series.len() <= order.d + order.p {
        return Err(AnalyticsError::ModelFit(format!(
            "{} points are too few for {}",
            series.len(),
            order
        )));
    }

    let mut tails = Vec::with_capacity(order.d);
    let mut differenced = series.to_vec();
    for _ in 0..order.d {
        tails.push(differenced[differenced.len() - 1]);
        differenced = difference(&differenced);
    }

    let mean = if order.d == 0 {
        differenced.iter().sum::<f64>() / differenced.len() as f64
    } else {
        0.0
    };
    let centered: Vec<f64> = differenced.iter().map(|w| w - mean).collect();

    let scale = series.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    if centered.iter().all(|z| z.abs() <= 1e-12 * scale) {
        return Err(AnalyticsError::ModelFit(
            "series is constant after differencing; nothing to estimate".to_string(),
        ));
    }

    let (p, q) = (order.p, order.q);
    let objective = |u: &[f64]| -> f64 {
        let (ar, ma) = split_params(u, p);
        let css = conditional_sum_of_squares(&centered, &ar, &ma).0;
        if css.is_finite() { css } else { f64::INFINITY }
    };

    let (params, iterations) = if order.n_params() == 0 {
        (Vec::new(), 0)
    } else {
        let start = initial_params(&centered, p, q);
        let outcome = nelder_mead(objective, &start, options);
        if !outcome.value.is_finite() {
            return Err(AnalyticsError::ModelFit(
                "sum of squares is not finite at any tried parameters".to_string(),
            ));
        }
        if !outcome.converged {
            return Err(AnalyticsError::ModelFit(format!(
                "optimizer did not converge after {} iterations",
                outcome.iterations
            )));
        }
        (outcome.point, outcome.iterations)
    };

    let (ar, ma) = split_params(&params, p);
    let (css, residuals) = conditional_sum_of_squares(&centered, &ar, &ma);
    let n_resid = centered.len() - p;
    let sigma2 = css / n_resid as f64;
    if !sigma2.is_finite() {
        return Err(AnalyticsError::ModelFit(
            "residual variance is not finite".to_string(),
        ));
    }

    Ok(FittedArima {
        order,
        ar,
        ma,
        mean,
        sigma2,
        iterations,
        centered,
        residuals,
        tails,
    })
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Maps unconstrained optimizer coordinates to AR and MA coefficients.
fn split_params(u: &[f64], p: usize) -> (Vec<f64>, Vec<f64>) {
    let coeffs: Vec<f64> = u.iter().map(|x| x.tanh()).collect();
    let (ar, ma) = coeffs.split_at(p.min(coeffs.len()));
    (ar.to_vec(), ma.to_vec())
}

/// Residuals of the ARMA recursion and their sum of squares. The first `p`
/// residuals are zero and excluded from the sum.
fn conditional_sum_of_squares(z: &[f64], ar: &[f64], ma: &[f64]) -> (f64, Vec<f64>) {
    let p = ar.len();
    let mut e = vec![0.0; z.len()];
    let mut css = 0.0;

    for t in p..z.len() {
        let mut predicted = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            predicted += phi * z[t - i - 1];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                predicted += theta * e[t - j - 1];
            }
        }
        e[t] = z[t] - predicted;
        css += e[t] * e[t];
    }

    (css, e)
}

/// Starting point: the lag-1 autocorrelation for the first AR term, zero for
/// everything else.
fn initial_params(z: &[f64], p: usize, q: usize) -> Vec<f64> {
    let mut start = vec![0.0; p + q];
    if p > 0 {
        let denom: f64 = z.iter().map(|x| x * x).sum();
        if denom > 0.0 {
            let lag1: f64 = z.windows(2).map(|w| w[0] * w[1]).sum();
            start[0] = (lag1 / denom).clamp(-0.9, 0.9).atanh();
        }
    }
    start
}

// ---------------------------------------------------------------------------
// Nelder-Mead
// ---------------------------------------------------------------------------

struct SimplexOutcome {
    point: Vec<f64>,
    value: f64,
    iterations: usize,
    converged: bool,
}

/// Minimises `f` from `start` with the standard reflection (1), expansion
/// (2), contraction (0.5) and shrink (0.5) coefficients.
fn nelder_mead<F>(f: F, start: &[f64], options: &FitOptions) -> SimplexOutcome
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((start.to_vec(), f(start)));
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += INITIAL_STEP;
        let value = f(&vertex);
        simplex.push((vertex, value));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[n].1;

        let f_spread = worst - best;
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|(x, _)| x.iter().zip(&simplex[0].0).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        if f_spread <= options.tolerance * (1.0 + best.abs()) || x_spread <= MIN_SIMPLEX_SIZE {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
            .collect();
        let worst_point = simplex[n].0.clone();
        let along = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_point)
                .map(|(c, w)| c + t * (c - w))
                .collect()
        };

        let reflected = along(1.0);
        let f_reflected = f(&reflected);

        if f_reflected < best {
            let expanded = along(2.0);
            let f_expanded = f(&expanded);
            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }
        if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
            continue;
        }

        let (contracted, threshold) = if f_reflected < worst {
            (along(0.5), f_reflected)
        } else {
            (along(-0.5), worst)
        };
        let f_contracted = f(&contracted);
        if f_contracted < threshold {
            simplex[n] = (contracted, f_contracted);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for (vertex, value) in simplex.iter_mut().skip(1) {
            for (x, a) in vertex.iter_mut().zip(&anchor) {
                *x = a + 0.5 * (*x - a);
            }
            *value = f(vertex);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (point, value) = simplex.swap_remove(0);
    SimplexOutcome {
        point,
        value,
        iterations,
        converged,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
