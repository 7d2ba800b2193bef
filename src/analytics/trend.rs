//! Shared trend estimation - least-squares fits and small series helpers
//!
//! Every analyzer that fits a line goes through the `TrendEstimator` trait so
//! the fitting strategy can be swapped without callers observing behavioral
//! divergence; the two provided strategies are numerically equivalent.

use serde::{Deserialize, Serialize};

/// A fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Strategy seam for linear trend fitting.
pub trait TrendEstimator {
    /// Fit a line to the series. Degenerate inputs (empty series, zero
    /// x-variance) produce a flat line through the mean.
    fn fit(&self, xs: &[f64], ys: &[f64]) -> LinearFit;
}

/// Ordinary least squares in mean-centered covariance/variance form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosedFormOls;

impl TrendEstimator for ClosedFormOls {
    fn fit(&self, xs: &[f64], ys: &[f64]) -> LinearFit {
        let n = xs.len().min(ys.len());
        if n == 0 {
            return LinearFit {
                slope: 0.0,
                intercept: 0.0,
            };
        }

        let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
        let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

        let mut num = 0.0;
        let mut den = 0.0;
        for (x, y) in xs[..n].iter().zip(ys[..n].iter()) {
            num += (x - mean_x) * (y - mean_y);
            den += (x - mean_x) * (x - mean_x);
        }

        if den == 0.0 {
            return LinearFit {
                slope: 0.0,
                intercept: mean_y,
            };
        }

        let slope = num / den;
        LinearFit {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }
}

/// Ordinary least squares via the 2x2 normal equations, solved with
/// Cramer's rule. Equivalent to `ClosedFormOls` within rounding; kept as the
/// solver-style alternative.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalEquationsOls;

impl TrendEstimator for NormalEquationsOls {
    fn fit(&self, xs: &[f64], ys: &[f64]) -> LinearFit {
        let n = xs.len().min(ys.len());
        if n == 0 {
            return LinearFit {
                slope: 0.0,
                intercept: 0.0,
            };
        }

        let nf = n as f64;
        let sum_x: f64 = xs[..n].iter().sum();
        let sum_y: f64 = ys[..n].iter().sum();
        let sum_xx: f64 = xs[..n].iter().map(|x| x * x).sum();
        let sum_xy: f64 = xs[..n].iter().zip(ys[..n].iter()).map(|(x, y)| x * y).sum();

        let det = nf * sum_xx - sum_x * sum_x;
        if det == 0.0 {
            return LinearFit {
                slope: 0.0,
                intercept: sum_y / nf,
            };
        }

        LinearFit {
            slope: (nf * sum_xy - sum_x * sum_y) / det,
            intercept: (sum_xx * sum_y - sum_x * sum_xy) / det,
        }
    }
}

/// Trailing moving average using however many points exist at the series
/// edges. Series shorter than the window come back unchanged.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.len() < window {
        return values.to_vec();
    }
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = i.saturating_sub(window - 1);
        let slice = &values[start..=i];
        out.push(slice.iter().sum::<f64>() / slice.len() as f64);
    }
    out
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for short series.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Residual standard deviation of a fit (population form), used as a
/// lightweight forecast uncertainty proxy.
pub fn residual_sigma(xs: &[f64], ys: &[f64], fit: &LinearFit) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let var = xs[..n]
        .iter()
        .zip(ys[..n].iter())
        .map(|(x, y)| {
            let r = y - fit.predict(*x);
            r * r
        })
        .sum::<f64>()
        / n as f64;
    var.sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Direction, acceleration and volatility summary of a small series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendMetrics {
    pub direction: TrendDirection,
    pub slope: f64,
    pub acceleration: f64,
    pub volatility_score: f64,
}

/// Summarize a short series: OLS slope with ±0.5 direction thresholds,
/// acceleration as last-difference minus first-difference, volatility as the
/// coefficient of variation scaled to 0-100.
pub fn trend_metrics(values: &[f64], estimator: &dyn TrendEstimator) -> TrendMetrics {
    if values.len() < 2 {
        return TrendMetrics {
            direction: TrendDirection::Flat,
            slope: 0.0,
            acceleration: 0.0,
            volatility_score: 0.0,
        };
    }

    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let fit = estimator.fit(&xs, values);

    let first_diff = values[1] - values[0];
    let last_diff = values[values.len() - 1] - values[values.len() - 2];
    let acceleration = last_diff - first_diff;

    let mean_val = {
        let m = mean(values);
        if m == 0.0 {
            1.0
        } else {
            m
        }
    };
    let volatility_score = sample_std(values) / mean_val.abs() * 100.0;

    let direction = if fit.slope > 0.5 {
        TrendDirection::Up
    } else if fit.slope < -0.5 {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    TrendMetrics {
        direction,
        slope: fit.slope,
        acceleration,
        volatility_score,
    }
}
