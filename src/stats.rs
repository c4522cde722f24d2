// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Sample Statistics
//
// Mean ± 95% CI aggregation over Monte Carlo samples.

use serde::{Deserialize, Serialize};

/// z-score for a two-sided 95% confidence interval.
pub const Z_95: f64 = 1.96;

// ─── Stats ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub std_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                std_error: 0.0,
                ci_lower: 0.0,
                ci_upper: 0.0,
                min: 0.0,
                max: 0.0,
                n: 0,
            };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let std_error = std_dev / (n as f64).sqrt();
        Self {
            mean,
            std_dev,
            std_error,
            ci_lower: mean - Z_95 * std_error,
            ci_upper: mean + Z_95 * std_error,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }
}

// ─── Collapse Estimate ──────────────────────────────────────────────────────

/// Collapse probability with its sampling uncertainty.
///
/// The standard error of a Bernoulli mean is `sqrt(p(1-p)/n)`, at most
/// `0.5/sqrt(n)`: 300 runs keep it under 0.029, 1000 runs under 0.016.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollapseEstimate {
    pub probability: f64,
    pub std_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub runs: usize,
    pub collapses: usize,
}

impl CollapseEstimate {
    pub fn from_outcomes(outcomes: &[bool]) -> Self {
        let runs = outcomes.len();
        let collapses = outcomes.iter().filter(|&&c| c).count();
        if runs == 0 {
            return Self {
                probability: 0.0,
                std_error: 0.0,
                ci_lower: 0.0,
                ci_upper: 0.0,
                runs,
                collapses,
            };
        }
        let probability = collapses as f64 / runs as f64;
        let std_error = (probability * (1.0 - probability) / runs as f64).sqrt();
        Self {
            probability,
            std_error,
            ci_lower: (probability - Z_95 * std_error).max(0.0),
            ci_upper: (probability + Z_95 * std_error).min(1.0),
            runs,
            collapses,
        }
    }

    /// Runs needed to keep the worst-case standard error at or below `target`.
    pub fn runs_for_std_error(target: f64) -> usize {
        (0.5 / target).powi(2).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_from_samples() {
        let stats = Stats::from_samples(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.n, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.std_dev - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert!(stats.ci_lower < stats.mean && stats.mean < stats.ci_upper);
    }

    #[test]
    fn stats_of_nothing_is_zero() {
        let stats = Stats::from_samples(&[]);
        assert_eq!(stats.n, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn collapse_estimate_counts_outcomes() {
        let est = CollapseEstimate::from_outcomes(&[true, false, true, true]);
        assert_eq!(est.runs, 4);
        assert_eq!(est.collapses, 3);
        assert_eq!(est.probability, 0.75);
        assert!((est.std_error - (0.75_f64 * 0.25 / 4.0).sqrt()).abs() < 1e-15);
        assert!(est.ci_upper <= 1.0 && est.ci_lower >= 0.0);
    }

    #[test]
    fn certain_outcomes_have_no_spread() {
        let est = CollapseEstimate::from_outcomes(&[false; 10]);
        assert_eq!(est.probability, 0.0);
        assert_eq!(est.std_error, 0.0);
        assert_eq!(est.ci_upper, 0.0);
    }

    #[test]
    fn run_count_for_target_error() {
        assert_eq!(CollapseEstimate::runs_for_std_error(0.05), 100);
        assert_eq!(CollapseEstimate::runs_for_std_error(0.025), 400);
    }
}
