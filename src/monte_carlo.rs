// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Monte Carlo Driver
//
// N independent runs per (attack scale, mitigation) pair with seeds
// base_seed..base_seed+N-1. Each run owns its RNG and state, so runs may
// execute on worker threads and still reproduce the sequential result.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::params::{ConfigurationError, ParameterSet};
use crate::simulation::{check_attack_scale, run_validated, RunResult, SimulationError};
use crate::stats::{CollapseEstimate, Stats};

/// How the runs of one estimate are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    #[default]
    Sequential,
    Parallel,
}

/// Seed for the `run_index`-th run of an estimate.
pub fn run_seed(params: &ParameterSet, run_index: usize) -> u64 {
    params.base_seed.wrapping_add(run_index as u64)
}

// ─── Aggregates ─────────────────────────────────────────────────────────────

/// Aggregate of one batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub collapse: CollapseEstimate,
    pub severity: Stats,
    pub resilience: Stats,
}

impl RunSummary {
    pub fn from_runs(runs: &[RunResult]) -> Self {
        let outcomes: Vec<bool> = runs.iter().map(|r| r.collapse).collect();
        Self {
            collapse: CollapseEstimate::from_outcomes(&outcomes),
            severity: Stats::from_samples(&runs.iter().map(|r| r.severity).collect::<Vec<_>>()),
            resilience: Stats::from_samples(&runs.iter().map(|r| r.resilience).collect::<Vec<_>>()),
        }
    }
}

/// Mitigated vs unmitigated batches driven by identical seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedEstimate {
    pub attack_scale: f64,
    pub attack_magnitude: f64,
    pub unmitigated: RunSummary,
    pub mitigated: RunSummary,
    /// Seeds that collapse without mitigation but survive with it.
    pub rescued: usize,
    /// Seeds that survive without mitigation but collapse with it.
    pub worsened: usize,
}

// ─── Driver ─────────────────────────────────────────────────────────────────

pub struct MonteCarlo<'a> {
    params: &'a ParameterSet,
    execution: Execution,
}

impl<'a> MonteCarlo<'a> {
    /// Validates the parameter set once; every later call trusts it.
    pub fn new(params: &'a ParameterSet) -> std::result::Result<Self, ConfigurationError> {
        params.validate()?;
        Ok(Self { params, execution: Execution::Sequential })
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn params(&self) -> &ParameterSet {
        self.params
    }

    /// Every run of one batch, in seed order.
    pub fn runs(&self, attack_scale: f64, mitigate: bool) -> Result<Vec<RunResult>> {
        check_attack_scale(attack_scale)?;
        let p = self.params;
        let n = p.monte_carlo_runs;
        let one = |i: usize| run_validated(p, attack_scale, mitigate, Some(run_seed(p, i)));

        let runs = match self.execution {
            Execution::Sequential => (0..n).map(one).collect::<std::result::Result<Vec<_>, _>>()?,
            Execution::Parallel => (0..n)
                .into_par_iter()
                .map(one)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(runs)
    }

    pub fn estimate(&self, attack_scale: f64, mitigate: bool) -> Result<CollapseEstimate> {
        let outcomes: Vec<bool> = self
            .runs(attack_scale, mitigate)?
            .iter()
            .map(|r| r.collapse)
            .collect();
        let estimate = CollapseEstimate::from_outcomes(&outcomes);
        debug!(
            attack_scale,
            mitigate,
            probability = estimate.probability,
            std_error = estimate.std_error,
            "collapse estimate"
        );
        Ok(estimate)
    }

    /// Run both mitigation states on the same seeds.
    pub fn paired(&self, attack_scale: f64) -> Result<PairedEstimate> {
        check_attack_scale(attack_scale)?;
        let p = self.params;
        let n = p.monte_carlo_runs;
        let pair = |i: usize| -> std::result::Result<(RunResult, RunResult), SimulationError> {
            let seed = Some(run_seed(p, i));
            Ok((
                run_validated(p, attack_scale, false, seed)?,
                run_validated(p, attack_scale, true, seed)?,
            ))
        };

        let pairs = match self.execution {
            Execution::Sequential => (0..n).map(pair).collect::<std::result::Result<Vec<_>, _>>()?,
            Execution::Parallel => (0..n)
                .into_par_iter()
                .map(pair)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };

        let rescued = pairs.iter().filter(|(u, m)| u.collapse && !m.collapse).count();
        let worsened = pairs.iter().filter(|(u, m)| !u.collapse && m.collapse).count();
        let (unmitigated, mitigated): (Vec<RunResult>, Vec<RunResult>) = pairs.into_iter().unzip();

        let estimate = PairedEstimate {
            attack_scale,
            attack_magnitude: p.attack_magnitude(attack_scale),
            unmitigated: RunSummary::from_runs(&unmitigated),
            mitigated: RunSummary::from_runs(&mitigated),
            rescued,
            worsened,
        };
        debug!(
            attack_scale,
            no_mitigation = estimate.unmitigated.collapse.probability,
            mitigated = estimate.mitigated.collapse.probability,
            rescued,
            worsened,
            "paired estimate"
        );
        Ok(estimate)
    }
}

// ─── Entry Points ───────────────────────────────────────────────────────────

/// Fraction of `monte_carlo_runs` seeded runs that collapse.
pub fn collapse_probability(params: &ParameterSet, attack_scale: f64, mitigate: bool) -> Result<f64> {
    Ok(estimate_collapse(params, attack_scale, mitigate)?.probability)
}

pub fn estimate_collapse(
    params: &ParameterSet,
    attack_scale: f64,
    mitigate: bool,
) -> Result<CollapseEstimate> {
    MonteCarlo::new(params)?.estimate(attack_scale, mitigate)
}

pub fn paired_estimate(params: &ParameterSet, attack_scale: f64) -> Result<PairedEstimate> {
    MonteCarlo::new(params)?.paired(attack_scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResilienceError;

    fn quick(runs: usize) -> ParameterSet {
        ParameterSet { monte_carlo_runs: runs, ..ParameterSet::default() }
    }

    #[test]
    fn no_attack_never_collapses() {
        let params = ParameterSet { attack_base_magnitude: 0.0, ..quick(40) };
        assert_eq!(collapse_probability(&params, 0.0, false).expect("test: valid"), 0.0);
        assert_eq!(collapse_probability(&params, 1.0, false).expect("test: valid"), 0.0);
    }

    #[test]
    fn probability_is_a_fraction_of_runs() {
        let params = quick(25);
        let est = estimate_collapse(&params, 0.3, false).expect("test: valid");
        assert_eq!(est.runs, 25);
        assert_eq!(est.probability, est.collapses as f64 / 25.0);
        assert!((0.0..=1.0).contains(&est.probability));
    }

    #[test]
    fn parallel_matches_sequential() {
        let params = quick(32);
        let sequential = MonteCarlo::new(&params).expect("test: valid");
        let parallel = MonteCarlo::new(&params)
            .expect("test: valid")
            .with_execution(Execution::Parallel);

        let a = sequential.runs(0.32, false).expect("test: valid");
        let b = parallel.runs(0.32, false).expect("test: valid");
        assert_eq!(a, b);

        let pa = sequential.paired(0.34).expect("test: valid");
        let pb = parallel.paired(0.34).expect("test: valid");
        assert_eq!(pa, pb);
    }

    #[test]
    fn runs_use_consecutive_seeds() {
        let params = ParameterSet { base_seed: 100, ..quick(3) };
        let runs = MonteCarlo::new(&params).expect("test: valid").runs(0.5, false).expect("test: valid");
        let seeds: Vec<Option<u64>> = runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![Some(100), Some(101), Some(102)]);
    }

    #[test]
    fn paired_mitigation_never_worsens_a_seed() {
        // Stable model: lower attack and unchanged damping keep every mitigated
        // voltage at or above its unmitigated twin.
        let params = quick(60);
        for scale in [0.2, 0.3, 0.34, 0.38, 0.5, 1.0] {
            let paired = paired_estimate(&params, scale).expect("test: valid");
            assert_eq!(paired.worsened, 0, "scale {}", scale);
            assert!(
                paired.mitigated.collapse.probability <= paired.unmitigated.collapse.probability,
                "scale {}: mitigated {} > unmitigated {}",
                scale,
                paired.mitigated.collapse.probability,
                paired.unmitigated.collapse.probability
            );
        }
    }

    #[test]
    fn paired_and_single_estimates_agree() {
        let params = quick(30);
        let paired = paired_estimate(&params, 0.33).expect("test: valid");
        let plain = estimate_collapse(&params, 0.33, false).expect("test: valid");
        let mitigated = estimate_collapse(&params, 0.33, true).expect("test: valid");
        assert_eq!(paired.unmitigated.collapse, plain);
        assert_eq!(paired.mitigated.collapse, mitigated);
    }

    #[test]
    fn invalid_parameters_fail_before_running() {
        let params = ParameterSet { dt: -0.01, ..quick(10) };
        let err = collapse_probability(&params, 1.0, false).expect_err("test: invalid dt");
        assert!(matches!(err, ResilienceError::Configuration(_)));
    }
}
