// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Collapse Boundary Search

//! Locate the attack scale at which unmitigated collapse probability first
//! reaches the target (50% by default).
//!
//! The scan walks an ascending grid. Monte Carlo noise means the estimated
//! curve is not strictly monotone, so a candidate above the target is only
//! accepted when the next `confirm_points` candidates stay within one 95%
//! band (`1.96 × 0.5 / sqrt(runs)`, the worst-case Bernoulli standard error)
//! of the target. With 300 runs that band is ±0.057; at the default grid
//! step of ~0.017 this is enough to reject single-sample blips.
//!
//! Optional bisection refines between the last rejected and the accepted
//! candidate. When nothing reaches the target, `fallback` is returned.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::monte_carlo::{Execution, MonteCarlo};
use crate::params::{ConfigurationError, ParameterSet};
use crate::stats::{CollapseEstimate, Z_95};
use crate::sweep::linspace;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundarySearch {
    pub start: f64,
    pub end: f64,
    pub points: usize,
    pub target: f64,
    pub confirm_points: usize,
    pub bisection_steps: usize,
    pub fallback: f64,
}

impl Default for BoundarySearch {
    fn default() -> Self {
        Self {
            start: 0.4,
            end: 1.4,
            points: 60,
            target: 0.5,
            confirm_points: 1,
            bisection_steps: 0,
            fallback: 1.0,
        }
    }
}

/// Result of a boundary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEstimate {
    /// Attack scale at the boundary (or the fallback).
    pub attack_scale: f64,
    /// Estimate at `attack_scale`; `None` when the fallback was used.
    pub estimate: Option<CollapseEstimate>,
    /// Number of distinct attack scales evaluated.
    pub evaluated: usize,
    pub fell_back: bool,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

impl BoundarySearch {
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        linspace("boundary", self.start, self.end, self.points)?;
        if !(self.target > 0.0 && self.target <= 1.0) {
            return Err(ConfigurationError::OutsideUnitInterval {
                field: "boundary.target",
                value: self.target,
            });
        }
        if !self.fallback.is_finite() || self.fallback < 0.0 {
            return Err(ConfigurationError::Negative {
                field: "boundary.fallback",
                value: self.fallback,
            });
        }
        Ok(())
    }

    /// Scan (and optionally bisect) using an already-built driver.
    pub fn run(&self, mc: &MonteCarlo<'_>) -> Result<BoundaryEstimate> {
        let grid = linspace("boundary", self.start, self.end, self.points)?;
        self.validate()?;

        let runs = mc.params().monte_carlo_runs;
        let band = Z_95 * 0.5 / (runs as f64).sqrt();
        let mut cache: Vec<Option<CollapseEstimate>> = vec![None; grid.len()];
        let mut evaluated = 0;

        let mut probe = |i: usize, cache: &mut [Option<CollapseEstimate>]| -> Result<CollapseEstimate> {
            if let Some(est) = cache[i] {
                return Ok(est);
            }
            let est = mc.estimate(grid[i], false)?;
            evaluated += 1;
            cache[i] = Some(est);
            Ok(est)
        };

        let mut accepted = None;
        for i in 0..grid.len() {
            let est = probe(i, &mut cache)?;
            if est.probability < self.target {
                continue;
            }
            let last = (i + self.confirm_points).min(grid.len() - 1);
            let mut confirmed = true;
            for j in (i + 1)..=last {
                if probe(j, &mut cache)?.probability < self.target - band {
                    confirmed = false;
                    break;
                }
            }
            if confirmed {
                accepted = Some((i, est));
                break;
            }
            debug!(attack_scale = grid[i], probability = est.probability, "boundary candidate not confirmed");
        }

        let Some((index, est)) = accepted else {
            warn!(
                start = self.start,
                end = self.end,
                fallback = self.fallback,
                "collapse probability never reached target, using fallback"
            );
            return Ok(BoundaryEstimate {
                attack_scale: self.fallback,
                estimate: None,
                evaluated,
                fell_back: true,
            });
        };

        let (mut scale, mut estimate) = (grid[index], est);
        if index > 0 && self.bisection_steps > 0 {
            let (mut lo, mut hi) = (grid[index - 1], grid[index]);
            for _ in 0..self.bisection_steps {
                let mid = 0.5 * (lo + hi);
                let mid_est = mc.estimate(mid, false)?;
                evaluated += 1;
                if mid_est.probability >= self.target {
                    hi = mid;
                    scale = mid;
                    estimate = mid_est;
                } else {
                    lo = mid;
                }
            }
        }

        info!(
            attack_scale = scale,
            probability = estimate.probability,
            evaluated,
            "collapse boundary located"
        );
        Ok(BoundaryEstimate {
            attack_scale: scale,
            estimate: Some(estimate),
            evaluated,
            fell_back: false,
        })
    }
}

/// Boundary estimate with the default search grid (0.4..1.4, 60 points).
pub fn find_boundary(params: &ParameterSet) -> Result<f64> {
    Ok(search_boundary(params, &BoundarySearch::default(), Execution::Sequential)?.attack_scale)
}

pub fn search_boundary(
    params: &ParameterSet,
    search: &BoundarySearch,
    execution: Execution,
) -> Result<BoundaryEstimate> {
    let mc = MonteCarlo::new(params)?.with_execution(execution);
    search.run(&mc)
}
