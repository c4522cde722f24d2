// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Resilience Sweep & Metric
//
// Runs the paired Monte Carlo driver across an ascending attack grid and
// compares the areas under the two collapse-probability curves.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boundary::{BoundaryEstimate, BoundarySearch};
use crate::error::Result;
use crate::monte_carlo::{Execution, MonteCarlo, PairedEstimate};
use crate::params::{ConfigurationError, ParameterSet};

// ─── Grid ───────────────────────────────────────────────────────────────────

/// `points` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(
    name: &'static str,
    start: f64,
    end: f64,
    points: usize,
) -> std::result::Result<Vec<f64>, ConfigurationError> {
    if points < 2 || !start.is_finite() || !end.is_finite() || !(start < end) {
        return Err(ConfigurationError::DegenerateGrid { name, start, end, points });
    }
    let step = (end - start) / (points - 1) as f64;
    Ok((0..points)
        .map(|i| if i + 1 == points { end } else { start + step * i as f64 })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepGrid {
    /// `points` values from `lower_factor × boundary` to `upper_factor × boundary`.
    /// Requires a boundary search first.
    AroundBoundary { lower_factor: f64, upper_factor: f64, points: usize },
    /// Absolute attack-scale range.
    Fixed { start: f64, end: f64, points: usize },
}

impl Default for SweepGrid {
    fn default() -> Self {
        SweepGrid::AroundBoundary { lower_factor: 0.8, upper_factor: 1.2, points: 20 }
    }
}

impl SweepGrid {
    pub fn needs_boundary(&self) -> bool {
        matches!(self, SweepGrid::AroundBoundary { .. })
    }

    pub fn values(&self, boundary: Option<f64>) -> std::result::Result<Vec<f64>, ConfigurationError> {
        match *self {
            SweepGrid::AroundBoundary { lower_factor, upper_factor, points } => {
                let b = boundary.unwrap_or(f64::NAN);
                linspace("sweep", b * lower_factor, b * upper_factor, points)
            }
            SweepGrid::Fixed { start, end, points } => linspace("sweep", start, end, points),
        }
    }

    /// Shape check that needs no boundary: factors and points for
    /// `AroundBoundary` (against a unit boundary), the range for `Fixed`.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        let grid = self.values(Some(1.0))?;
        if grid[0] < 0.0 {
            return Err(ConfigurationError::Negative { field: "sweep.start", value: grid[0] });
        }
        Ok(())
    }
}

// ─── Configuration ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub grid: SweepGrid,
    pub boundary: BoundarySearch,
    pub execution: Execution,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grid: SweepGrid::default(),
            boundary: BoundarySearch::default(),
            execution: Execution::Parallel,
        }
    }
}

impl SweepConfig {
    /// Absolute grid bracketing the transition of [`ParameterSet::differentiation`].
    pub fn differentiation() -> Self {
        Self {
            grid: SweepGrid::Fixed { start: 0.8, end: 1.8, points: 11 },
            ..Self::default()
        }
    }
}

// ─── Results ────────────────────────────────────────────────────────────────

/// One point of the two collapse-probability curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Grid value, passed to the simulator as its attack scale.
    pub attack_magnitude: f64,
    pub collapse_probability_no_mitigation: f64,
    pub collapse_probability_mitigated: f64,
    pub std_error_no_mitigation: f64,
    pub std_error_mitigated: f64,
    pub rescued: usize,
    pub worsened: usize,
}

impl From<&PairedEstimate> for SweepPoint {
    fn from(p: &PairedEstimate) -> Self {
        Self {
            attack_magnitude: p.attack_scale,
            collapse_probability_no_mitigation: p.unmitigated.collapse.probability,
            collapse_probability_mitigated: p.mitigated.collapse.probability,
            std_error_no_mitigation: p.unmitigated.collapse.std_error,
            std_error_mitigated: p.mitigated.collapse.std_error,
            rescued: p.rescued,
            worsened: p.worsened,
        }
    }
}

/// Area under each curve and the relative reduction mitigation achieves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResilienceMetric {
    pub area_no_mitigation: f64,
    pub area_mitigated: f64,
    /// `(area_no - area_mit) / area_no × 100`; 0 when `area_no` is 0.
    pub improvement_percent: f64,
}

impl ResilienceMetric {
    pub fn from_areas(area_no_mitigation: f64, area_mitigated: f64) -> Self {
        let improvement_percent = if area_no_mitigation > 0.0 {
            (area_no_mitigation - area_mitigated) / area_no_mitigation * 100.0
        } else {
            0.0
        };
        Self { area_no_mitigation, area_mitigated, improvement_percent }
    }

    /// Points must be ordered by ascending attack magnitude.
    pub fn from_points(points: &[SweepPoint]) -> Self {
        let xs: Vec<f64> = points.iter().map(|p| p.attack_magnitude).collect();
        let no: Vec<f64> = points.iter().map(|p| p.collapse_probability_no_mitigation).collect();
        let mit: Vec<f64> = points.iter().map(|p| p.collapse_probability_mitigated).collect();
        Self::from_areas(trapezoid(&xs, &no), trapezoid(&xs, &mit))
    }
}

/// Trapezoidal integral of `ys` over `xs`. Fewer than two points give 0.
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) * 0.5)
        .sum()
}

/// Everything a sweep produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceStudy {
    pub boundary: Option<BoundaryEstimate>,
    pub points: Vec<SweepPoint>,
    pub metric: ResilienceMetric,
}

// ─── Entry Points ───────────────────────────────────────────────────────────

/// Sweep with the default configuration: boundary search, then 20 points
/// from 0.8× to 1.2× the boundary.
pub fn resilience_sweep(params: &ParameterSet) -> Result<(Vec<SweepPoint>, ResilienceMetric)> {
    let study = run_study(params, &SweepConfig::default())?;
    Ok((study.points, study.metric))
}

pub fn run_study(params: &ParameterSet, config: &SweepConfig) -> Result<ResilienceStudy> {
    let mc = MonteCarlo::new(params)?.with_execution(config.execution);
    // Fail on a bad grid or search before any Monte Carlo work.
    config.grid.validate()?;
    if config.grid.needs_boundary() {
        config.boundary.validate()?;
    }

    let boundary = if config.grid.needs_boundary() {
        Some(config.boundary.run(&mc)?)
    } else {
        None
    };
    let grid = config.grid.values(boundary.as_ref().map(|b| b.attack_scale))?;

    let mut points = Vec::with_capacity(grid.len());
    for &scale in &grid {
        let paired = mc.paired(scale)?;
        points.push(SweepPoint::from(&paired));
    }

    let metric = ResilienceMetric::from_points(&points);
    info!(
        points = points.len(),
        area_no_mitigation = metric.area_no_mitigation,
        area_mitigated = metric.area_mitigated,
        improvement_percent = metric.improvement_percent,
        "resilience sweep complete"
    );

    Ok(ResilienceStudy { boundary, points, metric })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, no: f64, mit: f64) -> SweepPoint {
        SweepPoint {
            attack_magnitude: x,
            collapse_probability_no_mitigation: no,
            collapse_probability_mitigated: mit,
            std_error_no_mitigation: 0.0,
            std_error_mitigated: 0.0,
            rescued: 0,
            worsened: 0,
        }
    }

    #[test]
    fn linspace_hits_both_ends() {
        let grid = linspace("test", 0.4, 1.4, 60).expect("test: valid grid");
        assert_eq!(grid.len(), 60);
        assert_eq!(grid[0], 0.4);
        assert_eq!(grid[59], 1.4);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn linspace_rejects_degenerate_ranges() {
        assert!(linspace("test", 0.0, 1.0, 1).is_err());
        assert!(linspace("test", 1.0, 1.0, 5).is_err());
        assert!(linspace("test", f64::NAN, 1.0, 5).is_err());
    }

    #[test]
    fn trapezoid_of_zero_curve_is_zero() {
        let xs = [0.1, 0.4, 0.9, 1.3];
        assert_eq!(trapezoid(&xs, &[0.0; 4]), 0.0);
        assert_eq!(trapezoid(&[], &[]), 0.0);
        assert_eq!(trapezoid(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn trapezoid_of_a_ramp() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 0.5, 1.0];
        assert!((trapezoid(&xs, &ys) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn improvement_guards_zero_area() {
        let metric = ResilienceMetric::from_points(&[point(0.1, 0.0, 0.0), point(0.2, 0.0, 0.0)]);
        assert_eq!(metric.area_no_mitigation, 0.0);
        assert_eq!(metric.area_mitigated, 0.0);
        assert_eq!(metric.improvement_percent, 0.0);
    }

    #[test]
    fn improvement_from_areas() {
        let metric = ResilienceMetric::from_points(&[
            point(1.0, 0.0, 0.0),
            point(2.0, 1.0, 0.0),
            point(3.0, 1.0, 1.0),
        ]);
        assert!((metric.area_no_mitigation - 1.5).abs() < 1e-12);
        assert!((metric.area_mitigated - 0.5).abs() < 1e-12);
        assert!((metric.improvement_percent - 66.666_666_666_666_67).abs() < 1e-9);
    }

    #[test]
    fn around_boundary_grid_scales_with_boundary() {
        let grid = SweepGrid::default().values(Some(0.5)).expect("test: valid grid");
        assert_eq!(grid.len(), 20);
        assert!((grid[0] - 0.4).abs() < 1e-12);
        assert!((grid[19] - 0.6).abs() < 1e-12);

        assert!(SweepGrid::default().values(Some(0.0)).is_err());
        assert!(SweepGrid::default().values(None).is_err());
    }

    #[test]
    fn grid_shape_is_checked_without_a_boundary() {
        assert_eq!(SweepGrid::default().validate(), Ok(()));
        for grid in [
            SweepGrid::AroundBoundary { lower_factor: 1.2, upper_factor: 0.8, points: 20 },
            SweepGrid::AroundBoundary { lower_factor: 0.8, upper_factor: f64::INFINITY, points: 20 },
            SweepGrid::AroundBoundary { lower_factor: 0.8, upper_factor: 1.2, points: 1 },
        ] {
            assert!(
                matches!(grid.validate(), Err(ConfigurationError::DegenerateGrid { .. })),
                "{:?}",
                grid
            );
        }
        let negative = SweepGrid::Fixed { start: -0.5, end: 0.5, points: 3 };
        assert!(matches!(
            negative.validate(),
            Err(ConfigurationError::Negative { field: "sweep.start", .. })
        ));
    }

    /// Parameters that degenerate numerically on the first attacked run.
    fn degenerate_params() -> ParameterSet {
        ParameterSet {
            damping_gain: 1.0e308,
            trip: crate::params::TripThresholds::Fixed { threshold: -f64::MAX },
            collapse: crate::params::CollapseCriterion {
                min_active_fraction: Some(0.3),
                min_mean_voltage: None,
            },
            monte_carlo_runs: 5,
            ..ParameterSet::default()
        }
    }

    #[test]
    fn bad_around_boundary_grid_fails_before_the_search() {
        let config = SweepConfig {
            grid: SweepGrid::AroundBoundary { lower_factor: 1.2, upper_factor: 0.8, points: 20 },
            ..SweepConfig::default()
        };
        let err = run_study(&degenerate_params(), &config).expect_err("test: bad grid");
        assert!(
            matches!(
                err,
                crate::error::ResilienceError::Configuration(ConfigurationError::DegenerateGrid { .. })
            ),
            "unexpected error {:?}",
            err
        );
    }

    #[test]
    fn bad_boundary_search_fails_before_the_search() {
        let config = SweepConfig {
            boundary: BoundarySearch { target: 0.0, ..BoundarySearch::default() },
            ..SweepConfig::default()
        };
        let err = run_study(&degenerate_params(), &config).expect_err("test: bad target");
        assert!(
            matches!(
                err,
                crate::error::ResilienceError::Configuration(
                    ConfigurationError::OutsideUnitInterval { field: "boundary.target", .. }
                )
            ),
            "unexpected error {:?}",
            err
        );
    }
}
