// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Parameter Set

//! Immutable configuration for one simulation family.
//!
//! A [`ParameterSet`] carries every constant the engine needs: cluster size,
//! time horizon, attack timing, controller gains, trip/reconnect thresholds,
//! the cascade and filtering policies, and the Monte Carlo run count. It is
//! validated eagerly by [`ParameterSet::validate`]; the drivers call it before
//! any run starts, so a simulation never observes an invalid set.
//!
//! Nominal voltage is normalized to 1.0.

use serde::{Deserialize, Serialize};

use crate::attack::{AttackInput, AttackScaling};
use crate::cascade::CascadeModel;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An invalid parameter set, reported before any simulation runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("inverter_count must be at least 1")]
    NoInverters,

    #[error("monte_carlo_runs must be at least 1")]
    NoRuns,

    #[error("{field} must be positive and finite (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be non-negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be finite (got {value})")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must lie in [0, 1] (got {value})")]
    OutsideUnitInterval { field: &'static str, value: f64 },

    #[error("dt {dt} exceeds sim_time {sim_time}; no step would run")]
    NoSteps { sim_time: f64, dt: f64 },

    #[error("thresholds must satisfy trip < 1.0 < reconnect (trip {trip}, reconnect {reconnect})")]
    ThresholdOrdering { trip: f64, reconnect: f64 },

    #[error("collapse criterion needs an active-fraction or a mean-voltage threshold")]
    EmptyCollapseCriterion,

    #[error("{name} grid needs at least 2 points and start < end (start {start}, end {end}, points {points})")]
    DegenerateGrid { name: &'static str, start: f64, end: f64, points: usize },
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Per-inverter trip thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TripThresholds {
    /// Every inverter trips at the same voltage.
    Fixed { threshold: f64 },
    /// Each inverter draws its threshold once per run from Normal(mean, std).
    Randomized { mean: f64, std: f64 },
}

impl TripThresholds {
    /// Central threshold value, used for the ordering invariant.
    pub fn mean(&self) -> f64 {
        match *self {
            TripThresholds::Fixed { threshold } => threshold,
            TripThresholds::Randomized { mean, .. } => mean,
        }
    }
}

impl Default for TripThresholds {
    fn default() -> Self {
        TripThresholds::Randomized { mean: 0.85, std: 0.01 }
    }
}

/// Controller behaviour once an attack has been detected on a mitigated run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mitigation {
    /// Multiplier on the effective attack after detection.
    pub attack_factor: f64,
    /// Multiplier on the damping gain after detection.
    pub damping_factor: f64,
    /// Whether tripped inverters may reconnect once the cluster average recovers.
    pub reconnect: bool,
}

impl Default for Mitigation {
    fn default() -> Self {
        Self { attack_factor: 0.5, damping_factor: 1.0, reconnect: false }
    }
}

/// Terminal collapse test. Configured conditions are OR-combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseCriterion {
    /// Collapse when the final active fraction is below this value.
    pub min_active_fraction: Option<f64>,
    /// Collapse when the final mean voltage is below this value.
    pub min_mean_voltage: Option<f64>,
}

impl Default for CollapseCriterion {
    fn default() -> Self {
        Self { min_active_fraction: Some(0.3), min_mean_voltage: Some(0.82) }
    }
}

impl CollapseCriterion {
    pub fn is_collapse(&self, final_active_fraction: f64, final_mean_voltage: f64) -> bool {
        let tripped_out = self
            .min_active_fraction
            .map_or(false, |limit| final_active_fraction < limit);
        let sagged = self
            .min_mean_voltage
            .map_or(false, |limit| final_mean_voltage < limit);
        tripped_out || sagged
    }
}

// ---------------------------------------------------------------------------
// ParameterSet
// ---------------------------------------------------------------------------

/// Configuration for one simulation family.
///
/// `Default` is the stable model: randomized trip thresholds, raw step attack
/// scaled from `attack_base_magnitude`, continuous cascade coupling.
/// [`ParameterSet::differentiation`] is the filtered-attack model with droop,
/// shared-bus coupling, recovery and the discrete cascade penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    // Cluster and horizon
    pub inverter_count: usize,
    pub sim_time: f64,
    pub dt: f64,

    // Attack
    pub attack_start: f64,
    pub detection_delay: f64,
    pub attack_base_magnitude: f64,
    pub attack_scaling: AttackScaling,
    pub attack_input: AttackInput,

    // Dynamics
    pub damping_gain: f64,
    pub droop_gain: f64,
    pub recovery_gain: f64,
    pub coupling_strength: f64,
    pub cascade: CascadeModel,
    pub noise_std: f64,

    // Protection
    pub trip: TripThresholds,
    pub reconnect_threshold: f64,
    pub mitigation: Mitigation,
    pub collapse: CollapseCriterion,

    // Monte Carlo
    pub monte_carlo_runs: usize,
    pub base_seed: u64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            inverter_count: 20,
            sim_time: 6.0,
            dt: 0.01,
            attack_start: 2.0,
            detection_delay: 1.0,
            attack_base_magnitude: 0.8,
            attack_scaling: AttackScaling::Multiplier,
            attack_input: AttackInput::Step,
            damping_gain: 1.8,
            droop_gain: 0.0,
            recovery_gain: 0.0,
            coupling_strength: 0.0,
            cascade: CascadeModel::Continuous { gain: 0.03 },
            noise_std: 0.01,
            trip: TripThresholds::Randomized { mean: 0.85, std: 0.01 },
            reconnect_threshold: 1.02,
            mitigation: Mitigation::default(),
            collapse: CollapseCriterion::default(),
            monte_carlo_runs: 300,
            base_seed: 0,
        }
    }
}

impl ParameterSet {
    /// The stable randomized-threshold model (same as `Default`).
    pub fn stable() -> Self {
        Self::default()
    }

    /// Filtered attack applied directly as a magnitude, droop + coupling +
    /// recovery dynamics, fixed trip threshold, discrete cascade penalty and
    /// reconnect under mitigation. Collapse is judged on tripped units only.
    pub fn differentiation() -> Self {
        Self {
            inverter_count: 20,
            sim_time: 10.0,
            dt: 0.01,
            attack_start: 2.0,
            detection_delay: 0.6,
            attack_base_magnitude: 1.0,
            attack_scaling: AttackScaling::Direct,
            attack_input: AttackInput::filtered(),
            damping_gain: 2.5,
            droop_gain: 3.5,
            recovery_gain: 5.0,
            coupling_strength: 0.8,
            cascade: CascadeModel::discrete(0.02),
            noise_std: 0.0015,
            trip: TripThresholds::Fixed { threshold: 0.80 },
            reconnect_threshold: 1.01,
            mitigation: Mitigation { attack_factor: 0.4, damping_factor: 1.3, reconnect: true },
            collapse: CollapseCriterion { min_active_fraction: Some(0.3), min_mean_voltage: None },
            monte_carlo_runs: 150,
            base_seed: 0,
        }
    }

    /// Number of discrete steps. `sim_time / dt` is truncated, so the last
    /// instant may fall short of `sim_time` by less than `dt`.
    pub fn steps(&self) -> usize {
        let ratio = self.sim_time / self.dt;
        // Absorb representation error such as 0.3 / 0.1 = 2.9999999999999996
        let nearest = ratio.round();
        if (ratio - nearest).abs() < 1e-9 {
            nearest as usize
        } else {
            ratio.floor() as usize
        }
    }

    /// Attack magnitude for a given per-call scale.
    pub fn attack_magnitude(&self, attack_scale: f64) -> f64 {
        self.attack_scaling.magnitude(self.attack_base_magnitude, attack_scale)
    }

    pub fn detection_time(&self) -> f64 {
        self.attack_start + self.detection_delay
    }

    /// Check every invariant. Called by all drivers before simulating.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.inverter_count < 1 {
            return Err(ConfigurationError::NoInverters);
        }
        if self.monte_carlo_runs < 1 {
            return Err(ConfigurationError::NoRuns);
        }

        positive("sim_time", self.sim_time)?;
        positive("dt", self.dt)?;
        if self.steps() < 1 {
            return Err(ConfigurationError::NoSteps { sim_time: self.sim_time, dt: self.dt });
        }

        non_negative_finite("attack_start", self.attack_start)?;
        // An infinite delay is allowed and means the attack is never detected.
        if self.detection_delay.is_nan() || self.detection_delay < 0.0 {
            return Err(ConfigurationError::Negative {
                field: "detection_delay",
                value: self.detection_delay,
            });
        }
        finite("attack_base_magnitude", self.attack_base_magnitude)?;

        non_negative_finite("damping_gain", self.damping_gain)?;
        non_negative_finite("droop_gain", self.droop_gain)?;
        non_negative_finite("recovery_gain", self.recovery_gain)?;
        non_negative_finite("coupling_strength", self.coupling_strength)?;
        non_negative_finite("noise_std", self.noise_std)?;

        if let AttackInput::Filtered { time_constant } = self.attack_input {
            positive("attack_input.time_constant", time_constant)?;
        }

        match self.cascade {
            CascadeModel::Continuous { gain } => non_negative_finite("cascade.gain", gain)?,
            CascadeModel::DiscretePenalty { penalty, active_fraction_below } => {
                non_negative_finite("cascade.penalty", penalty)?;
                unit_interval("cascade.active_fraction_below", active_fraction_below)?;
            }
        }

        match self.trip {
            TripThresholds::Fixed { threshold } => finite("trip.threshold", threshold)?,
            TripThresholds::Randomized { mean, std } => {
                finite("trip.mean", mean)?;
                non_negative_finite("trip.std", std)?;
            }
        }
        finite("reconnect_threshold", self.reconnect_threshold)?;
        let trip = self.trip.mean();
        if !(trip < 1.0 && 1.0 < self.reconnect_threshold) {
            return Err(ConfigurationError::ThresholdOrdering {
                trip,
                reconnect: self.reconnect_threshold,
            });
        }

        unit_interval("mitigation.attack_factor", self.mitigation.attack_factor)?;
        positive("mitigation.damping_factor", self.mitigation.damping_factor)?;

        match (self.collapse.min_active_fraction, self.collapse.min_mean_voltage) {
            (None, None) => return Err(ConfigurationError::EmptyCollapseCriterion),
            (fraction, voltage) => {
                if let Some(f) = fraction {
                    unit_interval("collapse.min_active_fraction", f)?;
                }
                if let Some(v) = voltage {
                    finite("collapse.min_mean_voltage", v)?;
                }
            }
        }

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::NotFinite { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::NotPositive { field, value })
    }
}

fn non_negative_finite(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigurationError::Negative { field, value });
    }
    Ok(())
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::OutsideUnitInterval { field, value })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
