// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite

//! Collapse resilience of a grid-tied inverter cluster under a voltage
//! disturbance attack, with and without a detection-gated mitigation
//! controller.
//!
//! Data flow: [`ParameterSet`] → [`simulate`] → [`collapse_probability`] →
//! {[`find_boundary`], [`resilience_sweep`]} → [`ResilienceMetric`].
//!
//! The per-inverter voltage is a lumped proxy state, not an AC power-flow
//! result. The engine performs no I/O; callers consume the returned values.

pub mod attack;
pub mod boundary;
pub mod cascade;
pub mod error;
pub mod monte_carlo;
pub mod params;
pub mod simulation;
pub mod state;
pub mod stats;
pub mod sweep;

pub use attack::{AttackInput, AttackScaling};
pub use boundary::{find_boundary, search_boundary, BoundaryEstimate, BoundarySearch};
pub use cascade::CascadeModel;
pub use error::{ResilienceError, Result};
pub use monte_carlo::{
    collapse_probability, estimate_collapse, paired_estimate, Execution, MonteCarlo,
    PairedEstimate, RunSummary,
};
pub use params::{CollapseCriterion, ConfigurationError, Mitigation, ParameterSet, TripThresholds};
pub use simulation::{simulate, ClusterSimulation, RunResult, SimulationError};
pub use state::ClusterState;
pub use stats::{CollapseEstimate, Stats};
pub use sweep::{
    resilience_sweep, run_study, trapezoid, ResilienceMetric, ResilienceStudy, SweepConfig,
    SweepGrid, SweepPoint,
};
