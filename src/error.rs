// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Errors

use crate::params::ConfigurationError;
use crate::simulation::SimulationError;

/// Every failure the engine can report.
///
/// Configuration problems surface before any run starts. A numerical
/// degeneracy fails only the run (and the estimate) it occurred in.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResilienceError {
    #[error("invalid parameter set: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

pub type Result<T, E = ResilienceError> = std::result::Result<T, E>;
