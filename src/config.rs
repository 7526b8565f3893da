//! Run configuration
//!
//! Every tunable of a simulation lives in one immutable value that is
//! handed to the driver at construction. Files are YAML; any field left
//! out takes the reference value, so an empty file reproduces the
//! reference run.
//!
//! ```yaml
//! integration:
//!   t_end: 60.0
//!   tolerance: 1.0e-7
//!   sampling: lagging
//! initial_conditions:
//!   Ca: 2.0
//!   CaM: 10.0
//! model:
//!   rhogef_activation: saturating
//! ```
//!
//! A supplied `initial_conditions` table replaces the reference table as a
//! whole; species it does not name start at zero.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::driver::SamplePolicy;
use crate::error::ConfigError;
use crate::model::ModelOptions;
use crate::solver::{StepController, Tolerances};
use crate::species::{InitialConditions, State};

/// Integration horizon, step control and sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Start time
    pub t_start: f64,
    /// Simulation horizon
    pub t_end: f64,
    /// First attempted step size
    pub initial_step: f64,
    /// Spacing of recorded samples
    pub sample_interval: f64,
    /// Absolute error tolerance per component
    pub tolerance: f64,
    /// Relative error tolerance per component (0 reproduces the reference)
    pub relative_tolerance: f64,
    /// Safety factor of the step controller
    pub safety: f64,
    /// Largest growth factor per accepted step
    pub grow_max: f64,
    /// Smallest shrink factor per rejected step
    pub shrink_max: f64,
    /// Step size below which a rejection aborts the run
    pub min_step: f64,
    /// Upper bound on the step size
    pub max_step: f64,
    /// Optional ceiling on step attempts, accepted or not
    pub max_steps: Option<u64>,
    /// How samples are placed when a step crosses grid times
    pub sampling: SamplePolicy,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 300.0,
            initial_step: 0.01,
            sample_interval: 0.1,
            tolerance: 1e-6,
            relative_tolerance: 0.0,
            safety: 0.9,
            grow_max: 1.2,
            shrink_max: 0.1,
            min_step: 1e-6,
            max_step: f64::INFINITY,
            max_steps: None,
            sampling: SamplePolicy::default(),
        }
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && !value.is_nan() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be finite, got {value}")))
    }
}

impl IntegrationConfig {
    /// Check every parameter against its admissible range
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("integration.t_start", self.t_start)?;
        finite("integration.t_end", self.t_end)?;
        if self.t_end <= self.t_start {
            return Err(ConfigError::invalid(
                "integration.t_end",
                format!("must exceed t_start ({}), got {}", self.t_start, self.t_end),
            ));
        }

        finite("integration.initial_step", self.initial_step)?;
        positive("integration.initial_step", self.initial_step)?;
        finite("integration.sample_interval", self.sample_interval)?;
        positive("integration.sample_interval", self.sample_interval)?;
        finite("integration.tolerance", self.tolerance)?;
        positive("integration.tolerance", self.tolerance)?;

        if !(self.relative_tolerance >= 0.0 && self.relative_tolerance.is_finite()) {
            return Err(ConfigError::invalid(
                "integration.relative_tolerance",
                format!("must be finite and non-negative, got {}", self.relative_tolerance),
            ));
        }
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return Err(ConfigError::invalid(
                "integration.safety",
                format!("must lie in (0, 1], got {}", self.safety),
            ));
        }
        if !(self.grow_max >= 1.0 && self.grow_max.is_finite()) {
            return Err(ConfigError::invalid(
                "integration.grow_max",
                format!("must be finite and at least 1, got {}", self.grow_max),
            ));
        }
        if !(self.shrink_max > 0.0 && self.shrink_max < 1.0) {
            return Err(ConfigError::invalid(
                "integration.shrink_max",
                format!("must lie in (0, 1), got {}", self.shrink_max),
            ));
        }

        finite("integration.min_step", self.min_step)?;
        positive("integration.min_step", self.min_step)?;
        if !(self.max_step >= self.min_step) {
            return Err(ConfigError::invalid(
                "integration.max_step",
                format!("must be at least min_step ({}), got {}", self.min_step, self.max_step),
            ));
        }
        if self.max_steps == Some(0) {
            return Err(ConfigError::invalid("integration.max_steps", "must be positive"));
        }
        Ok(())
    }

    /// Uniform error tolerances for an `N`-component state
    pub fn tolerances<const N: usize>(&self) -> Tolerances<N> {
        Tolerances::new(self.tolerance, self.relative_tolerance)
    }

    /// Step-size controller with the configured factors
    pub fn controller(&self) -> StepController {
        StepController::new(self.safety, self.grow_max, self.shrink_max)
    }
}

/// Complete description of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Horizon, tolerances and sampling
    pub integration: IntegrationConfig,
    /// Initial concentrations by species name
    pub initial_conditions: InitialConditions,
    /// Options of the built-in reference network
    pub model: ModelOptions,
    /// Optional YAML network definition replacing the built-in network
    pub network: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            integration: IntegrationConfig::default(),
            initial_conditions: InitialConditions::reference(),
            model: ModelOptions::default(),
            network: None,
        }
    }
}

impl SimulationConfig {
    /// Read and validate a YAML configuration file
    ///
    /// A relative `network` path is resolved against the directory of the
    /// configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: SimulationConfig = serde_yaml::from_reader(file)?;

        if let (Some(network), Some(dir)) = (config.network.as_mut(), path.parent()) {
            if network.is_relative() {
                *network = dir.join(&*network);
            }
        }

        config.validate()?;
        debug!("loaded configuration from {}: {:?}", path.display(), config.integration);
        Ok(config)
    }

    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and species names
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.integration.validate()?;
        self.initial_conditions.to_state()?;
        Ok(())
    }

    /// Initial state vector
    pub fn initial_state(&self) -> Result<State, ConfigError> {
        self.initial_conditions.to_state()
    }
}
