//! Error types for configuration, output and whole-run failures.
//!
//! Integration failures live next to the stepper in
//! [`crate::solver::IntegrationError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::solver::IntegrationError;

/// Invalid or unreadable configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read configuration {path}: {source}")]
    Read {
        /// File that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for the expected schema
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A species name that is not part of the network
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),

    /// A parameter outside its admissible range
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Failures of the trajectory output sink
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Output could not be opened before integration started
    #[error("cannot open output {path}: {source}")]
    Unavailable {
        /// Requested output location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing a CSV record failed
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing or writing the underlying stream failed
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure that aborts a simulation run
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Invalid configuration, detected before any work is done
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The output sink failed
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    /// The integrator gave up
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}
