//! Error taxonomy for the simulation core.
//!
//! Every failure is terminal for the run: nothing here is retried, and once a
//! backend has failed the ensemble contents are no longer trusted.

use thiserror::Error;

use crate::simulation::states::Species;

/// Errors surfaced by scenario building, configuration, backends and visual sync.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed species counts or recipe geometry
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// Malformed timestep, work-group size or field
    #[error("invalid kernel config: {0}")]
    InvalidConfig(String),

    /// Compute backend could not be brought up
    #[error("backend initialization failed: {0}")]
    BackendInit(String),

    /// Compute backend failed while advancing the ensemble
    #[error("backend step failed: {0}")]
    BackendStep(String),

    /// Species position count disagrees with the visual handle pool
    #[error("{species:?} sync length mismatch: {positions} positions for {handles} handles")]
    SyncLengthMismatch {
        species: Species,
        positions: usize,
        handles: usize,
    },

    /// Scenario file could not be read or headers could not be written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid YAML for [`crate::ScenarioConfig`]
    #[error("scenario file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SimError {
    pub fn scenario(msg: impl Into<String>) -> Self {
        Self::InvalidScenario(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn backend_init(msg: impl Into<String>) -> Self {
        Self::BackendInit(msg.into())
    }

    pub fn backend_step(msg: impl Into<String>) -> Self {
        Self::BackendStep(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
