//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – compute device, work-group size, iterations per frame
//! - [`ParametersConfig`] – timestep, magnetic field, seed, header output
//! - [`SpeciesConfig`]    – requested particle counts per species
//! - [`RecipeConfig`]     – initial-condition recipe
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! An example scenario YAML matching these types:
//!
//! ```yaml
//! engine:
//!   device: "gpu"             # "gpu" keeps state resident, "cpu" transfers every step
//!   work_group_size: 64
//!   kernel_iterations: 10     # integration sub-steps per frame
//!
//! parameters:
//!   dt: 0.01
//!   magnetic_field: [0.0, 0.0, 0.0]
//!   seed: 42                  # optional, omit for a fresh layout every run
//!   header_dir: "generated"   # optional, writes kernel.h and host.h
//!
//! species:
//!   neutrons: 1000
//!   protons: 1000
//!   electrons: 500
//!
//! recipe:
//!   kind: "scatter"
//!   extent: [100.0, 100.0, 10.0]
//! ```
//!
//! The engine then maps this configuration into its runtime types
//! (`KernelConfig`, `ScenarioBuilder`) through [`crate::Scenario::build_scenario`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::simulation::backend::BackendKind;
use crate::simulation::scenario::PaddingPlacement;

/// Engine-level configuration
#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    pub device: BackendKind, // which backend advances the ensemble
    pub work_group_size: usize, // array lengths are padded to a multiple of this
    pub kernel_iterations: u32, // sub-steps per visible update
}

/// Numerical and physical parameters
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub dt: f64, // timestep
    #[serde(default)]
    pub magnetic_field: [f64; 3], // constant external field
    #[serde(default)]
    pub seed: Option<u64>, // makes layouts reproducible
    #[serde(default)]
    pub header_dir: Option<PathBuf>, // where to write kernel.h / host.h
}

/// Requested particle counts; signed so a bad file reports a scenario error
#[derive(Deserialize, Debug, Clone)]
pub struct SpeciesConfig {
    pub neutrons: i64,
    pub protons: i64,
    pub electrons: i64,
}

/// Initial-condition recipe, selected by `kind`
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecipeConfig {
    /// Everything at rest inside one box
    Scatter {
        #[serde(default)]
        extent: Option<[f64; 3]>,
    },

    /// Neutrons stream +x from the left, everything else streams -x from the right
    CounterStream {
        #[serde(default)]
        extent: Option<[f64; 3]>,
        #[serde(default)]
        offset: Option<f64>, // |x| of each cluster centre
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        padding: Option<PaddingPlacement>,
    },
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    pub species: SpeciesConfig,
    pub recipe: RecipeConfig,
}

impl ScenarioConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }
}
