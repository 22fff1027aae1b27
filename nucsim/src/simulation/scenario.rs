//! Build fully-initialized particle ensembles from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! (`Scenario`) containing:
//! - the kernel parameters (`KernelConfig`)
//! - the selected backend (`BackendKind`)
//! - a `ScenarioBuilder` that lays out the initial ensemble
//!
//! Recipes only fill positions and velocities; species constants and padding
//! come from `ParticleEnsemble::new`.

use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::configuration::config::{RecipeConfig, ScenarioConfig};
use crate::error::{Result, SimError};
use crate::simulation::backend::BackendKind;
use crate::simulation::params::KernelConfig;
use crate::simulation::states::{NVec3, ParticleEnsemble, SpeciesCounts};

pub const SCATTER_EXTENT: [f64; 3] = [100.0, 100.0, 10.0];
pub const STREAM_EXTENT: [f64; 3] = [40.0, 20.0, 20.0];
pub const STREAM_OFFSET: f64 = 60.0;
pub const STREAM_SPEED: f64 = 1.0;

/// Where counter-stream puts the padding slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaddingPlacement {
    /// Padding shares the second cluster's box and velocity
    #[default]
    TrailingCluster,
    /// Padding sits at the origin with zero velocity
    AtRest,
}

/// Named initial-condition recipe
#[derive(Debug, Clone, PartialEq)]
pub enum Recipe {
    /// Every slot uniformly inside one box centred at the origin, all at rest
    Scatter { extent: NVec3 },

    /// Two boxes at `x = -offset` and `x = +offset` closing at `speed`
    CounterStream {
        extent: NVec3,
        offset: f64,
        speed: f64,
        padding: PaddingPlacement,
    },
}

impl Recipe {
    pub fn scatter() -> Self {
        Recipe::Scatter {
            extent: NVec3::from(SCATTER_EXTENT),
        }
    }

    pub fn counter_stream() -> Self {
        Recipe::CounterStream {
            extent: NVec3::from(STREAM_EXTENT),
            offset: STREAM_OFFSET,
            speed: STREAM_SPEED,
            padding: PaddingPlacement::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Recipe::Scatter { .. } => "scatter",
            Recipe::CounterStream { .. } => "counter-stream",
        }
    }

    fn extent(&self) -> NVec3 {
        match self {
            Recipe::Scatter { extent } | Recipe::CounterStream { extent, .. } => *extent,
        }
    }
}

impl From<RecipeConfig> for Recipe {
    fn from(cfg: RecipeConfig) -> Self {
        match cfg {
            RecipeConfig::Scatter { extent } => Recipe::Scatter {
                extent: NVec3::from(extent.unwrap_or(SCATTER_EXTENT)),
            },
            RecipeConfig::CounterStream {
                extent,
                offset,
                speed,
                padding,
            } => Recipe::CounterStream {
                extent: NVec3::from(extent.unwrap_or(STREAM_EXTENT)),
                offset: offset.unwrap_or(STREAM_OFFSET),
                speed: speed.unwrap_or(STREAM_SPEED),
                padding: padding.unwrap_or_default(),
            },
        }
    }
}

/// Lays out a fresh ensemble for given species counts and recipe
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    counts: SpeciesCounts,
    recipe: Recipe,
    seed: Option<u64>,
}

impl ScenarioBuilder {
    pub fn new(counts: SpeciesCounts, recipe: Recipe) -> Self {
        Self {
            counts,
            recipe,
            seed: None,
        }
    }

    /// Fix the layout RNG so repeated builds match
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn counts(&self) -> SpeciesCounts {
        self.counts
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Allocate the padded ensemble and populate it with the recipe
    pub fn build(&self, work_group_size: usize) -> Result<ParticleEnsemble> {
        if work_group_size == 0 {
            return Err(SimError::scenario("work_group_size must be positive"));
        }
        let extent = self.recipe.extent();
        if extent.iter().any(|e| !e.is_finite() || *e < 0.0) {
            return Err(SimError::scenario(format!("box extent must be finite and non-negative, got {extent:?}")));
        }
        if let Recipe::CounterStream { offset, speed, .. } = &self.recipe {
            for (name, value) in [("offset", *offset), ("speed", *speed)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(SimError::scenario(format!("stream {name} must be finite and non-negative, got {value}")));
                }
            }
        }

        let mut ensemble = ParticleEnsemble::new(self.counts, work_group_size)?;
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        match &self.recipe {
            Recipe::Scatter { extent } => {
                // padding included, velocities stay zero
                for r in ensemble.position.iter_mut() {
                    *r = sample_box(&mut rng, NVec3::zeros(), extent);
                }
            }
            Recipe::CounterStream {
                extent,
                offset,
                speed,
                padding,
            } => {
                let nn = self.counts.neutrons;
                let left = NVec3::new(-offset, 0.0, 0.0);
                let right = NVec3::new(*offset, 0.0, 0.0);

                // neutrons on the left heading +x
                for i in 0..nn {
                    ensemble.position[i] = sample_box(&mut rng, left, extent);
                    ensemble.velocity[i] = NVec3::new(*speed, 0.0, 0.0);
                }

                // protons, electrons and (by default) padding on the right heading -x
                let end = match padding {
                    PaddingPlacement::TrailingCluster => ensemble.padded_count(),
                    PaddingPlacement::AtRest => ensemble.raw_count(),
                };
                for i in nn..end {
                    ensemble.position[i] = sample_box(&mut rng, right, extent);
                    ensemble.velocity[i] = NVec3::new(-speed, 0.0, 0.0);
                }
            }
        }

        debug!(
            recipe = self.recipe.name(),
            raw = ensemble.raw_count(),
            padded = ensemble.padded_count(),
            "built ensemble"
        );
        Ok(ensemble)
    }
}

/// Uniform sample in the box of size `extent` centred at `center`
fn sample_box(rng: &mut impl Rng, center: NVec3, extent: &NVec3) -> NVec3 {
    NVec3::new(
        (rng.gen::<f64>() - 0.5) * extent.x,
        (rng.gen::<f64>() - 0.5) * extent.y,
        (rng.gen::<f64>() - 0.5) * extent.z,
    ) + center
}

// =========================================================================================
// Runtime bundle
// =========================================================================================

/// Fully-resolved scenario, ready to hand to `SimulationEngine`
///
/// This is the main "runtime bundle" constructed from a [`ScenarioConfig`]:
/// kernel parameters, the backend choice, and the ensemble layout.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub builder: ScenarioBuilder,
    pub config: KernelConfig,
    pub backend: BackendKind,
    pub header_dir: Option<PathBuf>,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        // Kernel parameters (runtime) from engine + parameters sections
        let config = KernelConfig::new(
            cfg.engine.work_group_size,
            cfg.parameters.dt,
            NVec3::from(cfg.parameters.magnetic_field),
            cfg.engine.kernel_iterations,
        )?;

        // Species counts arrive signed so negatives are caught here
        let s = &cfg.species;
        let counts = SpeciesCounts::from_signed(s.neutrons, s.protons, s.electrons)?;

        let mut builder = ScenarioBuilder::new(counts, Recipe::from(cfg.recipe));
        if let Some(seed) = cfg.parameters.seed {
            builder = builder.with_seed(seed);
        }

        Ok(Self {
            builder,
            config,
            backend: cfg.engine.device,
            header_dir: cfg.parameters.header_dir,
        })
    }
}
