//! Runtime engine driving one simulation run
//!
//! Owns the ensemble, the kernel parameters and the backend handle, and
//! exposes the per-frame `step`: advance by `kernel_iterations`, then push
//! species positions to a visual bridge.

use tracing::{debug, info, trace};

use crate::error::Result;
use crate::simulation::backend::{self, BackendKind, ComputeBackend};
use crate::simulation::params::KernelConfig;
use crate::simulation::scenario::{Scenario, ScenarioBuilder};
use crate::simulation::states::ParticleEnsemble;
use crate::visualization::sync::{SpeciesPositions, VisualSyncBridge};

/// Lifecycle of an engine; there is no way back from `Running`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Initialized, // backend up, no step taken yet
    Running, // at least one step completed
}

pub struct SimulationEngine {
    ensemble: ParticleEnsemble,
    config: KernelConfig,
    backend: Box<dyn ComputeBackend>,
    phase: EnginePhase,
    frames: u64, // completed steps
    iterations: u64, // kernel iterations across all steps
}

impl SimulationEngine {
    /// Build the ensemble and bring up the selected reference backend
    pub fn initialize(scenario: &ScenarioBuilder, config: KernelConfig, kind: BackendKind) -> Result<Self> {
        let ensemble = scenario.build(config.work_group_size())?;
        let backend = backend::open(kind, &ensemble, &config)?;
        Ok(Self::assemble(ensemble, config, backend))
    }

    /// Build the ensemble and hand it to a caller-supplied backend constructor
    pub fn with_backend<F>(scenario: &ScenarioBuilder, config: KernelConfig, open: F) -> Result<Self>
    where
        F: FnOnce(&ParticleEnsemble, &KernelConfig) -> Result<Box<dyn ComputeBackend>>,
    {
        let ensemble = scenario.build(config.work_group_size())?;
        let backend = open(&ensemble, &config)?;
        Ok(Self::assemble(ensemble, config, backend))
    }

    /// Write headers if requested, then initialize from a loaded scenario
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        if let Some(dir) = &scenario.header_dir {
            scenario.config.write_headers(dir)?;
            info!(dir = %dir.display(), "wrote kernel headers");
        }
        Self::initialize(&scenario.builder, scenario.config.clone(), scenario.backend)
    }

    fn assemble(ensemble: ParticleEnsemble, config: KernelConfig, backend: Box<dyn ComputeBackend>) -> Self {
        let counts = ensemble.counts();
        info!(
            neutrons = counts.neutrons,
            protons = counts.protons,
            electrons = counts.electrons,
            slots = ensemble.padded_count(),
            backend = backend.name(),
            "engine initialized"
        );
        Self {
            ensemble,
            config,
            backend,
            phase: EnginePhase::Initialized,
            frames: 0,
            iterations: 0,
        }
    }

    /// Advance one frame and publish the new positions.
    ///
    /// A failed advance is returned as-is and nothing is synced.
    pub fn step(&mut self, bridge: &mut dyn VisualSyncBridge) -> Result<()> {
        let steps = self.config.kernel_iterations();
        self.backend.advance(&mut self.ensemble, &self.config, steps)?;

        self.frames += 1;
        self.iterations += u64::from(steps);
        self.phase = EnginePhase::Running;
        trace!(frame = self.frames, steps, "advanced");

        self.sync(bridge)
    }

    /// Publish current positions without advancing
    pub fn sync(&self, bridge: &mut dyn VisualSyncBridge) -> Result<()> {
        bridge.sync(SpeciesPositions::from_ensemble(&self.ensemble))
    }

    /// Run `frames` steps, logging progress every `log_every` frames
    pub fn run(&mut self, frames: u64, log_every: u64, bridge: &mut dyn VisualSyncBridge) -> Result<()> {
        for _ in 0..frames {
            self.step(bridge)?;
            if log_every > 0 && self.frames % log_every == 0 {
                debug!(frame = self.frames, iterations = self.iterations, "progress");
            }
        }
        Ok(())
    }

    pub fn ensemble(&self) -> &ParticleEnsemble {
        &self.ensemble
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}
