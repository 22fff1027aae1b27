//! Backend dispatch for advancing the ensemble
//!
//! Two calling conventions sit behind [`ComputeBackend`]:
//! - [`ResidentState`]: uploads once, iterates on the device, reads positions back
//! - [`StatelessTransfer`]: hands every array to the host kernel on each iteration
//!
//! Callers only see `advance`; neither variant changes the index layout.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SimError};
use crate::simulation::kernel::{DeviceKernel, EmulatedDevice, HostKernel, ReferenceKernel};
use crate::simulation::params::KernelConfig;
use crate::simulation::states::ParticleEnsemble;

/// Which backend variant to bring up
/// `device: "gpu"` or `device: "cpu"` in a scenario file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "gpu", alias = "resident")] // state kept on the device between updates
    ResidentState,

    #[serde(rename = "cpu", alias = "stateless")] // full array set passed on every iteration
    StatelessTransfer,
}

impl std::str::FromStr for BackendKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gpu" | "resident" => Ok(Self::ResidentState),
            "cpu" | "stateless" => Ok(Self::StatelessTransfer),
            other => Err(SimError::config(format!("unknown device {other:?}, expected gpu or cpu"))),
        }
    }
}

/// Advances an ensemble by a number of integration steps
pub trait ComputeBackend {
    /// Run `steps` iterations and leave the resulting positions in `ensemble.position`
    fn advance(&mut self, ensemble: &mut ParticleEnsemble, config: &KernelConfig, steps: u32) -> Result<()>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Bring up the selected backend with the reference kernels and upload `ensemble`
pub fn open(kind: BackendKind, ensemble: &ParticleEnsemble, config: &KernelConfig) -> Result<Box<dyn ComputeBackend>> {
    let backend: Box<dyn ComputeBackend> = match kind {
        BackendKind::ResidentState => Box::new(ResidentState::new(EmulatedDevice::new(config), ensemble, config)?),
        BackendKind::StatelessTransfer => Box::new(StatelessTransfer::new(ReferenceKernel::new(config), ensemble, config)?),
    };
    info!(backend = backend.name(), slots = ensemble.padded_count(), "compute backend ready");
    Ok(backend)
}

fn check_alignment(ensemble: &ParticleEnsemble, config: &KernelConfig) -> Result<()> {
    let n = ensemble.padded_count();
    let wg = config.work_group_size();
    if n % wg != 0 {
        return Err(SimError::backend_init(format!(
            "ensemble of {n} slots is not aligned to work-group size {wg}"
        )));
    }
    Ok(())
}

fn check_slots(expected: usize, ensemble: &ParticleEnsemble) -> Result<()> {
    if ensemble.padded_count() != expected {
        return Err(SimError::backend_step(format!(
            "backend initialized for {expected} slots, got {}",
            ensemble.padded_count()
        )));
    }
    Ok(())
}

// =========================================================================================
// Resident state
// =========================================================================================

/// Backend whose authoritative state lives in the device kernel.
///
/// Host velocities are stale after construction; only positions come back.
pub struct ResidentState<K: DeviceKernel> {
    kernel: K,
    slots: usize,
}

impl<K: DeviceKernel> ResidentState<K> {
    /// Upload the full ensemble once
    pub fn new(mut kernel: K, ensemble: &ParticleEnsemble, config: &KernelConfig) -> Result<Self> {
        check_alignment(ensemble, config)?;
        let slots = ensemble.padded_count();
        kernel.init(slots, config.work_group_size(), ensemble.arrays())?;
        debug!(slots, "uploaded ensemble to device");
        Ok(Self { kernel, slots })
    }
}

impl<K: DeviceKernel> ComputeBackend for ResidentState<K> {
    fn advance(&mut self, ensemble: &mut ParticleEnsemble, _config: &KernelConfig, steps: u32) -> Result<()> {
        check_slots(self.slots, ensemble)?;
        for _ in 0..steps {
            self.kernel.launch()?;
        }
        self.kernel.read_positions(&mut ensemble.position)
    }

    fn name(&self) -> &'static str {
        "resident"
    }
}

// =========================================================================================
// Stateless transfer
// =========================================================================================

/// Backend that passes the whole array set to a host kernel every iteration
pub struct StatelessTransfer<K: HostKernel> {
    kernel: K,
    slots: usize,
}

impl<K: HostKernel> StatelessTransfer<K> {
    /// Let the kernel check the ensemble shape; the arrays stay with the caller
    pub fn new(mut kernel: K, ensemble: &ParticleEnsemble, config: &KernelConfig) -> Result<Self> {
        check_alignment(ensemble, config)?;
        let slots = ensemble.padded_count();
        kernel.init(slots, config.work_group_size(), ensemble.arrays())?;
        debug!(slots, "host kernel ready");
        Ok(Self { kernel, slots })
    }
}

impl<K: HostKernel> ComputeBackend for StatelessTransfer<K> {
    fn advance(&mut self, ensemble: &mut ParticleEnsemble, _config: &KernelConfig, steps: u32) -> Result<()> {
        check_slots(self.slots, ensemble)?;
        let n = ensemble.padded_count();
        for _ in 0..steps {
            self.kernel.update(n, ensemble.arrays_mut())?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stateless"
    }
}
