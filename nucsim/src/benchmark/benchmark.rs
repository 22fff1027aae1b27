use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::simulation::backend::{self, BackendKind, ComputeBackend};
use crate::simulation::params::KernelConfig;
use crate::simulation::states::{NVec3, ParticleEnsemble, SpeciesCounts};

/// Seconds per update for each backend at one ensemble size
#[derive(Debug, Clone, Copy)]
pub struct BackendTiming {
    pub slots: usize,
    pub resident_s: f64,
    pub stateless_s: f64,
}

impl BackendTiming {
    /// How many times faster the resident backend ran
    pub fn boost(&self) -> f64 {
        if self.resident_s > 0.0 {
            self.stateless_s / self.resident_s
        } else {
            f64::INFINITY
        }
    }
}

/// Helper to build a deterministic ensemble of `n` protons, no rand needed
fn make_ensemble(n: usize, work_group_size: usize) -> Result<ParticleEnsemble> {
    let mut ensemble = ParticleEnsemble::new(SpeciesCounts::new(0, n, 0), work_group_size)?;
    for i in 0..ensemble.raw_count() {
        let i_f = i as f64;
        ensemble.position[i] = NVec3::new(
            (i_f * 0.37).sin() * 5.0 * i_f.cbrt(),
            (i_f * 0.13).cos() * 5.0 * i_f.cbrt(),
            (i_f * 0.07).sin() * 5.0,
        );
        ensemble.velocity[i] = NVec3::new((i_f * 0.11).cos(), (i_f * 0.17).sin(), 0.0) * 0.5;
    }
    Ok(ensemble)
}

fn time_updates(backend: &mut dyn ComputeBackend, ensemble: &mut ParticleEnsemble, config: &KernelConfig, updates: u32) -> Result<f64> {
    // Warm up
    backend.advance(ensemble, config, updates.saturating_mul(5))?;

    let t0 = Instant::now();
    backend.advance(ensemble, config, updates)?;
    Ok(t0.elapsed().as_secs_f64() / updates.max(1) as f64)
}

/// Time `updates` kernel iterations on both backends for each particle count
pub fn bench_backends(sizes: &[usize], config: &KernelConfig, updates: u32) -> Result<Vec<BackendTiming>> {
    let mut timings = Vec::with_capacity(sizes.len());

    for &n in sizes {
        let template = make_ensemble(n, config.work_group_size())?;

        let mut resident_ensemble = template.clone();
        let mut resident = backend::open(BackendKind::ResidentState, &resident_ensemble, config)?;
        let resident_s = time_updates(&mut *resident, &mut resident_ensemble, config, updates)?;

        let mut stateless_ensemble = template.clone();
        let mut stateless = backend::open(BackendKind::StatelessTransfer, &stateless_ensemble, config)?;
        let stateless_s = time_updates(&mut *stateless, &mut stateless_ensemble, config, updates)?;

        let timing = BackendTiming {
            slots: template.padded_count(),
            resident_s,
            stateless_s,
        };
        info!(
            slots = timing.slots,
            resident_s = timing.resident_s,
            stateless_s = timing.stateless_s,
            "update timing: boost x{:.1}",
            timing.boost()
        );
        timings.push(timing);
    }

    Ok(timings)
}
