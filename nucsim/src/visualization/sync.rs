//! Position hand-off from the ensemble to renderer-owned objects
//!
//! The renderer owns one handle per real particle, grouped into a pool per
//! species. A sync pushes each species' positions into its pool in ensemble
//! order; padding never reaches a pool.

use crate::error::{Result, SimError};
use crate::simulation::states::{NVec3, ParticleEnsemble, Species};

/// Positions of each species, sliced out of the ensemble in order
#[derive(Debug, Clone, Copy)]
pub struct SpeciesPositions<'a> {
    pub neutrons: &'a [NVec3],
    pub protons: &'a [NVec3],
    pub electrons: &'a [NVec3],
}

impl<'a> SpeciesPositions<'a> {
    /// Partition `ensemble.position` by species range, dropping padding
    pub fn from_ensemble(ensemble: &'a ParticleEnsemble) -> Self {
        Self {
            neutrons: ensemble.positions_of(Species::Neutron),
            protons: ensemble.positions_of(Species::Proton),
            electrons: ensemble.positions_of(Species::Electron),
        }
    }

    pub fn get(&self, species: Species) -> &'a [NVec3] {
        match species {
            Species::Neutron => self.neutrons,
            Species::Proton => self.protons,
            Species::Electron => self.electrons,
        }
    }
}

/// Receiver of per-frame positions
pub trait VisualSyncBridge {
    /// Publish every species' positions, failing before any update on a length mismatch
    fn sync(&mut self, positions: SpeciesPositions<'_>) -> Result<()>;
}

/// Something whose transform can be moved to a position
pub trait VisualHandle {
    fn set_translation(&mut self, position: &NVec3);
}

/// Plain vectors act as handles; handy for headless runs and tests
impl VisualHandle for NVec3 {
    fn set_translation(&mut self, position: &NVec3) {
        *self = *position;
    }
}

/// Per-species pools of addressable visual handles
#[derive(Debug, Clone)]
pub struct HandlePools<H> {
    pub neutrons: Vec<H>,
    pub protons: Vec<H>,
    pub electrons: Vec<H>,
}

impl<H> Default for HandlePools<H> {
    fn default() -> Self {
        Self {
            neutrons: Vec::new(),
            protons: Vec::new(),
            electrons: Vec::new(),
        }
    }
}

impl<H> HandlePools<H> {
    pub fn pool(&self, species: Species) -> &[H] {
        match species {
            Species::Neutron => &self.neutrons,
            Species::Proton => &self.protons,
            Species::Electron => &self.electrons,
        }
    }

    pub fn pool_mut(&mut self, species: Species) -> &mut Vec<H> {
        match species {
            Species::Neutron => &mut self.neutrons,
            Species::Proton => &mut self.protons,
            Species::Electron => &mut self.electrons,
        }
    }
}

impl HandlePools<NVec3> {
    /// Pools sized for `ensemble`, seeded with its current positions
    pub fn mirroring(ensemble: &ParticleEnsemble) -> Self {
        let positions = SpeciesPositions::from_ensemble(ensemble);
        Self {
            neutrons: positions.neutrons.to_vec(),
            protons: positions.protons.to_vec(),
            electrons: positions.electrons.to_vec(),
        }
    }
}

impl<H: VisualHandle> VisualSyncBridge for HandlePools<H> {
    fn sync(&mut self, positions: SpeciesPositions<'_>) -> Result<()> {
        for species in Species::ALL {
            let (n, handles) = (positions.get(species).len(), self.pool(species).len());
            if n != handles {
                return Err(SimError::SyncLengthMismatch {
                    species,
                    positions: n,
                    handles,
                });
            }
        }

        for species in Species::ALL {
            for (handle, r) in self.pool_mut(species).iter_mut().zip(positions.get(species)) {
                handle.set_translation(r);
            }
        }
        Ok(())
    }
}
