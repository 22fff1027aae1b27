//! Core state types for the nucleon simulation.
//!
//! Defines the particle ensemble as index-aligned parallel arrays:
//! - `position` / `velocity` using `NVec3`
//! - `mass`, `electric_charge`, `baryon_flag` per slot
//!
//! Arrays are padded up to a multiple of the kernel work-group size and
//! partitioned by species: neutrons, then protons, then electrons, then padding.

use std::mem::size_of;
use std::ops::Range;

use nalgebra::Vector3;
use crate::error::{Result, SimError};

pub type NVec3 = Vector3<f64>;

pub const NEUTRON_MASS: f64 = 939.565; // MeV
pub const PROTON_MASS: f64 = 938.272; // MeV
pub const ELECTRON_MASS: f64 = 0.511; // MeV

/// Particle species, in the order they are laid out in the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Neutron,
    Proton,
    Electron,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Neutron, Species::Proton, Species::Electron];

    pub fn mass(self) -> f64 {
        match self {
            Species::Neutron => NEUTRON_MASS,
            Species::Proton => PROTON_MASS,
            Species::Electron => ELECTRON_MASS,
        }
    }

    /// Signed unit electric charge
    pub fn electric_charge(self) -> i32 {
        match self {
            Species::Neutron => 0,
            Species::Proton => 1,
            Species::Electron => -1,
        }
    }

    /// 1 for baryons (neutron, proton), 0 otherwise
    pub fn baryon_flag(self) -> i32 {
        match self {
            Species::Neutron | Species::Proton => 1,
            Species::Electron => 0,
        }
    }
}

/// Requested number of particles of each species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeciesCounts {
    pub neutrons: usize,
    pub protons: usize,
    pub electrons: usize,
}

impl SpeciesCounts {
    pub fn new(neutrons: usize, protons: usize, electrons: usize) -> Self {
        Self { neutrons, protons, electrons }
    }

    /// Build from signed counts as they arrive from a scenario file
    pub fn from_signed(neutrons: i64, protons: i64, electrons: i64) -> Result<Self> {
        let check = |species: &str, n: i64| {
            usize::try_from(n)
                .map_err(|_| SimError::scenario(format!("{species} count must be non-negative, got {n}")))
        };
        Ok(Self {
            neutrons: check("neutron", neutrons)?,
            protons: check("proton", protons)?,
            electrons: check("electron", electrons)?,
        })
    }

    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Neutron => self.neutrons,
            Species::Proton => self.protons,
            Species::Electron => self.electrons,
        }
    }

    /// Sum of all species, without padding
    pub fn raw_count(&self) -> usize {
        self.neutrons.saturating_add(self.protons).saturating_add(self.electrons)
    }

    /// Sum of all species, failing when it does not fit in `usize`
    pub fn checked_raw_count(&self) -> Result<usize> {
        self.neutrons
            .checked_add(self.protons)
            .and_then(|n| n.checked_add(self.electrons))
            .ok_or_else(|| SimError::scenario(format!("particle count overflows: {self:?}")))
    }

    /// Index range occupied by `species` in the ensemble arrays
    pub fn range(&self, species: Species) -> Range<usize> {
        let nn = self.neutrons;
        let np = nn.saturating_add(self.protons);
        match species {
            Species::Neutron => 0..nn,
            Species::Proton => nn..np,
            Species::Electron => np..self.raw_count(),
        }
    }
}

/// Array length for `raw_count` particles at `work_group_size` alignment.
///
/// Always leaves at least one padding slot, even when `raw_count` is already
/// a multiple of the work-group size.
pub fn padded_count(raw_count: usize, work_group_size: usize) -> Result<usize> {
    if work_group_size == 0 {
        return Err(SimError::scenario("work_group_size must be positive"));
    }
    let groups = raw_count / work_group_size;
    groups
        .checked_mul(work_group_size)
        .and_then(|n| n.checked_add(work_group_size))
        .ok_or_else(|| SimError::scenario(format!("{raw_count} particles cannot be padded to {work_group_size}")))
}

/// Complete parallel-array state of every slot, padding included
#[derive(Debug, Clone)]
pub struct ParticleEnsemble {
    counts: SpeciesCounts,
    pub position: Vec<NVec3>, // slot positions
    pub velocity: Vec<NVec3>, // slot velocities, stale on the host once a resident backend owns them
    pub mass: Vec<f64>, // 0 for padding
    pub electric_charge: Vec<i32>, // -1 / 0 / +1
    pub baryon_flag: Vec<i32>, // 1 for neutrons and protons
}

impl ParticleEnsemble {
    /// Allocate padded arrays and fill species constants.
    /// Positions and velocities start at zero; a recipe fills them in.
    pub fn new(counts: SpeciesCounts, work_group_size: usize) -> Result<Self> {
        let n = padded_count(counts.checked_raw_count()?, work_group_size)?;
        if n.checked_mul(size_of::<NVec3>()).map_or(true, |bytes| bytes > isize::MAX as usize) {
            return Err(SimError::scenario(format!("{n} slots do not fit in memory")));
        }

        let mut mass = vec![0.0; n];
        let mut electric_charge = vec![0; n];
        let mut baryon_flag = vec![0; n];

        for species in Species::ALL {
            for i in counts.range(species) {
                mass[i] = species.mass();
                electric_charge[i] = species.electric_charge();
                baryon_flag[i] = species.baryon_flag();
            }
        }

        Ok(Self {
            counts,
            position: vec![NVec3::zeros(); n],
            velocity: vec![NVec3::zeros(); n],
            mass,
            electric_charge,
            baryon_flag,
        })
    }

    pub fn counts(&self) -> SpeciesCounts {
        self.counts
    }

    pub fn raw_count(&self) -> usize {
        self.counts.raw_count()
    }

    /// Length of every parallel array
    pub fn padded_count(&self) -> usize {
        self.position.len()
    }

    pub fn padding_range(&self) -> Range<usize> {
        self.raw_count()..self.padded_count()
    }

    pub fn species_range(&self, species: Species) -> Range<usize> {
        self.counts.range(species)
    }

    /// Positions of one species, in ensemble order
    pub fn positions_of(&self, species: Species) -> &[NVec3] {
        &self.position[self.species_range(species)]
    }

    /// Species occupying slot `i`, or `None` for padding
    pub fn species_at(&self, i: usize) -> Option<Species> {
        Species::ALL
            .into_iter()
            .find(|&s| self.species_range(s).contains(&i))
    }

    /// Borrow all five arrays at once, as handed to a kernel
    pub fn arrays_mut(&mut self) -> EnsembleArraysMut<'_> {
        EnsembleArraysMut {
            position: &mut self.position,
            velocity: &mut self.velocity,
            mass: &self.mass,
            electric_charge: &self.electric_charge,
            baryon_flag: &self.baryon_flag,
        }
    }

    pub fn arrays(&self) -> EnsembleArrays<'_> {
        EnsembleArrays {
            position: &self.position,
            velocity: &self.velocity,
            mass: &self.mass,
            electric_charge: &self.electric_charge,
            baryon_flag: &self.baryon_flag,
        }
    }
}

/// Read-only view of the five parallel arrays (initial upload)
#[derive(Debug, Clone, Copy)]
pub struct EnsembleArrays<'a> {
    pub position: &'a [NVec3],
    pub velocity: &'a [NVec3],
    pub mass: &'a [f64],
    pub electric_charge: &'a [i32],
    pub baryon_flag: &'a [i32],
}

/// Mutable view of the five parallel arrays; constants stay read-only
#[derive(Debug)]
pub struct EnsembleArraysMut<'a> {
    pub position: &'a mut [NVec3],
    pub velocity: &'a mut [NVec3],
    pub mass: &'a [f64],
    pub electric_charge: &'a [i32],
    pub baryon_flag: &'a [i32],
}
