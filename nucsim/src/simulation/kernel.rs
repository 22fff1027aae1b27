//! Native compute kernel interface
//!
//! The physics lives behind two narrow interfaces, one per calling convention:
//! - [`DeviceKernel`]: state uploaded once, iterations launched in place, positions read back
//! - [`HostKernel`]: every array passed by reference on each update and mutated in place
//!
//! [`ReferenceKernel`] is the host-side implementation and [`EmulatedDevice`]
//! keeps its own device-side buffers, so both conventions run the same
//! force law: a pairwise electric term beyond unit distance, a short-range
//! strong term between baryons, and the Lorentz term of the constant field.

use crate::error::{Result, SimError};
use crate::simulation::params::KernelConfig;
use crate::simulation::states::{EnsembleArrays, EnsembleArraysMut, NVec3};

const STRONG_COUPLING: f64 = 200.0;
const STRONG_MIN: f64 = 0.5;
const STRONG_MAX: f64 = 1.5;
const ELECTRIC_MIN: f64 = 1.0;

/// Accelerator-style kernel: authoritative state lives on the device
pub trait DeviceKernel {
    /// Upload the full ensemble; `n` must be a multiple of `work_group_size`
    fn init(&mut self, n: usize, work_group_size: usize, arrays: EnsembleArrays<'_>) -> Result<()>;

    /// Run one iteration on device-resident state
    fn launch(&mut self) -> Result<()>;

    /// Blocking read of device positions into `position`
    fn read_positions(&mut self, position: &mut [NVec3]) -> Result<()>;
}

/// Host-style kernel: state stays in caller memory
pub trait HostKernel {
    /// Check the ensemble shape and size any scratch space; nothing is retained
    fn init(&mut self, n: usize, work_group_size: usize, arrays: EnsembleArrays<'_>) -> Result<()>;

    /// Advance `n` slots by one iteration, mutating position and velocity in place
    fn update(&mut self, n: usize, arrays: EnsembleArraysMut<'_>) -> Result<()>;
}

/// Reference implementation of the force law and integration step
#[derive(Debug, Clone)]
pub struct ReferenceKernel {
    dt: f64,
    half_dt: f64,
    field: NVec3,
    accel: Vec<NVec3>, // scratch, one entry per slot
}

impl ReferenceKernel {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            dt: config.dt(),
            half_dt: config.half_dt(),
            field: config.magnetic_field(),
            accel: Vec::new(),
        }
    }

    /// Compute accelerations for every massive slot, then move them.
    /// Zero-mass padding is neither pushed nor moved.
    fn integrate(
        &mut self,
        position: &mut [NVec3],
        velocity: &mut [NVec3],
        mass: &[f64],
        qe: &[i32],
        qn: &[i32],
    ) -> Result<()> {
        let n = position.len();
        self.accel.clear();
        self.accel.resize(n, NVec3::zeros());

        for j in 0..n {
            if mass[j] <= 0.0 {
                continue;
            }
            let r0 = position[j];
            let qe0 = qe[j] as f64;
            let qn0 = qn[j] as f64;
            let mut f = NVec3::zeros();

            for i in 0..n {
                let dr = position[i] - r0;
                let d2 = dr.dot(&dr);
                if d2 <= 0.0 {
                    continue; // self, or a coincident slot
                }
                let d = d2.sqrt();
                let d1_2 = d2.recip();
                let d1_3 = d1_2 / d;

                let mut fs = 0.0;
                if d > ELECTRIC_MIN {
                    fs -= qe0 * qe[i] as f64 * d1_3; // like charges repel
                }
                if d > STRONG_MIN && d < STRONG_MAX {
                    fs += STRONG_COUPLING * qn0 * qn[i] as f64 * (d1_3 - d1_2 * d1_3);
                }
                f += dr * fs;
            }

            // Lorentz term: q v x B
            f += qe0 * velocity[j].cross(&self.field);

            self.accel[j] = f / mass[j];
        }

        for j in 0..n {
            if mass[j] <= 0.0 {
                continue;
            }
            let a = self.accel[j];
            position[j] += self.dt * (velocity[j] + self.half_dt * a);
            velocity[j] += self.dt * a;

            if !(position[j].iter().all(|x| x.is_finite()) && velocity[j].iter().all(|x| x.is_finite())) {
                return Err(SimError::backend_step(format!("non-finite state at slot {j}")));
            }
        }
        Ok(())
    }
}

impl HostKernel for ReferenceKernel {
    fn init(&mut self, n: usize, work_group_size: usize, arrays: EnsembleArrays<'_>) -> Result<()> {
        check_upload(n, work_group_size, arrays)?;
        self.accel.clear();
        self.accel.resize(n, NVec3::zeros());
        Ok(())
    }

    fn update(&mut self, n: usize, arrays: EnsembleArraysMut<'_>) -> Result<()> {
        let EnsembleArraysMut {
            position,
            velocity,
            mass,
            electric_charge,
            baryon_flag,
        } = arrays;
        check_lengths(n, [position.len(), velocity.len(), mass.len(), electric_charge.len(), baryon_flag.len()])
            .map_err(SimError::backend_step)?;
        self.integrate(position, velocity, mass, electric_charge, baryon_flag)
    }
}

/// Device-model kernel holding private copies of the uploaded arrays
#[derive(Debug, Clone)]
pub struct EmulatedDevice {
    kernel: ReferenceKernel,
    buffers: Option<DeviceBuffers>,
}

#[derive(Debug, Clone)]
struct DeviceBuffers {
    position: Vec<NVec3>,
    velocity: Vec<NVec3>,
    mass: Vec<f64>,
    electric_charge: Vec<i32>,
    baryon_flag: Vec<i32>,
}

impl EmulatedDevice {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            kernel: ReferenceKernel::new(config),
            buffers: None,
        }
    }

    fn buffers_mut(&mut self) -> Result<&mut DeviceBuffers> {
        self.buffers
            .as_mut()
            .ok_or_else(|| SimError::backend_step("device used before init"))
    }
}

impl DeviceKernel for EmulatedDevice {
    fn init(&mut self, n: usize, work_group_size: usize, arrays: EnsembleArrays<'_>) -> Result<()> {
        if self.buffers.is_some() {
            return Err(SimError::backend_init("device already initialized"));
        }
        self.kernel.init(n, work_group_size, arrays)?;

        self.buffers = Some(DeviceBuffers {
            position: arrays.position.to_vec(),
            velocity: arrays.velocity.to_vec(),
            mass: arrays.mass.to_vec(),
            electric_charge: arrays.electric_charge.to_vec(),
            baryon_flag: arrays.baryon_flag.to_vec(),
        });
        Ok(())
    }

    fn launch(&mut self) -> Result<()> {
        let buffers = self
            .buffers
            .as_mut()
            .ok_or_else(|| SimError::backend_step("device used before init"))?;
        self.kernel.integrate(
            &mut buffers.position,
            &mut buffers.velocity,
            &buffers.mass,
            &buffers.electric_charge,
            &buffers.baryon_flag,
        )
    }

    fn read_positions(&mut self, position: &mut [NVec3]) -> Result<()> {
        let buffers = self.buffers_mut()?;
        if position.len() != buffers.position.len() {
            return Err(SimError::backend_step(format!(
                "readback target holds {} slots, device holds {}",
                position.len(),
                buffers.position.len()
            )));
        }
        position.copy_from_slice(&buffers.position);
        Ok(())
    }
}

fn check_upload(n: usize, work_group_size: usize, arrays: EnsembleArrays<'_>) -> Result<()> {
    if work_group_size == 0 || n % work_group_size != 0 {
        return Err(SimError::backend_init(format!(
            "global size {n} is not a multiple of work-group size {work_group_size}"
        )));
    }
    check_lengths(
        n,
        [
            arrays.position.len(),
            arrays.velocity.len(),
            arrays.mass.len(),
            arrays.electric_charge.len(),
            arrays.baryon_flag.len(),
        ],
    )
    .map_err(SimError::backend_init)
}

fn check_lengths(n: usize, lens: [usize; 5]) -> std::result::Result<(), String> {
    match lens.iter().find(|&&len| len != n) {
        Some(len) => Err(format!("array of length {len} passed for {n} slots")),
        None => Ok(()),
    }
}
