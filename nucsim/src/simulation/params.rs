//! Kernel parameters shared with the compute backend
//!
//! `KernelConfig` holds the immutable run settings:
//! - work-group size and integration sub-steps per update,
//! - timestep `dt` with its cached `1/dt` and `dt/2`,
//! - the constant external magnetic field
//!
//! It also renders the parameter header consumed by a native kernel, in the
//! two literal dialects the device and host compilers expect.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SimError};
use crate::simulation::states::NVec3;

pub const DEVICE_HEADER: &str = "kernel.h";
pub const HOST_HEADER: &str = "host.h";

#[derive(Debug, Clone, PartialEq)]
pub struct KernelConfig {
    work_group_size: usize, // compute parallelism width
    dt: f64, // iteration delta-time
    inv_dt: f64, // 1/dt
    half_dt: f64, // dt/2
    magnetic_field: NVec3, // external field, constant for the run
    kernel_iterations: u32, // sub-steps per visible update
}

impl KernelConfig {
    pub fn new(
        work_group_size: usize,
        dt: f64,
        magnetic_field: NVec3,
        kernel_iterations: u32,
    ) -> Result<Self> {
        if work_group_size == 0 {
            return Err(SimError::config("work_group_size must be positive"));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::config(format!("dt must be positive and finite, got {dt}")));
        }
        if magnetic_field.iter().any(|b| !b.is_finite()) {
            return Err(SimError::config("magnetic field components must be finite"));
        }

        Ok(Self {
            work_group_size,
            dt,
            inv_dt: 1.0 / dt,
            half_dt: dt / 2.0,
            magnetic_field,
            kernel_iterations,
        })
    }

    pub fn work_group_size(&self) -> usize {
        self.work_group_size
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn inv_dt(&self) -> f64 {
        self.inv_dt
    }

    pub fn half_dt(&self) -> f64 {
        self.half_dt
    }

    pub fn magnetic_field(&self) -> NVec3 {
        self.magnetic_field
    }

    /// Field padded to four lanes for the kernel's vector width
    pub fn magnetic_field4(&self) -> [f64; 4] {
        let b = self.magnetic_field;
        [b.x, b.y, b.z, 0.0]
    }

    pub fn kernel_iterations(&self) -> u32 {
        self.kernel_iterations
    }

    /// Render the parameter header in the given literal dialect
    pub fn header(&self, dialect: HeaderDialect) -> String {
        let [bx, by, bz, _] = self.magnetic_field4();
        let field = match dialect {
            HeaderDialect::Device => format!("static const v3r B=(v3r)({bx:?},{by:?},{bz:?},0);"),
            HeaderDialect::Host => format!("static const v3r B ={{{{{bx:?},{by:?},{bz:?},0}}}};"),
        };

        let mut out = String::new();
        out.push_str(&format!("#define ln {} // work group size\n", self.work_group_size));
        out.push_str(&format!("#define dt {:?} // iteration delta-time\n", self.dt));
        out.push_str(&format!("#define td {:?} // 1/dt\n", self.inv_dt));
        out.push_str(&format!("#define dt2 {:?} // dt/2\n", self.half_dt));
        out.push_str(&field);
        out.push_str(" // external magnetic field\n");
        out
    }

    /// Write `kernel.h` and `host.h` into `dir`, returning their paths
    pub fn write_headers(&self, dir: &Path) -> Result<[PathBuf; 2]> {
        fs::create_dir_all(dir)?;
        let device = dir.join(DEVICE_HEADER);
        let host = dir.join(HOST_HEADER);

        debug!(path = %device.display(), "generating kernel header");
        fs::write(&device, self.header(HeaderDialect::Device))?;
        debug!(path = %host.display(), "generating host header");
        fs::write(&host, self.header(HeaderDialect::Host))?;

        Ok([device, host])
    }
}

/// Literal syntax for the constant field vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDialect {
    /// Accelerator kernel source: `(v3r)(x,y,z,w)`
    Device,
    /// Host C source: `{{x,y,z,w}}`
    Host,
}
