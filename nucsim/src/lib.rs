pub mod error;
pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod benchmark;

pub use error::{Result, SimError};

pub use simulation::states::{NVec3, ParticleEnsemble, Species, SpeciesCounts, padded_count};
pub use simulation::params::{HeaderDialect, KernelConfig};
pub use simulation::kernel::{DeviceKernel, EmulatedDevice, HostKernel, ReferenceKernel};
pub use simulation::backend::{BackendKind, ComputeBackend, ResidentState, StatelessTransfer};
pub use simulation::scenario::{PaddingPlacement, Recipe, Scenario, ScenarioBuilder};
pub use simulation::engine::{EnginePhase, SimulationEngine};

pub use configuration::config::{EngineConfig, ParametersConfig, RecipeConfig, ScenarioConfig, SpeciesConfig};

pub use visualization::sync::{HandlePools, SpeciesPositions, VisualHandle, VisualSyncBridge};
#[cfg(feature = "visualization")]
pub use visualization::viewer::run_viewer;

pub use benchmark::benchmark::{bench_backends, BackendTiming};
