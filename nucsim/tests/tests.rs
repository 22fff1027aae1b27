use approx::assert_relative_eq;
use proptest::prelude::*;

use nucsim::{
    padded_count, BackendKind, ComputeBackend, EnginePhase, HandlePools, HeaderDialect, KernelConfig, NVec3,
    ParticleEnsemble, Recipe, Scenario, ScenarioBuilder, ScenarioConfig, SimError, SimulationEngine, Species,
    SpeciesCounts, SpeciesPositions, VisualSyncBridge,
};

/// Default kernel parameters for tests
pub fn test_config(work_group_size: usize, kernel_iterations: u32) -> KernelConfig {
    KernelConfig::new(work_group_size, 0.01, NVec3::new(0.0, 0.0, 0.5), kernel_iterations).unwrap()
}

/// Seeded builder so failures can be replayed
pub fn builder(nn: usize, np: usize, ne: usize, recipe: Recipe) -> ScenarioBuilder {
    ScenarioBuilder::new(SpeciesCounts::new(nn, np, ne), recipe).with_seed(1234)
}

/// Bridge that keeps a copy of every push
#[derive(Default)]
pub struct RecordingBridge {
    pub pushes: Vec<[Vec<NVec3>; 3]>,
}

impl VisualSyncBridge for RecordingBridge {
    fn sync(&mut self, positions: SpeciesPositions<'_>) -> nucsim::Result<()> {
        self.pushes.push([
            positions.neutrons.to_vec(),
            positions.protons.to_vec(),
            positions.electrons.to_vec(),
        ]);
        Ok(())
    }
}

/// Moves every slot by (i, 0, 0) per step; never touches anything else
pub struct ShiftBackend;

impl ComputeBackend for ShiftBackend {
    fn advance(&mut self, ensemble: &mut ParticleEnsemble, _config: &KernelConfig, steps: u32) -> nucsim::Result<()> {
        for (i, r) in ensemble.position.iter_mut().enumerate() {
            r.x += (i as f64) * steps as f64;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "shift"
    }
}

/// Fails every call
pub struct FailingBackend;

impl ComputeBackend for FailingBackend {
    fn advance(&mut self, _ensemble: &mut ParticleEnsemble, _config: &KernelConfig, _steps: u32) -> nucsim::Result<()> {
        Err(SimError::backend_step("integration diverged"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

// ==================================================================================
// Ensemble layout tests
// ==================================================================================

#[test]
fn two_of_each_pads_to_eight() {
    let e = builder(2, 2, 2, Recipe::scatter()).build(4).unwrap();

    assert_eq!(e.raw_count(), 6);
    assert_eq!(e.padded_count(), 8);
    assert_eq!(e.padding_range(), 6..8);
    assert_eq!(e.mass[6], 0.0);
    assert_eq!(e.mass[7], 0.0);
}

#[test]
fn species_ranges_carry_their_constants() {
    let e = builder(3, 4, 5, Recipe::scatter()).build(8).unwrap();

    for i in 0..3 {
        assert_eq!((e.baryon_flag[i], e.electric_charge[i]), (1, 0));
        assert_relative_eq!(e.mass[i], 939.565);
    }
    for i in 3..7 {
        assert_eq!((e.baryon_flag[i], e.electric_charge[i]), (1, 1));
        assert_relative_eq!(e.mass[i], 938.272);
    }
    for i in 7..12 {
        assert_eq!((e.baryon_flag[i], e.electric_charge[i]), (0, -1));
        assert_relative_eq!(e.mass[i], 0.511);
    }
    for i in 12..e.padded_count() {
        assert_eq!(e.mass[i], 0.0);
        assert_eq!(e.electric_charge[i], 0);
        assert_eq!(e.baryon_flag[i], 0);
    }
}

proptest! {
    #[test]
    fn padded_count_is_aligned_with_spare_slot(
        nn in 0usize..300,
        np in 0usize..300,
        ne in 0usize..300,
        wg in 1usize..128,
    ) {
        let n = padded_count(nn + np + ne, wg).unwrap();
        prop_assert_eq!(n % wg, 0);
        prop_assert!(n >= nn + np + ne + 1);
        prop_assert!(n <= nn + np + ne + wg);
    }
}

#[test]
fn zero_work_group_is_an_invalid_scenario() {
    let err = builder(1, 1, 1, Recipe::scatter()).build(0);
    assert!(matches!(err, Err(SimError::InvalidScenario(_))));
}

// ==================================================================================
// Recipe tests
// ==================================================================================

#[test]
fn scatter_stays_inside_the_box_and_at_rest() {
    let e = builder(50, 40, 30, Recipe::scatter()).build(64).unwrap();

    for (r, v) in e.position.iter().zip(e.velocity.iter()) {
        assert!(r.x >= -50.0 && r.x <= 50.0, "x out of bounds: {}", r.x);
        assert!(r.y >= -50.0 && r.y <= 50.0, "y out of bounds: {}", r.y);
        assert!(r.z >= -5.0 && r.z <= 5.0, "z out of bounds: {}", r.z);
        assert_eq!(*v, NVec3::zeros());
    }
}

#[test]
fn counter_stream_splits_at_the_neutron_boundary() {
    let nn = 20;
    let e = builder(nn, 15, 10, Recipe::counter_stream()).build(16).unwrap();

    for i in 0..e.padded_count() {
        let (r, v) = (e.position[i], e.velocity[i]);
        assert!(r.y >= -10.0 && r.y <= 10.0);
        assert!(r.z >= -10.0 && r.z <= 10.0);
        if i < nn {
            assert_eq!(v, NVec3::new(1.0, 0.0, 0.0));
            assert!(r.x >= -80.0 && r.x <= -40.0, "neutron {i} at x = {}", r.x);
        } else {
            // padding rides along with the second cluster
            assert_eq!(v, NVec3::new(-1.0, 0.0, 0.0));
            assert!(r.x >= 40.0 && r.x <= 80.0, "slot {i} at x = {}", r.x);
        }
    }
}

// ==================================================================================
// Engine tests
// ==================================================================================

#[test]
fn step_pushes_species_in_ensemble_order() {
    let b = builder(2, 3, 1, Recipe::scatter());
    let mut engine = SimulationEngine::with_backend(&b, test_config(4, 2), |_, _| Ok(Box::new(ShiftBackend))).unwrap();
    let before = engine.ensemble().position.clone();

    let mut bridge = RecordingBridge::default();
    engine.step(&mut bridge).unwrap();

    assert_eq!(bridge.pushes.len(), 1);
    let [neutrons, protons, electrons] = &bridge.pushes[0];
    assert_eq!((neutrons.len(), protons.len(), electrons.len()), (2, 3, 1));

    let all: Vec<NVec3> = neutrons.iter().chain(protons).chain(electrons).copied().collect();
    for (i, r) in all.iter().enumerate() {
        assert_eq!(r.x, before[i].x + 2.0 * i as f64);
        assert_eq!(*r, engine.ensemble().position[i]);
    }
}

#[test]
fn engine_moves_from_initialized_to_running() {
    let b = builder(1, 1, 1, Recipe::scatter());
    let mut engine = SimulationEngine::initialize(&b, test_config(4, 1), BackendKind::StatelessTransfer).unwrap();
    assert_eq!(engine.phase(), EnginePhase::Initialized);

    let mut pools = HandlePools::mirroring(engine.ensemble());
    engine.step(&mut pools).unwrap();
    engine.step(&mut pools).unwrap();

    assert_eq!(engine.phase(), EnginePhase::Running);
    assert_eq!(engine.frames(), 2);
    assert_eq!(engine.iterations(), 2);
}

#[test]
fn zero_iterations_leave_positions_alone() {
    for kind in [BackendKind::ResidentState, BackendKind::StatelessTransfer] {
        let b = builder(10, 10, 10, Recipe::counter_stream());
        let mut engine = SimulationEngine::initialize(&b, test_config(8, 0), kind).unwrap();
        let before = engine.ensemble().position.clone();

        let mut pools = HandlePools::mirroring(engine.ensemble());
        engine.step(&mut pools).unwrap();

        assert_eq!(engine.ensemble().position, before, "{kind:?} moved particles");
    }
}

#[test]
fn both_backends_agree_on_positions() {
    let b = builder(8, 8, 8, Recipe::counter_stream());
    let mut resident = SimulationEngine::initialize(&b, test_config(8, 5), BackendKind::ResidentState).unwrap();
    let mut stateless = SimulationEngine::initialize(&b, test_config(8, 5), BackendKind::StatelessTransfer).unwrap();

    let mut pools_r = HandlePools::mirroring(resident.ensemble());
    let mut pools_s = HandlePools::mirroring(stateless.ensemble());
    for _ in 0..3 {
        resident.step(&mut pools_r).unwrap();
        stateless.step(&mut pools_s).unwrap();
    }

    assert_eq!(resident.ensemble().position, stateless.ensemble().position);
    for species in Species::ALL {
        assert_eq!(pools_r.pool(species), pools_s.pool(species));
    }
}

#[test]
fn resident_backend_leaves_host_velocity_stale() {
    let b = builder(4, 4, 4, Recipe::counter_stream());
    let mut engine = SimulationEngine::initialize(&b, test_config(4, 3), BackendKind::ResidentState).unwrap();
    let initial_velocity = engine.ensemble().velocity.clone();
    let initial_position = engine.ensemble().position.clone();

    let mut pools = HandlePools::mirroring(engine.ensemble());
    engine.step(&mut pools).unwrap();

    assert_eq!(engine.ensemble().velocity, initial_velocity);
    assert_ne!(engine.ensemble().position, initial_position);
}

#[test]
fn backend_failure_propagates_without_sync() {
    let b = builder(1, 1, 1, Recipe::scatter());
    let mut engine = SimulationEngine::with_backend(&b, test_config(4, 1), |_, _| Ok(Box::new(FailingBackend))).unwrap();

    let mut bridge = RecordingBridge::default();
    let err = engine.step(&mut bridge).unwrap_err();

    assert!(matches!(err, SimError::BackendStep(_)));
    assert!(bridge.pushes.is_empty());
    assert_eq!(engine.phase(), EnginePhase::Initialized);
}

#[test]
fn mismatched_pool_is_reported() {
    let b = builder(2, 2, 2, Recipe::scatter());
    let mut engine = SimulationEngine::initialize(&b, test_config(4, 1), BackendKind::StatelessTransfer).unwrap();

    let mut pools = HandlePools::mirroring(engine.ensemble());
    pools.protons.pop();

    let err = engine.step(&mut pools).unwrap_err();
    assert!(matches!(
        err,
        SimError::SyncLengthMismatch { species: Species::Proton, positions: 2, handles: 1 }
    ));
}

// ==================================================================================
// Configuration tests
// ==================================================================================

const SCENARIO_YAML: &str = r#"
engine:
  device: "cpu"
  work_group_size: 4
  kernel_iterations: 2
parameters:
  dt: 0.02
  magnetic_field: [0.0, 0.0, 1.0]
  seed: 9
species:
  neutrons: 2
  protons: 2
  electrons: 2
recipe:
  kind: "counter-stream"
  padding: "at-rest"
"#;

#[test]
fn yaml_scenario_maps_to_runtime_types() {
    let cfg = ScenarioConfig::from_yaml_str(SCENARIO_YAML).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();

    assert_eq!(scenario.backend, BackendKind::StatelessTransfer);
    assert_eq!(scenario.config.work_group_size(), 4);
    assert_eq!(scenario.config.kernel_iterations(), 2);
    assert_relative_eq!(scenario.config.inv_dt(), 50.0);

    let e = scenario.builder.build(scenario.config.work_group_size()).unwrap();
    assert_eq!(e.padded_count(), 8);
    assert_eq!(e.velocity[6], NVec3::zeros());
}

#[test]
fn negative_species_count_is_an_invalid_scenario() {
    let yaml = SCENARIO_YAML.replace("electrons: 2", "electrons: -1");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    assert!(matches!(Scenario::build_scenario(cfg), Err(SimError::InvalidScenario(_))));
}

#[test]
fn overflowing_species_counts_are_an_invalid_scenario() {
    let yaml = SCENARIO_YAML
        .replace("neutrons: 2", "neutrons: 9223372036854775807")
        .replace("protons: 2", "protons: 9223372036854775807")
        .replace("electrons: 2", "electrons: 9223372036854775807");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();
    let err = scenario.builder.build(scenario.config.work_group_size());
    assert!(matches!(err, Err(SimError::InvalidScenario(_))));
}

#[test]
fn zero_timestep_is_an_invalid_config() {
    let yaml = SCENARIO_YAML.replace("dt: 0.02", "dt: 0.0");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    assert!(matches!(Scenario::build_scenario(cfg), Err(SimError::InvalidConfig(_))));
}

#[test]
fn header_dialects_encode_the_same_numbers() {
    let cfg = KernelConfig::new(64, 0.03, NVec3::new(0.1, -0.2, 0.3), 10).unwrap();
    let device = cfg.header(HeaderDialect::Device);
    let host = cfg.header(HeaderDialect::Host);

    // the vector type name carries a digit of its own
    let numbers = |s: &str| -> Vec<f64> {
        s.replace("v3r", "")
            .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == 'e'))
            .filter_map(|t| t.parse().ok())
            .collect()
    };
    assert_eq!(numbers(&device), numbers(&host));
    assert!(device.contains(&format!("#define td {:?}", 1.0 / 0.03)));
    assert!(device.contains(&format!("#define dt2 {:?}", 0.03 / 2.0)));
}

#[test]
fn headers_are_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(32, 1);

    let [device, host] = cfg.write_headers(dir.path()).unwrap();

    assert_eq!(std::fs::read_to_string(device).unwrap(), cfg.header(HeaderDialect::Device));
    assert_eq!(std::fs::read_to_string(host).unwrap(), cfg.header(HeaderDialect::Host));
}

#[test]
fn bundled_scenarios_parse() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["scatter.yaml", "counter_stream.yaml"] {
        let cfg = ScenarioConfig::from_path(&dir.join(name)).unwrap();
        Scenario::build_scenario(cfg).unwrap();
    }
}

// ==================================================================================
// Benchmark smoke test
// ==================================================================================

#[test]
fn bench_reports_one_timing_per_size() {
    let timings = nucsim::bench_backends(&[8, 20], &test_config(8, 1), 1).unwrap();

    assert_eq!(timings.len(), 2);
    assert_eq!(timings[0].slots, 16);
    assert_eq!(timings[1].slots, 24);
    assert!(timings.iter().all(|t| t.resident_s >= 0.0 && t.stateless_s >= 0.0));
}
