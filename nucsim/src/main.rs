use nucsim::{bench_backends, BackendKind, HandlePools, Scenario, ScenarioConfig, SimulationEngine, Species};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Interacting nucleons in a uniform magnetic field")]
struct Args {
    /// Scenario file; bare names are looked up in the crate's scenarios/ directory
    #[arg(short, default_value = "scatter.yaml")]
    file_name: String,

    /// Override the scenario's device (gpu | cpu)
    #[arg(long)]
    device: Option<BackendKind>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 100)]
    frames: u64,

    /// Time both backends instead of running the scenario
    #[arg(long)]
    bench: bool,
}

fn scenario_path(file_name: &str) -> PathBuf {
    let direct = PathBuf::from(file_name);
    if direct.exists() {
        return direct;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

// load here to keep main clean
fn load_scenario(args: &Args) -> Result<Scenario> {
    let path = scenario_path(&args.file_name);
    let cfg = ScenarioConfig::from_path(&path).with_context(|| format!("loading {}", path.display()))?;
    let mut scenario = Scenario::build_scenario(cfg)?;
    if let Some(device) = args.device {
        scenario.backend = device;
    }
    Ok(scenario)
}

fn run_headless(mut engine: SimulationEngine, frames: u64) -> Result<()> {
    let mut pools = HandlePools::mirroring(engine.ensemble());
    engine.run(frames, 10, &mut pools)?;

    for species in Species::ALL {
        let pool = pools.pool(species);
        if pool.is_empty() {
            continue;
        }
        let centroid = pool.iter().sum::<nucsim::NVec3>() / pool.len() as f64;
        info!(?species, count = pool.len(), x = centroid.x, y = centroid.y, z = centroid.z, "centroid");
    }
    info!(frames = engine.frames(), iterations = engine.iterations(), "done");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let scenario = load_scenario(&args)?;

    if args.bench {
        bench_backends(&[256, 512, 1024, 2048], &scenario.config, 10)?;
        return Ok(());
    }

    let engine = SimulationEngine::from_scenario(&scenario)?;

    #[cfg(feature = "visualization")]
    if !args.headless {
        nucsim::run_viewer(engine);
        return Ok(());
    }

    #[cfg(not(feature = "visualization"))]
    if !args.headless {
        info!("built without the viewer, running headless");
    }

    run_headless(engine, args.frames)
}
