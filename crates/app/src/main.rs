use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use orbweaver_core::{EngineConfig, Recorder, ScenarioDescriptor, TraceEvent, World};
use tracing_subscriber::EnvFilter;

fn main() -> orbweaver_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            config,
            duration,
        } => {
            let scenario = ScenarioDescriptor::load(&scenario)?;
            run_scenario(&scenario, config.as_deref(), duration)
        }
        Commands::Demo { config, duration } => {
            run_scenario(&ScenarioDescriptor::gate_demo(), config.as_deref(), duration)
        }
    }
}

fn run_scenario(
    scenario: &ScenarioDescriptor,
    config: Option<&Path>,
    duration: Option<f64>,
) -> orbweaver_core::Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let duration = duration.unwrap_or_else(|| scenario.duration());
    tracing::info!(scenario = %scenario.name, duration, "running scenario");

    let recorder = Recorder::recording();
    let mut world = World::with_recorder(config, &recorder);
    scenario.build_world(&mut world)?;

    world.run_until(duration);
    let settled = world.settle();
    recorder.stop()?;

    let events = recorder.events()?;
    print_trace(&events)?;

    let emissions = events
        .iter()
        .filter(|event| matches!(event, TraceEvent::Emit(_)))
        .count();
    tracing::info!(
        events = events.len(),
        emissions,
        settled,
        end = world.now(),
        "scenario finished"
    );
    Ok(())
}

/// Writes the trace to stdout as JSON lines.
fn print_trace(events: &[TraceEvent]) -> orbweaver_core::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless orb graph pulse simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate a scenario file and print the collaborator trace.
    Run {
        /// JSON scenario describing nodes, connections and transport.
        scenario: PathBuf,
        /// Optional TOML engine configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seconds to simulate, overriding the scenario's own duration.
        #[arg(short, long)]
        duration: Option<f64>,
    },
    /// Run the built-in gate demo.
    Demo {
        /// Optional TOML engine configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seconds to simulate.
        #[arg(short, long)]
        duration: Option<f64>,
    },
}
