use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use blockwire_core::circuit::Circuit;
use blockwire_core::config::CircuitConfig;
use blockwire_core::event::CircuitEvent;
use blockwire_core::world::HeadlessWorld;
use blockwire_save::{CURRENT_VERSION, SaveDocument};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Inspect, upgrade and verify block-circuit save files.
#[derive(Parser, Debug)]
#[command(name = "blockwire", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the save version, block counts per type and wire count.
    Inspect { file: PathBuf },
    /// Migrate a save to the current version and write it as pretty JSON.
    Upgrade {
        file: PathBuf,
        /// Output path; prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a save into a headless circuit, run it, and report burns.
    Check {
        file: PathBuf,
        /// Number of ticks to run.
        #[arg(short = 'n', long, default_value_t = 60)]
        ticks: u32,
        /// Seconds per tick.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,
        /// Engine config file (.toml, .ron or .json).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { file } => inspect(&file),
        Command::Upgrade { file, output } => upgrade(&file, output.as_deref()),
        Command::Check {
            file,
            ticks,
            dt,
            config,
        } => check(&file, ticks, dt, config.as_deref()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_save(path: &Path) -> Result<SaveDocument> {
    let json = read_json(path)?;
    blockwire_save::load(json).with_context(|| format!("loading {}", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
    let json = read_json(path)?;
    let version = blockwire_save::version_of(&json)?;
    let doc = blockwire_save::load(json)?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for block in &doc.blocks {
        *counts.entry(block.id.to_string()).or_default() += 1;
    }
    let wires = doc
        .blocks
        .iter()
        .flat_map(|b| b.config.values())
        .filter(|c| c.wire().is_some())
        .count();

    if version < CURRENT_VERSION {
        println!("version: {version} (upgrades to {CURRENT_VERSION})");
    } else {
        println!("version: {version}");
    }
    println!("blocks:  {}", doc.blocks.len());
    for (kind, count) in &counts {
        println!("  {kind:<14} {count}");
    }
    println!("wires:   {wires}");
    Ok(())
}

fn upgrade(path: &Path, output: Option<&Path>) -> Result<()> {
    let doc = read_save(path)?;
    let text = blockwire_save::to_pretty_json(&doc)?;
    match output {
        Some(out) => {
            fs::write(out, text + "\n").with_context(|| format!("writing {}", out.display()))?;
            tracing::info!(path = %out.display(), version = CURRENT_VERSION, "wrote upgraded save");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn check(path: &Path, ticks: u32, dt: f64, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(p) => CircuitConfig::load(p)?,
        None => CircuitConfig::default(),
    };
    let doc = read_save(path)?;
    let mut circuit = Circuit::new(config);
    let mut world = HeadlessWorld::new();
    blockwire_save::place(&doc, &mut circuit, &mut world)?;

    let mut burns = Vec::new();
    let mut collect = |circuit: &mut Circuit, tick: u64| {
        for event in circuit.drain_events() {
            if let CircuitEvent::Burned { uuid, fault } = event {
                burns.push((tick, uuid, fault));
            }
        }
    };
    collect(&mut circuit, 0);
    for _ in 0..ticks {
        circuit.tick(&mut world, dt)?;
        let tick = circuit.tick_count();
        collect(&mut circuit, tick);
        circuit.flush_effects(&mut world);
    }

    println!(
        "ran {ticks} ticks over {} blocks and {} wires",
        circuit.len(),
        circuit.wire_count()
    );
    if burns.is_empty() {
        println!("no burns");
        return Ok(());
    }
    for (tick, uuid, fault) in &burns {
        println!("tick {tick}: block {uuid} burned: {fault}");
    }
    bail!("{} block(s) burned", burns.len())
}
