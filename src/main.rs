//! GRAZEWORLD - CLI Entry Point
//!
//! Headless driver for the grazer/hunter engine.

use clap::{Parser, Subcommand};
use grazeworld::checkpoint::{Checkpoint, CheckpointManager};
use grazeworld::genome::Trait;
use grazeworld::stats::StatsHistory;
use grazeworld::{benchmark, Config, FrameGate, OrganismKind, World};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "grazeworld")]
#[command(version)]
#[command(about = "Grazer/hunter artificial-life engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "10000")]
        steps: u64,

        /// Drive this many display frames instead, gated by the tick divisor
        #[arg(long)]
        frames: Option<u64>,

        /// Output directory for checkpoints
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume simulation from checkpoint
    Resume {
        /// Checkpoint file to resume from
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Number of additional ticks
        #[arg(short, long, default_value = "10000")]
        steps: u64,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "5000")]
        steps: u64,

        /// Random seed
        #[arg(long, default_value = "1")]
        seed: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file (.bin or .json)
        checkpoint: PathBuf,
    },

    /// Summarize a saved stats history
    History {
        /// Stats history file written by `run`
        #[arg(default_value = "output/stats_history.json")]
        path: PathBuf,
    },

    /// Convert a checkpoint between binary and JSON
    Export {
        /// Input checkpoint (.bin or .json)
        input: PathBuf,

        /// Output path; the extension picks the format
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            frames,
            output,
            seed,
            quiet,
        } => run_simulation(config, steps, frames, output, seed, quiet),

        Commands::Resume {
            checkpoint,
            steps,
            output,
        } => resume_simulation(checkpoint, steps, output),

        Commands::Benchmark { steps, seed } => run_benchmark(steps, seed),

        Commands::Init { output } => generate_config(output),

        Commands::Analyze { checkpoint } => analyze_checkpoint(checkpoint),

        Commands::History { path } => summarize_history(path),

        Commands::Export { input, output } => export_checkpoint(input, output),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |e| e.eq_ignore_ascii_case("json"))
}

fn load_checkpoint(path: &Path) -> Result<Checkpoint, Box<dyn std::error::Error>> {
    let checkpoint = if is_json(path) {
        Checkpoint::load_json(path)?
    } else {
        Checkpoint::load(path)?
    };
    Ok(checkpoint)
}

/// Advance one tick, then apply the reseed policy if enabled
fn tick(world: &mut World, quiet: bool) {
    world.step();
    if world.config.simulation.reseed_extinct {
        if let Some(action) = world.apply_reseed_policy() {
            if !quiet {
                println!("  Reseed at tick {}: {:?}", world.tick, action);
            }
        }
    }
}

fn after_tick(world: &World, manager: &mut CheckpointManager, quiet: bool) {
    if !quiet && world.tick % world.config.logging.stats_interval == 0 {
        println!("{}", world.stats.summary());
    }

    if manager.should_save(world.tick) {
        match manager.save(&world.create_checkpoint()) {
            Ok(path) => {
                if !quiet {
                    println!("  Checkpoint saved: {}", path);
                }
            }
            Err(e) => eprintln!("  Checkpoint error: {}", e),
        }
    }
}

fn run_simulation(
    config_path: PathBuf,
    steps: u64,
    frames: Option<u64>,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        Config::default()
    };

    std::fs::create_dir_all(&output)?;

    let mut world = match seed {
        Some(s) => {
            println!("Using seed: {}", s);
            World::new_with_seed(config.clone(), s)
        }
        None => World::new(config.clone()),
    };

    println!("Starting simulation");
    println!("  World: {}x{}", config.world.width, config.world.height);
    println!(
        "  Field: {}x{} cells",
        config.world.grid_resolution, config.world.grid_resolution
    );
    match frames {
        Some(f) => println!("  Frames: {} (divisor {})", f, config.simulation.tick_divisor),
        None => println!("  Steps: {}", steps),
    }
    println!();

    let mut manager = CheckpointManager::new(
        output.to_string_lossy().to_string(),
        config.logging.checkpoint_interval,
        10,
    );

    let start = Instant::now();
    match frames {
        Some(frames) => {
            let mut gate = FrameGate::new(config.simulation.tick_divisor);
            for _ in 0..frames {
                if gate.frame() {
                    tick(&mut world, quiet);
                    after_tick(&world, &mut manager, quiet);
                }
            }
        }
        None => {
            for _ in 0..steps {
                tick(&mut world, quiet);
                after_tick(&world, &mut manager, quiet);
                if world.is_extinct() {
                    println!("\nBoth populations extinct at tick {}", world.tick);
                    break;
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Ticks: {}", world.tick);
    println!("Speed: {:.1} ticks/s", world.tick as f64 / elapsed.as_secs_f64().max(f64::EPSILON));
    println!("Grazers: {}  Hunters: {}", world.grazers.len(), world.hunters.len());
    println!("Species: {}", world.species.len());
    println!("Max generation: {}", world.stats.generation_max);

    let final_path = output.join("checkpoint_final.bin");
    world.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    let stats_path = output.join("stats_history.json");
    world.stats_history.save(&stats_path.to_string_lossy())?;
    println!("Stats history: {:?}", stats_path);

    Ok(())
}

fn resume_simulation(
    checkpoint_path: PathBuf,
    steps: u64,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading checkpoint: {:?}", checkpoint_path);

    let mut world = World::from_checkpoint(load_checkpoint(&checkpoint_path)?)?;

    println!("Resumed at tick {}", world.tick);
    println!("Grazers: {}  Hunters: {}", world.grazers.len(), world.hunters.len());
    println!("Running {} additional ticks", steps);
    println!();

    std::fs::create_dir_all(&output)?;

    let mut manager = CheckpointManager::new(
        output.to_string_lossy().to_string(),
        world.config.logging.checkpoint_interval,
        10,
    );

    let start = Instant::now();
    let target = world.tick + steps;
    while world.tick < target {
        tick(&mut world, false);
        after_tick(&world, &mut manager, false);
        if world.is_extinct() {
            println!("\nBoth populations extinct at tick {}", world.tick);
            break;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("=== Resume Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Final tick: {}", world.tick);
    println!("Grazers: {}  Hunters: {}", world.grazers.len(), world.hunters.len());

    Ok(())
}

fn run_benchmark(steps: u64, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== GRAZEWORLD Benchmark ===");
    println!("Steps: {}", steps);
    println!();

    let result = benchmark(steps, seed);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    Config::default().save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = load_checkpoint(&checkpoint_path)?;
    let size = checkpoint.size_bytes();
    if let Err(e) = checkpoint.validate() {
        println!("Checkpoint fails validation: {}", e);
        return Ok(());
    }
    let world = World::from_checkpoint(checkpoint)?;

    println!("Tick: {}", world.tick);
    println!("Grazers: {}  Hunters: {}", world.grazers.len(), world.hunters.len());
    println!("Pressure: {:.3}", world.pressure());
    println!("Plant total: {:.1}", world.field.total());
    println!();

    for (kind, genes) in [
        (OrganismKind::Grazer, world.stats.grazer_genes),
        (OrganismKind::Hunter, world.stats.hunter_genes),
    ] {
        let Some(genes) = genes else {
            println!("{}: extinct", kind.label());
            continue;
        };
        println!("{} mean genome:", kind.label());
        for t in Trait::ALL {
            println!("  {:<8} {:.3}", t.name(), genes.get(t));
        }
    }

    let mut living = world.stats.species.clone();
    living.sort_by(|a, b| b.count.cmp(&a.count));
    println!();
    println!(
        "Species: {} living, {} in table ({} grazer, {} hunter)",
        living.len(),
        world.species.len(),
        world.species.count_of_kind(OrganismKind::Grazer),
        world.species.count_of_kind(OrganismKind::Hunter)
    );
    for s in living.iter().take(10) {
        println!("  #{:<4} {:<8} {:<28} {}", s.id, s.kind.label(), s.name, s.count);
    }

    println!();
    println!("Checkpoint size: {:.2} MB", size as f64 / 1_000_000.0);

    Ok(())
}

fn summarize_history(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let history = StatsHistory::load(&path.to_string_lossy())?;
    println!("=== Stats History ===");
    println!("File: {:?}", path);
    println!("Snapshots: {} (every {} ticks)", history.snapshots.len(), history.interval);

    let Some(latest) = history.latest() else {
        println!("No snapshots recorded");
        return Ok(());
    };
    println!("Last: {}", latest.summary());

    if let Some((tick, population)) = history.peak_population() {
        println!("Peak population: {} at tick {}", population, tick);
    }

    let pressures = history.pressure_series();
    let mean = pressures.iter().map(|&(_, p)| p).sum::<f32>() / pressures.len() as f32;
    let (peak_tick, peak) = pressures
        .iter()
        .copied()
        .fold((0, f32::MIN), |best, s| if s.1 > best.1 { s } else { best });
    println!("Pressure: mean {:.3}, peak {:.3} at tick {}", mean, peak, peak_tick);

    let species = history.species_series();
    let most = species.iter().map(|&(_, n)| n).max().unwrap_or(0);
    let fewest = species.iter().map(|&(_, n)| n).min().unwrap_or(0);
    println!("Living species: {} to {}", fewest, most);

    Ok(())
}

fn export_checkpoint(input: PathBuf, output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let checkpoint = load_checkpoint(&input)?;
    checkpoint.validate()?;
    if is_json(&output) {
        checkpoint.save_json(&output)?;
    } else {
        checkpoint.save(&output)?;
    }
    println!("Exported tick {} to {:?}", checkpoint.tick, output);
    Ok(())
}
