//! # GRAZEWORLD
//!
//! Grazer/hunter artificial-life engine on a toroidal plant field.
//!
//! ## Features
//!
//! - **Plant field**: bounded grid with logistic regrowth and nutrient return
//! - **Six-trait genomes**: speed, turn, greed, caution, bite and size
//! - **Two behaviors**: ray-sampling grazers that flee, hunters that chase and bite
//! - **Soft regulation**: population pressure raises costs and lowers fertility
//! - **Speciation**: genome clustering into named, colored species
//! - **Checkpoints**: versioned binary and JSON snapshots
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grazeworld::{World, Config};
//!
//! let mut world = World::new(Config::default());
//! world.run(1000);
//!
//! println!("Grazers: {}", world.grazers.len());
//! println!("Hunters: {}", world.hunters.len());
//! println!("{}", world.stats.summary());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use grazeworld::Config;
//!
//! let mut config = Config::default();
//! config.world.plant_growth = 0.02;
//! config.evolution.mutation_rate = 0.1;
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use grazeworld::{World, Config};
//! use grazeworld::checkpoint::Checkpoint;
//!
//! let mut world = World::new(Config::default());
//! world.run(1000);
//!
//! world.create_checkpoint().save("checkpoint.bin").unwrap();
//!
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! world.restore(loaded).unwrap();
//! ```

pub mod behavior;
pub mod checkpoint;
pub mod config;
pub mod ecology;
pub mod evolution;
pub mod genetics;
pub mod genome;
pub mod grid;
pub mod organism;
pub mod rng;
pub mod stats;
pub mod world;

// Re-export main types
pub use config::Config;
pub use genome::Genome;
pub use organism::{Organism, OrganismKind};
pub use rng::{RandomSource, SimRng};
pub use world::{FrameGate, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark with the default configuration.
///
/// The reseed policy is applied after every step so the run never idles on
/// an empty world.
pub fn benchmark(steps: u64, seed: u64) -> BenchmarkResult {
    use std::time::Instant;

    let mut world = World::new_with_seed(Config::default(), seed);
    let mut peak_population = world.population();

    let start = Instant::now();
    for _ in 0..steps {
        world.step();
        world.apply_reseed_policy();
        peak_population = peak_population.max(world.population());
    }
    let elapsed = start.elapsed();

    BenchmarkResult {
        steps,
        seed,
        final_grazers: world.grazers.len(),
        final_hunters: world.hunters.len(),
        peak_population,
        species: world.species.len(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub seed: u64,
    pub final_grazers: usize,
    pub final_hunters: usize,
    pub peak_population: usize,
    pub species: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {} (seed {})", self.steps, self.seed)?;
        writeln!(f, "Final: {} grazers, {} hunters", self.final_grazers, self.final_hunters)?;
        writeln!(f, "Peak population: {}", self.peak_population)?;
        writeln!(f, "Species: {}", self.species)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        Ok(())
    }
}
