//! World simulation engine - main simulation loop.
//!
//! One tick runs, in order: plant regrowth, every grazer's behavior, every
//! hunter's behavior, then the grazer lifecycle and the hunter lifecycle.
//! Species statistics are refreshed every `speciation.stats_interval` ticks.

use crate::behavior::{self, Outcome, Surroundings};
use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::config::Config;
use crate::ecology::{AttackResult, Census};
use crate::evolution::Lifecycle;
use crate::genetics::SpeciesTable;
use crate::grid::PlantField;
use crate::organism::{Organism, OrganismId, OrganismKind};
use crate::rng::{RandomSource, SimRng};
use crate::stats::{Stats, StatsHistory};
use serde::{Deserialize, Serialize};

/// Event counters for the most recent step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounters {
    pub births: usize,
    pub deaths: usize,
    pub starved: usize,
    pub old_age: usize,
    pub kills: usize,
    pub species_founded: usize,
    pub species_removed: usize,
}

/// What [`World::apply_reseed_policy`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reseed {
    /// Both populations were gone; the world was reset
    Reset,
    /// A single organism of this kind was added
    Added(OrganismKind),
}

/// The simulation world
#[derive(Clone)]
pub struct World {
    // Environment
    pub field: PlantField,

    // Populations
    pub grazers: Vec<Organism>,
    pub hunters: Vec<Organism>,
    pub species: SpeciesTable,

    // State
    pub tick: u64,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,

    // ID generation
    next_organism_id: OrganismId,

    // Random number generator (seeded for reproducibility)
    rng: SimRng,
    seed: u64,

    counters: StepCounters,
    // Last observed emptiness of each list, for logging transitions
    grazers_extinct: bool,
    hunters_extinct: bool,
}

impl World {
    /// Create a new world with the given configuration
    pub fn new(config: Config) -> Self {
        Self::new_with_seed(config, SimRng::random_seed())
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn new_with_seed(mut config: Config, seed: u64) -> Self {
        config.sanitize();
        let field = PlantField::from_config(&config.world);
        let stats_history = StatsHistory::new(config.logging.stats_interval);

        let mut world = Self {
            field,
            grazers: Vec::new(),
            hunters: Vec::new(),
            species: SpeciesTable::new(),
            tick: 0,
            config,
            stats: Stats::new(),
            stats_history,
            next_organism_id: 0,
            rng: SimRng::seed_from_u64(seed),
            seed,
            counters: StepCounters::default(),
            grazers_extinct: false,
            hunters_extinct: false,
        };
        world.reset();
        world
    }

    /// Rebuild the world from a checkpoint
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, CheckpointError> {
        let mut parts = checkpoint.into_parts()?;
        // Shape was checked against the field, so only tunables move here
        let adjusted = parts.config.sanitize();
        if adjusted > 0 {
            log::warn!("Checkpoint config had {} out-of-range tunables", adjusted);
        }
        let rng = SimRng::seed_from_u64(resume_seed(parts.random_seed, parts.tick));
        let stats_history = StatsHistory::new(parts.config.logging.stats_interval);

        let mut world = Self {
            field: parts.field,
            grazers: parts.grazers,
            hunters: parts.hunters,
            species: parts.species,
            tick: parts.tick,
            config: parts.config,
            stats: Stats::new(),
            stats_history,
            next_organism_id: parts.next_organism_id,
            rng,
            seed: parts.random_seed,
            counters: StepCounters::default(),
            grazers_extinct: false,
            hunters_extinct: false,
        };
        world.grazers_extinct = world.grazers.is_empty();
        world.hunters_extinct = world.hunters.is_empty();
        world.stats = Stats::collect(&world);
        Ok(world)
    }

    /// Replace this world with a checkpoint. On error the world is unchanged.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        match Self::from_checkpoint(checkpoint) {
            Ok(world) => {
                log::info!("Restored world at tick {}", world.tick);
                *self = world;
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected checkpoint: {}", e);
                Err(e)
            }
        }
    }

    /// Create checkpoint of current state
    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.tick,
            self.config.clone(),
            self.field.clone(),
            &self.species,
            &self.grazers,
            &self.hunters,
            self.next_organism_id,
            self.seed,
        )
    }

    /// Start over: fresh field, one seed species and one founder per kind
    pub fn reset(&mut self) {
        let mut rng = self.rng.clone();
        self.reset_with(&mut rng);
        self.rng = rng;
    }

    pub fn reset_with<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.field = PlantField::from_config(&self.config.world);
        self.field.reset(&self.config.world, rng);
        self.species = SpeciesTable::new();
        self.grazers.clear();
        self.hunters.clear();
        self.tick = 0;
        self.next_organism_id = 0;
        self.counters = StepCounters::default();

        for kind in [OrganismKind::Grazer, OrganismKind::Hunter] {
            let genome = kind.seed_genome();
            let sid = self.species.found(kind, &genome, 0);
            let mut founder = self.spawn(kind, rng);
            founder.species = Some(sid);
            self.list_mut(kind).push(founder);
        }

        self.grazers_extinct = false;
        self.hunters_extinct = false;
        self.stats = Stats::collect(self);
        log::info!(
            "World reset ({}x{}, {} cells, seed {})",
            self.config.world.width,
            self.config.world.height,
            self.field.cells().len(),
            self.seed
        );
    }

    /// Founder of `kind` with the seed genome at a random spot
    fn spawn<R: RandomSource + ?Sized>(&mut self, kind: OrganismKind, rng: &mut R) -> Organism {
        let x = rng.range(0.0, self.config.world.width);
        let y = rng.range(0.0, self.config.world.height);
        let heading = rng.angle();
        let id = self.next_organism_id;
        self.next_organism_id += 1;
        let (x, y) = self.field.wrap(x, y);
        Organism::new(id, kind, x, y, heading, kind.seed_genome(), &self.config)
    }

    fn list_mut(&mut self, kind: OrganismKind) -> &mut Vec<Organism> {
        match kind {
            OrganismKind::Grazer => &mut self.grazers,
            OrganismKind::Hunter => &mut self.hunters,
        }
    }

    /// Main simulation step
    pub fn step(&mut self) {
        let mut rng = self.rng.clone();
        self.step_with(&mut rng);
        self.rng = rng;
    }

    /// Same as [`World::step`]
    pub fn advance_tick(&mut self) {
        self.step();
    }

    /// One tick drawing from `rng` instead of the world's own generator
    pub fn step_with<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.counters = StepCounters::default();

        // Phase 1: plants
        self.field.regrow(self.config.world.plant_growth);

        // Phase 2: behavior, grazers before hunters
        let pressure = self.pressure();
        self.run_grazers(pressure, rng);
        self.run_hunters(pressure, rng);

        // Phase 3: lifecycle, grazers before hunters
        self.run_lifecycle(rng);

        self.tick += 1;

        // Phase 4: periodic species statistics
        if self.tick % self.config.speciation.stats_interval == 0 {
            self.counters.species_removed = self.species.recompute(
                self.grazers.iter().chain(&self.hunters),
                self.tick,
                self.config.speciation.extinct_grace,
            );
        }

        self.check_extinction();
        self.update_stats();
    }

    fn run_grazers<R: RandomSource + ?Sized>(&mut self, pressure: f32, rng: &mut R) {
        let mut env = Surroundings {
            field: &mut self.field,
            threats: &self.hunters,
            prey: &mut [],
            pressure,
            config: &self.config,
        };
        for grazer in self.grazers.iter_mut() {
            behavior::run(grazer, &mut env, rng);
        }
    }

    fn run_hunters<R: RandomSource + ?Sized>(&mut self, pressure: f32, rng: &mut R) {
        let mut env = Surroundings {
            field: &mut self.field,
            threats: &[],
            prey: &mut self.grazers,
            pressure,
            config: &self.config,
        };
        for hunter in self.hunters.iter_mut() {
            if let Outcome::Attacked(AttackResult::Hit { stolen, drained: true, .. }) =
                behavior::run(hunter, &mut env, rng)
            {
                if stolen > 0.0 {
                    self.counters.kills += 1;
                }
            }
        }
    }

    fn run_lifecycle<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        let lifecycle = Lifecycle::new(&self.config, self.tick);

        for kind in [OrganismKind::Grazer, OrganismKind::Hunter] {
            let list = match kind {
                OrganismKind::Grazer => &mut self.grazers,
                OrganismKind::Hunter => &mut self.hunters,
            };
            let deaths = lifecycle.death_sweep(list, &mut self.field);

            // Hunters see the grazer count after grazer births
            let census = Census::new(self.grazers.len(), self.hunters.len());
            let list = match kind {
                OrganismKind::Grazer => &mut self.grazers,
                OrganismKind::Hunter => &mut self.hunters,
            };
            let births = lifecycle.reproduction_sweep(
                list,
                census,
                &self.field,
                &mut self.species,
                &mut self.next_organism_id,
                rng,
            );

            self.counters.deaths += deaths.total();
            self.counters.starved += deaths.starved;
            self.counters.old_age += deaths.old_age;
            self.counters.births += births.born;
            self.counters.species_founded += births.species_founded;
        }

        debug_assert!(self.field.in_bounds());
    }

    fn check_extinction(&mut self) {
        let grazers_gone = self.grazers.is_empty();
        if grazers_gone && !self.grazers_extinct {
            log::info!("Grazers went extinct at tick {}", self.tick);
        }
        self.grazers_extinct = grazers_gone;

        let hunters_gone = self.hunters.is_empty();
        if hunters_gone && !self.hunters_extinct {
            log::info!("Hunters went extinct at tick {}", self.tick);
        }
        self.hunters_extinct = hunters_gone;
    }

    fn update_stats(&mut self) {
        self.stats = Stats::collect(self);
        if self.stats_history.observe(&self.stats) {
            log::debug!("{}", self.stats.summary());
        }
    }

    /// Re-populate after extinction.
    ///
    /// Both lists empty resets the world; no grazers adds one grazer; no
    /// hunters with more than 12 grazers adds one hunter. Never called from
    /// [`World::step`]; drivers opt in through `simulation.reseed_extinct`.
    pub fn apply_reseed_policy(&mut self) -> Option<Reseed> {
        let mut rng = self.rng.clone();
        let action = self.apply_reseed_policy_with(&mut rng);
        self.rng = rng;
        action
    }

    pub fn apply_reseed_policy_with<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Option<Reseed> {
        let action = match (self.grazers.len(), self.hunters.len()) {
            (0, 0) => Reseed::Reset,
            (0, _) => Reseed::Added(OrganismKind::Grazer),
            (g, 0) if g > 12 => Reseed::Added(OrganismKind::Hunter),
            _ => return None,
        };

        match action {
            Reseed::Reset => {
                log::info!("Both populations extinct at tick {}, resetting", self.tick);
                self.reset_with(rng);
            }
            Reseed::Added(kind) => {
                let mut org = self.spawn(kind, rng);
                let assignment =
                    self.species
                        .assign(kind, None, &org.genome, self.tick, &self.config.speciation);
                org.species = assignment.id();
                log::info!("Reseeded one {} at tick {}", kind.label(), self.tick);
                self.list_mut(kind).push(org);
                self.stats = Stats::collect(self);
            }
        }
        Some(action)
    }

    /// Swap in new tunables.
    ///
    /// The field is never resized, so world dimensions and grid resolution
    /// must stay the same. Out-of-range tunables are clamped.
    pub fn set_config(&mut self, mut config: Config) -> Result<usize, String> {
        config.validate()?;
        let (old, new) = (&self.config.world, &config.world);
        if old.width != new.width || old.height != new.height || old.grid_resolution != new.grid_resolution {
            return Err("world dimensions cannot change during a run".to_string());
        }
        let adjusted = config.sanitize();
        self.stats_history.interval = config.logging.stats_interval.max(1);
        self.config = config;
        Ok(adjusted)
    }

    /// Run simulation for specified number of steps
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F)
    where
        F: FnMut(&World, u64),
    {
        for i in 0..steps {
            self.step();
            callback(self, i);
        }
    }

    /// Live counts of both populations
    pub fn census(&self) -> Census {
        Census::new(self.grazers.len(), self.hunters.len())
    }

    /// Current population pressure
    pub fn pressure(&self) -> f32 {
        self.census().pressure(&self.config.regulation)
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.census().total()
    }

    /// Check if both populations are extinct
    pub fn is_extinct(&self) -> bool {
        self.population() == 0
    }

    /// Counters from the most recent step
    pub fn step_counters(&self) -> StepCounters {
        self.counters
    }

    pub fn next_organism_id(&self) -> OrganismId {
        self.next_organism_id
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Generator seed for a world resumed at `tick`
fn resume_seed(seed: u64, tick: u64) -> u64 {
    seed ^ tick.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Converts display frames into ticks.
///
/// With divisor `n`, one tick is allowed every `n` frames.
#[derive(Debug, Clone)]
pub struct FrameGate {
    divisor: u32,
    frame: u64,
}

impl FrameGate {
    pub fn new(divisor: u32) -> Self {
        Self {
            divisor: divisor.max(1),
            frame: 0,
        }
    }

    /// Count a frame; true when a tick should run on it
    pub fn frame(&mut self) -> bool {
        let due = self.frame % self.divisor as u64 == 0;
        self.frame += 1;
        due
    }

    pub fn set_divisor(&mut self, divisor: u32) {
        self.divisor = divisor.max(1);
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }
}
