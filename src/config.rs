//! Configuration system for the grazer/hunter ecosystem.
//!
//! Supports YAML configuration files with sensible defaults. Runtime tunables
//! (tick divisor, regrowth, mutation, split threshold) are clamped into range
//! by [`Config::sanitize`] rather than rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub organisms: OrganismConfig,
    #[serde(default)]
    pub grazing: GrazingConfig,
    #[serde(default)]
    pub hunting: HuntingConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub speciation: SpeciationConfig,
    #[serde(default)]
    pub regulation: RegulationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// World/environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Logical width of the world
    pub width: f32,
    /// Logical height of the world
    pub height: f32,
    /// Plant grid cells per axis
    pub grid_resolution: usize,
    /// Upper bound of a plant cell
    pub plant_max: f32,
    /// Fraction of the missing density regrown per tick
    pub plant_growth: f32,
    /// Random patches deposited on reset
    pub seed_patches: usize,
    /// Smallest patch amount
    pub patch_min: f32,
    /// Largest patch amount
    pub patch_max: f32,
}

/// Physiology shared by both kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismConfig {
    /// Energy of a freshly seeded adult
    pub initial_energy: f32,
    /// Energy of a newborn
    pub newborn_energy: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    /// Movement energy cost per tick before scaling
    pub base_move_cost: f32,
    /// Turn rate with a zero turn gene
    pub turn_base: f32,
    /// Additional turn rate at turn gene 1.0
    pub turn_gain: f32,
    /// Maximum lifespan in ticks
    pub max_age: u32,
    /// Offspring spawn offset from the parent on each axis
    pub spawn_jitter: f32,
    /// Nutrients returned to the field by a corpse of size 0.5
    pub nutrient_return: f32,
}

/// Grazer behavior parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrazingConfig {
    /// Vision ray length
    pub vision: f32,
    /// Number of vision rays
    pub rays: usize,
    /// Angle between neighbouring rays
    pub ray_spacing: f32,
    /// Distance at which hunters trigger fleeing
    pub danger_radius: f32,
    /// Caution below this never flees
    pub caution_floor: f32,
    /// Flee turn strength per unit caution
    pub flee_strength: f32,
    /// Plant eaten per tick before greed/size scaling
    pub eat_rate: f32,
    /// Plant to energy conversion
    pub feed_efficiency: f32,
    /// Baseline metabolic cost per tick
    pub hunger: f32,
    /// Wander probability at zero greed
    pub wander_chance: f32,
    /// Local plant density needed before reproducing
    pub reproduction_density: f32,
}

/// Hunter behavior parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntingConfig {
    /// Target acquisition radius
    pub vision: f32,
    /// Attack reach before the size bonus
    pub engage_radius: f32,
    /// Extra reach at size 1.0
    pub engage_size_bonus: f32,
    /// Energy stolen per bite before bite/size scaling
    pub damage: f32,
    /// Stolen energy to hunter energy conversion
    pub efficiency: f32,
    /// Baseline metabolic cost per tick
    pub hunger: f32,
    /// Wander probability when no prey is visible
    pub patrol_chance: f32,
    /// Grazers needed per hunter before hunters may reproduce
    pub prey_ratio: f32,
    /// Grazers that must exist before hunters may reproduce
    pub prey_floor: usize,
}

/// Reproduction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Minimum energy to reproduce
    pub threshold: f32,
    /// Energy cost to reproduce before size scaling
    pub cost: f32,
    /// Recovery period after reproducing
    pub cooldown: u32,
    /// Per-tick reproduction chance at zero pressure
    pub base_chance: f32,
}

/// Mutation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Probability of mutating each trait
    pub mutation_rate: f32,
    /// Magnitude of trait mutations
    pub mutation_strength: f32,
}

/// Species clustering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciationConfig {
    /// Distance from the parent species centroid that forces a split
    pub split_threshold: f32,
    /// Merge threshold as a fraction of the split threshold
    pub merge_ratio: f32,
    /// Hard limit on concurrent species
    pub max_species: usize,
    /// Ticks between species statistics passes
    pub stats_interval: u64,
    /// Ticks an empty species survives before removal
    pub extinct_grace: u64,
}

/// Density-based population regulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulationConfig {
    pub target_grazers: f32,
    pub target_hunters: f32,
    /// Sigmoid width for grazers
    pub grazer_softness: f32,
    /// Sigmoid width for hunters
    pub hunter_softness: f32,
    /// Cost multiplier gain at pressure 1.0
    pub crowd_cost_gain: f32,
    /// Reproduction chance lost at pressure 1.0
    pub reproduction_drop: f32,
}

/// Driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Frames per simulation tick
    pub tick_divisor: u32,
    /// Let the driver reseed extinct populations
    pub reseed_extinct: bool,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Steps between checkpoints
    pub checkpoint_interval: u64,
    /// Steps between stats logging
    pub stats_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            organisms: OrganismConfig::default(),
            grazing: GrazingConfig::default(),
            hunting: HuntingConfig::default(),
            reproduction: ReproductionConfig::default(),
            evolution: EvolutionConfig::default(),
            speciation: SpeciationConfig::default(),
            regulation: RegulationConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
            grid_resolution: 120,
            plant_max: 1.0,
            plant_growth: 0.015,
            seed_patches: 500,
            patch_min: 0.2,
            patch_max: 1.0,
        }
    }
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            initial_energy: 0.9,
            newborn_energy: 0.6,
            speed_min: 0.25,
            speed_max: 2.2,
            base_move_cost: 0.0035,
            turn_base: 0.08,
            turn_gain: 0.25,
            max_age: 20_000,
            spawn_jitter: 10.0,
            nutrient_return: 0.35,
        }
    }
}

impl Default for GrazingConfig {
    fn default() -> Self {
        Self {
            vision: 28.0,
            rays: 8,
            ray_spacing: 0.35,
            danger_radius: 42.0,
            caution_floor: 0.05,
            flee_strength: 1.35,
            eat_rate: 0.18,
            feed_efficiency: 0.75,
            hunger: 0.0012,
            wander_chance: 0.15,
            reproduction_density: 0.25,
        }
    }
}

impl Default for HuntingConfig {
    fn default() -> Self {
        Self {
            vision: 40.0,
            engage_radius: 6.5,
            engage_size_bonus: 4.0,
            damage: 0.35,
            efficiency: 0.9,
            hunger: 0.002,
            patrol_chance: 0.55,
            prey_ratio: 2.0,
            prey_floor: 12,
        }
    }
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            threshold: 1.25,
            cost: 0.55,
            cooldown: 120,
            base_chance: 0.22,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.12,
            mutation_strength: 0.12,
        }
    }
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            split_threshold: 0.22,
            merge_ratio: 0.6,
            max_species: 256,
            stats_interval: 30,
            extinct_grace: 1_200,
        }
    }
}

impl Default for RegulationConfig {
    fn default() -> Self {
        Self {
            target_grazers: 220.0,
            target_hunters: 70.0,
            grazer_softness: 40.0,
            hunter_softness: 18.0,
            crowd_cost_gain: 1.5,
            reproduction_drop: 0.8,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_divisor: 1,
            reseed_extinct: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 5_000,
            stats_interval: 20,
        }
    }
}

impl SpeciationConfig {
    /// Merge threshold, always below the split threshold
    #[inline]
    pub fn merge_threshold(&self) -> f32 {
        self.split_threshold * self.merge_ratio
    }
}

impl ReproductionConfig {
    /// Size-scaled reproduction cost
    #[inline]
    pub fn cost_for(&self, size: f32) -> f32 {
        self.cost * (0.8 + 0.4 * size)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        config.sanitize();
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate values that cannot be sensibly clamped
    pub fn validate(&self) -> Result<(), String> {
        if self.world.grid_resolution == 0 {
            return Err("grid_resolution must be > 0".to_string());
        }
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !(positive(self.world.width) && positive(self.world.height)) {
            return Err("world width and height must be finite and > 0".to_string());
        }
        if !positive(self.world.plant_max) {
            return Err("plant_max must be finite and > 0".to_string());
        }
        if self.grazing.rays == 0 {
            return Err("grazing.rays must be > 0".to_string());
        }
        Ok(())
    }

    /// Clamp tunables into their documented ranges.
    ///
    /// Returns the number of fields that had to be adjusted.
    pub fn sanitize(&mut self) -> usize {
        let mut adjusted = 0;

        let defaults = WorldConfig::default();
        reset_unless_positive(&mut self.world.width, defaults.width, "world.width", &mut adjusted);
        reset_unless_positive(&mut self.world.height, defaults.height, "world.height", &mut adjusted);
        reset_unless_positive(&mut self.world.plant_max, defaults.plant_max, "world.plant_max", &mut adjusted);
        if self.world.grid_resolution == 0 {
            log::warn!("world.grid_resolution 0 clamped to 1");
            self.world.grid_resolution = 1;
            adjusted += 1;
        }
        if self.grazing.rays == 0 {
            log::warn!("grazing.rays 0 clamped to 1");
            self.grazing.rays = 1;
            adjusted += 1;
        }

        clamp_field(&mut self.world.plant_growth, 0.0, 1.0, "world.plant_growth", &mut adjusted);
        clamp_field(&mut self.evolution.mutation_rate, 0.0, 1.0, "evolution.mutation_rate", &mut adjusted);
        clamp_field(
            &mut self.evolution.mutation_strength,
            0.0,
            1.0,
            "evolution.mutation_strength",
            &mut adjusted,
        );
        // Genome distance never exceeds sqrt(6)
        clamp_field(
            &mut self.speciation.split_threshold,
            0.0,
            6f32.sqrt(),
            "speciation.split_threshold",
            &mut adjusted,
        );
        clamp_field(&mut self.speciation.merge_ratio, 0.0, 1.0, "speciation.merge_ratio", &mut adjusted);
        clamp_field(&mut self.hunting.efficiency, 0.0, 1.0, "hunting.efficiency", &mut adjusted);
        clamp_field(&mut self.grazing.feed_efficiency, 0.0, 1.0, "grazing.feed_efficiency", &mut adjusted);
        clamp_field(&mut self.reproduction.base_chance, 0.0, 1.0, "reproduction.base_chance", &mut adjusted);

        if self.simulation.tick_divisor == 0 {
            log::warn!("simulation.tick_divisor 0 clamped to 1");
            self.simulation.tick_divisor = 1;
            adjusted += 1;
        }
        if self.speciation.stats_interval == 0 {
            log::warn!("speciation.stats_interval 0 clamped to 1");
            self.speciation.stats_interval = 1;
            adjusted += 1;
        }
        if self.logging.stats_interval == 0 {
            log::warn!("logging.stats_interval 0 clamped to 1");
            self.logging.stats_interval = 1;
            adjusted += 1;
        }
        if self.speciation.max_species < 2 {
            // One seed species per kind must always fit
            self.speciation.max_species = 2;
            adjusted += 1;
        }

        // Reproduction must never leave a parent below zero energy
        let max_cost = self.reproduction.cost_for(1.0);
        if self.reproduction.threshold < max_cost {
            log::warn!(
                "reproduction.threshold {} raised to the maximum cost {}",
                self.reproduction.threshold,
                max_cost
            );
            self.reproduction.threshold = max_cost;
            adjusted += 1;
        }

        adjusted
    }
}

fn clamp_field(value: &mut f32, min: f32, max: f32, name: &str, adjusted: &mut usize) {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != *value {
        log::warn!("{} = {} out of range, clamped to {}", name, value, clamped);
        *value = clamped;
        *adjusted += 1;
    }
}

fn reset_unless_positive(value: &mut f32, default: f32, name: &str, adjusted: &mut usize) {
    if !(value.is_finite() && *value > 0.0) {
        log::warn!("{} = {} must be positive, reset to {}", name, value, default);
        *value = default;
        *adjusted += 1;
    }
}
