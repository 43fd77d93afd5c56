//! Organism structure and physiology.

use crate::config::Config;
use crate::genetics::SpeciesId;
use crate::genome::Genome;
use crate::grid::wrap_coord;
use serde::{Deserialize, Serialize};

/// Unique organism identifier
pub type OrganismId = u64;

/// Trophic role of an organism, fixed for its whole life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrganismKind {
    Grazer,
    Hunter,
}

impl OrganismKind {
    pub fn label(self) -> &'static str {
        match self {
            OrganismKind::Grazer => "grazer",
            OrganismKind::Hunter => "hunter",
        }
    }

    /// Genome every population of this kind is founded with
    pub fn seed_genome(self) -> Genome {
        match self {
            OrganismKind::Grazer => Genome::GRAZER_SEED,
            OrganismKind::Hunter => Genome::HUNTER_SEED,
        }
    }
}

/// Cause of death tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
}

/// A grazer or hunter in the simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Organism {
    // Identity
    pub id: OrganismId,
    pub kind: OrganismKind,
    pub generation: u16,

    // Kinematics
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub vx: f32,
    pub vy: f32,

    // Physiology
    pub energy: f32,
    pub age: u32,
    /// Ticks left before reproduction is possible again
    pub cooldown: u32,

    pub genome: Genome,

    /// Weak reference into the species table
    pub species: Option<SpeciesId>,
}

impl Organism {
    /// Create a founding adult
    pub fn new(
        id: OrganismId,
        kind: OrganismKind,
        x: f32,
        y: f32,
        heading: f32,
        genome: Genome,
        config: &Config,
    ) -> Self {
        Self {
            id,
            kind,
            generation: 0,
            x,
            y,
            heading,
            vx: 0.0,
            vy: 0.0,
            energy: config.organisms.initial_energy,
            age: 0,
            cooldown: 0,
            genome,
            species: None,
        }
    }

    /// Why this organism would be removed by a death sweep, if at all
    pub fn death_cause(&self, max_age: u32) -> Option<DeathCause> {
        if self.energy <= 0.0 {
            Some(DeathCause::Starvation)
        } else if self.age > max_age {
            Some(DeathCause::OldAge)
        } else {
            None
        }
    }

    /// Distance along the ground, no toroidal shortcut
    #[inline]
    pub fn distance_sq_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }

    /// Effective speed for this genome
    pub fn speed(&self, config: &Config) -> f32 {
        let o = &config.organisms;
        (o.speed_min + self.genome.speed * (o.speed_max - o.speed_min)) * self.genome.speed_scale()
    }

    /// Energy spent moving for one tick
    pub fn move_cost(&self, config: &Config, crowd_factor: f32) -> f32 {
        config.organisms.base_move_cost
            * self.genome.body_cost()
            * crowd_factor
            * (0.65 + self.genome.speed * 1.2)
    }

    /// Shared movement step: pay, advance, wrap, age.
    pub fn advance(&mut self, config: &Config, crowd_factor: f32) {
        self.energy -= self.move_cost(config, crowd_factor);

        let speed = self.speed(config);
        self.vx = self.heading.cos() * speed;
        self.vy = self.heading.sin() * speed;
        self.x = wrap_coord(self.x + self.vx, config.world.width);
        self.y = wrap_coord(self.y + self.vy, config.world.height);

        self.age += 1;
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grazer(config: &Config) -> Organism {
        Organism::new(1, OrganismKind::Grazer, 50.0, 50.0, 0.0, Genome::GRAZER_SEED, config)
    }

    #[test]
    fn test_advance_moves_along_heading() {
        let config = Config::default();
        let mut org = grazer(&config);
        let speed = org.speed(&config);

        org.advance(&config, 1.0);

        assert!((org.x - (50.0 + speed)).abs() < 1e-4);
        assert!((org.y - 50.0).abs() < 1e-4);
        assert_eq!(org.age, 1);
    }

    #[test]
    fn test_advance_pays_movement_cost() {
        let config = Config::default();
        let mut org = grazer(&config);
        let before = org.energy;
        let cost = org.move_cost(&config, 2.0);

        org.advance(&config, 2.0);

        assert!((before - org.energy - cost).abs() < 1e-7);
        assert!(cost > org.move_cost(&config, 1.0));
    }

    #[test]
    fn test_cooldown_counts_down_to_zero() {
        let config = Config::default();
        let mut org = grazer(&config);
        org.cooldown = 1;
        org.advance(&config, 1.0);
        assert_eq!(org.cooldown, 0);
        org.advance(&config, 1.0);
        assert_eq!(org.cooldown, 0);
    }

    #[test]
    fn test_wraps_past_right_edge() {
        let config = Config::default();
        let mut org = grazer(&config);
        let speed = org.speed(&config);
        org.x = config.world.width - speed + 0.5;

        org.advance(&config, 1.0);

        assert!((org.x - 0.5).abs() < 1e-3, "x = {}", org.x);
    }

    #[test]
    fn test_larger_bodies_are_slower() {
        let config = Config::default();
        let mut small = grazer(&config);
        let mut large = grazer(&config);
        small.genome.size = 0.0;
        large.genome.size = 1.0;
        assert!(large.speed(&config) < small.speed(&config));
    }

    #[test]
    fn test_death_cause() {
        let config = Config::default();
        let mut org = grazer(&config);
        assert_eq!(org.death_cause(10), None);
        org.age = 11;
        assert_eq!(org.death_cause(10), Some(DeathCause::OldAge));
        org.energy = 0.0;
        assert_eq!(org.death_cause(10), Some(DeathCause::Starvation));
    }
}
