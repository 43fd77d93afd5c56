//! Lifecycle: death, reproduction and mutated cloning.
//!
//! Each population list goes through a death sweep followed by a reproduction
//! sweep. Neither sweep caps list length; growth is held back only by the
//! pressure-scaled reproduction chance and the per-kind eligibility gates.

use crate::behavior::Behavior;
use crate::config::Config;
use crate::ecology::{reproduction_chance, Census};
use crate::genetics::{Assignment, SpeciesTable};
use crate::grid::PlantField;
use crate::organism::{DeathCause, Organism, OrganismId, OrganismKind};
use crate::rng::RandomSource;

/// Deaths removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deaths {
    pub starved: usize,
    pub old_age: usize,
}

impl Deaths {
    #[inline]
    pub fn total(&self) -> usize {
        self.starved + self.old_age
    }
}

/// Births produced by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Births {
    pub born: usize,
    pub species_founded: usize,
}

/// Lifecycle rules bound to one tick
pub struct Lifecycle<'a> {
    config: &'a Config,
    tick: u64,
}

impl<'a> Lifecycle<'a> {
    pub fn new(config: &'a Config, tick: u64) -> Self {
        Self { config, tick }
    }

    /// Remove starved and over-age organisms, returning nutrients to the field
    pub fn death_sweep(&self, list: &mut Vec<Organism>, field: &mut PlantField) -> Deaths {
        let max_age = self.config.organisms.max_age;
        let base_return = self.config.organisms.nutrient_return;
        let mut deaths = Deaths::default();

        list.retain(|org| match org.death_cause(max_age) {
            Some(cause) => {
                field.deposit(org.x, org.y, base_return * org.genome.corpse_scale());
                match cause {
                    DeathCause::Starvation => deaths.starved += 1,
                    DeathCause::OldAge => deaths.old_age += 1,
                }
                false
            }
            None => true,
        });

        deaths
    }

    /// Give every eligible organism one reproduction draw.
    ///
    /// `census` holds the live counts after this tick's death sweeps; births
    /// during the sweep are added to it before each draw.
    #[allow(clippy::too_many_arguments)]
    pub fn reproduction_sweep<R: RandomSource + ?Sized>(
        &self,
        list: &mut Vec<Organism>,
        census: Census,
        field: &PlantField,
        species: &mut SpeciesTable,
        next_id: &mut OrganismId,
        rng: &mut R,
    ) -> Births {
        let cfg = self.config;
        let mut births = Births::default();
        let mut offspring = Vec::new();

        for i in 0..list.len() {
            let parent = &mut list[i];
            if parent.cooldown > 0 || parent.energy <= cfg.reproduction.threshold {
                continue;
            }
            let kind = parent.kind;
            let live = with_births(census, kind, offspring.len());
            if !kind.may_reproduce(parent, field, live, cfg) {
                continue;
            }

            let pressure = live.pressure(&cfg.regulation);
            let chance = reproduction_chance(cfg.reproduction.base_chance, pressure, &cfg.regulation)
                * parent.genome.fertility_scale();
            if !rng.chance(chance) {
                continue;
            }

            parent.energy -= cfg.reproduction.cost_for(parent.genome.size);
            debug_assert!(parent.energy >= 0.0, "reproduction left negative energy");
            parent.cooldown = cfg.reproduction.cooldown;

            let id = *next_id;
            *next_id += 1;
            let (child, assignment) = self.offspring(parent, id, species, rng);
            if matches!(assignment, Assignment::Founded(_)) {
                births.species_founded += 1;
            }
            offspring.push(child);
        }

        births.born = offspring.len();
        list.extend(offspring);
        births
    }

    /// Mutated clone of `parent`, placed nearby and assigned a species
    pub fn offspring<R: RandomSource + ?Sized>(
        &self,
        parent: &Organism,
        id: OrganismId,
        species: &mut SpeciesTable,
        rng: &mut R,
    ) -> (Organism, Assignment) {
        let cfg = self.config;
        let genome = parent
            .genome
            .mutated(cfg.evolution.mutation_rate, cfg.evolution.mutation_strength, rng);

        let jitter = cfg.organisms.spawn_jitter;
        let x = parent.x + rng.range(-jitter, jitter);
        let y = parent.y + rng.range(-jitter, jitter);
        let heading = rng.angle();

        let assignment = species.assign(parent.kind, parent.species, &genome, self.tick, &cfg.speciation);

        let child = Organism {
            id,
            kind: parent.kind,
            generation: parent.generation.saturating_add(1),
            x: crate::grid::wrap_coord(x, cfg.world.width),
            y: crate::grid::wrap_coord(y, cfg.world.height),
            heading,
            vx: 0.0,
            vy: 0.0,
            energy: cfg.organisms.newborn_energy,
            age: 0,
            cooldown: cfg.reproduction.cooldown,
            genome,
            species: assignment.id(),
        };
        (child, assignment)
    }
}

fn with_births(census: Census, kind: OrganismKind, born: usize) -> Census {
    match kind {
        OrganismKind::Grazer => Census::new(census.grazers + born, census.hunters),
        OrganismKind::Hunter => Census::new(census.grazers, census.hunters + born),
    }
}
