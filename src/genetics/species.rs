//! Species table and genome clustering.
//!
//! Species are an arena keyed by a monotonically increasing id. Organisms only
//! hold the id, so a lookup for a removed species simply yields `None`.

use super::naming::{species_color, species_name};
use crate::config::SpeciationConfig;
use crate::genome::{distance, Genome, TRAIT_COUNT};
use crate::organism::{Organism, OrganismKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Species identifier
pub type SpeciesId = u32;

/// An emergent cluster of genomes within one organism kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub kind: OrganismKind,
    pub name: String,
    pub color: [u8; 3],
    /// Members at the last statistics pass
    pub count: usize,
    /// Mean member genome at the last statistics pass
    pub centroid: [f32; TRAIT_COUNT],
    pub created_tick: u64,
    /// Last statistics pass that found at least one member
    pub last_populated_tick: u64,
}

impl Species {
    pub fn distance_to(&self, genome: &Genome) -> f32 {
        distance(&self.centroid, &genome.to_array())
    }
}

/// How a newborn got its species
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Close enough to the parent's species
    Parent(SpeciesId),
    /// Joined the nearest other species within the merge threshold
    Merged(SpeciesId),
    /// Founded a new species
    Founded(SpeciesId),
    /// Table full; joined the closest available species
    Fallback(SpeciesId),
    /// Table full and nothing to fall back to
    Unassigned,
}

impl Assignment {
    pub fn id(self) -> Option<SpeciesId> {
        match self {
            Assignment::Parent(id)
            | Assignment::Merged(id)
            | Assignment::Founded(id)
            | Assignment::Fallback(id) => Some(id),
            Assignment::Unassigned => None,
        }
    }
}

/// All species, living and recently extinct
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    species: BTreeMap<SpeciesId, Species>,
    next_id: SpeciesId,
}

impl SpeciesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from stored records, checking id consistency
    pub fn from_parts(records: Vec<Species>, next_id: SpeciesId) -> Result<Self, String> {
        let mut species = BTreeMap::new();
        for record in records {
            if record.id >= next_id {
                return Err(format!("species id {} not below next id {}", record.id, next_id));
            }
            if record.centroid.iter().any(|v| !v.is_finite()) {
                return Err(format!("species {} has a non-finite centroid", record.id));
            }
            let id = record.id;
            if species.insert(id, record).is_some() {
                return Err(format!("duplicate species id {}", id));
            }
        }
        Ok(Self { species, next_id })
    }

    /// Create a species whose centroid is `genome`
    pub fn found(&mut self, kind: OrganismKind, genome: &Genome, tick: u64) -> SpeciesId {
        let id = self.next_id;
        self.next_id += 1;

        let species = Species {
            id,
            kind,
            name: species_name(kind, id),
            color: species_color(kind, id),
            count: 0,
            centroid: genome.to_array(),
            created_tick: tick,
            last_populated_tick: tick,
        };
        log::debug!("new {} species #{} '{}' at tick {}", kind.label(), id, species.name, tick);
        self.species.insert(id, species);
        id
    }

    #[inline]
    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(&id)
    }

    /// Species an organism refers to, if it still exists
    #[inline]
    pub fn of(&self, organism: &Organism) -> Option<&Species> {
        organism.species.and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    #[inline]
    pub fn next_id(&self) -> SpeciesId {
        self.next_id
    }

    /// Species of one kind
    pub fn count_of_kind(&self, kind: OrganismKind) -> usize {
        self.species.values().filter(|s| s.kind == kind).count()
    }

    /// Closest species of `kind` by centroid distance
    pub fn nearest(&self, kind: OrganismKind, genome: &Genome) -> Option<(SpeciesId, f32)> {
        self.species
            .values()
            .filter(|s| s.kind == kind)
            .map(|s| (s.id, s.distance_to(genome)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Pick the species for a newborn of `kind` with `genome`.
    ///
    /// Order: parent species within the split threshold, then the nearest
    /// species within the merge threshold, then a new species. When the table
    /// is full the nearest species (or the parent's) is used instead.
    pub fn assign(
        &mut self,
        kind: OrganismKind,
        parent: Option<SpeciesId>,
        genome: &Genome,
        tick: u64,
        config: &SpeciationConfig,
    ) -> Assignment {
        let parent = parent.and_then(|id| self.get(id)).filter(|s| s.kind == kind);

        if let Some(species) = parent {
            if species.distance_to(genome) <= config.split_threshold {
                return Assignment::Parent(species.id);
            }
        }
        let parent_id = parent.map(|s| s.id);

        let nearest = self.nearest(kind, genome);
        if let Some((id, d)) = nearest {
            if d <= config.merge_threshold() {
                return Assignment::Merged(id);
            }
        }

        if self.species.len() >= config.max_species {
            return match nearest.map(|(id, _)| id).or(parent_id) {
                Some(id) => Assignment::Fallback(id),
                None => Assignment::Unassigned,
            };
        }

        Assignment::Founded(self.found(kind, genome, tick))
    }

    /// Recount members, recompute centroids and drop long-empty species.
    ///
    /// Species without members keep their previous centroid. Returns the
    /// number of species removed.
    pub fn recompute<'a, I>(&mut self, organisms: I, tick: u64, grace: u64) -> usize
    where
        I: IntoIterator<Item = &'a Organism>,
    {
        let mut sums: BTreeMap<SpeciesId, [f32; TRAIT_COUNT]> = BTreeMap::new();
        for species in self.species.values_mut() {
            species.count = 0;
        }

        for org in organisms {
            let Some(id) = org.species else { continue };
            let Some(species) = self.species.get_mut(&id) else {
                continue;
            };
            species.count += 1;
            let sum = sums.entry(id).or_insert([0.0; TRAIT_COUNT]);
            for (s, v) in sum.iter_mut().zip(org.genome.to_array()) {
                *s += v;
            }
        }

        for species in self.species.values_mut() {
            if species.count == 0 {
                continue;
            }
            if let Some(sum) = sums.get(&species.id) {
                let n = species.count as f32;
                for (c, s) in species.centroid.iter_mut().zip(sum) {
                    *c = (s / n).clamp(0.0, 1.0);
                }
            }
            species.last_populated_tick = tick;
        }

        let before = self.species.len();
        self.species.retain(|_, s| {
            let keep = s.count > 0 || tick.saturating_sub(s.last_populated_tick) <= grace;
            if !keep {
                log::debug!("species #{} '{}' removed after extinction", s.id, s.name);
            }
            keep
        });
        before - self.species.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config() -> SpeciationConfig {
        SpeciationConfig::default()
    }

    fn organism(kind: OrganismKind, genome: Genome, species: Option<SpeciesId>) -> Organism {
        let mut org = Organism::new(0, kind, 0.0, 0.0, 0.0, genome, &Config::default());
        org.species = species;
        org
    }

    #[test]
    fn test_exact_centroid_joins_parent() {
        let mut table = SpeciesTable::new();
        let parent = table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        // A closer species elsewhere must not win over the parent
        table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);

        let a = table.assign(OrganismKind::Grazer, Some(parent), &Genome::GRAZER_SEED, 5, &config());

        assert_eq!(a, Assignment::Parent(parent));
        assert_eq!(table.count_of_kind(OrganismKind::Grazer), 2);
        assert_eq!(table.count_of_kind(OrganismKind::Hunter), 0);
    }

    #[test]
    fn test_far_genome_founds_species() {
        let mut table = SpeciesTable::new();
        let parent = table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        table.found(OrganismKind::Hunter, &Genome::HUNTER_SEED, 0);
        let far = Genome::from_array([1.0; 6]);

        let a = table.assign(OrganismKind::Grazer, Some(parent), &far, 9, &config());

        let Assignment::Founded(id) = a else { panic!("expected a new species, got {:?}", a) };
        assert_eq!(table.len(), 3);
        let species = table.get(id).unwrap();
        assert_eq!(species.kind, OrganismKind::Grazer);
        assert_eq!(species.centroid, far.to_array());
        assert_eq!(species.created_tick, 9);
        assert_eq!(species.count, 0);
    }

    #[test]
    fn test_merge_into_nearest() {
        let mut table = SpeciesTable::new();
        let parent = table.found(OrganismKind::Grazer, &Genome::from_array([0.0; 6]), 0);
        let other = table.found(OrganismKind::Grazer, &Genome::from_array([0.8; 6]), 0);
        let child = Genome::from_array([0.79; 6]);

        let a = table.assign(OrganismKind::Grazer, Some(parent), &child, 1, &config());

        assert_eq!(a, Assignment::Merged(other));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_parent_is_tolerated() {
        let mut table = SpeciesTable::new();
        let a = table.assign(OrganismKind::Hunter, Some(42), &Genome::HUNTER_SEED, 0, &config());
        assert!(matches!(a, Assignment::Founded(_)));
    }

    #[test]
    fn test_full_table_falls_back() {
        let mut cfg = config();
        cfg.max_species = 2;
        let mut table = SpeciesTable::new();
        let g = table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        table.found(OrganismKind::Hunter, &Genome::HUNTER_SEED, 0);

        let a = table.assign(OrganismKind::Grazer, Some(g), &Genome::from_array([1.0; 6]), 0, &cfg);

        assert_eq!(a, Assignment::Fallback(g));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_recompute_centroids_and_idempotence() {
        let mut table = SpeciesTable::new();
        let id = table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        let orgs = vec![
            organism(OrganismKind::Grazer, Genome::from_array([0.2; 6]), Some(id)),
            organism(OrganismKind::Grazer, Genome::from_array([0.4; 6]), Some(id)),
            organism(OrganismKind::Grazer, Genome::from_array([0.9; 6]), None),
        ];

        table.recompute(&orgs, 30, 100);
        let first = table.clone();
        table.recompute(&orgs, 30, 100);

        assert_eq!(table, first);
        let s = table.get(id).unwrap();
        assert_eq!(s.count, 2);
        for c in s.centroid {
            assert!((c - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_species_keeps_centroid_then_expires() {
        let mut table = SpeciesTable::new();
        let id = table.found(OrganismKind::Hunter, &Genome::HUNTER_SEED, 10);
        let none: Vec<Organism> = Vec::new();

        assert_eq!(table.recompute(&none, 50, 100), 0);
        assert_eq!(table.get(id).unwrap().centroid, Genome::HUNTER_SEED.to_array());

        assert_eq!(table.recompute(&none, 110, 100), 0);
        assert_eq!(table.recompute(&none, 111, 100), 1);
        assert!(table.get(id).is_none());
        // Ids are never reused
        assert_eq!(table.found(OrganismKind::Hunter, &Genome::HUNTER_SEED, 120), id + 1);
    }

    #[test]
    fn test_populated_species_survives_grace() {
        let mut table = SpeciesTable::new();
        let id = table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        let orgs = vec![organism(OrganismKind::Grazer, Genome::GRAZER_SEED, Some(id))];
        assert_eq!(table.recompute(&orgs, 10_000, 100), 0);
        assert_eq!(table.get(id).unwrap().last_populated_tick, 10_000);
    }

    #[test]
    fn test_from_parts_checks_ids() {
        let mut table = SpeciesTable::new();
        table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        let records: Vec<Species> = table.iter().cloned().collect();
        assert!(SpeciesTable::from_parts(records.clone(), 1).is_ok());
        assert!(SpeciesTable::from_parts(records, 0).is_err());
    }
}
