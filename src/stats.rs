//! Statistics tracking for the simulation.
//!
//! Everything here is read off the world without touching it; collecting
//! twice in a row yields identical snapshots.

use crate::genetics::SpeciesId;
use crate::genome::{Genome, TRAIT_COUNT};
use crate::organism::{Organism, OrganismKind};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Live member count of one species
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub id: SpeciesId,
    pub kind: OrganismKind,
    pub name: String,
    pub count: usize,
}

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation tick
    pub tick: u64,
    pub grazers: usize,
    pub hunters: usize,
    /// Population pressure in `[0, 1]`
    pub pressure: f32,
    /// Sum of all plant cells
    pub plant_total: f32,
    /// Mean grazer genome, if any grazers are alive
    pub grazer_genes: Option<Genome>,
    /// Mean hunter genome, if any hunters are alive
    pub hunter_genes: Option<Genome>,
    pub grazer_energy_mean: f32,
    pub hunter_energy_mean: f32,
    pub generation_max: u16,
    /// Species with at least one living member, by id
    pub species: Vec<SpeciesCount>,
    /// Species currently held in the table, including empty ones
    pub species_total: usize,
    /// Births during the last step
    pub births: usize,
    /// Deaths during the last step
    pub deaths: usize,
    /// Grazers drained to zero by hunters during the last step
    pub kills: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current world state
    pub fn collect(world: &World) -> Self {
        let counters = world.step_counters();
        let mut per_species: BTreeMap<SpeciesId, usize> = BTreeMap::new();
        for org in world.grazers.iter().chain(&world.hunters) {
            if let Some(id) = org.species {
                *per_species.entry(id).or_insert(0) += 1;
            }
        }

        let species = per_species
            .into_iter()
            .filter_map(|(id, count)| {
                world.species.get(id).map(|s| SpeciesCount {
                    id,
                    kind: s.kind,
                    name: s.name.clone(),
                    count,
                })
            })
            .collect();

        Self {
            tick: world.tick,
            grazers: world.grazers.len(),
            hunters: world.hunters.len(),
            pressure: world.pressure(),
            plant_total: world.field.total(),
            grazer_genes: mean_genome(&world.grazers),
            hunter_genes: mean_genome(&world.hunters),
            grazer_energy_mean: mean_energy(&world.grazers),
            hunter_energy_mean: mean_energy(&world.hunters),
            generation_max: world
                .grazers
                .iter()
                .chain(&world.hunters)
                .map(|o| o.generation)
                .max()
                .unwrap_or(0),
            species,
            species_total: world.species.len(),
            births: counters.births,
            deaths: counters.deaths,
            kills: counters.kills,
        }
    }

    /// Total population
    pub fn population(&self) -> usize {
        self.grazers + self.hunters
    }

    /// Save stats to JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:7} | G:{:5} H:{:4} | P:{:.2} | Spp:{:3} | Plant:{:.0} | +{} -{} | g{} h{}",
            self.tick,
            self.grazers,
            self.hunters,
            self.pressure,
            self.species.len(),
            self.plant_total,
            self.births,
            self.deaths,
            gene_readout(self.grazer_genes.as_ref()),
            gene_readout(self.hunter_genes.as_ref()),
        )
    }
}

fn mean_genome(list: &[Organism]) -> Option<Genome> {
    if list.is_empty() {
        return None;
    }
    let mut sum = [0.0f32; TRAIT_COUNT];
    for org in list {
        for (s, v) in sum.iter_mut().zip(org.genome.to_array()) {
            *s += v;
        }
    }
    let n = list.len() as f32;
    Some(Genome::from_array(sum.map(|s| (s / n).clamp(0.0, 1.0))))
}

fn mean_energy(list: &[Organism]) -> f32 {
    if list.is_empty() {
        0.0
    } else {
        list.iter().map(|o| o.energy).sum::<f32>() / list.len() as f32
    }
}

/// `[spd trn grd cau bit siz]` with two decimals, or `[-]`
fn gene_readout(genes: Option<&Genome>) -> String {
    match genes {
        Some(g) => {
            let values: Vec<String> = g.to_array().iter().map(|v| format!("{:.2}", v)).collect();
            format!("[{}]", values.join(" "))
        }
        None => "[-]".to_string(),
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval in ticks
    pub interval: u64,
}

impl StatsHistory {
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Record a snapshot if `stats.tick` falls on the interval
    pub fn observe(&mut self, stats: &Stats) -> bool {
        if stats.tick % self.interval == 0 {
            self.record(stats.clone());
            true
        } else {
            false
        }
    }

    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    pub fn latest(&self) -> Option<&Stats> {
        self.snapshots.last()
    }

    /// (tick, grazers, hunters) over time
    pub fn population_series(&self) -> Vec<(u64, usize, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.tick, s.grazers, s.hunters))
            .collect()
    }

    pub fn pressure_series(&self) -> Vec<(u64, f32)> {
        self.snapshots.iter().map(|s| (s.tick, s.pressure)).collect()
    }

    /// Number of living species over time
    pub fn species_series(&self) -> Vec<(u64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.tick, s.species.len()))
            .collect()
    }

    /// Largest total population recorded
    pub fn peak_population(&self) -> Option<(u64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.tick, s.population()))
            .max_by_key(|&(_, p)| p)
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_collect_counts_and_genes() {
        let world = World::new_with_seed(Config::default(), 3);
        let stats = Stats::collect(&world);

        assert_eq!(stats.grazers, 1);
        assert_eq!(stats.hunters, 1);
        assert_eq!(stats.species.len(), 2);
        assert!(stats.species.iter().all(|s| s.count == 1));
        assert_eq!(stats.grazer_genes, Some(Genome::GRAZER_SEED));
        assert_eq!(stats.hunter_genes, Some(Genome::HUNTER_SEED));
        assert!(stats.pressure >= 0.0 && stats.pressure <= 1.0);
    }

    #[test]
    fn test_collect_is_idempotent() {
        let mut world = World::new_with_seed(Config::default(), 8);
        world.run(25);
        assert_eq!(Stats::collect(&world), Stats::collect(&world));
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut stats = Stats::new();
        stats.tick = 40;
        stats.grazers = 12;
        stats.hunters = 3;
        let line = stats.summary();
        assert!(line.contains("G:   12"));
        assert!(line.contains("H:   3"));
        assert!(line.ends_with("g[-] h[-]"));
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);

        for i in 0..25 {
            let mut stats = Stats::new();
            stats.tick = i;
            stats.grazers = (i as usize + 1) * 10;
            history.observe(&stats);
        }

        let series = history.population_series();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0], (0, 10, 0));
        assert_eq!(series[2], (20, 210, 0));
        assert_eq!(history.peak_population(), Some((20, 210)));
    }

    #[test]
    fn test_history_save_and_load() {
        let mut world = World::new_with_seed(Config::default(), 21);
        world.run(60);
        let history = world.stats_history.clone();

        let path = std::env::temp_dir().join(format!("grazeworld_history_{}.json", std::process::id()));
        history.save(&path.to_string_lossy()).unwrap();
        let loaded = StatsHistory::load(&path.to_string_lossy()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.interval, history.interval);
        assert_eq!(loaded.latest().map(|s| s.tick), Some(60));
        assert_eq!(loaded.pressure_series().len(), 3);
        assert_eq!(loaded.species_series(), history.species_series());
        assert!(loaded.pressure_series().iter().all(|&(_, p)| (0.0..=1.0).contains(&p)));
    }
}
