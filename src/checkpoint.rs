//! Checkpoint system for saving and loading simulation state.
//!
//! A checkpoint holds the whole world: tick, field, species table and both
//! population lists. Genomes are stored quantized to `u16` per trait, so a
//! restored trait differs from the saved one by at most
//! [`QuantizedGenome::TOLERANCE`]. Every other field round-trips exactly.

use crate::config::Config;
use crate::genetics::{Species, SpeciesId, SpeciesTable};
use crate::genome::QuantizedGenome;
use crate::grid::PlantField;
use crate::organism::{Organism, OrganismId, OrganismKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"GRZW";

/// Organism as stored in a checkpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganismRecord {
    pub id: OrganismId,
    pub kind: OrganismKind,
    pub generation: u16,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub vx: f32,
    pub vy: f32,
    pub energy: f32,
    pub age: u32,
    pub cooldown: u32,
    pub genome: QuantizedGenome,
    pub species: Option<SpeciesId>,
}

impl From<&Organism> for OrganismRecord {
    fn from(org: &Organism) -> Self {
        Self {
            id: org.id,
            kind: org.kind,
            generation: org.generation,
            x: org.x,
            y: org.y,
            heading: org.heading,
            vx: org.vx,
            vy: org.vy,
            energy: org.energy,
            age: org.age,
            cooldown: org.cooldown,
            genome: QuantizedGenome::encode(&org.genome),
            species: org.species,
        }
    }
}

impl OrganismRecord {
    pub fn to_organism(&self) -> Organism {
        Organism {
            id: self.id,
            kind: self.kind,
            generation: self.generation,
            x: self.x,
            y: self.y,
            heading: self.heading,
            vx: self.vx,
            vy: self.vy,
            energy: self.energy,
            age: self.age,
            cooldown: self.cooldown,
            genome: self.genome.decode(),
            species: self.species,
        }
    }
}

/// Complete simulation state for checkpointing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    pub tick: u64,
    pub config: Config,
    pub field: PlantField,
    pub species: Vec<Species>,
    pub next_species_id: SpeciesId,
    pub grazers: Vec<OrganismRecord>,
    pub hunters: Vec<OrganismRecord>,
    pub next_organism_id: OrganismId,
    /// Seed of the world that produced this checkpoint
    pub random_seed: u64,
}

/// Restorable parts of a validated checkpoint
pub struct CheckpointParts {
    pub tick: u64,
    pub config: Config,
    pub field: PlantField,
    pub species: SpeciesTable,
    pub grazers: Vec<Organism>,
    pub hunters: Vec<Organism>,
    pub next_organism_id: OrganismId,
    pub random_seed: u64,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tick: u64,
        config: Config,
        field: PlantField,
        species: &SpeciesTable,
        grazers: &[Organism],
        hunters: &[Organism],
        next_organism_id: OrganismId,
        random_seed: u64,
    ) -> Self {
        Self {
            version: Self::VERSION,
            tick,
            config,
            field,
            species: species.iter().cloned().collect(),
            next_species_id: species.next_id(),
            grazers: grazers.iter().map(OrganismRecord::from).collect(),
            hunters: hunters.iter().map(OrganismRecord::from).collect(),
            next_organism_id,
            random_seed,
        }
    }

    /// Check version and structure without building anything
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: self.version,
            });
        }
        self.config.validate().map_err(CheckpointError::Structure)?;

        let w = &self.config.world;
        if self.field.width() != w.width
            || self.field.height() != w.height
            || self.field.resolution() != w.grid_resolution
        {
            return Err(CheckpointError::Structure(
                "field shape does not match configuration".to_string(),
            ));
        }
        self.rebuild_field()?;

        let mut ids = HashSet::new();
        for (list, kind) in [(&self.grazers, OrganismKind::Grazer), (&self.hunters, OrganismKind::Hunter)] {
            for rec in list {
                if rec.kind != kind {
                    return Err(CheckpointError::Structure(format!(
                        "organism {} is a {} in the {} list",
                        rec.id,
                        rec.kind.label(),
                        kind.label()
                    )));
                }
                if !ids.insert(rec.id) || rec.id >= self.next_organism_id {
                    return Err(CheckpointError::Structure(format!("bad organism id {}", rec.id)));
                }
                let finite = [rec.x, rec.y, rec.heading, rec.vx, rec.vy, rec.energy]
                    .iter()
                    .all(|v| v.is_finite());
                if !finite || !(0.0..w.width).contains(&rec.x) || !(0.0..w.height).contains(&rec.y) {
                    return Err(CheckpointError::Structure(format!(
                        "organism {} has invalid kinematics",
                        rec.id
                    )));
                }
            }
        }

        SpeciesTable::from_parts(self.species.clone(), self.next_species_id)
            .map(|_| ())
            .map_err(CheckpointError::Structure)
    }

    fn rebuild_field(&self) -> Result<PlantField, CheckpointError> {
        PlantField::from_cells(
            self.field.width(),
            self.field.height(),
            self.field.resolution(),
            self.field.max(),
            self.field.cells().to_vec(),
        )
        .map_err(CheckpointError::Structure)
    }

    /// Validate and convert into live state
    pub fn into_parts(self) -> Result<CheckpointParts, CheckpointError> {
        self.validate()?;
        let field = self.rebuild_field()?;
        let species =
            SpeciesTable::from_parts(self.species, self.next_species_id).map_err(CheckpointError::Structure)?;
        Ok(CheckpointParts {
            tick: self.tick,
            config: self.config,
            field,
            species,
            grazers: self.grazers.iter().map(OrganismRecord::to_organism).collect(),
            hunters: self.hunters.iter().map(OrganismRecord::to_organism).collect(),
            next_organism_id: self.next_organism_id,
            random_seed: self.random_seed,
        })
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write magic bytes followed by the bincode body
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CheckpointError> {
        writer.write_all(MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, CheckpointError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;
        checkpoint.check_version()?;
        Ok(checkpoint)
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Checkpoint = serde_json::from_str(json)?;
        checkpoint.check_version()?;
        Ok(checkpoint)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: self.version,
            });
        }
        Ok(())
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }

    pub fn population(&self) -> usize {
        self.grazers.len() + self.hunters.len()
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    Json(serde_json::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
    Structure(String),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
            Self::Structure(msg) => write!(f, "Invalid structure: {}", msg),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Periodic checkpoint files with retention
pub struct CheckpointManager {
    pub base_dir: String,
    /// Ticks between checkpoints
    pub interval: u64,
    /// Maximum checkpoints to keep
    pub max_checkpoints: usize,
    last_checkpoint: u64,
}

impl CheckpointManager {
    pub fn new(base_dir: String, interval: u64, max_checkpoints: usize) -> Self {
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            log::warn!("Could not create checkpoint directory {}: {}", base_dir, e);
        }

        Self {
            base_dir,
            interval: interval.max(1),
            max_checkpoints,
            last_checkpoint: 0,
        }
    }

    pub fn should_save(&self, tick: u64) -> bool {
        tick > 0 && tick % self.interval == 0 && tick != self.last_checkpoint
    }

    pub fn checkpoint_path(&self, tick: u64) -> String {
        format!("{}/checkpoint_{:010}.bin", self.base_dir, tick)
    }

    /// Save checkpoint and prune old ones
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<String, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.tick);
        checkpoint.save(&path)?;
        self.last_checkpoint = checkpoint.tick;
        self.cleanup()?;
        Ok(path)
    }

    fn checkpoint_files(&self) -> Result<Vec<std::fs::DirEntry>, CheckpointError> {
        let mut files: Vec<_> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("checkpoint_"))
            .collect();
        files.sort_by_key(|e| e.file_name());
        Ok(files)
    }

    fn cleanup(&self) -> Result<(), CheckpointError> {
        let files = self.checkpoint_files()?;
        if files.len() > self.max_checkpoints {
            let to_remove = files.len() - self.max_checkpoints;
            for entry in files.into_iter().take(to_remove) {
                log::debug!("Removing old checkpoint {}", entry.path().display());
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Latest checkpoint file in the directory
    pub fn find_latest(&self) -> Option<String> {
        self.checkpoint_files()
            .ok()?
            .last()
            .map(|e| e.path().to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;

    fn test_checkpoint() -> Checkpoint {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        field.deposit(100.0, 100.0, 0.5);
        let mut species = SpeciesTable::new();
        let sid = species.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        let mut grazer = Organism::new(0, OrganismKind::Grazer, 10.0, 20.0, 1.0, Genome::GRAZER_SEED, &config);
        grazer.species = Some(sid);
        let hunter = Organism::new(1, OrganismKind::Hunter, 30.0, 40.0, 2.0, Genome::HUNTER_SEED, &config);
        Checkpoint::new(1000, config, field, &species, &[grazer], &[hunter], 2, 12345)
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("grazeworld_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let checkpoint = test_checkpoint();
        let path = temp_path("roundtrip.bin");

        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn test_json_roundtrip() {
        let checkpoint = test_checkpoint();
        let json = checkpoint.to_json().unwrap();
        let loaded = Checkpoint::from_json(&json).unwrap();
        assert_eq!(loaded, checkpoint);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_genome_within_tolerance() {
        let checkpoint = test_checkpoint();
        let parts = checkpoint.into_parts().unwrap();
        let restored = parts.grazers[0].genome;
        for (a, b) in restored.to_array().iter().zip(Genome::GRAZER_SEED.to_array()) {
            assert!((a - b).abs() <= QuantizedGenome::TOLERANCE);
        }
        assert_eq!(parts.grazers[0].x, 10.0);
        assert_eq!(parts.hunters[0].heading, 2.0);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let bytes = b"NOPE1234".to_vec();
        let err = Checkpoint::read_from(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, CheckpointError::InvalidFormat(_)));
    }

    #[test]
    fn test_rejects_version() {
        let mut checkpoint = test_checkpoint();
        checkpoint.version = 99;
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert!(matches!(
            Checkpoint::from_json(&json),
            Err(CheckpointError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_rejects_structure() {
        let mut wrong_list = test_checkpoint();
        let hunter = wrong_list.hunters.remove(0);
        wrong_list.grazers.push(hunter);
        assert!(matches!(wrong_list.validate(), Err(CheckpointError::Structure(_))));

        let mut duplicate = test_checkpoint();
        duplicate.hunters[0].id = 0;
        assert!(matches!(duplicate.validate(), Err(CheckpointError::Structure(_))));

        let mut outside = test_checkpoint();
        outside.grazers[0].x = -5.0;
        assert!(matches!(outside.validate(), Err(CheckpointError::Structure(_))));

        let mut species = test_checkpoint();
        species.next_species_id = 0;
        assert!(matches!(species.validate(), Err(CheckpointError::Structure(_))));
    }

    #[test]
    fn test_checkpoint_manager_retention() {
        let dir = temp_path("manager");
        let dir_str = dir.to_string_lossy().to_string();
        let mut manager = CheckpointManager::new(dir_str, 10, 2);
        let mut checkpoint = test_checkpoint();

        for tick in [10, 20, 30] {
            checkpoint.tick = tick;
            assert!(manager.should_save(tick));
            manager.save(&checkpoint).unwrap();
            assert!(!manager.should_save(tick));
        }

        let latest = manager.find_latest().unwrap();
        assert!(latest.ends_with("checkpoint_0000000030.bin"));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }
}
