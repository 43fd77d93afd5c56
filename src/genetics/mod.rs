//! Genetics module - species clustering and naming.

pub mod naming;
pub mod species;

pub use species::{Assignment, Species, SpeciesId, SpeciesTable};
