//! Ecological couplings between the two populations.
//!
//! This module contains:
//! - Population pressure (soft density regulation)
//! - Predation (hunter/grazer energy transfer)

pub mod predation;
pub mod pressure;

pub use predation::{attack, bite_damage, engagement_radius, transfer_energy, AttackResult};
pub use pressure::{crowd_cost_factor, population_pressure, reproduction_chance, Census};
