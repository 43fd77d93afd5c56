//! Predation system - engagement and energy transfer.

use crate::config::HuntingConfig;
use crate::genome::Genome;
use crate::organism::Organism;

/// Result of an attack attempt
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttackResult {
    /// Energy changed hands
    Hit { stolen: f32, gained: f32, drained: bool },
    /// Target is too far away
    OutOfRange,
}

/// Energy a hunter can steal in one bite
#[inline]
pub fn bite_damage(genome: &Genome, config: &HuntingConfig) -> f32 {
    config.damage * (0.6 + genome.bite) * genome.damage_scale()
}

/// Reach of an attack, growing with body size
#[inline]
pub fn engagement_radius(genome: &Genome, config: &HuntingConfig) -> f32 {
    config.engage_radius + genome.size * config.engage_size_bonus
}

/// Check if an attack can land at the given squared distance
#[inline]
pub fn is_in_range(genome: &Genome, distance_sq: f32, config: &HuntingConfig) -> bool {
    let r = engagement_radius(genome, config);
    distance_sq < r * r
}

/// Move energy from `prey` to `hunter`.
///
/// Steals `min(prey.energy, damage)`; the hunter receives the stolen amount
/// scaled by the conversion efficiency. Prey energy never drops below zero.
pub fn transfer_energy(hunter: &mut Organism, prey: &mut Organism, config: &HuntingConfig) -> AttackResult {
    let damage = bite_damage(&hunter.genome, config);
    let stolen = prey.energy.max(0.0).min(damage);
    prey.energy -= stolen;
    let gained = stolen * config.efficiency;
    hunter.energy += gained;
    AttackResult::Hit {
        stolen,
        gained,
        drained: prey.energy <= 0.0,
    }
}

/// Attack `prey` if it is within reach
pub fn attack(
    hunter: &mut Organism,
    prey: &mut Organism,
    distance_sq: f32,
    config: &HuntingConfig,
) -> AttackResult {
    if is_in_range(&hunter.genome, distance_sq, config) {
        transfer_energy(hunter, prey, config)
    } else {
        AttackResult::OutOfRange
    }
}
