//! Six-trait genome shared by grazers and hunters.
//!
//! Every trait lives in `[0, 1]`. Size trades speed and vision for reach,
//! damage and metabolic cost; the scaling helpers below are the single place
//! those trade-offs are defined.

use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Number of traits in a genome
pub const TRAIT_COUNT: usize = 6;

/// Trait identifiers, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trait {
    Speed,
    Turn,
    Greed,
    Caution,
    Bite,
    Size,
}

impl Trait {
    pub const ALL: [Trait; TRAIT_COUNT] = [
        Trait::Speed,
        Trait::Turn,
        Trait::Greed,
        Trait::Caution,
        Trait::Bite,
        Trait::Size,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trait::Speed => "speed",
            Trait::Turn => "turn",
            Trait::Greed => "greed",
            Trait::Caution => "caution",
            Trait::Bite => "bite",
            Trait::Size => "size",
        }
    }
}

/// Heritable traits of one organism
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub speed: f32,
    pub turn: f32,
    /// Feeding and chase aggressiveness
    pub greed: f32,
    /// Predator avoidance (grazers)
    pub caution: f32,
    /// Attack strength (hunters)
    pub bite: f32,
    pub size: f32,
}

impl Genome {
    /// Founding grazer genome
    pub const GRAZER_SEED: Genome = Genome {
        speed: 0.55,
        turn: 0.45,
        greed: 0.5,
        caution: 0.4,
        bite: 0.2,
        size: 0.4,
    };

    /// Founding hunter genome
    pub const HUNTER_SEED: Genome = Genome {
        speed: 0.5,
        turn: 0.45,
        greed: 0.5,
        caution: 0.2,
        bite: 0.45,
        size: 0.5,
    };

    pub fn from_array(values: [f32; TRAIT_COUNT]) -> Self {
        let [speed, turn, greed, caution, bite, size] = values;
        Self {
            speed,
            turn,
            greed,
            caution,
            bite,
            size,
        }
    }

    pub fn to_array(&self) -> [f32; TRAIT_COUNT] {
        [self.speed, self.turn, self.greed, self.caution, self.bite, self.size]
    }

    pub fn get(&self, t: Trait) -> f32 {
        self.to_array()[t as usize]
    }

    /// Euclidean distance over all six traits
    pub fn distance(&self, other: &Genome) -> f32 {
        distance(&self.to_array(), &other.to_array())
    }

    /// Copy with each trait independently perturbed with probability `rate`
    /// by a uniform draw in `[-strength, strength]`, clamped to `[0, 1]`.
    pub fn mutated<R: RandomSource + ?Sized>(&self, rate: f32, strength: f32, rng: &mut R) -> Genome {
        let mut values = self.to_array();
        for v in values.iter_mut() {
            if rng.chance(rate) {
                *v = (*v + rng.signed() * strength).clamp(0.0, 1.0);
            }
        }
        let child = Genome::from_array(values);
        debug_assert!(child.is_valid());
        child
    }

    /// True when every trait lies within `[0, 1]`
    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|v| (0.0..=1.0).contains(v))
    }

    // Size trade-offs

    /// Speed multiplier, smaller for larger bodies
    #[inline]
    pub fn speed_scale(&self) -> f32 {
        1.0 - 0.35 * self.size
    }

    /// Vision multiplier, smaller for larger bodies
    #[inline]
    pub fn vision_scale(&self) -> f32 {
        1.0 - 0.3 * self.size
    }

    /// Metabolic and movement cost multiplier
    #[inline]
    pub fn body_cost(&self) -> f32 {
        0.7 + 0.6 * self.size
    }

    /// Damage multiplier for attacks
    #[inline]
    pub fn damage_scale(&self) -> f32 {
        0.7 + 0.6 * self.size
    }

    /// Feeding rate multiplier
    #[inline]
    pub fn intake_scale(&self) -> f32 {
        0.8 + 0.4 * self.size
    }

    /// Nutrients returned on death, relative to the configured base
    #[inline]
    pub fn corpse_scale(&self) -> f32 {
        0.6 + 0.8 * self.size
    }

    /// Reproduction chance multiplier, smaller for larger bodies
    #[inline]
    pub fn fertility_scale(&self) -> f32 {
        1.0 - 0.4 * self.size
    }
}

/// Euclidean distance between two trait vectors
pub fn distance(a: &[f32; TRAIT_COUNT], b: &[f32; TRAIT_COUNT]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Genome stored at 16-bit precision per trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedGenome(pub [u16; TRAIT_COUNT]);

impl QuantizedGenome {
    /// Largest error introduced by quantizing a trait
    pub const TOLERANCE: f32 = 0.5 / u16::MAX as f32;

    pub fn encode(genome: &Genome) -> Self {
        let mut out = [0u16; TRAIT_COUNT];
        for (q, v) in out.iter_mut().zip(genome.to_array()) {
            *q = (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16;
        }
        Self(out)
    }

    pub fn decode(&self) -> Genome {
        let mut values = [0.0f32; TRAIT_COUNT];
        for (v, q) in values.iter_mut().zip(self.0) {
            *v = q as f32 / u16::MAX as f32;
        }
        Genome::from_array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRng, SimRng};

    #[test]
    fn test_array_order_matches_traits() {
        let g = Genome::GRAZER_SEED;
        assert_eq!(g.get(Trait::Caution), g.caution);
        assert_eq!(g.get(Trait::Size), g.size);
        assert_eq!(Genome::from_array(g.to_array()), g);
    }

    #[test]
    fn test_distance() {
        let a = Genome::from_array([0.0; 6]);
        let b = Genome::from_array([0.0, 0.0, 0.0, 0.3, 0.4, 0.0]);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
        assert_eq!(b.distance(&b), 0.0);
    }

    #[test]
    fn test_mutation_stays_in_unit_range() {
        let mut rng = SimRng::seed_from_u64(11);
        let mut g = Genome::HUNTER_SEED;
        for _ in 0..2000 {
            g = g.mutated(0.5, 0.4, &mut rng);
            assert!(g.is_valid());
        }
    }

    #[test]
    fn test_mutation_forced_down() {
        // chance draw 0.0 passes, signed draw 0.0 -> -1.0
        let mut rng = ScriptedRng::constant(0.0);
        let g = Genome::GRAZER_SEED.mutated(1.0, 1.0, &mut rng);
        assert_eq!(g, Genome::from_array([0.0; 6]));
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let mut rng = SimRng::seed_from_u64(1);
        let g = Genome::GRAZER_SEED.mutated(0.0, 0.5, &mut rng);
        assert_eq!(g, Genome::GRAZER_SEED);
    }

    #[test]
    fn test_quantization_tolerance() {
        let mut rng = SimRng::seed_from_u64(5);
        for _ in 0..500 {
            let g = Genome::from_array(std::array::from_fn(|_| rng.next_f32()));
            let back = QuantizedGenome::encode(&g).decode();
            for (a, b) in g.to_array().iter().zip(back.to_array()) {
                assert!((a - b).abs() <= QuantizedGenome::TOLERANCE + f32::EPSILON);
            }
        }
    }

    #[test]
    fn test_size_tradeoffs() {
        let small = Genome { size: 0.0, ..Genome::GRAZER_SEED };
        let large = Genome { size: 1.0, ..Genome::GRAZER_SEED };
        assert!(large.speed_scale() < small.speed_scale());
        assert!(large.vision_scale() < small.vision_scale());
        assert!(large.body_cost() > small.body_cost());
        assert!(large.corpse_scale() > small.corpse_scale());
        assert!(large.fertility_scale() < small.fertility_scale());
    }
}
