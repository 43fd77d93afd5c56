//! Per-kind control policies.
//!
//! Grazers and hunters share one organism record; what differs is how they
//! read their surroundings and act on them. [`Behavior`] splits a tick into
//! `sense`, `steer`, `act` and `metabolize`, and [`OrganismKind`] dispatches
//! to [`Grazing`] or [`Hunting`].

use crate::config::{Config, OrganismConfig};
use crate::ecology::{attack, crowd_cost_factor, AttackResult, Census};
use crate::grid::PlantField;
use crate::organism::{Organism, OrganismKind};
use crate::rng::RandomSource;
use std::f32::consts::TAU;

/// Everything an organism can see and touch during its behavior phase
pub struct Surroundings<'a> {
    pub field: &'a mut PlantField,
    /// Hunters, as seen by grazers
    pub threats: &'a [Organism],
    /// Grazers, as seen and bitten by hunters
    pub prey: &'a mut [Organism],
    pub pressure: f32,
    pub config: &'a Config,
}

/// A grazer picked up by a hunter's scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub distance_sq: f32,
}

/// Result of sensing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percept {
    Forage {
        /// Unwrapped endpoint of the densest vision ray
        best: (f32, f32),
        best_density: f32,
        /// Position of a hunter close enough to flee from
        threat: Option<(f32, f32)>,
    },
    Hunt {
        target: Option<Target>,
    },
}

/// What the act phase did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Fed { eaten: f32 },
    Attacked(AttackResult),
    Idle,
}

/// One control policy, split by lifecycle phase
pub trait Behavior {
    fn sense(&self, org: &Organism, env: &Surroundings<'_>) -> Percept;

    fn steer<R: RandomSource + ?Sized>(&self, org: &mut Organism, percept: &Percept, config: &Config, rng: &mut R);

    fn act(&self, org: &mut Organism, percept: &Percept, env: &mut Surroundings<'_>) -> Outcome;

    fn metabolize(&self, org: &mut Organism, crowd_factor: f32, config: &Config);

    /// Hard gate checked before any reproduction draw
    fn may_reproduce(&self, org: &Organism, field: &PlantField, census: Census, config: &Config) -> bool;
}

/// Grazer policy: forage plants, flee hunters
#[derive(Debug, Clone, Copy, Default)]
pub struct Grazing;

/// Hunter policy: chase and bite grazers
#[derive(Debug, Clone, Copy, Default)]
pub struct Hunting;

impl Behavior for Grazing {
    fn sense(&self, org: &Organism, env: &Surroundings<'_>) -> Percept {
        let cfg = &env.config.grazing;
        let vision = cfg.vision * org.genome.vision_scale();
        let center = (cfg.rays as f32 - 1.0) / 2.0;

        let mut best_density = -1.0;
        let mut best = (org.x, org.y);
        for i in 0..cfg.rays {
            let angle = org.heading + (i as f32 - center) * cfg.ray_spacing;
            let ex = org.x + angle.cos() * vision;
            let ey = org.y + angle.sin() * vision;
            let (sx, sy) = env.field.wrap(ex, ey);
            let density = env.field.sample(sx, sy);
            if density > best_density {
                best_density = density;
                best = (ex, ey);
            }
        }

        let danger = cfg.danger_radius * (1.0 + 0.2 * org.genome.size);
        let threat = nearest(env.threats.iter(), org.x, org.y)
            .filter(|&(_, d)| d < danger * danger && org.genome.caution > cfg.caution_floor)
            .map(|(i, _)| (env.threats[i].x, env.threats[i].y));

        Percept::Forage {
            best,
            best_density,
            threat,
        }
    }

    fn steer<R: RandomSource + ?Sized>(&self, org: &mut Organism, percept: &Percept, config: &Config, rng: &mut R) {
        let Percept::Forage { best, threat, .. } = *percept else {
            return;
        };
        let cfg = &config.grazing;

        if let Some((hx, hy)) = threat {
            let away = (org.x + (org.x - hx), org.y + (org.y - hy));
            steer_toward(org, away.0, away.1, cfg.flee_strength * org.genome.caution, &config.organisms);
        } else {
            let chase = 0.2 + org.genome.greed * 1.1;
            steer_toward(org, best.0, best.1, chase, &config.organisms);
            if rng.chance(cfg.wander_chance * (1.0 - org.genome.greed)) {
                wander(org, rng);
            }
        }
    }

    fn act(&self, org: &mut Organism, _percept: &Percept, env: &mut Surroundings<'_>) -> Outcome {
        let cfg = &env.config.grazing;
        let bite = cfg.eat_rate * (0.7 + org.genome.greed) * org.genome.intake_scale();
        let eaten = env.field.consume(org.x, org.y, bite);
        org.energy += eaten * cfg.feed_efficiency;
        Outcome::Fed { eaten }
    }

    fn metabolize(&self, org: &mut Organism, crowd_factor: f32, config: &Config) {
        org.energy -= config.grazing.hunger * org.genome.body_cost() * crowd_factor;
    }

    fn may_reproduce(&self, org: &Organism, field: &PlantField, _census: Census, config: &Config) -> bool {
        field.sample(org.x, org.y) > config.grazing.reproduction_density
    }
}

impl Behavior for Hunting {
    fn sense(&self, org: &Organism, env: &Surroundings<'_>) -> Percept {
        let vision = env.config.hunting.vision * org.genome.vision_scale();
        let target = nearest(env.prey.iter(), org.x, org.y)
            .filter(|&(_, d)| d < vision * vision)
            .map(|(index, distance_sq)| Target {
                index,
                x: env.prey[index].x,
                y: env.prey[index].y,
                distance_sq,
            });
        Percept::Hunt { target }
    }

    fn steer<R: RandomSource + ?Sized>(&self, org: &mut Organism, percept: &Percept, config: &Config, rng: &mut R) {
        let Percept::Hunt { target } = *percept else {
            return;
        };
        match target {
            Some(t) => {
                let strength = 0.7 + org.genome.bite;
                steer_toward(org, t.x, t.y, strength, &config.organisms);
            }
            None => {
                if rng.chance(config.hunting.patrol_chance) {
                    wander(org, rng);
                }
            }
        }
    }

    fn act(&self, org: &mut Organism, percept: &Percept, env: &mut Surroundings<'_>) -> Outcome {
        let Percept::Hunt { target: Some(t) } = *percept else {
            return Outcome::Idle;
        };
        match env.prey.get_mut(t.index) {
            Some(prey) => Outcome::Attacked(attack(org, prey, t.distance_sq, &env.config.hunting)),
            None => Outcome::Idle,
        }
    }

    fn metabolize(&self, org: &mut Organism, crowd_factor: f32, config: &Config) {
        org.energy -= config.hunting.hunger * org.genome.body_cost() * crowd_factor;
    }

    fn may_reproduce(&self, _org: &Organism, _field: &PlantField, census: Census, config: &Config) -> bool {
        let cfg = &config.hunting;
        census.grazers > cfg.prey_floor && census.grazers as f32 > census.hunters as f32 * cfg.prey_ratio
    }
}

impl Behavior for OrganismKind {
    fn sense(&self, org: &Organism, env: &Surroundings<'_>) -> Percept {
        match self {
            OrganismKind::Grazer => Grazing.sense(org, env),
            OrganismKind::Hunter => Hunting.sense(org, env),
        }
    }

    fn steer<R: RandomSource + ?Sized>(&self, org: &mut Organism, percept: &Percept, config: &Config, rng: &mut R) {
        match self {
            OrganismKind::Grazer => Grazing.steer(org, percept, config, rng),
            OrganismKind::Hunter => Hunting.steer(org, percept, config, rng),
        }
    }

    fn act(&self, org: &mut Organism, percept: &Percept, env: &mut Surroundings<'_>) -> Outcome {
        match self {
            OrganismKind::Grazer => Grazing.act(org, percept, env),
            OrganismKind::Hunter => Hunting.act(org, percept, env),
        }
    }

    fn metabolize(&self, org: &mut Organism, crowd_factor: f32, config: &Config) {
        match self {
            OrganismKind::Grazer => Grazing.metabolize(org, crowd_factor, config),
            OrganismKind::Hunter => Hunting.metabolize(org, crowd_factor, config),
        }
    }

    fn may_reproduce(&self, org: &Organism, field: &PlantField, census: Census, config: &Config) -> bool {
        match self {
            OrganismKind::Grazer => Grazing.may_reproduce(org, field, census, config),
            OrganismKind::Hunter => Hunting.may_reproduce(org, field, census, config),
        }
    }
}

/// Run one organism through a full behavior tick, then move it
pub fn run<R: RandomSource + ?Sized>(org: &mut Organism, env: &mut Surroundings<'_>, rng: &mut R) -> Outcome {
    let kind = org.kind;
    let percept = kind.sense(org, env);
    kind.steer(org, &percept, env.config, rng);
    let outcome = kind.act(org, &percept, env);

    let crowd = crowd_cost_factor(env.pressure, &env.config.regulation);
    kind.metabolize(org, crowd, env.config);
    org.advance(env.config, crowd);
    outcome
}

/// Index and squared distance of the closest organism
fn nearest<'a, I>(organisms: I, x: f32, y: f32) -> Option<(usize, f32)>
where
    I: Iterator<Item = &'a Organism>,
{
    let mut best: Option<(usize, f32)> = None;
    for (i, other) in organisms.enumerate() {
        let d = other.distance_sq_to(x, y);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best
}

/// Signed shortest difference `a - b`, in `(-π, π]`
#[inline]
pub fn angle_difference(a: f32, b: f32) -> f32 {
    let d = a - b;
    d.sin().atan2(d.cos())
}

/// Turn toward a point, never faster than the per-tick turn rate
pub fn steer_toward(org: &mut Organism, tx: f32, ty: f32, strength: f32, config: &OrganismConfig) {
    let bearing = (ty - org.y).atan2(tx - org.x);
    let delta = angle_difference(bearing, org.heading);
    let max_turn = max_turn_rate(org, strength, config);
    org.heading = (org.heading + delta.clamp(-max_turn, max_turn)).rem_euclid(TAU);
}

/// Largest heading change allowed this tick
#[inline]
pub fn max_turn_rate(org: &Organism, strength: f32, config: &OrganismConfig) -> f32 {
    (config.turn_base + org.genome.turn * config.turn_gain) * strength.max(0.0)
}

/// Small random heading perturbation, larger for sluggish turners
pub fn wander<R: RandomSource + ?Sized>(org: &mut Organism, rng: &mut R) {
    let jitter = 0.02 + (1.0 - org.genome.turn) * 0.05;
    org.heading = (org.heading + rng.signed() * jitter).rem_euclid(TAU);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;
    use crate::rng::ScriptedRng;
    use std::f32::consts::PI;

    fn make(kind: OrganismKind, x: f32, y: f32, config: &Config) -> Organism {
        Organism::new(0, kind, x, y, 0.0, kind.seed_genome(), config)
    }

    #[test]
    fn test_angle_difference_shortest() {
        assert!((angle_difference(0.1, TAU - 0.1) - 0.2).abs() < 1e-5);
        assert!((angle_difference(TAU - 0.1, 0.1) + 0.2).abs() < 1e-5);
        assert!((angle_difference(PI / 2.0, 0.0) - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_steering_clamped_to_turn_rate() {
        let config = Config::default();
        let mut org = make(OrganismKind::Grazer, 100.0, 100.0, &config);
        let rate = max_turn_rate(&org, 1.0, &config.organisms);

        // Target directly behind
        steer_toward(&mut org, 50.0, 100.0, 1.0, &config.organisms);

        assert!((angle_difference(org.heading, 0.0).abs() - rate).abs() < 1e-5);
    }

    #[test]
    fn test_steering_reaches_small_offsets_exactly() {
        let config = Config::default();
        let mut org = make(OrganismKind::Grazer, 0.0, 0.0, &config);
        let angle: f32 = 0.01;
        steer_toward(&mut org, angle.cos() * 10.0, angle.sin() * 10.0, 1.0, &config.organisms);
        assert!((org.heading - angle).abs() < 1e-5);
    }

    #[test]
    fn test_grazer_flees_nearby_hunter() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        // Ahead and slightly to the left, so the escape turn is clockwise
        let hunters = vec![make(OrganismKind::Hunter, 110.0, 105.0, &config)];
        let mut grazer = make(OrganismKind::Grazer, 100.0, 100.0, &config);
        let env = Surroundings {
            field: &mut field,
            threats: &hunters,
            prey: &mut [],
            pressure: 0.0,
            config: &config,
        };

        let percept = Grazing.sense(&grazer, &env);
        assert!(matches!(percept, Percept::Forage { threat: Some((x, y)), .. } if x == 110.0 && y == 105.0));

        let mut rng = ScriptedRng::constant(0.99);
        grazer.heading = 0.0;
        let rate = max_turn_rate(&grazer, config.grazing.flee_strength * grazer.genome.caution, &config.organisms);
        assert!(rate > 0.0 && rate < 1.0);
        Grazing.steer(&mut grazer, &percept, &config, &mut rng);

        assert!((angle_difference(grazer.heading, 0.0) + rate).abs() < 1e-5);
        assert!((grazer.heading - (TAU - rate)).abs() < 1e-4);
    }

    #[test]
    fn test_timid_grazer_ignores_hunter() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        let hunters = vec![make(OrganismKind::Hunter, 110.0, 100.0, &config)];
        let mut grazer = make(OrganismKind::Grazer, 100.0, 100.0, &config);
        grazer.genome.caution = 0.0;
        let env = Surroundings {
            field: &mut field,
            threats: &hunters,
            prey: &mut [],
            pressure: 0.0,
            config: &config,
        };

        assert!(matches!(Grazing.sense(&grazer, &env), Percept::Forage { threat: None, .. }));
    }

    #[test]
    fn test_grazer_sees_densest_ray() {
        let mut config = Config::default();
        config.world.grid_resolution = 12;
        config.grazing.rays = 2;
        config.grazing.ray_spacing = PI;
        let mut field = PlantField::from_config(&config.world);
        // Column 5, rows 6 and 7: below the grazer in screen terms (+y)
        field.deposit(401.0, 350.0, 1.0);
        field.deposit(401.0, 400.0, 1.0);
        let grazer = make(OrganismKind::Grazer, 400.0, 320.0, &config);
        let env = Surroundings {
            field: &mut field,
            threats: &[],
            prey: &mut [],
            pressure: 0.0,
            config: &config,
        };

        let Percept::Forage { best, best_density, .. } = Grazing.sense(&grazer, &env) else {
            panic!("grazers forage");
        };
        let vision = config.grazing.vision * grazer.genome.vision_scale();
        assert!((best_density - 1.0).abs() < 1e-4);
        assert!((best.1 - (320.0 + vision)).abs() < 1e-3);
    }

    #[test]
    fn test_feeding_bounded_by_field() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        field.deposit(10.0, 10.0, 0.05);
        let mut grazer = make(OrganismKind::Grazer, 10.0, 10.0, &config);
        let before_energy = grazer.energy;
        let before_total = field.total();
        let mut env = Surroundings {
            field: &mut field,
            threats: &[],
            prey: &mut [],
            pressure: 0.0,
            config: &config,
        };
        let percept = Grazing.sense(&grazer, &env);

        let Outcome::Fed { eaten } = Grazing.act(&mut grazer, &percept, &mut env) else {
            panic!("grazers feed");
        };

        assert!((eaten - 0.05).abs() < 1e-6);
        assert!(field.total() <= before_total);
        assert!((grazer.energy - before_energy - eaten * config.grazing.feed_efficiency).abs() < 1e-6);
    }

    #[test]
    fn test_hunter_targets_nearest_in_vision() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        let mut grazers = vec![
            make(OrganismKind::Grazer, 130.0, 100.0, &config),
            make(OrganismKind::Grazer, 110.0, 100.0, &config),
            make(OrganismKind::Grazer, 500.0, 500.0, &config),
        ];
        let hunter = make(OrganismKind::Hunter, 100.0, 100.0, &config);
        let env = Surroundings {
            field: &mut field,
            threats: &[],
            prey: &mut grazers,
            pressure: 0.0,
            config: &config,
        };

        let Percept::Hunt { target: Some(t) } = Hunting.sense(&hunter, &env) else {
            panic!("expected a target");
        };
        assert_eq!(t.index, 1);
        assert!((t.distance_sq - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_hunter_ignores_prey_beyond_vision() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        let mut grazers = vec![make(OrganismKind::Grazer, 300.0, 100.0, &config)];
        let hunter = make(OrganismKind::Hunter, 100.0, 100.0, &config);
        let env = Surroundings {
            field: &mut field,
            threats: &[],
            prey: &mut grazers,
            pressure: 0.0,
            config: &config,
        };
        assert_eq!(Hunting.sense(&hunter, &env), Percept::Hunt { target: None });
    }

    #[test]
    fn test_hunter_bite_in_range() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        let mut grazers = vec![make(OrganismKind::Grazer, 103.0, 100.0, &config)];
        grazers[0].energy = 1.0;
        let mut hunter = make(OrganismKind::Hunter, 100.0, 100.0, &config);
        let hunter_before = hunter.energy;
        let mut env = Surroundings {
            field: &mut field,
            threats: &[],
            prey: &mut grazers,
            pressure: 0.0,
            config: &config,
        };

        let percept = Hunting.sense(&hunter, &env);
        let outcome = Hunting.act(&mut hunter, &percept, &mut env);

        let Outcome::Attacked(AttackResult::Hit { stolen, .. }) = outcome else {
            panic!("expected a hit, got {:?}", outcome);
        };
        assert!((grazers[0].energy - (1.0 - stolen)).abs() < 1e-6);
        assert!((hunter.energy - (hunter_before + stolen * config.hunting.efficiency)).abs() < 1e-6);
    }

    #[test]
    fn test_hunter_reproduction_gate() {
        let config = Config::default();
        let field = PlantField::from_config(&config.world);
        let hunter = make(OrganismKind::Hunter, 0.0, 0.0, &config);
        assert!(!Hunting.may_reproduce(&hunter, &field, Census::new(10, 1), &config));
        assert!(!Hunting.may_reproduce(&hunter, &field, Census::new(30, 20), &config));
        assert!(Hunting.may_reproduce(&hunter, &field, Census::new(30, 5), &config));
    }

    #[test]
    fn test_grazer_reproduction_gate() {
        let config = Config::default();
        let mut field = PlantField::from_config(&config.world);
        let grazer = make(OrganismKind::Grazer, 50.0, 50.0, &config);
        assert!(!Grazing.may_reproduce(&grazer, &field, Census::default(), &config));
        field.fill(1.0);
        assert!(Grazing.may_reproduce(&grazer, &field, Census::default(), &config));
    }

    #[test]
    fn test_metabolism_hunters_hungrier() {
        let config = Config::default();
        let mut g = make(OrganismKind::Grazer, 0.0, 0.0, &config);
        let mut h = make(OrganismKind::Hunter, 0.0, 0.0, &config);
        g.genome.size = 0.5;
        h.genome.size = 0.5;
        OrganismKind::Grazer.metabolize(&mut g, 1.0, &config);
        OrganismKind::Hunter.metabolize(&mut h, 1.0, &config);
        assert!(h.energy < g.energy);
    }
}
