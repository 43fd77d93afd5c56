//! Performance benchmarks for GRAZEWORLD

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grazeworld::behavior::{Behavior, Grazing, Surroundings};
use grazeworld::checkpoint::Checkpoint;
use grazeworld::genetics::SpeciesTable;
use grazeworld::grid::PlantField;
use grazeworld::{Config, Genome, OrganismKind, SimRng, World};

/// A world that has had time to fill up
fn grown_world(ticks: u64) -> World {
    let mut world = World::new_with_seed(Config::default(), 42);
    for _ in 0..ticks {
        world.step();
        world.apply_reseed_policy();
    }
    world
}

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for ticks in [0u64, 2000, 6000].iter() {
        let mut world = grown_world(*ticks);

        group.bench_with_input(BenchmarkId::new("after_ticks", ticks), ticks, |b, _| {
            b.iter(|| {
                world.step();
                world.apply_reseed_policy();
            });
        });
    }

    group.finish();
}

fn benchmark_field(c: &mut Criterion) {
    let config = Config::default();
    let mut field = PlantField::from_config(&config.world);
    field.reset(&config.world, &mut SimRng::seed_from_u64(1));

    c.bench_function("field_regrow", |b| {
        b.iter(|| field.regrow(black_box(0.015)));
    });

    c.bench_function("field_sample", |b| {
        b.iter(|| field.sample(black_box(123.4), black_box(456.7)));
    });
}

fn benchmark_sensing(c: &mut Criterion) {
    let mut world = grown_world(2000);
    let World {
        field,
        grazers,
        hunters,
        config,
        ..
    } = &mut world;
    let Some(grazer) = grazers.first().cloned() else {
        return;
    };
    let env = Surroundings {
        field,
        threats: hunters,
        prey: &mut [],
        pressure: 0.5,
        config,
    };

    c.bench_function("grazer_sense", |b| {
        b.iter(|| Grazing.sense(black_box(&grazer), &env));
    });
}

fn benchmark_speciation(c: &mut Criterion) {
    let config = Config::default();
    let mut rng = SimRng::seed_from_u64(3);

    c.bench_function("species_assign", |b| {
        let mut table = SpeciesTable::new();
        let parent = table.found(OrganismKind::Grazer, &Genome::GRAZER_SEED, 0);
        b.iter(|| {
            let genome = Genome::GRAZER_SEED.mutated(0.5, 0.3, &mut rng);
            table.assign(OrganismKind::Grazer, Some(parent), &genome, 0, &config.speciation)
        });
    });
}

fn benchmark_checkpoint(c: &mut Criterion) {
    let world = grown_world(2000);
    let checkpoint = world.create_checkpoint();

    c.bench_function("checkpoint_serialize", |b| {
        b.iter(|| bincode::serialize(black_box(&checkpoint)).unwrap());
    });

    let serialized = bincode::serialize(&checkpoint).unwrap();

    c.bench_function("checkpoint_deserialize", |b| {
        b.iter(|| {
            let _: Checkpoint = bincode::deserialize(black_box(&serialized)).unwrap();
        });
    });

    c.bench_function("checkpoint_restore", |b| {
        b.iter(|| World::from_checkpoint(black_box(checkpoint.clone())).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_world_step,
    benchmark_field,
    benchmark_sensing,
    benchmark_speciation,
    benchmark_checkpoint,
);

criterion_main!(benches);
