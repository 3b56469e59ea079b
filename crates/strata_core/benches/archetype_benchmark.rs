//! # Archetype Storage Benchmarks
//!
//! Measures:
//! 1. Entity creation into the root archetype
//! 2. Structural transitions along memoized edges
//! 3. Select over one large archetype
//! 4. Select over a table left half tombstoned

#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::{Component, EntityId, Query, World, WorldConfig};

const ENTITY_COUNT: usize = 100_000;

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f64,
    y: f64,
}
impl Component for Position {}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    dx: f64,
    dy: f64,
}
impl Component for Velocity {}

#[derive(Debug, Clone, Copy)]
struct Frozen;
impl Component for Frozen {}

fn world_with_moving(count: usize) -> (World, Vec<EntityId>) {
    let mut world = World::with_config(WorldConfig::with_capacity(count + 16)).unwrap();
    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let entity = world.create_entity().unwrap();
        entities.push(entity);
        world
            .set_component(entity, Position { x: i as f64, y: 0.0 })
            .unwrap();
        world
            .set_component(entity, Velocity { dx: 1.0, dy: 0.5 })
            .unwrap();
    }
    (world, entities)
}

fn integrate(world: &mut World, query: &Query) -> usize {
    world
        .select(query, |mut view| {
            let Ok(Some(&velocity)) = view.get::<Velocity>() else {
                return;
            };
            if let Ok(Some(position)) = view.get_mut::<Position>() {
                position.x += velocity.dx;
                position.y += velocity.dy;
            }
        })
        .unwrap()
}

// =============================================================================
// CREATION
// =============================================================================

fn bench_create_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");
    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut world = World::with_config(WorldConfig::with_capacity(count + 1)).unwrap();
                for _ in 0..count {
                    black_box(world.create_entity().unwrap());
                }
                world
            });
        });
    }
    group.finish();
}

// =============================================================================
// STRUCTURAL TRANSITIONS
// =============================================================================

fn bench_add_remove_cycle(c: &mut Criterion) {
    let (mut world, _) = world_with_moving(10_000);
    let entity = world.create_entity().unwrap();
    world
        .set_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();

    c.bench_function("add_remove_frozen", |b| {
        b.iter(|| {
            world.add_component::<Frozen>(black_box(entity)).unwrap();
            world.remove_component::<Frozen>(black_box(entity)).unwrap();
        });
    });
}

// =============================================================================
// QUERIES
// =============================================================================

fn bench_select_dense(c: &mut Criterion) {
    let (mut world, _) = world_with_moving(ENTITY_COUNT);
    let query = Query::new().with::<Position>().with::<Velocity>();

    c.bench_function("select_position_velocity_100k", |b| {
        b.iter(|| black_box(integrate(&mut world, &query)));
    });
}

fn bench_select_fragmented(c: &mut Criterion) {
    let (mut world, entities) = world_with_moving(ENTITY_COUNT);
    let query = Query::new().with::<Position>().with::<Velocity>();

    // Every other entity deleted; the table keeps its tombstones.
    for &entity in entities.iter().step_by(2) {
        world.delete_entity(entity).unwrap();
    }

    c.bench_function("select_fragmented_50pct", |b| {
        b.iter(|| black_box(integrate(&mut world, &query)));
    });
}

criterion_group!(
    benches,
    bench_create_entities,
    bench_add_remove_cycle,
    bench_select_dense,
    bench_select_fragmented,
);

criterion_main!(benches);
