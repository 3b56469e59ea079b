//! # World Property Tests
//!
//! Checks the behavior every world must hold regardless of history:
//!
//! 1. **Archetype identity**: the same component set always lands in the same archetype
//! 2. **Structural changes**: add is idempotent, remove undoes add, values survive moves
//! 3. **Queries**: select yields exactly the entities holding every requested type
//! 4. **Capacity**: full tables fail without corrupting the entity being moved
//!
//! Run with: cargo test --test world_properties

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_core::{
    ArchetypeId, Component, EcsError, EntityId, Query, RowTable, World, WorldConfig,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f64,
    dy: f64,
}
impl Component for Velocity {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(u32);
impl Component for Health {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Team(u8);
impl Component for Team {}

fn world() -> World {
    World::with_config(WorldConfig::small()).unwrap()
}

fn selected(world: &mut World, query: &Query) -> BTreeSet<EntityId> {
    let mut seen = BTreeSet::new();
    world.select(query, |view| {
        seen.insert(view.entity());
    })
    .unwrap();
    seen
}

// ============================================================================
// ARCHETYPE IDENTITY
// ============================================================================

#[test]
fn test_insertion_order_does_not_matter() {
    let mut world = world();
    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();

    world.add_component::<Position>(a).unwrap();
    world.add_component::<Velocity>(a).unwrap();
    world.add_component::<Health>(a).unwrap();

    world.add_component::<Health>(b).unwrap();
    world.add_component::<Velocity>(b).unwrap();
    world.add_component::<Position>(b).unwrap();

    assert_eq!(
        world.locate(a).unwrap().archetype,
        world.locate(b).unwrap().archetype
    );
}

#[test]
fn test_position_velocity_scenario() {
    let mut world = world();
    let e1 = world.create_entity().unwrap();
    let e2 = world.create_entity().unwrap();

    world.set_component(e1, Position { x: 1.0, y: 2.0 }).unwrap();
    world.set_component(e1, Velocity { dx: 3.0, dy: 4.0 }).unwrap();
    world.set_component(e2, Velocity { dx: 5.0, dy: 6.0 }).unwrap();
    world.set_component(e2, Position { x: 7.0, y: 8.0 }).unwrap();

    // Same archetype, columns sorted by component id.
    let archetype = world.archetype_for(e1).unwrap();
    assert_eq!(archetype.id(), world.locate(e2).unwrap().archetype);
    let position = world.component_id::<Position>().unwrap();
    let velocity = world.component_id::<Velocity>().unwrap();
    assert!(position < velocity);
    assert_eq!(archetype.signature().as_slice(), &[position, velocity]);
    assert_eq!(archetype.count_rows(), 2);

    let visited = world
        .select(&Query::new().with::<Position>(), |mut view| {
            if let Ok(Some(p)) = view.get_mut::<Position>() {
                p.x += 100.0;
            }
        })
        .unwrap();
    assert_eq!(visited, 2);

    assert_eq!(
        world.get_component::<Position>(e1).unwrap(),
        Some(&Position { x: 101.0, y: 2.0 })
    );
    assert_eq!(
        world.get_component::<Position>(e2).unwrap(),
        Some(&Position { x: 107.0, y: 8.0 })
    );
    assert_eq!(
        world.get_component::<Velocity>(e2).unwrap(),
        Some(&Velocity { dx: 5.0, dy: 6.0 })
    );
}

// ============================================================================
// STRUCTURAL CHANGES
// ============================================================================

#[test]
fn test_add_twice_keeps_value() {
    let mut world = world();
    let entity = world.create_entity().unwrap();
    world.set_component(entity, Health(40)).unwrap();
    let archetype = world.locate(entity).unwrap().archetype;
    let rows = world.archetype(archetype).unwrap().count_rows();

    world.add_component::<Health>(entity).unwrap();
    world.add_component::<Health>(entity).unwrap();

    assert_eq!(world.archetype(archetype).unwrap().count_rows(), rows);
    assert_eq!(world.get_component::<Health>(entity).unwrap(), Some(&Health(40)));
}

#[test]
fn test_add_remove_restores_signature() {
    let mut world = world();
    let entity = world.create_entity().unwrap();
    world.set_component(entity, Position { x: 0.25, y: -3.5 }).unwrap();
    world.set_component(entity, Team(2)).unwrap();
    let before = world.archetype_for(entity).unwrap().signature().clone();

    world.set_component(entity, Velocity { dx: 9.0, dy: 9.0 }).unwrap();
    world.remove_component::<Velocity>(entity).unwrap();

    assert_eq!(world.archetype_for(entity).unwrap().signature(), &before);
    assert!(!world.has_component::<Velocity>(entity).unwrap());
    assert_eq!(
        world.get_component::<Position>(entity).unwrap(),
        Some(&Position { x: 0.25, y: -3.5 })
    );
    assert_eq!(world.get_component::<Team>(entity).unwrap(), Some(&Team(2)));
}

#[test]
fn test_delete_isolates_entity() {
    let mut world = world();
    let keep = world.create_entity().unwrap();
    let gone = world.create_entity().unwrap();
    for entity in [keep, gone] {
        world.set_component(entity, Health(1)).unwrap();
    }

    world.delete_entity(gone).unwrap();

    assert_eq!(
        world.get_component::<Health>(gone),
        Err(EcsError::EntityNotFound(gone))
    );
    assert_eq!(
        world.set_component(gone, Health(2)),
        Err(EcsError::EntityNotFound(gone))
    );
    let seen = selected(&mut world, &Query::new().with::<Health>());
    assert_eq!(seen, BTreeSet::from([keep]));
}

#[test]
fn test_deleted_slot_is_reused() {
    let mut world = world();
    let first = world.create_entity().unwrap();
    let second = world.create_entity().unwrap();
    world.set_component(first, Health(1)).unwrap();
    world.set_component(second, Health(2)).unwrap();
    let freed = world.locate(first).unwrap().row;

    world.delete_entity(first).unwrap();
    let third = world.create_entity().unwrap();
    world.set_component(third, Health(3)).unwrap();

    assert_eq!(world.locate(third).unwrap().row, freed);
    assert_eq!(world.get_component::<Health>(second).unwrap(), Some(&Health(2)));
}

// ============================================================================
// GRAPH CONSISTENCY
// ============================================================================

#[test]
fn test_edges_are_symmetric() {
    let mut world = world();
    for _ in 0..4 {
        let entity = world.create_entity().unwrap();
        world.add_component::<Position>(entity).unwrap();
        world.add_component::<Team>(entity).unwrap();
        world.add_component::<Velocity>(entity).unwrap();
        world.remove_component::<Position>(entity).unwrap();
    }

    for archetype in world.archetypes() {
        for (component, edge) in archetype.edges() {
            if let Some(to) = edge.add {
                let back = world.archetype(to).and_then(|a| a.edge(component)).unwrap();
                assert_eq!(back.remove, Some(archetype.id()));
            }
            if let Some(to) = edge.remove {
                let back = world.archetype(to).and_then(|a| a.edge(component)).unwrap();
                assert_eq!(back.add, Some(archetype.id()));
            }
        }
    }
}

#[test]
fn test_find_archetypes_matches_signatures() {
    let mut world = world();
    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();
    world.add_component::<Position>(a).unwrap();
    world.add_component::<Velocity>(b).unwrap();
    world.add_component::<Position>(b).unwrap();

    let position = world.component_id::<Position>().unwrap();
    let expected: Vec<ArchetypeId> = world
        .archetypes()
        .filter(|archetype| archetype.has_component(position))
        .map(|archetype| archetype.id())
        .collect();

    assert_eq!(world.find_archetypes::<Position>(), expected);
    assert_eq!(expected.len(), 2);
    assert!(world.find_archetypes::<Health>().is_empty());
}

#[test]
fn test_identify() {
    let mut world = world();
    let entity = world.create_entity().unwrap();
    world.register::<Team>().unwrap();
    let descriptor = world
        .components()
        .find(|info| info.name == "Team")
        .and_then(|info| info.descriptor)
        .unwrap();

    assert_eq!(world.identify(EntityId::ROOT), "root");
    assert_eq!(world.identify(descriptor), "component Team");
    assert_eq!(world.identify(entity), format!("entity {}", entity.raw()));
}

// ============================================================================
// QUERY COMPLETENESS
// ============================================================================

#[test]
fn test_select_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5EED_CAFE);
    let mut world = World::with_config(WorldConfig::with_capacity(1024)).unwrap();

    let mut entities = Vec::new();
    for i in 0..300u32 {
        let entity = world.create_entity().unwrap();
        if rng.gen_bool(0.5) {
            world.set_component(entity, Position { x: f64::from(i), y: 0.0 }).unwrap();
        }
        if rng.gen_bool(0.5) {
            world.set_component(entity, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
        }
        if rng.gen_bool(0.3) {
            world.add_component::<Health>(entity).unwrap();
        }
        if rng.gen_bool(0.5) {
            world.set_component(entity, Team(rng.gen_range(0..4))).unwrap();
        }
        if rng.gen_bool(0.1) {
            world.delete_entity(entity).unwrap();
        } else {
            entities.push(entity);
        }
    }

    let query = Query::new().with::<Position>().with::<Velocity>();
    let expected: BTreeSet<_> = entities
        .iter()
        .copied()
        .filter(|&e| {
            world.has_component::<Position>(e).unwrap()
                && world.has_component::<Velocity>(e).unwrap()
        })
        .collect();
    assert_eq!(selected(&mut world, &query), expected);

    let query = Query::new().with::<Team>().with::<Health>();
    let expected: BTreeSet<_> = entities
        .iter()
        .copied()
        .filter(|&e| {
            world.has_component::<Team>(e).unwrap() && world.has_component::<Health>(e).unwrap()
        })
        .collect();
    assert_eq!(selected(&mut world, &query), expected);
}

#[test]
fn test_select_typed_access_outside_query() {
    let mut world = world();
    let entity = world.create_entity().unwrap();
    world.set_component(entity, Position { x: 1.0, y: 1.0 }).unwrap();
    world.set_component(entity, Health(5)).unwrap();

    let mut errors = Vec::new();
    world
        .select(&Query::new().with::<Position>(), |view| {
            errors.push(view.get::<Health>().unwrap_err());
        })
        .unwrap();
    assert_eq!(errors, vec![EcsError::ComponentNotInQuery("Health")]);
}

#[test]
fn test_columns_differ_between_archetypes() {
    let mut world = world();
    let health = world.register::<Health>().unwrap();
    let position = world.register::<Position>().unwrap();
    assert!(health < position);

    let alone = world.create_entity().unwrap();
    world.set_component(alone, Position { x: 1.0, y: 0.0 }).unwrap();

    let moving = world.create_entity().unwrap();
    world.set_component(moving, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
    world.set_component(moving, Position { x: 2.0, y: 0.0 }).unwrap();

    let wounded = world.create_entity().unwrap();
    world.set_component(wounded, Position { x: 3.0, y: 0.0 }).unwrap();
    world.set_component(wounded, Health(7)).unwrap();

    let mut seen = Vec::new();
    world
        .select(&Query::new().with::<Position>(), |view| {
            let value = view.get::<Position>().unwrap().copied();
            seen.push((view.entity(), view.archetype(), view.columns()[0], value));
        })
        .unwrap();
    assert_eq!(seen.len(), 3);

    let mut columns = BTreeSet::new();
    for &(entity, archetype, column, value) in &seen {
        let expected = world.archetype(archetype).unwrap().index_of_component(position);
        assert_eq!(Some(column), expected);
        assert_eq!(value.as_ref(), world.get_component::<Position>(entity).unwrap());
        columns.insert(column);
    }
    assert_eq!(columns, BTreeSet::from([0, 1]));

    let x_of = |entity: EntityId| {
        let found = seen.iter().find(|s| s.0 == entity);
        found.and_then(|s| s.3).map(|p| p.x)
    };
    assert_eq!(x_of(alone), Some(1.0));
    assert_eq!(x_of(moving), Some(2.0));
    assert_eq!(x_of(wounded), Some(3.0));

    // Same archetype, reversed request order.
    let mut pairs = Vec::new();
    world
        .select(&Query::new().with::<Position>().with::<Health>(), |view| {
            pairs.push((view.entity(), view.columns().to_vec()));
        })
        .unwrap();
    assert_eq!(pairs, vec![(wounded, vec![1, 0])]);
}

#[test]
fn test_new_component_type_when_root_is_full() {
    const K: usize = 4;
    let mut world = World::with_config(WorldConfig::with_capacity(K)).unwrap();
    let entities: Vec<_> = (0..K).map(|_| world.create_entity().unwrap()).collect();
    assert!(world.create_entity().is_err());

    world.set_component(entities[0], Team(1)).unwrap();
    assert_eq!(world.get_component::<Team>(entities[0]).unwrap(), Some(&Team(1)));

    // The moved entity freed a root slot for a new one.
    let late = world.create_entity().unwrap();
    assert_eq!(world.locate(late).unwrap().archetype, ArchetypeId::ROOT);
}

// ============================================================================
// CAPACITY
// ============================================================================

#[test]
fn test_table_rejects_extra_row() {
    const K: usize = 16;
    let mut table = RowTable::new(2, K);
    for _ in 0..K {
        table.create().unwrap();
    }
    assert_eq!(
        table.create(),
        Err(EcsError::CapacityExceeded { capacity: K })
    );
}

#[test]
fn test_full_destination_leaves_entity_in_place() {
    let mut world = World::with_config(WorldConfig {
        table_capacity: 2,
        root_capacity: Some(16),
    })
    .unwrap();
    world.register::<Health>().unwrap();

    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();
    let c = world.create_entity().unwrap();
    world.set_component(a, Health(1)).unwrap();
    world.set_component(b, Health(2)).unwrap();

    let before = world.locate(c).unwrap();
    assert_eq!(
        world.set_component(c, Health(3)),
        Err(EcsError::CapacityExceeded { capacity: 2 })
    );
    assert_eq!(world.locate(c).unwrap(), before);
    assert!(!world.has_component::<Health>(c).unwrap());

    // Freeing a slot lets the move through.
    world.delete_entity(a).unwrap();
    world.set_component(c, Health(3)).unwrap();
    assert_eq!(world.get_component::<Health>(c).unwrap(), Some(&Health(3)));
}
