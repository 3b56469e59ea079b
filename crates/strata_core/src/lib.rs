//! # Strata Core
//!
//! Archetype-based entity/component storage:
//! - Entities with the same component types share one fixed-capacity table
//! - Adding or removing a component moves the entity along memoized edges
//!   of the archetype graph
//! - Queries visit every row whose archetype holds the requested types
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{Component, Query, World};
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Position { x: f64, y: f64 }
//! impl Component for Position {}
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Velocity { dx: f64, dy: f64 }
//! impl Component for Velocity {}
//!
//! let mut world = World::new();
//! let ship = world.create_entity()?;
//! world.set_component(ship, Position { x: 0.0, y: 0.0 })?;
//! world.set_component(ship, Velocity { dx: 1.0, dy: 2.0 })?;
//!
//! let query = Query::new().with::<Position>().with::<Velocity>();
//! world.select(&query, |mut view| {
//!     let velocity = view.get::<Velocity>().ok().flatten().copied();
//!     if let (Some(v), Ok(Some(p))) = (velocity, view.get_mut::<Position>()) {
//!         p.x += v.dx;
//!         p.y += v.dy;
//!     }
//! })?;
//!
//! assert_eq!(world.get_component::<Position>(ship)?, Some(&Position { x: 1.0, y: 2.0 }));
//! # Ok::<(), strata_core::EcsError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::WorldConfig;
pub use ecs::{
    Archetype, ArchetypeEdge, ArchetypeGraph, ArchetypeId, ArchetypeSignature, BoxedComponent,
    Component, ComponentData, ComponentId, ComponentIndex, ComponentInfo, ComponentMarker,
    ComponentRegistry, EntityDirectory, EntityId, EntityLocation, EntityMut, Query, Row, RowId,
    RowTable, RowView, System, World,
};
pub use error::{EcsError, EcsResult, RowMissing};
