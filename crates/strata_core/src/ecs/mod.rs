//! # Entity Component Storage
//!
//! Archetype-based storage for entities and their components.
//!
//! ## Design Philosophy
//!
//! - Entities sharing a component set share an archetype and its row table
//! - Tables have a fixed capacity and never move surviving rows
//! - Entity ids are stable and never reused; locations live in a directory
//! - Archetypes and edges form an index-addressed graph, built lazily

mod archetype;
mod component;
mod entity;
mod query;
mod registry;
mod storage;
mod transition;
mod world;

pub use archetype::{Archetype, ArchetypeEdge, ArchetypeId, ArchetypeSignature};
pub use component::{BoxedComponent, Component, ComponentData, ComponentId, ComponentMarker};
pub use entity::{EntityDirectory, EntityId, EntityLocation};
pub use query::{Query, RowView, System};
pub use registry::{ComponentIndex, ComponentInfo, ComponentRegistry};
pub use storage::{Row, RowId, RowTable};
pub use transition::ArchetypeGraph;
pub use world::{EntityMut, World};
