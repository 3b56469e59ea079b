//! # Archetype Graph
//!
//! Owns every archetype and moves rows between them on structural changes.
//!
//! Archetypes live in a `Vec` addressed by [`ArchetypeId`]; edges between
//! them are ids, never references. Destinations are resolved in two steps:
//! 1. Follow the memoized edge for the component, if any
//! 2. Otherwise build the target signature, look it up by exact match or
//!    create it, and memoize the edge in both directions

use std::collections::HashMap;

use super::archetype::{Archetype, ArchetypeId, ArchetypeSignature};
use super::component::{BoxedComponent, ComponentId};
use super::entity::EntityId;
use super::registry::ComponentIndex;
use super::storage::{Row, RowId};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// Row capacity of the descriptor archetype.
const DESCRIPTOR_CAPACITY: usize = usize::MAX;

/// All archetypes of a world, linked by transition edges.
#[derive(Debug)]
pub struct ArchetypeGraph {
    /// Archetypes, indexed by id.
    archetypes: Vec<Archetype>,
    /// Exact-signature lookup.
    by_signature: HashMap<ArchetypeSignature, ArchetypeId>,
    /// Component -> archetype -> column.
    index: ComponentIndex,
    /// Row capacity of every archetype but the root.
    table_capacity: usize,
}

impl ArchetypeGraph {
    /// Creates a graph holding only the empty root archetype.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        let root = Archetype::new(
            ArchetypeId::ROOT,
            ArchetypeSignature::empty(),
            config.root_capacity(),
        );
        let mut by_signature = HashMap::new();
        by_signature.insert(ArchetypeSignature::empty(), ArchetypeId::ROOT);

        Self {
            archetypes: vec![root],
            by_signature,
            index: ComponentIndex::new(),
            table_capacity: config.table_capacity,
        }
    }

    /// The empty archetype.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Archetype {
        &self.archetypes[ArchetypeId::ROOT.index()]
    }

    /// Looks up an archetype.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Looks up an archetype mutably.
    #[inline]
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.index())
    }

    /// Archetype by an id this graph handed out.
    #[inline]
    pub(crate) fn at(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id.index()]
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id.index()]
    }

    /// Number of archetypes, the root included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Always false: the root archetype exists from construction.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Iterates over archetypes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// The component -> archetype column index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> &ComponentIndex {
        &self.index
    }

    /// Archetype with exactly this signature, if one exists.
    #[must_use]
    pub fn find(&self, signature: &ArchetypeSignature) -> Option<ArchetypeId> {
        self.by_signature.get(signature).copied()
    }

    /// Archetype with exactly this signature, created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if no archetype id is left.
    pub fn find_or_create(&mut self, signature: ArchetypeSignature) -> EcsResult<ArchetypeId> {
        if let Some(id) = self.find(&signature) {
            return Ok(id);
        }

        let raw = u32::try_from(self.archetypes.len())
            .map_err(|_| EcsError::IdSpaceExhausted("archetype"))?;
        let id = ArchetypeId::from_raw(raw);
        let capacity = self.capacity_for(&signature);
        tracing::debug!("Created archetype {} with signature {}", id, signature);

        self.index.insert_archetype(id, &signature);
        self.by_signature.insert(signature.clone(), id);
        self.archetypes.push(Archetype::new(id, signature, capacity));
        Ok(id)
    }

    /// Archetype holding only the component marker, reached from the root.
    ///
    /// Its table is not bounded by the configured capacity, so registering
    /// a component never competes with user entities for rows.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if no archetype id is left.
    pub fn descriptors(&mut self) -> EcsResult<ArchetypeId> {
        self.add_target(ArchetypeId::ROOT, ComponentId::MARKER)
    }

    fn capacity_for(&self, signature: &ArchetypeSignature) -> usize {
        if signature.as_slice() == [ComponentId::MARKER] {
            DESCRIPTOR_CAPACITY
        } else {
            self.table_capacity
        }
    }

    /// Archetype reached from `from` by adding `component`.
    ///
    /// Returns `from` itself if it already holds the component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if a new archetype is needed
    /// and no id is left.
    pub fn add_target(
        &mut self,
        from: ArchetypeId,
        component: ComponentId,
    ) -> EcsResult<ArchetypeId> {
        let source = &self.archetypes[from.index()];
        if source.has_component(component) {
            return Ok(from);
        }
        if let Some(to) = source.edge(component).and_then(|edge| edge.add) {
            return Ok(to);
        }

        let signature = source.signature().with(component);
        let to = self.find_or_create(signature)?;
        self.link(to, from, component);
        Ok(to)
    }

    /// Archetype reached from `from` by removing `component`.
    ///
    /// Returns `from` itself if it does not hold the component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if a new archetype is needed
    /// and no id is left.
    pub fn remove_target(
        &mut self,
        from: ArchetypeId,
        component: ComponentId,
    ) -> EcsResult<ArchetypeId> {
        let source = &self.archetypes[from.index()];
        if !source.has_component(component) {
            return Ok(from);
        }
        if let Some(to) = source.edge(component).and_then(|edge| edge.remove) {
            return Ok(to);
        }

        let signature = source.signature().without(component);
        let to = self.find_or_create(signature)?;
        self.link(from, to, component);
        Ok(to)
    }

    /// Moves an entity's row from one archetype to another.
    ///
    /// Values are matched by component id: columns the destination lacks are
    /// dropped, columns the source lacks start unset unless `carried` supplies
    /// them.
    ///
    /// # Arguments
    ///
    /// * `from` - Current archetype
    /// * `row` - Current row, `None` if the entity owns no row yet
    /// * `to` - Destination archetype
    /// * `entity` - Owner of the row
    /// * `carried` - Value for a column being added
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExceeded`] if the destination is full, in
    /// which case nothing has changed, or [`EcsError::RowNotFound`] if `row`
    /// is not live.
    pub fn move_row(
        &mut self,
        from: ArchetypeId,
        row: Option<RowId>,
        to: ArchetypeId,
        entity: EntityId,
        carried: Option<(ComponentId, BoxedComponent)>,
    ) -> EcsResult<RowId> {
        let target = &self.archetypes[to.index()];
        if !target.has_room() {
            let capacity = target.table().capacity();
            tracing::warn!(
                "Archetype {} is full (capacity {}), cannot move entity {}",
                to,
                capacity,
                entity
            );
            return Err(EcsError::CapacityExceeded { capacity });
        }

        let mut old_values = match row {
            Some(row) => self.archetypes[from.index()].take_row(row)?.into_values(),
            None => Vec::new(),
        };
        let mut carried = carried;

        let source = self.archetypes[from.index()].signature();
        let values = self.archetypes[to.index()]
            .signature()
            .iter()
            .map(|component| match carried.take() {
                Some((id, value)) if id == component => Some(value),
                other => {
                    carried = other;
                    source
                        .as_slice()
                        .binary_search(&component)
                        .ok()
                        .and_then(|column| old_values.get_mut(column)?.take())
                }
            })
            .collect();

        let new_row = self.archetypes[to.index()].insert_row(entity, Row::from_values(values))?;
        tracing::trace!("Moved entity {} from archetype {} to {}", entity, from, to);
        Ok(new_row)
    }

    /// Records `lower + component == upper` on both archetypes.
    fn link(&mut self, upper: ArchetypeId, lower: ArchetypeId, component: ComponentId) {
        self.archetypes[lower.index()].set_add_edge(component, upper);
        self.archetypes[upper.index()].set_remove_edge(component, lower);
    }
}
