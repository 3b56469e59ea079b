//! # ECS World
//!
//! The central container for all entities and components.
//!
//! A world owns the component registry, the archetype graph and the entity
//! directory. It is built once, explicitly, and every operation goes through
//! `&mut World`, so structural changes can never overlap a running query.

use super::archetype::{Archetype, ArchetypeId};
use super::component::{BoxedComponent, Component, ComponentId, ComponentMarker};
use super::entity::{EntityDirectory, EntityId, EntityLocation};
use super::query::{Query, RowView, System};
use super::registry::{ComponentInfo, ComponentRegistry};
use super::storage::Row;
use super::transition::ArchetypeGraph;
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// Archetype plus the column of each requested component, in request order.
type Match = (ArchetypeId, Vec<usize>);

/// The ECS World - container for all entities and their components.
///
/// # Bootstrap
///
/// A new world already holds:
/// - The empty root archetype, [`ArchetypeId::ROOT`]
/// - [`ComponentMarker`], registered as [`ComponentId::MARKER`]
/// - The root entity, [`EntityId::ROOT`], which owns no row
///
/// Every component registered afterwards gets a descriptor entity tagged
/// with a [`ComponentMarker`].
///
/// # Example
///
/// ```rust
/// use strata_core::{Component, World};
///
/// #[derive(Debug, PartialEq)]
/// struct Position(f64, f64);
/// impl Component for Position {}
///
/// let mut world = World::new();
/// let entity = world.create_entity()?;
/// world.set_component(entity, Position(1.0, 2.0))?;
///
/// assert_eq!(world.get_component::<Position>(entity)?, Some(&Position(1.0, 2.0)));
/// # Ok::<(), strata_core::EcsError>(())
/// ```
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    registry: ComponentRegistry,
    archetypes: ArchetypeGraph,
    entities: EntityDirectory,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::bootstrap(WorldConfig::default())
    }

    /// Creates a world with the given table capacities.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the config fails validation.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::bootstrap(config))
    }

    fn bootstrap(config: WorldConfig) -> Self {
        let archetypes = ArchetypeGraph::new(&config);
        let entities = EntityDirectory::new(ArchetypeId::ROOT);
        let registry = ComponentRegistry::bootstrap();

        tracing::debug!(
            "World bootstrapped: table capacity {}, root capacity {}",
            config.table_capacity,
            config.root_capacity()
        );

        Self {
            config,
            registry,
            archetypes,
            entities,
        }
    }

    /// The configuration this world was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers `T`, or returns its id if already registered.
    ///
    /// First registration creates a descriptor entity for `T`. Descriptors
    /// live in the [`ComponentMarker`] archetype and never take a row from
    /// the root table. `T` is only recorded once its descriptor is placed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if no component or archetype
    /// id is left.
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentId> {
        if let Some(id) = self.registry.id_of::<T>() {
            return Ok(id);
        }

        let id = self.registry.next_id()?;
        let descriptors = self.archetypes.descriptors()?;
        let marker: BoxedComponent = Box::new(ComponentMarker {
            component: id,
            name: T::name(),
        });

        let descriptor = self.entities.allocate();
        let row = self.archetypes.move_row(
            ArchetypeId::ROOT,
            None,
            descriptors,
            descriptor,
            Some((ComponentId::MARKER, marker)),
        )?;
        self.entities
            .bind(descriptor, EntityLocation::new(descriptors, row));

        let (registered, _) = self.registry.register::<T>()?;
        debug_assert_eq!(registered, id);
        self.registry.set_descriptor(id, descriptor);

        tracing::debug!(
            "Registered component {} as {} (descriptor entity {})",
            T::name(),
            id,
            descriptor
        );
        Ok(id)
    }

    /// Id of `T`, if registered.
    #[inline]
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.registry.id_of::<T>()
    }

    /// Registration details of every component, in id order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.registry.iter()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExceeded`] if the root archetype is full.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        let root = self.archetypes.at_mut(ArchetypeId::ROOT);
        if !root.has_room() {
            let capacity = root.table().capacity();
            tracing::warn!("Root archetype is full (capacity {})", capacity);
            return Err(EcsError::CapacityExceeded { capacity });
        }

        let id = self.entities.allocate();
        let row = root.create_empty_row(id)?;
        self.entities
            .bind(id, EntityLocation::new(ArchetypeId::ROOT, row));
        Ok(id)
    }

    /// Handle for repeated operations on one entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn entity_mut(&mut self, entity: EntityId) -> EcsResult<EntityMut<'_>> {
        self.entities.locate(entity)?;
        Ok(EntityMut {
            world: self,
            id: entity,
        })
    }

    /// Deletes an entity and its row.
    ///
    /// The id is never handed out again.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    pub fn delete_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        let location = self.entities.locate(entity)?;
        if let Some(row) = location.row {
            self.archetypes.at_mut(location.archetype).take_row(row)?;
        }
        self.entities.unbind(entity)?;

        tracing::trace!("Deleted entity {} from archetype {}", entity, location.archetype);
        Ok(())
    }

    /// Checks if an entity exists.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    /// Number of live entities, including the root and descriptor entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Current location of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    #[inline]
    pub fn locate(&self, entity: EntityId) -> EcsResult<EntityLocation> {
        self.entities.locate(entity)
    }

    /// Human-readable label: `root`, `component <Name>` or `entity <n>`.
    #[must_use]
    pub fn identify(&self, entity: EntityId) -> String {
        if entity.is_root() {
            return "root".to_string();
        }
        match self.get_component::<ComponentMarker>(entity) {
            Ok(Some(marker)) => format!("component {}", marker.name),
            _ => format!("entity {entity}"),
        }
    }

    // =========================================================================
    // Structural changes
    // =========================================================================

    /// Attaches `T` to an entity, leaving its value unset.
    ///
    /// Does nothing if the entity already has `T`; its value is kept.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities, or
    /// [`EcsError::CapacityExceeded`] if the destination archetype is full.
    pub fn add_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<ComponentId> {
        self.entities.locate(entity)?;
        let component = self.register::<T>()?;

        let location = self.entities.locate(entity)?;
        let to = self.archetypes.add_target(location.archetype, component)?;
        if to != location.archetype {
            self.transition(entity, location, to, None)?;
        }
        Ok(component)
    }

    /// Writes `value` as the entity's `T`, attaching `T` first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities, or
    /// [`EcsError::CapacityExceeded`] if the destination archetype is full.
    pub fn set_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<()> {
        self.entities.locate(entity)?;
        let component = self.register::<T>()?;

        let location = self.entities.locate(entity)?;
        let archetype = self.archetypes.at_mut(location.archetype);
        if let (Some(row), Some(column)) = (location.row, archetype.index_of_component(component)) {
            let width = archetype.count_components();
            archetype
                .row_mut(row)?
                .set(column, Box::new(value))
                .map_err(|_| EcsError::RowWidthMismatch {
                    expected: width,
                    found: column + 1,
                })?;
            return Ok(());
        }

        let value: BoxedComponent = Box::new(value);
        let to = self.archetypes.add_target(location.archetype, component)?;
        self.transition(entity, location, to, Some((component, value)))
    }

    /// Detaches `T` from an entity, dropping its value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities,
    /// [`EcsError::ComponentNotRegistered`] if `T` was never registered,
    /// [`EcsError::ComponentNotPresent`] if the entity lacks `T`, or
    /// [`EcsError::CapacityExceeded`] if the destination archetype is full.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<()> {
        let location = self.entities.locate(entity)?;
        let component = self
            .registry
            .id_of::<T>()
            .ok_or(EcsError::ComponentNotRegistered(T::name()))?;
        if !self.archetypes.at(location.archetype).has_component(component) {
            return Err(EcsError::ComponentNotPresent {
                entity,
                component: T::name(),
            });
        }

        let to = self.archetypes.remove_target(location.archetype, component)?;
        self.transition(entity, location, to, None)
    }

    fn transition(
        &mut self,
        entity: EntityId,
        location: EntityLocation,
        to: ArchetypeId,
        carried: Option<(ComponentId, BoxedComponent)>,
    ) -> EcsResult<()> {
        let row = self
            .archetypes
            .move_row(location.archetype, location.row, to, entity, carried)?;
        self.entities.bind(entity, EntityLocation::new(to, row));
        Ok(())
    }

    // =========================================================================
    // Component access
    // =========================================================================

    /// Borrows an entity's `T`.
    ///
    /// # Returns
    ///
    /// `None` if the entity lacks `T` or its value is unset.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<Option<&T>> {
        let location = self.entities.locate(entity)?;
        let Some(component) = self.registry.id_of::<T>() else {
            return Ok(None);
        };
        let archetype = self.archetypes.at(location.archetype);
        let (Some(row), Some(column)) = (location.row, archetype.index_of_component(component))
        else {
            return Ok(None);
        };
        Ok(archetype.row(row)?.get_as::<T>(column))
    }

    /// Mutably borrows an entity's `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities.
    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> EcsResult<Option<&mut T>> {
        let location = self.entities.locate(entity)?;
        let Some(component) = self.registry.id_of::<T>() else {
            return Ok(None);
        };
        let archetype = self.archetypes.at_mut(location.archetype);
        let (Some(row), Some(column)) = (location.row, archetype.index_of_component(component))
        else {
            return Ok(None);
        };
        Ok(archetype.row_mut(row)?.get_as_mut::<T>(column))
    }

    /// Checks if an entity's archetype includes `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        let location = self.entities.locate(entity)?;
        Ok(self
            .registry
            .id_of::<T>()
            .is_some_and(|c| self.archetypes.at(location.archetype).has_component(c)))
    }

    // =========================================================================
    // Archetypes
    // =========================================================================

    /// Archetypes holding `T`, in ascending id order.
    #[must_use]
    pub fn find_archetypes<T: Component>(&self) -> Vec<ArchetypeId> {
        self.registry
            .id_of::<T>()
            .map(|c| self.archetypes.index().archetypes_with(c))
            .unwrap_or_default()
    }

    /// Archetype currently holding an entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown entities.
    pub fn archetype_for(&self, entity: EntityId) -> EcsResult<&Archetype> {
        let location = self.entities.locate(entity)?;
        Ok(self.archetypes.at(location.archetype))
    }

    /// Looks up an archetype.
    #[inline]
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    /// Iterates over all archetypes in id order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Number of archetypes, the root included.
    #[inline]
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Visits every live row holding all of the query's components.
    ///
    /// Archetypes are visited in ascending id order, rows in ascending slot
    /// order. A query that is empty or names an unregistered type matches
    /// nothing.
    ///
    /// # Returns
    ///
    /// The number of rows visited.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfSync`] if the component index lacks a
    /// column of a matching archetype.
    pub fn select<F>(&mut self, query: &Query, mut visit: F) -> EcsResult<usize>
    where
        F: FnMut(RowView<'_>),
    {
        let mut visited = 0;
        for (id, columns) in self.matches(query)? {
            for (row_id, entity, row) in self.archetypes.at_mut(id).rows_mut() {
                visit(RowView::new(entity, id, row_id, row, &columns, query));
                visited += 1;
            }
        }
        Ok(visited)
    }

    /// Replaces every matching row with the value `transform` returns.
    ///
    /// `transform` receives the owner, the row by value and the column of
    /// each requested component.
    ///
    /// # Returns
    ///
    /// The number of rows replaced.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowWidthMismatch`] and stops if `transform`
    /// changes the number of columns. The offending row keeps the values
    /// that fit, padded with unset columns.
    pub fn update<F>(&mut self, query: &Query, mut transform: F) -> EcsResult<usize>
    where
        F: FnMut(EntityId, Row, &[usize]) -> Row,
    {
        let mut updated = 0;
        for (id, columns) in self.matches(query)? {
            let archetype = self.archetypes.at_mut(id);
            let width = archetype.count_components();
            for (_, entity, row) in archetype.rows_mut() {
                let next = transform(entity, std::mem::take(row), columns.as_slice());
                let found = next.width();
                if found != width {
                    let mut values = next.into_values();
                    values.resize_with(width, || None);
                    *row = Row::from_values(values);
                    return Err(EcsError::RowWidthMismatch {
                        expected: width,
                        found,
                    });
                }
                *row = next;
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Runs a system once.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`select`](Self::select).
    pub fn process<F>(&mut self, system: &mut System<F>) -> EcsResult<usize>
    where
        F: FnMut(RowView<'_>),
    {
        system.run(self)
    }

    fn matches(&self, query: &Query) -> EcsResult<Vec<Match>> {
        let requested: Option<Vec<ComponentId>> = query
            .type_ids()
            .map(|t| self.registry.id_of_type(t))
            .collect();
        let Some(requested) = requested else {
            return Ok(Vec::new());
        };

        let mut sorted = requested.clone();
        sorted.sort_unstable();
        let Some(&first) = sorted.first() else {
            return Ok(Vec::new());
        };

        let index = self.archetypes.index();
        index
            .archetypes_with(first)
            .into_iter()
            .filter(|&a| self.archetypes.at(a).signature().contains_all(&sorted))
            .map(|a| -> EcsResult<Match> {
                let columns = requested
                    .iter()
                    .map(|&c| {
                        index.column(c, a).ok_or(EcsError::IndexOutOfSync {
                            component: c,
                            archetype: a,
                        })
                    })
                    .collect::<EcsResult<Vec<_>>>()?;
                Ok((a, columns))
            })
            .collect()
    }
}

/// A world borrowed for operations on one entity.
#[derive(Debug)]
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl EntityMut<'_> {
    /// The entity's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// See [`World::add_component`].
    ///
    /// # Errors
    ///
    /// As [`World::add_component`].
    pub fn add<T: Component>(&mut self) -> EcsResult<&mut Self> {
        self.world.add_component::<T>(self.id)?;
        Ok(self)
    }

    /// See [`World::set_component`].
    ///
    /// # Errors
    ///
    /// As [`World::set_component`].
    pub fn set<T: Component>(&mut self, value: T) -> EcsResult<&mut Self> {
        self.world.set_component(self.id, value)?;
        Ok(self)
    }

    /// See [`World::remove_component`].
    ///
    /// # Errors
    ///
    /// As [`World::remove_component`].
    pub fn remove<T: Component>(&mut self) -> EcsResult<&mut Self> {
        self.world.remove_component::<T>(self.id)?;
        Ok(self)
    }

    /// See [`World::get_component`].
    ///
    /// # Errors
    ///
    /// As [`World::get_component`].
    pub fn get<T: Component>(&self) -> EcsResult<Option<&T>> {
        self.world.get_component::<T>(self.id)
    }

    /// See [`World::get_component_mut`].
    ///
    /// # Errors
    ///
    /// As [`World::get_component_mut`].
    pub fn get_mut<T: Component>(&mut self) -> EcsResult<Option<&mut T>> {
        self.world.get_component_mut::<T>(self.id)
    }
}
