//! # Entity Management
//!
//! Entities are plain, ever-increasing identifiers. They never carry location
//! information: where an entity's data lives is tracked separately by the
//! [`EntityDirectory`], so ids stay valid while rows move between archetypes.

use std::collections::HashMap;
use std::fmt;

use super::archetype::ArchetypeId;
use super::storage::RowId;
use crate::error::{EcsError, EcsResult};

/// Unique identifier for an entity.
///
/// Ids are handed out in increasing order and are never reused, even after
/// the entity is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// The root entity created during world bootstrap.
    pub const ROOT: Self = Self(0);

    /// Creates an entity id from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value of this id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is the reserved root id.
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an entity's components are stored.
///
/// `row` is `None` for entities that have never been given a row, such as
/// the root entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLocation {
    /// The archetype whose signature matches the entity's components.
    pub archetype: ArchetypeId,
    /// The entity's row inside that archetype's table.
    pub row: Option<RowId>,
}

impl EntityLocation {
    /// Location of an entity stored at `row` in `archetype`.
    #[inline]
    #[must_use]
    pub const fn new(archetype: ArchetypeId, row: RowId) -> Self {
        Self {
            archetype,
            row: Some(row),
        }
    }

    /// Location of an entity in `archetype` that owns no row yet.
    #[inline]
    #[must_use]
    pub const fn detached(archetype: ArchetypeId) -> Self {
        Self {
            archetype,
            row: None,
        }
    }
}

/// Maps entity ids to their current location.
#[derive(Debug)]
pub struct EntityDirectory {
    /// Next id to hand out.
    next_id: u64,
    /// Live entities.
    locations: HashMap<EntityId, EntityLocation>,
}

impl EntityDirectory {
    /// Creates a directory with the root entity bound, rowless, to `root`.
    ///
    /// The first id returned by [`allocate`](Self::allocate) is 1.
    #[must_use]
    pub fn new(root: ArchetypeId) -> Self {
        let mut locations = HashMap::new();
        locations.insert(EntityId::ROOT, EntityLocation::detached(root));
        Self {
            next_id: 1,
            locations,
        }
    }

    /// Reserves a fresh id. The id is not bound until [`bind`](Self::bind).
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Binds (or rebinds) an entity to a location.
    pub fn bind(&mut self, id: EntityId, location: EntityLocation) {
        self.locations.insert(id, location);
    }

    /// Looks up an entity's location.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not bound.
    pub fn locate(&self, id: EntityId) -> EcsResult<EntityLocation> {
        self.locations
            .get(&id)
            .copied()
            .ok_or(EcsError::EntityNotFound(id))
    }

    /// Removes an entity's binding, returning its last location.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not bound.
    pub fn unbind(&mut self, id: EntityId) -> EcsResult<EntityLocation> {
        self.locations
            .remove(&id)
            .ok_or(EcsError::EntityNotFound(id))
    }

    /// Checks if an entity is bound.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Number of bound entities, the root included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Always false: the root entity is bound at construction.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
