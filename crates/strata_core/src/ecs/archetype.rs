//! # Archetype-based Entity Storage
//!
//! Entities with the same set of component types share an archetype, and
//! their values sit side by side in that archetype's row table:
//!
//! ```text
//! Archetype [Position, Velocity]:
//! row 0: [P0, V0]   owner 4
//! row 1: [P1, V1]   owner 9
//! row 2: <tombstone>
//! ```
//!
//! Columns follow the signature, which is sorted by [`ComponentId`], so the
//! order in which components were added never changes the layout.
//!
//! Archetypes are linked by transition edges: adding component `c` to an
//! entity of archetype `A` moves it to `A.edges[c].add`, and removing `c`
//! moves it back along `edges[c].remove`.

use std::collections::HashMap;
use std::fmt;

use super::component::ComponentId;
use super::entity::EntityId;
use super::storage::{Row, RowId, RowTable};
use crate::error::EcsResult;

/// Identifier of an archetype, also its index in the world's archetype list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The empty archetype, created during world bootstrap.
    pub const ROOT: Self = Self(0);

    /// Creates an archetype id from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value of this id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Position of this archetype in the world's archetype list.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signature of an archetype - which components it contains.
///
/// Always sorted ascending and free of duplicates, so two signatures built
/// from the same components in any order compare and hash equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeSignature {
    /// Sorted list of component ids.
    components: Vec<ComponentId>,
}

impl ArchetypeSignature {
    /// Creates a signature from component ids in any order.
    #[must_use]
    pub fn new(mut components: Vec<ComponentId>) -> Self {
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// The signature of the root archetype.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// This signature plus `component`.
    #[must_use]
    pub fn with(&self, component: ComponentId) -> Self {
        match self.components.binary_search(&component) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut components = self.components.clone();
                components.insert(pos, component);
                Self { components }
            }
        }
    }

    /// This signature minus `component`.
    #[must_use]
    pub fn without(&self, component: ComponentId) -> Self {
        let mut components = self.components.clone();
        if let Ok(pos) = components.binary_search(&component) {
            components.remove(pos);
        }
        Self { components }
    }

    /// Checks if this signature contains a component.
    #[inline]
    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        self.components.binary_search(&component).is_ok()
    }

    /// Checks if this signature is a superset of `components`.
    #[must_use]
    pub fn contains_all(&self, components: &[ComponentId]) -> bool {
        components.iter().all(|&c| self.contains(c))
    }

    /// The component ids, in column order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[ComponentId] {
        &self.components
    }

    /// Iterates over the component ids in column order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().copied()
    }

    /// Returns the number of component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Display for ArchetypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{component}")?;
        }
        f.write_str("]")
    }
}

/// Memoized neighbors of an archetype along one component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchetypeEdge {
    /// Archetype reached by adding the component.
    pub add: Option<ArchetypeId>,
    /// Archetype reached by removing the component.
    pub remove: Option<ArchetypeId>,
}

/// A single archetype - stores all entities with the same component set.
#[derive(Debug)]
pub struct Archetype {
    /// Identifier, also the index in the world's archetype list.
    id: ArchetypeId,
    /// Signature identifying this archetype.
    signature: ArchetypeSignature,
    /// Row storage, one column per signature entry.
    table: RowTable,
    /// Owning entity of each row slot (for reverse lookup).
    owners: Vec<Option<EntityId>>,
    /// Transition edges, keyed by the component added or removed.
    edges: HashMap<ComponentId, ArchetypeEdge>,
}

impl Archetype {
    /// Creates an archetype with an empty table.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier assigned by the world
    /// * `signature` - Component set, which fixes the table width
    /// * `capacity` - Maximum number of rows
    #[must_use]
    pub fn new(id: ArchetypeId, signature: ArchetypeSignature, capacity: usize) -> Self {
        let table = RowTable::new(signature.len(), capacity);
        Self {
            id,
            signature,
            table,
            owners: Vec::new(),
            edges: HashMap::new(),
        }
    }

    /// Returns the id of this archetype.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Returns the signature of this archetype.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    /// Returns the row table.
    #[inline]
    #[must_use]
    pub const fn table(&self) -> &RowTable {
        &self.table
    }

    /// Inserts a row with every column unset.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExceeded`](crate::EcsError::CapacityExceeded)
    /// if the table is full.
    pub fn create_empty_row(&mut self, owner: EntityId) -> EcsResult<RowId> {
        let row = self.table.create()?;
        self.set_owner(row, Some(owner));
        Ok(row)
    }

    /// Inserts a row of values owned by `owner`.
    ///
    /// # Errors
    ///
    /// Fails if the table is full or the row has the wrong width.
    pub fn insert_row(&mut self, owner: EntityId, row: Row) -> EcsResult<RowId> {
        let id = self.table.insert(row)?;
        self.set_owner(id, Some(owner));
        Ok(id)
    }

    /// Removes a row, returning its values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`](crate::EcsError::RowNotFound) if the
    /// row is not live.
    pub fn take_row(&mut self, row: RowId) -> EcsResult<Row> {
        let values = self.table.delete(row)?;
        self.set_owner(row, None);
        Ok(values)
    }

    /// Borrows a live row.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`](crate::EcsError::RowNotFound) if the
    /// row is not live.
    #[inline]
    pub fn row(&self, row: RowId) -> EcsResult<&Row> {
        self.table.read(row)
    }

    /// Mutably borrows a live row.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`](crate::EcsError::RowNotFound) if the
    /// row is not live.
    #[inline]
    pub fn row_mut(&mut self, row: RowId) -> EcsResult<&mut Row> {
        self.table.read_mut(row)
    }

    /// Column holding `component`, if this archetype has it.
    #[must_use]
    pub fn index_of_component(&self, component: ComponentId) -> Option<usize> {
        self.signature.iter().position(|c| c == component)
    }

    /// Checks if this archetype has a component.
    #[inline]
    #[must_use]
    pub fn has_component(&self, component: ComponentId) -> bool {
        self.signature.contains(component)
    }

    /// Number of live rows.
    #[inline]
    #[must_use]
    pub fn count_rows(&self) -> usize {
        self.table.len()
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub fn count_components(&self) -> usize {
        self.signature.len()
    }

    /// Checks if one more row fits.
    #[inline]
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.table.has_room()
    }

    /// Entity owning a live row.
    #[must_use]
    pub fn owner(&self, row: RowId) -> Option<EntityId> {
        self.owners.get(row.index()).copied().flatten()
    }

    /// Iterates over live rows with their owners, in ascending row order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, EntityId, &Row)> {
        let owners = &self.owners;
        self.table.iter().filter_map(move |(id, row)| {
            let owner = owners.get(id.index()).copied().flatten()?;
            Some((id, owner, row))
        })
    }

    /// Iterates mutably over live rows with their owners, in ascending row order.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (RowId, EntityId, &mut Row)> {
        let owners = &self.owners;
        self.table.iter_mut().filter_map(move |(id, row)| {
            let owner = owners.get(id.index()).copied().flatten()?;
            Some((id, owner, row))
        })
    }

    /// Transition edge for a component, if one has been recorded.
    #[inline]
    #[must_use]
    pub fn edge(&self, component: ComponentId) -> Option<&ArchetypeEdge> {
        self.edges.get(&component)
    }

    /// Records the archetype reached by adding `component`.
    pub fn set_add_edge(&mut self, component: ComponentId, to: ArchetypeId) {
        self.edges.entry(component).or_default().add = Some(to);
    }

    /// Records the archetype reached by removing `component`.
    pub fn set_remove_edge(&mut self, component: ComponentId, to: ArchetypeId) {
        self.edges.entry(component).or_default().remove = Some(to);
    }

    /// Iterates over all recorded edges.
    pub fn edges(&self) -> impl Iterator<Item = (ComponentId, &ArchetypeEdge)> {
        self.edges.iter().map(|(&c, edge)| (c, edge))
    }

    fn set_owner(&mut self, row: RowId, owner: Option<EntityId>) {
        let index = row.index();
        if index >= self.owners.len() {
            self.owners.resize(index + 1, None);
        }
        self.owners[index] = owner;
    }
}
