//! # Queries and Systems
//!
//! A [`Query`] names the component types to look for. Running it through
//! [`World::select`] visits every live row whose archetype holds all of them,
//! handing each one to a closure as a [`RowView`].
//!
//! A [`System`] pairs a query with the closure so the pair can be re-run
//! whenever the caller decides.

use std::any::TypeId;

use super::archetype::ArchetypeId;
use super::component::Component;
use super::entity::EntityId;
use super::storage::{Row, RowId};
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// Component types to match, in request order.
///
/// # Example
///
/// ```rust
/// use strata_core::{Component, Query};
///
/// #[derive(Debug)]
/// struct Position(f64, f64);
/// impl Component for Position {}
///
/// let query = Query::new().with::<Position>();
/// assert_eq!(query.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<(TypeId, &'static str)>,
}

impl Query {
    /// An empty query. It matches nothing until a type is added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T` to the query. Repeated types are ignored.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        if self.position(type_id).is_none() {
            self.terms.push((type_id, T::name()));
        }
        self
    }

    /// Number of requested types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Checks if no type was requested.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Names of the requested types, in request order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.terms.iter().map(|&(_, name)| name)
    }

    pub(crate) fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.terms.iter().map(|&(type_id, _)| type_id)
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.terms.iter().position(|&(t, _)| t == type_id)
    }
}

/// One matched row, as seen from inside [`World::select`].
///
/// Typed accessors only reach the query's own components; anything else
/// fails with [`EcsError::ComponentNotInQuery`].
#[derive(Debug)]
pub struct RowView<'a> {
    entity: EntityId,
    archetype: ArchetypeId,
    row_id: RowId,
    row: &'a mut Row,
    columns: &'a [usize],
    query: &'a Query,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(
        entity: EntityId,
        archetype: ArchetypeId,
        row_id: RowId,
        row: &'a mut Row,
        columns: &'a [usize],
        query: &'a Query,
    ) -> Self {
        Self {
            entity,
            archetype,
            row_id,
            row,
            columns,
            query,
        }
    }

    /// Owner of the row.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Archetype holding the row.
    #[inline]
    #[must_use]
    pub const fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    /// Row slot inside the archetype's table.
    #[inline]
    #[must_use]
    pub const fn row_id(&self) -> RowId {
        self.row_id
    }

    /// All values of the row, in archetype column order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &Row {
        &*self.row
    }

    /// All values of the row, mutably.
    #[inline]
    pub fn values_mut(&mut self) -> &mut Row {
        &mut *self.row
    }

    /// `columns()[i]` is the column of the query's i-th type.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        self.columns
    }

    /// Column of `T` in this row.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotInQuery`] if `T` was not requested.
    pub fn column_of<T: Component>(&self) -> EcsResult<usize> {
        self.query
            .position(TypeId::of::<T>())
            .and_then(|i| self.columns.get(i).copied())
            .ok_or(EcsError::ComponentNotInQuery(T::name()))
    }

    /// Borrows the `T` value, `None` if the column is unset.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotInQuery`] if `T` was not requested.
    pub fn get<T: Component>(&self) -> EcsResult<Option<&T>> {
        let column = self.column_of::<T>()?;
        Ok(self.row.get_as::<T>(column))
    }

    /// Mutably borrows the `T` value, `None` if the column is unset.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotInQuery`] if `T` was not requested.
    pub fn get_mut<T: Component>(&mut self) -> EcsResult<Option<&mut T>> {
        let column = self.column_of::<T>()?;
        Ok(self.row.get_as_mut::<T>(column))
    }

    /// Overwrites the `T` value in place.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotInQuery`] if `T` was not requested.
    pub fn set<T: Component>(&mut self, value: T) -> EcsResult<()> {
        let column = self.column_of::<T>()?;
        let width = self.row.width();
        self.row
            .set(column, Box::new(value))
            .map(drop)
            .map_err(|_| EcsError::RowWidthMismatch {
                expected: width,
                found: column + 1,
            })
    }
}

/// A named query plus the closure to run on every match.
///
/// # Example
///
/// ```rust
/// use strata_core::{Component, Query, System, World};
///
/// #[derive(Debug)]
/// struct Heat(u32);
/// impl Component for Heat {}
///
/// let mut world = World::new();
/// let stove = world.create_entity()?;
/// world.set_component(stove, Heat(10))?;
///
/// let mut cool = System::new("cool", Query::new().with::<Heat>(), |mut view| {
///     if let Ok(Some(heat)) = view.get_mut::<Heat>() {
///         heat.0 -= 1;
///     }
/// });
/// world.process(&mut cool)?;
/// cool.run(&mut world)?;
///
/// assert_eq!(world.get_component::<Heat>(stove)?.map(|h| h.0), Some(8));
/// # Ok::<(), strata_core::EcsError>(())
/// ```
pub struct System<F> {
    name: String,
    query: Query,
    body: F,
}

impl<F> System<F>
where
    F: FnMut(RowView<'_>),
{
    /// Creates a system.
    pub fn new(name: impl Into<String>, query: Query, body: F) -> Self {
        Self {
            name: name.into(),
            query,
            body,
        }
    }

    /// Name given at creation.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The system's query.
    #[inline]
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Runs the closure over every current match.
    ///
    /// # Returns
    ///
    /// The number of rows visited.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`World::select`].
    pub fn run(&mut self, world: &mut World) -> EcsResult<usize> {
        let visited = world.select(&self.query, &mut self.body)?;
        tracing::trace!("System {} visited {} rows", self.name, visited);
        Ok(visited)
    }
}

impl<F> std::fmt::Debug for System<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
