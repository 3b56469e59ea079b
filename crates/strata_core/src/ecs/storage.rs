//! # Row Storage
//!
//! Fixed-capacity, sparse row tables. Every archetype owns one table whose
//! rows hold one value per column of the archetype's signature.
//!
//! The table is a slot array:
//! - Deleting a row tombstones its slot; other rows never move, so a
//!   [`RowId`] stays valid until that row itself is deleted
//! - New rows reuse the lowest tombstoned slot before extending the array
//! - The array never grows past the capacity given at creation

use std::collections::BTreeSet;
use std::fmt;

use super::component::{BoxedComponent, Component, ComponentData};
use crate::error::{EcsError, EcsResult, RowMissing};

/// Number of slots reserved up front, regardless of capacity.
const PREALLOCATED_ROWS: usize = 1024;

/// Index of a row slot inside a [`RowTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RowId(usize);

impl RowId {
    /// Creates a row id from a slot index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entity's values, one entry per archetype column.
///
/// An entry is `None` while the component is attached but has no value yet.
#[derive(Debug, Default)]
pub struct Row {
    values: Vec<Option<BoxedComponent>>,
}

impl Row {
    /// A row of `width` unset entries.
    #[must_use]
    pub fn vacant(width: usize) -> Self {
        Self {
            values: std::iter::repeat_with(|| None).take(width).collect(),
        }
    }

    /// A row holding the given entries, in column order.
    #[must_use]
    pub fn from_values(values: Vec<Option<BoxedComponent>>) -> Self {
        Self { values }
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Checks if a column holds a value.
    #[inline]
    #[must_use]
    pub fn is_set(&self, column: usize) -> bool {
        matches!(self.values.get(column), Some(Some(_)))
    }

    /// Borrows the value in a column.
    #[inline]
    #[must_use]
    pub fn get(&self, column: usize) -> Option<&(dyn ComponentData + 'static)> {
        self.values.get(column)?.as_deref()
    }

    /// Borrows the value in a column as a `T`.
    #[inline]
    #[must_use]
    pub fn get_as<T: Component>(&self, column: usize) -> Option<&T> {
        self.values
            .get(column)?
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutably borrows the value in a column as a `T`.
    #[inline]
    pub fn get_as_mut<T: Component>(&mut self, column: usize) -> Option<&mut T> {
        self.values
            .get_mut(column)?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Stores a value in a column, returning the previous one.
    ///
    /// # Returns
    ///
    /// `Err(value)` if the column is outside the row.
    pub fn set(
        &mut self,
        column: usize,
        value: BoxedComponent,
    ) -> Result<Option<BoxedComponent>, BoxedComponent> {
        match self.values.get_mut(column) {
            Some(slot) => Ok(slot.replace(value)),
            None => Err(value),
        }
    }

    /// Takes the value out of a column, leaving it unset.
    #[inline]
    pub fn take(&mut self, column: usize) -> Option<BoxedComponent> {
        self.values.get_mut(column)?.take()
    }

    /// Iterates over the entries in column order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&(dyn ComponentData + 'static)>> {
        self.values.iter().map(Option::as_deref)
    }

    /// Consumes the row, returning its entries.
    #[must_use]
    pub fn into_values(self) -> Vec<Option<BoxedComponent>> {
        self.values
    }
}

/// Fixed-capacity sparse table of rows.
///
/// # Example
///
/// ```rust
/// use strata_core::{Row, RowTable};
///
/// let mut table = RowTable::new(2, 8);
/// let row = table.create()?;
/// assert_eq!(table.read(row)?.width(), 2);
///
/// table.delete(row)?;
/// assert_eq!(table.len(), 0);
/// # Ok::<(), strata_core::EcsError>(())
/// ```
#[derive(Debug)]
pub struct RowTable {
    /// Slot array. `None` marks a tombstone; the length is the high-water mark.
    slots: Vec<Option<Row>>,
    /// Tombstoned slot indices, reused lowest first.
    tombstones: BTreeSet<usize>,
    /// Columns per row.
    width: usize,
    /// Maximum number of slots.
    capacity: usize,
}

impl RowTable {
    /// Creates an empty table.
    ///
    /// # Arguments
    ///
    /// * `width` - Number of columns in every row
    /// * `capacity` - Maximum number of slots
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(width: usize, capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            slots: Vec::with_capacity(capacity.min(PREALLOCATED_ROWS)),
            tombstones: BTreeSet::new(),
            width,
            capacity,
        }
    }

    /// Returns the capacity of this table.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of columns per row.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of live rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.tombstones.len()
    }

    /// Checks if the table has no live rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if one more row can be allocated.
    #[inline]
    #[must_use]
    pub fn has_room(&self) -> bool {
        !self.tombstones.is_empty() || self.slots.len() < self.capacity
    }

    /// Checks if a row is live.
    #[inline]
    #[must_use]
    pub fn exists(&self, row: RowId) -> bool {
        matches!(self.slots.get(row.0), Some(Some(_)))
    }

    /// Allocates a row with every column unset.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExceeded`] if the table is full.
    pub fn create(&mut self) -> EcsResult<RowId> {
        self.insert(Row::vacant(self.width))
    }

    /// Allocates a row holding `row`'s values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowWidthMismatch`] if the row has the wrong number
    /// of columns, or [`EcsError::CapacityExceeded`] if the table is full.
    pub fn insert(&mut self, row: Row) -> EcsResult<RowId> {
        self.check_width(&row)?;
        let index = self.next_slot()?;
        self.slots[index] = Some(row);
        Ok(RowId(index))
    }

    /// Borrows a live row.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`] if the row was never allocated or
    /// has been deleted.
    pub fn read(&self, row: RowId) -> EcsResult<&Row> {
        match self.slots.get(row.0) {
            Some(Some(values)) => Ok(values),
            Some(None) => Err(Self::missing(row, RowMissing::Deleted)),
            None => Err(Self::missing(row, RowMissing::NeverAllocated)),
        }
    }

    /// Mutably borrows a live row.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`] under the same conditions as
    /// [`read`](Self::read).
    pub fn read_mut(&mut self, row: RowId) -> EcsResult<&mut Row> {
        match self.slots.get_mut(row.0) {
            Some(Some(values)) => Ok(values),
            Some(None) => Err(Self::missing(row, RowMissing::Deleted)),
            None => Err(Self::missing(row, RowMissing::NeverAllocated)),
        }
    }

    /// Overwrites one column of a live row, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`] if the row is not live, or
    /// [`EcsError::RowWidthMismatch`] if the column is outside the row.
    pub fn update_column(
        &mut self,
        row: RowId,
        column: usize,
        value: BoxedComponent,
    ) -> EcsResult<Option<BoxedComponent>> {
        let width = self.width;
        self.read_mut(row)?
            .set(column, value)
            .map_err(|_| EcsError::RowWidthMismatch {
                expected: width,
                found: column + 1,
            })
    }

    /// Replaces all values of a live row, returning the previous row.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowWidthMismatch`] if the new row has the wrong
    /// number of columns, or [`EcsError::RowNotFound`] if the row is not live.
    pub fn update(&mut self, row: RowId, values: Row) -> EcsResult<Row> {
        self.check_width(&values)?;
        let slot = self.read_mut(row)?;
        Ok(std::mem::replace(slot, values))
    }

    /// Deletes a live row, returning its values.
    ///
    /// The slot is tombstoned; no other row moves.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RowNotFound`] if the row is not live.
    pub fn delete(&mut self, row: RowId) -> EcsResult<Row> {
        let values = match self.slots.get_mut(row.0) {
            Some(slot) => slot
                .take()
                .ok_or_else(|| Self::missing(row, RowMissing::Deleted))?,
            None => return Err(Self::missing(row, RowMissing::NeverAllocated)),
        };
        self.tombstones.insert(row.0);
        Ok(values)
    }

    /// Iterates over live rows in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &Row)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|row| (RowId(index), row)))
    }

    /// Iterates mutably over live rows in ascending slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RowId, &mut Row)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|row| (RowId(index), row)))
    }

    fn next_slot(&mut self) -> EcsResult<usize> {
        if let Some(index) = self.tombstones.pop_first() {
            return Ok(index);
        }
        if self.slots.len() >= self.capacity {
            return Err(EcsError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.slots.push(None);
        Ok(self.slots.len() - 1)
    }

    fn check_width(&self, row: &Row) -> EcsResult<()> {
        if row.width() == self.width {
            Ok(())
        } else {
            Err(EcsError::RowWidthMismatch {
                expected: self.width,
                found: row.width(),
            })
        }
    }

    fn missing(row: RowId, reason: RowMissing) -> EcsError {
        EcsError::RowNotFound { row, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Lightning(u32);
    impl Component for Lightning {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tablets(u32);
    impl Component for Tablets {}

    fn row_of(lightning: u32, tablets: u32) -> Row {
        Row::from_values(vec![
            Some(Box::new(Lightning(lightning)) as BoxedComponent),
            Some(Box::new(Tablets(tablets)) as BoxedComponent),
        ])
    }

    #[test]
    fn test_table_without_columns() {
        let mut table = RowTable::new(0, 1);
        let row = table.create().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.read(row).unwrap().width(), 0);
    }

    #[test]
    fn test_create_is_vacant() {
        let mut table = RowTable::new(2, 1);
        let row = table.create().unwrap();
        let values = table.read(row).unwrap();
        assert!(!values.is_set(0));
        assert!(!values.is_set(1));
    }

    #[test]
    fn test_insert_and_read() {
        let mut table = RowTable::new(2, 1);
        let row = table.insert(row_of(1, 5)).unwrap();

        let values = table.read(row).unwrap();
        assert_eq!(values.get_as::<Lightning>(0), Some(&Lightning(1)));
        assert_eq!(values.get_as::<Tablets>(1), Some(&Tablets(5)));
        assert!(values.get_as::<Tablets>(0).is_none());
    }

    #[test]
    fn test_update_column() {
        let mut table = RowTable::new(2, 1);
        let row = table.insert(row_of(1, 5)).unwrap();

        let previous = table
            .update_column(row, 0, Box::new(Lightning(2600)))
            .unwrap()
            .unwrap();
        assert_eq!(previous.downcast_ref::<Lightning>(), Some(&Lightning(1)));
        assert_eq!(
            table.read(row).unwrap().get_as::<Lightning>(0),
            Some(&Lightning(2600))
        );

        let err = table.update_column(row, 2, Box::new(Lightning(0))).unwrap_err();
        assert!(matches!(err, EcsError::RowWidthMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn test_update_whole_row() {
        let mut table = RowTable::new(2, 1);
        let row = table.insert(row_of(1, 5)).unwrap();

        table.update(row, row_of(7, 8)).unwrap();
        assert_eq!(table.read(row).unwrap().get_as::<Tablets>(1), Some(&Tablets(8)));

        let err = table.update(row, Row::vacant(1)).unwrap_err();
        assert_eq!(err, EcsError::RowWidthMismatch { expected: 2, found: 1 });
    }

    #[test]
    fn test_delete_tombstones() {
        let mut table = RowTable::new(2, 4);
        let first = table.insert(row_of(1, 1)).unwrap();
        let second = table.insert(row_of(2, 2)).unwrap();

        let removed = table.delete(first).unwrap();
        assert_eq!(removed.get_as::<Lightning>(0), Some(&Lightning(1)));
        assert_eq!(table.len(), 1);

        // The surviving row keeps its slot.
        assert_eq!(table.read(second).unwrap().get_as::<Lightning>(0), Some(&Lightning(2)));
        assert_eq!(
            table.read(first).unwrap_err(),
            EcsError::RowNotFound {
                row: first,
                reason: RowMissing::Deleted
            }
        );
        assert_eq!(
            table.delete(first).unwrap_err(),
            EcsError::RowNotFound {
                row: first,
                reason: RowMissing::Deleted
            }
        );
    }

    #[test]
    fn test_read_never_allocated() {
        let table = RowTable::new(1, 4);
        assert_eq!(
            table.read(RowId::new(3)).unwrap_err(),
            EcsError::RowNotFound {
                row: RowId::new(3),
                reason: RowMissing::NeverAllocated
            }
        );
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut table = RowTable::new(1, 3);
        for _ in 0..3 {
            table.create().unwrap();
        }
        assert!(!table.has_room());
        assert_eq!(
            table.create().unwrap_err(),
            EcsError::CapacityExceeded { capacity: 3 }
        );
    }

    #[test]
    fn test_reuses_lowest_tombstone() {
        let mut table = RowTable::new(0, 4);
        let rows: Vec<_> = (0..4).map(|_| table.create().unwrap()).collect();

        table.delete(rows[2]).unwrap();
        table.delete(rows[1]).unwrap();
        assert!(table.has_room());

        assert_eq!(table.create().unwrap(), rows[1]);
        assert_eq!(table.create().unwrap(), rows[2]);
        assert!(table.create().is_err());
    }

    #[test]
    fn test_iter_skips_tombstones() {
        let mut table = RowTable::new(2, 8);
        let rows: Vec<_> = (0..5).map(|i| table.insert(row_of(i, i)).unwrap()).collect();
        table.delete(rows[0]).unwrap();
        table.delete(rows[3]).unwrap();

        let seen: Vec<_> = table.iter().map(|(row, _)| row.index()).collect();
        assert_eq!(seen, vec![1, 2, 4]);

        // Restartable: a second pass sees the same rows.
        assert_eq!(table.iter().count(), 3);
    }

    #[test]
    fn test_iter_mut_in_place() {
        let mut table = RowTable::new(2, 8);
        let row = table.insert(row_of(1, 1)).unwrap();

        for (_, values) in table.iter_mut() {
            if let Some(lightning) = values.get_as_mut::<Lightning>(0) {
                lightning.0 += 10;
            }
        }
        assert_eq!(table.read(row).unwrap().get_as::<Lightning>(0), Some(&Lightning(11)));
    }
}
