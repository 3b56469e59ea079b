//! # Storage Error Types
//!
//! All errors that can occur while mutating or querying a [`World`](crate::World).

use thiserror::Error;

use crate::ecs::{ArchetypeId, ComponentId, EntityId, RowId};

/// Why a row lookup failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowMissing {
    /// The slot index was never handed out by the table.
    NeverAllocated,
    /// The slot was allocated and has since been tombstoned.
    Deleted,
}

impl std::fmt::Display for RowMissing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeverAllocated => f.write_str("never allocated"),
            Self::Deleted => f.write_str("deleted"),
        }
    }
}

/// Errors that can occur in the storage engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity has no directory binding (never created, or deleted).
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// A row id did not resolve to a live row in its table.
    #[error("row {row} not found: {reason}")]
    RowNotFound {
        /// The requested row.
        row: RowId,
        /// Whether the slot was never allocated or was deleted.
        reason: RowMissing,
    },

    /// A row table is full and holds no reclaimable tombstones.
    #[error("table full: capacity {capacity}")]
    CapacityExceeded {
        /// Fixed capacity of the table.
        capacity: usize,
    },

    /// The component type was never registered with the world.
    #[error("component {0} is not registered")]
    ComponentNotRegistered(&'static str),

    /// The entity's archetype does not contain the component.
    #[error("entity {entity} has no {component} component")]
    ComponentNotPresent {
        /// The entity that was addressed.
        entity: EntityId,
        /// Name of the missing component type.
        component: &'static str,
    },

    /// Typed access inside a query asked for a type the query did not request.
    #[error("component {0} is not part of the query")]
    ComponentNotInQuery(&'static str),

    /// An update transform returned a row with a different number of columns.
    #[error("row width mismatch: expected {expected} columns, found {found}")]
    RowWidthMismatch {
        /// Column count of the archetype.
        expected: usize,
        /// Column count of the supplied row.
        found: usize,
    },

    /// The component index has no column for a component the archetype holds.
    #[error("component index out of sync: {component} missing for archetype {archetype}")]
    IndexOutOfSync {
        /// The component without an index entry.
        component: ComponentId,
        /// The archetype that should contain it.
        archetype: ArchetypeId,
    },

    /// Every id of a 32-bit id space is taken.
    #[error("out of {0} ids")]
    IdSpaceExhausted(&'static str),

    /// Invalid configuration file or values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for storage operations.
pub type EcsResult<T> = Result<T, EcsError>;
