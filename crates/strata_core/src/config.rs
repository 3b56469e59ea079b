//! # World Configuration
//!
//! Row tables never grow, so their size has to be decided up front. The
//! numbers live here and are loaded once, at world creation, either from
//! code or from a TOML file:
//!
//! ```toml
//! table_capacity = 65536
//! root_capacity = 262144
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default number of rows per archetype table.
pub const DEFAULT_TABLE_CAPACITY: usize = 65_536;

/// Sizing parameters for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Maximum number of live rows in every non-empty archetype.
    pub table_capacity: usize,
    /// Maximum number of live rows in the empty (root) archetype.
    ///
    /// Every freshly created entity occupies a row here until it receives its
    /// first component. Falls back to `table_capacity` when unset.
    pub root_capacity: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            table_capacity: DEFAULT_TABLE_CAPACITY,
            root_capacity: None,
        }
    }
}

impl WorldConfig {
    /// Small tables, for tests and tools that only hold a handful of entities.
    #[must_use]
    pub const fn small() -> Self {
        Self {
            table_capacity: 256,
            root_capacity: None,
        }
    }

    /// Config with the same capacity for every table.
    #[must_use]
    pub const fn with_capacity(table_capacity: usize) -> Self {
        Self {
            table_capacity,
            root_capacity: None,
        }
    }

    /// Capacity of the root archetype's table.
    #[must_use]
    pub fn root_capacity(&self) -> usize {
        self.root_capacity.unwrap_or(self.table_capacity)
    }

    /// Checks that every capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if any capacity is zero.
    pub fn validate(&self) -> EcsResult<()> {
        if self.table_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "table_capacity must be greater than zero".into(),
            ));
        }
        if self.root_capacity == Some(0) {
            return Err(EcsError::InvalidConfig(
                "root_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| EcsError::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EcsError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}
