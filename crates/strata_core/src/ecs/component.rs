//! # Component System
//!
//! Components are pure data containers with no behavior. Each Rust type
//! implementing [`Component`] is registered with a world once and receives a
//! stable [`ComponentId`]. Rows store values type-erased as
//! [`BoxedComponent`]; typed access downcasts through [`ComponentData`].

use std::any::{type_name, Any};
use std::fmt;

/// Marker trait for storable components.
///
/// # Example
///
/// ```rust
/// use strata_core::Component;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Position {
///     x: f64,
///     y: f64,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: Any + fmt::Debug + Send + Sync {
    /// Name used in errors and diagnostics.
    ///
    /// Defaults to the type name without its module path.
    fn name() -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // Generic arguments may contain paths of their own; only strip the outer one.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Stable identifier of a registered component type.
///
/// Ids are assigned in registration order; the ordering of ids is the column
/// order of every archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Id of [`ComponentMarker`], registered during world bootstrap.
    pub const MARKER: Self = Self(0);

    /// Creates a component id from its raw value.
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
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object-safe view of a component value.
///
/// Implemented for every [`Component`]; never implement it by hand.
pub trait ComponentData: Any + fmt::Debug + Send + Sync {
    /// Borrows the value as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrows the value as [`Any`] for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Name of the concrete component type.
    fn component_name(&self) -> &'static str;
}

impl<T: Component> ComponentData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_name(&self) -> &'static str {
        T::name()
    }
}

impl dyn ComponentData {
    /// Checks if the value is a `T`.
    #[inline]
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Returns the value as a `T`, if it is one.
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns the value mutably as a `T`, if it is one.
    #[inline]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// A type-erased, owned component value.
pub type BoxedComponent = Box<dyn ComponentData>;

/// Tag carried by component descriptor entities.
///
/// Registering a component creates one entity holding this marker, so the
/// set of known component types can be queried like any other data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentMarker {
    /// The component this entity describes.
    pub component: ComponentId,
    /// The component's name.
    pub name: &'static str,
}

impl Component for ComponentMarker {}
