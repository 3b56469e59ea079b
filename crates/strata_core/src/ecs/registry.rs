//! # Component Registry
//!
//! Assigns [`ComponentId`]s to Rust types and keeps the reverse index from
//! each component to the archetypes (and columns) that hold it.

use std::any::TypeId;
use std::collections::HashMap;

use super::archetype::{ArchetypeId, ArchetypeSignature};
use super::component::{Component, ComponentId, ComponentMarker};
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// What the registry knows about one component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Assigned id.
    pub id: ComponentId,
    /// Short type name.
    pub name: &'static str,
    /// Rust type.
    pub type_id: TypeId,
    /// Entity tagged with this component's marker, once created.
    pub descriptor: Option<EntityId>,
}

/// Maps component types to ids, in registration order.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that already knows [`ComponentMarker`] as
    /// [`ComponentId::MARKER`].
    #[must_use]
    pub fn bootstrap() -> Self {
        let mut registry = Self::new();
        registry.push::<ComponentMarker>(ComponentId::MARKER);
        registry
    }

    /// Resolves `T`, assigning the next id on first sight.
    ///
    /// # Returns
    ///
    /// The id, and whether it was assigned by this call.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if no component id is left.
    pub fn register<T: Component>(&mut self) -> EcsResult<(ComponentId, bool)> {
        if let Some(id) = self.id_of::<T>() {
            return Ok((id, false));
        }

        let id = self.next_id()?;
        self.push::<T>(id);
        Ok((id, true))
    }

    /// Id the next new component will get.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] if no component id is left.
    pub fn next_id(&self) -> EcsResult<ComponentId> {
        u32::try_from(self.infos.len())
            .map(ComponentId::from_raw)
            .map_err(|_| EcsError::IdSpaceExhausted("component"))
    }

    fn push<T: Component>(&mut self, id: ComponentId) {
        let type_id = TypeId::of::<T>();
        self.by_type.insert(type_id, id);
        self.infos.push(ComponentInfo {
            id,
            name: T::name(),
            type_id,
            descriptor: None,
        });
    }

    /// Id of `T`, if registered.
    #[inline]
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.id_of_type(TypeId::of::<T>())
    }

    /// Id of a type, if registered.
    #[inline]
    #[must_use]
    pub fn id_of_type(&self, type_id: TypeId) -> Option<ComponentId> {
        self.by_type.get(&type_id).copied()
    }

    /// Registration details of a component.
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.raw() as usize)
    }

    /// Records the descriptor entity of a component.
    pub fn set_descriptor(&mut self, id: ComponentId, entity: EntityId) {
        if let Some(info) = self.infos.get_mut(id.raw() as usize) {
            info.descriptor = Some(entity);
        }
    }

    /// All registered components, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    /// Number of registered components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Checks if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

/// Reverse index: component -> archetype -> column.
///
/// Signatures never change after an archetype is created, so each archetype
/// is indexed exactly once.
#[derive(Debug, Default)]
pub struct ComponentIndex {
    columns: HashMap<ComponentId, HashMap<ArchetypeId, usize>>,
}

impl ComponentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every column of a new archetype.
    pub fn insert_archetype(&mut self, archetype: ArchetypeId, signature: &ArchetypeSignature) {
        for (column, component) in signature.iter().enumerate() {
            self.columns
                .entry(component)
                .or_default()
                .insert(archetype, column);
        }
    }

    /// Column of `component` in `archetype`.
    #[must_use]
    pub fn column(&self, component: ComponentId, archetype: ArchetypeId) -> Option<usize> {
        self.columns.get(&component)?.get(&archetype).copied()
    }

    /// Archetypes holding `component`, in ascending id order.
    #[must_use]
    pub fn archetypes_with(&self, component: ComponentId) -> Vec<ArchetypeId> {
        let mut found: Vec<_> = self
            .columns
            .get(&component)
            .map(|by_archetype| by_archetype.keys().copied().collect())
            .unwrap_or_default();
        found.sort_unstable();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::ComponentData;

    #[derive(Debug)]
    struct Armor;
    impl Component for Armor {}

    #[derive(Debug)]
    struct Shield;
    impl Component for Shield {}

    #[test]
    fn test_register_is_stable() {
        let mut registry = ComponentRegistry::new();
        let (armor, fresh) = registry.register::<Armor>().unwrap();
        assert!(fresh);
        let (shield, _) = registry.register::<Shield>().unwrap();
        assert_ne!(armor, shield);

        assert_eq!(registry.register::<Armor>(), Ok((armor, false)));
        assert_eq!(registry.id_of::<Shield>(), Some(shield));
        assert_eq!(registry.info(armor).map(|info| info.name), Some(Armor.component_name()));
        assert_eq!(registry.info(shield).map(|info| info.name), Some(Shield.component_name()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_descriptor() {
        let mut registry = ComponentRegistry::new();
        let (armor, _) = registry.register::<Armor>().unwrap();
        registry.set_descriptor(armor, EntityId::from_raw(4));
        assert_eq!(
            registry.info(armor).and_then(|info| info.descriptor),
            Some(EntityId::from_raw(4))
        );
    }

    #[test]
    fn test_bootstrap_knows_marker() {
        let mut registry = ComponentRegistry::bootstrap();
        assert_eq!(registry.id_of::<ComponentMarker>(), Some(ComponentId::MARKER));
        assert_eq!(registry.next_id(), Ok(ComponentId::from_raw(1)));

        let (armor, _) = registry.register::<Armor>().unwrap();
        assert_eq!(armor, ComponentId::from_raw(1));
        assert_eq!(registry.next_id(), Ok(ComponentId::from_raw(2)));
    }

    #[test]
    fn test_index_columns() {
        let mut index = ComponentIndex::new();
        let a = ComponentId::from_raw(1);
        let b = ComponentId::from_raw(2);

        index.insert_archetype(ArchetypeId::from_raw(2), &ArchetypeSignature::new(vec![b, a]));
        index.insert_archetype(ArchetypeId::from_raw(1), &ArchetypeSignature::new(vec![b]));

        assert_eq!(index.column(a, ArchetypeId::from_raw(2)), Some(0));
        assert_eq!(index.column(b, ArchetypeId::from_raw(2)), Some(1));
        assert_eq!(index.column(b, ArchetypeId::from_raw(1)), Some(0));
        assert_eq!(index.column(a, ArchetypeId::from_raw(1)), None);
        assert_eq!(
            index.archetypes_with(b),
            vec![ArchetypeId::from_raw(1), ArchetypeId::from_raw(2)]
        );
        assert!(index.archetypes_with(ComponentId::from_raw(9)).is_empty());
    }
}
