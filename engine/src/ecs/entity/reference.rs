//! Safe, validated references to an entity's component data.
//!
//! These are thin views over a [`Table`] row, scoped to a single entity. They exist so
//! callers don't need to juggle `(Table, Row)` pairs directly when reading or writing one
//! entity's components.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::ecs::{
    component::{self, Component},
    entity::Entity,
    storage::{Row, Table},
    world::TypeId,
};

/// Stamps a component's last-write tick on mutable access, so the world's query cache
/// knows to invalidate entries touching it.
///
/// A [`RefMut`] without a tracker (constructed via [`RefMut::new`]) performs no change
/// tracking; only `World::entity_mut` attaches one.
pub(crate) struct ChangeTracker<'w> {
    last_write: &'w RefCell<HashMap<TypeId, u64>>,
    tick: u64,
}

impl<'w> ChangeTracker<'w> {
    #[inline]
    pub(crate) fn new(last_write: &'w RefCell<HashMap<TypeId, u64>>, tick: u64) -> Self {
        Self { last_write, tick }
    }

    fn mark(&self, id: component::Id) {
        self.last_write.borrow_mut().insert(id, self.tick);
    }
}

/// An immutable view of a spawned entity's component data.
pub struct Ref<'w> {
    entity: Entity,
    table: &'w Table,
    row: Row,
}

impl<'w> Ref<'w> {
    #[inline]
    pub(crate) fn new(entity: Entity, table: &'w Table, row: Row) -> Self {
        Self { entity, table, row }
    }

    /// The entity this reference points to.
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Get a reference to the given component type, if the entity has it.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<&C> {
        unsafe { self.table.get::<C>(self.row) }
    }

    /// Determine whether the entity has the given component type.
    #[inline]
    pub fn has<C: Component>(&self) -> bool {
        self.table.get_column::<C>().is_some()
    }
}

/// A mutable view of a spawned entity's component data.
pub struct RefMut<'w> {
    entity: Entity,
    table: &'w mut Table,
    row: Row,
    tracker: Option<ChangeTracker<'w>>,
}

impl<'w> RefMut<'w> {
    #[inline]
    pub(crate) fn new(entity: Entity, table: &'w mut Table, row: Row) -> Self {
        Self {
            entity,
            table,
            row,
            tracker: None,
        }
    }

    /// Construct a `RefMut` that stamps each mutably-accessed component's last-write
    /// tick through `tracker`. Used by `World::entity_mut` so changes made through an
    /// entity reference participate in query-cache invalidation.
    #[inline]
    pub(crate) fn new_tracked(
        entity: Entity,
        table: &'w mut Table,
        row: Row,
        tracker: ChangeTracker<'w>,
    ) -> Self {
        Self {
            entity,
            table,
            row,
            tracker: Some(tracker),
        }
    }

    /// The entity this reference points to.
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Get a reference to the given component type, if the entity has it.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<&C> {
        unsafe { self.table.get::<C>(self.row) }
    }

    /// Get a mutable reference to the given component type, if the entity has it.
    ///
    /// If this reference was constructed with a change tracker, this stamps the
    /// component's last-write tick before returning.
    #[inline]
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        if let Some(tracker) = &self.tracker
            && let Some(info) = self.table.get_column::<C>().map(|col| col.info().id())
        {
            tracker.mark(info);
        }
        unsafe { self.table.get_mut::<C>(self.row) }
    }

    /// Determine whether the entity has the given component type.
    #[inline]
    pub fn has<C: Component>(&self) -> bool {
        self.table.get_column::<C>().is_some()
    }
}
