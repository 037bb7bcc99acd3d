//! Storage change/migration types for the ECS.
//!
//! This module provides a unified abstraction for storage mutations:
//! - `Spawn`: Add an entity with components to a table
//! - `Despawn`: Remove an entity from a table
//! - `Migrate`: Move an entity between tables (component add/remove)

use crate::ecs::{
    entity,
    storage::{row::Row, table, value::Values, Table},
};

/// Trait for applying components to a table row, used for type-erased component sets.
///
/// This enables `Change::Spawn` and `Change::Migrate` to work with any [`Values`] type
/// while being stored as a trait object.
pub trait ApplyOnce: Send {
    /// Apply the components to the target table at the given (already reserved) row.
    ///
    /// # Safety
    /// The caller must ensure that:
    /// - The table has the correct columns for the components being applied
    /// - The table has reserved space for the row
    fn apply_once(self: Box<Self>, target: &mut Table, row: Row);
}

/// Blanket implementation of `ApplyOnce` for any `Values` type.
impl<S: Values + Send> ApplyOnce for S {
    fn apply_once(self: Box<Self>, target: &mut Table, row: Row) {
        (*self).apply(target, row);
    }
}

/// Source location for a migration operation.
#[derive(Debug, Clone, Copy)]
pub struct MigrationSource {
    /// The source table ID.
    pub table: table::Id,
    /// The row in the source table.
    pub row: Row,
}

impl MigrationSource {
    /// Create a new migration source.
    pub fn new(table: table::Id, row: Row) -> Self {
        Self { table, row }
    }
}

/// A storage change operation.
///
/// Changes are created by the World and executed by Storage.
/// Each change represents a single atomic modification to the storage layer.
pub enum Change<'a> {
    /// Spawn: Add an entity with components to a single table.
    Spawn {
        /// The entity being spawned.
        entity: entity::Entity,
        /// The target table ID.
        table: table::Id,
        /// The components to add (Option allows .take() during batch execution).
        components: Option<Box<dyn ApplyOnce + 'a>>,
    },

    /// Despawn: Remove an entity from a single table.
    Despawn {
        /// The entity being despawned.
        entity: entity::Entity,
        /// The table containing the entity.
        table: table::Id,
        /// The row in the table.
        row: Row,
    },

    /// Migrate: Move an entity between tables (for component add/remove).
    Migrate {
        /// The entity being migrated.
        entity: entity::Entity,
        /// The source table and row.
        source: MigrationSource,
        /// The target table ID.
        target: table::Id,
        /// New components to add (None for component removal).
        additions: Option<Box<dyn ApplyOnce + 'a>>,
    },
}

impl<'a> Change<'a> {
    /// Create a spawn change.
    pub fn spawn<S: Values + Send + 'a>(
        entity: entity::Entity,
        table: table::Id,
        components: S,
    ) -> Self {
        Change::Spawn {
            entity,
            table,
            components: Some(Box::new(components)),
        }
    }

    /// Create a despawn change.
    pub fn despawn(entity: entity::Entity, table: table::Id, row: Row) -> Self {
        Change::Despawn { entity, table, row }
    }

    /// Create a migration change (for component removal).
    pub fn migrate(entity: entity::Entity, source: MigrationSource, target: table::Id) -> Self {
        Change::Migrate {
            entity,
            source,
            target,
            additions: None,
        }
    }

    /// Create a migration change with new components (for component addition).
    pub fn migrate_with<S: Values + Send + 'a>(
        entity: entity::Entity,
        source: MigrationSource,
        target: table::Id,
        additions: S,
    ) -> Self {
        Change::Migrate {
            entity,
            source,
            target,
            additions: Some(Box::new(additions)),
        }
    }
}

/// Result of executing a storage change.
///
/// Contains information needed to update entity registries and handle
/// entities that were relocated during swap-remove operations.
#[derive(Debug)]
pub enum ChangeResult {
    /// Result of a spawn operation.
    Spawned {
        /// The row where the entity was placed.
        row: Row,
    },

    /// Result of a despawn operation.
    Despawned {
        /// Entity that was moved to fill the gap (if any).
        /// This entity's location needs to be updated in the entity registry.
        moved_entity: Option<entity::Entity>,
    },

    /// Result of a migration operation.
    Migrated {
        /// The row in the target table where the entity was placed.
        new_row: Row,
        /// Entity that was moved in the source table to fill the gap (if any).
        source_moved: Option<entity::Entity>,
    },
}
