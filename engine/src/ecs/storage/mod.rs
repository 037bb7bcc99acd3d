//! Type-erased columnar storage for Entity Component System (ECS).
//!
//! This module provides the foundational storage layer for the ECS, implementing efficient,
//! cache-friendly columnar storage with type erasure. It enables storing heterogeneous component
//! types in a uniform, high-performance manner while maintaining memory safety through careful
//! abstraction layers.
//!
//! # Architecture Overview
//!
//! The storage system is built on a layered architecture where each layer provides progressively
//! safer abstractions:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Application Layer                                              │
//! │  - Queries, Systems, Component Access                           │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │
//! ┌────────────────────────────▼────────────────────────────────────┐
//! │  Tables (this module)                                           │
//! │  - High-level: Multi-column entity storage (archetype pattern)  │
//! │  - Type-safe API with runtime validation                        │
//! │  - Entity → Row index mapping                                   │
//! └──────────────┬───────────────────────────┬──────────────────────┘
//!                │                           │
//!       ┌────────▼─────────┐        ┌────────▼─────────┐
//!       │  Column          │        │  Index           │
//!       │  - Type-erased   │        │  - Entity → Row  │
//!       │  - Debug checks  │        │  - O(1) lookup   │
//!       └────────┬─────────┘        └──────────────────┘
//!                │
//!       ┌────────▼─────────┐
//!       │  IndexedMemory   │
//!       │  - Raw unsafe    │
//!       │  - Zero-cost     │
//!       └──────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Columnar Storage (Structure of Arrays)
//!
//! Instead of storing entity data as `Vec<(Entity, ComponentA, ComponentB)>`, we use
//! **columnar storage** where each component type gets its own contiguous array:
//!
//! ```text
//!
//! Columnar (Structure of Arrays):
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Entities: [E1, E2, E3]                                      │
//! │                                                             │
//! │ Position Column: [Pos{x:1,y:2}, Pos{x:3,y:4}, Pos{x:5,y:6}] │ ← Cache-friendly!
//! │                  ▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲▲   │
//! │                  All sequential in memory                   │
//! │                                                             │
//! │ Velocity Column: [Vel{dx:0.5}, Vel{dx:-0.2}, Vel{dx:0.0}]   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! **Benefits:**
//! - **Cache efficiency**: Iterating positions reads sequential memory
//! - **SIMD potential**: Contiguous data enables vectorization
//! - **No wasted space**: No `Option<Component>` for missing components
//! - **Flexible schemas**: Easy to add/remove component types
//!
//! ## Archetype Pattern
//!
//! Entities with the **exact same set of components** are stored in the same [`Table`].
//! Each unique component combination creates a new archetype:
//!
//! ```text
//! World:
//!   Table 1: [Position, Velocity]          ← Archetype A
//!     - Entity 0: Pos, Vel
//!     - Entity 1: Pos, Vel
//!     - Entity 5: Pos, Vel
//!
//!   Table 2: [Position, Health]            ← Archetype B
//!     - Entity 2: Pos, Health
//!     - Entity 4: Pos, Health
//!
//!   Table 3: [Position, Velocity, Health]  ← Archetype C
//!     - Entity 3: Pos, Vel, Health
//! ```
//!
//! **Benefits:**
//! - Fast iteration (no sparse checks)
//! - Clear ownership (entity in exactly one table)
//! - Efficient queries (know which tables to scan)
//!
//! **Trade-off:**
//! - Adding/removing components moves entity to different table
//!
//! ## Type Erasure
//!
//! Component types are erased at runtime, allowing:
//! - Dynamic component registration
//! - Uniform storage for heterogeneous types
//! - Runtime-defined component combinations
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Column<Position>                         │
//! │  - Knows: Layout, drop function          │
//! │  - Stores: Raw bytes (*mut u8)           │
//! │  - Type checked in debug mode            │
//! └────────────┬─────────────────────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────────────────────┐
//! │ IndexedMemory                            │
//! │  - Just bytes: [u8; N * sizeof(T)]       │
//! │  - No type info at this level            │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! ## Public Types
//!
//! - [`Table`] - Multi-column storage for entities with the same component set
//! - [`Tables`] - Collection of tables (archetype manager)
//!
//! ## Internal Types
//!
//! - `Column` - Single-type columnar storage (type-erased)
//! - `IndexedMemory` - Low-level memory allocation (unsafe)
//! - `Cell` / `CellMut` - Type-safe component access
//! - `Row` - Type-safe row index
//! - `Index` - Entity → Row mapping trait
//! - `DynamicIndex` - Block-based entity index (default)
//! - `HashIndex` - HashMap-based entity index (fallback)
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use rusty_engine::ecs::storage::{Table, Tables};
//! use rusty_engine::ecs::{component, entity};
//! use rusty_macros::Component;
//!
//! // Define components
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! // Setup
//! let registry = component::Registry::new();
//! let spec = registry.spec::<(Position, Velocity)>();
//!
//! // Create (or reuse) the table for the [Position, Velocity] archetype
//! let mut storage = Storage::new();
//! let table = storage.get_or_create_table(spec, &registry);
//!
//! // Add entity with both components atomically
//! let mut allocator = entity::Allocator::new();
//! let entity = allocator.alloc();
//!
//! table.add_entity(
//!     entity,
//!     (Position { x: 1.0, y: 2.0 }, Velocity { dx: 0.5, dy: 0.3 }),
//! );
//!
//! // Access components via column iteration (cache-friendly!)
//! let pos_column = table.get_column::<Position>().unwrap();
//! unsafe {
//!     for pos in pos_column.iter::<Position>() {
//!         println!("Entity at ({}, {})", pos.x, pos.y);
//!     }
//! }
//! ```
//!
//! # Safety Guarantees
//!
//! The storage layer maintains several critical invariants:
//!
//! ## Table Invariants
//! - **Synchronization**: `entities.len() == columns[i].len()` for all columns
//! - **Index consistency**: Entity → Row mapping always correct
//! - **Type safety**: Components match their registered types
//! - **Atomicity**: All components added/removed together
//!
//! ## Column Invariants
//! - **Initialization**: Elements [0..len) always initialized
//! - **Capacity**: `len <= capacity` at all times
//! - **Drop safety**: Removed components properly dropped
//! - **Type consistency**: All elements are the same type
//!
//! ## Memory Invariants
//! - **Valid pointers**: Non-null when capacity > 0
//! - **No double-free**: Each allocation freed exactly once
//! - **No leaks**: All elements dropped before deallocation
//! - **Layout consistency**: Matches component type layout
//!
//! # Performance Characteristics
//!
//! | Operation | Time | Notes |
//! |-----------|------|-------|
//! | Column iteration | O(n) | Cache-friendly, ~3-10ns per element |
//! | Entity lookup | O(1) | Via index, ~25-50µs typical |
//! | Add entity | O(c) | c = number of components |
//! | Remove entity | O(c) | Swap-remove, c = number of components |
//! | Get component | O(1) | Direct index, bounds-checked in debug |
//!
//! # Design Decisions
//!
//! ## Why Type Erasure?
//!
//! - **Runtime flexibility**: Components registered at runtime
//! - **Dynamic archetypes**: Unknown component combinations
//! - **Uniform storage**: Single implementation for all types
//!
//! ## Why Columnar Storage?
//!
//! - **Cache efficiency**: 80-90% of systems iterate single component types
//! - **SIMD opportunities**: Contiguous data enables vectorization
//! - **Query performance**: Common case (single-component iteration) is fastest
//!
//! ## Why Archetype Pattern?
//!
//! - **No sparse storage**: Every entity has all components in its table
//! - **Fast iteration**: No branch prediction failures from Option checks
//! - **Clear semantics**: Entity existence tied to archetype membership
//!
//! ## Trade-offs
//!
//! **Pros:**
//! - Extremely fast iteration (main ECS operation)
//! - Memory efficient (no Option overhead)
//! - Good cache locality
//!
//! **Cons:**
//! - Adding/removing components requires table migration
//! - Entity lookup is O(1) but not free (~25-50µs)
//! - More tables for diverse entity types
//!
//! # Thread Safety
//!
//! The storage types are **not** thread-safe by default:
//! - No internal synchronization
//! - Designed for single-threaded access per table
//! - Use external synchronization (e.g., RwLock) for parallel access
//!
//! # Future Work
//! - may add parallel iteration support
//! - Consider the approach used by Legion ECS to keep all component data in a single allocation and index from archetype into it.
//!
//! # Related Documentation
//!
//! For implementation details, see the source code of internal modules:
//! - `mem` - Low-level memory allocation details
//! - `column` - Type-erased column implementation  
//! - `index` - Entity-to-row index implementations
//! - `table` - Multi-column table implementation
//!

use std::collections::HashMap;

pub use location::Location;
pub use row::Row;
pub use table::Table;
pub use table::Id as TableId;
pub use value::Values;

use crate::ecs::{component, entity, event, storage::table::Id, world};

pub mod archetype;
pub(crate) mod cell;
pub mod change;
pub(crate) mod column;
pub(crate) mod index;
pub(crate) mod location;
pub(crate) mod mem;
pub(crate) mod row;
pub(crate) mod table;
pub mod unique;
pub(crate) mod value;
pub mod view;

use change::{Change, ChangeResult};

/// Tracks which entities are currently spawned and where their component data lives.
///
/// Keyed by the entity's raw [`entity::Id`] with the generation stored alongside the
/// location so stale entity handles (from a despawned, then-recycled slot) are rejected.
#[derive(Default)]
pub struct Entities {
    locations: HashMap<entity::Id, (entity::Generation, Location)>,
}

impl Entities {
    #[inline]
    fn new() -> Self {
        Self {
            locations: HashMap::new(),
        }
    }

    fn insert(&mut self, entity: entity::Entity, location: Location) {
        self.locations
            .insert(entity.id(), (entity.generation(), location));
    }

    fn remove(&mut self, entity: entity::Entity) -> Option<Location> {
        if self.is_spawned(entity) {
            self.locations.remove(&entity.id()).map(|(_, loc)| loc)
        } else {
            None
        }
    }

    /// Determine whether the given entity handle refers to a currently spawned entity.
    #[inline]
    pub fn is_spawned(&self, entity: entity::Entity) -> bool {
        self.locations
            .get(&entity.id())
            .is_some_and(|(gen, _)| *gen == entity.generation())
    }

    /// Get the storage location for the given entity, if it is currently spawned.
    #[inline]
    pub fn location(&self, entity: entity::Entity) -> Option<Location> {
        self.locations.get(&entity.id()).and_then(|(gen, loc)| {
            if *gen == entity.generation() {
                Some(*loc)
            } else {
                None
            }
        })
    }
}

/// A collection of tables, each storing entities with a specific component layout.
#[derive(Default)]
pub struct Storage {
    /// The vec of know tables.
    tables: Vec<Table>,

    /// A map from archetype to table.
    table_map: HashMap<component::Spec, table::Id>,

    /// The registry of archetypes known to this storage.
    archetypes: archetype::Archetypes,

    /// The entity -> location index.
    entities: Entities,

    /// Uniques (singleton resources) stored alongside component data.
    uniques: unique::Uniques,

    /// Gameplay event streams, keyed by event type.
    events: event::Broker,
}

impl Storage {
    /// Create a new empty Tables collection.
    #[inline]
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            table_map: HashMap::new(),
            archetypes: archetype::Archetypes::new(),
            entities: Entities::new(),
            uniques: unique::Uniques::new(),
            events: event::Broker::new(),
        }
    }

    pub fn create(
        &mut self,
        components: component::Spec,
        registry: &component::Registry,
    ) -> &mut Table {
        // Grab the index the table will be stored at.
        let id = table::Id::new(self.tables.len() as u32);
        // Resolve each component ID in the spec to its registered info.
        let infos: Vec<component::Info> = components
            .ids()
            .iter()
            .map(|id| {
                registry
                    .get_info(*id)
                    .expect("component in spec is not registered")
            })
            .collect();
        // Add the table to the map.
        self.table_map.insert(components, id);
        // Create a new table from the resolved component info.
        self.tables.push(Table::new(id, &infos));
        // Return a mutable reference
        self.get_mut(id)
    }

    /// Get an existing table for the given component spec, or create a new one if it doesn't
    /// exist.
    ///
    /// # Panics
    ///  - if any component in the spec is not registered in the provided registry.
    pub fn get_or_create_table(
        &mut self,
        components: component::Spec,
        registry: &component::Registry,
    ) -> &mut Table {
        if let Some(id) = self.table_map.get(&components) {
            return self.get_mut(*id);
        }
        self.create(components, registry)
    }

    /// Get an existing table by id, if it exists, otherwise panic.
    ///     
    /// # Panics
    /// - if the id is out of bounds
    pub fn get(&self, table_id: Id) -> &Table {
        assert!(
            table_id.index() < self.tables.len(),
            "table id out of bounds"
        );
        &self.tables[table_id.index()]
    }

    /// Get an existing mutable table, if it exists, otherwise panic.
    ///
    /// # Panics
    /// - if the id is out of bounds
    pub fn get_mut(&mut self, table_id: Id) -> &mut Table {
        assert!(
            table_id.index() < self.tables.len(),
            "table id out of bounds"
        );
        &mut self.tables[table_id.index()]
    }

    /// Returns a list of table IDs that support all the provided components.
    pub fn supporting(&self, components: &component::Spec) -> Vec<table::Id> {
        self.tables
            .iter()
            .filter_map(|table| {
                if table.components().contains_all(components) {
                    Some(table.id())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Get an existing table by id. Alias of [`Storage::get`] used by `World`.
    #[inline]
    pub fn get_table(&self, table_id: Id) -> &Table {
        self.get(table_id)
    }

    /// Get an existing mutable table by id. Alias of [`Storage::get_mut`] used by `World`.
    #[inline]
    pub fn get_table_mut(&mut self, table_id: Id) -> &mut Table {
        self.get_mut(table_id)
    }

    /// Get the archetype registry for this storage.
    #[inline]
    pub fn archetypes(&self) -> &archetype::Archetypes {
        &self.archetypes
    }

    /// Get the entity -> location index for this storage.
    #[inline]
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// Get the storage location for the given entity, if it is currently spawned.
    #[inline]
    pub fn location_for(&self, entity: entity::Entity) -> Option<Location> {
        self.entities.location(entity)
    }

    /// Get the uniques (singleton resources) stored in this storage.
    #[inline]
    pub fn uniques(&self) -> &unique::Uniques {
        &self.uniques
    }

    /// Get mutable access to the uniques stored in this storage.
    #[inline]
    pub fn uniques_mut(&mut self) -> &mut unique::Uniques {
        &mut self.uniques
    }

    /// Get the event broker stored in this storage.
    #[inline]
    pub fn events(&self) -> &event::Broker {
        &self.events
    }

    /// Get mutable access to the event broker stored in this storage.
    #[inline]
    pub fn events_mut(&mut self) -> &mut event::Broker {
        &mut self.events
    }

    /// Get the existing archetype for the given component spec, creating its table and
    /// archetype entry if this is the first time the combination has been seen.
    ///
    /// # Panics
    /// - if any component in the spec is not registered in the provided registry.
    fn get_or_create_archetype(
        &mut self,
        spec: component::Spec,
        registry: &component::Registry,
    ) -> (archetype::Id, table::Id) {
        if let Some(existing) = self.archetypes.get_by_spec(&spec) {
            return (existing.id(), existing.table_id());
        }
        let table_id = self.get_or_create_table(spec.clone(), registry).id();
        let archetype_id = self.archetypes.create(spec, table_id);
        (archetype_id, table_id)
    }

    /// Spawn an entity with the given component values into storage.
    ///
    /// # Panics
    /// - if any component type in `values` is not registered in the provided registry.
    pub fn spawn_entity<V: Values>(
        &mut self,
        entity: entity::Entity,
        values: V,
        registry: &component::Registry,
    ) -> Location {
        let spec = registry.spec::<V>();
        let (archetype_id, table_id) = self.get_or_create_archetype(spec, registry);
        let row = self.get_mut(table_id).add_entity(entity, values);
        let location = Location::new(archetype_id, table_id, row);
        self.entities.insert(entity, location);
        location
    }

    /// Spawn a batch of entities sharing the same component set into storage.
    ///
    /// # Panics
    /// - if any component type in `V` is not registered in the provided registry.
    pub fn spawn_entities<V: Values>(
        &mut self,
        entities: impl IntoIterator<Item = (entity::Entity, V)>,
        registry: &component::Registry,
    ) {
        let spec = registry.spec::<V>();
        let (archetype_id, table_id) = self.get_or_create_archetype(spec, registry);
        let results = self.get_mut(table_id).add_entities(entities);
        for (row, entity) in results {
            self.entities
                .insert(entity, Location::new(archetype_id, table_id, row));
        }
    }

    /// Despawn the given entity, removing it and its components from storage.
    ///
    /// Returns `false` (and does nothing) if the entity is not currently spawned.
    pub fn despawn_entity(&mut self, entity: entity::Entity) -> bool {
        let Some(location) = self.entities.remove(entity) else {
            return false;
        };
        let moved_entity = self.get_mut(location.table_id()).swap_remove_row(location.row());
        if let Some(moved) = moved_entity {
            self.entities.insert(moved, location);
        }
        true
    }

    /// Add a set of components to an existing entity, migrating it to a new archetype.
    ///
    /// Returns `false` if the entity is not spawned, or already has any of the given
    /// component types.
    ///
    /// # Panics
    /// - if any component type in `V` is not registered in the provided registry.
    pub fn add_components<V: Values>(
        &mut self,
        entity: entity::Entity,
        components: V,
        registry: &component::Registry,
    ) -> bool {
        let Some(source_location) = self.entities.location(entity) else {
            return false;
        };

        let addition_spec = registry.spec::<V>();
        let source_table_id = source_location.table_id();
        let source_spec = self.get(source_table_id).components();

        if source_spec.contains_all(&addition_spec) {
            return false;
        }

        let target_spec = source_spec.merge(&addition_spec);
        let (target_archetype_id, target_table_id) =
            self.get_or_create_archetype(target_spec, registry);

        let (extracted, moved_entity) = self
            .get_mut(source_table_id)
            .extract_and_swap_row(source_location.row(), &source_spec);

        if let Some(moved) = moved_entity {
            self.entities.insert(moved, source_location);
        }

        let new_row = self
            .get_mut(target_table_id)
            .add_entity_from_extract(entity, extracted, components);

        self.entities.insert(
            entity,
            Location::new(target_archetype_id, target_table_id, new_row),
        );

        true
    }

    /// Remove a set of components from an existing entity, migrating it to a new archetype.
    ///
    /// Returns `false` if the entity is not spawned, or doesn't have all the given component
    /// types.
    pub fn remove_components<S: component::IntoSpec>(
        &mut self,
        entity: entity::Entity,
        registry: &component::Registry,
    ) -> bool {
        let Some(source_location) = self.entities.location(entity) else {
            return false;
        };

        let removal_spec = registry.spec::<S>();
        let source_table_id = source_location.table_id();
        let source_spec = self.get(source_table_id).components();

        if !source_spec.contains_all(&removal_spec) {
            return false;
        }

        let target_spec = source_spec.difference(&removal_spec);
        let (target_archetype_id, target_table_id) =
            self.get_or_create_archetype(target_spec.clone(), registry);

        let (extracted, moved_entity) = self
            .get_mut(source_table_id)
            .extract_and_swap_row(source_location.row(), &target_spec);

        if let Some(moved) = moved_entity {
            self.entities.insert(moved, source_location);
        }

        let new_row = self
            .get_mut(target_table_id)
            .add_entity_from_extract(entity, extracted, ());

        self.entities.insert(
            entity,
            Location::new(target_archetype_id, target_table_id, new_row),
        );

        true
    }

    /// Spawn an entity from a type-erased list of `(id, bytes)` component values,
    /// as produced by [`component::BoxedSet`]. Mirrors [`Storage::spawn_entity`] but
    /// without requiring the component types statically, for use by the deferred
    /// command buffer.
    ///
    /// # Panics
    /// - if any component id in `items` is not registered in the provided registry.
    pub fn spawn_entity_dynamic(
        &mut self,
        entity: entity::Entity,
        items: Vec<(world::TypeId, Vec<u8>)>,
        registry: &component::Registry,
    ) -> Location {
        let spec = component::Spec::new(items.iter().map(|(id, _)| *id).collect::<Vec<_>>());
        let (archetype_id, table_id) = self.get_or_create_archetype(spec, registry);
        let row = self
            .get_mut(table_id)
            .add_entity_from_extract(entity, items, ());
        let location = Location::new(archetype_id, table_id, row);
        self.entities.insert(entity, location);
        location
    }

    /// Add a type-erased list of `(id, bytes)` component values to an existing entity,
    /// migrating it to a new archetype. Mirrors [`Storage::add_components`] for the
    /// deferred command buffer's flush path.
    ///
    /// Returns `false` if the entity is not spawned, or already has any of the given
    /// component types.
    pub fn add_components_dynamic(
        &mut self,
        entity: entity::Entity,
        items: Vec<(world::TypeId, Vec<u8>)>,
        registry: &component::Registry,
    ) -> bool {
        let Some(source_location) = self.entities.location(entity) else {
            return false;
        };

        let addition_spec =
            component::Spec::new(items.iter().map(|(id, _)| *id).collect::<Vec<_>>());
        let source_table_id = source_location.table_id();
        let source_spec = self.get(source_table_id).components();

        if source_spec.contains_all(&addition_spec) {
            return false;
        }

        let target_spec = source_spec.merge(&addition_spec);
        let (target_archetype_id, target_table_id) =
            self.get_or_create_archetype(target_spec, registry);

        let (mut extracted, moved_entity) = self
            .get_mut(source_table_id)
            .extract_and_swap_row(source_location.row(), &source_spec);

        if let Some(moved) = moved_entity {
            self.entities.insert(moved, source_location);
        }

        extracted.extend(items);

        let new_row = self
            .get_mut(target_table_id)
            .add_entity_from_extract(entity, extracted, ());

        self.entities.insert(
            entity,
            Location::new(target_archetype_id, target_table_id, new_row),
        );

        true
    }

    /// Remove the components named by `removal_spec` from an existing entity, migrating
    /// it to a new archetype. Mirrors [`Storage::remove_components`] but takes the
    /// removal set as a runtime [`component::Spec`] rather than a static `S: IntoSpec`,
    /// for the deferred command buffer's flush path.
    ///
    /// Returns `false` if the entity is not spawned, or doesn't have all the given
    /// component types.
    pub fn remove_components_spec(
        &mut self,
        entity: entity::Entity,
        removal_spec: &component::Spec,
        registry: &component::Registry,
    ) -> bool {
        let Some(source_location) = self.entities.location(entity) else {
            return false;
        };

        let source_table_id = source_location.table_id();
        let source_spec = self.get(source_table_id).components();

        if !source_spec.contains_all(removal_spec) {
            return false;
        }

        let target_spec = source_spec.difference(removal_spec);
        let (target_archetype_id, target_table_id) =
            self.get_or_create_archetype(target_spec.clone(), registry);

        let (extracted, moved_entity) = self
            .get_mut(source_table_id)
            .extract_and_swap_row(source_location.row(), &target_spec);

        if let Some(moved) = moved_entity {
            self.entities.insert(moved, source_location);
        }

        let new_row = self
            .get_mut(target_table_id)
            .add_entity_from_extract(entity, extracted, ());

        self.entities.insert(
            entity,
            Location::new(target_archetype_id, target_table_id, new_row),
        );

        true
    }
}
