//! The World is the central container for all entities, components, and systems in the ECS.
//!
//! A `World` manages the lifecycle of entities and their associated component data. It provides
//! the primary API for spawning and despawning entities, as well as accessing and modifying
//! their components.
//!
//! # Architecture
//!
//! The World coordinates several subsystems:
//! - **Entity Allocator**: Manages entity ID allocation and reuse
//! - **Entity Registry**: Tracks which entities are spawned and their storage locations
//! - **Component Registry**: Maintains metadata about registered component types
//! - **Storage**: Manages the actual component data organized by archetype
//! - **Archetype Registry**: Tracks unique combinations of component types
//!
//! # Example
//!
//! ```ignore
//! use rusty_engine::ecs::world::World;
//!
//! let mut world = World::new(Id(1));
//!
//! // Spawn an entity with components
//! let entity = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
//!
//! // Access the entity
//! if let Some(entity_ref) = world.entity(entity) {
//!     let pos = entity_ref.get::<Position>().unwrap();
//! }
//!
//! // Despawn the entity
//! world.despawn(entity);
//! ```
mod access;
mod error;
mod shard;
mod type_registry;

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::ecs::{
    component::{self},
    entity,
    event::{self},
    observer,
    query::{self},
    relationship::{self, Relationship},
    storage::{self},
    unique,
    world::access::{ConflictError, GrantTracker},
};

/// Exported types for world access control.
pub use access::{AccessGrant, AccessRequest};
pub use error::WorldError;
pub use type_registry::{TypeId, TypeInfo, TypeRegistry};
pub use shard::Shard;

/// A world identifier. This is a unique identifier for a world in the ECS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new world identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the raw identifier value.
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// The World is the central container for all entities, components, and their relationships.
///
/// A World manages entity lifecycles, component storage, and provides the primary API for
/// interacting with the ECS. Each world is isolated from other worlds and maintains its own
/// set of entities and components.
pub struct World {
    /// The world's unique identifier.
    id: Id,

    /// The world's entity allocator.
    entity_allocator: entity::Allocator,

    /// The registry of all know resource types in the world.
    resources: TypeRegistry,

    /// The storage for components in the world.
    storage: storage::Storage,

    /// The current access grants for the world.
    active_grants: RefCell<GrantTracker>,

    /// Monotonically increasing counter bumped on every logical world mutation.
    ///
    /// Drives change detection: see [`last_write`](World::last_write) and
    /// [`query::Cache`].
    tick: std::cell::Cell<u64>,

    /// The tick at which each component type was last written, keyed by `TypeId`.
    last_write: RefCell<HashMap<TypeId, u64>>,

    /// Cache of `(components, with, without)` -> matching table ids, invalidated by
    /// `last_write`.
    query_cache: query::Cache,

    /// Registered relationship kinds (source/inbound component pairs, `linked_spawn`
    /// flags). See [`relationship::Relationship`].
    relationships: relationship::Relationships,

    /// Synchronous observer subscriptions for `component_added`/`component_removed`/
    /// `entity_parent_set`. See [`World::subscribe`].
    observers: observer::Observers,

    /// Marker to make World !Send. World must stay on the main thread.
    _not_send: PhantomData<*mut ()>,
}

impl World {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            entity_allocator: entity::Allocator::default(),
            resources: TypeRegistry::default(),
            storage: storage::Storage::default(),
            active_grants: RefCell::new(GrantTracker::default()),
            tick: std::cell::Cell::new(0),
            last_write: RefCell::new(HashMap::new()),
            query_cache: query::Cache::default(),
            relationships: relationship::Relationships::default(),
            observers: observer::Observers::default(),
            _not_send: PhantomData,
        }
    }

    /// Subscribe `handler` to `event_name`, one of `"component_added"`,
    /// `"component_removed"`, or `"entity_parent_set"`. Handlers run synchronously,
    /// inline with the mutation that triggers them - there is no event queue to drain.
    ///
    /// An unrecognized `event_name` is logged and ignored.
    pub fn subscribe(&mut self, event_name: &str, handler: impl FnMut(&observer::Notification) + 'static) {
        self.observers.subscribe(event_name, Box::new(handler));
    }

    /// Get the component/unique type registry. Alias of [`World::resources`]; components
    /// and uniques share one registry (see [`TypeRegistry`]).
    #[inline]
    pub fn components(&self) -> &TypeRegistry {
        &self.resources
    }

    /// Get the current world tick.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick.get()
    }

    /// Advance and return the world tick. Called on every mutation that should
    /// invalidate query-cache entries touching the written component types.
    #[inline]
    pub fn advance_tick(&self) -> u64 {
        let next = self.tick.get() + 1;
        self.tick.set(next);
        next
    }

    /// Get the tick at which the given component type was last written, or `0` if it
    /// has never been written.
    #[inline]
    pub fn last_write_tick(&self, id: TypeId) -> u64 {
        self.last_write.borrow().get(&id).copied().unwrap_or(0)
    }

    /// Stamp the given component type ids as written at `tick`.
    fn mark_written(&self, ids: &[TypeId], tick: u64) {
        let mut last_write = self.last_write.borrow_mut();
        for id in ids {
            last_write.insert(*id, tick);
        }
    }

    /// Fire a `component_added` notification for every id in `ids`, to any handler
    /// subscribed via [`World::subscribe`].
    fn notify_added(&mut self, entity: entity::Entity, ids: &[TypeId]) {
        for id in ids {
            self.observers.component_added(entity, *id);
        }
    }

    /// Fire a `component_removed` notification for every id in `ids`, to any handler
    /// subscribed via [`World::subscribe`].
    fn notify_removed(&mut self, entity: entity::Entity, ids: &[TypeId]) {
        for id in ids {
            self.observers.component_removed(entity, *id);
        }
    }

    /// Get the query cache used to avoid rescanning archetypes for unchanged queries.
    #[inline]
    pub fn query_cache(&self) -> &query::Cache {
        &self.query_cache
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn resources(&self) -> &TypeRegistry {
        &self.resources
    }

    #[inline]
    pub fn archetypes(&self) -> &storage::archetype::Archetypes {
        self.storage.archetypes()
    }

    #[inline]
    pub fn storage(&self) -> &storage::Storage {
        &self.storage
    }

    #[inline]
    pub fn storage_mut(&mut self) -> &mut storage::Storage {
        &mut self.storage
    }

    /// Spawn a new entity with the given set of components in the world.
    /// This will establish the entity in the appropriate archetype and storage table.
    pub fn spawn<V: storage::Values>(&mut self, set: V) -> entity::Entity {
        // Allocate a new entity.
        let entity = self.entity_allocator.alloc();

        // Spawn the entity in storage.
        let spec = self.resources.spec::<V>();
        self.storage.spawn_entity(entity, set, &self.resources);

        let tick = self.advance_tick();
        self.mark_written(spec.ids(), tick);
        self.notify_added(entity, spec.ids());

        entity
    }

    /// Spawn a new entity with the given set of components in the world.
    /// This will establish the entity in the appropriate archetype and storage table.
    pub fn spawn_many<V: storage::Values>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Vec<entity::Entity> {
        // Get the component sets as a vec.
        let sets = values.into_iter();

        // Allocate a new entities based on the number of values.
        let entities = self.entity_allocator.alloc_many(sets.size_hint().0);

        // Spawn the entities in storage with the component sets.
        let spec = self.resources.spec::<V>();
        self.storage
            .spawn_entities(entities.iter().copied().zip(sets), &self.resources);

        let tick = self.advance_tick();
        self.mark_written(spec.ids(), tick);
        for &entity in &entities {
            self.notify_added(entity, spec.ids());
        }

        entities
    }

    /// Despawn the given entity from the world. This will remove the entity and all its
    /// components from storage, and detach it from every registered relationship it
    /// participates in (see [`relationship::Relationship`]): any source still pointing
    /// at it is unlinked, and despawned in turn for relationship kinds registered
    /// `linked_spawn`.
    ///
    /// If the entity is not currently spawned, this method does nothing.
    pub fn despawn(&mut self, entity: entity::Entity) {
        let mut visited = std::collections::HashSet::new();
        self.despawn_cascading_all(entity, &mut visited);
    }

    /// Despawn `entity` and recursively cascade through every registered relationship
    /// kind, guarding against relationship cycles with `visited`.
    pub(crate) fn despawn_cascading_all(
        &mut self,
        entity: entity::Entity,
        visited: &mut std::collections::HashSet<entity::Entity>,
    ) {
        if !visited.insert(entity) {
            return;
        }

        // Relationships need `&mut World` to walk inbound sets and despawn sources,
        // which would alias `self.relationships` - swap it out for the duration.
        let relationships = std::mem::take(&mut self.relationships);
        relationships.cascade_all(self, entity, visited);
        self.relationships = relationships;

        self.despawn_entity_only(entity);
    }

    /// Remove `entity` and all its components from storage, without touching any
    /// relationship it participates in. Used by [`World::despawn`] (after it has
    /// already run the relationship cascade) and by [`World::despawn_cascading`]'s
    /// inner recursion (which walks a single relationship kind itself).
    pub(crate) fn despawn_entity_only(&mut self, entity: entity::Entity) {
        // Capture the entity's components before removal so their write tick can be
        // bumped; a despawn changes which tables `supporting()` would return them in.
        let ids: Vec<TypeId> = self
            .storage
            .location_for(entity)
            .map(|loc| self.storage.get_table(loc.table_id()).components().ids().to_vec())
            .unwrap_or_default();

        // Delegate to storage to despawn the entity.
        self.storage.despawn_entity(entity);

        if !ids.is_empty() {
            let tick = self.advance_tick();
            self.mark_written(&ids, tick);
        }
    }

    /// Add a component to an existing entity.
    ///
    /// This migrates the entity to a new archetype that includes the new component.
    /// If the entity already has this component type, this method does nothing.
    ///
    /// If the entity is not currently spawned, this logs a warning and returns `Ok(false)`
    /// rather than treating it as an error; the caller asked for a component to be added to
    /// an entity that no longer exists, which is absorbed silently per the propagation
    /// policy.
    ///
    /// # Errors
    /// Returns [`WorldError::DependencyUnmet`] if one of the added components declares a
    /// dependency on another component type that is not present on the entity's resulting
    /// component set.
    pub fn add_components<V: storage::Values>(
        &mut self,
        entity: entity::Entity,
        components: V,
    ) -> Result<bool, WorldError> {
        let Some(location) = self.storage.location_for(entity) else {
            log::warn!("add_components: entity {entity:?} is not alive, ignoring");
            return Ok(false);
        };

        let addition_spec = self.resources.spec::<V>();
        let source_spec = self.storage.get_table(location.table_id()).components();
        let resulting_spec = source_spec.merge(&addition_spec);

        let resulting_names: Vec<String> = resulting_spec
            .ids()
            .iter()
            .filter_map(|id| self.resources.get_info(*id))
            .map(|info| info.name().to_string())
            .collect();

        if let Some(missing) = self
            .resources
            .check_dependencies(addition_spec.ids(), &resulting_names)
        {
            let adder = addition_spec
                .ids()
                .iter()
                .filter_map(|id| self.resources.get_info(*id))
                .map(|info| info.name().to_string())
                .next()
                .unwrap_or_default();
            log::error!("add_components: dependency '{missing}' unmet for '{adder}'");
            return Err(WorldError::DependencyUnmet {
                adder,
                dependency: missing,
            });
        }

        let added = self
            .storage
            .add_components(entity, components, &self.resources);
        if added {
            let tick = self.advance_tick();
            self.mark_written(addition_spec.ids(), tick);
            self.notify_added(entity, addition_spec.ids());
        }
        Ok(added)
    }

    /// Remove a component from an existing entity.
    ///
    /// This migrates the entity to a new archetype that excludes the component.
    /// If the entity doesn't have this component type, this method does nothing.
    ///
    /// If the entity is not currently spawned, this logs a warning and returns `false`
    /// rather than treating it as an error.
    ///
    /// # Returns
    /// - `true` if the component was removed
    /// - `false` if the entity doesn't exist or doesn't have this component
    pub fn remove_components<S: component::IntoSpec>(&mut self, entity: entity::Entity) -> bool {
        if self.storage.location_for(entity).is_none() {
            log::warn!("remove_components: entity {entity:?} is not alive, ignoring");
            return false;
        }

        let removal_spec = self.resources.spec::<S>();
        let removed = self
            .storage
            .remove_components::<S>(entity, &self.resources);
        if removed {
            let tick = self.advance_tick();
            self.mark_written(removal_spec.ids(), tick);
            self.notify_removed(entity, removal_spec.ids());
        }
        removed
    }

    /// Spawn an entity with a type-erased set of components, as produced by
    /// [`component::BoxedSet`]. Used by [`crate::ecs::system::command::CommandBuffer`] to
    /// apply a deferred spawn whose concrete component types are no longer known at
    /// flush time.
    pub fn spawn_dynamic(&mut self, entity: entity::Entity, components: component::BoxedSet) {
        let items = components.into_items();
        let ids: Vec<TypeId> = items.iter().map(|(id, _)| *id).collect();
        self.storage.spawn_entity_dynamic(entity, items, &self.resources);

        let tick = self.advance_tick();
        self.mark_written(&ids, tick);
        self.notify_added(entity, &ids);
    }

    /// Add a type-erased set of components to an existing entity, as produced by
    /// [`component::BoxedSet`].
    ///
    /// Mirrors [`World::add_components`]: a dead entity is a logged no-op, and a
    /// dependency unmet by the resulting component set is a fatal `WorldError`.
    pub fn add_components_dynamic(
        &mut self,
        entity: entity::Entity,
        components: component::BoxedSet,
    ) -> Result<bool, WorldError> {
        let Some(location) = self.storage.location_for(entity) else {
            log::warn!("add_components_dynamic: entity {entity:?} is not alive, ignoring");
            return Ok(false);
        };

        let ids = components.ids();
        let addition_spec = component::Spec::new(ids.clone());
        let source_spec = self.storage.get_table(location.table_id()).components();
        let resulting_spec = source_spec.merge(&addition_spec);

        let resulting_names: Vec<String> = resulting_spec
            .ids()
            .iter()
            .filter_map(|id| self.resources.get_info(*id))
            .map(|info| info.name().to_string())
            .collect();

        if let Some(missing) = self.resources.check_dependencies(&ids, &resulting_names) {
            let adder = ids
                .iter()
                .filter_map(|id| self.resources.get_info(*id))
                .map(|info| info.name().to_string())
                .next()
                .unwrap_or_default();
            log::error!("add_components_dynamic: dependency '{missing}' unmet for '{adder}'");
            return Err(WorldError::DependencyUnmet {
                adder,
                dependency: missing,
            });
        }

        let added = self
            .storage
            .add_components_dynamic(entity, components.into_items(), &self.resources);
        if added {
            let tick = self.advance_tick();
            self.mark_written(&ids, tick);
            self.notify_added(entity, &ids);
        }
        Ok(added)
    }

    /// Remove the components named by `spec` from an existing entity.
    ///
    /// Unlike [`World::remove_components`], the set of types to remove is given as a
    /// runtime [`component::Spec`] rather than a static `S: IntoSpec`, since a deferred
    /// [`crate::ecs::system::command::Command::RemoveComponents`] no longer carries its
    /// original type parameter by the time it's flushed.
    pub fn remove_components_dynamic(
        &mut self,
        entity: entity::Entity,
        spec: &component::Spec,
    ) -> bool {
        if self.storage.location_for(entity).is_none() {
            log::warn!("remove_components_dynamic: entity {entity:?} is not alive, ignoring");
            return false;
        }

        let removed = self.storage.remove_components_spec(entity, spec, &self.resources);
        if removed {
            let tick = self.advance_tick();
            self.mark_written(spec.ids(), tick);
            self.notify_removed(entity, spec.ids());
        }
        removed
    }

    /// Get a reference to the entity allocator, for deferred id reservation (see
    /// [`entity::Allocator::reserve`]).
    #[inline]
    pub fn entity_allocator(&self) -> &entity::Allocator {
        &self.entity_allocator
    }

    /// Fold any entity ids reserved via [`entity::Allocator::reserve`] into the
    /// allocator's own counter. Called once per command-buffer flush, before any
    /// reserved entity is spawned, so later `spawn`/`spawn_many` calls don't hand out
    /// an id already claimed by a pending command.
    pub fn flush_reserved_entities(&mut self) {
        self.entity_allocator.flush_reserved();
    }

    /// Get a reference to the given entity, if it's spawned.
    ///
    /// Returns `None` if the entity is not currently spawned in the world.
    pub fn entity(&self, entity: entity::Entity) -> Option<entity::Ref<'_>> {
        self.storage_for(entity)
            .map(|(table, row)| entity::Ref::new(entity, table, row))
    }

    /// Get a mutable reference to the given entity, if it's spawned.
    ///
    /// Returns `None` if the entity is not currently spawned in the world.
    ///
    /// # Note
    /// This method holds a mutable reference to the entire world's storage, preventing
    /// any other access while the `RefMut` is held. For performance-critical code,
    /// consider using queries/systems that can access multiple entities efficiently.
    pub fn entity_mut(&mut self, entity: entity::Entity) -> Option<entity::RefMut<'_>> {
        let loc = self.storage.location_for(entity)?;
        let table = self.storage.get_table_mut(loc.table_id());
        let tick = self.advance_tick();
        let tracker = entity::ChangeTracker::new(&self.last_write, tick);
        Some(entity::RefMut::new_tracked(entity, table, loc.row(), tracker))
    }

    /// Get the storage table and row for a reference to the given entity, if the entity is spawned.
    pub fn storage_for(&self, entity: entity::Entity) -> Option<(&storage::Table, storage::Row)> {
        let loc = self.storage.location_for(entity)?;
        Some((self.storage.get_table(loc.table_id()), loc.row()))
    }

    /// Get the storage table and row for a mutable reference to the given entity, if the entity is
    /// spawned.
    pub fn storage_for_mut(
        &mut self,
        entity: entity::Entity,
    ) -> Option<(&mut storage::Table, storage::Row)> {
        let loc = self.storage.location_for(entity)?;
        Some((self.storage.get_table_mut(loc.table_id()), loc.row()))
    }

    /// Register a new component type in the world.
    pub fn register_component<C: component::Component>(&mut self) -> TypeId {
        self.resources.register_component::<C>()
    }

    /// Register a new component type with an explicit name and declared dependency
    /// names. See [`TypeRegistry::register_component_named`].
    pub fn register_component_named<C: component::Component>(
        &mut self,
        name: &str,
        dependencies: &[&str],
    ) -> TypeId {
        self.resources.register_component_named::<C>(name, dependencies)
    }

    /// Register a gameplay event type, wiring up both its marker ids (for access
    /// control) and its double-buffered stream (for storage). Idempotent.
    pub fn register_event<E: event::Event>(&mut self) {
        self.resources.register_event::<E>();
        if !self.storage.events().is_registered::<E>() {
            self.storage.events_mut().register::<E>();
        }
    }

    /// Get immutable access to the gameplay event broker.
    #[inline]
    pub fn events(&self) -> &event::Broker {
        self.storage.events()
    }

    /// Get mutable access to the gameplay event broker.
    #[inline]
    pub fn events_mut(&mut self) -> &mut event::Broker {
        self.storage.events_mut()
    }

    /// Swap all event stream buffers. Call once per frame, before running systems,
    /// so that events sent last frame become readable by `Consumer<E>` parameters.
    pub fn swap_event_buffers(&mut self) {
        self.storage.events_mut().swap_all();
    }

    /// Register a relationship component type `R`, along with its paired inbound
    /// component `R::Inbound`.
    ///
    /// A `linked_spawn` relationship cascades deletion: despawning a target through
    /// [`World::despawn_cascading`] despawns every source still linked to it.
    pub fn register_relationship<R: Relationship>(&mut self, linked_spawn: bool) -> TypeId {
        let id = self.resources.register_component::<R>();
        self.resources.register_component::<R::Inbound>();
        self.relationships.register::<R>(linked_spawn);
        id
    }

    /// Access the registered relationship kinds. Used by [`relationship::Relationships::cascade_all`]
    /// to read a relationship's `linked_spawn` flag while cascading a plain [`World::despawn`].
    pub(crate) fn relationships(&self) -> &relationship::Relationships {
        &self.relationships
    }

    /// Link `source` to the target named by `value`, maintaining the reciprocal
    /// inbound set on the target.
    ///
    /// If `source` already carried a different target for this relationship, it is
    /// unlinked from the old target first (dropping the old target's inbound
    /// component if its source set becomes empty).
    pub fn set_relationship<R: Relationship>(&mut self, source: entity::Entity, value: R) {
        let target = value.target();

        if let Some(previous) = self.entity(source).and_then(|r| r.get::<R>().map(R::target))
            && previous != target
        {
            self.unlink_inbound::<R>(previous, source);
        }

        self.ensure_inbound::<R>(target);
        if let Some(mut target_ref) = self.entity_mut(target)
            && let Some(inbound) = target_ref.get_mut::<R::Inbound>()
        {
            inbound.sources_mut().insert(source);
        }

        if self.entity(source).and_then(|r| r.get::<R>()).is_some() {
            self.remove_components::<R>(source);
        }
        let _ = self.add_components(source, value);
        self.observers.entity_parent_set(source, target);
    }

    /// Remove `source`'s relationship `R`, if any, unlinking it from its target's
    /// inbound set and dropping the inbound component if the set becomes empty.
    ///
    /// Does nothing if `source` carries no `R`.
    pub fn clear_relationship<R: Relationship>(&mut self, source: entity::Entity) {
        let Some(target) = self.entity(source).and_then(|r| r.get::<R>().map(R::target)) else {
            return;
        };
        self.unlink_inbound::<R>(target, source);
        self.remove_components::<R>(source);
    }

    /// Despawn `target`, detaching every source currently linked to it through `R`.
    ///
    /// If `R` was registered `linked_spawn`, those sources are despawned too,
    /// recursively, guarding against relationship cycles with a visited set.
    pub fn despawn_cascading<R: Relationship>(&mut self, target: entity::Entity) {
        let mut visited = std::collections::HashSet::new();
        self.despawn_cascading_inner::<R>(target, &mut visited);
    }

    fn despawn_cascading_inner<R: Relationship>(
        &mut self,
        target: entity::Entity,
        visited: &mut std::collections::HashSet<entity::Entity>,
    ) {
        if !visited.insert(target) {
            return;
        }

        let sources: Vec<entity::Entity> = self
            .entity(target)
            .and_then(|r| r.get::<R::Inbound>())
            .map(|inbound| inbound.sources().iter().copied().collect())
            .unwrap_or_default();

        let cascade = self.relationships.is_linked_spawn::<R>();

        for source in sources {
            self.remove_components::<R>(source);
            if cascade {
                self.despawn_cascading_inner::<R>(source, visited);
            }
        }

        self.despawn_entity_only(target);
    }

    /// Remove `source` from `target`'s inbound set for relationship `R`, dropping the
    /// inbound component entirely if the set becomes empty.
    pub(crate) fn unlink_inbound<R: Relationship>(&mut self, target: entity::Entity, source: entity::Entity) {
        let now_empty = if let Some(mut target_ref) = self.entity_mut(target) {
            if let Some(inbound) = target_ref.get_mut::<R::Inbound>() {
                inbound.sources_mut().remove(&source);
                inbound.sources().is_empty()
            } else {
                false
            }
        } else {
            false
        };

        if now_empty {
            self.remove_components::<R::Inbound>(target);
        }
    }

    /// Add `R::Inbound` to `target` if it doesn't already have it.
    fn ensure_inbound<R: Relationship>(&mut self, target: entity::Entity) {
        let has_inbound = self.entity(target).map(|r| r.has::<R::Inbound>()).unwrap_or(true);
        if !has_inbound {
            let _ = self.add_components(target, R::Inbound::default());
        }
    }

    /// Perform a world query to access all entities that match the query data `D`.
    ///
    ///
    /// Note: This holds a mutable reference to the entire world while the query result is active
    /// (use wisely).
    pub fn query<'w, D: query::Data>(&'w mut self) -> query::Result<'w, D> {
        let query = query::Query::<D>::new(&self.resources);
        query.invoke(self)
    }

    /// Perform a world query with additional `with`/`without` table filters.
    ///
    /// See [`query::Filter`] for how the filter participates in query-cache
    /// invalidation.
    pub fn query_filtered<'w, D: query::Data>(
        &'w mut self,
        filter: query::Filter,
    ) -> query::Result<'w, D> {
        let query = query::Query::<D>::new(&self.resources).with_filter(filter);
        query.invoke(self)
    }

    /// Register a new resource type in the world.
    pub fn register_unique<U: unique::Unique>(&mut self) -> TypeId {
        self.resources.register_unique::<U>()
    }

    /// Add a unique resource to the world.
    #[inline]
    pub fn add_unique<U: unique::Unique>(&mut self, resource: U) {
        self.storage.uniques_mut().insert::<U>(resource);
    }

    /// Get access to a unique resource stored in the world, if it exists.
    #[inline]
    pub fn get_unique<U: unique::Unique>(&self) -> Option<&U> {
        self.storage.uniques().get::<U>()
    }

    /// Get mutable access to a unique resource stored in the world, if it exists.
    #[inline]
    pub fn get_unique_mut<U: unique::Unique>(&mut self) -> Option<&mut U> {
        self.storage.uniques_mut().get_mut::<U>()
    }

    /// Remove a unique resource from the world, returning it if it existed.
    #[inline]
    pub fn remove_unique<U: unique::Unique>(&mut self) -> Option<U> {
        self.storage.uniques_mut().remove::<U>()
    }

    /// Create a shard with the requested access.
    ///
    /// Takes `&self` to allow multiple shards to coexist.
    /// Uses interior mutability to track active grants.
    pub fn shard(&self, access: &AccessRequest) -> Result<Shard<'_>, ConflictError> {
        // Check for conflicts and register grant
        let grant = self.active_grants.borrow_mut().check_and_grant(access)?;
        // Return the shard
        Ok(Shard::new(self as *const World as *mut World, grant))
    }

    /// Release a shard of this world.
    ///
    /// Must be called on the main thread (where the World lives).
    pub fn release_shard(&self, shard: Shard) {
        self.active_grants.borrow_mut().remove(&shard.into_grant());
    }

    /// Release a grant that was returned from a shard via `into_grant()`. This should consume the
    /// grant to prevent double-releasing.
    ///
    /// Note: Its generally safer to use `release_shard()` when possible.
    ///
    /// Must be called on the main thread (where the World lives).
    pub fn release_grant(&self, grant: &AccessGrant) {
        self.active_grants.borrow_mut().remove(grant);
    }
}

// World is intentionally !Send and !Sync:
// - !Send: World must stay on the main thread where it was created
// - !Sync: RefCell<GrantTracker> is !Sync, and we don't want &World shared across threads
//
// The _not_send marker ensures !Send (RefCell is Send, so we need the marker).
// RefCell naturally provides !Sync.

#[cfg(test)]
mod test {
    use rusty_macros::Component;

    use crate::ecs::world::{Id, World};

    #[derive(Component, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Component, Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[test]
    fn spawn_empty_entity() {
        // Given
        let mut world = World::new(Id(1));
        // When
        let entity = world.spawn(());
        // Then
        assert!(world.storage.entities().is_spawned(entity));
    }

    #[test]
    fn spawn_entity_with_components() {
        // Given
        let mut world = World::new(Id(1));

        // When
        let entity = world.spawn((Position { x: 42.0, y: 67.0 }, Velocity { dx: 0.0, dy: 1.0 }));

        // Then
        assert!(world.storage.entities().is_spawned(entity));

        let entity_ref = world.entity(entity).unwrap();

        assert_eq!(
            Position { x: 42.0, y: 67.0 },
            *entity_ref.get::<Position>().unwrap()
        );
        assert_eq!(
            Velocity { dx: 0.0, dy: 1.0 },
            *entity_ref.get::<Velocity>().unwrap()
        );
    }

    #[test]
    fn spawn_many_entity_with_components() {
        // Given
        let mut world = World::new(Id(1));

        // When
        let entities = world.spawn_many([
            (Position { x: 42.0, y: 67.0 }, Velocity { dx: 0.0, dy: 1.0 }),
            (Position { x: 67.0, y: 42.0 }, Velocity { dx: 1.0, dy: 0.0 }),
        ]);

        // Then
        let entity = entities[0];
        assert!(world.storage.entities().is_spawned(entity));

        let entity_ref = world.entity(entity).unwrap();

        assert_eq!(
            Position { x: 42.0, y: 67.0 },
            *entity_ref.get::<Position>().unwrap()
        );
        assert_eq!(
            Velocity { dx: 0.0, dy: 1.0 },
            *entity_ref.get::<Velocity>().unwrap()
        );

        let entity = entities[1];
        assert!(world.storage.entities().is_spawned(entity));

        let entity_ref = world.entity(entity).unwrap();

        assert_eq!(
            Position { x: 67.0, y: 42.0 },
            *entity_ref.get::<Position>().unwrap()
        );
        assert_eq!(
            Velocity { dx: 1.0, dy: 0.0 },
            *entity_ref.get::<Velocity>().unwrap()
        );
    }

    #[test]
    fn despawn_entity_with_components() {
        // Given
        let mut world = World::new(Id(1));

        #[derive(Component, Debug, PartialEq)]
        struct Comp1 {
            value: u32,
        }

        #[derive(Component, Debug, PartialEq)]
        struct Comp2 {
            value: String,
        }

        // When
        let entity = world.spawn((
            Comp1 { value: 42 },
            Comp2 {
                value: "Hello".to_string(),
            },
        ));

        // Then
        assert!(world.storage.entities().is_spawned(entity));

        // And When
        world.despawn(entity);

        // Then
        assert!(!world.storage.entities().is_spawned(entity));
        assert!(world.entity(entity).is_none());
    }

    #[test]
    fn despawn_entity_swaps_and_updates_location() {
        // Given
        let mut world = World::new(Id(1));

        #[derive(Component, Debug, PartialEq)]
        struct Comp1;

        let entity1 = world.spawn(Comp1);
        // Confirm entity1 is at row 0
        assert_eq!(
            world.storage.entities().location(entity1).unwrap().row(),
            0.into()
        );

        let entity2 = world.spawn(Comp1);
        // Confirm entity2 is at row 1
        assert_eq!(
            world.storage.entities().location(entity2).unwrap().row(),
            1.into()
        );

        // And When
        world.despawn(entity1);

        // Then
        assert!(!world.storage.entities().is_spawned(entity1));

        // Confirm entity2 is now at row 0
        assert_eq!(
            world.storage.entities().location(entity2).unwrap().row(),
            0.into()
        );

        // Confirm entity2 is still spawned
        assert!(world.storage.entities().is_spawned(entity2));

        // Confirm we can still get its components
        assert!(world.entity(entity2).unwrap().get::<Comp1>().is_some());
    }

    #[test]
    fn world_id() {
        let world = World::new(Id(42));
        assert_eq!(world.id(), Id(42));
        assert_eq!(world.id().id(), 42);
    }

    #[test]
    fn despawn_non_existent_entity_is_noop() {
        let mut world = World::new(Id(1));

        #[derive(Component)]
        struct TestComp;

        let entity1 = world.spawn(TestComp);
        world.despawn(entity1);

        // Despawn again - should be a no-op
        world.despawn(entity1);

        // Entity should still be despawned
        assert!(!world.storage.entities().is_spawned(entity1));
    }

    #[test]
    fn entity_ref_access() {
        let mut world = World::new(Id(1));

        let entity = world.spawn(Position { x: 10.0, y: 20.0 });

        // Test entity() method
        let entity_ref = world.entity(entity).unwrap();
        let pos = entity_ref.get::<Position>().unwrap();
        assert_eq!(pos.x, 10.0);
        assert_eq!(pos.y, 20.0);
    }

    #[test]
    fn entity_mut_access() {
        let mut world = World::new(Id(1));

        #[derive(Component, Debug, PartialEq)]
        struct Counter {
            value: u32,
        }

        let entity = world.spawn(Counter { value: 0 });

        // Modify via entity_mut
        {
            let mut entity_mut = world.entity_mut(entity).unwrap();
            let counter = entity_mut.get_mut::<Counter>().unwrap();
            counter.value = 100;
        }

        // Verify the change
        let entity_ref = world.entity(entity).unwrap();
        assert_eq!(entity_ref.get::<Counter>().unwrap().value, 100);
    }

    #[test]
    fn multiple_archetypes() {
        let mut world = World::new(Id(1));

        #[derive(Component)]
        struct A;

        #[derive(Component)]
        struct B;

        #[derive(Component)]
        struct C;

        // Spawn entities with different component combinations
        let e1 = world.spawn((A, B));
        let e2 = world.spawn((A, C));
        let e3 = world.spawn((B, C));
        let e4 = world.spawn((A, B, C));

        // All should be spawned
        assert!(world.storage.entities().is_spawned(e1));
        assert!(world.storage.entities().is_spawned(e2));
        assert!(world.storage.entities().is_spawned(e3));
        assert!(world.storage.entities().is_spawned(e4));

        // Verify we can access them
        assert!(world.entity(e1).is_some());
        assert!(world.entity(e2).is_some());
        assert!(world.entity(e3).is_some());
        assert!(world.entity(e4).is_some());
    }

    #[test]
    fn entity_reuse_after_despawn() {
        let mut world = World::new(Id(1));

        #[derive(Component)]
        struct TestComp;

        let entity1 = world.spawn(TestComp);
        let entity1_id = entity1.id();

        world.despawn(entity1);

        // Spawn another entity - it may reuse the ID
        let entity2 = world.spawn(TestComp);

        // The generation should be different even if ID is reused
        if entity2.id() == entity1_id {
            assert_ne!(entity1.generation(), entity2.generation());
        }

        // Original entity should not be accessible
        assert!(!world.storage.entities().is_spawned(entity1));
        assert!(world.storage.entities().is_spawned(entity2));
    }

    #[test]
    fn add_component_to_entity() {
        let mut world = World::new(Id(1));

        // Spawn entity with just Position
        let entity = world.spawn(Position { x: 1.0, y: 2.0 });

        // Verify only has Position
        {
            let entity_ref = world.entity(entity).unwrap();
            assert!(entity_ref.get::<Position>().is_some());
            assert!(entity_ref.get::<Velocity>().is_none());
        }

        // Add Velocity component
        let added = world.add_components(entity, Velocity { dx: 0.5, dy: 0.3 }).unwrap();
        assert!(added);

        // Verify now has both components
        let entity_ref = world.entity(entity).unwrap();
        let pos = entity_ref.get::<Position>().unwrap();
        let vel = entity_ref.get::<Velocity>().unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);
        assert_eq!(vel.dx, 0.5);
        assert_eq!(vel.dy, 0.3);
    }

    #[test]
    fn add_component_already_exists_returns_false() {
        let mut world = World::new(Id(1));

        let entity = world.spawn(Position { x: 1.0, y: 2.0 });

        // Try to add Position again
        let added = world.add_components(entity, Position { x: 5.0, y: 6.0 }).unwrap();
        assert!(!added);

        // Original values should be unchanged
        let entity_ref = world.entity(entity).unwrap();
        let pos = entity_ref.get::<Position>().unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);
    }

    #[test]
    fn add_component_to_nonexistent_entity_returns_false() {
        let mut world = World::new(Id(1));

        #[derive(Component)]
        struct TestComp;

        // Create and despawn an entity
        let entity = world.spawn(TestComp);
        world.despawn(entity);

        // Try to add component to despawned entity
        let added = world.add_components(entity, TestComp).unwrap();
        assert!(!added);
    }

    #[test]
    fn remove_component_from_entity() {
        let mut world = World::new(Id(1));

        // Spawn entity with Position and Velocity
        let entity = world.spawn((Position { x: 1.0, y: 2.0 }, Velocity { dx: 0.5, dy: 0.3 }));

        // Verify has both components
        {
            let entity_ref = world.entity(entity).unwrap();
            assert!(entity_ref.get::<Position>().is_some());
            assert!(entity_ref.get::<Velocity>().is_some());
        }

        // Remove Velocity component
        let removed = world.remove_components::<Velocity>(entity);
        assert!(removed);

        // Verify only has Position now
        let entity_ref = world.entity(entity).unwrap();
        let pos = entity_ref.get::<Position>().unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);
        assert!(entity_ref.get::<Velocity>().is_none());
    }

    #[test]
    fn remove_component_not_present_returns_false() {
        let mut world = World::new(Id(1));

        let entity = world.spawn(Position { x: 1.0, y: 2.0 });

        // Try to remove Velocity which doesn't exist
        let removed = world.remove_components::<Velocity>(entity);
        assert!(!removed);
    }

    #[test]
    fn remove_component_from_nonexistent_entity_returns_false() {
        let mut world = World::new(Id(1));

        #[derive(Component)]
        struct TestComp;

        let entity = world.spawn(TestComp);
        world.despawn(entity);

        // Try to remove component from despawned entity
        let removed = world.remove_components::<TestComp>(entity);
        assert!(!removed);
    }

    #[test]
    fn add_component_updates_other_entity_location() {
        // Test that swap-remove during migration properly updates other entities
        let mut world = World::new(Id(1));

        // Spawn two entities with same archetype
        let entity1 = world.spawn(Position { x: 1.0, y: 1.0 });
        let entity2 = world.spawn(Position { x: 2.0, y: 2.0 });

        // entity1 at row 0, entity2 at row 1
        assert_eq!(world.storage.location_for(entity1).unwrap().row(), 0.into());
        assert_eq!(world.storage.location_for(entity2).unwrap().row(), 1.into());

        // Migrate entity1 to new archetype (Position + Velocity)
        world.add_components(entity1, Velocity { dx: 0.5, dy: 0.3 }).unwrap();

        // entity2 should now be at row 0 (was swapped during entity1's migration)
        assert_eq!(world.storage.location_for(entity2).unwrap().row(), 0.into());

        // Both entities should still be accessible with correct data
        let e1_ref = world.entity(entity1).unwrap();
        assert_eq!(e1_ref.get::<Position>().unwrap().x, 1.0);
        assert_eq!(e1_ref.get::<Velocity>().unwrap().dx, 0.5);

        let e2_ref = world.entity(entity2).unwrap();
        assert_eq!(e2_ref.get::<Position>().unwrap().x, 2.0);
        assert!(e2_ref.get::<Velocity>().is_none());
    }

    #[test]
    fn remove_component_updates_other_entity_location() {
        let mut world = World::new(Id(1));

        // Spawn two entities with same archetype (Position + Velocity)
        let entity1 = world.spawn((Position { x: 1.0, y: 1.0 }, Velocity { dx: 0.5, dy: 0.5 }));
        let entity2 = world.spawn((Position { x: 2.0, y: 2.0 }, Velocity { dx: 1.0, dy: 1.0 }));

        // entity1 at row 0, entity2 at row 1
        assert_eq!(world.storage.location_for(entity1).unwrap().row(), 0.into());
        assert_eq!(world.storage.location_for(entity2).unwrap().row(), 1.into());

        // Remove Velocity from entity1
        world.remove_components::<Velocity>(entity1);

        // entity2 should now be at row 0
        assert_eq!(world.storage.location_for(entity2).unwrap().row(), 0.into());

        // Both entities should still be accessible with correct data
        let e1_ref = world.entity(entity1).unwrap();
        assert_eq!(e1_ref.get::<Position>().unwrap().x, 1.0);
        assert!(e1_ref.get::<Velocity>().is_none());

        let e2_ref = world.entity(entity2).unwrap();
        assert_eq!(e2_ref.get::<Position>().unwrap().x, 2.0);
        assert_eq!(e2_ref.get::<Velocity>().unwrap().dx, 1.0);
    }

    #[test]
    fn add_then_remove_component() {
        let mut world = World::new(Id(1));

        #[derive(Component, Debug, PartialEq)]
        struct Tag;

        let entity = world.spawn(Position { x: 1.0, y: 2.0 });

        // Add Tag
        assert!(world.add_components(entity, Tag).unwrap());
        assert!(world.entity(entity).unwrap().get::<Tag>().is_some());

        // Remove Tag
        assert!(world.remove_components::<Tag>(entity));
        assert!(world.entity(entity).unwrap().get::<Tag>().is_none());

        // Position should still be there
        let entity_ref = world.entity(entity).unwrap();
        let pos = entity_ref.get::<Position>().unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);
    }

    #[test]
    fn add_component_rejects_unmet_dependency() {
        // Given a component that declares a dependency on "Velocity"
        let mut world = World::new(Id(1));
        world.register_component_named::<Position>("Position", &["Velocity"]);
        let entity = world.spawn(());

        // When it's added alone, without its dependency
        let result = world.add_components(entity, Position { x: 0.0, y: 0.0 });

        // Then the mutation is rejected
        assert_eq!(
            result,
            Err(super::WorldError::DependencyUnmet {
                adder: "Position".to_string(),
                dependency: "Velocity".to_string(),
            })
        );
        assert!(world.entity(entity).unwrap().get::<Position>().is_none());
    }

    #[test]
    fn add_component_allows_dependency_satisfied_in_same_batch() {
        // Given the same dependency declaration
        let mut world = World::new(Id(1));
        world.register_component_named::<Position>("Position", &["Velocity"]);
        world.register_component_named::<Velocity>("Velocity", &[]);
        let entity = world.spawn(Velocity { dx: 0.0, dy: 0.0 });

        // When Position is added to an entity that already has Velocity
        let added = world.add_components(entity, Position { x: 1.0, y: 1.0 }).unwrap();

        // Then it succeeds
        assert!(added);
        assert!(world.entity(entity).unwrap().get::<Position>().is_some());
    }

    #[test]
    fn add_components_advances_tick_and_marks_write() {
        // Given a freshly spawned entity
        let mut world = World::new(Id(1));
        let start_tick = world.tick();
        let entity = world.spawn(Position { x: 0.0, y: 0.0 });
        let velocity_id = world.register_component::<Velocity>();

        // When a component is added
        world.add_components(entity, Velocity { dx: 1.0, dy: 1.0 }).unwrap();

        // Then the world tick advances and the written component is stamped with it
        assert!(world.tick() > start_tick);
        assert_eq!(world.last_write_tick(velocity_id), world.tick());
    }

    #[test]
    fn entity_mut_get_mut_marks_last_write() {
        // Given a spawned entity and its registered component id
        let mut world = World::new(Id(1));
        let entity = world.spawn(Position { x: 0.0, y: 0.0 });
        let position_id = world.register_component::<Position>();

        // When a component is mutated through entity_mut
        {
            let mut entity_mut = world.entity_mut(entity).unwrap();
            entity_mut.get_mut::<Position>().unwrap().x = 9.0;
        }

        // Then the component's last-write tick reflects the access
        assert_eq!(world.last_write_tick(position_id), world.tick());
        assert!(world.tick() > 0);
    }

    #[test]
    fn add_component_to_nonexistent_entity_does_not_advance_tick() {
        // Given a despawned entity
        let mut world = World::new(Id(1));

        #[derive(Component)]
        struct TestComp;

        let entity = world.spawn(TestComp);
        world.despawn(entity);
        let tick_before = world.tick();

        // When adding a component to it
        let added = world.add_components(entity, TestComp).unwrap();

        // Then nothing happens and the tick is untouched
        assert!(!added);
        assert_eq!(world.tick(), tick_before);
    }
}
