//! High-level query API for accessing entities and components across archetypes.
//!
//! This module provides a type-safe query system that allows you to iterate over
//! entities and their components across multiple tables (archetypes) in the ECS.
//!
//! # Architecture
//!
//! The query system is built on three main concepts:
//!
//! - **[Parameter]**: Individual query elements like `&Component`, `&mut Component`,
//!   `Option<&Component>`, or `Entity`. Each parameter represents a single piece of
//!   data you want to access.
//!
//! - **[Data]**: Complete query specifications composed of one or more parameters.
//!   Tuples of parameters automatically implement `Data`, allowing queries like
//!   `(Entity, &Position, &mut Velocity)`.
//!
//! - **[Result]**: The iterator returned by invoking a query, which yields matching
//!   entities across all relevant tables.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rusty_engine::ecs::{query::Query, world::World};
//! use rusty_macros::Component;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut world = World::new(/* ... */);
//!
//! // Create a query for entities with Position and mutable Velocity
//! let query = Query::<(&Position, &mut Velocity)>::new(world.components());
//!
//! // Iterate over matching entities
//! for (pos, vel) in query.invoke(&mut world) {
//!     vel.dx += pos.x * 0.1;
//!     vel.dy += pos.y * 0.1;
//! }
//! ```
//!
//! # Optional Components
//!
//! You can query for components that may or may not exist using `Option<T>`:
//!
//! ```rust,ignore
//! let query = Query::<(Entity, &Position, Option<&Velocity>)>::new(world.components());
//!
//! for (entity, pos, vel) in query.invoke(&mut world) {
//!     match vel {
//!         Some(v) => println!("Entity {:?} has velocity", entity),
//!         None => println!("Entity {:?} is stationary", entity),
//!     }
//! }
//! ```
//!
//! # Safety and Validation
//!
//! The query system performs runtime validation to prevent aliasing violations:
//!
//! - Requesting the same component multiple times (e.g., `(&Foo, &Foo)`) will panic
//! - Requesting conflicting mutability (e.g., `(&Foo, &mut Foo)`) will panic
//!
//! This validation happens at query invocation time, not construction time.
//!
//! [Parameter]: param::Parameter
//! [Data]: data::Data
//! [Result]: result::Result

use std::marker::PhantomData;

use crate::ecs::{component, query::data::DataSpec, world};

mod cache;
mod data;
mod param;
mod result;

/// Publicly re-exported query data trait.
pub use data::Data;

/// Publicly re-exported query result iterator.
pub use result::Result;

/// Publicly re-exported query cache, owned by [`world::World`].
pub use cache::Cache;

/// Additional `with`/`without` component constraints applied to a query beyond its
/// fetched [`Data`].
///
/// A `with` component restricts matching tables the same way a required (non-optional)
/// fetched component would, but isn't actually fetched. A `without` component excludes
/// any table that has it. Both participate in the query's relevant set for cache
/// invalidation.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    with: component::Spec,
    without: component::Spec,
}

impl Filter {
    /// An empty filter: no extra constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the given component types to be present, in addition to the query's
    /// fetched data.
    pub fn with<S: component::IntoSpec>(mut self, components: &component::Registry) -> Self {
        self.with = self.with.merge(&components.spec::<S>());
        self
    }

    /// Exclude tables that have any of the given component types.
    pub fn without<S: component::IntoSpec>(mut self, components: &component::Registry) -> Self {
        self.without = self.without.merge(&components.spec::<S>());
        self
    }
}

/// A query for accessing entities and components across multiple tables.
///
/// `Query<D>` is parameterized by a [`Data`] type that specifies what components
/// and entities should be accessed. The type parameter `D` is typically a tuple
/// of [`Parameter`] types.
///
/// # Type Parameters
///
/// - `D`: The query data specification (e.g., `&Component`, `(&C1, &mut C2)`)
///
/// # Construction
///
/// Queries are created using [`Query::new`], which takes a component registry
/// to register and look up component types.
///
/// # Invocation
///
/// Queries are executed using [`Query::invoke`], which returns an iterator over
/// matching entities. The iterator borrows the world mutably for the duration
/// of the iteration.
///
/// # Examples
///
/// ```rust,ignore
/// // Query for a single component
/// let query = Query::<&Position>::new(world.components());
/// for pos in query.invoke(&mut world) {
///     println!("Position: {:?}", pos);
/// }
///
/// // Query for multiple components with mixed mutability
/// let query = Query::<(&Position, &mut Velocity)>::new(world.components());
/// for (pos, vel) in query.invoke(&mut world) {
///     vel.dx += pos.x;
/// }
/// ```
///
/// [`Data`]: data::Data
/// [`Parameter`]: param::Parameter
pub struct Query<D> {
    /// The specification describing what data this query accesses.
    data_spec: DataSpec,

    /// Additional `with`/`without` table constraints beyond the fetched data.
    filter: Filter,

    /// Phantom data to tie the Data type to the struct.
    phantom: PhantomData<D>,
}

impl<D> Query<D> {
    /// Construct a new query for the given data type.
    ///
    /// This creates the query specification by analyzing the type `D` and registering
    /// any necessary component types in the component registry.
    ///
    /// # Parameters
    ///
    /// - `components`: The component registry used to register and look up component types
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let query = Query::<(&Position, &mut Velocity)>::new(world.components());
    /// ```
    #[inline]
    pub fn new(components: &component::Registry) -> Self
    where
        D: Data,
    {
        Self {
            data_spec: D::spec(components),
            filter: Filter::default(),
            phantom: PhantomData,
        }
    }

    /// Attach `with`/`without` table filters to this query.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let filter = Filter::new().without::<Disabled>(world.components());
    /// let query = Query::<&Position>::new(world.components()).with_filter(filter);
    /// ```
    #[inline]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// One-shot query execution. Shorthand for creating and invoking a query immediately that
    /// can't be cached for re-use.
    ///
    /// This will create a query and invoke it immediately on the given world.
    ///
    /// # Parameters
    ///
    /// - `world`: Mutable reference to the world to query
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = Query::<(&Position, &mut Velocity)>::one_shot(&mut world);
    /// ```
    #[inline]
    pub fn one_shot<'w>(world: &'w mut world::World) -> Result<'w, D>
    where
        D: Data,
    {
        Self::new(world.components()).invoke(world)
    }

    /// Execute the query and return an iterator over matching entities.
    ///
    /// This method:
    /// 1. Validates the query specification to prevent aliasing violations
    /// 2. Identifies all tables (archetypes) that contain the required components
    /// 3. Returns an iterator that yields matching entities across those tables
    ///
    /// # Parameters
    ///
    /// - `world`: Mutable reference to the world to query
    ///
    /// # Returns
    ///
    /// An iterator that yields items of type `D` (the query data type).
    ///
    /// # Panics
    ///
    /// Panics if the query contains aliasing violations, such as:
    /// - Requesting the same component multiple times (e.g., `(&Foo, &Foo)`)
    /// - Requesting conflicting mutability (e.g., `(&Foo, &mut Foo)`)
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let query = Query::<(&Position, &mut Velocity)>::new(world.components());
    ///
    /// for (pos, vel) in query.invoke(&mut world) {
    ///     // Update velocity based on position
    ///     vel.dx += pos.x * 0.01;
    /// }
    /// ```
    pub fn invoke<'w>(&self, world: &'w mut world::World) -> Result<'w, D>
    where
        D: Data,
    {
        // Runtime check to ensure no aliasing violations in component data types.
        assert!(
            self.data_spec.is_valid(),
            "Query aliasing violation: same component requested multiple times"
        );

        // Create a component spec for the query, folding in the `with` filter.
        let comp_spec = self.data_spec.as_component_spec();
        let required_spec = comp_spec.merge(&self.filter.with);

        // Every component this query is sensitive to: fetched (required or optional),
        // `with`, and `without`. A write to any of these must invalidate the cache.
        let mut relevant: Vec<component::Id> = self.data_spec.all_component_ids();
        relevant.extend(self.filter.with.ids());
        relevant.extend(self.filter.without.ids());

        let without = self.filter.without.clone();
        let tick = world.tick();

        let table_ids = world.query_cache().get_or_rebuild(
            required_spec.ids(),
            self.filter.with.ids(),
            without.ids(),
            &relevant,
            |id| world.last_write_tick(id),
            tick,
            || {
                world
                    .storage()
                    .supporting(&required_spec)
                    .into_iter()
                    .filter(|table_id| {
                        let table_spec = world.storage().get_table(*table_id).components();
                        !without.ids().iter().any(|wid| table_spec.contains(*wid))
                    })
                    .collect()
            },
        );

        Result::new(world, table_ids)
    }

    /// Invoke the query on a shard to get an iterator over matching entities.
    ///
    /// This is similar to [`invoke`](Self::invoke) but works with a [`world::Shard`]
    /// instead of a full `World`. The shard's grant should cover the components
    /// accessed by this query.
    ///
    /// # Parameters
    ///
    /// - `shard`: Mutable reference to the shard to query
    ///
    /// # Returns
    ///
    /// An iterator that yields items of type `D` (the query data type).
    ///
    /// # Panics
    ///
    /// Panics if the query has aliasing violations, same as [`invoke`](Self::invoke).
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let query = Query::<(&Position, &mut Velocity)>::new(world.components());
    /// let shard = world.shard(&access_request)?;
    ///
    /// for (pos, vel) in query.invoke_shard(&mut shard) {
    ///     vel.dx += pos.x * 0.01;
    /// }
    /// ```
    pub fn invoke_shard<'w>(&self, shard: &'w mut world::Shard<'_>) -> Result<'w, D>
    where
        D: Data,
    {
        // Runtime check to ensure no aliasing violations in component data types.
        assert!(
            self.data_spec.is_valid(),
            "Query aliasing violation: same component requested multiple times"
        );

        // Create a component spec for the query, folding in the `with` filter. Shards
        // don't go through the query cache: they're scoped to a single scheduler
        // dispatch and rarely re-invoked with an unchanged shape.
        let comp_spec = self.data_spec.as_component_spec();
        let required_spec = comp_spec.merge(&self.filter.with);

        let table_ids: Vec<_> = shard
            .storage()
            .supporting(&required_spec)
            .into_iter()
            .filter(|table_id| {
                let table_spec = shard.storage().get_table(*table_id).components();
                !self.filter.without.ids().iter().any(|wid| table_spec.contains(*wid))
            })
            .collect();

        // SAFETY: Shard has grant covering required access, validated at system execution
        Result::new(unsafe { shard.world_mut() }, table_ids)
    }
}
