//! Component management for the ECS.
//!
//! This module provides the infrastructure for registering, storing, and managing component types
//! in the Entity Component System. Components are the data containers that can be attached to
//! entities to give them properties and behaviors.
//!
//! ## Architecture
//!
//! The component system consists of several key types:
//!
//! - [`Component`]: The trait that all component types must implement
//! - [`Id`]: A unique identifier for each registered component type
//! - [`Registry`]: registration and lookup of component types, an alias for
//!   [`world::TypeRegistry`]
//! - [`Info`]: Metadata about a component type (layout, drop function, etc.)
//! - [`Spec`]: A specification describing a set of component types
//!
//! A world is single-threaded, so `Registry` is a plain `HashMap`-backed
//! lookup rather than a concurrent map; component registration is still
//! idempotent.
//!
//! ## Usage
//!
//! ```ignore
//! use rusty_engine::ecs::component::Component;
//! use rusty_engine::ecs::world::TypeRegistry;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! let registry = TypeRegistry::new();
//! let pos_id = registry.register_component::<Position>();
//! ```

mod set;
mod spec;

pub use set::{BoxedSet, Set};
pub use spec::{IntoSpec, Spec};

use crate::ecs::world;

/// A component identifier. Components and uniques share a single ID space (see
/// [`world::TypeRegistry`]), so this is a plain alias rather than a distinct type.
pub type Id = world::TypeId;

/// Convenience alias for the registry components are registered against.
pub type Registry = world::TypeRegistry;

/// A trait representing a component in the ECS (Entity Component System).
///
/// At present this only sets the required trait bounds for a type to be used as a component.
///
/// Eventually this may be expanded to include common functionality for components.
pub trait Component: 'static + Sized + Send + Sync {}

/// Export convenience type for component type information.
pub type Info = world::TypeInfo;
