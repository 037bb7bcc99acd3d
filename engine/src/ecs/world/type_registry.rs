//! Unified type registry for all typed world data.
//!
//! This module provides [`TypeRegistry`], a registry that manages type IDs for both
//! components and uniques (singletons). Each type gets a single numeric ID used for
//! access control and storage indexing.
//!
//! # Design
//!
//! The registry enforces **mutual exclusion**: a type can be registered as either a
//! component OR a unique, but not both. This simplifies the access control system to
//! use a single bitset pair for all type-based access.
//!
//! A world is confined to a single thread (see the `!Send` marker on `World`), so the
//! registry needs no internal locking: `RefCell`/`Cell` give it interior mutability
//! without the synchronization overhead a shared-across-worlds registry would require.
//!
//! Each component additionally carries a globally unique string name and an optional
//! list of other component names it declares as dependencies. `World::add_components`
//! checks those declarations against the entity's resulting component set and raises
//! `WorldError::DependencyUnmet` when a prerequisite is missing.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = TypeRegistry::new();
//!
//! // Register a component
//! let pos_id = registry.register_component::<Position>();
//!
//! // Register a unique
//! let time_id = registry.register_unique::<GameTime>();
//!
//! // Attempting to register Position as unique would fail
//! assert!(registry.register_unique::<Position>().is_err());
//! ```

use std::{
    alloc::Layout,
    any::TypeId as StdTypeId,
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    ptr::NonNull,
};

use crate::ecs::storage::index::SparseId;
use crate::layout::schema::SchemaLayout;

/// The kind of type registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A component type (attached to entities, many instances).
    Component,
    /// A unique type (singleton, one instance per world).
    Unique,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Component => write!(f, "component"),
            TypeKind::Unique => write!(f, "unique"),
        }
    }
}

/// A unique identifier for a registered type.
///
/// This ID is shared between components and uniques, enabling a unified access control
/// system with a single bitset pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Construct a new Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this ID for use in indexable storage (e.g., Vec, bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for TypeId {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for TypeId {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

impl SparseId for TypeId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Metadata about a registered type.
///
/// Contains the information needed to work with type-erased storage: memory layout,
/// drop function, declared name/dependencies, and an optional binary schema.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// The unique type ID.
    id: TypeId,

    /// What kind of type this is (component or unique).
    kind: TypeKind,

    /// The Rust TypeId for runtime type checking.
    type_id: StdTypeId,

    /// The memory layout of the type.
    layout: Layout,

    /// The drop function for the type (may be a no-op).
    drop_fn: unsafe fn(NonNull<u8>),

    /// Globally unique component name (the declaration point for dependencies).
    name: String,

    /// Names of other components this one declares a dependency on.
    dependencies: Vec<String>,

    /// Binary layout of this type's schema, if one was supplied at registration.
    schema: Option<SchemaLayout>,
}

impl TypeInfo {
    /// Construct TypeInfo for type `T`.
    fn new<T: 'static>(id: TypeId, kind: TypeKind, name: String) -> Self {
        let drop_fn = if std::mem::needs_drop::<T>() {
            Self::drop_impl::<T>
        } else {
            Self::drop_noop
        };
        Self {
            id,
            kind,
            type_id: StdTypeId::of::<T>(),
            layout: Layout::new::<T>(),
            drop_fn,
            name,
            dependencies: Vec::new(),
            schema: None,
        }
    }

    /// Get the type ID.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Get the kind of type (component or unique).
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Get the Rust TypeId.
    #[inline]
    pub fn type_id(&self) -> StdTypeId {
        self.type_id
    }

    /// Get the memory layout.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Check if this is a zero-sized type.
    #[inline]
    pub fn is_zero_sized(&self) -> bool {
        self.layout.size() == 0
    }

    /// Get the drop function.
    #[inline]
    pub fn drop_fn(&self) -> unsafe fn(NonNull<u8>) {
        self.drop_fn
    }

    /// Get the type's declared name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the type's declared dependency names.
    #[inline]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Get the type's binary schema, if one was attached at registration.
    #[inline]
    pub fn schema(&self) -> Option<&SchemaLayout> {
        self.schema.as_ref()
    }

    /// Drop implementation for types that need drop.
    unsafe fn drop_impl<T>(ptr: NonNull<u8>) {
        unsafe {
            std::ptr::drop_in_place(ptr.as_ptr() as *mut T);
        }
    }

    /// No-op drop for types that don't need drop.
    unsafe fn drop_noop(_ptr: NonNull<u8>) {}
}

/// Zero-sized marker type used to carve out a write-access id for an event type's
/// active buffer, without needing a dedicated "event" variant in [`TypeKind`].
struct EventWriteMarker<E>(std::marker::PhantomData<fn() -> E>);

/// Zero-sized marker type used to carve out a read-access id for an event type's
/// stable buffer.
struct EventReadMarker<E>(std::marker::PhantomData<fn() -> E>);

/// A registry for all typed world data, confined to the world's owning thread.
///
/// The registry manages type IDs for both components and uniques, ensuring each type
/// gets a single unique ID. This enables efficient access control using a single
/// bitset pair rather than separate sets for components and uniques.
///
/// # Dual-Use Prevention
///
/// A type cannot be registered as both a component and a unique. Attempting to do so
/// panics; this constraint enables the simplified access control model.
pub struct TypeRegistry {
    /// Map from Rust TypeId to our Id.
    type_map: RefCell<HashMap<StdTypeId, TypeId>>,

    /// Map from declared component name to our Id, for dependency lookups.
    name_map: RefCell<HashMap<String, TypeId>>,

    /// List of registered type entries.
    types: RefCell<Vec<Option<TypeInfo>>>,

    /// Next available type identifier.
    next_id: Cell<u32>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a new, empty type registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: RefCell::new(HashMap::new()),
            name_map: RefCell::new(HashMap::new()),
            types: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register a type as a component, using its Rust type name as its declared name
    /// and no declared dependencies.
    ///
    /// Returns the existing ID if the type is already registered as a component.
    ///
    /// Panics if the type is already registered as a unique.
    pub fn register_component<T: 'static>(&self) -> TypeId {
        self.register_internal::<T>(TypeKind::Component, std::any::type_name::<T>().to_string(), &[])
    }

    /// Register a type as a component with an explicit name and declared dependency
    /// names (other component names that must already be present on an entity, or be
    /// added in the same batch, whenever this component is added).
    ///
    /// Panics if the type is already registered as a unique, or if `name` is already
    /// used by a different type.
    pub fn register_component_named<T: 'static>(&self, name: &str, dependencies: &[&str]) -> TypeId {
        self.register_internal::<T>(TypeKind::Component, name.to_string(), dependencies)
    }

    /// Register a type as a unique.
    ///
    /// Returns the existing ID if the type is already registered as a unique.
    ///
    /// Panics if the type is already registered as a component.
    pub fn register_unique<T: 'static>(&self) -> TypeId {
        self.register_internal::<T>(TypeKind::Unique, std::any::type_name::<T>().to_string(), &[])
    }

    /// Shorthand for [`register_component`](Self::register_component), used by generic code
    /// that only knows a type is `'static` (e.g. `component::Set::apply`).
    #[inline]
    pub fn register<T: 'static>(&self) -> TypeId {
        self.register_internal::<T>(TypeKind::Component, std::any::type_name::<T>().to_string(), &[])
    }

    /// Register an event type, returning a pair of marker type IDs: one for write
    /// access to its active buffer (held by `Producer<E>`), one for read access to
    /// its stable buffer (held by `Consumer<E>`). Idempotent like the other
    /// `register_*` methods: calling it again for the same `E` returns the same ids.
    pub fn register_event<E: 'static>(&self) -> (TypeId, TypeId) {
        let write = self.register_internal::<EventWriteMarker<E>>(
            TypeKind::Unique,
            format!("event_write::{}", std::any::type_name::<E>()),
            &[],
        );
        let read = self.register_internal::<EventReadMarker<E>>(
            TypeKind::Unique,
            format!("event_read::{}", std::any::type_name::<E>()),
            &[],
        );
        (write, read)
    }

    /// Get the write/read marker ids for an event type, if it has been registered.
    pub fn get_event<E: 'static>(&self) -> Option<(TypeId, TypeId)> {
        let write = self.get::<EventWriteMarker<E>>()?;
        let read = self.get::<EventReadMarker<E>>()?;
        Some((write, read))
    }

    /// Build a [`crate::ecs::component::Spec`] for a type implementing
    /// [`crate::ecs::component::IntoSpec`] (a single component type, or a tuple of them),
    /// registering any components it mentions along the way.
    #[inline]
    pub fn spec<IS: crate::ecs::component::IntoSpec>(&self) -> crate::ecs::component::Spec {
        IS::into_spec(self)
    }

    /// Attach a binary schema to an already-registered type.
    pub fn set_schema(&self, id: TypeId, schema: SchemaLayout) {
        let mut types = self.types.borrow_mut();
        if let Some(Some(info)) = types.get_mut(id.index()) {
            info.schema = Some(schema);
        }
    }

    /// Internal registration logic.
    ///
    /// Panics if the type is already registered as a different kind, or if `name`
    /// collides with a different type's declared name.
    fn register_internal<T: 'static>(&self, kind: TypeKind, name: String, dependencies: &[&str]) -> TypeId {
        let std_type_id = StdTypeId::of::<T>();

        if let Some(&existing_id) = self.type_map.borrow().get(&std_type_id) {
            let types = self.types.borrow();
            if let Some(Some(info)) = types.get(existing_id.index())
                && info.kind() != kind
            {
                panic!(
                    "type '{}' is already registered as a {}, cannot register as {}",
                    std::any::type_name::<T>(),
                    info.kind(),
                    kind
                )
            }
            return existing_id;
        }

        if let Some(&other) = self.name_map.borrow().get(&name)
            && other.0 != self.type_map.borrow().get(&std_type_id).map(|id| id.0).unwrap_or(u32::MAX)
        {
            panic!("component name '{name}' is already registered to a different type");
        }

        let id_value = self.next_id.get();
        self.next_id.set(id_value + 1);
        let id = TypeId(id_value);

        let mut types = self.types.borrow_mut();
        let index = id_value as usize;
        if index >= types.len() {
            types.resize(index + 1, None);
        }

        let mut info = TypeInfo::new::<T>(id, kind, name.clone());
        info.dependencies = dependencies.iter().map(|s| s.to_string()).collect();
        types[index] = Some(info);
        drop(types);

        self.type_map.borrow_mut().insert(std_type_id, id);
        self.name_map.borrow_mut().insert(name, id);

        id
    }

    /// Get the ID for a type, if registered.
    #[inline]
    pub fn get<T: 'static>(&self) -> Option<TypeId> {
        self.type_map.borrow().get(&StdTypeId::of::<T>()).copied()
    }

    /// Get the ID for a declared component name, if registered.
    #[inline]
    pub fn get_named(&self, name: &str) -> Option<TypeId> {
        self.name_map.borrow().get(name).copied()
    }

    /// Get the ID for a type if registered as a component.
    ///
    /// Returns `None` if not registered or registered as a unique.
    #[inline]
    pub fn get_component<T: 'static>(&self) -> Option<TypeId> {
        self.get_if_kind::<T>(TypeKind::Component)
    }

    /// Get the ID for a type if registered as a unique.
    ///
    /// Returns `None` if not registered or registered as a component.
    #[inline]
    pub fn get_unique<T: 'static>(&self) -> Option<TypeId> {
        self.get_if_kind::<T>(TypeKind::Unique)
    }

    /// Get the ID for a type if it matches the specified kind.
    fn get_if_kind<T: 'static>(&self, expected_kind: TypeKind) -> Option<TypeId> {
        let id = self.get::<T>()?;
        let types = self.types.borrow();
        types
            .get(id.index())
            .and_then(|opt| opt.as_ref())
            .filter(|info| info.kind() == expected_kind)
            .map(|info| info.id())
    }

    /// Get type info by ID.
    #[inline]
    pub fn get_info(&self, id: TypeId) -> Option<TypeInfo> {
        self.types.borrow().get(id.index()).and_then(|opt| opt.clone())
    }

    /// Get type info for a type, if registered.
    #[inline]
    pub fn get_info_of<T: 'static>(&self) -> Option<TypeInfo> {
        let id = self.get::<T>()?;
        self.get_info(id)
    }

    /// Get the kind of a registered type by ID.
    #[inline]
    pub fn kind(&self, id: TypeId) -> Option<TypeKind> {
        self.get_info(id).map(|info| info.kind())
    }

    /// Get the number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.next_id.get() as usize
    }

    /// Check if the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every dependency declared by the components in `adding` is present
    /// in `resulting` (the entity's final component name set after the add completes).
    ///
    /// Returns the name of the first unmet dependency, if any.
    pub fn check_dependencies(&self, adding: &[TypeId], resulting: &[String]) -> Option<String> {
        for &id in adding {
            let Some(info) = self.get_info(id) else { continue };
            for dep in info.dependencies() {
                if !resulting.iter().any(|n| n == dep) {
                    return Some(dep.clone());
                }
            }
        }
        None
    }
}
