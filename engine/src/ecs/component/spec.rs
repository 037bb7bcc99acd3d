use crate::{
    all_tuples,
    ecs::{component::Component, world},
};

/// A specification for the components required for an entity or archetype.
/// This is a sorted vector of component IDs that can be used as a Hash key
/// to identify unique component combinations.
///
/// It should also be used to determine if the owner (Entity, Archetype, etc.) has some specified
/// component attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    ids: Vec<world::TypeId>,
}

impl Spec {
    /// An empty component specification.
    pub const EMPTY: Self = Spec { ids: Vec::new() };

    /// Construct a new Spec from the given component IDs.
    #[inline]
    pub fn new(ids: impl Into<Vec<world::TypeId>>) -> Self {
        let mut ids = ids.into();
        // Ensure the IDs are sorted.
        ids.sort();
        // Remove any duplicates. Perhaps this should be an error instead?
        ids.dedup();
        // Trim any excess capacity.
        ids.shrink_to_fit();

        Self { ids }
    }

    /// Get the component IDs in this specification.
    #[inline]
    pub fn ids(&self) -> &[world::TypeId] {
        &self.ids
    }

    /// Determine if this specification contains the given component ID.
    #[inline]
    pub fn contains(&self, id: world::TypeId) -> bool {
        // Binary search since the IDs are sorted.
        self.ids.binary_search(&id).is_ok()
    }

    /// Determine if this specification contains all component IDs in the other specification.
    #[inline]
    pub fn contains_all(&self, other: &Spec) -> bool {
        for id in &other.ids {
            if !self.contains(*id) {
                return false;
            }
        }
        true
    }

    /// Merge this specification with another, returning a new specification containing
    /// the union of both component ID sets.
    #[inline]
    pub fn merge(&self, other: &Spec) -> Self {
        // Pre-allocate capacity to avoid reallocation
        let mut ids = Vec::with_capacity(self.ids.len() + other.ids.len());
        ids.extend_from_slice(&self.ids);
        ids.extend_from_slice(&other.ids);
        Self::new(ids)
    }

    /// Return a new specification containing the IDs in this specification that are not
    /// present in `other`.
    #[inline]
    pub fn difference(&self, other: &Spec) -> Self {
        Self::new(
            self.ids
                .iter()
                .copied()
                .filter(|id| !other.contains(*id))
                .collect::<Vec<_>>(),
        )
    }

    /// Get the number of component IDs in this specification.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Determine if this specification is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<world::TypeId>> for Spec {
    #[inline]
    fn from(value: Vec<world::TypeId>) -> Self {
        Spec::new(value)
    }
}

/// Trait for converting a type into a component specification (`Spec`).
pub trait IntoSpec<Marker = ()> {
    /// Convert the type into a component specification using the given registry.
    fn into_spec(registry: &world::TypeRegistry) -> Spec;
}

/// [`IntoSpec`] implementation for the empty tuple.
impl IntoSpec for () {
    /// Convert the empty tuple into an empty Spec.
    fn into_spec(_registry: &world::TypeRegistry) -> Spec {
        Spec::EMPTY
    }
}

/// [`IntoSpec`] implementation for single component types.
impl<C: Component> IntoSpec for C {
    fn into_spec(registry: &world::TypeRegistry) -> Spec {
        Spec::new([registry.register_component::<C>()])
    }
}

/// [`IntoSpec`] implementation for tuples of other [`IntoSpec`] types.
macro_rules! tuple_spec {
    ($($name: ident),*) => {
        impl<$($name: IntoSpec),*> IntoSpec for ($($name,)*) {
            fn into_spec(registry: &world::TypeRegistry) -> Spec {
                let mut ids = Vec::new();
                $(
                    ids.extend(<$name>::into_spec(registry).ids());
                )*
                Spec::new(ids)
            }
        }
    }
}

// Implement the tuple -> Spec for all tuples up to 26 elements.
all_tuples!(tuple_spec);
