use crate::{
    all_tuples,
    ecs::component::{Component, Id, IntoSpec, Registry},
};

/// Trait describing a target that can have component values applied to it from a `Set`.
pub trait Target {
    fn apply<C: Component>(&mut self, id: Id, value: C);
}

/// A trait describing a set of component values owned by an entity.
/// The goal of this trait is to allow multiple ways to apply component values for an entity while
/// providing a way to iterate over the component types and values in a type-erased manner.
///
/// Examples of sets include: a single component type, a tuple of component types, or something
/// hand created.
pub trait Set: IntoSpec + Sized + 'static {
    /// Apply the component values in this set to the given target. This takes ownership of self.
    fn apply<T: Target>(self, registry: &Registry, target: &mut T);
}

/// Implement Set for single component types.
impl<C: Component> Set for C {
    fn apply<T: Target>(self, registry: &Registry, target: &mut T) {
        target.apply::<C>(registry.register::<C>(), self);
    }
}

impl Set for () {
    fn apply<T: Target>(self, _registry: &Registry, _target: &mut T) {
        // No components to apply.
    }
}

/// Implement Set for tuples of component types.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {

            /// Apply each component in the tuple to the target.
            fn apply<CT: Target>(self, registry: &Registry, target: &mut CT) {
                 #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                 #[allow(non_snake_case)]
                $(<$name as Set>::apply($name, registry, target);)*
            }
        }
    }
}

// Implement the tuple Set for all tuples up to 26 elements.
all_tuples!(tuple_set);

/// A `Target` that copies each applied component's raw bytes instead of storing it
/// behind its concrete type. Used by [`BoxedSet`] to erase a `Set` into a form a
/// deferred command can carry across the `System` boundary without knowing the
/// concrete component types at the call site.
struct Collector {
    items: Vec<(Id, Vec<u8>)>,
}

impl Target for Collector {
    fn apply<C: Component>(&mut self, id: Id, value: C) {
        // SAFETY: `value` is a valid, initialized `C`; we copy its bytes and then
        // `mem::forget` it so the value isn't dropped twice (once here, once when
        // the bytes are later written into a column and owned by storage).
        let bytes = unsafe {
            std::slice::from_raw_parts(&value as *const C as *const u8, std::mem::size_of::<C>())
        }
        .to_vec();
        std::mem::forget(value);
        self.items.push((id, bytes));
    }
}

/// A type-erased [`Set`], holding each component's id alongside its raw bytes.
///
/// Built from a concrete `Set` at the call site (where the component types are
/// still known), then carried by a deferred [`crate::ecs::system::command::Command`]
/// to be written into storage at flush time, once the concrete types no longer
/// matter.
#[derive(Debug, Default)]
pub struct BoxedSet {
    items: Vec<(Id, Vec<u8>)>,
}

impl BoxedSet {
    /// Erase a concrete component set, registering each component type along the way.
    pub fn new<S: Set>(values: S, registry: &Registry) -> Self {
        let mut collector = Collector { items: Vec::new() };
        values.apply(registry, &mut collector);
        Self {
            items: collector.items,
        }
    }

    /// The ids of the components carried by this set.
    pub fn ids(&self) -> Vec<Id> {
        self.items.iter().map(|(id, _)| *id).collect()
    }

    /// Consume the set, returning its `(id, bytes)` pairs for writing into storage.
    pub fn into_items(self) -> Vec<(Id, Vec<u8>)> {
        self.items
    }
}

#[cfg(test)]
mod tests {

    use std::any::Any;

    #[cfg(test)]
    use crate::ecs::component::Id;
    use crate::ecs::component::Spec;

    use super::*;

    struct MockTarget {
        ids: Vec<Id>,
        vals: Vec<Box<dyn Any>>,
    }

    impl Target for MockTarget {
        fn apply<C: Component>(&mut self, id: Id, value: C) {
            self.ids.push(id);
            self.vals.push(Box::new(value));
        }
    }

    fn test_set<S: Set>(set: S, registry: &mut Registry) -> (Spec, Vec<Id>, Vec<Box<dyn Any>>) {
        let mut target = MockTarget {
            ids: Vec::new(),
            vals: Vec::new(),
        };

        set.apply(registry, &mut target);

        (registry.spec::<S>(), target.ids, target.vals)
    }

    #[test]
    fn test_single_component_set() {
        // Given
        #[derive(Component, Debug, PartialEq)]
        struct TestComponent {
            value: u32,
        }

        let mut registry = Registry::new();

        let comp = TestComponent { value: 42 };

        // When
        let (spec, ids, vals) = test_set(comp, &mut registry);

        // Then
        assert_eq!(spec.ids(), &[Id::new(0)]);

        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0], Id::new(0));

        assert_eq!(vals.len(), 1);
        assert_eq!(
            vals[0].downcast_ref::<TestComponent>(),
            Some(&TestComponent { value: 42 })
        );
    }

    #[test]
    fn test_tuple_component_set() {
        // Given
        #[derive(Component, Debug, PartialEq)]
        struct Component1 {
            value: u32,
        }

        #[derive(Component, Debug, PartialEq)]
        struct Component2 {
            value: u32,
        }

        #[derive(Component, Debug, PartialEq)]
        struct Component3 {
            value: u32,
        }

        let mut registry = Registry::new();

        let comp1 = Component1 { value: 42 };
        let comp2 = Component2 { value: 67 };
        let comp3 = Component3 { value: 99 };

        // When
        let (spec, ids, vals) = test_set((comp1, comp2, comp3), &mut registry);

        // Then
        assert_eq!(spec.ids(), &[Id::new(0), Id::new(1), Id::new(2)]);

        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], Id::new(0));
        assert_eq!(ids[1], Id::new(1));
        assert_eq!(ids[2], Id::new(2));

        assert_eq!(vals.len(), 3);
        assert_eq!(
            vals[0].downcast_ref::<Component1>(),
            Some(&Component1 { value: 42 })
        );
        assert_eq!(
            vals[1].downcast_ref::<Component2>(),
            Some(&Component2 { value: 67 })
        );
        assert_eq!(
            vals[2].downcast_ref::<Component3>(),
            Some(&Component3 { value: 99 })
        );
    }

    #[test]
    fn test_nested_tuple_component_set() {
        // Given
        #[derive(Component, Debug, PartialEq)]
        struct Component1 {
            value: u32,
        }

        #[derive(Component, Debug, PartialEq)]
        struct Component2 {
            value: u32,
        }

        #[derive(Component, Debug, PartialEq)]
        struct Component3 {
            value: u32,
        }

        let mut registry = Registry::new();

        let comp1 = Component1 { value: 42 };
        let comp2 = Component2 { value: 67 };
        let comp3 = Component3 { value: 99 };

        // When
        let (spec, ids, vals) = test_set((comp1, (comp2, comp3)), &mut registry);

        // Then
        assert_eq!(spec.ids(), &[Id::new(0), Id::new(1), Id::new(2)]);

        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], Id::new(0));
        assert_eq!(ids[1], Id::new(1));
        assert_eq!(ids[2], Id::new(2));

        assert_eq!(vals.len(), 3);
        assert_eq!(
            vals[0].downcast_ref::<Component1>(),
            Some(&Component1 { value: 42 })
        );
        assert_eq!(
            vals[1].downcast_ref::<Component2>(),
            Some(&Component2 { value: 67 })
        );
        assert_eq!(
            vals[2].downcast_ref::<Component3>(),
            Some(&Component3 { value: 99 })
        );
    }
}
