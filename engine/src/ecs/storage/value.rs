use crate::{
    all_tuples,
    ecs::{
        component::{self, Component},
        storage::{Row, Table},
    },
};

/// A trait describing component values to be applied to an entity (table).
/// The goal of this trait is to allow multiple ways to apply component values.
///
/// Examples of value include: a single component type, a tuple of component types, or something
/// hand created.
pub trait Values: component::IntoSpec + 'static {
    /// Apply the component values in this set to the given target. This takes ownership of self.
    fn apply(self, target: &mut Table, row: Row);
}

/// Implement Set for single component types.
impl<C: Component> Values for C {
    fn apply(self, target: &mut Table, row: Row) {
        target.apply_value::<C>(row, self);
    }
}

impl Values for () {
    fn apply(self, _target: &mut Table, _row: Row) {
        // No components to apply.
    }
}

/// Implement Set for tuples of component types.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Values),*> Values for ($($name,)*) {

            /// Apply each component in the tuple to the target.
            fn apply(self,  target: &mut Table, row: Row) {
                 #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                 #[allow(non_snake_case)]
                $(<$name as Values>::apply($name, target, row);)*
            }
        }
    }
}

// Implement the tuple Set for all tuples up to 26 elements.
all_tuples!(tuple_set);
