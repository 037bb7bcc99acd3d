//! Reciprocal "relationship" components.
//!
//! A relationship is a component on a *source* entity that names a single *target*
//! entity (`Relationship::target`). The target carries a paired *inbound* component
//! (`Relationship::Inbound`) holding the set of sources currently pointing at it. The
//! two sides are kept in sync by [`World::set_relationship`], [`World::clear_relationship`]
//! and [`World::despawn_cascading`]; nothing needs to touch the inbound component by
//! hand.
//!
//! Relationships are declared `linked_spawn` or not at registration
//! ([`World::register_relationship`]). A `linked_spawn` relationship cascades: deleting
//! the target deletes every source still pointing at it, recursively, with a visited
//! set guarding against cycles.

use std::any::TypeId as StdTypeId;
use std::collections::{HashMap, HashSet};

use crate::ecs::component::Component;
use crate::ecs::entity::Entity;
use crate::ecs::world::World;

/// A component naming the single entity this side of the relationship points at.
///
/// Implemented by a component such as `ChildOf { parent: Entity }`, paired with an
/// [`Inverse`] component on the parent (e.g. `Children { entities: HashSet<Entity> }`).
pub trait Relationship: Component {
    /// The component added to the target, tracking every source that currently
    /// points at it.
    type Inbound: Inverse;

    /// The entity this relationship instance points at.
    fn target(&self) -> Entity;
}

/// The reciprocal side of a [`Relationship`]: a set of every source entity currently
/// pointing at this one.
pub trait Inverse: Component + Default {
    fn sources(&self) -> &HashSet<Entity>;
    fn sources_mut(&mut self) -> &mut HashSet<Entity>;
}

/// Detaches (and, for `linked_spawn` kinds, despawns) every source still linked to
/// `target` through relationship `R`. Monomorphized per relationship type and stored
/// as a plain function pointer in [`Info`], so [`Relationships::cascade_all`] can walk
/// every registered kind without knowing any of their concrete types.
fn cascade_for<R: Relationship>(world: &mut World, target: Entity, visited: &mut HashSet<Entity>) {
    // Inbound side: entities currently pointing at `target` through `R`.
    let sources: Vec<Entity> = world
        .entity(target)
        .and_then(|r| r.get::<R::Inbound>())
        .map(|inbound| inbound.sources().iter().copied().collect())
        .unwrap_or_default();

    if !sources.is_empty() {
        let cascade = world.relationships().is_linked_spawn::<R>();
        for source in sources {
            world.remove_components::<R>(source);
            if cascade {
                world.despawn_cascading_all(source, visited);
            }
        }
    }

    // Outbound side: if `target` itself carries `R`, drop it from its own target's
    // inbound set so that set doesn't end up holding a reference to a despawned entity.
    if let Some(own_target) = world.entity(target).and_then(|r| r.get::<R>().map(R::target)) {
        world.unlink_inbound::<R>(own_target, target);
    }
}

/// Registration metadata for one relationship kind.
#[derive(Clone, Copy)]
struct Info {
    linked_spawn: bool,
    cascade: fn(&mut World, Entity, &mut HashSet<Entity>),
}

impl std::fmt::Debug for Info {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Info").field("linked_spawn", &self.linked_spawn).finish()
    }
}

/// Tracks which relationship kinds have been registered, and whether deleting a
/// relationship's target should cascade-delete its sources.
///
/// Keyed by the source component's `std::any::TypeId` rather than the world's own
/// [`TypeId`](crate::ecs::world::TypeId), since registration can happen before the
/// component type itself is registered in the [`TypeRegistry`](crate::ecs::world::TypeRegistry).
#[derive(Debug, Default)]
pub struct Relationships {
    info: HashMap<StdTypeId, Info>,
}

impl Relationships {
    pub(crate) fn register<R: Relationship>(&mut self, linked_spawn: bool) {
        let info = Info {
            linked_spawn,
            cascade: cascade_for::<R>,
        };
        if self.info.insert(StdTypeId::of::<R>(), info).is_some() {
            log::warn!(
                "relationship '{}' registered twice, replacing previous registration",
                std::any::type_name::<R>()
            );
        }
    }

    pub(crate) fn is_linked_spawn<R: Relationship>(&self) -> bool {
        self.info
            .get(&StdTypeId::of::<R>())
            .map(|info| info.linked_spawn)
            .unwrap_or(false)
    }

    /// Run every registered relationship kind's cascade against `target`, as part of
    /// a plain [`World::despawn`]. Called with `self` taken out of the world (see
    /// [`World::despawn_cascading_all`]) so the cascades can freely borrow `world`.
    pub(crate) fn cascade_all(&self, world: &mut World, target: Entity, visited: &mut HashSet<Entity>) {
        for info in self.info.values() {
            (info.cascade)(world, target, visited);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::world::World;
    use rusty_macros::Component;

    #[derive(Component, Debug, Default)]
    struct Children {
        entities: HashSet<Entity>,
    }

    impl Inverse for Children {
        fn sources(&self) -> &HashSet<Entity> {
            &self.entities
        }

        fn sources_mut(&mut self) -> &mut HashSet<Entity> {
            &mut self.entities
        }
    }

    #[derive(Component, Debug)]
    struct ChildOf {
        parent: Entity,
    }

    impl Relationship for ChildOf {
        type Inbound = Children;

        fn target(&self) -> Entity {
            self.parent
        }
    }

    #[test]
    fn set_relationship_links_both_sides() {
        // Given a world with a registered ChildOf/Children relationship and two entities
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(false);
        let parent = world.spawn(());
        let child = world.spawn(());

        // When the child is linked to the parent
        world.set_relationship(child, ChildOf { parent });

        // Then the child carries the relationship component and the parent's inbound
        // set contains the child
        assert_eq!(world.entity(child).unwrap().get::<ChildOf>().unwrap().parent, parent);
        assert!(world
            .entity(parent)
            .unwrap()
            .get::<Children>()
            .unwrap()
            .sources()
            .contains(&child));
    }

    #[test]
    fn set_relationship_retargeting_moves_inbound_membership() {
        // Given a child already linked to one parent
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(false);
        let old_parent = world.spawn(());
        let new_parent = world.spawn(());
        let child = world.spawn(());
        world.set_relationship(child, ChildOf { parent: old_parent });

        // When the child is re-targeted to a new parent
        world.set_relationship(child, ChildOf { parent: new_parent });

        // Then the old parent's inbound component is dropped (its set became empty)
        // and the new parent's inbound set contains the child
        assert!(world.entity(old_parent).unwrap().get::<Children>().is_none());
        assert!(world
            .entity(new_parent)
            .unwrap()
            .get::<Children>()
            .unwrap()
            .sources()
            .contains(&child));
    }

    #[test]
    fn clear_relationship_unlinks_both_sides() {
        // Given a linked child/parent pair
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(false);
        let parent = world.spawn(());
        let child = world.spawn(());
        world.set_relationship(child, ChildOf { parent });

        // When the relationship is cleared
        world.clear_relationship::<ChildOf>(child);

        // Then neither side references the other and the now-empty inbound component
        // is dropped
        assert!(world.entity(child).unwrap().get::<ChildOf>().is_none());
        assert!(world.entity(parent).unwrap().get::<Children>().is_none());
    }

    #[test]
    fn despawn_cascading_deletes_linked_spawn_sources() {
        // Given a linked_spawn relationship with a parent and two children
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(true);
        let parent = world.spawn(());
        let child_a = world.spawn(());
        let child_b = world.spawn(());
        world.set_relationship(child_a, ChildOf { parent });
        world.set_relationship(child_b, ChildOf { parent });

        // When the parent is despawned cascading through the relationship
        world.despawn_cascading::<ChildOf>(parent);

        // Then the parent and both children are gone
        assert!(world.entity(parent).is_none());
        assert!(world.entity(child_a).is_none());
        assert!(world.entity(child_b).is_none());
    }

    #[test]
    fn despawn_cascading_without_linked_spawn_only_detaches() {
        // Given a non-linked_spawn relationship
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(false);
        let parent = world.spawn(());
        let child = world.spawn(());
        world.set_relationship(child, ChildOf { parent });

        // When the parent is despawned cascading through the relationship
        world.despawn_cascading::<ChildOf>(parent);

        // Then the child survives, just detached from the (now gone) relationship
        assert!(world.entity(parent).is_none());
        assert!(world.entity(child).is_some());
        assert!(world.entity(child).unwrap().get::<ChildOf>().is_none());
    }

    #[test]
    fn despawn_cascading_guards_against_cycles() {
        // Given two entities pointing at each other through the same relationship kind
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(true);
        let a = world.spawn(());
        let b = world.spawn(());
        world.set_relationship(a, ChildOf { parent: b });
        world.set_relationship(b, ChildOf { parent: a });

        // When cascading from either end, the traversal terminates instead of looping
        world.despawn_cascading::<ChildOf>(a);

        // Then both entities end up despawned
        assert!(world.entity(a).is_none());
        assert!(world.entity(b).is_none());
    }

    #[test]
    fn plain_despawn_cascades_registered_relationships() {
        // Given a linked_spawn relationship, registered once and never touched again
        // through `despawn_cascading`
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(true);
        let parent = world.spawn(());
        let child = world.spawn(());
        world.set_relationship(child, ChildOf { parent });

        // When the parent is despawned through the plain entry point
        world.despawn(parent);

        // Then the cascade still runs: the child goes with it
        assert!(world.entity(parent).is_none());
        assert!(world.entity(child).is_none());
    }

    #[test]
    fn plain_despawn_of_a_source_detaches_it_from_its_target() {
        // Given a child linked to a parent
        let mut world = World::new(crate::ecs::world::Id::new(1));
        world.register_relationship::<ChildOf>(false);
        let parent = world.spawn(());
        let child = world.spawn(());
        world.set_relationship(child, ChildOf { parent });

        // When the child (the relationship's source) is despawned directly
        world.despawn(child);

        // Then the parent's inbound set no longer references it
        assert!(world.entity(child).is_none());
        assert!(world.entity(parent).unwrap().get::<Children>().is_none());
    }
}
