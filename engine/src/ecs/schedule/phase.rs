//! Phase execution for ECS system scheduling.
//!
//! A [`Phase`] represents a named execution stage in the game loop (e.g., "Update", "FixedUpdate",
//! "Render"). Each phase contains systems that run sequentially on the calling thread, in an
//! order determined once per phase by a topological sort over declared and inferred
//! dependencies.
//!
//! # Ordering
//!
//! A system's position in a phase is decided by three inputs, combined into a DAG before
//! the phase's first [`run`](Phase::run):
//!
//! 1. **Explicit dependencies** - [`SystemConfig::after`] names a system that must run first.
//! 2. **Implicit access conflicts** - two systems whose [`world::AccessRequest`]s conflict
//!    cannot be reordered freely. When one side's access is a superset of writes the other
//!    only reads, the writer is placed first; otherwise the tie is broken by `order` then
//!    insertion index.
//! 3. **Declared order** - [`SystemConfig::order`] is the tie-break for otherwise unrelated
//!    systems, and a schedule-wide "earliest wins" default ordering.
//!
//! The sort is computed once (on first [`run`](Phase::run) after systems are added) and
//! cached; adding another system invalidates the cache. A cycle among dependencies is a
//! programming error and panics rather than silently dropping a system.
//!
//! # Command Buffer
//!
//! Each phase owns a [`CommandBuffer`](system::CommandBuffer). Systems queue structural
//! changes (spawn/despawn/add/remove) into it during the phase; the buffer is flushed to the
//! world once, after every system in the phase has run.

use crate::ecs::{system, world};

/// Wrapper struct over a type ID to cleanup the schedule code by providing an opaque phase ID.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Id(std::any::TypeId);

impl Id {
    /// Construct a new ID from a label type.
    #[inline]
    pub const fn new<L: Label>() -> Self {
        Self(std::any::TypeId::of::<L>())
    }
}

/// A marker trait for phase identifiers.
///
/// Phase labels are zero-sized types used to identify phases in a [`Schedule`](super::Schedule).
/// The trait provides a human-readable name for debugging and logging.
///
/// # Implementing
///
/// The easiest way to define phase labels is with the [`define_phase!`] macro:
///
/// ```rust,ignore
/// define_phase!(Update, FixedUpdate, Render);
/// ```
///
/// For custom behavior, implement the trait manually:
///
/// ```rust,ignore
/// struct MyPhase;
///
/// impl Label for MyPhase {
///     fn name() -> &'static str { "MyPhase" }
///     fn id(self) -> Id { Id::new::<Self>() }
/// }
/// ```
pub trait Label: 'static {
    /// Returns a human-readable name for this phase.
    fn name() -> &'static str;

    /// Get the phase ID for a label.
    fn id(self) -> Id;
}

/// Defines one or more phase label types.
///
/// This macro creates zero-sized structs that implement [`Label`], providing
/// an ergonomic way to define phases for your game or application.
///
/// # Example
///
/// ```rust,ignore
/// use rusty_engine::define_phase;
///
/// // Define multiple phases at once
/// define_phase!(PreUpdate, Update, PostUpdate, Render);
///
/// // Use in schedule
/// schedule.add_system(Update, my_system, &mut world);
/// schedule.run(Update, &mut world);
/// ```
#[macro_export]
macro_rules! define_phase {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name;

            impl $crate::ecs::schedule::Label for $name {
                #[inline]
                fn name() -> &'static str {
                    stringify!($name)
                }

                fn id(self) -> $crate::ecs::schedule::Id {
                     $crate::ecs::schedule::Id::new::<Self>()
                }
            }
        )*
    };
}

/// Configuration for a system being added to a [`Phase`].
///
/// Built with a chained builder API and passed to [`Phase::add_system_with`] or
/// [`super::Schedule::add_system_with`].
///
/// ```rust,ignore
/// phase.add_system_with(
///     SystemConfig::new().named("physics").order(-10),
///     physics_system,
/// );
/// phase.add_system_with(
///     SystemConfig::new().after("physics"),
///     collision_system,
/// );
/// ```
#[derive(Default)]
pub struct SystemConfig {
    name: Option<&'static str>,
    order: i32,
    after: Vec<&'static str>,
    run_criteria: Option<Box<dyn Fn(&world::World) -> bool>>,
}

impl SystemConfig {
    /// Start building a default configuration: unnamed, order `0`, no dependencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give the system a stable name other systems can depend on via [`after`](Self::after).
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Set this system's tie-break order. Lower values run earlier among systems that
    /// are otherwise unordered.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Require that the named system (see [`named`](Self::named)) runs before this one.
    /// Unknown names are ignored - there's no dependency to enforce.
    pub fn after(mut self, name: &'static str) -> Self {
        self.after.push(name);
        self
    }

    /// Only run this system when `criteria` returns `true`, evaluated fresh every phase run.
    pub fn run_if(mut self, criteria: impl Fn(&world::World) -> bool + 'static) -> Self {
        self.run_criteria = Some(Box::new(criteria));
        self
    }
}

struct Entry {
    name: Option<&'static str>,
    order: i32,
    after: Vec<&'static str>,
    run_criteria: Option<Box<dyn Fn(&world::World) -> bool>>,
    system: system::System,
}

/// A named execution stage containing systems that run sequentially, in dependency order.
///
/// Phases represent logical stages in the game loop such as "Update", "FixedUpdate", and "Last".
/// Each phase maintains its own systems, execution plan, and command buffer, isolating one
/// stage's structural changes from the next.
///
/// # Example
///
/// ```rust,ignore
/// let mut phase = Phase::new();
///
/// phase.add_system(spawn_entities.into_system(&mut world));
/// phase.add_system(physics_system.into_system(&mut world));
/// phase.add_system(ai_system.into_system(&mut world));
///
/// phase.run(&mut world);
/// ```
#[derive(Default)]
pub struct Phase {
    entries: Vec<Entry>,
    command_buffer: system::CommandBuffer,
    plan: Option<Vec<usize>>,
}

impl Phase {
    /// Create a new, empty phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system with default configuration (unnamed, order `0`, no dependencies).
    pub fn add_system(&mut self, system: system::System) {
        self.add_system_with(SystemConfig::new(), system);
    }

    /// Add a system with an explicit [`SystemConfig`].
    pub fn add_system_with(&mut self, config: SystemConfig, system: system::System) {
        self.entries.push(Entry {
            name: config.name,
            order: config.order,
            after: config.after,
            run_criteria: config.run_criteria,
            system,
        });
        self.plan = None;
    }

    /// Number of systems registered in this phase.
    pub fn systems_len(&self) -> usize {
        self.entries.len()
    }

    /// Compute (or reuse a cached) execution order and run every system once, in order,
    /// skipping any whose run criteria returns `false`. Flushes the phase's command buffer
    /// once all systems have run.
    pub fn run(&mut self, world: &mut world::World) {
        if self.plan.is_none() {
            self.plan = Some(self.build_plan());
        }
        let plan = self.plan.as_ref().expect("plan built above");

        for &index in plan {
            let skip = match &self.entries[index].run_criteria {
                Some(criteria) => !criteria(world),
                None => false,
            };
            if skip {
                continue;
            }
            // SAFETY: `build_plan` only ever orders two systems with conflicting
            // `required_access()` relative to each other; since `Phase` executes
            // strictly sequentially on one thread, no two systems ever hold
            // conflicting access at the same time.
            unsafe {
                self.entries[index]
                    .system
                    .run(world, &self.command_buffer);
            }
        }

        self.command_buffer.flush(world);
    }

    /// Topologically sort `entries` into an execution order, combining explicit `after`
    /// dependencies with implicit access-conflict edges. Ties are broken by `(order, index)`.
    ///
    /// # Panics
    ///
    /// Panics if the dependency graph contains a cycle.
    fn build_plan(&self) -> Vec<usize> {
        let n = self.entries.len();
        let mut indegree = vec![0usize; n];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];

        let mut add_edge = |edges: &mut Vec<Vec<usize>>, indegree: &mut [usize], from: usize, to: usize| {
            if from != to && !edges[from].contains(&to) {
                edges[from].push(to);
                indegree[to] += 1;
            }
        };

        for (to, entry) in self.entries.iter().enumerate() {
            for dep_name in &entry.after {
                if let Some(from) = self.entries.iter().position(|e| e.name == Some(*dep_name)) {
                    add_edge(&mut edges, &mut indegree, from, to);
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let access_i = self.entries[i].system.required_access();
                let access_j = self.entries[j].system.required_access();
                if !access_i.conflicts_with(access_j) {
                    continue;
                }
                let (from, to) = if access_i.writes_before(access_j) {
                    (i, j)
                } else if access_j.writes_before(access_i) {
                    (j, i)
                } else if (self.entries[i].order, i) <= (self.entries[j].order, j) {
                    (i, j)
                } else {
                    (j, i)
                };
                add_edge(&mut edges, &mut indegree, from, to);
            }
        }

        let mut ready: std::collections::BinaryHeap<std::cmp::Reverse<(i32, usize)>> =
            std::collections::BinaryHeap::new();
        for (i, &degree) in indegree.iter().enumerate() {
            if degree == 0 {
                ready.push(std::cmp::Reverse((self.entries[i].order, i)));
            }
        }

        let mut plan = Vec::with_capacity(n);
        while let Some(std::cmp::Reverse((_, index))) = ready.pop() {
            plan.push(index);
            for &next in &edges[index] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(std::cmp::Reverse((self.entries[next].order, next)));
                }
            }
        }

        assert_eq!(
            plan.len(),
            n,
            "cycle detected while ordering systems - check `after` dependencies and component access"
        );

        plan
    }
}

/// A reusable, ordered list of phases, run together as a group.
///
/// ```rust,ignore
/// let normal_frame = Sequence::new()
///     .then(FixedUpdate)
///     .then(Update)
///     .then(Render);
///
/// let paused_frame = Sequence::new()
///     .then(Render);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    phases: Vec<Id>,
}

impl Sequence {
    /// Creates a new empty phase sequence.
    #[inline]
    pub fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Creates a sequence with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            phases: Vec::with_capacity(capacity),
        }
    }

    /// Adds a phase to the end of the sequence. Returns `self` for chaining.
    #[inline]
    pub fn then<L: Label>(mut self, label: L) -> Self {
        self.phases.push(label.id());
        self
    }

    /// Adds a phase to the sequence in place.
    #[inline]
    pub fn push<L: Label>(&mut self, label: L) {
        self.phases.push(label.id());
    }

    /// Returns the list of phase IDs for this sequence.
    pub fn phases(&self) -> &[Id] {
        &self.phases
    }

    /// Returns the number of phases in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Returns `true` if the sequence contains no phases.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Clears all phases from the sequence.
    #[inline]
    pub fn clear(&mut self) {
        self.phases.clear();
    }
}

#[cfg(test)]
mod tests {
    use rusty_macros::Component;

    use crate::ecs::{
        system::{IntoSystem, param::Query},
        world,
    };

    use super::*;

    define_phase!(Update, FixedUpdate, Render);

    #[derive(Component, Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Component, Clone, Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Component, Clone, Debug, PartialEq)]
    struct Health {
        value: i32,
    }

    #[test]
    fn empty_phase_runs_successfully() {
        let mut world = world::World::new(world::Id::new(0));
        let mut phase = Phase::new();
        phase.run(&mut world);
        assert_eq!(phase.systems_len(), 0);
    }

    #[test]
    fn single_system_runs() {
        let mut world = world::World::new(world::Id::new(0));
        world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 2.0 }));

        fn movement(query: Query<(&Velocity, &mut Position)>) {
            for (vel, pos) in query {
                pos.x += vel.dx;
                pos.y += vel.dy;
            }
        }

        let mut phase = Phase::new();
        phase.add_system(IntoSystem::into_system(movement, &mut world));
        phase.run(&mut world);

        let position: Vec<&Position> = world.query::<&Position>().collect();
        assert_eq!(position[0], &Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn conflicting_writers_ordered_by_declared_order() {
        let mut world = world::World::new(world::Id::new(0));
        world.spawn(Health { value: 0 });

        fn set_to_one(query: Query<&mut Health>) {
            for health in query {
                health.value = 1;
            }
        }
        fn set_to_two(query: Query<&mut Health>) {
            for health in query {
                health.value = 2;
            }
        }

        let mut phase = Phase::new();
        phase.add_system_with(
            SystemConfig::new().order(0),
            IntoSystem::into_system(set_to_one, &mut world),
        );
        phase.add_system_with(
            SystemConfig::new().order(1),
            IntoSystem::into_system(set_to_two, &mut world),
        );
        phase.run(&mut world);

        let health: Vec<&Health> = world.query::<&Health>().collect();
        assert_eq!(health[0].value, 2);
    }

    #[test]
    fn explicit_after_dependency_is_respected() {
        let mut world = world::World::new(world::Id::new(0));
        world.spawn(Health { value: 0 });

        fn double(query: Query<&mut Health>) {
            for health in query {
                health.value *= 2;
            }
        }
        fn increment(query: Query<&mut Health>) {
            for health in query {
                health.value += 1;
            }
        }

        let mut phase = Phase::new();
        // Declared in reverse-dependency order; `after` must still force `double` first.
        phase.add_system_with(
            SystemConfig::new().named("increment").after("double"),
            IntoSystem::into_system(increment, &mut world),
        );
        phase.add_system_with(
            SystemConfig::new().named("double"),
            IntoSystem::into_system(double, &mut world),
        );
        phase.run(&mut world);

        let health: Vec<&Health> = world.query::<&Health>().collect();
        // (0 * 2) + 1 = 1, not (0 + 1) * 2
        assert_eq!(health[0].value, 1);
    }

    #[test]
    fn run_criteria_can_skip_a_system() {
        let mut world = world::World::new(world::Id::new(0));
        world.spawn(Health { value: 0 });

        fn increment(query: Query<&mut Health>) {
            for health in query {
                health.value += 1;
            }
        }

        let mut phase = Phase::new();
        phase.add_system_with(
            SystemConfig::new().run_if(|_| false),
            IntoSystem::into_system(increment, &mut world),
        );
        phase.run(&mut world);

        let health: Vec<&Health> = world.query::<&Health>().collect();
        assert_eq!(health[0].value, 0);
    }

    #[test]
    #[should_panic(expected = "cycle detected")]
    fn cyclic_dependency_panics() {
        let mut world = world::World::new(world::Id::new(0));
        fn noop() {}

        let mut phase = Phase::new();
        phase.add_system_with(
            SystemConfig::new().named("a").after("b"),
            IntoSystem::into_system(noop, &mut world),
        );
        phase.add_system_with(
            SystemConfig::new().named("b").after("a"),
            IntoSystem::into_system(noop, &mut world),
        );
        phase.run(&mut world);
    }
}
