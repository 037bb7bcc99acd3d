//! Schedule management for organizing and executing ECS systems in phases.
//!
//! This module provides the [`Schedule`] container for organizing systems into named phases
//! and executing them, in dependency order, on the calling thread. Phases are identified by
//! marker types implementing the [`phase::Label`] trait.
//!
//! # Architecture
//!
//! ```text
//! Schedule
//!   ├── Phase "FixedUpdate" ─► [physics_system, collision_system, ...]
//!   ├── Phase "Update"      ─► [ai_system, animation_system, ...]
//!   └── Phase "Render"      ─► [culling_system, draw_system, ...]
//! ```
//!
//! # Defining Phases
//!
//! Phases are identified by zero-sized marker types implementing [`phase::Label`].
//! Use the [`define_phase!`] macro for convenience:
//!
//! ```rust,ignore
//! use rusty_engine::define_phase;
//!
//! define_phase!(FixedUpdate, Update, LateUpdate, Render);
//! ```
//!
//! # Canonical Phases
//!
//! [`Engine`](crate::core::Engine) drives a fixed set of canonical phases, grouped and run via
//! [`Sequence::startup`], [`Sequence::frame`], and [`Sequence::fixed`]:
//!
//! - **Startup** (run once, before the first frame): `FirstStartup`, `PreStartup`, `Startup`,
//!   `PostStartup`, `LastStartup`.
//! - **Frame** (run once per call to `Engine::update`): `First`, `PreUpdate`, `Update`,
//!   `PostUpdate`, `Last`.
//! - **Fixed** (run zero or more times per frame, once per accumulated fixed timestep):
//!   `FixedFirst`, `FixedPreUpdate`, `FixedUpdate`, `FixedPostUpdate`, `FixedLast`, `FixedFlush`.
//!
//! Systems not tied to the engine's frame loop can still define and run their own phases - the
//! canonical set is a convention, not a restriction.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rusty_engine::define_phase;
//! use rusty_engine::ecs::schedule::Schedule;
//!
//! define_phase!(Update, Render);
//!
//! let mut schedule = Schedule::new();
//!
//! schedule.add_system(Update, movement_system, &mut world);
//! schedule.add_system(Update, physics_system, &mut world);
//! schedule.add_system(Render, draw_system, &mut world);
//!
//! loop {
//!     schedule.run(Update, &mut world);
//!     schedule.run(Render, &mut world);
//! }
//! ```
//!
//! For reusable ordering, use [`Sequence`]:
//!
//! ```rust,ignore
//! let frame = Sequence::new().then(Update).then(Render);
//!
//! loop {
//!     schedule.run_sequence(&frame, &mut world);
//! }
//! ```

mod phase;

use std::collections::HashMap;

pub use phase::{Id, Label, Phase, Sequence, SystemConfig};

use crate::ecs::{system, world};

define_phase!(
    FirstStartup,
    PreStartup,
    Startup,
    PostStartup,
    LastStartup,
    First,
    PreUpdate,
    Update,
    PostUpdate,
    Last,
    FixedFirst,
    FixedPreUpdate,
    FixedUpdate,
    FixedPostUpdate,
    FixedLast,
    FixedFlush,
);

impl Sequence {
    /// The canonical one-time startup group, in order.
    pub fn startup() -> Self {
        Sequence::new()
            .then(FirstStartup)
            .then(PreStartup)
            .then(Startup)
            .then(PostStartup)
            .then(LastStartup)
    }

    /// The canonical per-frame group, in order.
    pub fn frame() -> Self {
        Sequence::new()
            .then(First)
            .then(PreUpdate)
            .then(Update)
            .then(PostUpdate)
            .then(Last)
    }

    /// The canonical fixed-timestep group, in order. Run once per accumulated timestep.
    pub fn fixed() -> Self {
        Sequence::new()
            .then(FixedFirst)
            .then(FixedPreUpdate)
            .then(FixedUpdate)
            .then(FixedPostUpdate)
            .then(FixedLast)
            .then(FixedFlush)
    }
}

/// A container for organizing systems into labeled phases.
///
/// `Schedule` provides a simple way to group systems into named phases and execute
/// them in dependency order. Each phase is identified by a marker type implementing
/// [`phase::Label`].
///
/// # Design Philosophy
///
/// - **No implicit ordering between phases**: phases run when you call [`run`](Self::run)
///   or as part of a [`Sequence`] passed to [`run_sequence`](Self::run_sequence).
/// - **Ordering within a phase** comes from explicit dependencies, component access
///   conflicts, and declared order - see [`phase`] for details.
/// - **No hierarchy**: phases are flat, not nested.
///
/// # Thread Safety
///
/// `Schedule` is `!Send` and `!Sync`. All systems execute sequentially, on whichever thread
/// calls [`run`](Self::run) or [`run_sequence`](Self::run_sequence).
#[derive(Default)]
pub struct Schedule {
    phases: HashMap<Id, Phase>,
}

impl Schedule {
    /// Creates a new empty schedule.
    #[inline]
    pub fn new() -> Self {
        Self {
            phases: HashMap::new(),
        }
    }

    /// Adds a system to the specified phase with default configuration.
    ///
    /// If the phase doesn't exist, it will be created.
    pub fn add_system<L: Label, M>(
        &mut self,
        label: L,
        system: impl system::IntoSystem<M>,
        world: &mut world::World,
    ) {
        self.get_or_create_phase(label)
            .add_system(system.into_system(world));
    }

    /// Adds a system to the specified phase with an explicit [`SystemConfig`] (name,
    /// declared order, explicit dependencies, run criteria).
    pub fn add_system_with<L: Label, M>(
        &mut self,
        label: L,
        config: SystemConfig,
        system: impl system::IntoSystem<M>,
        world: &mut world::World,
    ) {
        self.get_or_create_phase(label)
            .add_system_with(config, system.into_system(world));
    }

    /// Runs all systems in the specified phase, in dependency order.
    ///
    /// Returns `true` if the phase existed and was executed, `false` if the phase
    /// was never created (no systems were ever added to it).
    pub fn run<L: Label>(&mut self, label: L, world: &mut world::World) -> bool {
        if let Some(phase) = self.phases.get_mut(&label.id()) {
            phase.run(world);
            true
        } else {
            false
        }
    }

    /// Returns `true` if the specified phase exists in the schedule.
    #[inline]
    pub fn has_phase<L: Label>(&self, label: L) -> bool {
        self.phases.contains_key(&label.id())
    }

    /// Returns a reference to the specified phase, if it exists.
    #[inline]
    pub fn get_phase<L: Label>(&self, label: L) -> Option<&Phase> {
        self.phases.get(&label.id())
    }

    /// Returns a mutable reference to the specified phase, creating it if it doesn't exist.
    fn get_or_create_phase<L: Label>(&mut self, label: L) -> &mut Phase {
        self.phases.entry(label.id()).or_default()
    }

    /// Returns the number of phases in the schedule.
    #[inline]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Runs a sequence of phases in order, on the calling thread. Phases not present in
    /// the schedule are skipped.
    ///
    /// Returns the number of phases that existed and were executed.
    pub fn run_sequence(&mut self, sequence: &Sequence, world: &mut world::World) -> usize {
        let mut count = 0;
        for id in sequence.phases() {
            if let Some(phase) = self.phases.get_mut(id) {
                phase.run(world);
                count += 1;
            }
        }
        count
    }
}
