use std::time::{Duration, Instant};

use log::info;

use super::context::Context;
use super::control::Control;
use super::logic::Logic;
use super::runner::{no_op, RunResult, Runner};
use super::service::Service;
use super::state::State;
use super::time::Time;
use crate::ecs::{schedule, world};

/// The engine's core structure: owns the ECS [`world::World`] and [`schedule::Schedule`],
/// drives them through a fixed-timestep [`Time`], and delegates startup/shutdown and the
/// per-frame loop to host-supplied [`Logic`], [`Service`]s, and a [`Runner`].
pub struct Engine {
    state: State,
    services: Vec<Box<dyn Service>>,
    logic: Box<dyn Logic>,
    runner: Runner,
    world: world::World,
    schedule: schedule::Schedule,
    time: Time,
    control: Control,
    initialized: bool,
}

impl Engine {
    /// Construct a new engine. `runner` drives the update loop (see [`super::runner::once`]
    /// and [`super::runner::looped`]); `logic` receives per-frame and fixed-update callbacks.
    pub fn new(runner: Runner, logic: Box<dyn Logic>) -> Self {
        Self {
            state: State::Dead,
            services: Vec::new(),
            logic,
            runner,
            world: world::World::new(world::Id::new(0)),
            schedule: schedule::Schedule::new(),
            time: Time::default(),
            control: Control::new(),
            initialized: false,
        }
    }

    /// Register a service. Services start (in registration order) when [`start`](Self::start)
    /// is called, and stop (also in registration order) after the runner returns.
    pub fn add(&mut self, service: Box<dyn Service>) -> &mut Engine {
        self.services.push(service);
        self
    }

    /// Borrow the ECS world.
    pub fn world(&self) -> &world::World {
        &self.world
    }

    /// Mutably borrow the ECS world.
    pub fn world_mut(&mut self) -> &mut world::World {
        &mut self.world
    }

    /// Borrow the system schedule.
    pub fn schedule(&self) -> &schedule::Schedule {
        &self.schedule
    }

    /// Mutably borrow the system schedule.
    pub fn schedule_mut(&mut self) -> &mut schedule::Schedule {
        &mut self.schedule
    }

    /// Get a cloneable handle for starting, pausing, and stopping this engine from
    /// elsewhere (a CLI thread, a signal handler).
    pub fn control(&self) -> Control {
        self.control.clone()
    }

    /// Current coarse engine state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Start all registered services, run the startup phase group once, then hand control
    /// to the runner until it returns, then stop all services.
    pub fn start(&mut self) -> Result<(), &str> {
        info!("starting engine");
        self.state = State::Starting;

        // Services need `&mut Engine`, which would alias `self.services` - swap it out for
        // the duration of the loop rather than holding two mutable borrows of `self`.
        let mut services = std::mem::take(&mut self.services);
        for service in services.iter_mut() {
            info!("starting service: {}", service.name());
            service.start(self)?;
        }
        self.services = services;

        self.control.start();
        self.state = State::Running;
        self.initialize();

        let runner = std::mem::replace(&mut self.runner, Box::new(no_op));
        let result = runner(self);

        self.stop()?;

        match result {
            RunResult::Success => Ok(()),
            RunResult::Failure => Err("engine runner reported failure"),
        }
    }

    /// Stop all registered services, in registration order.
    pub fn stop(&mut self) -> Result<(), &str> {
        self.state = State::Stopping;
        self.control.stop();

        let mut services = std::mem::take(&mut self.services);
        for service in services.iter_mut() {
            info!("stopping service: {}", service.name());
            service.stop(self)?;
        }
        self.services = services;

        self.state = State::Stopped;
        info!("engine stopped");
        Ok(())
    }

    /// Run the startup phase group once, then call [`Logic::on_init`]. Idempotent - a second
    /// call is a no-op.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.schedule
            .run_sequence(&schedule::Sequence::startup(), &mut self.world);
        self.logic.on_init();
        self.initialized = true;
    }

    /// Advance one frame: the per-frame phase group runs once, then the fixed-timestep group
    /// runs once per accumulated timestep (zero or more times). If the iteration finishes with
    /// more than `Time::yield_threshold_ms` of slack before `Time::target_frame_time_ms`, the
    /// thread sleeps off the remainder rather than immediately starting the next iteration.
    ///
    /// Returns `true` if the engine should keep running, `false` once [`Control::stop`] has
    /// been called (by this engine's own logic, a service, or a cloned [`Control`] handle).
    pub fn update(&mut self) -> bool {
        if !self.control.is_running() {
            return false;
        }
        if self.control.is_paused() {
            return true;
        }

        let iteration_start = Instant::now();

        self.time = self.time.next();
        self.logic.on_update(Context::new(self.time));
        self.schedule
            .run_sequence(&schedule::Sequence::frame(), &mut self.world);

        while self.time.has_fixed() {
            self.time.increment_fixed();
            self.logic.on_fixed_update(Context::new(self.time));
            self.schedule
                .run_sequence(&schedule::Sequence::fixed(), &mut self.world);
        }

        self.yield_remaining_budget(iteration_start);

        self.control.is_running()
    }

    /// Sleep off whatever's left of `target_frame_time_ms` once it exceeds `yield_threshold_ms`,
    /// handing the remainder of the frame budget back to the host.
    fn yield_remaining_budget(&self, iteration_start: Instant) {
        let target = Duration::from_millis(self.time.target_frame_time_ms);
        let threshold = Duration::from_millis(self.time.yield_threshold_ms);
        let elapsed = iteration_start.elapsed();
        if let Some(remaining) = target.checked_sub(elapsed)
            && remaining > threshold
        {
            std::thread::sleep(remaining);
        }
    }
}
