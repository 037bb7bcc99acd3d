//! A cheaply cloneable handle for starting, pausing, and stopping a running [`Engine`](super::Engine)
//! from outside its own update loop (a CLI, a signal handler, another thread).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::state::State;

/// A shared handle over an engine's running/paused flags.
///
/// `Control` is `Clone`; every clone refers to the same underlying flags, so a handle
/// obtained from `Engine::control()` can be handed to another thread (a CLI input loop,
/// a signal handler) and will affect the engine that produced it.
#[derive(Clone)]
pub struct Control {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl Control {
    /// Construct a new handle, initially stopped and unpaused.
    pub(crate) fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the engine as running. Has no effect on pause state.
    pub fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Pause simulation. The engine keeps running but stops advancing frames.
    pub fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume simulation after a [`pause`](Self::pause).
    pub fn unpause(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Request a stop. The next `Engine::update()` call will return `false`.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns `true` if the engine has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns `true` if simulation is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Derive the coarse [`State`] implied by the current flags.
    pub fn state(&self) -> State {
        if !self.is_running() {
            State::Stopped
        } else {
            State::Running
        }
    }
}
