use super::engine::Engine;

/// A long-lived piece of host functionality (networking, audio, asset loading, ...) that
/// starts and stops alongside the [`Engine`].
///
/// Services are added via [`Engine::add`] before [`Engine::start`] is called. They receive
/// `&mut Engine` on start/stop so they can reach the world, schedule, or control handle.
pub trait Service: Send + Sync {
    /// A human-readable name, used in startup/shutdown logging.
    fn name(&self) -> String;

    /// Called once, in registration order, before the engine enters its update loop.
    fn start(&mut self, engine: &mut Engine) -> Result<(), &str>;

    /// Called once, in registration order, after the engine's update loop returns.
    fn stop(&mut self, engine: &mut Engine) -> Result<(), &str>;
}
