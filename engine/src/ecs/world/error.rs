//! Fallible outcomes of `World` mutations that the caller, not the logger, should decide
//! how to handle.
//!
//! `NotAlive` is *not* represented here: per the propagation policy, operating on a dead
//! entity is absorbed at the call site (logged at `warn!`, the call returns a no-op
//! `Ok(false)`/`Ok(())`) rather than surfaced as an error.

use thiserror::Error;

/// Errors a `World` mutation can report to its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A component was added whose declared dependency is not present on the entity's
    /// resulting component set, and would not be added in the same batch.
    #[error("component '{adder}' declares a dependency on '{dependency}', which is not present")]
    DependencyUnmet {
        /// Name of the component that declared the dependency.
        adder: String,
        /// Name of the missing dependency.
        dependency: String,
    },
}
