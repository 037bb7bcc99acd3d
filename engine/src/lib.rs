//! `rusty_engine`: an entity-component-system core over a TLSF-backed byte
//! pool, with service/runner scaffolding for embedding it in a host loop.

// Lets the `Component`/`Unique`/`Event` derive macros emit `::rusty_engine::...`
// paths that resolve both from downstream crates and from tests/doctests inside
// this crate itself.
extern crate self as rusty_engine;

pub mod alloc;
pub mod core;
pub mod ecs;
pub mod layout;

pub use core::{Control, Engine, Logic, Service, State, Time};
