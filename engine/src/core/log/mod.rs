//! Logging support built on the `log` facade.
//!
//! [`ChannelLogger`] implements [`log::Log`] and forwards every record over a
//! `crossbeam::channel`, so a host application (a CLI, a TUI, a test harness) can drain and
//! display log output without the engine depending on how it's rendered.

mod channel;

pub use channel::{ChannelLogger, LogMessage};
