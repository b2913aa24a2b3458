//! # Task abstractions.
//!
//! - [`Actor`] - zero-argument executable logic (blocking closure or future)
//! - [`Task`] - an actor plus the metadata the worker pool needs to route it

mod actor;
mod task;

pub use actor::Actor;
pub use task::Task;
