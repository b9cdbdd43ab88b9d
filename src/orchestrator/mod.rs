//! Operation dispatch between callers and the execution engine.
//!
//! This module owns the five request/response operations (run, preview, schedule, list and
//! cancel) plus the scheduler daemon's lifecycle. Caller layers call into it rather than
//! talking to the engine directly.

mod dispatcher;
mod scheduler;

pub use dispatcher::{Dispatcher, Operation};
