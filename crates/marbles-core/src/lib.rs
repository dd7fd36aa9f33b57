//! Marbles Core Library
//!
//! Execution engine for ASCII-drawn marble programs: marbles travel across a
//! character grid, change behavior based on the symbols they land on, and
//! carry a value and a stack with them.
//!
//! The engine only drives the protocol between a [`Marble`] and its current
//! [`State`]. What each operator symbol does is defined by the states
//! registered in [`Operators`].

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod environment;
pub mod error;
pub mod marble;
pub mod notify;
pub mod operators;
pub mod scheduler;
pub mod state;
pub mod symbols;
pub mod vector;
pub mod world;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::SimulationConfig;
pub use environment::Environment;
pub use error::EngineError;
pub use marble::{Body, Marble, MarbleId, MarbleOptions, MarbleSnapshot, TickOutcome};
pub use notify::{EventLog, Notification, Notifier, NullNotifier, TracingNotifier};
pub use operators::{Mirror, OperatorFactory, Operators, Redirect};
pub use scheduler::{RunEnd, RunReport, Scheduler, SchedulerStatus};
pub use state::{Dead, State, Traveling};
pub use vector::{Direction, Pos};
pub use world::{Grid, World};
