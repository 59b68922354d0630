//! # Runtime Module
//!
//! Process initialization, collaborator wiring, and the runner that turns a run's
//! outcome into an exit code.

pub mod exit;
pub mod initialization;
pub mod runner;

pub use exit::*;
pub use initialization::*;
pub use runner::*;
