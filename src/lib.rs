#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # slurmdbd-operator
//!
//! Command-line front end for the slurmdbd reconciler. Each invocation maps to
//! one unit event.

pub mod cli;
pub mod commands;

// Re-export the workspace crates for convenience
pub use slurmdbd_core;
pub use slurmdbd_events;
pub use slurmdbd_reconciler;
