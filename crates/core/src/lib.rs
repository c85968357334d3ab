//! Core types shared by the slurmdbd reconciler crates.
//!
//! - [`Error`] / [`Result`]: the error type for configuration and file I/O.
//! - [`OperatorConfig`]: operator-supplied settings loaded from TOML.

pub mod config;
pub mod error;

pub use config::{Options, OperatorConfig, ServiceConfig};
pub use error::{Error, Result};
