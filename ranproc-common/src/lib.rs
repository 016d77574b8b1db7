//! Common types and utilities for ranproc
//!
//! This crate provides the identifiers, configuration structures, error type
//! and logging helpers shared by the control-plane procedure crates
//! (`ranproc-tasks`, `ranproc-mac`, `ranproc-cucp`) and the simulator.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    load_and_validate_config, ConfigValidationError, ProcConfig, SimConfig, SimRejectStep,
};
pub use error::Error;
pub use logging::{init_logging, init_logging_with_filter, log_proc_failure, LogLevel, ProcLogger};
pub use types::*;
