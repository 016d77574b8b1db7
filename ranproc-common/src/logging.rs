//! Logging infrastructure for ranproc
//!
//! This module provides configurable logging using the `tracing` crate and a
//! small procedure logger so that every UE procedure reports its start,
//! intermediate steps, completion and failure with the same structured fields
//! (`ue_index`, `rnti`, `proc`).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::types::Rnti;

/// Verbosity used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Directive understood by `EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        if s == "warning" {
            return Ok(LogLevel::Warn);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

/// Initialize the tracing subscriber with the specified log level.
///
/// This should be called once at application startup. The log level can be
/// overridden by the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```no_run
/// use ranproc_common::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(level.as_str());
}

/// Initialize logging with a custom filter string.
///
/// # Example
///
/// ```no_run
/// use ranproc_common::logging::init_logging_with_filter;
///
/// // Default to info, but show every step of the MAC procedures
/// init_logging_with_filter("info,ranproc_mac=debug");
/// ```
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .init();
}

// ============================================================================
// Procedure logging
// ============================================================================

/// Logs a procedure that was refused before it could be scheduled.
///
/// `ue_index` is any UE index type (DU or CU-CP).
pub fn log_proc_failure(
    ue_index: impl Into<u32>,
    rnti: Option<Rnti>,
    proc_name: &str,
    cause: &dyn fmt::Display,
) {
    let ue_index: u32 = ue_index.into();
    match rnti {
        Some(rnti) => tracing::warn!(
            ue_index = %ue_index,
            rnti = %rnti,
            proc = proc_name,
            "Procedure failed. Cause: {}",
            cause
        ),
        None => tracing::warn!(
            ue_index = %ue_index,
            proc = proc_name,
            "Procedure failed. Cause: {}",
            cause
        ),
    }
}

/// Per-procedure logger carrying the UE identity.
///
/// Created once at the start of a procedure and used for every log line it
/// emits, so procedure logs can be filtered by `ue_index` or `proc`.
#[derive(Debug, Clone, Copy)]
pub struct ProcLogger {
    ue_index: u32,
    rnti: Option<Rnti>,
    proc_name: &'static str,
}

impl ProcLogger {
    /// Creates a logger for a procedure on a UE identified by index only.
    pub fn new(ue_index: impl Into<u32>, proc_name: &'static str) -> Self {
        Self {
            ue_index: ue_index.into(),
            rnti: None,
            proc_name,
        }
    }

    /// Creates a logger for a procedure on a UE with a known C-RNTI.
    pub fn with_rnti(ue_index: impl Into<u32>, rnti: Rnti, proc_name: &'static str) -> Self {
        Self {
            ue_index: ue_index.into(),
            rnti: Some(rnti),
            proc_name,
        }
    }

    /// Procedure name.
    pub fn proc_name(&self) -> &'static str {
        self.proc_name
    }

    /// Logs the procedure start.
    pub fn started(&self) {
        tracing::debug!(
            ue_index = %self.ue_index,
            rnti = ?self.rnti,
            proc = self.proc_name,
            "Procedure started..."
        );
    }

    /// Logs entry into a named step.
    pub fn step(&self, step: &dyn fmt::Display) {
        tracing::debug!(
            ue_index = %self.ue_index,
            proc = self.proc_name,
            step = %step,
            "Procedure step"
        );
    }

    /// Logs successful completion.
    pub fn completed(&self) {
        tracing::info!(
            ue_index = %self.ue_index,
            rnti = ?self.rnti,
            proc = self.proc_name,
            "Procedure finished successfully"
        );
    }

    /// Logs a failed completion.
    pub fn failed(&self, cause: &dyn fmt::Display) {
        tracing::warn!(
            ue_index = %self.ue_index,
            rnti = ?self.rnti,
            proc = self.proc_name,
            "Procedure failed. Cause: {}",
            cause
        );
    }
}
