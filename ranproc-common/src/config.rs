//! Configuration for the procedure engine and the loopback simulator.
//!
//! The engine itself needs very little: how many UEs it may hold and how many
//! cells exist. The `sim` section only drives the `nr-proc-sim` binary.
//!
//! ```
//! use ranproc_common::config::ProcConfig;
//!
//! let yaml = r#"
//! max_nof_ues: 32
//! nof_cells: 2
//! log_level: debug
//! "#;
//!
//! let config = ProcConfig::from_yaml(yaml).unwrap();
//! assert_eq!(config.max_nof_ues, 32);
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::logging::LogLevel;
use crate::types::{MAX_NOF_DU_CELLS, MAX_NOF_DU_UES, MAX_NOF_PDU_SESSIONS};

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// `max_nof_ues` is zero or above the compile-time bound
    #[error("Invalid max_nof_ues {value}: must be in 1..={max}")]
    InvalidMaxUes {
        /// Configured value
        value: usize,
        /// Compile-time bound
        max: usize,
    },

    /// `nof_cells` is zero or above the compile-time bound
    #[error("Invalid nof_cells {value}: must be in 1..={max}")]
    InvalidNofCells {
        /// Configured value
        value: usize,
        /// Compile-time bound
        max: usize,
    },

    /// Simulator section is inconsistent
    #[error("Invalid simulator configuration: {0}")]
    InvalidSim(String),
}

/// Which collaborator step the loopback simulator should reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimRejectStep {
    /// Every collaborator accepts
    #[default]
    None,
    /// MAC UL unit refuses UE creation
    MacUl,
    /// MAC DL unit refuses UE creation
    MacDl,
    /// CU-UP refuses the bearer context setup
    BearerContextSetup,
    /// DU refuses the UE context modification
    UeContextModification,
    /// CU-UP refuses the bearer context modification
    BearerContextModification,
    /// UE does not complete the RRC reconfiguration
    RrcReconfiguration,
}

impl fmt::Display for SimRejectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimRejectStep::None => "none",
            SimRejectStep::MacUl => "mac-ul",
            SimRejectStep::MacDl => "mac-dl",
            SimRejectStep::BearerContextSetup => "bearer-context-setup",
            SimRejectStep::UeContextModification => "ue-context-modification",
            SimRejectStep::BearerContextModification => "bearer-context-modification",
            SimRejectStep::RrcReconfiguration => "rrc-reconfiguration",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SimRejectStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(SimRejectStep::None),
            "mac-ul" => Ok(SimRejectStep::MacUl),
            "mac-dl" => Ok(SimRejectStep::MacDl),
            "bearer-context-setup" => Ok(SimRejectStep::BearerContextSetup),
            "ue-context-modification" => Ok(SimRejectStep::UeContextModification),
            "bearer-context-modification" => Ok(SimRejectStep::BearerContextModification),
            "rrc-reconfiguration" => Ok(SimRejectStep::RrcReconfiguration),
            _ => Err(format!("unknown reject step: {s}")),
        }
    }
}

/// Loopback simulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of UEs to create
    #[serde(default = "default_nof_ues")]
    pub nof_ues: usize,
    /// PDU sessions requested per UE
    #[serde(default = "default_sessions_per_ue")]
    pub sessions_per_ue: usize,
    /// Collaborator step that answers with a rejection
    #[serde(default)]
    pub reject_step: SimRejectStep,
    /// Artificial collaborator latency in milliseconds
    #[serde(default)]
    pub collaborator_latency_ms: u64,
}

fn default_nof_ues() -> usize {
    4
}

fn default_sessions_per_ue() -> usize {
    2
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nof_ues: default_nof_ues(),
            sessions_per_ue: default_sessions_per_ue(),
            reject_step: SimRejectStep::None,
            collaborator_latency_ms: 0,
        }
    }
}

/// Procedure engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcConfig {
    /// Maximum number of concurrently live UEs (sizes the RNTI table)
    #[serde(default = "default_max_nof_ues")]
    pub max_nof_ues: usize,
    /// Number of cells served
    #[serde(default = "default_nof_cells")]
    pub nof_cells: usize,
    /// Default log level (overridden by `RUST_LOG`)
    #[serde(default)]
    pub log_level: LogLevel,
    /// Loopback simulator settings
    #[serde(default)]
    pub sim: SimConfig,
}

fn default_max_nof_ues() -> usize {
    MAX_NOF_DU_UES
}

fn default_nof_cells() -> usize {
    1
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            max_nof_ues: default_max_nof_ues(),
            nof_cells: default_nof_cells(),
            log_level: LogLevel::default(),
            sim: SimConfig::default(),
        }
    }
}

impl ProcConfig {
    /// Parses a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Serializes the configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validates the configuration.
    ///
    /// # Validation Rules
    ///
    /// - `max_nof_ues` must be in `1..=MAX_NOF_DU_UES`
    /// - `nof_cells` must be in `1..=MAX_NOF_DU_CELLS`
    /// - `sim.sessions_per_ue` must be in `1..=MAX_NOF_PDU_SESSIONS`
    /// - `sim.nof_ues` must not exceed `max_nof_ues`
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_nof_ues == 0 || self.max_nof_ues > MAX_NOF_DU_UES {
            return Err(ConfigValidationError::InvalidMaxUes {
                value: self.max_nof_ues,
                max: MAX_NOF_DU_UES,
            });
        }
        if self.nof_cells == 0 || self.nof_cells > MAX_NOF_DU_CELLS {
            return Err(ConfigValidationError::InvalidNofCells {
                value: self.nof_cells,
                max: MAX_NOF_DU_CELLS,
            });
        }
        if self.sim.sessions_per_ue == 0 || self.sim.sessions_per_ue > MAX_NOF_PDU_SESSIONS {
            return Err(ConfigValidationError::InvalidSim(format!(
                "sessions_per_ue {} must be in 1..={}",
                self.sim.sessions_per_ue, MAX_NOF_PDU_SESSIONS
            )));
        }
        if self.sim.nof_ues > self.max_nof_ues {
            return Err(ConfigValidationError::InvalidSim(format!(
                "nof_ues {} exceeds max_nof_ues {}",
                self.sim.nof_ues, self.max_nof_ues
            )));
        }
        Ok(())
    }
}

/// Loads a configuration file and validates it.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<ProcConfig, Error> {
    let config = ProcConfig::from_yaml_file(path)?;
    config.validate()?;
    Ok(config)
}
