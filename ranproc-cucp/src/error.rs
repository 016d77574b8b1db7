//! CU-CP UE manager errors.

use ranproc_common::CuCpUeIndex;
use ranproc_tasks::ScheduleError;
use thiserror::Error;

/// Reasons a CU-CP UE operation is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CuCpError {
    /// No UE with this index
    #[error("Unknown CU-CP UE {0}")]
    UnknownUe(CuCpUeIndex),

    /// A UE with this index already exists
    #[error("CU-CP UE {0} already exists")]
    DuplicateUe(CuCpUeIndex),

    /// Index beyond the configured number of UEs
    #[error("CU-CP UE index {ue_index} out of range (max {max})")]
    UeIndexOutOfRange {
        /// Requested index
        ue_index: CuCpUeIndex,
        /// Configured maximum number of UEs
        max: usize,
    },

    /// Removal of this UE is already in progress
    #[error("CU-CP UE {0} is being removed")]
    RemovalPending(CuCpUeIndex),

    /// The UE control loop refused the routine
    #[error("UE control loop unavailable: {0}")]
    LoopUnavailable(#[from] ScheduleError),
}
