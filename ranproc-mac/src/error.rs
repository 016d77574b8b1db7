//! MAC control errors.

use ranproc_common::{CellIndex, DuUeIndex, Rnti};
use ranproc_tasks::ScheduleError;
use thiserror::Error;

/// Reasons a MAC UE request is refused before any lower-layer unit is contacted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacCtrlError {
    /// A live UE already has this C-RNTI
    #[error("C-RNTI {0} is already in use")]
    DuplicateRnti(Rnti),

    /// Another live C-RNTI occupies the same C-RNTI table slot
    #[error("C-RNTI {rnti} collides with C-RNTI {holder} in the C-RNTI table")]
    RntiSlotOccupied {
        /// Requested C-RNTI
        rnti: Rnti,
        /// C-RNTI of the UE holding the slot
        holder: Rnti,
    },

    /// A live UE already has this index
    #[error("UE index {0} is already in use")]
    DuplicateUeIndex(DuUeIndex),

    /// No live UE with this index
    #[error("Inexistent UE index {0}")]
    UnknownUe(DuUeIndex),

    /// UE index is outside the configured table size
    #[error("UE index {ue_index} out of range (max {max})")]
    UeIndexOutOfRange {
        /// Requested index
        ue_index: DuUeIndex,
        /// Configured maximum number of UEs
        max: usize,
    },

    /// Cell index is outside the configured number of cells
    #[error("Cell index {cell_index} out of range ({nof_cells} cells)")]
    CellIndexOutOfRange {
        /// Requested cell
        cell_index: CellIndex,
        /// Configured number of cells
        nof_cells: usize,
    },

    /// The reserved invalid RNTI was supplied
    #[error("Invalid C-RNTI")]
    InvalidRnti,

    /// A deletion is already in progress for this UE
    #[error("UE index {0} is being removed")]
    RemovalPending(DuUeIndex),

    /// The UE control loop refused the procedure
    #[error("UE control loop unavailable: {0}")]
    LoopUnavailable(#[from] ScheduleError),
}
