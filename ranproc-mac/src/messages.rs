//! Requests handled by the MAC control component and their responses.

use ranproc_common::{CellIndex, DuUeIndex, Lcid, Rnti};

use crate::error::MacCtrlError;

/// Completion verdict of a MAC UE request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacUeOutcome {
    /// Applied by both UL and DL units
    Success,
    /// Refused before any lower-layer unit was contacted
    Rejected(MacCtrlError),
    /// A lower-layer unit rejected its step
    Failed {
        /// True when partial lower-layer changes were undone
        rolled_back: bool,
    },
}

impl MacUeOutcome {
    /// Returns true for [`MacUeOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, MacUeOutcome::Success)
    }
}

/// UE creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeCreateRequest {
    /// DU UE index to allocate
    pub ue_index: DuUeIndex,
    /// C-RNTI assigned to the UE
    pub crnti: Rnti,
    /// Primary cell
    pub cell_index: CellIndex,
    /// Logical channels to configure (SRB0 is implicit)
    pub logical_channels: Vec<Lcid>,
}

impl MacUeCreateRequest {
    /// Creates a request configuring SRB1 only.
    pub fn new(ue_index: DuUeIndex, crnti: Rnti, cell_index: CellIndex) -> Self {
        Self {
            ue_index,
            crnti,
            cell_index,
            logical_channels: vec![Lcid::SRB1],
        }
    }
}

/// UE creation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeCreateResponse {
    /// DU UE index
    pub ue_index: DuUeIndex,
    /// Primary cell
    pub cell_index: CellIndex,
    /// Verdict
    pub outcome: MacUeOutcome,
}

/// UE deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeDeleteRequest {
    /// DU UE index
    pub ue_index: DuUeIndex,
    /// C-RNTI of the UE
    pub rnti: Rnti,
}

/// UE deletion response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeDeleteResponse {
    /// DU UE index
    pub ue_index: DuUeIndex,
    /// Verdict
    pub outcome: MacUeOutcome,
}

/// UE reconfiguration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeReconfigurationRequest {
    /// DU UE index
    pub ue_index: DuUeIndex,
    /// C-RNTI of the UE
    pub crnti: Rnti,
    /// Logical channels to add
    pub lcids_to_add: Vec<Lcid>,
    /// Logical channels to remove
    pub lcids_to_remove: Vec<Lcid>,
}

impl MacUeReconfigurationRequest {
    /// Request that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            ue_index: self.ue_index,
            crnti: self.crnti,
            lcids_to_add: self.lcids_to_remove.clone(),
            lcids_to_remove: self.lcids_to_add.clone(),
        }
    }
}

/// UE reconfiguration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeReconfigurationResponse {
    /// DU UE index
    pub ue_index: DuUeIndex,
    /// Verdict
    pub outcome: MacUeOutcome,
}
