//! MAC UE context
//!
//! Business state of one UE as seen by the MAC control plane. The context is
//! allocated by the control component when a creation request is accepted and
//! is only mutated by the procedures running on that UE's control loop.

use std::collections::BTreeSet;

use ranproc_common::{CellIndex, DuUeIndex, Lcid, Rnti};

/// Lifecycle phase of a MAC UE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacUePhase {
    /// Creation procedure not finished yet
    #[default]
    Creating,
    /// Configured in both UL and DL units
    Active,
    /// Creation failed or deletion requested; waiting to be erased
    Removing,
}

impl std::fmt::Display for MacUePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MacUePhase::Creating => write!(f, "Creating"),
            MacUePhase::Active => write!(f, "Active"),
            MacUePhase::Removing => write!(f, "Removing"),
        }
    }
}

/// MAC UE context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacUeContext {
    /// DU UE index
    pub ue_index: DuUeIndex,
    /// C-RNTI
    pub rnti: Rnti,
    /// Primary cell
    pub pcell_index: CellIndex,
    /// Current phase
    pub phase: MacUePhase,
    /// Configured logical channels
    pub logical_channels: BTreeSet<Lcid>,
}

impl MacUeContext {
    /// Creates a context in the `Creating` phase with SRB0 only.
    pub fn new(ue_index: DuUeIndex, rnti: Rnti, pcell_index: CellIndex) -> Self {
        Self {
            ue_index,
            rnti,
            pcell_index,
            phase: MacUePhase::Creating,
            logical_channels: BTreeSet::from([Lcid::SRB0]),
        }
    }

    /// Transitions to `Active` and records the configured channels.
    pub fn on_creation_complete(&mut self, logical_channels: &[Lcid]) {
        self.logical_channels.extend(logical_channels.iter().copied());
        self.phase = MacUePhase::Active;
    }

    /// Transitions to `Removing`.
    pub fn on_removal(&mut self) {
        self.phase = MacUePhase::Removing;
    }

    /// Applies an accepted logical channel change.
    pub fn apply_lcid_changes(&mut self, to_add: &[Lcid], to_remove: &[Lcid]) {
        self.logical_channels.extend(to_add.iter().copied());
        for lcid in to_remove {
            self.logical_channels.remove(lcid);
        }
    }

    /// Returns true if the UE is in the `Active` phase.
    pub fn is_active(&self) -> bool {
        self.phase == MacUePhase::Active
    }
}
