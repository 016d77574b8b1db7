//! CU-CP UE context

use std::collections::BTreeMap;

use ranproc_common::{CuCpUeIndex, DrbId, PduSessionId};

use crate::notifiers::BearerContextId;
use crate::types::PduSessionSetupResponseItem;

/// CU-CP UE context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuCpUeContext {
    /// CU-CP UE index
    pub ue_index: CuCpUeIndex,
    /// Established PDU sessions and their DRBs
    pub pdu_sessions: BTreeMap<PduSessionId, DrbId>,
    /// CU-UP bearer contexts to release with the UE
    pub bearer_contexts: Vec<BearerContextId>,
    /// Set when removal was requested
    pub releasing: bool,
}

impl CuCpUeContext {
    /// Creates a context without sessions.
    pub fn new(ue_index: CuCpUeIndex) -> Self {
        Self {
            ue_index,
            pdu_sessions: BTreeMap::new(),
            bearer_contexts: Vec::new(),
            releasing: false,
        }
    }

    /// Records sessions that were set up.
    pub fn on_pdu_sessions_setup(&mut self, items: &[PduSessionSetupResponseItem]) {
        for item in items {
            self.pdu_sessions.insert(item.pdu_session_id, item.drb_id);
        }
    }

    /// Records a bearer context left reserved by a setup.
    pub fn on_bearer_context_retained(&mut self, bearer_context_id: BearerContextId) {
        if !self.bearer_contexts.contains(&bearer_context_id) {
            self.bearer_contexts.push(bearer_context_id);
        }
    }

    /// Returns the number of established PDU sessions.
    pub fn pdu_session_count(&self) -> usize {
        self.pdu_sessions.len()
    }
}
