//! Routine manager
//!
//! Builds CU-CP routines wired to their collaborators and hands them out as
//! [`AsyncTask`]s. Requests that need no collaborator complete immediately.

use std::collections::BTreeMap;
use std::sync::Arc;

use ranproc_common::{DrbId, PduSessionId};
use ranproc_tasks::AsyncTask;

use crate::notifiers::{
    BearerContextReleaseCommand, E1apBearerContextManager, F1apUeContextManager,
    RrcUeReconfigurationNotifier,
};
use crate::routines::pdu_session_resource_setup::spawn_bearer_context_release;
use crate::routines::{PduSessionResourceSetupRoutine, RoutineCollaborators};
use crate::types::{PduSessionResourceSetupRequest, PduSessionResourceSetupResponse};

/// Starts CU-CP routines.
#[derive(Clone)]
pub struct RoutineManager {
    collaborators: RoutineCollaborators,
}

impl RoutineManager {
    /// Creates a routine manager.
    pub fn new(
        e1ap: Arc<dyn E1apBearerContextManager>,
        f1ap: Arc<dyn F1apUeContextManager>,
        rrc: Arc<dyn RrcUeReconfigurationNotifier>,
    ) -> Self {
        Self {
            collaborators: RoutineCollaborators { e1ap, f1ap, rrc },
        }
    }

    /// Starts a PDU session resource setup.
    ///
    /// `established` are the sessions the UE already has. If validation leaves
    /// nothing to set up (including an empty request) the returned task is
    /// ready immediately and no collaborator is contacted.
    pub fn start_pdu_session_resource_setup_routine(
        &self,
        request: PduSessionResourceSetupRequest,
        established: &BTreeMap<PduSessionId, DrbId>,
    ) -> AsyncTask<PduSessionResourceSetupResponse> {
        let mut routine = PduSessionResourceSetupRoutine::new(
            request,
            established.clone(),
            self.collaborators.clone(),
        );
        if routine.validate() {
            return AsyncTask::ready(routine.finalize());
        }
        AsyncTask::new(routine.execute())
    }

    /// Releases a CU-UP bearer context in the background.
    pub fn release_bearer_context(&self, command: BearerContextReleaseCommand) {
        spawn_bearer_context_release(self.collaborators.e1ap.clone(), command);
    }
}
