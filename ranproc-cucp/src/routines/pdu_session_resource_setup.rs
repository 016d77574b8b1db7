//! PDU Session Resource Setup routine.
//!
//! Threads one setup request through the CU-UP, the DU and the UE:
//!
//! 1. **Validate**: per-item checks and DRB allocation (no collaborator)
//! 2. **Bearer Context Setup** (E1AP): reserve CU-UP resources
//! 3. **UE Context Modification** (F1AP): set up the DRBs in the DU; on
//!    rejection, or when the DU sets up a different DRB set, the reservation
//!    is released in the background
//! 4. **Bearer Context Modification** (E1AP): commit the reservation
//! 5. **RRC Reconfiguration**: configure the UE
//! 6. **Finalize**: partition items into set up and failed
//!
//! Steps 2 to 5 share one transaction for every admitted item, so a rejection
//! at any of them fails all admitted items. The routine never retries.
//!
//! A reservation that survives step 3 is handed back in the response and
//! stays with the UE until the UE is removed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use ranproc_common::{DrbId, PduSessionId, ProcLogger, MAX_NOF_DRBS};
use tracing::{debug, warn};

use crate::notifiers::{
    BearerContextId, BearerContextModificationRequest, BearerContextReleaseCommand,
    BearerContextSetupRequest, DrbSetupItem, E1apBearerContextManager, F1apUeContextManager,
    RrcReconfigurationRequest, RrcUeReconfigurationNotifier, UeContextModificationRequest,
};
use crate::types::{
    PduSessionFailedItem, PduSessionResourceSetupRequest, PduSessionResourceSetupResponse,
    PduSessionSetupResponseItem, SetupCompletion, SetupFailureCause, SetupStep,
};

/// Collaborators contacted by the routine.
#[derive(Clone)]
pub struct RoutineCollaborators {
    /// CU-UP bearer context procedures
    pub e1ap: Arc<dyn E1apBearerContextManager>,
    /// DU UE context procedures
    pub f1ap: Arc<dyn F1apUeContextManager>,
    /// RRC reconfiguration towards the UE
    pub rrc: Arc<dyn RrcUeReconfigurationNotifier>,
}

/// State of one PDU session resource setup.
pub struct PduSessionResourceSetupRoutine {
    request: PduSessionResourceSetupRequest,
    established: BTreeMap<PduSessionId, DrbId>,
    collaborators: RoutineCollaborators,
    logger: ProcLogger,

    step: SetupStep,
    admitted: Vec<DrbSetupItem>,
    failed_items: Vec<PduSessionFailedItem>,
    bearer_context_id: Option<BearerContextId>,
    completion: SetupCompletion,
}

impl PduSessionResourceSetupRoutine {
    /// Procedure name used in logs.
    pub const NAME: &'static str = "PDU Session Resource Setup";

    /// Creates the routine. `established` are the sessions the UE already has.
    pub fn new(
        request: PduSessionResourceSetupRequest,
        established: BTreeMap<PduSessionId, DrbId>,
        collaborators: RoutineCollaborators,
    ) -> Self {
        let logger = ProcLogger::new(request.ue_index, Self::NAME);
        Self {
            request,
            established,
            collaborators,
            logger,
            step: SetupStep::Validate,
            admitted: Vec::new(),
            failed_items: Vec::new(),
            bearer_context_id: None,
            completion: SetupCompletion::NotStarted,
        }
    }

    /// Current step.
    pub fn step(&self) -> SetupStep {
        self.step
    }

    /// Runs the validation step if it has not run yet.
    ///
    /// Returns true when no collaborator needs to be contacted, in which case
    /// [`finalize`](Self::finalize) can be called directly.
    pub fn validate(&mut self) -> bool {
        if self.step == SetupStep::Validate {
            self.logger.started();
            self.step = self.validate_items();
        }
        self.step == SetupStep::Finalize
    }

    /// Runs the remaining steps and returns the response.
    pub async fn execute(mut self) -> PduSessionResourceSetupResponse {
        loop {
            if !matches!(self.step, SetupStep::Validate | SetupStep::Finalize) {
                self.logger.step(&self.step);
            }
            self.step = match self.step {
                SetupStep::Validate => {
                    self.validate();
                    continue;
                }
                SetupStep::BearerContextSetup => self.bearer_context_setup().await,
                SetupStep::UeContextModification => self.ue_context_modification().await,
                SetupStep::BearerContextModification => self.bearer_context_modification().await,
                SetupStep::RrcReconfiguration => self.rrc_reconfiguration().await,
                SetupStep::Finalize => return self.finalize(),
            };
        }
    }

    /// Builds the response from the items admitted and failed so far.
    pub fn finalize(self) -> PduSessionResourceSetupResponse {
        let completion = match self.completion {
            SetupCompletion::NotStarted if !self.admitted.is_empty() => SetupCompletion::Applied,
            other => other,
        };

        match completion {
            SetupCompletion::Applied => self.logger.completed(),
            SetupCompletion::Failed { step, .. } => {
                self.logger.failed(&format_args!("{step} rejected"))
            }
            SetupCompletion::NotStarted if self.failed_items.is_empty() => {
                debug!(ue_index = %self.request.ue_index, "Empty PDU session setup request")
            }
            SetupCompletion::NotStarted => self.logger.failed(&"no PDU session admitted"),
        }

        PduSessionResourceSetupResponse {
            ue_index: self.request.ue_index,
            setup_items: self
                .admitted
                .iter()
                .map(|drb| PduSessionSetupResponseItem {
                    pdu_session_id: drb.pdu_session_id,
                    drb_id: drb.drb_id,
                })
                .collect(),
            failed_items: self.failed_items,
            completion,
            bearer_context: self.bearer_context_id,
        }
    }

    // ========================================================================
    // Steps
    // ========================================================================

    fn validate_items(&mut self) -> SetupStep {
        let mut instances: HashMap<PduSessionId, usize> = HashMap::new();
        for item in &self.request.items {
            *instances.entry(item.pdu_session_id).or_default() += 1;
        }

        let mut used_drbs: BTreeSet<DrbId> = self.established.values().copied().collect();
        let mut admitted = Vec::new();
        let mut failed = Vec::new();

        for item in &self.request.items {
            let id = item.pdu_session_id;
            let cause = if instances.get(&id).copied().unwrap_or(0) > 1 {
                Some(SetupFailureCause::MultiplePduSessionIdInstances)
            } else if self.established.contains_key(&id) {
                Some(SetupFailureCause::PduSessionIdAlreadyInUse)
            } else {
                match allocate_drb(&used_drbs) {
                    Some(drb_id) => {
                        used_drbs.insert(drb_id);
                        admitted.push(DrbSetupItem {
                            drb_id,
                            pdu_session_id: id,
                            s_nssai: item.s_nssai,
                            qos_flows: item.qos_flows.clone(),
                        });
                        None
                    }
                    None => Some(SetupFailureCause::NoDrbAvailable),
                }
            };
            if let Some(cause) = cause {
                debug!(ue_index = %self.request.ue_index, psi = %id, "PDU session not admitted: {}", cause);
                failed.push(PduSessionFailedItem {
                    pdu_session_id: id,
                    cause,
                });
            }
        }

        self.admitted = admitted;
        self.failed_items = failed;
        if self.admitted.is_empty() {
            SetupStep::Finalize
        } else {
            SetupStep::BearerContextSetup
        }
    }

    async fn bearer_context_setup(&mut self) -> SetupStep {
        let request = BearerContextSetupRequest {
            ue_index: self.request.ue_index,
            drbs: self.admitted.clone(),
            ue_aggregate_maximum_bit_rate_dl: self.request.ue_aggregate_maximum_bit_rate_dl,
        };
        let response = self.collaborators.e1ap.bearer_context_setup(&request).await;
        if !response.success {
            return self.fail(
                SetupStep::BearerContextSetup,
                SetupFailureCause::ReservationRejected,
                false,
            );
        }
        self.bearer_context_id = Some(response.bearer_context_id);
        SetupStep::UeContextModification
    }

    async fn ue_context_modification(&mut self) -> SetupStep {
        let request = UeContextModificationRequest {
            ue_index: self.request.ue_index,
            drbs_to_setup: self.admitted_drbs(),
        };
        let response = self.collaborators.f1ap.ue_context_modification(&request).await;
        let requested: BTreeSet<DrbId> = request.drbs_to_setup.iter().copied().collect();
        let setup: BTreeSet<DrbId> = response.drbs_setup.iter().copied().collect();
        if response.success && setup != requested {
            warn!(
                ue_index = %self.request.ue_index,
                requested = ?requested,
                setup = ?setup,
                "DU set up a different DRB set"
            );
        }
        if !response.success || setup != requested {
            let rolled_back = self.release_reservation();
            return self.fail(
                SetupStep::UeContextModification,
                SetupFailureCause::PeerModificationRejected,
                rolled_back,
            );
        }
        SetupStep::BearerContextModification
    }

    async fn bearer_context_modification(&mut self) -> SetupStep {
        let Some(bearer_context_id) = self.bearer_context_id else {
            warn!(ue_index = %self.request.ue_index, "No bearer context to modify");
            return self.fail(
                SetupStep::BearerContextModification,
                SetupFailureCause::CommitRejected,
                false,
            );
        };
        let request = BearerContextModificationRequest {
            ue_index: self.request.ue_index,
            bearer_context_id,
            drbs: self.admitted_drbs(),
        };
        let response = self
            .collaborators
            .e1ap
            .bearer_context_modification(&request)
            .await;
        if !response.success {
            return self.fail(
                SetupStep::BearerContextModification,
                SetupFailureCause::CommitRejected,
                false,
            );
        }
        SetupStep::RrcReconfiguration
    }

    async fn rrc_reconfiguration(&mut self) -> SetupStep {
        let request = RrcReconfigurationRequest {
            ue_index: self.request.ue_index,
            drbs_to_add: self.admitted.clone(),
        };
        if !self.collaborators.rrc.rrc_reconfiguration(&request).await {
            return self.fail(
                SetupStep::RrcReconfiguration,
                SetupFailureCause::RadioReconfigurationRejected,
                false,
            );
        }
        SetupStep::Finalize
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn admitted_drbs(&self) -> Vec<DrbId> {
        self.admitted.iter().map(|drb| drb.drb_id).collect()
    }

    /// Marks every admitted item failed and jumps to `Finalize`.
    fn fail(&mut self, step: SetupStep, cause: SetupFailureCause, rolled_back: bool) -> SetupStep {
        self.failed_items
            .extend(self.admitted.drain(..).map(|drb| PduSessionFailedItem {
                pdu_session_id: drb.pdu_session_id,
                cause,
            }));
        self.completion = SetupCompletion::Failed { step, rolled_back };
        SetupStep::Finalize
    }

    /// Releases the reservation in the background. Returns true if one existed.
    fn release_reservation(&mut self) -> bool {
        let Some(bearer_context_id) = self.bearer_context_id.take() else {
            return false;
        };
        spawn_bearer_context_release(
            self.collaborators.e1ap.clone(),
            BearerContextReleaseCommand {
                ue_index: self.request.ue_index,
                bearer_context_id,
            },
        );
        true
    }
}

/// Sends a Bearer Context Release Command without waiting for the outcome,
/// which is only logged.
pub(crate) fn spawn_bearer_context_release(
    e1ap: Arc<dyn E1apBearerContextManager>,
    command: BearerContextReleaseCommand,
) {
    tokio::spawn(async move {
        if e1ap.bearer_context_release(&command).await {
            debug!(
                ue_index = %command.ue_index,
                bearer_context_id = %command.bearer_context_id,
                "Bearer context released"
            );
        } else {
            warn!(
                ue_index = %command.ue_index,
                bearer_context_id = %command.bearer_context_id,
                "Bearer context release failed"
            );
        }
    });
}

/// Lowest DRB ID not in `used`.
fn allocate_drb(used: &BTreeSet<DrbId>) -> Option<DrbId> {
    (DrbId::MIN.0..=MAX_NOF_DRBS)
        .map(DrbId)
        .find(|drb_id| !used.contains(drb_id))
}
