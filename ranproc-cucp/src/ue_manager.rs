//! CU-CP UE manager
//!
//! Owns the CU-CP UE contexts and one control loop per UE. NGAP requests are
//! mapped to the right loop and run there as routines, so two setups for the
//! same UE never overlap. Every request is answered exactly once through the
//! [`NgapPduSessionNotifier`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ranproc_common::{log_proc_failure, CuCpUeIndex};
use ranproc_tasks::{AsyncTask, CtrlLoop, LoopProcedure};
use tracing::{debug, error, info};

use crate::error::CuCpError;
use crate::notifiers::{BearerContextReleaseCommand, NgapPduSessionNotifier};
use crate::routine_manager::RoutineManager;
use crate::routines::PduSessionResourceSetupRoutine;
use crate::types::{
    PduSessionResourceSetupRequest, PduSessionResourceSetupResponse, SetupCompletion,
    SetupFailureCause,
};
use crate::ue_context::CuCpUeContext;

type UeCtrlLoop = Arc<CtrlLoop<CuCpUeProcedure>>;

struct CuCpUeEntry {
    ctx: CuCpUeContext,
    ctrl_loop: UeCtrlLoop,
}

struct UeManagerShared {
    max_nof_ues: usize,
    routine_mng: RoutineManager,
    ngap: Arc<dyn NgapPduSessionNotifier>,
    ues: Mutex<HashMap<CuCpUeIndex, CuCpUeEntry>>,
}

/// CU-CP UE manager.
///
/// Cheap to clone; all clones share the same UE table.
#[derive(Clone)]
pub struct CuCpUeManager {
    shared: Arc<UeManagerShared>,
}

impl CuCpUeManager {
    /// Creates an empty UE manager.
    pub fn new(
        max_nof_ues: usize,
        routine_mng: RoutineManager,
        ngap: Arc<dyn NgapPduSessionNotifier>,
    ) -> Self {
        Self {
            shared: Arc::new(UeManagerShared {
                max_nof_ues,
                routine_mng,
                ngap,
                ues: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn ues(&self) -> MutexGuard<'_, HashMap<CuCpUeIndex, CuCpUeEntry>> {
        self.shared.ues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a UE context and its control loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_ue(&self, ue_index: CuCpUeIndex) -> Result<(), CuCpError> {
        let max = self.shared.max_nof_ues;
        if ue_index.as_usize() >= max {
            return Err(CuCpError::UeIndexOutOfRange { ue_index, max });
        }

        let mut ues = self.ues();
        if ues.contains_key(&ue_index) {
            return Err(CuCpError::DuplicateUe(ue_index));
        }
        ues.insert(
            ue_index,
            CuCpUeEntry {
                ctx: CuCpUeContext::new(ue_index),
                ctrl_loop: Arc::new(CtrlLoop::new(format!("cucp-ue-{ue_index}"))),
            },
        );
        info!(ue_index = %ue_index, "CU-CP UE created");
        Ok(())
    }

    /// Stops the UE loop and erases the context once it has drained.
    ///
    /// The erasure runs in the background; the returned task completes once
    /// it is done. Bearer contexts held by the UE are released afterwards
    /// without waiting for the CU-UP.
    pub fn remove_ue(&self, ue_index: CuCpUeIndex) -> Result<AsyncTask<()>, CuCpError> {
        let stop = {
            let mut ues = self.ues();
            let entry = ues.get_mut(&ue_index).ok_or(CuCpError::UnknownUe(ue_index))?;
            if entry.ctx.releasing {
                return Err(CuCpError::RemovalPending(ue_index));
            }
            entry.ctx.releasing = true;
            entry.ctrl_loop.request_stop()
        };
        debug!(ue_index = %ue_index, "Scheduling CU-CP UE removal");

        let ue_mng = self.clone();
        let handle = tokio::spawn(async move {
            stop.await;
            let removed = ue_mng.ues().remove(&ue_index);
            info!(ue_index = %ue_index, "CU-CP UE removed");
            for bearer_context_id in removed.into_iter().flat_map(|entry| entry.ctx.bearer_contexts) {
                ue_mng
                    .shared
                    .routine_mng
                    .release_bearer_context(BearerContextReleaseCommand {
                        ue_index,
                        bearer_context_id,
                    });
            }
        });
        Ok(AsyncTask::new(async move {
            if let Err(e) = handle.await {
                error!(ue_index = %ue_index, "CU-CP UE removal task failed: {}", e);
            }
        }))
    }

    /// Returns a snapshot of the UE context.
    pub fn find_ue(&self, ue_index: CuCpUeIndex) -> Option<CuCpUeContext> {
        self.ues().get(&ue_index).map(|entry| entry.ctx.clone())
    }

    /// Number of UEs (including UEs being removed).
    pub fn nof_ues(&self) -> usize {
        self.ues().len()
    }

    /// Handles a PDU Session Resource Setup Request from NGAP.
    ///
    /// The routine runs on the UE's control loop. Requests for unknown or
    /// departing UEs are answered immediately with every item failed.
    pub fn handle_pdu_session_resource_setup_request(&self, request: PduSessionResourceSetupRequest) {
        if let Err(cause) = self.schedule_setup(&request) {
            log_proc_failure(
                request.ue_index,
                None,
                PduSessionResourceSetupRoutine::NAME,
                &cause,
            );
            let item_cause = match cause {
                CuCpError::UnknownUe(_) | CuCpError::UeIndexOutOfRange { .. } => {
                    SetupFailureCause::UnknownUe
                }
                _ => SetupFailureCause::UeUnavailable,
            };
            self.shared
                .ngap
                .on_pdu_session_resource_setup_response(PduSessionResourceSetupResponse::all_failed(
                    &request, item_cause,
                ));
        }
    }

    fn schedule_setup(&self, request: &PduSessionResourceSetupRequest) -> Result<(), CuCpError> {
        let ues = self.ues();
        let entry = ues
            .get(&request.ue_index)
            .ok_or(CuCpError::UnknownUe(request.ue_index))?;
        if entry.ctx.releasing {
            return Err(CuCpError::RemovalPending(request.ue_index));
        }
        entry
            .ctrl_loop
            .schedule(CuCpUeProcedure::PduSessionResourceSetup(PduSessionSetupProcedure {
                request: request.clone(),
                ue_mng: self.clone(),
            }))?;
        Ok(())
    }

    fn with_ue<R>(&self, ue_index: CuCpUeIndex, f: impl FnOnce(&mut CuCpUeContext) -> R) -> Option<R> {
        self.ues().get_mut(&ue_index).map(|entry| f(&mut entry.ctx))
    }
}

// ============================================================================
// UE procedures
// ============================================================================

/// Runs the setup routine against the UE's current sessions and records the
/// sessions it established.
struct PduSessionSetupProcedure {
    request: PduSessionResourceSetupRequest,
    ue_mng: CuCpUeManager,
}

impl PduSessionSetupProcedure {
    async fn run(self) {
        let ue_index = self.request.ue_index;
        let ngap = self.ue_mng.shared.ngap.clone();

        let Some(established) = self.ue_mng.with_ue(ue_index, |ctx| ctx.pdu_sessions.clone()) else {
            ngap.on_pdu_session_resource_setup_response(PduSessionResourceSetupResponse::all_failed(
                &self.request,
                SetupFailureCause::UnknownUe,
            ));
            return;
        };

        let response = self
            .ue_mng
            .shared
            .routine_mng
            .start_pdu_session_resource_setup_routine(self.request, &established)
            .await;

        self.ue_mng.with_ue(ue_index, |ctx| {
            if response.completion == SetupCompletion::Applied {
                ctx.on_pdu_sessions_setup(&response.setup_items);
            }
            if let Some(bearer_context_id) = response.bearer_context {
                ctx.on_bearer_context_retained(bearer_context_id);
            }
        });
        ngap.on_pdu_session_resource_setup_response(response);
    }
}

/// Procedures that run on a CU-CP UE control loop.
enum CuCpUeProcedure {
    PduSessionResourceSetup(PduSessionSetupProcedure),
}

#[async_trait]
impl LoopProcedure for CuCpUeProcedure {
    fn name(&self) -> &'static str {
        match self {
            CuCpUeProcedure::PduSessionResourceSetup(_) => PduSessionResourceSetupRoutine::NAME,
        }
    }

    async fn run(self) {
        match self {
            CuCpUeProcedure::PduSessionResourceSetup(procedure) => procedure.run().await,
        }
    }
}

impl std::fmt::Debug for CuCpUeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuCpUeManager")
            .field("max_nof_ues", &self.shared.max_nof_ues)
            .field("nof_ues", &self.nof_ues())
            .finish()
    }
}
