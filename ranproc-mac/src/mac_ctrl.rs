//! MAC Control Component
//!
//! Owner of the MAC UE table. Requests from the DU manager are validated
//! synchronously against the table and, when accepted, handed as procedures to
//! the per-UE control loop. Completion is reported through the
//! [`MacCtrlNotifier`] exactly once per request.
//!
//! # Removal
//!
//! A UE is never erased from inside one of its own procedures. Instead, the
//! procedure schedules an erase task on the component's main control loop; that
//! task waits for the UE loop to drain ([`CtrlLoop::request_stop`]), then erases
//! the context, frees the C-RNTI slot and delivers the pending completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ranproc_common::{log_proc_failure, DuUeIndex, ProcConfig, Rnti, MAX_NOF_DU_CELLS, MAX_NOF_DU_UES};
use ranproc_tasks::{AsyncTask, CtrlLoop, LoopProcedure, ScheduleError};
use tracing::{debug, error, info, warn};

use crate::configurator::{MacCtrlNotifier, MacUeConfigurator};
use crate::error::MacCtrlError;
use crate::messages::{
    MacUeCreateRequest, MacUeCreateResponse, MacUeDeleteRequest, MacUeDeleteResponse,
    MacUeOutcome, MacUeReconfigurationRequest, MacUeReconfigurationResponse,
};
use crate::procedures::{
    UeCreationProcedure, UeDeletionProcedure, UeProcedure, UeReconfigurationProcedure,
};
use crate::ue_context::MacUeContext;
use crate::ue_repository::UeRepository;

type UeCtrlLoop = Arc<CtrlLoop<UeProcedure>>;

/// MAC control component configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacCtrlConfig {
    /// Number of UE slots (and C-RNTI table size)
    pub max_nof_ues: usize,
    /// Number of cells served
    pub nof_cells: usize,
}

impl Default for MacCtrlConfig {
    fn default() -> Self {
        Self {
            max_nof_ues: MAX_NOF_DU_UES,
            nof_cells: 1,
        }
    }
}

impl MacCtrlConfig {
    /// Caps both limits at what the identifier types can address.
    pub fn clamped(self) -> Self {
        Self {
            max_nof_ues: self.max_nof_ues.min(MAX_NOF_DU_UES),
            nof_cells: self.nof_cells.min(MAX_NOF_DU_CELLS),
        }
    }
}

impl From<&ProcConfig> for MacCtrlConfig {
    fn from(config: &ProcConfig) -> Self {
        Self {
            max_nof_ues: config.max_nof_ues,
            nof_cells: config.nof_cells,
        }
        .clamped()
    }
}

/// Completion delivered once the UE is erased.
#[derive(Debug)]
pub(crate) enum EraseCompletion {
    Create(MacUeCreateResponse),
    Delete(MacUeDeleteResponse),
}

struct MacCtrlShared {
    config: MacCtrlConfig,
    ul_unit: Arc<dyn MacUeConfigurator>,
    dl_unit: Arc<dyn MacUeConfigurator>,
    notifier: Arc<dyn MacCtrlNotifier>,
    ue_db: Mutex<UeRepository<UeCtrlLoop>>,
    /// Set under the `ue_db` lock by [`MacCtrl::stop`]
    stopping: AtomicBool,
    main_ctrl_loop: CtrlLoop<MainCtrlProcedure>,
}

/// MAC control component.
///
/// Cheap to clone; all clones share the same UE table.
#[derive(Clone)]
pub struct MacCtrl {
    shared: Arc<MacCtrlShared>,
}

impl MacCtrl {
    /// Creates the component and spawns its main control loop.
    ///
    /// Limits above [`MAX_NOF_DU_UES`] or [`MAX_NOF_DU_CELLS`] are capped.
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: MacCtrlConfig,
        ul_unit: Arc<dyn MacUeConfigurator>,
        dl_unit: Arc<dyn MacUeConfigurator>,
        notifier: Arc<dyn MacCtrlNotifier>,
    ) -> Self {
        let requested = config;
        let config = requested.clamped();
        if config != requested {
            warn!(
                max_nof_ues = requested.max_nof_ues,
                nof_cells = requested.nof_cells,
                "MAC limits capped to {} UEs and {} cells",
                config.max_nof_ues,
                config.nof_cells
            );
        }
        info!(
            max_nof_ues = config.max_nof_ues,
            nof_cells = config.nof_cells,
            "Creating MAC control component"
        );
        Self {
            shared: Arc::new(MacCtrlShared {
                config,
                ul_unit,
                dl_unit,
                notifier,
                ue_db: Mutex::new(UeRepository::new(config.max_nof_ues, config.nof_cells)),
                stopping: AtomicBool::new(false),
                main_ctrl_loop: CtrlLoop::new("mac-main"),
            }),
        }
    }

    /// Component configuration.
    pub fn config(&self) -> &MacCtrlConfig {
        &self.shared.config
    }

    fn ue_db(&self) -> MutexGuard<'_, UeRepository<UeCtrlLoop>> {
        self.shared.ue_db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Handles a UE creation request.
    ///
    /// Invalid or duplicate identifiers are rejected immediately; otherwise the
    /// UE is allocated and the creation procedure is scheduled on its new loop.
    pub fn ue_create_request(&self, msg: MacUeCreateRequest) {
        if let Err(cause) = self.schedule_creation(&msg) {
            log_proc_failure(msg.ue_index, Some(msg.crnti), UeCreationProcedure::NAME, &cause);
            self.shared.notifier.on_ue_create_request_complete(MacUeCreateResponse {
                ue_index: msg.ue_index,
                cell_index: msg.cell_index,
                outcome: MacUeOutcome::Rejected(cause),
            });
        }
    }

    /// Handles a UE deletion request.
    pub fn ue_delete_request(&self, msg: MacUeDeleteRequest) {
        if let Err(cause) = self.schedule_deletion(&msg) {
            log_proc_failure(msg.ue_index, Some(msg.rnti), UeDeletionProcedure::NAME, &cause);
            self.shared.notifier.on_ue_delete_complete(MacUeDeleteResponse {
                ue_index: msg.ue_index,
                outcome: MacUeOutcome::Rejected(cause),
            });
        }
    }

    /// Handles a UE reconfiguration request.
    pub fn ue_reconfiguration_request(&self, msg: MacUeReconfigurationRequest) {
        if let Err(cause) = self.schedule_reconfiguration(&msg) {
            log_proc_failure(
                msg.ue_index,
                Some(msg.crnti),
                UeReconfigurationProcedure::NAME,
                &cause,
            );
            self.shared
                .notifier
                .on_ue_reconfiguration_complete(MacUeReconfigurationResponse {
                    ue_index: msg.ue_index,
                    outcome: MacUeOutcome::Rejected(cause),
                });
        }
    }

    fn schedule_creation(&self, msg: &MacUeCreateRequest) -> Result<(), MacCtrlError> {
        let mut ue_db = self.ue_db();
        if self.shared.stopping.load(Ordering::Acquire) {
            return Err(ScheduleError::StopRequested.into());
        }
        ue_db.check_add(msg.ue_index, msg.crnti, msg.cell_index)?;

        let ctrl_loop: UeCtrlLoop = Arc::new(CtrlLoop::new(format!("mac-ue-{}", msg.ue_index)));
        let generation = ue_db.add_ue(msg.ue_index, msg.crnti, msg.cell_index, ctrl_loop.clone())?;
        debug!(ue_index = %msg.ue_index, rnti = %msg.crnti, "UE added to MAC table");

        let procedure = UeCreationProcedure::new(msg.clone(), generation, self.clone());
        if let Err(e) = ctrl_loop.schedule(UeProcedure::Create(procedure)) {
            ue_db.erase(msg.ue_index, generation);
            return Err(e.into());
        }
        Ok(())
    }

    fn schedule_deletion(&self, msg: &MacUeDeleteRequest) -> Result<(), MacCtrlError> {
        let mut ue_db = self.ue_db();
        let max = ue_db.max_nof_ues();
        if msg.ue_index.as_usize() >= max {
            return Err(MacCtrlError::UeIndexOutOfRange { ue_index: msg.ue_index, max });
        }
        let entry = ue_db
            .get_mut(msg.ue_index)
            .ok_or(MacCtrlError::UnknownUe(msg.ue_index))?;
        if entry.removal_pending {
            return Err(MacCtrlError::RemovalPending(msg.ue_index));
        }

        let procedure = UeDeletionProcedure::new(msg.clone(), entry.generation, self.clone());
        entry.ctrl_loop.schedule(UeProcedure::Delete(procedure))?;
        entry.removal_pending = true;
        Ok(())
    }

    fn schedule_reconfiguration(&self, msg: &MacUeReconfigurationRequest) -> Result<(), MacCtrlError> {
        let ue_db = self.ue_db();
        let max = ue_db.max_nof_ues();
        if msg.ue_index.as_usize() >= max {
            return Err(MacCtrlError::UeIndexOutOfRange { ue_index: msg.ue_index, max });
        }
        let entry = ue_db
            .get(msg.ue_index)
            .ok_or(MacCtrlError::UnknownUe(msg.ue_index))?;
        if entry.removal_pending {
            return Err(MacCtrlError::RemovalPending(msg.ue_index));
        }

        let procedure = UeReconfigurationProcedure::new(msg.clone(), entry.generation, self.clone());
        entry.ctrl_loop.schedule(UeProcedure::Reconfigure(procedure))?;
        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Returns a snapshot of the UE context, if the UE is live.
    pub fn find_ue(&self, ue_index: DuUeIndex) -> Option<MacUeContext> {
        self.ue_db().get(ue_index).map(|entry| entry.ctx.clone())
    }

    /// Returns a snapshot of the UE owning `rnti`, if any.
    pub fn find_by_rnti(&self, rnti: Rnti) -> Option<MacUeContext> {
        self.ue_db().find_by_rnti(rnti).map(|entry| entry.ctx.clone())
    }

    /// Number of live UEs (including UEs waiting to be erased).
    pub fn nof_ues(&self) -> usize {
        self.ue_db().nof_ues()
    }

    /// Stops every UE loop and then the main loop.
    ///
    /// Requests received afterwards are rejected with
    /// [`MacCtrlError::LoopUnavailable`] or, for erasures, delivered without
    /// erasing.
    pub fn stop(&self) -> AsyncTask<()> {
        let ue_loops: Vec<UeCtrlLoop> = {
            let ue_db = self.ue_db();
            self.shared.stopping.store(true, Ordering::Release);
            ue_db.iter().map(|entry| entry.ctrl_loop.clone()).collect()
        };
        let ue_stops: Vec<AsyncTask<()>> = ue_loops.iter().map(|l| l.request_stop()).collect();
        let ctrl = self.clone();
        info!(nof_ues = ue_stops.len(), "Stopping MAC control component");

        AsyncTask::new(async move {
            for stop in ue_stops {
                stop.await;
            }
            ctrl.shared.main_ctrl_loop.request_stop().await;
            debug!("MAC control component stopped");
        })
    }

    // ========================================================================
    // Procedure support
    // ========================================================================

    pub(crate) fn ul_unit(&self) -> &dyn MacUeConfigurator {
        self.shared.ul_unit.as_ref()
    }

    pub(crate) fn dl_unit(&self) -> &dyn MacUeConfigurator {
        self.shared.dl_unit.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn MacCtrlNotifier {
        self.shared.notifier.as_ref()
    }

    /// Runs `f` on the context of the given UE generation.
    pub(crate) fn with_ue<R>(
        &self,
        ue_index: DuUeIndex,
        generation: u64,
        f: impl FnOnce(&mut MacUeContext) -> R,
    ) -> Option<R> {
        let mut ue_db = self.ue_db();
        let entry = ue_db
            .get_mut(ue_index)
            .filter(|entry| entry.generation == generation)?;
        Some(f(&mut entry.ctx))
    }

    /// Marks the UE for removal and schedules its erasure on the main loop.
    ///
    /// `completion` is delivered after the UE is erased.
    pub(crate) fn remove_ue(
        &self,
        ue_index: DuUeIndex,
        generation: u64,
        completion: Option<EraseCompletion>,
    ) {
        if let Some(entry) = self
            .ue_db()
            .get_mut(ue_index)
            .filter(|entry| entry.generation == generation)
        {
            entry.removal_pending = true;
            entry.ctx.on_removal();
        }

        if self.shared.main_ctrl_loop.is_stop_requested() {
            warn!(ue_index = %ue_index, "MAC main loop stopped, UE cannot be erased");
            if let Some(completion) = completion {
                self.deliver(completion);
            }
            return;
        }

        debug!(ue_index = %ue_index, "Scheduling UE deletion");
        let task = EraseUeTask {
            ctrl: self.clone(),
            ue_index,
            generation,
            completion,
        };
        if let Err(e) = self
            .shared
            .main_ctrl_loop
            .schedule(MainCtrlProcedure::EraseUe(task))
        {
            error!(ue_index = %ue_index, "Failed to schedule UE erasure: {}", e);
        }
    }

    fn deliver(&self, completion: EraseCompletion) {
        match completion {
            EraseCompletion::Create(response) => {
                self.notifier().on_ue_create_request_complete(response)
            }
            EraseCompletion::Delete(response) => self.notifier().on_ue_delete_complete(response),
        }
    }
}

impl std::fmt::Debug for MacCtrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacCtrl")
            .field("config", &self.shared.config)
            .field("nof_ues", &self.nof_ues())
            .finish()
    }
}

// ============================================================================
// Main control loop procedures
// ============================================================================

struct EraseUeTask {
    ctrl: MacCtrl,
    ue_index: DuUeIndex,
    generation: u64,
    completion: Option<EraseCompletion>,
}

impl EraseUeTask {
    async fn run(self) {
        let ue_loop = self
            .ctrl
            .ue_db()
            .get(self.ue_index)
            .filter(|entry| entry.generation == self.generation)
            .map(|entry| entry.ctrl_loop.clone());

        match ue_loop {
            Some(ue_loop) => {
                ue_loop.request_stop().await;
                let erased = self.ctrl.ue_db().erase(self.ue_index, self.generation);
                if erased.is_some() {
                    info!(ue_index = %self.ue_index, "Removing UE");
                }
            }
            None => warn!(ue_index = %self.ue_index, "UE was already removed"),
        }

        if let Some(completion) = self.completion {
            self.ctrl.deliver(completion);
        }
    }
}

/// Procedures executed by the component's own control loop.
enum MainCtrlProcedure {
    EraseUe(EraseUeTask),
}

#[async_trait]
impl LoopProcedure for MainCtrlProcedure {
    fn name(&self) -> &'static str {
        match self {
            MainCtrlProcedure::EraseUe(_) => "UE Erase",
        }
    }

    async fn run(self) {
        match self {
            MainCtrlProcedure::EraseUe(task) => task.run().await,
        }
    }
}
