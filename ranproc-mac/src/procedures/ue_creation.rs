//! UE creation procedure.
//!
//! 1. Add the UE to the MAC UL unit.
//! 2. Add the UE to the MAC DL unit. On rejection, remove it from the UL unit.
//! 3. On success mark the context active and notify. On failure erase the UE
//!    through the main control loop and notify once it is gone.

use ranproc_common::ProcLogger;
use tracing::warn;

use crate::mac_ctrl::{EraseCompletion, MacCtrl};
use crate::messages::{MacUeCreateRequest, MacUeCreateResponse, MacUeDeleteRequest, MacUeOutcome};

/// Creates a UE in the MAC UL and DL units.
pub struct UeCreationProcedure {
    request: MacUeCreateRequest,
    generation: u64,
    ctrl: MacCtrl,
}

impl UeCreationProcedure {
    /// Procedure name used in logs.
    pub const NAME: &'static str = "UE Create Request";

    pub(crate) fn new(request: MacUeCreateRequest, generation: u64, ctrl: MacCtrl) -> Self {
        Self {
            request,
            generation,
            ctrl,
        }
    }

    pub(crate) async fn run(self) {
        let logger = ProcLogger::with_rnti(self.request.ue_index, self.request.crnti, Self::NAME);
        logger.started();

        let outcome = self.add_to_lower_layers(&logger).await;
        let response = MacUeCreateResponse {
            ue_index: self.request.ue_index,
            cell_index: self.request.cell_index,
            outcome,
        };

        if response.outcome.is_success() {
            self.ctrl.with_ue(self.request.ue_index, self.generation, |ctx| {
                ctx.on_creation_complete(&self.request.logical_channels)
            });
            logger.completed();
            self.ctrl.notifier().on_ue_create_request_complete(response);
        } else {
            logger.failed(&"lower layer rejected UE creation");
            // Nothing outside MAC references the UE yet: roll the allocation back.
            self.ctrl.remove_ue(
                self.request.ue_index,
                self.generation,
                Some(EraseCompletion::Create(response)),
            );
        }
    }

    async fn add_to_lower_layers(&self, logger: &ProcLogger) -> MacUeOutcome {
        logger.step(&"UL add");
        if !self.ctrl.ul_unit().add_ue(&self.request).await {
            return MacUeOutcome::Failed { rolled_back: true };
        }

        logger.step(&"DL add");
        if !self.ctrl.dl_unit().add_ue(&self.request).await {
            logger.step(&"UL rollback");
            let undo = MacUeDeleteRequest {
                ue_index: self.request.ue_index,
                rnti: self.request.crnti,
            };
            let rolled_back = self.ctrl.ul_unit().remove_ue(&undo).await;
            if !rolled_back {
                warn!(ue_index = %self.request.ue_index, "UL unit refused UE removal during rollback");
            }
            return MacUeOutcome::Failed { rolled_back };
        }

        MacUeOutcome::Success
    }
}
