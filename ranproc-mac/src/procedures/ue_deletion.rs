//! UE deletion procedure.
//!
//! Both units are asked to remove the UE whatever the other answers. The UE is
//! then erased through the main control loop and the verdict is notified once
//! it is gone, so the index and C-RNTI are free when the requester hears back.

use ranproc_common::ProcLogger;

use crate::mac_ctrl::{EraseCompletion, MacCtrl};
use crate::messages::{MacUeDeleteRequest, MacUeDeleteResponse, MacUeOutcome};

/// Removes a UE from the MAC UL and DL units.
pub struct UeDeletionProcedure {
    request: MacUeDeleteRequest,
    generation: u64,
    ctrl: MacCtrl,
}

impl UeDeletionProcedure {
    /// Procedure name used in logs.
    pub const NAME: &'static str = "UE Delete";

    pub(crate) fn new(request: MacUeDeleteRequest, generation: u64, ctrl: MacCtrl) -> Self {
        Self {
            request,
            generation,
            ctrl,
        }
    }

    pub(crate) async fn run(self) {
        let logger = ProcLogger::with_rnti(self.request.ue_index, self.request.rnti, Self::NAME);
        logger.started();

        self.ctrl
            .with_ue(self.request.ue_index, self.generation, |ctx| ctx.on_removal());

        logger.step(&"UL remove");
        let ul_removed = self.ctrl.ul_unit().remove_ue(&self.request).await;
        logger.step(&"DL remove");
        let dl_removed = self.ctrl.dl_unit().remove_ue(&self.request).await;

        let outcome = if ul_removed && dl_removed {
            logger.completed();
            MacUeOutcome::Success
        } else {
            logger.failed(&format_args!(
                "lower layer removal failed (ul={ul_removed}, dl={dl_removed})"
            ));
            MacUeOutcome::Failed { rolled_back: false }
        };

        let response = MacUeDeleteResponse {
            ue_index: self.request.ue_index,
            outcome,
        };
        self.ctrl.remove_ue(
            self.request.ue_index,
            self.generation,
            Some(EraseCompletion::Delete(response)),
        );
    }
}
