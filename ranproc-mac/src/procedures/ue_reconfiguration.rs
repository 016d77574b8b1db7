//! UE reconfiguration procedure.
//!
//! UL unit first, then DL unit. If the DL unit rejects, the UL change is
//! reverted with the inverse request. The context only records the logical
//! channel change once both units accepted it.

use ranproc_common::ProcLogger;
use tracing::warn;

use crate::mac_ctrl::MacCtrl;
use crate::messages::{MacUeOutcome, MacUeReconfigurationRequest, MacUeReconfigurationResponse};

/// Applies a logical channel change in the MAC UL and DL units.
pub struct UeReconfigurationProcedure {
    request: MacUeReconfigurationRequest,
    generation: u64,
    ctrl: MacCtrl,
}

impl UeReconfigurationProcedure {
    /// Procedure name used in logs.
    pub const NAME: &'static str = "UE Reconfiguration";

    pub(crate) fn new(request: MacUeReconfigurationRequest, generation: u64, ctrl: MacCtrl) -> Self {
        Self {
            request,
            generation,
            ctrl,
        }
    }

    pub(crate) async fn run(self) {
        let logger = ProcLogger::with_rnti(self.request.ue_index, self.request.crnti, Self::NAME);
        logger.started();

        let outcome = self.reconfigure_lower_layers(&logger).await;
        if outcome.is_success() {
            self.ctrl.with_ue(self.request.ue_index, self.generation, |ctx| {
                ctx.apply_lcid_changes(&self.request.lcids_to_add, &self.request.lcids_to_remove)
            });
            logger.completed();
        } else {
            logger.failed(&"lower layer rejected UE reconfiguration");
        }

        self.ctrl
            .notifier()
            .on_ue_reconfiguration_complete(MacUeReconfigurationResponse {
                ue_index: self.request.ue_index,
                outcome,
            });
    }

    async fn reconfigure_lower_layers(&self, logger: &ProcLogger) -> MacUeOutcome {
        // A UE whose creation failed is waiting to be erased.
        let active = self
            .ctrl
            .with_ue(self.request.ue_index, self.generation, |ctx| ctx.is_active())
            .unwrap_or(false);
        if !active {
            warn!(ue_index = %self.request.ue_index, "UE is not active");
            return MacUeOutcome::Failed { rolled_back: true };
        }

        logger.step(&"UL reconfigure");
        if !self.ctrl.ul_unit().reconfigure_ue(&self.request).await {
            return MacUeOutcome::Failed { rolled_back: true };
        }

        logger.step(&"DL reconfigure");
        if !self.ctrl.dl_unit().reconfigure_ue(&self.request).await {
            logger.step(&"UL rollback");
            let rolled_back = self.ctrl.ul_unit().reconfigure_ue(&self.request.inverse()).await;
            if !rolled_back {
                warn!(ue_index = %self.request.ue_index, "UL unit refused reconfiguration rollback");
            }
            return MacUeOutcome::Failed { rolled_back };
        }

        MacUeOutcome::Success
    }
}
