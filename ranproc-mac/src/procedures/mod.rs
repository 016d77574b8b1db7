//! MAC UE procedures
//!
//! Each procedure drives the MAC UL and DL units for one request and reports
//! the verdict to the [`MacCtrlNotifier`](crate::MacCtrlNotifier). They all run
//! on the UE's control loop as variants of [`UeProcedure`].

mod ue_creation;
mod ue_deletion;
mod ue_reconfiguration;

pub use ue_creation::UeCreationProcedure;
pub use ue_deletion::UeDeletionProcedure;
pub use ue_reconfiguration::UeReconfigurationProcedure;

use async_trait::async_trait;
use ranproc_tasks::LoopProcedure;

/// Procedure kinds that can run on a MAC UE control loop.
pub enum UeProcedure {
    /// UE creation
    Create(UeCreationProcedure),
    /// UE deletion
    Delete(UeDeletionProcedure),
    /// UE reconfiguration
    Reconfigure(UeReconfigurationProcedure),
}

#[async_trait]
impl LoopProcedure for UeProcedure {
    fn name(&self) -> &'static str {
        match self {
            UeProcedure::Create(_) => UeCreationProcedure::NAME,
            UeProcedure::Delete(_) => UeDeletionProcedure::NAME,
            UeProcedure::Reconfigure(_) => UeReconfigurationProcedure::NAME,
        }
    }

    async fn run(self) {
        match self {
            UeProcedure::Create(procedure) => procedure.run().await,
            UeProcedure::Delete(procedure) => procedure.run().await,
            UeProcedure::Reconfigure(procedure) => procedure.run().await,
        }
    }
}
