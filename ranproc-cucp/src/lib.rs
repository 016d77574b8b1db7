//! CU-CP control plane for ranproc
//!
//! - [`PduSessionResourceSetupRoutine`]: multi-step setup across E1AP, F1AP
//!   and RRC collaborators with per-item failure reporting
//! - [`RoutineManager`]: starts routines as [`AsyncTask`](ranproc_tasks::AsyncTask)s
//! - [`CuCpUeManager`]: per-UE contexts and control loops, NGAP entry point

pub mod error;
pub mod notifiers;
pub mod routine_manager;
pub mod routines;
pub mod types;
pub mod ue_context;
pub mod ue_manager;

pub use error::CuCpError;
pub use notifiers::{
    BearerContextId, BearerContextModificationRequest, BearerContextModificationResponse,
    BearerContextReleaseCommand, BearerContextSetupRequest, BearerContextSetupResponse,
    DrbSetupItem, E1apBearerContextManager, F1apUeContextManager, NgapPduSessionNotifier,
    RrcReconfigurationRequest, RrcUeReconfigurationNotifier, UeContextModificationRequest,
    UeContextModificationResponse,
};
pub use routine_manager::RoutineManager;
pub use routines::{PduSessionResourceSetupRoutine, RoutineCollaborators};
pub use types::{
    PduSessionFailedItem, PduSessionResourceSetupRequest, PduSessionResourceSetupResponse,
    PduSessionSetupItem, PduSessionSetupResponseItem, QosFlowSetupItem, SetupCompletion,
    SetupFailureCause, SetupStep,
};
pub use ue_context::CuCpUeContext;
pub use ue_manager::CuCpUeManager;
