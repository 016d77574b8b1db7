//! Collaborators of the PDU session resource setup routine.
//!
//! - [`E1apBearerContextManager`]: CU-UP side (reserve, commit, release)
//! - [`F1apUeContextManager`]: DU side
//! - [`RrcUeReconfigurationNotifier`]: radio interface towards the UE
//! - [`NgapPduSessionNotifier`]: receives the final report
//!
//! Rejections are response values, never errors.

use async_trait::async_trait;
use ranproc_common::{CuCpUeIndex, DrbId, PduSessionId, SNssai};

use crate::types::{PduSessionResourceSetupResponse, QosFlowSetupItem};

/// CU-UP bearer context identifier returned by a successful setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BearerContextId(pub u32);

impl std::fmt::Display for BearerContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session to carry on a DRB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrbSetupItem {
    /// DRB ID allocated for the session
    pub drb_id: DrbId,
    /// PDU session mapped onto the DRB
    pub pdu_session_id: PduSessionId,
    /// Network slice
    pub s_nssai: SNssai,
    /// QoS flows mapped onto the DRB
    pub qos_flows: Vec<QosFlowSetupItem>,
}

// ============================================================================
// E1AP
// ============================================================================

/// E1AP Bearer Context Setup Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerContextSetupRequest {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// DRBs to reserve
    pub drbs: Vec<DrbSetupItem>,
    /// UE aggregate maximum bit rate (downlink, bit/s)
    pub ue_aggregate_maximum_bit_rate_dl: u64,
}

/// E1AP Bearer Context Setup Response or Failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearerContextSetupResponse {
    /// True for a Bearer Context Setup Response
    pub success: bool,
    /// Reservation reference, meaningful on success
    pub bearer_context_id: BearerContextId,
}

/// E1AP Bearer Context Modification Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerContextModificationRequest {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// Reservation to commit
    pub bearer_context_id: BearerContextId,
    /// DRBs accepted by the DU
    pub drbs: Vec<DrbId>,
}

/// E1AP Bearer Context Modification Response or Failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearerContextModificationResponse {
    /// True for a Bearer Context Modification Response
    pub success: bool,
}

/// E1AP Bearer Context Release Command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearerContextReleaseCommand {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// Reservation to release
    pub bearer_context_id: BearerContextId,
}

/// Bearer context procedures towards the CU-UP.
#[async_trait]
pub trait E1apBearerContextManager: Send + Sync {
    /// Reserves bearer resources for the sessions.
    async fn bearer_context_setup(&self, request: &BearerContextSetupRequest) -> BearerContextSetupResponse;

    /// Commits the reservation once the DU accepted the DRBs.
    async fn bearer_context_modification(
        &self,
        request: &BearerContextModificationRequest,
    ) -> BearerContextModificationResponse;

    /// Releases a reservation. Returns true once the CU-UP confirmed.
    async fn bearer_context_release(&self, command: &BearerContextReleaseCommand) -> bool;
}

// ============================================================================
// F1AP
// ============================================================================

/// F1AP UE Context Modification Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationRequest {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// DRBs to set up in the DU
    pub drbs_to_setup: Vec<DrbId>,
}

/// F1AP UE Context Modification Response or Failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeContextModificationResponse {
    /// True for a UE Context Modification Response
    pub success: bool,
    /// DRBs the DU set up
    pub drbs_setup: Vec<DrbId>,
}

/// UE context procedures towards the DU.
#[async_trait]
pub trait F1apUeContextManager: Send + Sync {
    /// Applies the DRB changes implied by the reservation.
    async fn ue_context_modification(&self, request: &UeContextModificationRequest) -> UeContextModificationResponse;
}

// ============================================================================
// RRC
// ============================================================================

/// Radio bearer configuration sent to the UE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrcReconfigurationRequest {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// DRBs to add, with their sessions
    pub drbs_to_add: Vec<DrbSetupItem>,
}

/// RRC reconfiguration towards the UE.
#[async_trait]
pub trait RrcUeReconfigurationNotifier: Send + Sync {
    /// Resolves to true once the UE sent RRC Reconfiguration Complete.
    async fn rrc_reconfiguration(&self, request: &RrcReconfigurationRequest) -> bool;
}

// ============================================================================
// NGAP
// ============================================================================

/// Receives the PDU Session Resource Setup Response.
pub trait NgapPduSessionNotifier: Send + Sync {
    /// Called exactly once per handled request.
    fn on_pdu_session_resource_setup_response(&self, response: PduSessionResourceSetupResponse);
}
