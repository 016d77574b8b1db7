//! PDU session resource setup request, response and failure causes.

use std::fmt;

use ranproc_common::{CuCpUeIndex, DrbId, PduSessionId, SNssai};

use crate::notifiers::BearerContextId;

/// QoS flow requested for a PDU session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosFlowSetupItem {
    /// QoS flow identifier
    pub qfi: u8,
    /// 5G QoS identifier
    pub five_qi: u16,
}

/// One PDU session of a setup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionSetupItem {
    /// PDU session ID
    pub pdu_session_id: PduSessionId,
    /// Network slice
    pub s_nssai: SNssai,
    /// QoS flows to map onto the session's DRB
    pub qos_flows: Vec<QosFlowSetupItem>,
}

impl PduSessionSetupItem {
    /// Creates an item with a single default QoS flow (QFI 1, 5QI 9).
    pub fn new(pdu_session_id: PduSessionId, s_nssai: SNssai) -> Self {
        Self {
            pdu_session_id,
            s_nssai,
            qos_flows: vec![QosFlowSetupItem { qfi: 1, five_qi: 9 }],
        }
    }
}

/// PDU Session Resource Setup Request received from NGAP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionResourceSetupRequest {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// Sessions to set up
    pub items: Vec<PduSessionSetupItem>,
    /// UE aggregate maximum bit rate (downlink, bit/s)
    pub ue_aggregate_maximum_bit_rate_dl: u64,
}

impl PduSessionResourceSetupRequest {
    /// Creates a request without any session.
    pub fn new(ue_index: CuCpUeIndex) -> Self {
        Self {
            ue_index,
            items: Vec::new(),
            ue_aggregate_maximum_bit_rate_dl: 0,
        }
    }

    /// Adds a session to the request.
    pub fn with_item(mut self, item: PduSessionSetupItem) -> Self {
        self.items.push(item);
        self
    }
}

/// Why a PDU session could not be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupFailureCause {
    /// The same ID appears more than once in the request
    MultiplePduSessionIdInstances,
    /// The UE already has a session with this ID
    PduSessionIdAlreadyInUse,
    /// Every DRB ID of the UE is taken
    NoDrbAvailable,
    /// The target UE does not exist
    UnknownUe,
    /// The UE control loop refused the request
    UeUnavailable,
    /// CU-UP rejected the bearer context setup
    ReservationRejected,
    /// DU rejected the UE context modification
    PeerModificationRejected,
    /// CU-UP rejected the bearer context modification
    CommitRejected,
    /// The UE did not complete the RRC reconfiguration
    RadioReconfigurationRejected,
}

impl fmt::Display for SetupFailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetupFailureCause::MultiplePduSessionIdInstances => "multiple PDU session ID instances",
            SetupFailureCause::PduSessionIdAlreadyInUse => "PDU session ID already in use",
            SetupFailureCause::NoDrbAvailable => "no DRB available",
            SetupFailureCause::UnknownUe => "unknown UE",
            SetupFailureCause::UeUnavailable => "UE unavailable",
            SetupFailureCause::ReservationRejected => "reservation rejected",
            SetupFailureCause::PeerModificationRejected => "peer modification rejected",
            SetupFailureCause::CommitRejected => "resource commit rejected",
            SetupFailureCause::RadioReconfigurationRejected => "radio reconfiguration rejected",
        };
        write!(f, "{s}")
    }
}

/// Steps of the PDU session resource setup routine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetupStep {
    /// Per-item validation and DRB allocation
    Validate,
    /// E1AP Bearer Context Setup (reservation)
    BearerContextSetup,
    /// F1AP UE Context Modification
    UeContextModification,
    /// E1AP Bearer Context Modification (commit)
    BearerContextModification,
    /// RRC Reconfiguration
    RrcReconfiguration,
    /// Build the response
    Finalize,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupStep::Validate => write!(f, "Validate"),
            SetupStep::BearerContextSetup => write!(f, "BearerContextSetup"),
            SetupStep::UeContextModification => write!(f, "UeContextModification"),
            SetupStep::BearerContextModification => write!(f, "BearerContextModification"),
            SetupStep::RrcReconfiguration => write!(f, "RrcReconfiguration"),
            SetupStep::Finalize => write!(f, "Finalize"),
        }
    }
}

/// How far the routine got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupCompletion {
    /// No collaborator was contacted
    NotStarted,
    /// A collaborator rejected `step`
    Failed {
        /// Rejected step
        step: SetupStep,
        /// The bearer context reservation was released
        rolled_back: bool,
    },
    /// Every step succeeded
    Applied,
}

/// A successfully set up PDU session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduSessionSetupResponseItem {
    /// PDU session ID
    pub pdu_session_id: PduSessionId,
    /// DRB carrying the session
    pub drb_id: DrbId,
}

/// A PDU session that failed to set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduSessionFailedItem {
    /// PDU session ID
    pub pdu_session_id: PduSessionId,
    /// Failure cause
    pub cause: SetupFailureCause,
}

/// PDU Session Resource Setup Response sent back to NGAP.
///
/// `setup_items` and `failed_items` are disjoint and together cover every item
/// of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionResourceSetupResponse {
    /// Target UE
    pub ue_index: CuCpUeIndex,
    /// Sessions set up
    pub setup_items: Vec<PduSessionSetupResponseItem>,
    /// Sessions that failed to set up
    pub failed_items: Vec<PduSessionFailedItem>,
    /// How far the routine got
    pub completion: SetupCompletion,
    /// CU-UP bearer context left reserved; released when the UE is removed
    pub bearer_context: Option<BearerContextId>,
}

impl PduSessionResourceSetupResponse {
    /// Response for a request refused as a whole before any step ran.
    pub fn all_failed(request: &PduSessionResourceSetupRequest, cause: SetupFailureCause) -> Self {
        Self {
            ue_index: request.ue_index,
            setup_items: Vec::new(),
            failed_items: request
                .items
                .iter()
                .map(|item| PduSessionFailedItem {
                    pdu_session_id: item.pdu_session_id,
                    cause,
                })
                .collect(),
            completion: SetupCompletion::NotStarted,
            bearer_context: None,
        }
    }

    /// True when at least one session was set up and none failed.
    pub fn is_success(&self) -> bool {
        !self.setup_items.is_empty() && self.failed_items.is_empty()
    }

    /// Failure cause reported for `pdu_session_id`, if it failed.
    pub fn failure_cause(&self, pdu_session_id: PduSessionId) -> Option<SetupFailureCause> {
        self.failed_items
            .iter()
            .find(|item| item.pdu_session_id == pdu_session_id)
            .map(|item| item.cause)
    }
}
