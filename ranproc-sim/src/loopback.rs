//! Loopback collaborators
//!
//! Stand-ins for the MAC UL/DL units, the CU-UP, the DU and the UE. Each one
//! answers after the configured latency and accepts everything except the
//! step selected by [`SimRejectStep`]. Completions are forwarded to the
//! scenario over unbounded channels.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ranproc_common::SimRejectStep;
use ranproc_cucp::{
    BearerContextId, BearerContextModificationRequest, BearerContextModificationResponse,
    BearerContextReleaseCommand, BearerContextSetupRequest, BearerContextSetupResponse,
    E1apBearerContextManager, F1apUeContextManager, NgapPduSessionNotifier,
    PduSessionResourceSetupResponse, RrcReconfigurationRequest, RrcUeReconfigurationNotifier,
    UeContextModificationRequest, UeContextModificationResponse,
};
use ranproc_mac::{
    MacCtrlNotifier, MacUeConfigurator, MacUeCreateRequest, MacUeCreateResponse,
    MacUeDeleteRequest, MacUeDeleteResponse, MacUeReconfigurationRequest,
    MacUeReconfigurationResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

// ============================================================================
// MAC units
// ============================================================================

/// Direction of a loopback MAC unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitDirection {
    /// Uplink scheduler side
    Ul,
    /// Downlink scheduler side
    Dl,
}

impl std::fmt::Display for UnitDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitDirection::Ul => write!(f, "UL"),
            UnitDirection::Dl => write!(f, "DL"),
        }
    }
}

/// Loopback MAC UL or DL unit.
///
/// Only UE additions can be rejected; removals and reconfigurations are
/// always accepted.
pub struct LoopbackMacUnit {
    direction: UnitDirection,
    reject_add: bool,
    latency: Duration,
    nof_ues: AtomicUsize,
}

impl LoopbackMacUnit {
    /// Creates a unit rejecting additions when `reject_step` names it.
    pub fn new(direction: UnitDirection, reject_step: SimRejectStep, latency: Duration) -> Self {
        let reject_add = matches!(
            (direction, reject_step),
            (UnitDirection::Ul, SimRejectStep::MacUl) | (UnitDirection::Dl, SimRejectStep::MacDl)
        );
        Self {
            direction,
            reject_add,
            latency,
            nof_ues: AtomicUsize::new(0),
        }
    }

    /// Number of UEs currently configured in the unit.
    pub fn nof_ues(&self) -> usize {
        self.nof_ues.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MacUeConfigurator for LoopbackMacUnit {
    async fn add_ue(&self, request: &MacUeCreateRequest) -> bool {
        delay(self.latency).await;
        if self.reject_add {
            debug!(unit = %self.direction, ue_index = %request.ue_index, "Rejecting UE addition");
            return false;
        }
        self.nof_ues.fetch_add(1, Ordering::SeqCst);
        true
    }

    async fn remove_ue(&self, request: &MacUeDeleteRequest) -> bool {
        delay(self.latency).await;
        trace!(unit = %self.direction, ue_index = %request.ue_index, "UE removed");
        // Saturating: removal is also called as rollback of a rejected add.
        let _ = self
            .nof_ues
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        true
    }

    async fn reconfigure_ue(&self, request: &MacUeReconfigurationRequest) -> bool {
        delay(self.latency).await;
        trace!(unit = %self.direction, ue_index = %request.ue_index, "UE reconfigured");
        true
    }
}

// ============================================================================
// CU-UP, DU and UE
// ============================================================================

/// Loopback peer standing in for the CU-UP (E1AP), the DU (F1AP) and the UE
/// (RRC).
pub struct LoopbackPeers {
    reject_step: SimRejectStep,
    latency: Duration,
    next_bearer_context: AtomicU32,
    releases: AtomicUsize,
}

impl LoopbackPeers {
    /// Creates the peers.
    pub fn new(reject_step: SimRejectStep, latency: Duration) -> Self {
        Self {
            reject_step,
            latency,
            next_bearer_context: AtomicU32::new(1),
            releases: AtomicUsize::new(0),
        }
    }

    /// Number of bearer context releases received.
    pub fn nof_releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn accepts(&self, step: SimRejectStep) -> bool {
        self.reject_step != step
    }
}

#[async_trait]
impl E1apBearerContextManager for LoopbackPeers {
    async fn bearer_context_setup(&self, request: &BearerContextSetupRequest) -> BearerContextSetupResponse {
        delay(self.latency).await;
        let id = self.next_bearer_context.fetch_add(1, Ordering::SeqCst);
        trace!(ue_index = %request.ue_index, nof_drbs = request.drbs.len(), "Bearer context setup");
        BearerContextSetupResponse {
            success: self.accepts(SimRejectStep::BearerContextSetup),
            bearer_context_id: BearerContextId(id),
        }
    }

    async fn bearer_context_modification(
        &self,
        request: &BearerContextModificationRequest,
    ) -> BearerContextModificationResponse {
        delay(self.latency).await;
        trace!(ue_index = %request.ue_index, bearer_context_id = %request.bearer_context_id, "Bearer context modification");
        BearerContextModificationResponse {
            success: self.accepts(SimRejectStep::BearerContextModification),
        }
    }

    async fn bearer_context_release(&self, command: &BearerContextReleaseCommand) -> bool {
        delay(self.latency).await;
        debug!(ue_index = %command.ue_index, bearer_context_id = %command.bearer_context_id, "Bearer context release");
        self.releases.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[async_trait]
impl F1apUeContextManager for LoopbackPeers {
    async fn ue_context_modification(&self, request: &UeContextModificationRequest) -> UeContextModificationResponse {
        delay(self.latency).await;
        if !self.accepts(SimRejectStep::UeContextModification) {
            return UeContextModificationResponse {
                success: false,
                drbs_setup: Vec::new(),
            };
        }
        UeContextModificationResponse {
            success: true,
            drbs_setup: request.drbs_to_setup.clone(),
        }
    }
}

#[async_trait]
impl RrcUeReconfigurationNotifier for LoopbackPeers {
    async fn rrc_reconfiguration(&self, request: &RrcReconfigurationRequest) -> bool {
        delay(self.latency).await;
        trace!(ue_index = %request.ue_index, nof_drbs = request.drbs_to_add.len(), "RRC reconfiguration");
        self.accepts(SimRejectStep::RrcReconfiguration)
    }
}

// ============================================================================
// Notifiers
// ============================================================================

/// MAC completion received by the scenario.
#[derive(Debug)]
pub enum MacEvent {
    /// UE creation finished
    Created(MacUeCreateResponse),
    /// UE deletion finished
    Deleted(MacUeDeleteResponse),
    /// UE reconfiguration finished
    Reconfigured(MacUeReconfigurationResponse),
}

/// Forwards MAC completions to a channel.
pub struct ChannelMacNotifier {
    tx: mpsc::UnboundedSender<MacEvent>,
}

impl ChannelMacNotifier {
    /// Creates the notifier and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MacEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: MacEvent) {
        if self.tx.send(event).is_err() {
            debug!("MAC event dropped, scenario gone");
        }
    }
}

impl MacCtrlNotifier for ChannelMacNotifier {
    fn on_ue_create_request_complete(&self, response: MacUeCreateResponse) {
        self.forward(MacEvent::Created(response));
    }

    fn on_ue_delete_complete(&self, response: MacUeDeleteResponse) {
        self.forward(MacEvent::Deleted(response));
    }

    fn on_ue_reconfiguration_complete(&self, response: MacUeReconfigurationResponse) {
        self.forward(MacEvent::Reconfigured(response));
    }
}

/// Forwards PDU session setup reports to a channel.
pub struct ChannelNgapNotifier {
    tx: mpsc::UnboundedSender<PduSessionResourceSetupResponse>,
}

impl ChannelNgapNotifier {
    /// Creates the notifier and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PduSessionResourceSetupResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NgapPduSessionNotifier for ChannelNgapNotifier {
    fn on_pdu_session_resource_setup_response(&self, response: PduSessionResourceSetupResponse) {
        if self.tx.send(response).is_err() {
            debug!("PDU session report dropped, scenario gone");
        }
    }
}
