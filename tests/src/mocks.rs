//! Mock collaborators for integration testing
//!
//! - [`MockMacConfigurator`]: MAC UL/DL unit with programmable verdicts, an
//!   optional gate holding every call, and a call log
//! - [`MockCuCpPeers`]: E1AP, F1AP and RRC collaborator with per-step verdicts
//!   and call counters
//! - [`RecordingMacNotifier`], [`RecordingNgapNotifier`]: forward completions
//!   to a channel
//! - [`MacHarness`], [`CuCpHarness`]: components wired to the mocks

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use ranproc_common::{CuCpUeIndex, DuUeIndex};
use ranproc_cucp::{
    BearerContextId, BearerContextModificationRequest, BearerContextModificationResponse,
    BearerContextReleaseCommand, BearerContextSetupRequest, BearerContextSetupResponse,
    CuCpUeManager, E1apBearerContextManager, F1apUeContextManager, NgapPduSessionNotifier,
    PduSessionResourceSetupRequest, PduSessionResourceSetupResponse, RoutineManager,
    RrcReconfigurationRequest, RrcUeReconfigurationNotifier, UeContextModificationRequest,
    UeContextModificationResponse,
};
use ranproc_mac::{
    MacCtrl, MacCtrlConfig, MacCtrlNotifier, MacUeConfigurator, MacUeCreateRequest,
    MacUeCreateResponse, MacUeDeleteRequest, MacUeDeleteResponse, MacUeReconfigurationRequest,
    MacUeReconfigurationResponse,
};

use crate::test_utils::recv_within;

// ============================================================================
// MAC units
// ============================================================================

/// Call received by a [`MockMacConfigurator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacUnitCall {
    /// `add_ue`
    Add(DuUeIndex),
    /// `remove_ue`
    Remove(DuUeIndex),
    /// `reconfigure_ue`
    Reconfigure(DuUeIndex),
}

/// Mock MAC UL or DL unit.
///
/// Calls are logged on entry. A gated unit holds each call until
/// [`release`](Self::release) hands out a permit.
pub struct MockMacConfigurator {
    accept_add: AtomicBool,
    accept_remove: AtomicBool,
    accept_reconfigure: AtomicBool,
    gate: Option<Semaphore>,
    calls: Mutex<Vec<MacUnitCall>>,
}

impl Default for MockMacConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMacConfigurator {
    /// Creates a unit that accepts everything immediately.
    pub fn new() -> Self {
        Self {
            accept_add: AtomicBool::new(true),
            accept_remove: AtomicBool::new(true),
            accept_reconfigure: AtomicBool::new(true),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a unit whose calls wait for [`release`](Self::release).
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Sets the verdict of `add_ue`.
    pub fn set_accept_add(&self, accept: bool) {
        self.accept_add.store(accept, Ordering::SeqCst);
    }

    /// Sets the verdict of `remove_ue`.
    pub fn set_accept_remove(&self, accept: bool) {
        self.accept_remove.store(accept, Ordering::SeqCst);
    }

    /// Sets the verdict of `reconfigure_ue`.
    pub fn set_accept_reconfigure(&self, accept: bool) {
        self.accept_reconfigure.store(accept, Ordering::SeqCst);
    }

    /// Lets `n` held calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<MacUnitCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls received so far.
    pub fn nof_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn enter(&self, call: MacUnitCall) {
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl MacUeConfigurator for MockMacConfigurator {
    async fn add_ue(&self, request: &MacUeCreateRequest) -> bool {
        self.enter(MacUnitCall::Add(request.ue_index)).await;
        self.accept_add.load(Ordering::SeqCst)
    }

    async fn remove_ue(&self, request: &MacUeDeleteRequest) -> bool {
        self.enter(MacUnitCall::Remove(request.ue_index)).await;
        self.accept_remove.load(Ordering::SeqCst)
    }

    async fn reconfigure_ue(&self, request: &MacUeReconfigurationRequest) -> bool {
        self.enter(MacUnitCall::Reconfigure(request.ue_index)).await;
        self.accept_reconfigure.load(Ordering::SeqCst)
    }
}

// ============================================================================
// CU-CP peers
// ============================================================================

/// Mock CU-UP, DU and UE.
pub struct MockCuCpPeers {
    accept_bearer_context_setup: AtomicBool,
    accept_ue_context_modification: AtomicBool,
    accept_bearer_context_modification: AtomicBool,
    accept_rrc_reconfiguration: AtomicBool,
    drop_last_drb: AtomicBool,
    gate: Option<Semaphore>,
    next_bearer_context: AtomicU32,
    bearer_context_setups: AtomicUsize,
    ue_context_modifications: AtomicUsize,
    bearer_context_modifications: AtomicUsize,
    rrc_reconfigurations: AtomicUsize,
    releases: AtomicUsize,
}

impl Default for MockCuCpPeers {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCuCpPeers {
    /// Creates peers that accept every step immediately.
    pub fn new() -> Self {
        Self {
            accept_bearer_context_setup: AtomicBool::new(true),
            accept_ue_context_modification: AtomicBool::new(true),
            accept_bearer_context_modification: AtomicBool::new(true),
            accept_rrc_reconfiguration: AtomicBool::new(true),
            drop_last_drb: AtomicBool::new(false),
            gate: None,
            next_bearer_context: AtomicU32::new(1),
            bearer_context_setups: AtomicUsize::new(0),
            ue_context_modifications: AtomicUsize::new(0),
            bearer_context_modifications: AtomicUsize::new(0),
            rrc_reconfigurations: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Creates peers whose bearer context setups wait for
    /// [`release`](Self::release).
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Lets `n` held bearer context setups complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Sets the verdict of the E1AP bearer context setup.
    pub fn set_accept_bearer_context_setup(&self, accept: bool) {
        self.accept_bearer_context_setup.store(accept, Ordering::SeqCst);
    }

    /// Sets the verdict of the F1AP UE context modification.
    pub fn set_accept_ue_context_modification(&self, accept: bool) {
        self.accept_ue_context_modification.store(accept, Ordering::SeqCst);
    }

    /// Sets the verdict of the E1AP bearer context modification.
    pub fn set_accept_bearer_context_modification(&self, accept: bool) {
        self.accept_bearer_context_modification.store(accept, Ordering::SeqCst);
    }

    /// Makes the DU accept the UE context modification but leave out the
    /// last requested DRB.
    pub fn set_drop_last_drb(&self, drop: bool) {
        self.drop_last_drb.store(drop, Ordering::SeqCst);
    }

    /// Sets the verdict of the RRC reconfiguration.
    pub fn set_accept_rrc_reconfiguration(&self, accept: bool) {
        self.accept_rrc_reconfiguration.store(accept, Ordering::SeqCst);
    }

    /// Bearer context setups received.
    pub fn nof_bearer_context_setups(&self) -> usize {
        self.bearer_context_setups.load(Ordering::SeqCst)
    }

    /// UE context modifications received.
    pub fn nof_ue_context_modifications(&self) -> usize {
        self.ue_context_modifications.load(Ordering::SeqCst)
    }

    /// Bearer context modifications received.
    pub fn nof_bearer_context_modifications(&self) -> usize {
        self.bearer_context_modifications.load(Ordering::SeqCst)
    }

    /// RRC reconfigurations received.
    pub fn nof_rrc_reconfigurations(&self) -> usize {
        self.rrc_reconfigurations.load(Ordering::SeqCst)
    }

    /// Bearer context releases received.
    pub fn nof_releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Calls received across every step except releases.
    pub fn nof_calls(&self) -> usize {
        self.nof_bearer_context_setups()
            + self.nof_ue_context_modifications()
            + self.nof_bearer_context_modifications()
            + self.nof_rrc_reconfigurations()
    }
}

#[async_trait]
impl E1apBearerContextManager for MockCuCpPeers {
    async fn bearer_context_setup(&self, _request: &BearerContextSetupRequest) -> BearerContextSetupResponse {
        self.bearer_context_setups.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        BearerContextSetupResponse {
            success: self.accept_bearer_context_setup.load(Ordering::SeqCst),
            bearer_context_id: BearerContextId(self.next_bearer_context.fetch_add(1, Ordering::SeqCst)),
        }
    }

    async fn bearer_context_modification(
        &self,
        _request: &BearerContextModificationRequest,
    ) -> BearerContextModificationResponse {
        self.bearer_context_modifications.fetch_add(1, Ordering::SeqCst);
        BearerContextModificationResponse {
            success: self.accept_bearer_context_modification.load(Ordering::SeqCst),
        }
    }

    async fn bearer_context_release(&self, _command: &BearerContextReleaseCommand) -> bool {
        self.releases.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[async_trait]
impl F1apUeContextManager for MockCuCpPeers {
    async fn ue_context_modification(&self, request: &UeContextModificationRequest) -> UeContextModificationResponse {
        self.ue_context_modifications.fetch_add(1, Ordering::SeqCst);
        let success = self.accept_ue_context_modification.load(Ordering::SeqCst);
        let mut drbs_setup = if success { request.drbs_to_setup.clone() } else { Vec::new() };
        if self.drop_last_drb.load(Ordering::SeqCst) {
            drbs_setup.pop();
        }
        UeContextModificationResponse { success, drbs_setup }
    }
}

#[async_trait]
impl RrcUeReconfigurationNotifier for MockCuCpPeers {
    async fn rrc_reconfiguration(&self, _request: &RrcReconfigurationRequest) -> bool {
        self.rrc_reconfigurations.fetch_add(1, Ordering::SeqCst);
        self.accept_rrc_reconfiguration.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Notifiers
// ============================================================================

/// MAC completion recorded by [`RecordingMacNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacCompletion {
    /// UE creation finished
    Created(MacUeCreateResponse),
    /// UE deletion finished
    Deleted(MacUeDeleteResponse),
    /// UE reconfiguration finished
    Reconfigured(MacUeReconfigurationResponse),
}

/// Forwards MAC completions to a channel.
pub struct RecordingMacNotifier {
    tx: mpsc::UnboundedSender<MacCompletion>,
}

impl RecordingMacNotifier {
    /// Creates the notifier and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MacCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MacCtrlNotifier for RecordingMacNotifier {
    fn on_ue_create_request_complete(&self, response: MacUeCreateResponse) {
        let _ = self.tx.send(MacCompletion::Created(response));
    }

    fn on_ue_delete_complete(&self, response: MacUeDeleteResponse) {
        let _ = self.tx.send(MacCompletion::Deleted(response));
    }

    fn on_ue_reconfiguration_complete(&self, response: MacUeReconfigurationResponse) {
        let _ = self.tx.send(MacCompletion::Reconfigured(response));
    }
}

/// Forwards PDU session setup reports to a channel.
pub struct RecordingNgapNotifier {
    tx: mpsc::UnboundedSender<PduSessionResourceSetupResponse>,
}

impl RecordingNgapNotifier {
    /// Creates the notifier and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PduSessionResourceSetupResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NgapPduSessionNotifier for RecordingNgapNotifier {
    fn on_pdu_session_resource_setup_response(&self, response: PduSessionResourceSetupResponse) {
        let _ = self.tx.send(response);
    }
}

// ============================================================================
// Harnesses
// ============================================================================

/// MAC control component wired to mock units.
pub struct MacHarness {
    /// Component under test
    pub mac: MacCtrl,
    /// UL unit
    pub ul: Arc<MockMacConfigurator>,
    /// DL unit
    pub dl: Arc<MockMacConfigurator>,
    /// Completions in delivery order
    pub completions: mpsc::UnboundedReceiver<MacCompletion>,
}

impl MacHarness {
    /// Harness with units accepting everything immediately.
    pub fn new(config: MacCtrlConfig) -> Self {
        Self::with_units(config, MockMacConfigurator::new(), MockMacConfigurator::new())
    }

    /// Harness with the given units.
    pub fn with_units(config: MacCtrlConfig, ul: MockMacConfigurator, dl: MockMacConfigurator) -> Self {
        let ul = Arc::new(ul);
        let dl = Arc::new(dl);
        let (notifier, completions) = RecordingMacNotifier::new();
        let mac = MacCtrl::new(config, ul.clone(), dl.clone(), Arc::new(notifier));
        Self {
            mac,
            ul,
            dl,
            completions,
        }
    }

    /// Next completion, failing the test after the default timeout.
    pub async fn next_completion(&mut self) -> MacCompletion {
        recv_within(&mut self.completions).await.unwrap()
    }

    /// Sends a creation request and waits for its completion.
    pub async fn create(&mut self, request: MacUeCreateRequest) -> MacUeCreateResponse {
        self.mac.ue_create_request(request);
        match self.next_completion().await {
            MacCompletion::Created(response) => response,
            other => panic!("expected creation completion, got {other:?}"),
        }
    }

    /// Sends a deletion request and waits for its completion.
    pub async fn delete(&mut self, request: MacUeDeleteRequest) -> MacUeDeleteResponse {
        self.mac.ue_delete_request(request);
        match self.next_completion().await {
            MacCompletion::Deleted(response) => response,
            other => panic!("expected deletion completion, got {other:?}"),
        }
    }

    /// Sends a reconfiguration request and waits for its completion.
    pub async fn reconfigure(&mut self, request: MacUeReconfigurationRequest) -> MacUeReconfigurationResponse {
        self.mac.ue_reconfiguration_request(request);
        match self.next_completion().await {
            MacCompletion::Reconfigured(response) => response,
            other => panic!("expected reconfiguration completion, got {other:?}"),
        }
    }
}

/// CU-CP UE manager wired to mock peers.
pub struct CuCpHarness {
    /// Component under test
    pub ue_mng: CuCpUeManager,
    /// E1AP, F1AP and RRC collaborators
    pub peers: Arc<MockCuCpPeers>,
    /// Reports in delivery order
    pub reports: mpsc::UnboundedReceiver<PduSessionResourceSetupResponse>,
}

impl CuCpHarness {
    /// Harness with peers accepting everything immediately.
    pub fn new(max_nof_ues: usize) -> Self {
        Self::with_peers(max_nof_ues, MockCuCpPeers::new())
    }

    /// Harness with the given peers.
    pub fn with_peers(max_nof_ues: usize, peers: MockCuCpPeers) -> Self {
        let peers = Arc::new(peers);
        let (notifier, reports) = RecordingNgapNotifier::new();
        let routine_mng = RoutineManager::new(peers.clone(), peers.clone(), peers.clone());
        let ue_mng = CuCpUeManager::new(max_nof_ues, routine_mng, Arc::new(notifier));
        Self {
            ue_mng,
            peers,
            reports,
        }
    }

    /// Creates CU-CP UE `i`.
    pub fn add_ue(&self, i: u32) {
        self.ue_mng.add_ue(CuCpUeIndex(i)).unwrap();
    }

    /// Next report, failing the test after the default timeout.
    pub async fn next_report(&mut self) -> PduSessionResourceSetupResponse {
        recv_within(&mut self.reports).await.unwrap()
    }

    /// Sends a setup request and waits for its report.
    pub async fn setup(&mut self, request: PduSessionResourceSetupRequest) -> PduSessionResourceSetupResponse {
        self.ue_mng.handle_pdu_session_resource_setup_request(request);
        self.next_report().await
    }
}
