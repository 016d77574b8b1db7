//! UE lifecycle scenario
//!
//! Drives the MAC control component and the CU-CP UE manager through a full
//! lifecycle for every simulated UE:
//!
//! 1. MAC UE creation
//! 2. PDU session resource setup
//! 3. MAC logical channel reconfiguration
//! 4. MAC UE deletion and CU-CP UE removal
//!
//! Every request must be answered exactly once and all tables must be empty
//! at the end. [`ScenarioSummary::inconsistencies`] lists what went wrong.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ranproc_common::{
    CellIndex, CuCpUeIndex, DuUeIndex, Lcid, PduSessionId, ProcConfig, Rnti, SNssai, SimRejectStep,
};
use ranproc_cucp::{
    CuCpUeManager, PduSessionResourceSetupRequest, PduSessionResourceSetupResponse,
    PduSessionSetupItem, RoutineManager,
};
use ranproc_mac::{
    MacCtrl, MacCtrlConfig, MacUeCreateRequest, MacUeDeleteRequest, MacUeReconfigurationRequest,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::loopback::{
    ChannelMacNotifier, ChannelNgapNotifier, LoopbackMacUnit, LoopbackPeers, MacEvent,
    UnitDirection,
};

/// Upper bound for any single completion to arrive.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Logical channel added by the reconfiguration phase.
const SIM_DRB_LCID: Lcid = Lcid(4);

// ============================================================================
// Summary
// ============================================================================

/// Counters collected over one scenario run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioSummary {
    /// Collaborator step configured to reject
    pub reject_step: SimRejectStep,
    /// UE creations requested
    pub ues_requested: usize,
    /// UE creations that succeeded
    pub ues_created: usize,
    /// PDU sessions requested across all created UEs
    pub sessions_requested: usize,
    /// PDU sessions reported as set up
    pub sessions_setup: usize,
    /// PDU sessions reported as failed
    pub sessions_failed: usize,
    /// PDU sessions found in the CU-CP UE contexts after setup
    pub sessions_recorded: usize,
    /// Reconfigurations that succeeded
    pub ues_reconfigured: usize,
    /// Deletions that succeeded
    pub ues_deleted: usize,
    /// Bearer context releases seen by the CU-UP
    pub bearer_releases: usize,
    /// MAC UEs left after the run
    pub residual_mac_ues: usize,
    /// CU-CP UEs left after the run
    pub residual_cucp_ues: usize,
    /// UEs left configured in the UL and DL units
    pub residual_unit_ues: usize,
}

impl ScenarioSummary {
    /// Lists every deviation from the outcome expected for `reject_step`.
    pub fn inconsistencies(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mac_rejects = matches!(self.reject_step, SimRejectStep::MacUl | SimRejectStep::MacDl);
        let expected_created = if mac_rejects { 0 } else { self.ues_requested };
        if self.ues_created != expected_created {
            problems.push(format!(
                "{} UEs created, expected {}",
                self.ues_created, expected_created
            ));
        }

        if self.sessions_setup + self.sessions_failed != self.sessions_requested {
            problems.push(format!(
                "{} sessions reported for {} requested",
                self.sessions_setup + self.sessions_failed,
                self.sessions_requested
            ));
        }
        let setup_rejects = !mac_rejects && self.reject_step != SimRejectStep::None;
        let expected_setup = if setup_rejects { 0 } else { self.sessions_requested };
        if self.sessions_setup != expected_setup {
            problems.push(format!(
                "{} sessions set up, expected {}",
                self.sessions_setup, expected_setup
            ));
        }
        if self.sessions_recorded != self.sessions_setup {
            problems.push(format!(
                "{} sessions recorded in UE contexts, {} reported",
                self.sessions_recorded, self.sessions_setup
            ));
        }
        if self.bearer_releases != self.expected_bearer_releases() {
            problems.push(format!(
                "{} bearer context releases, expected {}",
                self.bearer_releases,
                self.expected_bearer_releases()
            ));
        }

        if self.ues_reconfigured != self.ues_created {
            problems.push(format!(
                "{} UEs reconfigured out of {}",
                self.ues_reconfigured, self.ues_created
            ));
        }
        if self.ues_deleted != self.ues_created {
            problems.push(format!(
                "{} UEs deleted out of {}",
                self.ues_deleted, self.ues_created
            ));
        }

        for (what, residual) in [
            ("MAC", self.residual_mac_ues),
            ("CU-CP", self.residual_cucp_ues),
            ("MAC unit", self.residual_unit_ues),
        ] {
            if residual != 0 {
                problems.push(format!("{residual} {what} UEs left after deletion"));
            }
        }
        problems
    }

    /// Every UE whose reservation succeeded ends with one release, either
    /// after a DU rejection or when the UE is removed.
    pub fn expected_bearer_releases(&self) -> usize {
        match self.reject_step {
            SimRejectStep::BearerContextSetup => 0,
            _ => self.ues_created,
        }
    }

    /// Returns true when the run matched the expected outcome.
    pub fn is_consistent(&self) -> bool {
        self.inconsistencies().is_empty()
    }
}

impl fmt::Display for ScenarioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reject step:        {}", self.reject_step)?;
        writeln!(f, "UEs created:        {}/{}", self.ues_created, self.ues_requested)?;
        writeln!(
            f,
            "PDU sessions:       {} set up, {} failed ({} requested)",
            self.sessions_setup, self.sessions_failed, self.sessions_requested
        )?;
        writeln!(f, "Sessions recorded:  {}", self.sessions_recorded)?;
        writeln!(f, "Bearer releases:    {}", self.bearer_releases)?;
        writeln!(f, "UEs reconfigured:   {}", self.ues_reconfigured)?;
        writeln!(f, "UEs deleted:        {}", self.ues_deleted)?;
        write!(
            f,
            "Residual UEs:       MAC={} CU-CP={} units={}",
            self.residual_mac_ues, self.residual_cucp_ues, self.residual_unit_ues
        )
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Wired-up components and the receiving ends of their notifiers.
pub struct Scenario {
    config: ProcConfig,
    mac: MacCtrl,
    cucp: CuCpUeManager,
    ul_unit: Arc<LoopbackMacUnit>,
    dl_unit: Arc<LoopbackMacUnit>,
    peers: Arc<LoopbackPeers>,
    mac_rx: mpsc::UnboundedReceiver<MacEvent>,
    ngap_rx: mpsc::UnboundedReceiver<PduSessionResourceSetupResponse>,
    summary: ScenarioSummary,
}

impl Scenario {
    /// Builds the components with loopback collaborators.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ProcConfig) -> Self {
        let sim = &config.sim;
        let latency = Duration::from_millis(sim.collaborator_latency_ms);

        let ul_unit = Arc::new(LoopbackMacUnit::new(UnitDirection::Ul, sim.reject_step, latency));
        let dl_unit = Arc::new(LoopbackMacUnit::new(UnitDirection::Dl, sim.reject_step, latency));
        let (mac_notifier, mac_rx) = ChannelMacNotifier::new();
        let mac = MacCtrl::new(
            MacCtrlConfig::from(&config),
            ul_unit.clone(),
            dl_unit.clone(),
            Arc::new(mac_notifier),
        );

        let peers = Arc::new(LoopbackPeers::new(sim.reject_step, latency));
        let (ngap_notifier, ngap_rx) = ChannelNgapNotifier::new();
        let cucp = CuCpUeManager::new(
            config.max_nof_ues,
            RoutineManager::new(peers.clone(), peers.clone(), peers.clone()),
            Arc::new(ngap_notifier),
        );

        let summary = ScenarioSummary {
            reject_step: sim.reject_step,
            ..ScenarioSummary::default()
        };

        Self {
            config,
            mac,
            cucp,
            ul_unit,
            dl_unit,
            peers,
            mac_rx,
            ngap_rx,
            summary,
        }
    }

    /// Runs every phase and returns the collected counters.
    pub async fn run(mut self) -> Result<ScenarioSummary> {
        let ues = self.create_ues().await.context("UE creation phase")?;
        self.setup_sessions(&ues).await.context("PDU session setup phase")?;
        self.reconfigure_ues(&ues).await.context("reconfiguration phase")?;
        self.delete_ues(&ues).await.context("deletion phase")?;
        self.wait_for_releases().await;

        self.mac.stop().await;
        self.summary.residual_mac_ues = self.mac.nof_ues();
        self.summary.residual_cucp_ues = self.cucp.nof_ues();
        self.summary.residual_unit_ues = self.ul_unit.nof_ues() + self.dl_unit.nof_ues();
        Ok(self.summary)
    }

    async fn next_mac_event(&mut self) -> Result<MacEvent> {
        tokio::time::timeout(RESPONSE_TIMEOUT, self.mac_rx.recv())
            .await
            .context("timed out waiting for a MAC completion")?
            .context("MAC notifier closed")
    }

    async fn next_setup_report(&mut self) -> Result<PduSessionResourceSetupResponse> {
        tokio::time::timeout(RESPONSE_TIMEOUT, self.ngap_rx.recv())
            .await
            .context("timed out waiting for a PDU session setup report")?
            .context("NGAP notifier closed")
    }

    async fn create_ues(&mut self) -> Result<Vec<(DuUeIndex, Rnti)>> {
        let nof_ues = self.config.sim.nof_ues;
        let nof_cells = self.config.nof_cells.max(1);
        self.summary.ues_requested = nof_ues;
        info!(nof_ues, "Creating UEs");

        let mut rntis = Vec::with_capacity(nof_ues);
        for i in 0..nof_ues {
            let ue_index = DuUeIndex::new(i as u16);
            let crnti = Rnti::new(Rnti::MIN_CRNTI.value().wrapping_add(i as u16));
            let cell_index = CellIndex((i % nof_cells) as u8);
            rntis.push((ue_index, crnti));
            self.mac
                .ue_create_request(MacUeCreateRequest::new(ue_index, crnti, cell_index));
        }

        let mut created = Vec::new();
        for _ in 0..nof_ues {
            match self.next_mac_event().await? {
                MacEvent::Created(response) if response.outcome.is_success() => {
                    created.push(response.ue_index)
                }
                MacEvent::Created(response) => {
                    warn!(ue_index = %response.ue_index, "UE creation failed: {:?}", response.outcome)
                }
                other => bail!("unexpected MAC event during creation: {other:?}"),
            }
        }
        self.summary.ues_created = created.len();

        Ok(rntis
            .into_iter()
            .filter(|(ue_index, _)| created.contains(ue_index))
            .collect())
    }

    async fn setup_sessions(&mut self, ues: &[(DuUeIndex, Rnti)]) -> Result<()> {
        let sessions_per_ue = self.config.sim.sessions_per_ue;
        info!(nof_ues = ues.len(), sessions_per_ue, "Setting up PDU sessions");

        for (ue_index, _) in ues {
            let cucp_index = CuCpUeIndex(u32::from(*ue_index));
            self.cucp
                .add_ue(cucp_index)
                .with_context(|| format!("adding CU-CP UE {cucp_index}"))?;

            let request = (1..=sessions_per_ue).fold(
                PduSessionResourceSetupRequest::new(cucp_index),
                |request, psi| {
                    request.with_item(PduSessionSetupItem::new(PduSessionId(psi as u8), SNssai::new(1)))
                },
            );
            self.summary.sessions_requested += request.items.len();
            self.cucp.handle_pdu_session_resource_setup_request(request);
        }

        for _ in ues {
            let report = self.next_setup_report().await?;
            debug!(
                ue_index = %report.ue_index,
                setup = report.setup_items.len(),
                failed = report.failed_items.len(),
                "PDU session setup report"
            );
            self.summary.sessions_setup += report.setup_items.len();
            self.summary.sessions_failed += report.failed_items.len();
        }

        self.summary.sessions_recorded = ues
            .iter()
            .filter_map(|(ue_index, _)| self.cucp.find_ue(CuCpUeIndex(u32::from(*ue_index))))
            .map(|ctx| ctx.pdu_session_count())
            .sum();
        Ok(())
    }

    async fn reconfigure_ues(&mut self, ues: &[(DuUeIndex, Rnti)]) -> Result<()> {
        info!(nof_ues = ues.len(), lcid = %SIM_DRB_LCID, "Reconfiguring UEs");
        for (ue_index, crnti) in ues {
            self.mac.ue_reconfiguration_request(MacUeReconfigurationRequest {
                ue_index: *ue_index,
                crnti: *crnti,
                lcids_to_add: vec![SIM_DRB_LCID],
                lcids_to_remove: Vec::new(),
            });
        }

        for _ in ues {
            match self.next_mac_event().await? {
                MacEvent::Reconfigured(response) if response.outcome.is_success() => {
                    self.summary.ues_reconfigured += 1
                }
                MacEvent::Reconfigured(response) => {
                    warn!(ue_index = %response.ue_index, "UE reconfiguration failed: {:?}", response.outcome)
                }
                other => bail!("unexpected MAC event during reconfiguration: {other:?}"),
            }
        }
        Ok(())
    }

    async fn delete_ues(&mut self, ues: &[(DuUeIndex, Rnti)]) -> Result<()> {
        info!(nof_ues = ues.len(), "Deleting UEs");
        let mut removals = Vec::with_capacity(ues.len());
        for (ue_index, rnti) in ues {
            self.mac.ue_delete_request(MacUeDeleteRequest {
                ue_index: *ue_index,
                rnti: *rnti,
            });
            let cucp_index = CuCpUeIndex(u32::from(*ue_index));
            removals.push(
                self.cucp
                    .remove_ue(cucp_index)
                    .with_context(|| format!("removing CU-CP UE {cucp_index}"))?,
            );
        }

        for _ in ues {
            match self.next_mac_event().await? {
                MacEvent::Deleted(response) if response.outcome.is_success() => {
                    self.summary.ues_deleted += 1
                }
                MacEvent::Deleted(response) => {
                    warn!(ue_index = %response.ue_index, "UE deletion failed: {:?}", response.outcome)
                }
                other => bail!("unexpected MAC event during deletion: {other:?}"),
            }
        }
        for removal in removals {
            tokio::time::timeout(RESPONSE_TIMEOUT, removal)
                .await
                .context("timed out waiting for CU-CP UE removal")?;
        }
        Ok(())
    }

    /// Bearer context releases run detached; give them a bounded chance to
    /// land before counting.
    async fn wait_for_releases(&mut self) {
        let expected = self.summary.expected_bearer_releases();
        let deadline = tokio::time::Instant::now() + RESPONSE_TIMEOUT;
        while self.peers.nof_releases() < expected && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.summary.bearer_releases = self.peers.nof_releases();
    }
}
