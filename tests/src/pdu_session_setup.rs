//! PDU Session Resource Setup integration tests
//!
//! Runs the setup routine through `CuCpUeManager` against mock E1AP, F1AP and
//! RRC collaborators, rejecting one step at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use integration_tests::{
    init_test_logging, setup_request, stays_quiet, wait_for_condition, CuCpHarness, MockCuCpPeers,
    DEFAULT_POLL_INTERVAL, DEFAULT_TEST_TIMEOUT, TEST_MAX_NOF_UES,
};
use ranproc_common::{CuCpUeIndex, DrbId, PduSessionId};
use ranproc_cucp::{
    CuCpError, PduSessionResourceSetupResponse, RoutineManager, SetupCompletion,
    SetupFailureCause, SetupStep,
};

fn assert_all_failed(response: &PduSessionResourceSetupResponse, ids: &[u8], cause: SetupFailureCause) {
    assert!(response.setup_items.is_empty(), "unexpected setup items: {response:?}");
    let failed: Vec<u8> = response.failed_items.iter().map(|i| i.pdu_session_id.0).collect();
    assert_eq!(failed, ids);
    assert!(response.failed_items.iter().all(|i| i.cause == cause));
}

// ============================================================================
// Routine outcomes
// ============================================================================

#[tokio::test]
async fn test_empty_request_completes_immediately() {
    init_test_logging();
    let peers = Arc::new(MockCuCpPeers::new());
    let routine_mng = RoutineManager::new(peers.clone(), peers.clone(), peers.clone());

    let task = routine_mng.start_pdu_session_resource_setup_routine(setup_request(0, &[]), &BTreeMap::new());
    assert!(task.is_ready());
    let response = task.into_result().expect("ready task has a result");
    assert!(response.setup_items.is_empty());
    assert!(response.failed_items.is_empty());
    assert_eq!(response.completion, SetupCompletion::NotStarted);
    assert_eq!(peers.nof_calls(), 0);
}

#[tokio::test]
async fn test_all_steps_succeed() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[1, 2, 5])).await;
    assert!(response.is_success());
    assert!(response.failed_items.is_empty());
    assert_eq!(response.completion, SetupCompletion::Applied);
    let setup: Vec<(u8, u8)> = response
        .setup_items
        .iter()
        .map(|i| (i.pdu_session_id.0, i.drb_id.0))
        .collect();
    assert_eq!(setup, vec![(1, 1), (2, 2), (5, 3)]);

    assert_eq!(h.peers.nof_bearer_context_setups(), 1);
    assert_eq!(h.peers.nof_ue_context_modifications(), 1);
    assert_eq!(h.peers.nof_bearer_context_modifications(), 1);
    assert_eq!(h.peers.nof_rrc_reconfigurations(), 1);

    let ctx = h.ue_mng.find_ue(CuCpUeIndex(0)).unwrap();
    assert_eq!(ctx.pdu_session_count(), 3);
    assert_eq!(ctx.pdu_sessions.get(&PduSessionId(5)), Some(&DrbId(3)));
}

#[tokio::test]
async fn test_reservation_rejected_contacts_nobody_else() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.peers.set_accept_bearer_context_setup(false);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[1, 2])).await;
    assert_all_failed(&response, &[1, 2], SetupFailureCause::ReservationRejected);
    assert_eq!(
        response.completion,
        SetupCompletion::Failed {
            step: SetupStep::BearerContextSetup,
            rolled_back: false
        }
    );
    assert_eq!(h.peers.nof_bearer_context_setups(), 1);
    assert_eq!(h.peers.nof_ue_context_modifications(), 0);
    assert_eq!(h.peers.nof_bearer_context_modifications(), 0);
    assert_eq!(h.peers.nof_rrc_reconfigurations(), 0);
    assert_eq!(h.ue_mng.find_ue(CuCpUeIndex(0)).unwrap().pdu_session_count(), 0);
}

#[tokio::test]
async fn test_peer_modification_rejected_releases_reservation() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.peers.set_accept_ue_context_modification(false);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[1, 2])).await;
    assert_all_failed(&response, &[1, 2], SetupFailureCause::PeerModificationRejected);
    assert_eq!(
        response.completion,
        SetupCompletion::Failed {
            step: SetupStep::UeContextModification,
            rolled_back: true
        }
    );
    assert_eq!(h.peers.nof_bearer_context_modifications(), 0);
    assert_eq!(h.peers.nof_rrc_reconfigurations(), 0);

    let peers = h.peers.clone();
    wait_for_condition(
        || {
            let peers = peers.clone();
            async move { peers.nof_releases() == 1 }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("reservation should be released");
}

#[tokio::test]
async fn test_partial_drb_setup_treated_as_peer_rejection() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.peers.set_drop_last_drb(true);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[1, 2])).await;
    assert_all_failed(&response, &[1, 2], SetupFailureCause::PeerModificationRejected);
    assert_eq!(
        response.completion,
        SetupCompletion::Failed {
            step: SetupStep::UeContextModification,
            rolled_back: true
        }
    );
    assert_eq!(response.bearer_context, None);
    assert_eq!(h.peers.nof_bearer_context_modifications(), 0);
    assert_eq!(h.peers.nof_rrc_reconfigurations(), 0);
    assert_eq!(h.ue_mng.find_ue(CuCpUeIndex(0)).unwrap().pdu_session_count(), 0);

    let peers = h.peers.clone();
    wait_for_condition(
        || {
            let peers = peers.clone();
            async move { peers.nof_releases() == 1 }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("reservation should be released");
}

#[tokio::test]
async fn test_commit_rejected() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.peers.set_accept_bearer_context_modification(false);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[4])).await;
    assert_all_failed(&response, &[4], SetupFailureCause::CommitRejected);
    assert_eq!(
        response.completion,
        SetupCompletion::Failed {
            step: SetupStep::BearerContextModification,
            rolled_back: false
        }
    );
    assert_eq!(h.peers.nof_rrc_reconfigurations(), 0);
    assert_eq!(h.peers.nof_releases(), 0);
    assert!(response.bearer_context.is_some());
}

#[tokio::test]
async fn test_reservation_kept_after_commit_released_with_ue() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.peers.set_accept_bearer_context_modification(false);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[1])).await;
    let bearer_context = response.bearer_context.expect("reservation kept by the CU-UP");
    assert_eq!(
        h.ue_mng.find_ue(CuCpUeIndex(0)).unwrap().bearer_contexts,
        vec![bearer_context]
    );
    assert_eq!(h.peers.nof_releases(), 0);

    let removal = h.ue_mng.remove_ue(CuCpUeIndex(0)).unwrap();
    tokio::time::timeout(DEFAULT_TEST_TIMEOUT, removal).await.unwrap();

    let peers = h.peers.clone();
    wait_for_condition(
        || {
            let peers = peers.clone();
            async move { peers.nof_releases() == 1 }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("bearer context should be released with the UE");
    assert_eq!(h.peers.nof_bearer_context_setups(), 1);
}

#[tokio::test]
async fn test_radio_reconfiguration_rejected_after_three_successes() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.peers.set_accept_rrc_reconfiguration(false);
    h.add_ue(0);

    let response = h.setup(setup_request(0, &[1, 2, 3])).await;
    assert_all_failed(&response, &[1, 2, 3], SetupFailureCause::RadioReconfigurationRejected);
    assert_eq!(h.peers.nof_bearer_context_setups(), 1);
    assert_eq!(h.peers.nof_ue_context_modifications(), 1);
    assert_eq!(h.peers.nof_bearer_context_modifications(), 1);
    assert_eq!(h.peers.nof_rrc_reconfigurations(), 1);
    assert_eq!(h.ue_mng.find_ue(CuCpUeIndex(0)).unwrap().pdu_session_count(), 0);
}

#[tokio::test]
async fn test_invalid_items_fail_individually() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.add_ue(0);
    assert!(h.setup(setup_request(0, &[1])).await.is_success());

    let response = h.setup(setup_request(0, &[1, 2, 2, 3])).await;
    assert_eq!(response.completion, SetupCompletion::Applied);
    assert_eq!(
        response.failure_cause(PduSessionId(1)),
        Some(SetupFailureCause::PduSessionIdAlreadyInUse)
    );
    let duplicated = response
        .failed_items
        .iter()
        .filter(|i| i.pdu_session_id == PduSessionId(2))
        .count();
    assert_eq!(duplicated, 2);
    assert_eq!(
        response.failure_cause(PduSessionId(2)),
        Some(SetupFailureCause::MultiplePduSessionIdInstances)
    );
    let setup: Vec<(u8, u8)> = response
        .setup_items
        .iter()
        .map(|i| (i.pdu_session_id.0, i.drb_id.0))
        .collect();
    assert_eq!(setup, vec![(3, 2)]);
    assert_eq!(h.ue_mng.find_ue(CuCpUeIndex(0)).unwrap().pdu_session_count(), 2);
}

// ============================================================================
// UE manager
// ============================================================================

#[tokio::test]
async fn test_unknown_ue_reported_without_contacting_peers() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);

    let response = h.setup(setup_request(3, &[1, 2])).await;
    assert_eq!(response.ue_index, CuCpUeIndex(3));
    assert_all_failed(&response, &[1, 2], SetupFailureCause::UnknownUe);
    assert_eq!(h.peers.nof_calls(), 0);
}

#[tokio::test]
async fn test_ue_being_removed_is_unavailable() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    h.add_ue(0);

    let removal = h.ue_mng.remove_ue(CuCpUeIndex(0)).unwrap();
    assert_eq!(
        h.ue_mng.remove_ue(CuCpUeIndex(0)).unwrap_err(),
        CuCpError::RemovalPending(CuCpUeIndex(0))
    );
    let response = h.setup(setup_request(0, &[1])).await;
    assert_all_failed(&response, &[1], SetupFailureCause::UeUnavailable);

    tokio::time::timeout(DEFAULT_TEST_TIMEOUT, removal).await.unwrap();
    assert!(h.ue_mng.find_ue(CuCpUeIndex(0)).is_none());
    let response = h.setup(setup_request(0, &[1])).await;
    assert_all_failed(&response, &[1], SetupFailureCause::UnknownUe);
}

#[tokio::test]
async fn test_add_ue_bounds_and_duplicates() {
    init_test_logging();
    let h = CuCpHarness::new(2);
    h.add_ue(0);

    assert_eq!(
        h.ue_mng.add_ue(CuCpUeIndex(0)).unwrap_err(),
        CuCpError::DuplicateUe(CuCpUeIndex(0))
    );
    assert!(matches!(
        h.ue_mng.add_ue(CuCpUeIndex(2)).unwrap_err(),
        CuCpError::UeIndexOutOfRange { .. }
    ));
    assert_eq!(h.ue_mng.nof_ues(), 1);
}

#[tokio::test]
async fn test_setups_for_one_ue_are_serialized() {
    init_test_logging();
    let mut h = CuCpHarness::with_peers(TEST_MAX_NOF_UES, MockCuCpPeers::gated());
    h.add_ue(0);

    h.ue_mng.handle_pdu_session_resource_setup_request(setup_request(0, &[1]));
    h.ue_mng.handle_pdu_session_resource_setup_request(setup_request(0, &[1]));

    let peers = h.peers.clone();
    wait_for_condition(
        || {
            let peers = peers.clone();
            async move { peers.nof_bearer_context_setups() == 1 }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();
    assert!(stays_quiet(&mut h.reports).await);
    assert_eq!(h.peers.nof_bearer_context_setups(), 1);

    h.peers.release(1);
    let first = h.next_report().await;
    assert!(first.is_success());

    // The second request sees the session established by the first
    let second = h.next_report().await;
    assert_all_failed(&second, &[1], SetupFailureCause::PduSessionIdAlreadyInUse);
    assert_eq!(second.completion, SetupCompletion::NotStarted);
    assert_eq!(h.peers.nof_bearer_context_setups(), 1);
}

#[tokio::test]
async fn test_each_request_reported_once() {
    init_test_logging();
    let mut h = CuCpHarness::new(TEST_MAX_NOF_UES);
    for i in 0..4 {
        h.add_ue(i);
    }
    for i in 0..4 {
        h.ue_mng
            .handle_pdu_session_resource_setup_request(setup_request(i, &[1, 2]));
    }

    let mut seen = Vec::new();
    for _ in 0..4 {
        let report = h.next_report().await;
        assert!(report.is_success());
        seen.push(report.ue_index.0);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert!(stays_quiet(&mut h.reports).await);
}
