//! Integration test framework for ranproc
//!
//! This crate provides mock collaborators, fixtures and utilities for
//! integration testing of the MAC and CU-CP procedure engines.
//!
//! # Components
//!
//! - [`mocks`] - Mock MAC units, CU-CP peers, recording notifiers and harnesses
//! - [`test_fixtures`] - Common configuration and request builders
//! - [`test_utils`] - Utility functions for test setup and waiting
//!
//! # Test Categories
//!
//! 1. **MAC procedure tests** - UE create/delete/reconfigure through `MacCtrl`
//! 2. **PDU session setup tests** - Routine outcomes per rejected step
//! 3. **Control loop tests** - Ordering and stop semantics across crates
//! 4. **Multi-UE tests** - Independent UEs progressing concurrently

pub mod mocks;
pub mod test_utils;

pub use mocks::{
    CuCpHarness, MacCompletion, MacHarness, MacUnitCall, MockCuCpPeers, MockMacConfigurator,
    RecordingMacNotifier, RecordingNgapNotifier,
};
pub use test_fixtures::{
    add_drb_request, create_request, crnti, delete_request, setup_request, test_mac_config,
    test_proc_config, ue, TEST_DRB_LCID, TEST_MAX_NOF_UES, TEST_NOF_CELLS, TEST_S_NSSAI,
};
pub use test_utils::{
    init_test_logging, recv_within, stays_quiet, wait_for_condition, TestResult,
    DEFAULT_POLL_INTERVAL, DEFAULT_TEST_TIMEOUT, QUIET_PERIOD,
};
