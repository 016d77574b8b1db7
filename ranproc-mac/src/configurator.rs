//! Interfaces between the MAC control component and its neighbours.

use async_trait::async_trait;

use crate::messages::{
    MacUeCreateRequest, MacUeCreateResponse, MacUeDeleteRequest, MacUeDeleteResponse,
    MacUeReconfigurationRequest, MacUeReconfigurationResponse,
};

/// Lower-layer unit (MAC UL or MAC DL) that holds per-UE configuration.
///
/// Each call resolves to `true` when the unit applied the change.
#[async_trait]
pub trait MacUeConfigurator: Send + Sync {
    /// Adds the UE.
    async fn add_ue(&self, request: &MacUeCreateRequest) -> bool;

    /// Removes the UE.
    async fn remove_ue(&self, request: &MacUeDeleteRequest) -> bool;

    /// Applies a logical channel change.
    async fn reconfigure_ue(&self, request: &MacUeReconfigurationRequest) -> bool;
}

/// Upward notifier (towards the DU manager).
///
/// Called exactly once per request handled by the control component.
pub trait MacCtrlNotifier: Send + Sync {
    /// Creation finished or was refused.
    fn on_ue_create_request_complete(&self, response: MacUeCreateResponse);

    /// Deletion finished or was refused.
    fn on_ue_delete_complete(&self, response: MacUeDeleteResponse);

    /// Reconfiguration finished or was refused.
    fn on_ue_reconfiguration_complete(&self, response: MacUeReconfigurationResponse);
}
