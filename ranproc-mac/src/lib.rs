//! MAC control plane for ranproc
//!
//! The [`MacCtrl`] component owns the table of MAC UEs and the C-RNTI map, and
//! runs UE creation, deletion and reconfiguration as procedures on a
//! per-UE [`CtrlLoop`](ranproc_tasks::CtrlLoop):
//!
//! - **Creation**: UL unit add, DL unit add (UL rollback on DL rejection)
//! - **Deletion**: UL and DL unit removal, then erase after the loop drains
//! - **Reconfiguration**: UL then DL logical channel change
//!
//! Lower-layer units are reached through [`MacUeConfigurator`] and the verdict
//! of every request is delivered once through [`MacCtrlNotifier`].

pub mod configurator;
pub mod error;
pub mod mac_ctrl;
pub mod messages;
pub mod procedures;
pub mod rnti_table;
pub mod ue_context;
mod ue_repository;

pub use configurator::{MacCtrlNotifier, MacUeConfigurator};
pub use error::MacCtrlError;
pub use mac_ctrl::{MacCtrl, MacCtrlConfig};
pub use messages::{
    MacUeCreateRequest, MacUeCreateResponse, MacUeDeleteRequest, MacUeDeleteResponse,
    MacUeOutcome, MacUeReconfigurationRequest, MacUeReconfigurationResponse,
};
pub use rnti_table::RntiTable;
pub use ue_context::{MacUeContext, MacUePhase};
