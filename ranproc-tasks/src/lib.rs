//! Task primitives for the ranproc procedure engine
//!
//! - [`AsyncTask`]: a computation producing exactly one result, awaitable from
//!   inside other tasks and probeable without an executor.
//! - [`CtrlLoop`]: a per-entity FIFO executor guaranteeing that at most one
//!   [`LoopProcedure`] runs at a time, with a graceful stop-and-drain.

pub mod async_task;
pub mod ctrl_loop;

pub use async_task::AsyncTask;
pub use ctrl_loop::{CtrlLoop, LoopMessage, LoopProcedure, LoopState, ScheduleError};
