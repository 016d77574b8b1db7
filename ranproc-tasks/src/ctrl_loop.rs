//! Per-UE serialized control loop.
//!
//! A [`CtrlLoop`] owns a FIFO of procedures for one UE and runs them one at a
//! time on a dedicated tokio task. A procedure runs to completion, including
//! every collaborator await, before the next one starts.
//!
//! # Loop Lifecycle
//!
//! 1. **Running**: procedures are accepted and executed in submission order
//! 2. **Stopping**: a stop was requested; queued procedures still drain
//! 3. **Stopped**: every procedure scheduled before the stop has finished
//!
//! The only cancellation primitive is [`CtrlLoop::request_stop`]: no new work
//! is accepted and the returned task completes once the queue is drained.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use crate::async_task::AsyncTask;

// ============================================================================
// Procedure trait
// ============================================================================

/// A unit of work executed by a [`CtrlLoop`].
///
/// Implementors are usually enums with one variant per procedure kind, so a
/// single loop type drives every procedure of an entity.
#[async_trait]
pub trait LoopProcedure: Send + 'static {
    /// Procedure name, used in logs.
    fn name(&self) -> &'static str;

    /// Runs the procedure to completion.
    async fn run(self);
}

// ============================================================================
// Loop message envelope
// ============================================================================

/// Message envelope accepted by the loop task.
#[derive(Debug)]
pub enum LoopMessage<P> {
    /// Procedure to execute
    Procedure(P),
    /// Stop after everything queued before this message
    Stop,
}

// ============================================================================
// Loop state
// ============================================================================

/// Control loop lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Accepting and running procedures
    #[default]
    Running,
    /// Stop requested; draining queued procedures
    Stopping,
    /// Drained; no procedure will ever run again
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Running => write!(f, "Running"),
            LoopState::Stopping => write!(f, "Stopping"),
            LoopState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Reasons a procedure cannot be scheduled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// `request_stop` was already called on this loop
    #[error("control loop stop already requested")]
    StopRequested,
    /// The loop task is gone (runtime shut down)
    #[error("control loop task is no longer running")]
    LoopClosed,
}

// ============================================================================
// Control loop
// ============================================================================

/// Serialized FIFO executor for the procedures of one entity.
pub struct CtrlLoop<P: LoopProcedure> {
    name: String,
    tx: Mutex<Option<mpsc::UnboundedSender<LoopMessage<P>>>>,
    state_tx: Arc<watch::Sender<LoopState>>,
    pending: Arc<AtomicUsize>,
}

impl<P: LoopProcedure> CtrlLoop<P> {
    /// Creates the loop and spawns its task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(LoopState::Running);
        let state_tx = Arc::new(state_tx);
        let pending = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_loop(name.clone(), rx, state_tx.clone(), pending.clone()));
        debug!(ctrl_loop = %name, "Control loop started");

        Self {
            name,
            tx: Mutex::new(Some(tx)),
            state_tx,
            pending,
        }
    }

    /// Loop name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        *self.state_tx.borrow()
    }

    /// Returns true once `request_stop` has been called.
    pub fn is_stop_requested(&self) -> bool {
        self.state() != LoopState::Running
    }

    /// Number of procedures queued or running.
    pub fn nof_pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Enqueues a procedure. Never blocks.
    pub fn schedule(&self, procedure: P) -> Result<(), ScheduleError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(ScheduleError::StopRequested)?;

        let proc_name = procedure.name();
        self.pending.fetch_add(1, Ordering::AcqRel);
        if tx.send(LoopMessage::Procedure(procedure)).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(ScheduleError::LoopClosed);
        }
        debug!(ctrl_loop = %self.name, proc = proc_name, "Procedure scheduled");
        Ok(())
    }

    /// Stops accepting procedures and returns a task that completes once every
    /// procedure scheduled before this call has finished.
    ///
    /// Calling it again returns another task completing at the same moment.
    pub fn request_stop(&self) -> AsyncTask<()> {
        let mut state_rx = self.state_tx.subscribe();

        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            self.state_tx.send_if_modified(|state| {
                if *state == LoopState::Running {
                    *state = LoopState::Stopping;
                    true
                } else {
                    false
                }
            });
            if tx.send(LoopMessage::Stop).is_err() {
                self.state_tx.send_replace(LoopState::Stopped);
            }
            debug!(ctrl_loop = %self.name, "Control loop stop requested");
        }

        if *state_rx.borrow_and_update() == LoopState::Stopped {
            return AsyncTask::ready(());
        }
        AsyncTask::new(async move {
            while *state_rx.borrow_and_update() != LoopState::Stopped {
                // Sender gone: the loop can never run anything again.
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

impl<P: LoopProcedure> Drop for CtrlLoop<P> {
    fn drop(&mut self) {
        // Dropping the sender lets the loop drain what is queued and exit.
        let tx = self.tx.get_mut().unwrap_or_else(PoisonError::into_inner);
        tx.take();
    }
}

impl<P: LoopProcedure> std::fmt::Debug for CtrlLoop<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtrlLoop")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("pending", &self.nof_pending())
            .finish()
    }
}

async fn run_loop<P: LoopProcedure>(
    name: String,
    mut rx: mpsc::UnboundedReceiver<LoopMessage<P>>,
    state_tx: Arc<watch::Sender<LoopState>>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            LoopMessage::Procedure(procedure) => {
                let proc_name = procedure.name();
                debug!(ctrl_loop = %name, proc = proc_name, "Procedure started");
                if AssertUnwindSafe(procedure.run()).catch_unwind().await.is_err() {
                    error!(ctrl_loop = %name, proc = proc_name, "Procedure panicked");
                }
                pending.fetch_sub(1, Ordering::AcqRel);
            }
            LoopMessage::Stop => break,
        }
    }
    state_tx.send_replace(LoopState::Stopped);
    debug!(ctrl_loop = %name, "Control loop stopped");
}
