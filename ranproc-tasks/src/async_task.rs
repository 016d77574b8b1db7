//! Asynchronous task primitive.
//!
//! An [`AsyncTask<T>`] is a computation that eventually yields exactly one
//! value of type `T`. It is either already ready (see [`AsyncTask::ready`]) or
//! wraps a pending future. Inside another task it is awaited like any future;
//! outside an executor its readiness can be probed with
//! [`AsyncTask::poll_now`] and [`AsyncTask::is_ready`].
//!
//! Failure has no separate channel: procedures encode it in `T`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;

enum TaskState<T> {
    Pending(BoxFuture<'static, T>),
    Ready(T),
    Consumed,
}

/// A resumable computation producing one result of type `T`.
#[must_use = "an AsyncTask does nothing unless awaited or polled"]
pub struct AsyncTask<T> {
    state: TaskState<T>,
}

// The result is moved out, never pinned in place.
impl<T> Unpin for AsyncTask<T> {}

impl<T: Send + 'static> AsyncTask<T> {
    /// Wraps a future into a task.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            state: TaskState::Pending(future.boxed()),
        }
    }
}

impl<T> AsyncTask<T> {
    /// Creates a task that is ready immediately with `value`.
    pub fn ready(value: T) -> Self {
        Self {
            state: TaskState::Ready(value),
        }
    }

    /// Returns true once the result is available.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, TaskState::Ready(_))
    }

    /// Polls the task once without an executor and returns whether it is ready.
    ///
    /// The task is not re-woken by this call, so a `false` result only means
    /// "not yet".
    pub fn poll_now(&mut self) -> bool {
        if let TaskState::Pending(future) = &mut self.state {
            let mut cx = Context::from_waker(noop_waker_ref());
            if let Poll::Ready(value) = future.as_mut().poll(&mut cx) {
                self.state = TaskState::Ready(value);
            }
        }
        self.is_ready()
    }

    /// Returns the result if the task is ready.
    pub fn get(&self) -> Option<&T> {
        match &self.state {
            TaskState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the task, returning the result if it is ready.
    pub fn into_result(self) -> Option<T> {
        match self.state {
            TaskState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Future for AsyncTask<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = &mut *self;
        match std::mem::replace(&mut this.state, TaskState::Consumed) {
            TaskState::Ready(value) => Poll::Ready(value),
            TaskState::Pending(mut future) => match future.as_mut().poll(cx) {
                Poll::Ready(value) => Poll::Ready(value),
                Poll::Pending => {
                    this.state = TaskState::Pending(future);
                    Poll::Pending
                }
            },
            TaskState::Consumed => panic!("AsyncTask polled after completion"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            TaskState::Pending(_) => write!(f, "AsyncTask(pending)"),
            TaskState::Ready(value) => f.debug_tuple("AsyncTask").field(value).finish(),
            TaskState::Consumed => write!(f, "AsyncTask(consumed)"),
        }
    }
}
