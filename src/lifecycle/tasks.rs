//! In-flight background task tracking.
//!
//! Background work runs on a [`TaskTracker`], so the shutdown path can wait
//! for it without owning the join handles.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::pipeline::containment::panic_message;

/// Process-wide set of background work the shutdown waits for.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task`, tracking it until it completes or panics.
    ///
    /// A panic is logged and swallowed.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(async move {
            if let Err(payload) = AssertUnwindSafe(task).catch_unwind().await {
                tracing::error!(
                    task = name,
                    panic = %panic_message(payload.as_ref()),
                    "Background task panicked"
                );
            }
        })
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until no task is in flight.
    ///
    /// Closes the tracker. Tasks spawned afterwards are still tracked and
    /// still waited for.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
