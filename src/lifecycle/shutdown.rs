//! Shutdown coordination.
//!
//! # Responsibilities
//! - Track the server phase (`Running → Draining → Stopped`)
//! - Tell the endpoint to stop accepting once a signal arrives
//! - Drain the endpoint, then background tasks, under one deadline
//! - Report how shutdown went, as an exit code

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::lifecycle::tasks::BackgroundTasks;

/// Server lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Draining,
    Stopped,
}

/// How shutdown ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Endpoint drained and every background task finished in time.
    Clean,

    /// The deadline passed first.
    GraceExceeded {
        endpoint_drained: bool,
        outstanding_tasks: usize,
    },

    /// The endpoint stopped with an error.
    EndpointFault(String),
}

impl ShutdownOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, ShutdownOutcome::Clean)
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ShutdownOutcome::Clean => 0,
            ShutdownOutcome::GraceExceeded { .. } => 1,
            ShutdownOutcome::EndpointFault(_) => 2,
        }
    }
}

/// Drives the endpoint from `Running` to `Stopped`.
pub struct ShutdownCoordinator {
    phase: watch::Sender<Phase>,
    grace: Duration,
    tasks: BackgroundTasks,
}

impl ShutdownCoordinator {
    pub fn new(grace: Duration, tasks: BackgroundTasks) -> Self {
        let (phase, _) = watch::channel(Phase::Running);
        Self {
            phase,
            grace,
            tasks,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Resolves when the phase leaves `Running`.
    ///
    /// Hand this to the endpoint as its graceful shutdown trigger.
    pub fn draining(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut phase = self.phase.subscribe();
        async move {
            // The sender lives as long as the coordinator.
            let _ = phase.wait_for(|phase| *phase != Phase::Running).await;
        }
    }

    /// Run `serve` until `signal` fires, then shut down in order: stop
    /// accepting, drain the endpoint, wait for background tasks.
    ///
    /// `serve` must stop accepting once [`ShutdownCoordinator::draining`]
    /// resolves.
    pub async fn run<S, G>(&self, serve: S, signal: G) -> ShutdownOutcome
    where
        S: Future<Output = io::Result<()>> + Send + 'static,
        G: Future<Output = ()>,
    {
        let mut endpoint = tokio::spawn(serve);

        let early_exit = tokio::select! {
            () = signal => None,
            joined = &mut endpoint => Some(flatten(joined)),
        };

        let deadline = Instant::now() + self.grace;
        self.phase.send_replace(Phase::Draining);
        tracing::info!(
            grace_secs = self.grace.as_secs_f64(),
            in_flight_tasks = self.tasks.in_flight(),
            "Draining"
        );

        let (endpoint_drained, fault) = match early_exit {
            Some(result) => (true, result.err()),
            None => match time::timeout_at(deadline, &mut endpoint).await {
                Ok(joined) => (true, flatten(joined).err()),
                Err(_) => {
                    tracing::warn!("Grace period elapsed before connections drained");
                    endpoint.abort();
                    (false, None)
                }
            },
        };

        if let Some(fault) = &fault {
            tracing::error!(error = %fault, "Endpoint stopped with an error");
        } else if endpoint_drained {
            tracing::info!("Endpoint drained");
        }

        let tasks_done = time::timeout_at(deadline, self.tasks.wait_idle())
            .await
            .is_ok();
        let outstanding_tasks = self.tasks.in_flight();
        if !tasks_done {
            tracing::warn!(outstanding_tasks, "Grace period elapsed before background tasks finished");
        }

        self.phase.send_replace(Phase::Stopped);

        let outcome = match fault {
            Some(fault) => ShutdownOutcome::EndpointFault(fault),
            None if endpoint_drained && tasks_done => ShutdownOutcome::Clean,
            None => ShutdownOutcome::GraceExceeded {
                endpoint_drained,
                outstanding_tasks,
            },
        };
        tracing::info!(outcome = ?outcome, "Stopped");
        outcome
    }
}

fn flatten(joined: Result<io::Result<()>, tokio::task::JoinError>) -> Result<(), String> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}
