//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → resolve the shutdown future
//!
//! Shutdown (shutdown.rs):
//!     Running → signal → Draining → stop accepting → drain endpoint
//!         → wait background tasks (tasks.rs) → Stopped → exit code
//! ```
//!
//! # Design Decisions
//! - One deadline, measured from signal receipt, bounds both drain steps
//! - The rate limiter sweeper is not a tracked task and is never waited on

pub mod shutdown;
pub mod signals;
pub mod tasks;

pub use shutdown::{Phase, ShutdownCoordinator, ShutdownOutcome};
pub use signals::shutdown_signal;
pub use tasks::BackgroundTasks;
