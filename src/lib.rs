//! API request gatekeeper.
//!
//! Per-client rate limiting, bearer authentication and layered
//! authorization in front of HTTP handlers, with panic containment and a
//! draining shutdown.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mailer;
pub mod observability;
pub mod pipeline;
pub mod security;
pub mod store;

pub use config::GatekeeperConfig;
pub use http::GatekeeperServer;
pub use lifecycle::{ShutdownCoordinator, ShutdownOutcome};
