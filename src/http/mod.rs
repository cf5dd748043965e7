//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → routes.rs (per-route pipeline, then handler)
//!     → request.rs (client address for the rate limiter)
//!     → response.rs (gate errors and faults as JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, GatekeeperServer};
