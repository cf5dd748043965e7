//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → containment.rs (catch_unwind boundary around everything below)
//!     → stages.rs: RateLimitGate → Authenticate → [Authorize]
//!     → handler (principal available via extractor)
//!     → stage decorations (Vary: Authorization)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Stages are an explicit ordered list, inspectable at runtime
//! - Every route owns a complete pipeline, so the principal is attached
//!   exactly once per request
//! - Expected failures are `Result` values; only panics and wiring faults
//!   reach the containment boundary

pub mod containment;
pub mod context;
pub mod driver;
pub mod gatekeeper;
pub mod stage;
pub mod stages;

pub use context::RequestContext;
pub use driver::{run_pipeline, Pipeline, PipelineBuilder};
pub use gatekeeper::Gatekeeper;
pub use stage::Stage;
