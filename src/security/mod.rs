//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket)
//!     → resolver.rs + credential.rs (bearer token → principal)
//!     → authorization.rs (authenticated → activated → permission)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Malformed and unknown credentials are indistinguishable to the caller
//! - Collaborator failures become `Internal`, never a rejection

pub mod authorization;
pub mod credential;
pub mod error;
pub mod principal;
pub mod rate_limit;
pub mod resolver;

pub use authorization::{authorize, Requirement};
pub use error::{GateError, WiringFault};
pub use principal::{Principal, TokenScope, User, UserId};
pub use rate_limit::{Admission, RateLimiterRegistry};
pub use resolver::PrincipalResolver;
