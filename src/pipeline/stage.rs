//! The common shape of every gate.

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::response::Response;

use crate::pipeline::context::RequestContext;
use crate::security::error::GateError;

/// A pipeline stage: inspect the request and either pass or short-circuit.
///
/// Stages see the request head only; the body is never read by a gate.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs and by [`Pipeline::stage_names`](crate::pipeline::Pipeline::stage_names).
    fn name(&self) -> &'static str;

    /// `Ok` passes the request on; `Err` ends it with that rejection.
    async fn inspect(&self, request: &Parts, ctx: &mut RequestContext) -> Result<(), GateError>;

    /// Adjust the outgoing response, whether this stage passed or not.
    fn decorate(&self, _response: &mut Response) {}
}
