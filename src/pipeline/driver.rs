//! Pipeline driver.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::fault_response;
use crate::observability::metrics;
use crate::pipeline::containment::{contain, Fault};
use crate::pipeline::context::RequestContext;
use crate::pipeline::stage::Stage;
use crate::security::error::GateError;

/// An ordered list of stages behind a fault containment boundary.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder { stages: Vec::new() }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run `request` through the stages, then through `terminal` if every
    /// stage passed.
    pub async fn handle<F, Fut>(&self, request: Request, terminal: F) -> Response
    where
        F: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = Response> + Send,
    {
        let started = Instant::now();
        metrics::record_request();

        let response = match contain(self.drive(request, terminal)).await {
            Ok(response) => response,
            Err(fault) => {
                metrics::record_fault(fault.kind());
                fault_response(&fault)
            }
        };

        metrics::record_response(response.status().as_u16(), started);
        response
    }

    async fn drive<F, Fut>(&self, request: Request, terminal: F) -> Result<Response, Fault>
    where
        F: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = Response> + Send,
    {
        let (mut parts, body) = request.into_parts();
        let mut ctx = RequestContext::new();

        for (index, stage) in self.stages.iter().enumerate() {
            match stage.inspect(&parts, &mut ctx).await {
                Ok(()) => {}
                Err(GateError::Wiring(fault)) => {
                    tracing::error!(stage = stage.name(), error = %fault, "Pipeline wiring fault");
                    return Err(fault.into());
                }
                Err(rejection) => {
                    tracing::debug!(
                        stage = stage.name(),
                        reason = rejection.reason(),
                        client = ?ctx.client(),
                        "Request rejected"
                    );
                    metrics::record_rejection(rejection.reason());
                    let mut response = rejection.into_response();
                    decorate(&self.stages[..=index], &mut response);
                    return Ok(response);
                }
            }
        }

        if let Some(principal) = ctx.into_principal() {
            parts.extensions.insert(principal);
        }

        let mut response = terminal(Request::from_parts(parts, body)).await;
        decorate(&self.stages, &mut response);
        Ok(response)
    }
}

/// Only stages that inspected the request get to decorate its response.
fn decorate(ran: &[Arc<dyn Stage>], response: &mut Response) {
    for stage in ran {
        stage.decorate(response);
    }
}

/// Assembles a [`Pipeline`] in the order stages are added.
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into(),
        }
    }
}

/// Axum middleware entry point; mount with `from_fn_with_state`.
pub async fn run_pipeline(State(pipeline): State<Pipeline>, request: Request, next: Next) -> Response {
    pipeline.handle(request, |request| next.run(request)).await
}
