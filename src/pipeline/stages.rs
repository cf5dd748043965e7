//! The gates: rate limit, authenticate, authorize.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, VARY};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::Response;

use crate::http::request::client_ip;
use crate::pipeline::context::RequestContext;
use crate::pipeline::stage::Stage;
use crate::security::authorization::{authorize, Requirement};
use crate::security::error::GateError;
use crate::security::rate_limit::{Admission, RateLimiterRegistry};
use crate::security::resolver::PrincipalResolver;
use crate::store::PermissionStore;

/// Rejects clients that exhausted their token bucket.
pub struct RateLimitGate {
    registry: Arc<RateLimiterRegistry>,
    trust_proxy_headers: bool,
}

impl RateLimitGate {
    pub fn new(registry: Arc<RateLimiterRegistry>, trust_proxy_headers: bool) -> Self {
        Self {
            registry,
            trust_proxy_headers,
        }
    }
}

#[async_trait]
impl Stage for RateLimitGate {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn inspect(&self, request: &Parts, ctx: &mut RequestContext) -> Result<(), GateError> {
        if !self.registry.is_enabled() {
            return Ok(());
        }

        let ip = client_ip(request, self.trust_proxy_headers)?;
        ctx.set_client(ip);

        match self.registry.admit(&ip.to_string()) {
            Admission::Admitted => Ok(()),
            Admission::Rejected => {
                tracing::warn!(client = %ip, "Rate limit exceeded");
                Err(GateError::RateLimited)
            }
        }
    }
}

/// Resolves the `Authorization` header and attaches the principal.
pub struct Authenticate {
    resolver: PrincipalResolver,
}

impl Authenticate {
    pub fn new(resolver: PrincipalResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Stage for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn inspect(&self, request: &Parts, ctx: &mut RequestContext) -> Result<(), GateError> {
        let principal = self
            .resolver
            .resolve(request.headers.get(AUTHORIZATION))
            .await?;
        tracing::debug!(principal = %principal, "Principal resolved");
        ctx.attach_principal(principal)
    }

    fn decorate(&self, response: &mut Response) {
        response
            .headers_mut()
            .append(VARY, HeaderValue::from_static("Authorization"));
    }
}

/// Enforces a route's [`Requirement`] against the attached principal.
pub struct Authorize {
    requirement: Requirement,
    permissions: Arc<dyn PermissionStore>,
}

impl Authorize {
    pub fn new(requirement: Requirement, permissions: Arc<dyn PermissionStore>) -> Self {
        Self {
            requirement,
            permissions,
        }
    }
}

#[async_trait]
impl Stage for Authorize {
    fn name(&self) -> &'static str {
        "authorize"
    }

    async fn inspect(&self, _request: &Parts, ctx: &mut RequestContext) -> Result<(), GateError> {
        let principal = ctx.principal()?;
        let outcome = authorize(&self.requirement, principal, self.permissions.as_ref()).await;
        if let Err(e) = &outcome {
            tracing::debug!(
                principal = %principal,
                requirement = %self.requirement,
                reason = e.reason(),
                "Authorization denied"
            );
        }
        outcome
    }
}
