//! Per-request state threaded through the pipeline.

use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::security::error::{GateError, WiringFault};
use crate::security::principal::Principal;

/// State a request accumulates while passing the gates.
///
/// Owned by the driver for the duration of one request and handed to each
/// stage by `&mut`. The principal slot is write-once.
#[derive(Debug, Default)]
pub struct RequestContext {
    client: Option<IpAddr>,
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the client address the rate limiter keyed on.
    pub fn set_client(&mut self, ip: IpAddr) {
        self.client = Some(ip);
    }

    pub fn client(&self) -> Option<IpAddr> {
        self.client
    }

    /// Attach the resolved principal. A second attach is a wiring fault.
    pub fn attach_principal(&mut self, principal: Principal) -> Result<(), GateError> {
        if self.principal.is_some() {
            return Err(WiringFault::PrincipalAlreadyAttached.into());
        }
        self.principal = Some(principal);
        Ok(())
    }

    /// The attached principal. Reading before attach is a wiring fault.
    pub fn principal(&self) -> Result<&Principal, GateError> {
        self.principal
            .as_ref()
            .ok_or(GateError::Wiring(WiringFault::PrincipalMissing))
    }

    pub(crate) fn into_principal(self) -> Option<Principal> {
        self.principal
    }
}

/// Handlers behind a pipeline receive the principal it attached.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(GateError::Wiring(WiringFault::PrincipalMissing))
    }
}
