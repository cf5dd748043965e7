//! Pipeline factory shared by every route.

use std::sync::Arc;

use crate::pipeline::driver::Pipeline;
use crate::pipeline::stages::{Authenticate, Authorize, RateLimitGate};
use crate::security::authorization::Requirement;
use crate::security::rate_limit::RateLimiterRegistry;
use crate::security::resolver::PrincipalResolver;
use crate::store::{PermissionStore, UserStore};

/// Builds pipelines over one shared rate limiter and one set of stores.
#[derive(Clone)]
pub struct Gatekeeper {
    limiter: Arc<RateLimiterRegistry>,
    resolver: PrincipalResolver,
    permissions: Arc<dyn PermissionStore>,
    trust_proxy_headers: bool,
}

impl Gatekeeper {
    pub fn new(
        limiter: Arc<RateLimiterRegistry>,
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionStore>,
        trust_proxy_headers: bool,
    ) -> Self {
        Self {
            limiter,
            resolver: PrincipalResolver::new(users),
            permissions,
            trust_proxy_headers,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiterRegistry> {
        &self.limiter
    }

    /// Rate limit and authenticate; anonymous callers pass.
    pub fn public(&self) -> Pipeline {
        Pipeline::builder()
            .stage(RateLimitGate::new(self.limiter.clone(), self.trust_proxy_headers))
            .stage(Authenticate::new(self.resolver.clone()))
            .build()
    }

    /// [`Gatekeeper::public`] followed by an authorization check.
    pub fn require(&self, requirement: Requirement) -> Pipeline {
        Pipeline::builder()
            .stage(RateLimitGate::new(self.limiter.clone(), self.trust_proxy_headers))
            .stage(Authenticate::new(self.resolver.clone()))
            .stage(Authorize::new(requirement, self.permissions.clone()))
            .build()
    }
}
