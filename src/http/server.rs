//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every gated route
//! - Wire up middleware (request id, tracing, timeout)
//! - Start the rate limiter sweeper
//! - Serve until shutdown, then drain under the coordinator

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Environment, GatekeeperConfig};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::routes;
use crate::lifecycle::{BackgroundTasks, ShutdownCoordinator, ShutdownOutcome};
use crate::mailer::Mailer;
use crate::pipeline::Gatekeeper;
use crate::security::rate_limit::RateLimiterRegistry;
use crate::store::{PermissionStore, UserStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub env: Environment,
    pub tasks: BackgroundTasks,
    pub mailer: Arc<dyn Mailer>,
    pub permissions: Arc<dyn PermissionStore>,
}

/// HTTP server for the gatekeeper.
pub struct GatekeeperServer {
    config: GatekeeperConfig,
    gates: Gatekeeper,
    state: AppState,
}

impl GatekeeperServer {
    /// Create a new server over the given collaborators.
    pub fn new(
        config: GatekeeperConfig,
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let limiter = Arc::new(RateLimiterRegistry::new(&config.limiter));
        let gates = Gatekeeper::new(
            limiter,
            users,
            permissions.clone(),
            config.listener.trust_proxy_headers,
        );
        let state = AppState {
            env: config.env,
            tasks: BackgroundTasks::new(),
            mailer,
            permissions,
        };

        Self {
            config,
            gates,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace span, id propagation, timeout.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )));

        routes::routes(self.state.clone(), &self.gates).layer(middleware)
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.state.tasks
    }

    pub fn limiter(&self) -> &Arc<RateLimiterRegistry> {
        self.gates.limiter()
    }

    /// Serve on `listener` until `signal` resolves, then shut down.
    pub async fn run<G>(self, listener: TcpListener, signal: G) -> ShutdownOutcome
    where
        G: Future<Output = ()>,
    {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(address = %addr, env = %self.config.env, "HTTP server starting"),
            Err(e) => tracing::warn!(error = %e, "HTTP server starting on unknown address"),
        }

        let sweeper = self
            .limiter()
            .is_enabled()
            .then(|| self.limiter().spawn_sweeper());

        let coordinator =
            ShutdownCoordinator::new(self.config.shutdown.grace_period(), self.state.tasks.clone());
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(coordinator.draining())
            .into_future();

        let outcome = coordinator.run(serve, signal).await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        tracing::info!(exit_code = outcome.exit_code(), "HTTP server stopped");
        outcome
    }
}
