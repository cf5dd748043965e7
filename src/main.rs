//! API gatekeeper server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!         │
//!         ▼
//!     ┌──────────────────────────────────────────────────────────┐
//!     │ request id → trace span → timeout                         │
//!     │   ┌────────────────────────────────────────────────────┐ │
//!     │   │ containment (catch_unwind)                          │ │
//!     │   │   rate limit → authenticate → authorize → handler   │ │
//!     │   └────────────────────────────────────────────────────┘ │
//!     └──────────────────────────────────────────────────────────┘
//!         │                                  │
//!         ▼                                  ▼
//!     Client Response              background tasks (mail)
//!
//!     sweeper: evicts idle rate limiter buckets every interval
//!     shutdown: signal → drain connections → wait tasks → exit code
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use api_gatekeeper::cli::Cli;
use api_gatekeeper::http::GatekeeperServer;
use api_gatekeeper::lifecycle::shutdown_signal;
use api_gatekeeper::mailer::LogMailer;
use api_gatekeeper::observability::{logging, metrics};
use api_gatekeeper::store::MemoryStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(78);
        }
    };

    logging::init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gatekeeper starting");
    tracing::info!(
        env = %config.env,
        bind_address = %config.listener.bind_address,
        limiter_enabled = config.limiter.enabled,
        requests_per_second = config.limiter.requests_per_second,
        burst = config.limiter.burst,
        grace_period_secs = config.shutdown.grace_period_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(MemoryStore::from_fixtures(&config.users));

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                bind_address = %config.listener.bind_address,
                error = %e,
                "Failed to bind listener"
            );
            return ExitCode::FAILURE;
        }
    };

    let server = GatekeeperServer::new(config, store.clone(), store, Arc::new(LogMailer));
    let outcome = server.run(listener, shutdown_signal()).await;

    tracing::info!("Shutdown complete");
    ExitCode::from(outcome.exit_code())
}
