//! Command-line interface.
//!
//! Flags override the config file; the merged result is validated again.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    load_config, validate_config, ConfigError, Environment, GatekeeperConfig, LogFormat,
};

#[derive(Debug, Parser)]
#[command(name = "api-gatekeeper", version)]
#[command(about = "Rate limiting, authentication and authorization in front of an API", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port (keeps the configured host).
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long, value_enum)]
    pub env: Option<Environment>,

    /// Per-client refill rate, in requests per second.
    #[arg(long)]
    pub limiter_rps: Option<f64>,

    /// Per-client burst capacity.
    #[arg(long)]
    pub limiter_burst: Option<u32>,

    /// Turn the rate limiter on or off.
    #[arg(long)]
    pub limiter_enabled: Option<bool>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Load the config file (or defaults) and apply overrides.
    pub fn load(&self) -> Result<GatekeeperConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatekeeperConfig::default(),
        };
        self.apply(config)
    }

    /// Apply flag overrides to `config` and validate the result.
    pub fn apply(&self, mut config: GatekeeperConfig) -> Result<GatekeeperConfig, ConfigError> {
        if let Some(port) = self.port {
            config.listener.bind_address = with_port(&config.listener.bind_address, port);
        }
        if let Some(env) = self.env {
            config.env = env;
        }
        if let Some(rps) = self.limiter_rps {
            config.limiter.requests_per_second = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.limiter.burst = burst;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.limiter.enabled = enabled;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(address) = &self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = address.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

fn with_port(bind_address: &str, port: u16) -> String {
    match bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            addr.to_string()
        }
        Err(_) => format!("0.0.0.0:{port}"),
    }
}
