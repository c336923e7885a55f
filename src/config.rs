//! Configuration parsing and validation for the relay server
//!
//! This module handles command-line argument parsing and validation using clap.
//! Every flag can also be supplied through its `WOM_RELAY_*` environment variable.
use anyhow::anyhow;
use clap::Parser;
use std::time::Duration;
use url::Url;
use wom_relay::client::PoolSettings;
use wom_relay::endpoint::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the relay will listen.
    #[arg(short = 'p', long, env = "WOM_RELAY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// The upstream API that requests are relayed to.
    #[arg(short = 'b', long, env = "WOM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// How long (in seconds) to wait for the upstream before answering 504.
    #[arg(short = 't', long, env = "WOM_RELAY_UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// The port on which the metrics server will listen.
    #[arg(long, env = "WOM_RELAY_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, env = "WOM_RELAY_METRICS", default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, env = "WOM_RELAY_METRICS_PREFIX", default_value = "wom_relay")]
    pub metrics_prefix: String,

    /// Maximum number of idle HTTP connections to keep alive towards the upstream.
    #[arg(long, env = "WOM_RELAY_POOL_MAX_IDLE_PER_HOST", default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, env = "WOM_RELAY_POOL_IDLE_TIMEOUT_SECS", default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Base URL '{}' must use http or https",
                self.base_url
            ));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(anyhow!("Base URL '{}' cannot carry a path", self.base_url));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow!("Upstream timeout must be at least one second"));
        }
        if self.metrics && self.metrics_port == self.port {
            return Err(anyhow!(
                "Metrics port {} clashes with the relay port",
                self.metrics_port
            ));
        }
        Ok(self)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn pool(&self) -> PoolSettings {
        PoolSettings {
            max_idle_per_host: self.pool_max_idle_per_host,
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
        }
    }
}
