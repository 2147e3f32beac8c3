//! Configuration for the alert dispatcher service

use crate::router::ScaleScripts;
use anyhow::{bail, Result};
use clap::Parser;
use std::env;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_COMMAND_SERVICE_URL: &str = "http://localhost:8081";
pub const DEFAULT_POOL_SERVICE_URL: &str = "http://localhost:8082";
pub const DEFAULT_SCALE_UP_SCRIPT: &str =
    "su - demo -c 'cd ~/demo/stack-worker && bash scale.sh up'";
pub const DEFAULT_SCALE_DOWN_SCRIPT: &str =
    "su - demo -c 'cd ~/demo/stack-worker && bash scale.sh down'";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration for the alert dispatcher
#[derive(Debug, Clone, Parser)]
#[command(name = "alert-dispatcher")]
#[command(about = "Turns Alertmanager webhooks into host commands and worker pool resizes")]
pub struct Config {
    /// Port the webhook server listens on
    #[arg(long, env, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address the webhook server binds to
    #[arg(long, env, default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Base URL of the remote command execution service
    #[arg(long, env, default_value = DEFAULT_COMMAND_SERVICE_URL)]
    pub command_service_url: String,

    /// Base URL of the worker pool management service
    #[arg(long, env, default_value = DEFAULT_POOL_SERVICE_URL)]
    pub pool_service_url: String,

    /// Capacity group to manage (defaults to the first group the pool service lists)
    #[arg(long, env)]
    pub pool_name: Option<String>,

    /// Script run on the alerting host for `container-up`
    #[arg(long, env, default_value = DEFAULT_SCALE_UP_SCRIPT)]
    pub scale_up_script: String,

    /// Script run on the alerting host for `container-down`
    #[arg(long, env, default_value = DEFAULT_SCALE_DOWN_SCRIPT)]
    pub scale_down_script: String,

    /// Delay between command status polls in milliseconds
    #[arg(long, env, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Longest wait for a command to finish, in seconds
    #[arg(long, env, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub command_timeout_secs: u64,

    /// Timeout of a single request to either remote service, in seconds
    #[arg(long, env, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Output logs in JSON format
    #[arg(long, env)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            command_service_url: env::var("COMMAND_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_COMMAND_SERVICE_URL.to_string()),
            pool_service_url: env::var("POOL_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_POOL_SERVICE_URL.to_string()),
            pool_name: env::var("POOL_NAME").ok(),
            scale_up_script: env::var("SCALE_UP_SCRIPT")
                .unwrap_or_else(|_| DEFAULT_SCALE_UP_SCRIPT.to_string()),
            scale_down_script: env::var("SCALE_DOWN_SCRIPT")
                .unwrap_or_else(|_| DEFAULT_SCALE_DOWN_SCRIPT.to_string()),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            command_timeout_secs: env::var("COMMAND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }

    /// Reject settings the dispatcher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than zero");
        }
        if self.command_timeout_secs == 0 {
            bail!("COMMAND_TIMEOUT_SECS must be greater than zero");
        }
        for (name, url) in [
            ("COMMAND_SERVICE_URL", &self.command_service_url),
            ("POOL_SERVICE_URL", &self.pool_service_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Invalid {}: {}. Must start with http:// or https://", name, url);
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn scripts(&self) -> ScaleScripts {
        ScaleScripts {
            up: self.scale_up_script.clone(),
            down: self.scale_down_script.clone(),
        }
    }
}
