//! Gateway configuration
//!
//! [`CollectorConfig`] is the library-level builder. [`GatewayConfig`] is the
//! command line of the `telemguard` binary; every flag can also be set
//! through a `TELEMGUARD_*` environment variable.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use telemguard_auth::AuthMode;
use telemguard_core::constants::time::{BASE_BACKOFF_MS, DEFAULT_POLL_INTERVAL_MS, MAX_BACKOFF_MS};

use crate::distributor::{DistributorConfig, DEFAULT_BACKLOG};

/// Bus node the sensor publishes to
pub const DEFAULT_NODE_ID: &str = "sensor";

/// Poll loop settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Bus node holding the latest frame
    pub node_id: String,
    /// Delay between two reads
    pub poll_interval: Duration,
    /// First retry delay after a transport failure
    pub base_backoff: Duration,
    /// Upper bound for the retry delay
    pub max_backoff: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            node_id: DEFAULT_NODE_ID.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }
}

impl CollectorConfig {
    /// Poll `node_id` with default timings
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }

    /// Set the delay between reads
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the retry delay bounds
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max.max(base);
        self
    }

    /// Delay before retrying after `failures` consecutive transport errors
    ///
    /// Doubles from `base_backoff` and saturates at `max_backoff`.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Command line of the gateway
#[derive(Debug, Clone, Parser)]
#[command(name = "telemguard", version, about = "Secure sensor telemetry gateway")]
pub struct GatewayConfig {
    /// MQTT broker (`mqtt://host:port`, `host:port` or `host`)
    #[arg(long, env = "TELEMGUARD_BROKER", default_value = "localhost:1883")]
    pub broker: String,

    /// Bus node the sensor publishes to
    #[arg(long, env = "TELEMGUARD_NODE_ID", default_value = DEFAULT_NODE_ID)]
    pub node_id: String,

    /// Milliseconds between two reads of the node
    #[arg(long, env = "TELEMGUARD_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Authentication mode: `signature` or `symmetric`
    #[arg(long, env = "TELEMGUARD_MODE", default_value = "signature")]
    pub mode: AuthMode,

    /// PEM public key (signature mode)
    #[arg(long, env = "TELEMGUARD_PUBLIC_KEY", default_value = ".keys/sensor_public.pem")]
    pub public_key: PathBuf,

    /// Raw 16 or 32 byte AES key (symmetric mode)
    #[arg(long, env = "TELEMGUARD_AES_KEY", default_value = ".keys/aes.key")]
    pub aes_key: PathBuf,

    /// JSON-lines measurement store
    #[arg(long, env = "TELEMGUARD_STORE", default_value = "sensor.jsonl")]
    pub store: PathBuf,

    /// Measurements replayed to a new live subscriber
    #[arg(long, env = "TELEMGUARD_BACKLOG", default_value_t = DEFAULT_BACKLOG)]
    pub backlog: usize,

    /// MQTT client identifier
    #[arg(long, env = "TELEMGUARD_CLIENT_ID", default_value = "telemguard-gateway")]
    pub client_id: String,
}

impl GatewayConfig {
    /// Key file for the selected mode
    pub fn key_path(&self) -> &PathBuf {
        match self.mode {
            AuthMode::Signature => &self.public_key,
            AuthMode::Symmetric => &self.aes_key,
        }
    }

    /// Poll loop settings from the command line
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig::new(&self.node_id)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    /// Distributor settings from the command line
    pub fn distributor_config(&self) -> DistributorConfig {
        DistributorConfig::new().with_backlog(self.backlog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_saturates() {
        let config = CollectorConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_millis(1_000));
        assert_eq!(config.backoff(4), Duration::from_millis(4_000));
        assert_eq!(config.backoff(7), Duration::from_secs(30));
        assert_eq!(config.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn defaults_without_arguments() {
        let config = GatewayConfig::try_parse_from(["telemguard"]).unwrap();
        assert_eq!(config.node_id, "sensor");
        assert_eq!(config.mode, AuthMode::Signature);
        assert_eq!(config.key_path(), &PathBuf::from(".keys/sensor_public.pem"));
        assert_eq!(config.collector_config().poll_interval, Duration::from_millis(500));
        assert_eq!(config.distributor_config().backlog, 20);
    }

    #[test]
    fn symmetric_mode_uses_aes_key() {
        let config = GatewayConfig::try_parse_from([
            "telemguard",
            "--mode",
            "AES",
            "--aes-key",
            "/etc/tg/aes.key",
        ])
        .unwrap();
        assert_eq!(config.mode, AuthMode::Symmetric);
        assert_eq!(config.key_path(), &PathBuf::from("/etc/tg/aes.key"));
    }
}
