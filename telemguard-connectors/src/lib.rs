//! Bus Node Connectors
//!
//! ## Overview
//!
//! An industrial automation server exposes named values ("nodes") that a
//! client reads by identifier. The sensor device writes its latest frame to
//! one well-known node; the gateway polls that node. This crate hides the
//! transport behind [`BusNode`].
//!
//! ## Transports
//!
//! ### Memory
//!
//! [`MemoryBus`] keeps nodes in process. Clones share the same nodes, so a
//! device handle and a collector handle can talk to each other in tests. It
//! can also refuse connections or fail reads on demand.
//!
//! ### MQTT (feature `mqtt`, default)
//!
//! [`mqtt::MqttBus`] maps each node to a topic. Writes are published
//! *retained*, so a reader subscribing late still sees the latest value,
//! which is exactly the read-latest-value semantics of a bus node.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! connect() ──► get_value()* / set_value()* ──► disconnect()
//!                   │ TransportError
//!                   ▼
//!              reconnect()
//! ```
//!
//! Callers pair every successful `connect` with a `disconnect`, including on
//! error paths.
//!
//! ## Example Usage
//!
//! ```rust
//! use telemguard_connectors::{BusNode, MemoryBus};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), telemguard_connectors::BusError> {
//! let device = MemoryBus::new();
//! let mut gateway = device.clone();
//!
//! device.publish("sensor", b"frame".to_vec());
//!
//! gateway.connect().await?;
//! assert_eq!(gateway.get_value("sensor").await?, Some(b"frame".to_vec()));
//! gateway.disconnect().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod memory;
#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use memory::MemoryBus;
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttBus, MqttConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Transport failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,

    /// Server could not be reached or refused the session
    #[error("Bus unreachable: {0}")]
    Unreachable(String),

    /// An established connection failed
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Connection handshake did not complete in time
    #[error("Timeout")]
    Timeout,

    /// Invalid endpoint or option
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A client of the automation server's named values
#[async_trait]
pub trait BusNode: Send {
    /// Open the session
    async fn connect(&mut self) -> Result<(), BusError>;

    /// Close the session; closing a closed session is a no-op
    async fn disconnect(&mut self) -> Result<(), BusError>;

    /// Drop and re-open the session after a transport failure
    async fn reconnect(&mut self) -> Result<(), BusError> {
        if let Err(e) = self.disconnect().await {
            log::debug!("Ignoring disconnect failure before reconnect: {}", e);
        }
        self.connect().await
    }

    /// Latest value of `node_id`; `None` when nothing has been written
    async fn get_value(&mut self, node_id: &str) -> Result<Option<Vec<u8>>, BusError>;

    /// Write `value` to `node_id` (device side)
    async fn set_value(&mut self, node_id: &str, value: &[u8]) -> Result<(), BusError>;

    /// Whether the session is currently open
    fn is_connected(&self) -> bool;

    /// Counters since creation
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Successful reads returning a value
    pub reads: u64,
    /// Successful reads returning nothing
    pub empty_reads: u64,
    /// Failed reads
    pub read_failures: u64,
    /// Successful writes
    pub writes: u64,
    /// Total bytes read
    pub bytes_read: u64,
    /// Total bytes written
    pub bytes_written: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_read(&mut self, value: &Option<Vec<u8>>) {
        match value {
            Some(bytes) => {
                self.reads += 1;
                self.bytes_read += bytes.len() as u64;
            }
            None => self.empty_reads += 1,
        }
    }

    pub(crate) fn record_write(&mut self, len: usize) {
        self.writes += 1;
        self.bytes_written += len as u64;
    }

    pub(crate) fn record_failure(&mut self, err: &BusError) {
        self.read_failures += 1;
        self.last_error = Some(err.to_string());
    }
}
