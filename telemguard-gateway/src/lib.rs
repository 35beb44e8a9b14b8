//! Gateway for authenticated sensor telemetry
//!
//! ## Overview
//!
//! ```text
//!   bus node ──► Collector ──► Authenticator ──► Distributor ──► MeasurementStore
//!                                                    │
//!   request ──► IngestionService ────────────────────┤
//!                                                    ▼
//!                                          SubscriberRegistry ──► live channels
//!
//!   QueryService ◄── MeasurementStore
//! ```
//!
//! - [`collector`]: polls one bus node, authenticates frames, skips repeats
//! - [`distributor`]: validate, persist, then broadcast
//! - [`registry`]: concurrency-safe set of live channels
//! - [`storage`]: identifier-assigning stores (memory, JSON lines)
//! - [`query`]: range and by-id reads, newest first
//! - [`ingest`]: request-body boundary (plain or encrypted JSON)
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use telemguard_core::SensorReading;
//! use telemguard_gateway::{
//!     Distributor, DistributorConfig, MemoryStore, QueryParams, QueryService, SubscriberRegistry,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let distributor = Distributor::new(
//!     store.clone(),
//!     Arc::new(SubscriberRegistry::new()),
//!     DistributorConfig::new(),
//! );
//! let stored = distributor
//!     .ingest(SensorReading::new(1, 25.5, 1013.25, 65.2, 1_720_328_207_000))
//!     .unwrap();
//!
//! let query = QueryService::new(store, Arc::new(telemguard_core::time::SystemTime));
//! let rows = query.query(&QueryParams::default().with_sensor(1)).unwrap();
//! assert_eq!(rows, vec![stored]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collector;
pub mod config;
pub mod distributor;
pub mod errors;
pub mod ingest;
pub mod query;
pub mod registry;
pub mod storage;

pub use collector::{Collector, CollectorState, CollectorStats, PollOutcome};
pub use config::{CollectorConfig, GatewayConfig};
pub use distributor::{Distributor, DistributorConfig, DistributorStats};
pub use errors::{ApiError, CollectorError, ErrorKind, IngestError, SubscribeError};
pub use ingest::{IngestAck, IngestionService};
pub use query::{QueryParams, QueryService};
pub use registry::{
    encode_measurement, BroadcastReport, ChannelError, ChannelSink, LiveChannel, SessionEnd,
    SubscriberRegistry, SubscriberSession, Subscription,
};
pub use storage::{FileStore, MeasurementStore, MemoryStore, StorageError};

use tracing_subscriber::EnvFilter;

/// Install the process-wide log subscriber
///
/// `RUST_LOG` wins over `default_filter`. `log` records from the library
/// crates are forwarded. Calling this twice is harmless.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
