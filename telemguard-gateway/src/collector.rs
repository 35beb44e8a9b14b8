//! Bus Collector
//!
//! ## Overview
//!
//! One long-lived task polls a single bus node, authenticates whatever frame
//! it finds there and hands trusted readings to the [`Distributor`].
//!
//! ```text
//!  Disconnected ──connect──► Connected ──read──► Polling ──ok──► Connected
//!       ▲                                          │
//!       └───────────── transport failure ──────────┘
//! ```
//!
//! ## Failure Policy
//!
//! - Initial connect failure ends the run with [`CollectorError::Connect`];
//!   retrying belongs to the process supervisor.
//! - A malformed, unauthenticated or implausible frame is logged and polling
//!   continues.
//! - A transport failure during polling is retried after an exponential
//!   backoff, reconnecting the bus first.
//! - On shutdown the bus is disconnected on every exit path.
//!
//! The node only holds the latest frame, so the same bytes are read many
//! times. A frame identical to the last one processed is skipped.

use std::{future::Future, sync::Arc};

use telemguard_auth::{AuthError, Authenticator};
use telemguard_connectors::BusNode;
use telemguard_core::MeasurementId;

use crate::{
    config::CollectorConfig,
    distributor::Distributor,
    errors::{CollectorError, ErrorKind, IngestError},
};

/// Connection state of the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// No bus session
    Disconnected,
    /// Session open, idle between reads
    Connected,
    /// A read is in flight
    Polling,
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Node holds no value
    Empty,
    /// Same frame as the last one processed
    Unchanged,
    /// Reading stored under this identifier
    Ingested(MeasurementId),
    /// Frame refused; polling continues
    Rejected(ErrorKind),
    /// Bus read failed
    TransportFailed,
}

/// Counters for one collector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Poll cycles started
    pub polls: u64,
    /// Reads that found the node empty
    pub empty_reads: u64,
    /// Readings stored
    pub ingested: u64,
    /// Frames skipped as unchanged
    pub duplicates: u64,
    /// Structurally invalid frames
    pub malformed: u64,
    /// Authentication, decryption or validation failures
    pub rejected: u64,
    /// Authenticated readings lost to a failed write
    pub storage_failures: u64,
    /// Failed bus reads
    pub transport_errors: u64,
}

/// Poll loop over one bus node
pub struct Collector<B: BusNode> {
    bus: B,
    authenticator: Arc<dyn Authenticator>,
    distributor: Arc<Distributor>,
    config: CollectorConfig,
    state: CollectorState,
    last_frame: Option<Vec<u8>>,
    failures: u32,
    stats: CollectorStats,
}

impl<B: BusNode> Collector<B> {
    /// Collector reading `config.node_id` from `bus`
    pub fn new(
        bus: B,
        authenticator: Arc<dyn Authenticator>,
        distributor: Arc<Distributor>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            bus,
            authenticator,
            distributor,
            config,
            state: CollectorState::Disconnected,
            last_frame: None,
            failures: 0,
            stats: CollectorStats::default(),
        }
    }

    /// Current connection state
    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// The underlying bus node
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Open the bus session
    pub async fn connect(&mut self) -> Result<(), CollectorError> {
        self.bus.connect().await.map_err(CollectorError::Connect)?;
        self.state = CollectorState::Connected;
        log::info!(
            "Collector connected ({} mode, node '{}')",
            self.authenticator.mode(),
            self.config.node_id
        );
        Ok(())
    }

    /// Read the node once and process what is there
    pub async fn poll_once(&mut self) -> PollOutcome {
        self.stats.polls += 1;
        self.state = CollectorState::Polling;

        let frame = match self.bus.get_value(&self.config.node_id).await {
            Ok(Some(frame)) if !frame.is_empty() => frame,
            Ok(_) => {
                self.read_succeeded();
                self.stats.empty_reads += 1;
                log::debug!("Node '{}' is empty", self.config.node_id);
                return PollOutcome::Empty;
            }
            Err(e) => {
                self.state = CollectorState::Disconnected;
                self.failures = self.failures.saturating_add(1);
                self.stats.transport_errors += 1;
                log::warn!("Bus read failed ({} consecutive): {}", self.failures, e);
                return PollOutcome::TransportFailed;
            }
        };
        self.read_succeeded();

        if self.last_frame.as_deref() == Some(frame.as_slice()) {
            self.stats.duplicates += 1;
            log::debug!("Frame unchanged since last poll");
            return PollOutcome::Unchanged;
        }

        let outcome = self.process(&frame);
        if !matches!(outcome, PollOutcome::Rejected(ErrorKind::StorageError)) {
            // Storage failures are retried on the next cycle
            self.last_frame = Some(frame);
        }
        outcome
    }

    fn read_succeeded(&mut self) {
        self.state = CollectorState::Connected;
        self.failures = 0;
    }

    fn process(&mut self, frame: &[u8]) -> PollOutcome {
        let reading = match self.authenticator.authenticate(frame) {
            Ok(reading) => reading,
            Err(e) => {
                match e {
                    AuthError::Malformed(_) => self.stats.malformed += 1,
                    _ => self.stats.rejected += 1,
                }
                log::warn!("Discarding {}-byte frame: {}", frame.len(), e);
                return PollOutcome::Rejected(ErrorKind::from(&e));
            }
        };

        match self.distributor.ingest(reading) {
            Ok(measurement) => {
                self.stats.ingested += 1;
                PollOutcome::Ingested(measurement.id)
            }
            Err(e) => {
                match e {
                    IngestError::Validation(_) => self.stats.rejected += 1,
                    IngestError::Storage(_) => self.stats.storage_failures += 1,
                }
                PollOutcome::Rejected(e.kind())
            }
        }
    }

    /// Connect, then poll until `shutdown` resolves
    ///
    /// Returns the run's statistics. The bus is disconnected before
    /// returning once the initial connect has succeeded.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<CollectorStats, CollectorError>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.connect().await {
            log::error!("{}", e);
            return Err(e);
        }

        tokio::pin!(shutdown);
        loop {
            let outcome = self.poll_once().await;
            let delay = match outcome {
                PollOutcome::TransportFailed => self.config.backoff(self.failures),
                _ => self.config.poll_interval,
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if outcome == PollOutcome::TransportFailed {
                match self.bus.reconnect().await {
                    Ok(()) => {
                        self.state = CollectorState::Connected;
                        log::info!("Bus reconnected");
                    }
                    Err(e) => log::warn!("Reconnect failed: {}", e),
                }
            }
        }

        self.release().await;
        log::info!("Collector stopped: {:?}", self.stats);
        Ok(self.stats.clone())
    }

    async fn release(&mut self) {
        if let Err(e) = self.bus.disconnect().await {
            log::warn!("Disconnect failed: {}", e);
        }
        self.state = CollectorState::Disconnected;
    }
}
