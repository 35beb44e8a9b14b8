//! Distributor
//!
//! Single entry point for trusted readings, whether they arrived over the bus
//! or through the ingestion boundary. Order of effects for one reading:
//!
//! 1. validate physical ranges (failure: no write, no broadcast)
//! 2. append to storage, which assigns the identifier (failure: no broadcast)
//! 3. broadcast the persisted measurement to live subscribers (best effort)
//!
//! Steps 2 and 3 run under one publish lock, so subscribers see measurements
//! in identifier order. Subscribing takes the same lock while the backlog is
//! sent, so a new subscriber neither misses nor repeats a measurement.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use telemguard_core::{PersistedMeasurement, ReadingValidator, SensorReading, Validator};

use crate::{
    errors::{IngestError, SubscribeError},
    registry::{encode_measurement, LiveChannel, SubscriberRegistry, Subscription},
    storage::MeasurementStore,
};

/// Measurements replayed to a new subscriber by default
pub const DEFAULT_BACKLOG: usize = 20;

/// Distributor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributorConfig {
    /// Most recent measurements sent on subscribe (0 disables)
    pub backlog: usize,
    /// Physical range checks
    pub validator: ReadingValidator,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            backlog: DEFAULT_BACKLOG,
            validator: ReadingValidator::default(),
        }
    }
}

impl DistributorConfig {
    /// Default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subscription backlog size
    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog;
        self
    }

    /// Replace the range checks
    pub fn with_validator(mut self, validator: ReadingValidator) -> Self {
        self.validator = validator;
        self
    }
}

/// Counters since the distributor was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributorStats {
    /// Readings stored
    pub ingested: u64,
    /// Readings refused by validation
    pub rejected: u64,
    /// Readings lost to a failed write
    pub storage_failures: u64,
    /// Messages accepted by live channels
    pub broadcasts_delivered: u64,
    /// Channels removed after a failed send
    pub subscribers_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ingested: AtomicU64,
    rejected: AtomicU64,
    storage_failures: AtomicU64,
    broadcasts_delivered: AtomicU64,
    subscribers_dropped: AtomicU64,
}

/// Validates, persists and fans out readings
pub struct Distributor {
    store: Arc<dyn MeasurementStore>,
    registry: Arc<SubscriberRegistry>,
    config: DistributorConfig,
    counters: Counters,
    publish: Mutex<()>,
}

impl Distributor {
    /// Distributor writing to `store` and broadcasting through `registry`
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        registry: Arc<SubscriberRegistry>,
        config: DistributorConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            counters: Counters::default(),
            publish: Mutex::new(()),
        }
    }

    fn publish_lock(&self) -> MutexGuard<'_, ()> {
        self.publish.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate, persist, then broadcast one reading
    pub fn ingest(&self, reading: SensorReading) -> Result<PersistedMeasurement, IngestError> {
        if let Err(e) = self.config.validator.validate(reading) {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            log::warn!("Rejected reading from sensor {}: {}", reading.sensor_id, e);
            return Err(e.into());
        }

        let _publish = self.publish_lock();
        let measurement = match self.store.append(&reading) {
            Ok(measurement) => measurement,
            Err(e) => {
                self.counters.storage_failures.fetch_add(1, Ordering::Relaxed);
                log::error!("Failed to store reading from sensor {}: {}", reading.sensor_id, e);
                return Err(e.into());
            }
        };
        self.counters.ingested.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "Stored measurement {} (sensor {}, {:.2} °C, {:.2} hPa, {:.1} %)",
            measurement.id,
            reading.sensor_id,
            reading.temperature,
            reading.pressure,
            reading.humidity
        );

        let report = self.registry.broadcast(&measurement);
        self.counters
            .broadcasts_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.counters
            .subscribers_dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);

        Ok(measurement)
    }

    /// Send the backlog to `channel`, then register it for live updates
    ///
    /// The backlog goes out oldest first. Ingestion waits until the channel
    /// is registered.
    pub fn subscribe(
        &self,
        mut channel: Box<dyn LiveChannel>,
    ) -> Result<Subscription, SubscribeError> {
        let _publish = self.publish_lock();
        if self.config.backlog > 0 {
            let backlog = self.store.latest(self.config.backlog)?;
            for measurement in backlog.iter().rev() {
                let sent = encode_measurement(measurement).and_then(|text| channel.send(&text));
                if let Err(e) = sent {
                    log::warn!("Subscriber failed during backlog: {}", e);
                    channel.close();
                    return Err(SubscribeError::ChannelClosed);
                }
            }
        }
        Ok(self.registry.register(channel))
    }

    /// Current counters
    pub fn stats(&self) -> DistributorStats {
        let c = &self.counters;
        DistributorStats {
            ingested: c.ingested.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            storage_failures: c.storage_failures.load(Ordering::Relaxed),
            broadcasts_delivered: c.broadcasts_delivered.load(Ordering::Relaxed),
            subscribers_dropped: c.subscribers_dropped.load(Ordering::Relaxed),
        }
    }

    /// Registry receiving the broadcasts
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Store the measurements are written to
    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        &self.store
    }
}
