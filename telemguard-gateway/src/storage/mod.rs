//! Measurement storage
//!
//! Stores assign identifiers. Every implementation serializes `append`
//! behind one lock that also owns the identifier counter, so identifiers are
//! strictly increasing in ingestion order and a failed write consumes none.
//! Reads take the same lock briefly and copy rows out.
//!
//! Scan results are returned in insertion order; ordering for clients is the
//! query service's job.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use telemguard_core::{time::Timestamp, MeasurementId, PersistedMeasurement, SensorReading};
use thiserror::Error;

/// Persistence failures (details are for logs only)
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file or device failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be encoded
    #[error("Storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Backing store for persisted measurements
pub trait MeasurementStore: Send + Sync {
    /// Persist a reading and assign it the next identifier
    fn append(&self, reading: &SensorReading) -> Result<PersistedMeasurement, StorageError>;

    /// Every measurement with `start <= timestamp <= end`
    fn scan_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PersistedMeasurement>, StorageError>;

    /// Measurements of one sensor with `start <= timestamp <= end`
    fn scan_sensor(
        &self,
        sensor_id: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PersistedMeasurement>, StorageError>;

    /// Single measurement by identifier
    fn get(&self, id: MeasurementId) -> Result<Option<PersistedMeasurement>, StorageError>;

    /// The `n` most recently stored measurements, newest first
    fn latest(&self, n: usize) -> Result<Vec<PersistedMeasurement>, StorageError>;

    /// Number of stored measurements
    fn count(&self) -> Result<usize, StorageError>;
}

/// Rows plus the identifier counter, shared by every store
#[derive(Debug)]
pub(crate) struct Table {
    rows: Vec<PersistedMeasurement>,
    next_id: MeasurementId,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl Table {
    /// What `reading` would become if committed now
    pub(crate) fn stage(&self, reading: &SensorReading) -> PersistedMeasurement {
        PersistedMeasurement {
            id: self.next_id,
            reading: *reading,
            position: self.rows.len() as u64,
        }
    }

    /// Commit a staged or replayed measurement
    pub(crate) fn commit(&mut self, mut measurement: PersistedMeasurement) {
        measurement.position = self.rows.len() as u64;
        self.next_id = self.next_id.max(measurement.id.saturating_add(1));
        self.rows.push(measurement);
    }

    pub(crate) fn scan(
        &self,
        start: Timestamp,
        end: Timestamp,
        sensor_id: Option<i32>,
    ) -> Vec<PersistedMeasurement> {
        self.rows
            .iter()
            .filter(|m| (start..=end).contains(&m.timestamp()))
            .filter(|m| sensor_id.map_or(true, |id| m.sensor_id() == id))
            .copied()
            .collect()
    }

    pub(crate) fn get(&self, id: MeasurementId) -> Option<PersistedMeasurement> {
        // Rows are committed in identifier order
        self.rows
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|index| self.rows[index])
    }

    pub(crate) fn latest(&self, n: usize) -> Vec<PersistedMeasurement> {
        self.rows.iter().rev().take(n).copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(sensor_id: i32, timestamp: Timestamp) -> SensorReading {
        SensorReading::new(sensor_id, 20.0, 1000.0, 50.0, timestamp)
    }

    #[test]
    fn staging_does_not_consume_an_id() {
        let mut table = Table::default();
        let first = table.stage(&reading(1, 10));
        let again = table.stage(&reading(1, 10));
        assert_eq!(first.id, again.id);

        table.commit(first);
        assert_eq!(table.stage(&reading(1, 11)).id, 2);
    }

    #[test]
    fn scans_are_inclusive() {
        let mut table = Table::default();
        for (sensor, ts) in [(1, 10), (2, 20), (1, 30)] {
            let staged = table.stage(&reading(sensor, ts));
            table.commit(staged);
        }

        assert_eq!(table.scan(10, 30, None).len(), 3);
        assert_eq!(table.scan(11, 29, None).len(), 1);
        assert_eq!(table.scan(0, 100, Some(1)).len(), 2);
        assert!(table.scan(40, 10, None).is_empty());
    }

    #[test]
    fn get_and_latest() {
        let mut table = Table::default();
        for ts in 0..5 {
            let staged = table.stage(&reading(1, ts));
            table.commit(staged);
        }

        assert_eq!(table.get(3).map(|m| m.timestamp()), Some(2));
        assert_eq!(table.get(99), None);

        let ids: Vec<_> = table.latest(2).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 4]);
    }
}
