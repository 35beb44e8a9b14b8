//! Volatile store

use std::sync::{Mutex, MutexGuard, PoisonError};

use telemguard_core::{time::Timestamp, MeasurementId, PersistedMeasurement, SensorReading};

use super::{MeasurementStore, StorageError, Table};

/// In-memory store for tests and embedding; contents are lost on drop
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    /// Empty store; the first identifier is 1
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MeasurementStore for MemoryStore {
    fn append(&self, reading: &SensorReading) -> Result<PersistedMeasurement, StorageError> {
        let mut table = self.table();
        let measurement = table.stage(reading);
        table.commit(measurement);
        Ok(measurement)
    }

    fn scan_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PersistedMeasurement>, StorageError> {
        Ok(self.table().scan(start, end, None))
    }

    fn scan_sensor(
        &self,
        sensor_id: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PersistedMeasurement>, StorageError> {
        Ok(self.table().scan(start, end, Some(sensor_id)))
    }

    fn get(&self, id: MeasurementId) -> Result<Option<PersistedMeasurement>, StorageError> {
        Ok(self.table().get(id))
    }

    fn latest(&self, n: usize) -> Result<Vec<PersistedMeasurement>, StorageError> {
        Ok(self.table().latest(n))
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.table().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn concurrent_appends_get_distinct_increasing_ids() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8)
            .map(|sensor| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..25)
                        .map(|ts| {
                            store
                                .append(&SensorReading::new(sensor, 1.0, 1000.0, 50.0, ts))
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=200).collect::<Vec<_>>());

        let positions: Vec<u64> = store.latest(200).unwrap().iter().map(|m| m.position).collect();
        assert_eq!(positions, (0..200).rev().collect::<Vec<_>>());
    }
}
