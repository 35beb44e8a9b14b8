//! Historical queries
//!
//! Results are ordered newest first: timestamp descending, and among equal
//! timestamps the most recently stored (highest identifier) first.

use std::{cmp::Reverse, sync::Arc};

use serde::{Deserialize, Serialize};
use telemguard_core::{
    time::{TimeSource, Timestamp},
    MeasurementId, PersistedMeasurement,
};

use crate::{errors::ApiError, storage::MeasurementStore};

/// Range query parameters as received from a client
///
/// Absent bounds default to `0` and "now"; a `limit` that is absent or not
/// positive means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Inclusive lower bound (ms since epoch)
    pub start_timestamp: Option<Timestamp>,
    /// Inclusive upper bound (ms since epoch)
    pub end_timestamp: Option<Timestamp>,
    /// Only this sensor
    pub sensor_id: Option<i32>,
    /// Maximum number of rows
    pub limit: Option<i64>,
}

impl QueryParams {
    /// Everything between `start` and `end`
    pub fn range(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start_timestamp: Some(start),
            end_timestamp: Some(end),
            ..Self::default()
        }
    }

    /// Restrict to one sensor
    pub fn with_sensor(mut self, sensor_id: i32) -> Self {
        self.sensor_id = Some(sensor_id);
        self
    }

    /// Cap the number of rows
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Read side over a measurement store
pub struct QueryService {
    store: Arc<dyn MeasurementStore>,
    clock: Arc<dyn TimeSource>,
}

impl QueryService {
    /// Query service using `clock` for the default upper bound
    pub fn new(store: Arc<dyn MeasurementStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self { store, clock }
    }

    /// Range query with optional sensor filter and limit
    pub fn query(&self, params: &QueryParams) -> Result<Vec<PersistedMeasurement>, ApiError> {
        let start = params.start_timestamp.unwrap_or(0);
        let end = params.end_timestamp.unwrap_or_else(|| self.clock.now());

        let mut rows = match params.sensor_id {
            Some(sensor_id) => self.store.scan_sensor(sensor_id, start, end)?,
            None => self.store.scan_range(start, end)?,
        };

        rows.sort_by_key(|m| Reverse((m.timestamp(), m.id)));

        if let Some(limit) = params.limit.filter(|l| *l > 0) {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        log::debug!(
            "Query [{}, {}] sensor={:?} limit={:?} -> {} rows",
            start,
            end,
            params.sensor_id,
            params.limit,
            rows.len()
        );
        Ok(rows)
    }

    /// Single measurement by identifier
    pub fn get(&self, id: MeasurementId) -> Result<PersistedMeasurement, ApiError> {
        self.store.get(id)?.ok_or_else(|| ApiError::not_found(id))
    }

    /// The `n` most recent measurements, newest first
    pub fn latest(&self, n: usize) -> Result<Vec<PersistedMeasurement>, ApiError> {
        Ok(self.store.latest(n)?)
    }
}
