//! Sensor readings and their persisted form
//!
//! A [`SensorReading`] is what the device measured. A
//! [`PersistedMeasurement`] is the same reading after the gateway stored it
//! and gave it an identifier; it is never mutated afterwards.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Storage-assigned identifier, strictly increasing in ingestion order
pub type MeasurementId = u64;

/// One sample published by a sensor device
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Originating device
    pub sensor_id: i32,
    /// Air temperature (°C)
    pub temperature: f32,
    /// Barometric pressure (hPa)
    pub pressure: f32,
    /// Relative humidity (%)
    pub humidity: f32,
    /// Sample time, milliseconds since epoch
    pub timestamp: Timestamp,
}

impl SensorReading {
    /// Create a reading from its raw fields
    pub const fn new(
        sensor_id: i32,
        temperature: f32,
        pressure: f32,
        humidity: f32,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sensor_id,
            temperature,
            pressure,
            humidity,
            timestamp,
        }
    }
}

/// A reading that has been stored
///
/// Serializes flat, so live subscribers and query clients see
/// `{"id", "sensor_id", "temperature", "pressure", "humidity", "timestamp"}`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PersistedMeasurement {
    /// Unique identifier
    pub id: MeasurementId,

    /// The stored reading
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub reading: SensorReading,

    /// Zero-based insertion position inside the store
    #[cfg_attr(feature = "serde", serde(skip))]
    pub position: u64,
}

impl PersistedMeasurement {
    /// Originating device of the stored reading
    pub fn sensor_id(&self) -> i32 {
        self.reading.sensor_id
    }

    /// Sample time of the stored reading
    pub fn timestamp(&self) -> Timestamp {
        self.reading.timestamp
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn measurement_serializes_flat() {
        let measurement = PersistedMeasurement {
            id: 7,
            reading: SensorReading::new(1, 25.5, 1013.25, 65.2, 1_720_328_207_000),
            position: 6,
        };

        let json = serde_json::to_value(measurement).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["sensor_id"], 1);
        assert_eq!(json["timestamp"], 1_720_328_207_000u64);
        assert!(json.get("reading").is_none());
        assert!(json.get("position").is_none());
    }
}
