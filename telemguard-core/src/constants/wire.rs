//! Wire Layout Constants
//!
//! Byte offsets shared by the sensor firmware and the gateway. The reading is
//! a packed little-endian struct:
//!
//! ```text
//! offset  size  field
//!      0     4  sensor_id    (i32)
//!      4     4  temperature  (f32, °C)
//!      8     4  pressure     (f32, hPa)
//!     12     4  humidity     (f32, %)
//!     16     8  timestamp    (u64, ms since epoch)
//! ```
//!
//! A signed envelope appends `signature_length: u64` and the signature bytes.

/// Size of an encoded reading (bytes).
pub const READING_LEN: usize = 24;

/// Size of the signature length prefix that follows the reading (bytes).
pub const SIGNATURE_LEN_FIELD_LEN: usize = 8;

/// Minimum size of a signed envelope: reading plus length prefix.
pub const ENVELOPE_HEADER_LEN: usize = READING_LEN + SIGNATURE_LEN_FIELD_LEN;

pub(crate) const SENSOR_ID_OFFSET: usize = 0;
pub(crate) const TEMPERATURE_OFFSET: usize = 4;
pub(crate) const PRESSURE_OFFSET: usize = 8;
pub(crate) const HUMIDITY_OFFSET: usize = 12;
pub(crate) const TIMESTAMP_OFFSET: usize = 16;

/// Authentication tag appended to AES-GCM ciphertext (bytes).
pub const TAG_LEN: usize = 16;

/// Shortest initialization vector accepted for the cipher envelope (bytes).
pub const IV_MIN_LEN: usize = 12;

/// Longest initialization vector accepted for the cipher envelope (bytes).
pub const IV_MAX_LEN: usize = 16;
