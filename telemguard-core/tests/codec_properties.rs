//! Property tests for the wire codec
//!
//! Exercises the decoder with arbitrary buffers the way a hostile or
//! corrupted bus publish would.

use proptest::prelude::*;

use telemguard_core::{
    decode_envelope, decode_reading, encode_envelope, encode_reading, FrameError, SensorReading,
};

fn any_reading() -> impl Strategy<Value = SensorReading> {
    (
        any::<i32>(),
        -60.0f32..60.0,
        800.0f32..1200.0,
        0.0f32..100.0,
        any::<u64>(),
    )
        .prop_map(|(id, t, p, h, ts)| SensorReading::new(id, t, p, h, ts))
}

proptest! {
    #[test]
    fn reading_round_trip(reading in any_reading()) {
        prop_assert_eq!(decode_reading(&encode_reading(&reading)), Ok(reading));
    }

    #[test]
    fn any_24_bytes_decode(bytes in proptest::array::uniform24(any::<u8>())) {
        // Total over 24 bytes; re-encoding reproduces the bits, NaN included
        let reading = decode_reading(&bytes).unwrap();
        prop_assert_eq!(encode_reading(&reading), bytes);
    }

    #[test]
    fn other_lengths_are_malformed(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(bytes.len() != 24);
        let is_wrong_length = matches!(
            decode_reading(&bytes),
            Err(FrameError::WrongLength { expected: 24, .. })
        );
        prop_assert!(is_wrong_length);
    }

    #[test]
    fn short_buffers_never_decode(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        let is_too_short = matches!(decode_envelope(&bytes), Err(FrameError::TooShort { .. }));
        prop_assert!(is_too_short);
    }

    #[test]
    fn envelope_respects_declared_length(
        payload in proptest::array::uniform24(any::<u8>()),
        declared in 0u64..256,
        present in 0usize..256,
    ) {
        let mut frame = payload.to_vec();
        frame.extend_from_slice(&declared.to_le_bytes());
        frame.extend(std::iter::repeat(0x5A).take(present));

        match decode_envelope(&frame) {
            Ok(envelope) => {
                prop_assert!(declared as usize <= present);
                prop_assert_eq!(envelope.signature.len() as u64, declared);
                prop_assert_eq!(envelope.payload, &payload);
            }
            Err(err) => {
                prop_assert!(declared as usize > present);
                prop_assert_eq!(err, FrameError::SignatureOverrun { declared, available: present });
            }
        }
    }

    #[test]
    fn envelope_round_trip(
        reading in any_reading(),
        signature in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let payload = encode_reading(&reading);
        let frame = encode_envelope(&payload, &signature);
        let envelope = decode_envelope(&frame).unwrap();

        prop_assert_eq!(envelope.signature, signature.as_slice());
        prop_assert_eq!(decode_reading(envelope.payload), Ok(reading));
    }
}

#[test]
fn scenario_twenty_byte_frame() {
    let frame = [0u8; 20];
    assert_eq!(
        decode_envelope(&frame),
        Err(FrameError::TooShort { minimum: 32, actual: 20 })
    );
}
