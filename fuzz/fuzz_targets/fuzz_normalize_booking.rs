#![no_main]
use libfuzzer_sys::fuzz_target;
use reservation_bridge::adapters::normalizer::{BookingOperation, normalize_booking};

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) {
        for op in [
            BookingOperation::Create,
            BookingOperation::Update,
            BookingOperation::Cancel,
            BookingOperation::Event,
        ] {
            let _ = normalize_booking(op, &body, Some("fuzz-id"));
        }
    }
});
