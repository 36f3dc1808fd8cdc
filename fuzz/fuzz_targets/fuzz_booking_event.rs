#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = reservation_bridge::adapters::webhook::parse_booking_event(data);
});
