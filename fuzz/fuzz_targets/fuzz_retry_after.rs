#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = reservation_bridge::adapters::live::retry::parse_retry_after(raw);
    }
});
