#![no_main]

use levin_protocol::{decode_section, encode_section};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes and re-encodes must be a fixed point of the codec
    if let Ok(section) = decode_section(data) {
        if let Ok(bytes) = encode_section(&section) {
            let again = decode_section(&bytes).expect("re-encoded section must decode");
            assert_eq!(encode_section(&again).ok(), Some(bytes));
        }
    }
});
