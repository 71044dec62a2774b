//! Fuzz target: `modbus::parse_read_input_response`
//!
//! Feeds arbitrary bytes as a probe reply and asserts the parser never
//! panics and only accepts frames whose CRC and address check out.
//!
//! cargo fuzz run fuzz_modbus_response

#![no_main]

use libfuzzer_sys::fuzz_target;
use regenctl::sensors::modbus::{crc16, parse_read_input_response, RESPONSE_LEN};

fuzz_target!(|data: &[u8]| {
    let Some((&address, frame)) = data.split_first() else {
        return;
    };

    if let Ok(raw) = parse_read_input_response(address, frame) {
        assert!(frame.len() >= RESPONSE_LEN);
        assert_eq!(frame[0], address);
        let crc = u16::from_le_bytes([frame[5], frame[6]]);
        assert_eq!(crc16(&frame[..5]), crc);
        assert_eq!(raw, i16::from_be_bytes([frame[3], frame[4]]));
    }
});
