//! Fuzz target: persisted config decoding
//!
//! Decodes arbitrary bytes the way the NVS adapter does at boot.  Whatever
//! decodes must either validate or be rejected with a typed error, and a
//! validated config must survive a re-encode unchanged.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use regenctl::config::ControllerConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(cfg) = postcard::from_bytes::<ControllerConfig>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let bytes = postcard::to_allocvec(&cfg).expect("encode validated config");
        let again: ControllerConfig = postcard::from_bytes(&bytes).expect("decode own encoding");
        assert_eq!(again, cfg);
    }
});
