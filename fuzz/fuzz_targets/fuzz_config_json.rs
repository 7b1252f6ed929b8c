//! Fuzz target: `RelayConfig::from_json`
//!
//! Any document either fails cleanly or yields a config that passes its
//! own validation.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use envrelay::config::RelayConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(cfg) = RelayConfig::from_json(text) {
        assert!(cfg.validate().is_ok());
    }
});
