//! Fuzz target for layer metadata parsing (JSON and legacy literals).

#![no_main]

use libfuzzer_sys::fuzz_target;
use shac_format::MetadataParse;

fuzz_target!(|data: &[u8]| {
    // Every input yields usable metadata; failures fall back to defaults.
    let parsed = MetadataParse::parse(data);
    let meta = parsed.metadata();
    assert!(meta.gain.is_finite());
    assert!(meta.position.iter().all(|p| p.is_finite()));

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = shac_format::metadata::legacy_to_json(text);
    }
});
