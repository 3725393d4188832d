//! Fuzz target for SHAC header and layer index parsing.
//!
//! Prepends the SHAC magic and a valid version so most inputs reach the
//! field validation and layer walk instead of failing on the magic check.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut input = b"SHAC".to_vec();
    input.extend_from_slice(&1u16.to_le_bytes());
    input.extend_from_slice(data);

    // Should never panic, only return errors
    if let Ok(index) = shac_format::parse_index(&input) {
        for entry in &index.layers {
            assert!(entry.end_offset() <= input.len());
            let _ = &input[entry.data_range()];
            let _ = &input[entry.metadata_range()];
        }
    }
});
