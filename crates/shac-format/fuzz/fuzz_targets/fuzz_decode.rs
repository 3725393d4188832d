//! Fuzz target for full SHAC decoding.
//!
//! Feeds arbitrary bytes to `shac_format::decode` to find panics in the
//! index walk, metadata parsing and sample decoding.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(scene) = shac_format::decode(data) {
        let channels = scene.header.channels as usize;
        let samples = scene.header.samples as usize;
        for layer in scene.layers.values() {
            assert_eq!(layer.channel_count(), channels);
            assert!(layer.channels.iter().all(|c| c.len() == samples));
            assert!(layer.metadata.gain.is_finite());
            assert!(layer.metadata.position.iter().all(|p| p.is_finite()));
        }
    }
});
