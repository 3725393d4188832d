//! End-to-end decoding tests: build SHAC buffers with `ShacWriter` (or by
//! hand), decode them back and verify header, metadata and samples.

use shac_format::{
    decode, parse_index, FormatError, LayerMetadata, MetadataSource, SampleEncoding, ShacReader,
    ShacWriter, HEADER_SIZE,
};

/// Helper: a sine wave of `samples` values.
fn generate_sine(freq: f32, sample_rate: u32, samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| 0.8 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Helper: `(order + 1)²` channels, each a sine at a different frequency.
fn field(order: u16, sample_rate: u32, samples: usize) -> Vec<Vec<f32>> {
    let channels = (order as usize + 1).pow(2);
    (0..channels)
        .map(|c| generate_sine(110.0 * (c + 1) as f32, sample_rate, samples))
        .collect()
}

#[test]
fn test_voice_scenario() {
    // Order 1, 48 kHz, 32-bit, 480 samples, one layer at [1, 0, 0].
    let mut channels = vec![vec![0.0f32; 480]; 4];
    channels[0] = vec![0.5; 480];

    let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Float32, 480);
    writer
        .add_layer("voice", &LayerMetadata::at([1.0, 0.0, 0.0]), &channels)
        .unwrap();
    let bytes = writer.to_bytes().unwrap();

    let index = parse_index(&bytes).unwrap();
    assert_eq!(index.header.order, 1);
    assert_eq!(index.header.channels, 4);
    assert_eq!(index.header.sample_rate, 48000);
    assert_eq!(index.header.bit_depth(), 32);
    assert_eq!(index.header.samples, 480);
    assert_eq!(index.layers.len(), 1);
    assert_eq!(index.layers[0].data_size, 4 * 480 * 4);

    let scene = decode(&bytes).unwrap();
    let voice = scene.layer("voice").unwrap();
    assert_eq!(voice.metadata.position, [1.0, 0.0, 0.0]);
    assert_eq!(voice.metadata.gain, 1.0);
    assert!(!voice.is_premixed());
    assert_eq!(voice.channels[0], vec![0.5; 480]);
    assert!(voice.channels[1..].iter().flatten().all(|&s| s == 0.0));
}

#[test]
fn test_float_round_trip_is_bit_exact() {
    let channels = field(3, 44100, 1000);
    let mut writer = ShacWriter::new(3, 44100, SampleEncoding::Float32, 1000);
    writer
        .add_layer("strings", &LayerMetadata::at([-1.5, 2.25, 0.125]), &channels)
        .unwrap();
    let bytes = writer.to_bytes().unwrap();

    let scene = decode(&bytes).unwrap();
    let layer = &scene.layers["strings"];
    assert_eq!(layer.channel_count(), 16);
    assert_eq!(layer.sample_count(), 1000);
    assert_eq!(layer.metadata.position, [-1.5, 2.25, 0.125]);
    for (ch, (orig, dec)) in channels.iter().zip(&layer.channels).enumerate() {
        for (i, (o, d)) in orig.iter().zip(dec).enumerate() {
            assert_eq!(o.to_bits(), d.to_bits(), "channel {ch} sample {i} mismatch");
        }
    }
}

#[test]
fn test_int16_round_trip_within_one_step() {
    let channels = field(1, 48000, 512);
    let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Int16, 512);
    writer
        .add_layer("hum", &LayerMetadata::default(), &channels)
        .unwrap();
    let bytes = writer.to_bytes().unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE + 6 + 3 + writer_meta_len(&bytes) + 4 * 512 * 2);

    let scene = decode(&bytes).unwrap();
    let layer = &scene.layers["hum"];
    for (orig, dec) in channels.iter().zip(&layer.channels) {
        for (o, d) in orig.iter().zip(dec) {
            assert!((o - d).abs() <= 0.5 / 32767.0 + 1e-7, "{o} vs {d}");
        }
    }
}

/// Metadata length of the first layer record.
fn writer_meta_len(bytes: &[u8]) -> usize {
    let rec = &bytes[HEADER_SIZE..];
    u32::from_le_bytes([rec[2], rec[3], rec[4], rec[5]]) as usize
}

#[test]
fn test_many_layers_parallel_decode() {
    let channels = field(2, 48000, 64);
    let mut writer = ShacWriter::new(2, 48000, SampleEncoding::Float32, 64);
    for i in 0..16 {
        writer
            .add_layer(
                &format!("src{i:02}"),
                &LayerMetadata::at([i as f64, 0.0, 1.0]).with_gain(0.5),
                &channels,
            )
            .unwrap();
    }
    let bytes = writer.to_bytes().unwrap();

    let scene = decode(&bytes).unwrap();
    assert!(scene.is_complete());
    assert_eq!(scene.layers.len(), 16);
    // BTreeMap ordering by identifier
    let ids: Vec<&str> = scene.layers.keys().map(String::as_str).collect();
    assert_eq!(ids.first(), Some(&"src00"));
    assert_eq!(ids.last(), Some(&"src15"));
    for (i, layer) in scene.layers.values().enumerate() {
        assert_eq!(layer.metadata.position[0], i as f64);
        assert_eq!(layer.metadata.gain, 0.5);
        assert_eq!(layer.channels, channels);
    }
}

#[test]
fn test_legacy_and_broken_metadata() {
    let channels = field(0, 8000, 8);
    let mut writer = ShacWriter::new(0, 8000, SampleEncoding::Float32, 8);
    writer
        .add_layer_with_raw_metadata(
            "legacy",
            "{'position': (1, 2, 3), 'gain': 0.25, 'premixed': False, 'label': None,}",
            &channels,
        )
        .unwrap()
        .add_layer_with_raw_metadata("broken", "position = [1, 2, 3]", &channels)
        .unwrap()
        .add_layer_with_raw_metadata("empty", "", &channels)
        .unwrap();
    let bytes = writer.to_bytes().unwrap();

    let scene = decode(&bytes).unwrap();
    assert!(scene.is_complete(), "metadata problems never fail a layer");

    let legacy = &scene.layers["legacy"];
    assert_eq!(legacy.metadata_source, MetadataSource::Legacy);
    assert_eq!(legacy.metadata.position, [1.0, 2.0, 3.0]);
    assert_eq!(legacy.metadata.gain, 0.25);
    assert_eq!(legacy.metadata.extra.get("label"), Some(&serde_json::Value::Null));

    for id in ["broken", "empty"] {
        let layer = &scene.layers[id];
        assert_eq!(layer.metadata_source, MetadataSource::Default, "{id}");
        assert_eq!(layer.metadata, LayerMetadata::default(), "{id}");
        assert_eq!(layer.channels, channels, "{id}");
    }
}

#[test]
fn test_premixed_scene() {
    let channels = field(1, 48000, 32);
    let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Int16, 32);
    writer
        .add_layer(
            "mix",
            &LayerMetadata::default()
                .with_premixed(true)
                .with_source("bird", [1.0, 2.0, 0.0])
                .with_source("stream", [-3.0, 0.0, 0.0]),
            &channels,
        )
        .unwrap();
    let bytes = writer.to_bytes().unwrap();

    let scene = decode(&bytes).unwrap();
    let mix = scene.premixed_layer().expect("single pre-mixed layer");
    assert_eq!(mix.id, "mix");
    assert_eq!(mix.metadata.sources.len(), 2);
    assert_eq!(mix.metadata.sources[1].name, "stream");
}

#[test]
fn test_truncated_buffers_never_panic() {
    let channels = field(1, 48000, 16);
    let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Float32, 16);
    writer
        .add_layer("a", &LayerMetadata::at([0.0, 1.0, 0.0]), &channels)
        .unwrap()
        .add_layer("b", &LayerMetadata::at([0.0, -1.0, 0.0]), &channels)
        .unwrap();
    let bytes = writer.to_bytes().unwrap();

    for len in 0..bytes.len() {
        match decode(&bytes[..len]) {
            Err(FormatError::Truncated { .. }) => {}
            Err(other) => panic!("length {len}: unexpected error {other}"),
            Ok(_) => panic!("length {len}: truncated buffer decoded"),
        }
    }
    assert!(decode(&bytes).is_ok());
}

#[test]
fn test_trailing_bytes_ignored() {
    let channels = field(0, 8000, 4);
    let mut writer = ShacWriter::new(0, 8000, SampleEncoding::Float32, 4);
    writer
        .add_layer("a", &LayerMetadata::default(), &channels)
        .unwrap();
    let mut bytes = writer.to_bytes().unwrap();
    bytes.extend_from_slice(&[0xAB; 7]);

    let scene = decode(&bytes).unwrap();
    assert_eq!(scene.layers["a"].channels, channels);
}

#[test]
fn test_payload_at_odd_offset() {
    // A 3-byte id puts the float payload at an address that is not a
    // multiple of four.
    let channels = field(1, 48000, 8);
    let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Float32, 8);
    writer
        .add_layer_with_raw_metadata("odd", "{}", &channels)
        .unwrap();
    let bytes = writer.to_bytes().unwrap();

    let reader = ShacReader::new(&bytes).unwrap();
    let entry = &reader.layers()[0];
    assert_eq!(entry.data_offset % 4, (HEADER_SIZE + 6 + 3 + 2) % 4);
    assert_ne!(entry.data_offset % 4, 0);
    assert_eq!(reader.read_layer(entry).unwrap().channels, channels);
}

#[test]
fn test_rejects_foreign_file() {
    let wav_like = b"RIFF\x24\x00\x00\x00WAVEfmt ";
    assert!(matches!(decode(wav_like), Err(FormatError::BadMagic)));
    assert!(matches!(decode(b""), Err(FormatError::Truncated { .. })));
}
