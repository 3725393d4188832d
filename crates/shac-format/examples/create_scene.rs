//! Example: Create a SHAC scene with two synthetic layers.
//!
//! Encodes a 440 Hz tone as a first-order ambisonic point source in front of
//! the listener, adds a quieter pre-mixed bed, and writes a .shac file.

use std::f32::consts::PI;
use std::path::Path;

use shac_format::{LayerMetadata, SampleEncoding, ShacWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sample_rate = 48000u32;
    let samples = sample_rate; // 1 second

    let tone: Vec<f32> = (0..samples)
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin())
        .collect();

    // A source straight ahead (x forward): W carries the signal, X the
    // front/back component, Y and Z stay silent.
    let voice = vec![tone.clone(), vec![0.0; tone.len()], vec![0.0; tone.len()], tone.clone()];

    // An omnidirectional bed at a quarter of the level.
    let bed_w: Vec<f32> = tone.iter().map(|s| s * 0.25).collect();
    let bed = vec![bed_w, vec![0.0; tone.len()], vec![0.0; tone.len()], vec![0.0; tone.len()]];

    let mut writer = ShacWriter::new(1, sample_rate, SampleEncoding::Int16, samples);
    writer
        .add_layer("voice", &LayerMetadata::at([2.0, 0.0, 0.0]), &voice)?
        .add_layer(
            "bed",
            &LayerMetadata::default()
                .with_premixed(true)
                .with_source("room", [0.0, 0.0, 0.0]),
            &bed,
        )?;

    let output_path = Path::new("example_scene.shac");
    writer.finalize(output_path)?;

    println!("Created: {}", output_path.display());
    println!("  Layers: voice (point source, 2 m ahead), bed (pre-mixed)");
    println!("  Order 1, {} Hz, 16-bit, {} bytes", sample_rate, writer.encoded_len());

    // Clean up
    std::fs::remove_file(output_path)?;
    println!("  (Cleaned up temp file)");

    Ok(())
}
