//! Example: Read and inspect a SHAC buffer.
//!
//! Builds a small scene in memory, then prints the header, the layer index
//! and the decoded metadata of every layer.

use shac_format::{decode, LayerMetadata, SampleEncoding, ShacReader, ShacWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let silence = vec![vec![0.0f32; 4800]; 9];

    let mut writer = ShacWriter::new(2, 48000, SampleEncoding::Float32, 4800);
    writer
        .add_layer("bird", &LayerMetadata::at([1.0, 3.0, 2.0]).with_gain(0.7), &silence)?
        .add_layer_with_raw_metadata("wind", "{'position': (0, -4, 0), 'gain': 0.5}", &silence)?;
    let bytes = writer.to_bytes()?;

    println!("=== SHAC Inspector ===\n");

    let reader = ShacReader::new(&bytes)?;
    let h = reader.header();
    println!("Header:");
    println!("  Version:     {}", h.version);
    println!("  Order:       {} ({} channels)", h.order, h.channels);
    println!("  Sample rate: {} Hz", h.sample_rate);
    println!("  Bit depth:   {}", h.bit_depth());
    println!("  Duration:    {:.2}s", h.duration_secs());

    println!("\nLayers:");
    for entry in reader.layers() {
        println!(
            "  {:<8} record @ {:>6}, payload {} bytes @ {}",
            entry.id, entry.header_offset, entry.data_size, entry.data_offset
        );
    }

    let scene = decode(&bytes)?;
    println!("\nMetadata:");
    for layer in scene.layers.values() {
        println!(
            "  {:<8} {:?} gain {:.2} (from {:?})",
            layer.id, layer.metadata.position, layer.metadata.gain, layer.metadata_source
        );
    }

    Ok(())
}
