//! SHAC CLI — inspect, render and create `.shac` spatial audio scenes.
//!
//! # Usage
//!
//! ```bash
//! shac encode voice.wav -o scene.shac --order 3 --id voice --position 1,2,0
//! shac info scene.shac
//! shac info scene.shac --json
//! shac render scene.shac -o binaural.wav --yaw 30 --listener 0,0,0
//! shac render scene.shac -o voice.wav --layer voice --config scene.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use shac_format::{
    LayerIndexEntry, LayerMetadata, MetadataParse, SampleEncoding, ShacHeader, ShacReader,
    ShacWriter, MAX_ORDER,
};
use shac_spatial::{sn3d_basis, Listener, SceneConfig, SceneRenderer, StereoBuffer};

// ───────────────────────────── CLI definition ─────────────────────────────

/// Top-level CLI entry point for the `shac` binary.
#[derive(Parser)]
#[command(
    name = "shac",
    about = "SHAC -- layered spherical-harmonic audio scenes",
    version,
    long_about = "Inspect SHAC containers, render them to binaural stereo for a listener\n\
                  pose, and encode mono recordings as positioned ambisonic layers."
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available sub-commands.
#[derive(Subcommand)]
enum Commands {
    /// Display the header, layer index and metadata of a .shac file.
    Info {
        /// Input .shac file path.
        input: PathBuf,

        /// Output file information as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a .shac scene to a binaural stereo WAV file.
    Render {
        /// Input .shac file path.
        input: PathBuf,

        /// Output WAV file path (32-bit float, stereo).
        #[arg(short, long)]
        output: PathBuf,

        /// Head yaw in degrees (positive turns left).
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        yaw: f64,

        /// Head pitch in degrees (positive looks up).
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        pitch: f64,

        /// Head roll in degrees (positive tilts toward the right shoulder).
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        roll: f64,

        /// Listener position as "x,y,z" in meters.
        #[arg(long, allow_hyphen_values = true)]
        listener: Option<String>,

        /// Render only the layer with this identifier.
        #[arg(long)]
        layer: Option<String>,

        /// Path to a JSON scene configuration (reference distance, caches, HRTF).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Encode a mono WAV file as a single-layer .shac scene.
    Encode {
        /// Input WAV file path. Multi-channel input is averaged to mono.
        input: PathBuf,

        /// Output .shac file path.
        #[arg(short, long)]
        output: PathBuf,

        /// Ambisonic order of the layer.
        #[arg(long, default_value_t = 1)]
        order: u16,

        /// Layer identifier. Defaults to the input file name.
        #[arg(long)]
        id: Option<String>,

        /// Layer position as "x,y,z" in meters.
        #[arg(long, default_value = "1,0,0", allow_hyphen_values = true)]
        position: String,

        /// Layer gain.
        #[arg(long, default_value_t = 1.0)]
        gain: f64,

        /// Sample bit depth (16 or 32).
        #[arg(long, default_value_t = 32)]
        bit_depth: u32,
    },
}

// ────────────────────────────── main ──────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info { input, json } => cmd_info(&input, json),

        Commands::Render {
            input,
            output,
            yaw,
            pitch,
            roll,
            listener,
            layer,
            config,
        } => {
            let position = match listener.as_deref() {
                Some(text) => parse_vec3(text).context("Invalid --listener")?,
                None => [0.0; 3],
            };
            let listener = Listener::at(position).with_orientation(
                yaw.to_radians(),
                pitch.to_radians(),
                roll.to_radians(),
            );
            cmd_render(&input, &output, &listener, layer.as_deref(), config.as_deref())
        }

        Commands::Encode {
            input,
            output,
            order,
            id,
            position,
            gain,
            bit_depth,
        } => {
            let position = parse_vec3(&position).context("Invalid --position")?;
            cmd_encode(&input, &output, order, id.as_deref(), position, gain, bit_depth)
        }
    }
}

// ───────────────────────────── info ───────────────────────────────

/// Display information about a `.shac` file.
///
/// If `--json` is specified, outputs the full info structure as JSON.
/// Otherwise, prints a human-readable summary.
fn cmd_info(input: &Path, json: bool) -> Result<()> {
    let bytes = read_file(input)?;
    let reader = ShacReader::new(&bytes)
        .with_context(|| format!("Failed to parse SHAC file: {}", input.display()))?;

    let layers = reader
        .layers()
        .iter()
        .map(|entry| {
            let metadata = reader
                .read_metadata(entry)
                .with_context(|| format!("Failed to read metadata of layer '{}'", entry.id))?;
            let payload = reader
                .payload(entry)
                .with_context(|| format!("Failed to read payload of layer '{}'", entry.id))?;
            Ok(LayerInfo {
                entry,
                metadata,
                fingerprint: blake3::hash(payload).to_hex().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let info = FileInfo {
        path: input,
        file_size: bytes.len() as u64,
        header: reader.header(),
        layers: &layers,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info.to_json()?)?);
    } else {
        info.print_human();
    }
    Ok(())
}

/// One indexed layer with its parsed metadata.
struct LayerInfo<'a> {
    entry: &'a LayerIndexEntry,
    metadata: MetadataParse,
    /// BLAKE3 hash of the raw payload, hex encoded.
    fingerprint: String,
}

/// Collected information about a `.shac` file, used for display.
struct FileInfo<'a> {
    path: &'a Path,
    file_size: u64,
    header: &'a ShacHeader,
    layers: &'a [LayerInfo<'a>],
}

impl FileInfo<'_> {
    /// Build a JSON representation of the file info.
    fn to_json(&self) -> Result<serde_json::Value> {
        let layers = self
            .layers
            .iter()
            .map(|l| {
                Ok(serde_json::json!({
                    "id": l.entry.id,
                    "metadata_offset": l.entry.metadata_offset,
                    "metadata_len": l.entry.metadata_len,
                    "data_offset": l.entry.data_offset,
                    "data_size": l.entry.data_size,
                    "metadata_source": l.metadata.source(),
                    "metadata_error": l.metadata.error().map(|e| e.to_string()),
                    "metadata": serde_json::to_value(l.metadata.metadata())?,
                    "blake3": l.fingerprint,
                }))
            })
            .collect::<Result<Vec<serde_json::Value>>>()?;

        Ok(serde_json::json!({
            "file": self.path.display().to_string(),
            "file_size": self.file_size,
            "header": serde_json::to_value(self.header)?,
            "bit_depth": self.header.bit_depth(),
            "duration_secs": self.header.duration_secs(),
            "layers": layers,
        }))
    }

    /// Print a human-readable summary of the `.shac` file.
    fn print_human(&self) {
        let h = self.header;
        println!();
        println!("  SHAC File Information");
        println!("  ============================================");
        println!("  File:       {}", self.path.display());
        println!(
            "  Size:       {} bytes ({})",
            self.file_size,
            human_size(self.file_size)
        );
        println!("  Version:    {}", h.version);
        println!("  Order:      {} ({} channels)", h.order, h.channels);
        println!("  Rate:       {} Hz", h.sample_rate);
        println!("  Bit depth:  {}", h.bit_depth());
        println!(
            "  Duration:   {:.3}s ({} samples)",
            h.duration_secs(),
            h.samples
        );
        println!("  Layers:     {}", h.layer_count);
        println!("  Normalization id: {}", h.normalization);

        println!();
        println!("  Layers");
        println!("  --------------------------------------------");
        for l in self.layers {
            let meta = l.metadata.metadata();
            let [x, y, z] = meta.position;
            println!(
                "  {} | pos ({x:.2}, {y:.2}, {z:.2}) | gain {:.3}{} | {} bytes | BLAKE3: {}...",
                l.entry.id,
                meta.gain,
                if meta.premixed { " | pre-mixed" } else { "" },
                l.entry.data_size,
                &l.fingerprint[..16],
            );
            match l.metadata.error() {
                Some(e) => println!("      metadata: defaults ({e})"),
                None => println!("      metadata: {:?}", l.metadata.source()),
            }
            for s in &meta.sources {
                let [x, y, z] = s.position;
                println!("      source {} at ({x:.2}, {y:.2}, {z:.2})", s.name);
            }
        }
        println!();
    }
}

// ──────────────────────────── render ──────────────────────────────

/// Render a scene (or one layer of it) to a stereo WAV file.
fn cmd_render(
    input: &Path,
    output: &Path,
    listener: &Listener,
    layer: Option<&str>,
    config: Option<&Path>,
) -> Result<()> {
    let config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config file: {}", path.display()))?;
            SceneConfig::from_json(&text)
                .with_context(|| format!("Invalid scene configuration: {}", path.display()))?
        }
        None => SceneConfig::default(),
    };

    let bytes = read_file(input)?;
    let reader = ShacReader::new(&bytes)
        .with_context(|| format!("Failed to parse SHAC file: {}", input.display()))?;
    let sample_rate = reader.header().sample_rate;
    let renderer = SceneRenderer::new(config);

    let stereo = match layer {
        Some(id) => {
            let decoded = reader
                .read_layer_by_id(id)
                .with_context(|| format!("Cannot read layer '{id}'"))?;
            renderer
                .render_layer(&decoded, listener)
                .with_context(|| format!("Cannot render layer '{id}'"))?
        }
        None => {
            let scene = reader.decode_all();
            for failure in &scene.failures {
                warn!(id = %failure.id, error = %failure.error, "layer not decoded");
            }
            let mix = renderer.render_scene(&scene, listener);
            if mix.rendered.is_empty() && !(mix.failures.is_empty() && scene.failures.is_empty()) {
                bail!(
                    "No layer of {} could be rendered ({} decode, {} render failures)",
                    input.display(),
                    scene.failures.len(),
                    mix.failures.len()
                );
            }
            mix.output
        }
    };

    write_stereo_wav(output, &stereo, sample_rate)?;

    let stats = renderer.renderer().engine_stats();
    info!(
        output = %output.display(),
        samples = stereo.len(),
        peak = stereo.peak(),
        basis_hits = stats.basis.hits,
        basis_misses = stats.basis.misses,
        "render complete"
    );
    println!(
        "Rendered {} -> {} ({} samples @ {} Hz, peak {:.4})",
        input.display(),
        output.display(),
        stereo.len(),
        sample_rate,
        stereo.peak()
    );
    Ok(())
}

// ──────────────────────────── encode ──────────────────────────────

/// Encode a mono WAV file as a single positioned layer.
///
/// The signal is placed straight ahead in the layer's own field; the
/// layer position is what steers it at render time.
fn cmd_encode(
    input: &Path,
    output: &Path,
    order: u16,
    id: Option<&str>,
    position: [f64; 3],
    gain: f64,
    bit_depth: u32,
) -> Result<()> {
    let encoding = SampleEncoding::from_bit_depth(bit_depth)
        .with_context(|| format!("Unsupported bit depth {bit_depth}. Supported: 16, 32"))?;
    if !gain.is_finite() {
        bail!("Gain must be finite, got {gain}");
    }

    let audio = read_wav(input)?;
    let mono = audio.to_mono();
    let samples = u32::try_from(mono.len())
        .with_context(|| format!("{} is too long for a SHAC layer", input.display()))?;

    let id = match id {
        Some(id) => id.to_string(),
        None => input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("layer")
            .to_string(),
    };

    let mut writer = ShacWriter::new(order, audio.sample_rate, encoding, samples);
    writer
        .header()
        .check_channels()
        .with_context(|| format!("Unsupported order {order}. Maximum: {MAX_ORDER}"))?;

    let channels: Vec<Vec<f32>> = sn3d_basis(order, 0.0, 0.0)
        .iter()
        .map(|&weight| mono.iter().map(|&s| s * weight as f32).collect())
        .collect();

    writer
        .add_layer(&id, &LayerMetadata::at(position).with_gain(gain), &channels)
        .with_context(|| format!("Cannot add layer '{id}'"))?;
    writer
        .finalize(output)
        .with_context(|| format!("Cannot write SHAC file: {}", output.display()))?;

    println!(
        "Encoded {} -> {} (layer '{}', order {}, {} channels, {} samples @ {} Hz, {}-bit)",
        input.display(),
        output.display(),
        id,
        order,
        channels.len(),
        samples,
        audio.sample_rate,
        bit_depth
    );
    Ok(())
}

// ──────────────────────── helper functions ─────────────────────────

/// Audio data read from a WAV file.
struct WavAudio {
    /// Interleaved f32 PCM samples.
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl WavAudio {
    /// Average all channels into one.
    fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Cannot read file: {}", path.display()))
}

/// Read a WAV file and return the PCM samples as interleaved f32.
fn read_wav(path: &Path) -> Result<WavAudio> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Cannot open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| {
                    let s = s.context("Failed to read WAV sample")?;
                    Ok(s as f32 / max_val)
                })
                .collect::<Result<Vec<f32>>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.context("Failed to read WAV sample"))
            .collect::<Result<Vec<f32>>>()?,
    };

    Ok(WavAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Write a stereo buffer as a 32-bit float WAV file.
fn write_stereo_wav(path: &Path, stereo: &StereoBuffer, sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Cannot create WAV file: {}", path.display()))?;
    for sample in stereo.interleaved() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Parse `"x,y,z"` into three finite coordinates.
fn parse_vec3(text: &str) -> Result<[f64; 3]> {
    let parts = text
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .with_context(|| format!("'{}' is not a number", p.trim()))
        })
        .collect::<Result<Vec<f64>>>()?;
    match parts.as_slice() {
        &[x, y, z] if parts.iter().all(|v| v.is_finite()) => Ok([x, y, z]),
        &[_, _, _] => bail!("Coordinates must be finite: '{text}'"),
        _ => bail!("Expected three comma-separated coordinates, got '{text}'"),
    }
}

/// Format a byte count as a human-readable size string.
fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
