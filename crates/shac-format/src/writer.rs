//! SHAC writer — serializes ambisonic layers into a SHAC buffer.
//!
//! The writer uses a builder pattern: create a [`ShacWriter`] with the shared
//! stream parameters, add layers, then call [`ShacWriter::to_bytes`] or
//! [`ShacWriter::finalize`] to produce the complete buffer.
//!
//! # Example
//!
//! ```rust,no_run
//! use shac_format::{LayerMetadata, SampleEncoding, ShacWriter};
//! use std::path::Path;
//!
//! let silence = vec![vec![0.0f32; 480]; 4];
//!
//! let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Int16, 480);
//! writer
//!     .add_layer("voice", &LayerMetadata::at([2.0, 1.0, 0.0]), &silence).unwrap()
//!     .add_layer("bed", &LayerMetadata::default().with_premixed(true), &silence).unwrap();
//! writer.finalize(Path::new("scene.shac")).unwrap();
//! ```

use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{FormatError, Result};
use crate::header::{SampleEncoding, ShacHeader, HEADER_SIZE};
use crate::index::LAYER_RECORD_PREFIX;
use crate::metadata::LayerMetadata;
use crate::samples::encode_samples;

/// A layer ready to be written: identifier, metadata text and encoded payload.
#[derive(Debug, Clone)]
struct PendingLayer {
    id: String,
    metadata: Vec<u8>,
    payload: Vec<u8>,
}

impl PendingLayer {
    fn record_size(&self) -> usize {
        LAYER_RECORD_PREFIX + self.id.len() + self.metadata.len() + self.payload.len()
    }
}

/// Builder for SHAC buffers.
///
/// Every layer shares the writer's order, sample rate, encoding and length.
#[derive(Debug, Clone)]
pub struct ShacWriter {
    /// The file header (`layer_count` is filled in when writing).
    header: ShacHeader,
    /// Layers in the order they were added.
    layers: Vec<PendingLayer>,
}

impl ShacWriter {
    /// Create a writer for layers of `order`, each `samples` long.
    pub fn new(order: u16, sample_rate: u32, encoding: SampleEncoding, samples: u32) -> Self {
        Self {
            header: ShacHeader::new(order, sample_rate, encoding, samples),
            layers: Vec::new(),
        }
    }

    /// Set the normalization scheme identifier stored in the header.
    pub fn set_normalization(&mut self, normalization: u16) -> &mut Self {
        self.header.normalization = normalization;
        self
    }

    pub fn header(&self) -> &ShacHeader {
        &self.header
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Add a layer whose metadata is serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ChannelCount`] if the writer's order exceeds
    /// [`MAX_ORDER`](crate::header::MAX_ORDER), and [`FormatError::LayerShape`]
    /// if the channel buffers do not match the writer's order and length or
    /// the identifier is too long.
    pub fn add_layer(
        &mut self,
        id: &str,
        metadata: &LayerMetadata,
        channels: &[Vec<f32>],
    ) -> Result<&mut Self> {
        let json = metadata.to_json().map_err(|e| FormatError::LayerShape {
            id: id.to_string(),
            reason: format!("metadata is not serializable: {e}"),
        })?;
        self.push_layer(id, json.into_bytes(), channels)
    }

    /// Add a layer with metadata text stored verbatim.
    ///
    /// Used to produce buffers carrying legacy or hand-written metadata.
    pub fn add_layer_with_raw_metadata(
        &mut self,
        id: &str,
        metadata: &str,
        channels: &[Vec<f32>],
    ) -> Result<&mut Self> {
        self.push_layer(id, metadata.as_bytes().to_vec(), channels)
    }

    fn push_layer(
        &mut self,
        id: &str,
        metadata: Vec<u8>,
        channels: &[Vec<f32>],
    ) -> Result<&mut Self> {
        self.header.check_channels()?;
        let shape_error = |reason: String| FormatError::LayerShape {
            id: id.to_string(),
            reason,
        };

        if self.layers.len() >= u16::MAX as usize {
            return Err(shape_error(format!(
                "a SHAC buffer holds at most {} layers",
                u16::MAX
            )));
        }
        if id.len() > u16::MAX as usize {
            return Err(shape_error(format!(
                "identifier is {} bytes, limit is {}",
                id.len(),
                u16::MAX
            )));
        }
        if metadata.len() > u32::MAX as usize {
            return Err(shape_error("metadata exceeds 4 GiB".to_string()));
        }
        if channels.len() != self.header.channels as usize {
            return Err(shape_error(format!(
                "{} channels given, order {} needs {}",
                channels.len(),
                self.header.order,
                self.header.channels
            )));
        }
        if let Some((ch, buf)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != self.header.samples as usize)
        {
            return Err(shape_error(format!(
                "channel {ch} has {} samples, expected {}",
                buf.len(),
                self.header.samples
            )));
        }

        let mut payload = Vec::new();
        for channel in channels {
            encode_samples(channel, self.header.encoding, &mut payload);
        }

        tracing::debug!(
            id,
            metadata_len = metadata.len(),
            payload_len = payload.len(),
            "Adding layer to writer"
        );

        self.layers.push(PendingLayer {
            id: id.to_string(),
            metadata,
            payload,
        });
        Ok(self)
    }

    /// Serialize the header and every layer record to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        self.header.check_channels()?;
        let mut header = self.header;
        header.layer_count = self.layers.len() as u16;
        header.write_to(w)?;

        for layer in &self.layers {
            w.write_u16::<LittleEndian>(layer.id.len() as u16)?;
            w.write_u32::<LittleEndian>(layer.metadata.len() as u32)?;
            w.write_all(layer.id.as_bytes())?;
            w.write_all(&layer.metadata)?;
            w.write_all(&layer.payload)?;
        }
        Ok(())
    }

    /// Total size of the serialized buffer in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.layers.iter().map(PendingLayer::record_size).sum::<usize>()
    }

    /// Serialize into a new byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Write the complete buffer to `path`.
    pub fn finalize(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), layers = self.layers.len(), "Finalizing SHAC file");

        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;

        tracing::info!(
            path = %path.display(),
            file_size = self.encoded_len(),
            "SHAC file written successfully"
        );
        Ok(())
    }
}
