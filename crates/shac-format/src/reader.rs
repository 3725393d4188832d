//! SHAC reader — turns an in-memory SHAC buffer into decoded layers.
//!
//! The reader borrows the source bytes, builds the layer index up front and
//! decodes layers on demand. Each layer occupies a disjoint byte range, so
//! [`ShacReader::decode_all`] decodes layers in parallel.
//!
//! # Example
//!
//! ```rust
//! use shac_format::{LayerMetadata, SampleEncoding, ShacReader, ShacWriter};
//!
//! let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Float32, 4);
//! writer
//!     .add_layer("voice", &LayerMetadata::at([1.0, 0.0, 0.0]), &vec![vec![0.5; 4]; 4])
//!     .unwrap();
//! let bytes = writer.to_bytes().unwrap();
//!
//! let reader = ShacReader::new(&bytes).unwrap();
//! let voice = reader.read_layer_by_id("voice").unwrap();
//! assert_eq!(voice.channel_count(), 4);
//! assert_eq!(voice.metadata.position, [1.0, 0.0, 0.0]);
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::{FormatError, Result};
use crate::header::ShacHeader;
use crate::index::{parse_index, LayerIndexEntry, ShacIndex};
use crate::layer::{DecodedLayer, DecodedScene, LayerFailure};
use crate::metadata::MetadataParse;
use crate::samples::decode_channels;

/// Reader over a borrowed SHAC buffer.
#[derive(Debug, Clone)]
pub struct ShacReader<'a> {
    /// The complete source buffer.
    bytes: &'a [u8],
    /// Header and layer index parsed from `bytes`.
    index: ShacIndex,
}

impl<'a> ShacReader<'a> {
    /// Parse the header and layer index of `bytes`.
    ///
    /// # Errors
    ///
    /// Any [`FormatError`] from [`parse_index`]. No audio is decoded here.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let index = parse_index(bytes)?;
        tracing::info!(
            version = index.header.version,
            order = index.header.order,
            channels = index.header.channels,
            sample_rate = index.header.sample_rate,
            bit_depth = index.header.bit_depth(),
            samples = index.header.samples,
            layers = index.layers.len(),
            "Parsed SHAC index"
        );
        Ok(Self { bytes, index })
    }

    pub fn header(&self) -> &ShacHeader {
        &self.index.header
    }

    pub fn index(&self) -> &ShacIndex {
        &self.index
    }

    pub fn layers(&self) -> &[LayerIndexEntry] {
        &self.index.layers
    }

    /// Raw audio payload of a layer.
    pub fn payload(&self, entry: &LayerIndexEntry) -> Result<&'a [u8]> {
        self.checked_slice(entry.data_offset, entry.data_size, "layer audio payload")
    }

    /// Parse the metadata block of a layer.
    pub fn read_metadata(&self, entry: &LayerIndexEntry) -> Result<MetadataParse> {
        let raw = self.checked_slice(entry.metadata_offset, entry.metadata_len, "layer metadata")?;
        Ok(MetadataParse::parse(raw))
    }

    /// Decode one layer: identifier, metadata and channel buffers.
    ///
    /// # Errors
    ///
    /// - [`FormatError::Truncated`] if `entry` points outside the buffer.
    /// - [`FormatError::LayerShape`] if `entry` does not describe a record of
    ///   this buffer (identifier or payload size mismatch).
    pub fn read_layer(&self, entry: &LayerIndexEntry) -> Result<DecodedLayer> {
        let header = &self.index.header;

        let id_range = entry.id_range();
        let id_bytes = self.checked_slice(id_range.start, id_range.len(), "layer id")?;
        if id_bytes != entry.id.as_bytes() {
            return Err(FormatError::LayerShape {
                id: entry.id.clone(),
                reason: "identifier bytes do not match the index entry".to_string(),
            });
        }

        let expected = header.payload_size().unwrap_or(u64::MAX);
        if entry.data_size as u64 != expected {
            return Err(FormatError::LayerShape {
                id: entry.id.clone(),
                reason: format!(
                    "payload is {} bytes, header requires {}",
                    entry.data_size, expected
                ),
            });
        }

        let parsed = self.read_metadata(entry)?;
        if let Some(error) = parsed.error() {
            tracing::warn!(
                layer = entry.id.as_str(),
                %error,
                "Layer metadata unreadable, using defaults"
            );
        }
        let metadata_source = parsed.source();
        let metadata = parsed.into_metadata();

        let payload = self.payload(entry)?;
        let channels = decode_channels(
            payload,
            header.encoding,
            header.channels as usize,
            header.samples as usize,
        );

        tracing::debug!(
            layer = entry.id.as_str(),
            metadata = ?metadata_source,
            premixed = metadata.premixed,
            channels = channels.len(),
            "Decoded layer"
        );

        Ok(DecodedLayer {
            id: entry.id.clone(),
            metadata,
            metadata_source,
            channels,
        })
    }

    /// Decode the first layer whose identifier is `id`.
    pub fn read_layer_by_id(&self, id: &str) -> Result<DecodedLayer> {
        let entry = self
            .index
            .find(id)
            .ok_or_else(|| FormatError::LayerNotFound(id.to_string()))?;
        self.read_layer(entry)
    }

    /// Decode every layer in parallel.
    ///
    /// A layer that fails is recorded in [`DecodedScene::failures`] and does
    /// not affect its siblings. Repeated identifiers keep the first layer in
    /// file order and report the others as failures.
    pub fn decode_all(&self) -> DecodedScene {
        let results: Vec<(String, Result<DecodedLayer>)> = self
            .index
            .layers
            .par_iter()
            .map(|entry| (entry.id.clone(), self.read_layer(entry)))
            .collect();

        let mut layers = BTreeMap::new();
        let mut failures = Vec::new();

        for (id, result) in results {
            match result {
                Ok(layer) => match layers.entry(id) {
                    Entry::Vacant(slot) => {
                        slot.insert(layer);
                    }
                    Entry::Occupied(slot) => {
                        tracing::warn!(layer = slot.key().as_str(), "Duplicate layer id");
                        failures.push(LayerFailure {
                            id: slot.key().clone(),
                            error: FormatError::LayerShape {
                                id: slot.key().clone(),
                                reason: "duplicate layer identifier".to_string(),
                            },
                        });
                    }
                },
                Err(error) => {
                    tracing::warn!(layer = id.as_str(), %error, "Layer failed to decode");
                    failures.push(LayerFailure { id, error });
                }
            }
        }

        DecodedScene {
            header: self.index.header,
            layers,
            failures,
        }
    }

    fn checked_slice(&self, offset: usize, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let bytes: &'a [u8] = self.bytes;
        match offset.checked_add(len) {
            Some(end) if end <= bytes.len() => Ok(&bytes[offset..end]),
            end => Err(FormatError::truncated(
                what,
                offset as u64,
                end.map_or(u64::MAX, |e| e as u64),
                bytes.len(),
            )),
        }
    }
}

/// Parse and decode a complete SHAC buffer.
///
/// Fails only if the header or layer index is invalid; individual layer
/// failures are reported in [`DecodedScene::failures`].
pub fn decode(bytes: &[u8]) -> Result<DecodedScene> {
    Ok(ShacReader::new(bytes)?.decode_all())
}
