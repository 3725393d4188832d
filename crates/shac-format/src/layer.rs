//! Decoded layers and scenes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::FormatError;
use crate::header::ShacHeader;
use crate::metadata::{LayerMetadata, MetadataSource};

/// One layer with its metadata and per-channel samples.
///
/// Channel buffers are never modified after decoding; rotation and
/// rendering always produce new buffers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedLayer {
    pub id: String,
    pub metadata: LayerMetadata,
    /// Which parser produced `metadata`.
    pub metadata_source: MetadataSource,
    /// `(order + 1)²` buffers of `samples` values each, in ACN order.
    #[serde(skip)]
    pub channels: Vec<Vec<f32>>,
}

impl DecodedLayer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_premixed(&self) -> bool {
        self.metadata.premixed
    }
}

/// A layer that failed to decode while its siblings succeeded.
#[derive(Debug)]
pub struct LayerFailure {
    pub id: String,
    pub error: FormatError,
}

/// A fully decoded SHAC buffer.
///
/// Layers are keyed by identifier; the file order of layers carries no
/// meaning. Layers that failed individually are listed in `failures`.
#[derive(Debug)]
pub struct DecodedScene {
    pub header: ShacHeader,
    pub layers: BTreeMap<String, DecodedLayer>,
    pub failures: Vec<LayerFailure>,
}

impl DecodedScene {
    pub fn layer(&self, id: &str) -> Option<&DecodedLayer> {
        self.layers.get(id)
    }

    /// The single layer of a scene that consists of one pre-mixed field.
    pub fn premixed_layer(&self) -> Option<&DecodedLayer> {
        match self.layers.len() {
            1 => self.layers.values().next().filter(|l| l.is_premixed()),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
