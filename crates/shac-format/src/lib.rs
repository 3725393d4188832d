//! # shac-format
//!
//! The SHAC container format library. Parses and writes SHAC buffers: a
//! fixed header followed by ambisonic layers, each with its own identifier,
//! metadata and channel-major audio payload.
//!
//! ## Format Overview
//!
//! A SHAC buffer consists of:
//! - **Header** (26 bytes): magic, version, ambisonic order, channel count,
//!   sample rate, bit depth, samples per channel, layer count, normalization
//! - **Layer records**: `[u16 id_len][u32 meta_len][id][metadata][payload]`,
//!   repeated `layer_count` times
//!
//! Metadata is JSON, or a legacy Python-literal dictionary that is normalized
//! to JSON before parsing.
//!
//! ## Example
//! ```rust,no_run
//! use shac_format::ShacReader;
//!
//! let bytes = std::fs::read("scene.shac").unwrap();
//! let reader = ShacReader::new(&bytes).unwrap();
//! println!("{:?}", reader.header());
//! for layer in reader.decode_all().layers.values() {
//!     println!("{} at {:?}", layer.id, layer.metadata.position);
//! }
//! ```

pub mod error;
pub mod header;
pub mod index;
pub mod layer;
pub mod metadata;
pub mod reader;
pub mod samples;
pub mod writer;

pub use error::FormatError;
pub use header::*;
pub use index::{parse_index, LayerIndexEntry, ShacIndex};
pub use layer::{DecodedLayer, DecodedScene, LayerFailure};
pub use metadata::{LayerMetadata, MetadataParse, MetadataParseError, MetadataSource, SourceRef};
pub use reader::{decode, ShacReader};
pub use writer::ShacWriter;
