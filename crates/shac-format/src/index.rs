//! Layer index — the offsets and sizes of every layer record in a SHAC buffer.
//!
//! Each layer record is laid out as:
//!
//! ```text
//! [u16 id_len][u32 meta_len][id_len bytes UTF-8 id][meta_len bytes metadata][payload]
//! ```
//!
//! where the payload is `channels × samples × bytes_per_sample` bytes. The
//! index pass only decodes the identifiers; metadata and audio are recorded
//! as byte ranges and left for [`crate::reader::ShacReader`].

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::header::{ShacHeader, HEADER_SIZE};

/// Size of the fixed part of a layer record (id length + metadata length).
pub const LAYER_RECORD_PREFIX: usize = 6;

/// Location of one layer inside the source buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerIndexEntry {
    /// Layer identifier
    pub id: String,
    /// Byte offset of the layer record (its `id_len` field)
    pub header_offset: usize,
    /// Byte offset of the metadata text
    pub metadata_offset: usize,
    /// Length of the metadata text in bytes
    pub metadata_len: usize,
    /// Byte offset of the audio payload
    pub data_offset: usize,
    /// Size of the audio payload in bytes
    pub data_size: usize,
}

impl LayerIndexEntry {
    /// Byte range of the identifier.
    pub fn id_range(&self) -> Range<usize> {
        let start = self.header_offset + LAYER_RECORD_PREFIX;
        start..self.metadata_offset
    }

    /// Byte range of the metadata text.
    pub fn metadata_range(&self) -> Range<usize> {
        self.metadata_offset..self.metadata_offset + self.metadata_len
    }

    /// Byte range of the audio payload.
    pub fn data_range(&self) -> Range<usize> {
        self.data_offset..self.data_offset + self.data_size
    }

    /// One past the last byte of this record.
    pub fn end_offset(&self) -> usize {
        self.data_offset + self.data_size
    }
}

/// The parsed header plus the ordered layer index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShacIndex {
    pub header: ShacHeader,
    pub layers: Vec<LayerIndexEntry>,
    /// Length of the buffer the index was built from
    pub buffer_len: usize,
}

impl ShacIndex {
    /// Find a layer entry by identifier (first match in file order).
    pub fn find(&self, id: &str) -> Option<&LayerIndexEntry> {
        self.layers.iter().find(|l| l.id == id)
    }
}

/// Checked `offset..offset + len` that must lie inside a buffer of `buf_len`.
fn span(offset: usize, len: u64, buf_len: usize, what: &'static str) -> Result<Range<usize>> {
    let end = (offset as u64).checked_add(len);
    match end {
        Some(end) if end <= buf_len as u64 => Ok(offset..end as usize),
        _ => Err(FormatError::truncated(
            what,
            offset as u64,
            end.unwrap_or(u64::MAX),
            buf_len,
        )),
    }
}

/// Parse the header and walk every layer record without touching audio data.
///
/// # Errors
///
/// - [`FormatError::BadMagic`], [`FormatError::UnsupportedVersion`] and the
///   other header errors from [`ShacHeader::parse`].
/// - [`FormatError::Truncated`] if any record field, metadata block or
///   payload extends past the end of `bytes`.
/// - [`FormatError::InvalidUtf8`] if a layer identifier is not UTF-8.
pub fn parse_index(bytes: &[u8]) -> Result<ShacIndex> {
    let header = ShacHeader::parse(bytes)?;
    let payload_size = header.payload_size().unwrap_or(u64::MAX);

    tracing::debug!(
        order = header.order,
        channels = header.channels,
        samples = header.samples,
        layers = header.layer_count,
        payload_size,
        "Parsed SHAC header"
    );

    let mut layers = Vec::with_capacity(header.layer_count as usize);
    let mut pos = HEADER_SIZE;

    for i in 0..header.layer_count {
        let header_offset = pos;

        let prefix = span(pos, LAYER_RECORD_PREFIX as u64, bytes.len(), "layer record")?;
        let id_len = LittleEndian::read_u16(&bytes[prefix.start..prefix.start + 2]);
        let metadata_len = LittleEndian::read_u32(&bytes[prefix.start + 2..prefix.end]);
        pos = prefix.end;

        let id_span = span(pos, id_len as u64, bytes.len(), "layer id")?;
        let id = String::from_utf8(bytes[id_span.clone()].to_vec())?;
        pos = id_span.end;

        // Metadata is only located here; the reader parses it.
        let meta_span = span(pos, metadata_len as u64, bytes.len(), "layer metadata")?;
        pos = meta_span.end;

        let data_span = span(pos, payload_size, bytes.len(), "layer audio payload")?;
        pos = data_span.end;

        tracing::debug!(
            index = i,
            id = id.as_str(),
            metadata_len,
            data_offset = data_span.start,
            data_size = data_span.len(),
            "Indexed layer"
        );

        layers.push(LayerIndexEntry {
            id,
            header_offset,
            metadata_offset: meta_span.start,
            metadata_len: meta_span.len(),
            data_offset: data_span.start,
            data_size: data_span.len(),
        });
    }

    if pos < bytes.len() {
        tracing::debug!(
            trailing = bytes.len() - pos,
            "Ignoring trailing bytes after last layer"
        );
    }

    Ok(ShacIndex {
        header,
        layers,
        buffer_len: bytes.len(),
    })
}
