//! SHAC file header — the first 26 bytes of every SHAC buffer.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};

/// Magic bytes identifying a SHAC buffer: `SHAC` (0x53484143)
pub const SHAC_MAGIC: [u8; 4] = *b"SHAC";

/// Current format version
pub const SHAC_VERSION: u16 = 1;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 26;

/// How each audio sample is stored in a layer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian integers, normalized by 32767.
    Int16,
    /// IEEE 754 single-precision little-endian floats.
    Float32,
}

impl SampleEncoding {
    pub fn from_bit_depth(bit_depth: u32) -> Option<Self> {
        match bit_depth {
            16 => Some(Self::Int16),
            32 => Some(Self::Float32),
            _ => None,
        }
    }

    pub fn bit_depth(self) -> u32 {
        match self {
            Self::Int16 => 16,
            Self::Float32 => 32,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Float32 => 4,
        }
    }
}

/// Highest order whose channel count fits the header's u16 field.
pub const MAX_ORDER: u16 = 254;

/// Number of ambisonic channels for a given order: `(order + 1)²`.
///
/// Computed in u64 so that any u16 order is representable.
pub fn channels_for_order(order: u16) -> u64 {
    let n = order as u64 + 1;
    n * n
}

/// The fixed-size header at the beginning of every SHAC buffer.
///
/// Layout (26 bytes, little-endian):
/// - `[0..4]`   magic: `SHAC`
/// - `[4..6]`   version: u16
/// - `[6..8]`   order: u16 (ambisonic order)
/// - `[8..10]`  channels: u16 (must be `(order + 1)²`)
/// - `[10..14]` sample_rate: u32
/// - `[14..18]` bit_depth: u32 (16 or 32)
/// - `[18..22]` samples: u32 (samples per channel)
/// - `[22..24]` layer_count: u16
/// - `[24..26]` normalization: u16 (normalization scheme id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShacHeader {
    /// Format version (currently 1)
    pub version: u16,
    /// Ambisonic order of every layer in the file
    pub order: u16,
    /// Channels per layer
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Payload encoding (16-bit int or 32-bit float)
    pub encoding: SampleEncoding,
    /// Samples per channel
    pub samples: u32,
    /// Number of layer records following the header
    pub layer_count: u16,
    /// Normalization scheme identifier, carried through unchanged
    pub normalization: u16,
}

impl ShacHeader {
    /// Create a header for `order` with the matching channel count.
    ///
    /// Orders above [`MAX_ORDER`] get `channels = 0`, which
    /// [`ShacHeader::check_channels`] rejects.
    pub fn new(order: u16, sample_rate: u32, encoding: SampleEncoding, samples: u32) -> Self {
        Self {
            version: SHAC_VERSION,
            order,
            channels: u16::try_from(channels_for_order(order)).unwrap_or(0),
            sample_rate,
            encoding,
            samples,
            layer_count: 0,
            normalization: 0,
        }
    }

    /// Check that `channels` equals `(order + 1)²`.
    pub fn check_channels(&self) -> Result<()> {
        let expected = channels_for_order(self.order);
        if self.channels as u64 != expected {
            return Err(FormatError::ChannelCount {
                order: self.order,
                channels: self.channels,
                expected,
            });
        }
        Ok(())
    }

    /// Bit depth as stored in the header.
    pub fn bit_depth(&self) -> u32 {
        self.encoding.bit_depth()
    }

    /// Size in bytes of one layer's audio payload, or `None` on overflow.
    pub fn payload_size(&self) -> Option<u64> {
        (self.channels as u64)
            .checked_mul(self.samples as u64)?
            .checked_mul(self.encoding.bytes_per_sample() as u64)
    }

    /// Duration of each layer in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / self.sample_rate as f64
    }

    /// Parse and validate the header at the start of `bytes`.
    ///
    /// The magic is checked before anything else is read, so a foreign
    /// buffer is rejected with [`FormatError::BadMagic`] even if it is
    /// shorter than a full header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let prefix = bytes.len().min(SHAC_MAGIC.len());
        if bytes[..prefix] != SHAC_MAGIC[..prefix] {
            return Err(FormatError::BadMagic);
        }
        if bytes.len() < SHAC_MAGIC.len() {
            return Err(FormatError::truncated("header magic", 0, 4, bytes.len()));
        }
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::truncated(
                "header",
                0,
                HEADER_SIZE as u64,
                bytes.len(),
            ));
        }

        let mut cursor = Cursor::new(&bytes[..HEADER_SIZE]);
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;

        let version = cursor.read_u16::<LittleEndian>()?;
        if version != SHAC_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let order = cursor.read_u16::<LittleEndian>()?;
        let channels = cursor.read_u16::<LittleEndian>()?;
        let sample_rate = cursor.read_u32::<LittleEndian>()?;
        let bit_depth = cursor.read_u32::<LittleEndian>()?;
        let samples = cursor.read_u32::<LittleEndian>()?;
        let layer_count = cursor.read_u16::<LittleEndian>()?;
        let normalization = cursor.read_u16::<LittleEndian>()?;

        let encoding = SampleEncoding::from_bit_depth(bit_depth)
            .ok_or(FormatError::UnsupportedBitDepth(bit_depth))?;

        let header = Self {
            version,
            order,
            channels,
            sample_rate,
            encoding,
            samples,
            layer_count,
            normalization,
        };
        header.check_channels()?;
        Ok(header)
    }

    /// Serialize the header into exactly [`HEADER_SIZE`] bytes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&SHAC_MAGIC)?;
        w.write_u16::<LittleEndian>(self.version)?;
        w.write_u16::<LittleEndian>(self.order)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.sample_rate)?;
        w.write_u32::<LittleEndian>(self.bit_depth())?;
        w.write_u32::<LittleEndian>(self.samples)?;
        w.write_u16::<LittleEndian>(self.layer_count)?;
        w.write_u16::<LittleEndian>(self.normalization)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(header: &ShacHeader) -> Vec<u8> {
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_header_is_26_bytes() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Float32, 480);
        assert_eq!(header_bytes(&header).len(), HEADER_SIZE);
    }

    #[test]
    fn test_parse_written_header() {
        let mut header = ShacHeader::new(3, 44100, SampleEncoding::Int16, 1000);
        header.layer_count = 2;
        header.normalization = 1;
        let parsed = ShacHeader::parse(&header_bytes(&header)).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.channels, 16);
        assert_eq!(parsed.bit_depth(), 16);
    }

    #[test]
    fn test_field_offsets() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Float32, 480);
        let bytes = header_bytes(&header);
        assert_eq!(&bytes[0..4], b"SHAC");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 4);
        assert_eq!(
            u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
            48000
        );
        assert_eq!(
            u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]),
            32
        );
    }

    #[test]
    fn test_bad_magic_short_buffer() {
        // Only the magic is present; it must still be reported as bad magic.
        let result = ShacHeader::parse(b"RIFF");
        assert!(matches!(result, Err(FormatError::BadMagic)));
    }

    #[test]
    fn test_foreign_prefix_is_bad_magic() {
        assert!(matches!(ShacHeader::parse(b"RI"), Err(FormatError::BadMagic)));
        assert!(matches!(ShacHeader::parse(b"X"), Err(FormatError::BadMagic)));
        // A genuine prefix that stops early is truncated, not foreign.
        assert!(matches!(
            ShacHeader::parse(b"SH"),
            Err(FormatError::Truncated { .. })
        ));
        assert!(matches!(
            ShacHeader::parse(b""),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Float32, 480);
        let bytes = header_bytes(&header);
        let result = ShacHeader::parse(&bytes[..10]);
        assert!(matches!(result, Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn test_unsupported_version() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Float32, 480);
        let mut bytes = header_bytes(&header);
        bytes[4] = 2;
        let result = ShacHeader::parse(&bytes);
        assert!(matches!(result, Err(FormatError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Float32, 480);
        let mut bytes = header_bytes(&header);
        bytes[14..18].copy_from_slice(&24u32.to_le_bytes());
        let result = ShacHeader::parse(&bytes);
        assert!(matches!(result, Err(FormatError::UnsupportedBitDepth(24))));
    }

    #[test]
    fn test_channel_count_must_match_order() {
        let header = ShacHeader::new(2, 48000, SampleEncoding::Float32, 480);
        let mut bytes = header_bytes(&header);
        bytes[8..10].copy_from_slice(&8u16.to_le_bytes());
        let result = ShacHeader::parse(&bytes);
        assert!(matches!(
            result,
            Err(FormatError::ChannelCount {
                order: 2,
                channels: 8,
                expected: 9
            })
        ));
    }

    #[test]
    fn test_maximum_order_in_header_rejected() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Float32, 480);
        let mut bytes = header_bytes(&header);
        bytes[6..8].copy_from_slice(&u16::MAX.to_le_bytes());
        bytes[8..10].copy_from_slice(&0u16.to_le_bytes());
        let result = ShacHeader::parse(&bytes);
        assert!(matches!(
            result,
            Err(FormatError::ChannelCount {
                order: u16::MAX,
                channels: 0,
                expected: 4_294_967_296
            })
        ));
    }

    #[test]
    fn test_order_beyond_channel_field() {
        let header = ShacHeader::new(MAX_ORDER, 48000, SampleEncoding::Float32, 1);
        assert_eq!(header.channels, 65025);
        assert!(header.check_channels().is_ok());

        let header = ShacHeader::new(MAX_ORDER + 1, 48000, SampleEncoding::Float32, 1);
        assert_eq!(header.channels, 0);
        assert!(matches!(
            header.check_channels(),
            Err(FormatError::ChannelCount {
                order: 255,
                expected: 65536,
                ..
            })
        ));
    }

    #[test]
    fn test_payload_size() {
        let header = ShacHeader::new(1, 48000, SampleEncoding::Int16, 100);
        assert_eq!(header.payload_size(), Some(4 * 100 * 2));
        let header = ShacHeader::new(7, 48000, SampleEncoding::Float32, 10);
        assert_eq!(header.payload_size(), Some(64 * 10 * 4));
    }

    #[test]
    fn test_channels_for_order() {
        assert_eq!(channels_for_order(0), 1);
        assert_eq!(channels_for_order(1), 4);
        assert_eq!(channels_for_order(3), 16);
        assert_eq!(channels_for_order(7), 64);
        assert_eq!(channels_for_order(u16::MAX), 1 << 32);
    }
}
