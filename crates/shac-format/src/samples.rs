//! Channel-major PCM payload decoding and encoding.
//!
//! Payloads store all samples of channel 0, then channel 1, and so on. Every
//! value is decoded from its own little-endian byte group, so the payload may
//! start at any byte offset of the source buffer.

use crate::header::SampleEncoding;

/// Scale used for 16-bit samples in both directions.
pub const INT16_SCALE: f32 = 32767.0;

/// Decode one channel-major payload into `channels` buffers of `samples` each.
///
/// `payload` must be exactly `channels × samples × bytes_per_sample` long;
/// shorter input yields zero-filled tails rather than a panic.
pub fn decode_channels(
    payload: &[u8],
    encoding: SampleEncoding,
    channels: usize,
    samples: usize,
) -> Vec<Vec<f32>> {
    let stride = samples * encoding.bytes_per_sample();
    (0..channels)
        .map(|ch| {
            let start = (ch * stride).min(payload.len());
            let end = (start + stride).min(payload.len());
            let mut out = decode_samples(&payload[start..end], encoding);
            out.resize(samples, 0.0);
            out
        })
        .collect()
}

/// Decode a contiguous run of samples.
pub fn decode_samples(bytes: &[u8], encoding: SampleEncoding) -> Vec<f32> {
    match encoding {
        SampleEncoding::Int16 => bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / INT16_SCALE)
            .collect(),
        SampleEncoding::Float32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}

/// Append `samples` to `out` in the given encoding.
///
/// 16-bit output is clamped to [-1.0, 1.0] and rounded to the nearest step.
pub fn encode_samples(samples: &[f32], encoding: SampleEncoding, out: &mut Vec<u8>) {
    out.reserve(samples.len() * encoding.bytes_per_sample());
    match encoding {
        SampleEncoding::Int16 => {
            for &s in samples {
                let clamped = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
                let v = (clamped * INT16_SCALE).round() as i16;
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        SampleEncoding::Float32 => {
            for &s in samples {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
    }
}
