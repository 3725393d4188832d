//! Virtual-speaker ambisonic decoder with analytic binaural output.
//!
//! A field of `(order + 1)²` channels is sampled at every speaker of the
//! order's [`layout`](crate::layout), each speaker signal is weighted by the
//! [`HrtfModel`] gains for its direction, and the results are summed into a
//! [`StereoBuffer`].
//!
//! ## Example
//!
//! ```
//! use shac_spatial::{AmbisonicRenderer, RendererConfig};
//!
//! let renderer = AmbisonicRenderer::new(RendererConfig::default());
//! // First order, omnidirectional content only.
//! let mut field = vec![vec![0.0f32; 256]; 4];
//! field[0] = vec![0.5; 256];
//!
//! let stereo = renderer.render_channels(&field).unwrap();
//! assert_eq!(stereo.len(), 256);
//! assert!(stereo.peak() > 0.0);
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shac_format::DecodedLayer;
use tracing::debug;

use crate::engine::{
    EngineStats, ShEngine, DEFAULT_ROTATION_CACHE_CAPACITY, DEFAULT_SH_CACHE_CAPACITY,
};
use crate::error::{RenderError, Result};
use crate::harmonics::order_for_channels;
use crate::hrtf::{HrtfGains, HrtfModel};
use crate::layout::speaker_layout;
use crate::pool::{PoolStats, SampleBufferPool, DEFAULT_RETAIN_PER_SIZE};

/// Renderer tuning. Every field has a default, so a partial JSON document
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum cached basis vectors.
    pub sh_cache_capacity: usize,
    /// Maximum cached rotation matrices.
    pub rotation_cache_capacity: usize,
    /// Idle scratch buffers kept per length.
    pub pool_retain_per_size: usize,
    pub hrtf: HrtfModel,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sh_cache_capacity: DEFAULT_SH_CACHE_CAPACITY,
            rotation_cache_capacity: DEFAULT_ROTATION_CACHE_CAPACITY,
            pool_retain_per_size: DEFAULT_RETAIN_PER_SIZE,
            hrtf: HrtfModel::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Two equally long output channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    /// Silence of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Largest absolute sample over both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(&self.right)
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    pub fn scale(&mut self, gain: f32) {
        for s in self.left.iter_mut().chain(self.right.iter_mut()) {
            *s *= gain;
        }
    }

    /// Add `other` sample by sample, growing to the longer of the two.
    pub fn mix_in(&mut self, other: &StereoBuffer) {
        let len = self.len().max(other.len());
        self.left.resize(len, 0.0);
        self.right.resize(len, 0.0);
        for (dst, src) in self.left.iter_mut().zip(&other.left) {
            *dst += src;
        }
        for (dst, src) in self.right.iter_mut().zip(&other.right) {
            *dst += src;
        }
    }

    /// `L R L R ...` frames, as written to a stereo WAV.
    pub fn interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }
}

/// Checks a field's shape and returns `(order, samples)`.
pub(crate) fn validate(channels: &[Vec<f32>]) -> Result<(u16, usize)> {
    let order =
        order_for_channels(channels.len()).ok_or(RenderError::ChannelCountMismatch(channels.len()))?;
    let expected = channels[0].len();
    if let Some((channel, ch)) = channels
        .iter()
        .enumerate()
        .find(|(_, ch)| ch.len() != expected)
    {
        return Err(RenderError::RaggedChannels {
            channel,
            expected,
            got: ch.len(),
        });
    }
    if expected == 0 {
        return Err(RenderError::EmptyAudio);
    }
    Ok((order, expected))
}

/// Binaural renderer for ambisonic fields.
///
/// Owns its [`ShEngine`] caches and scratch [`SampleBufferPool`]; both are
/// safe to share, so one renderer can serve several threads.
#[derive(Debug)]
pub struct AmbisonicRenderer {
    config: RendererConfig,
    engine: ShEngine,
    pool: SampleBufferPool,
}

impl Default for AmbisonicRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl AmbisonicRenderer {
    pub fn new(config: RendererConfig) -> Self {
        let engine = ShEngine::new(config.sh_cache_capacity, config.rotation_cache_capacity);
        let pool = SampleBufferPool::new(config.pool_retain_per_size);
        Self {
            config,
            engine,
            pool,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn engine(&self) -> &ShEngine {
        &self.engine
    }

    pub fn engine_stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Rotate a field by yaw, pitch and roll (radians) into new buffers.
    pub fn rotate(
        &self,
        channels: &[Vec<f32>],
        yaw: f64,
        pitch: f64,
        roll: f64,
    ) -> Result<Vec<Vec<f32>>> {
        let (order, _) = validate(channels)?;
        let matrix = self.engine.rotation(order, yaw, pitch, roll);
        Ok(matrix.apply(channels))
    }

    /// Render a decoded layer, scaled by its metadata gain.
    ///
    /// Pre-mixed layers go through the same decode; they are simply never
    /// steered toward a position.
    pub fn render(&self, layer: &DecodedLayer) -> Result<StereoBuffer> {
        let mut out = self.render_channels(&layer.channels)?;
        out.scale(layer.metadata.gain as f32);
        debug!(
            id = %layer.id,
            premixed = layer.is_premixed(),
            gain = layer.metadata.gain,
            "rendered layer"
        );
        Ok(out)
    }

    /// Decode a field to binaural stereo with unit gain.
    pub fn render_channels(&self, channels: &[Vec<f32>]) -> Result<StereoBuffer> {
        let (order, samples) = validate(channels)?;
        let speakers = speaker_layout(order);

        let feeds: Vec<_> = speakers
            .par_iter()
            .map(|speaker| {
                let basis = self.engine.basis(order, speaker.azimuth, speaker.elevation);
                let mut signal = self.pool.acquire(samples);
                for (channel, &weight) in channels.iter().zip(basis.iter()) {
                    let weight = (weight * speaker.gain) as f32;
                    if weight == 0.0 {
                        continue;
                    }
                    for (out, &x) in signal.iter_mut().zip(channel) {
                        *out += weight * x;
                    }
                }
                let gains: HrtfGains = self.config.hrtf.gains(speaker.azimuth, speaker.elevation);
                (signal, gains)
            })
            .collect();

        let mut out = StereoBuffer::new(samples);
        for (signal, gains) in &feeds {
            let (gl, gr) = (gains.left as f32, gains.right as f32);
            for ((l, r), &s) in out.left.iter_mut().zip(out.right.iter_mut()).zip(signal.iter()) {
                *l += gl * s;
                *r += gr * s;
            }
        }

        debug!(order, samples, speakers = speakers.len(), "decoded field");
        Ok(out)
    }
}
