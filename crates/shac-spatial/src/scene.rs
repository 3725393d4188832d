//! Whole-scene rendering for a listener with a position and head orientation.
//!
//! Positioned layers are assumed to be authored facing front. For each one
//! the field is turned toward the layer's direction as seen from the
//! listener's head and attenuated by distance. Pre-mixed layers already
//! carry their spatial image, so they are only counter-rotated against the
//! head orientation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shac_format::{DecodedLayer, DecodedScene};
use tracing::{debug, info, warn};

use crate::error::{RenderError, Result};
use crate::layout::direction_of;
use crate::renderer::{validate, AmbisonicRenderer, RendererConfig, StereoBuffer};
use crate::rotation::cartesian_rotation;

/// Listener pose. Angles in radians, same axes and senses as
/// [`rotation`](crate::rotation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listener {
    pub position: [f64; 3],
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Listener {
    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, yaw: f64, pitch: f64, roll: f64) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self.roll = roll;
        self
    }

    /// A world-space point in head coordinates.
    pub fn to_head(&self, point: [f64; 3]) -> [f64; 3] {
        let r = cartesian_rotation(self.yaw, self.pitch, self.roll);
        let d = [
            point[0] - self.position[0],
            point[1] - self.position[1],
            point[2] - self.position[2],
        ];
        // Rᵀ · d
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (0..3).map(|k| r[k][i] * d[k]).sum();
        }
        out
    }

    fn distance_to(&self, point: [f64; 3]) -> f64 {
        (0..3)
            .map(|i| (point[i] - self.position[i]).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Distance in meters inside which no attenuation is applied.
    pub reference_distance: f64,
    pub renderer: RendererConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            reference_distance: 1.0,
            renderer: RendererConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A layer that could not be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRenderFailure {
    pub id: String,
    pub error: RenderError,
}

/// Output of [`SceneRenderer::render_scene`].
#[derive(Debug, Clone, Default)]
pub struct SceneMix {
    pub output: StereoBuffer,
    /// Layers that contributed, in mixing order.
    pub rendered: Vec<String>,
    pub failures: Vec<LayerRenderFailure>,
}

impl SceneMix {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug)]
pub struct SceneRenderer {
    config: SceneConfig,
    renderer: AmbisonicRenderer,
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl SceneRenderer {
    pub fn new(config: SceneConfig) -> Self {
        let renderer = AmbisonicRenderer::new(config.renderer.clone());
        Self { config, renderer }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn renderer(&self) -> &AmbisonicRenderer {
        &self.renderer
    }

    /// Inverse-distance gain, 1 inside the reference distance.
    pub fn attenuation(&self, distance: f64) -> f64 {
        let reference = self.config.reference_distance.max(1e-3);
        if !distance.is_finite() {
            return 0.0;
        }
        reference / distance.max(reference)
    }

    /// Render one layer as heard by `listener`.
    pub fn render_layer(&self, layer: &DecodedLayer, listener: &Listener) -> Result<StereoBuffer> {
        if layer.is_premixed() {
            return self.render_premixed(layer, listener);
        }

        let position = layer.metadata.position;
        let (azimuth, elevation) = direction_of(listener.to_head(position));
        let distance = listener.distance_to(position);
        let order = self.field_order(layer)?;

        let rotation = self.renderer.engine().rotation(order, azimuth, elevation, 0.0);
        let mut out = if rotation.is_identity(1e-12) {
            self.renderer.render(layer)?
        } else {
            let steered = self.renderer.rotate(&layer.channels, azimuth, elevation, 0.0)?;
            let mut out = self.renderer.render_channels(&steered)?;
            out.scale(layer.metadata.gain as f32);
            out
        };
        let attenuation = self.attenuation(distance);
        out.scale(attenuation as f32);

        debug!(
            id = %layer.id,
            azimuth,
            elevation,
            distance,
            attenuation,
            kind = ?rotation.kind(),
            "positioned layer"
        );
        Ok(out)
    }

    fn render_premixed(&self, layer: &DecodedLayer, listener: &Listener) -> Result<StereoBuffer> {
        // The counter-rotation mixes channels sample by sample, so the
        // field must be whole before it is applied.
        let (order, _) = validate(&layer.channels)?;
        let engine = self.renderer.engine();
        let counter = engine
            .rotation(order, 0.0, 0.0, -listener.roll)
            .compose(&engine.rotation(order, 0.0, -listener.pitch, 0.0))
            .compose(&engine.rotation(order, -listener.yaw, 0.0, 0.0));

        if counter.is_identity(1e-12) {
            return self.renderer.render(layer);
        }
        let turned = counter.apply(&layer.channels);
        let mut out = self.renderer.render_channels(&turned)?;
        out.scale(layer.metadata.gain as f32);
        debug!(id = %layer.id, kind = ?counter.kind(), "counter-rotated pre-mixed layer");
        Ok(out)
    }

    fn field_order(&self, layer: &DecodedLayer) -> Result<u16> {
        crate::harmonics::order_for_channels(layer.channels.len())
            .ok_or(RenderError::ChannelCountMismatch(layer.channels.len()))
    }

    /// Render and sum every layer of `scene`.
    ///
    /// Layers are rendered in parallel and mixed in identifier order. A
    /// layer that fails is reported in [`SceneMix::failures`] and left out
    /// of the mix.
    pub fn render_scene(&self, scene: &DecodedScene, listener: &Listener) -> SceneMix {
        let mut results: Vec<(&String, Result<StereoBuffer>)> = scene
            .layers
            .par_iter()
            .map(|(id, layer)| (id, self.render_layer(layer, listener)))
            .collect();
        results.sort_by(|a, b| a.0.cmp(b.0));

        let mut mix = SceneMix {
            output: StereoBuffer::new(scene.header.samples as usize),
            ..SceneMix::default()
        };
        for (id, result) in results {
            match result {
                Ok(buffer) => {
                    mix.output.mix_in(&buffer);
                    mix.rendered.push(id.clone());
                }
                Err(error) => {
                    warn!(id = %id, %error, "layer skipped");
                    mix.failures.push(LayerRenderFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            layers = mix.rendered.len(),
            failures = mix.failures.len(),
            samples = mix.output.len(),
            peak = mix.output.peak(),
            "scene rendered"
        );
        mix
    }
}
