//! # shac-spatial — spherical-harmonic engine and binaural renderer for SHAC
//!
//! Turns decoded SHAC layers (see `shac-format`) into headphone stereo.
//!
//! ## Architecture
//!
//! - **[`harmonics`]**: real SN3D spherical harmonics in ACN order, closed
//!   forms through third order and a recurrence for any order.
//! - **[`rotation`]**: yaw/pitch/roll rotation matrices over ambisonic
//!   channels, tagged exact or partial.
//! - **[`cache`]** and **[`engine`]**: bounded, quantized LRU memoization of
//!   basis vectors and rotation matrices.
//! - **[`layout`]**: cube, icosahedron and dodecahedron virtual speakers.
//! - **[`hrtf`]**: analytic per-ear gain model.
//! - **[`pool`]**: scratch buffers with RAII release.
//! - **[`renderer`]**: the virtual-speaker decoder producing a [`StereoBuffer`].
//! - **[`scene`]**: listener-relative mixing of a whole scene.
//! - **[`error`]**: error types for rendering.
//!
//! ## Quick Start
//!
//! ```rust
//! use shac_format::{decode, LayerMetadata, SampleEncoding, ShacWriter};
//! use shac_spatial::{Listener, SceneRenderer};
//!
//! let mut field = vec![vec![0.0f32; 480]; 4];
//! field[0] = vec![0.5; 480];
//!
//! let mut writer = ShacWriter::new(1, 48000, SampleEncoding::Float32, 480);
//! writer.add_layer("voice", &LayerMetadata::at([1.0, 0.0, 0.0]), &field).unwrap();
//! let scene = decode(&writer.to_bytes().unwrap()).unwrap();
//!
//! let mix = SceneRenderer::default().render_scene(&scene, &Listener::default());
//! assert!(mix.is_complete());
//! assert_eq!(mix.output.len(), 480);
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod harmonics;
pub mod hrtf;
pub mod layout;
pub mod pool;
pub mod renderer;
pub mod rotation;
pub mod scene;

pub use cache::{BoundedCache, CacheStats, RotationKey, ShKey};
pub use engine::{EngineStats, ShEngine};
pub use error::{RenderError, Result};
pub use harmonics::{channel_count, order_for_channels, sn3d_basis};
pub use hrtf::{HrtfGains, HrtfModel, MIN_GAIN_FLOOR};
pub use layout::{speaker_layout, LayoutKind, VirtualSpeaker};
pub use pool::{PoolStats, PooledBuffer, SampleBufferPool, DEFAULT_MAX_LENGTHS};
pub use renderer::{AmbisonicRenderer, RendererConfig, StereoBuffer};
pub use rotation::{rotation_matrix, RotationKind, RotationMatrix};
pub use scene::{LayerRenderFailure, Listener, SceneConfig, SceneMix, SceneRenderer};
