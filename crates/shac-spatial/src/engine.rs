//! Memoizing front end over [`harmonics`](crate::harmonics) and
//! [`rotation`](crate::rotation).

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::{BoundedCache, CacheStats, RotationKey, ShKey};
use crate::harmonics::sn3d_basis;
use crate::rotation::RotationMatrix;

/// Default number of cached basis vectors.
pub const DEFAULT_SH_CACHE_CAPACITY: usize = 4096;

/// Default number of cached rotation matrices.
pub const DEFAULT_ROTATION_CACHE_CAPACITY: usize = 256;

/// Counters for both engine caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub basis: CacheStats,
    pub rotation: CacheStats,
}

/// Spherical-harmonic engine with bounded basis and rotation caches.
///
/// The engine is `Sync`; one instance is shared by every worker of a render.
#[derive(Debug)]
pub struct ShEngine {
    basis_cache: BoundedCache<ShKey, [f64]>,
    rotation_cache: BoundedCache<RotationKey, RotationMatrix>,
}

impl ShEngine {
    pub fn new(sh_cache_capacity: usize, rotation_cache_capacity: usize) -> Self {
        Self {
            basis_cache: BoundedCache::new(sh_cache_capacity),
            rotation_cache: BoundedCache::new(rotation_cache_capacity),
        }
    }

    /// SN3D basis at `(azimuth, elevation)`, quantized to 0.001 rad.
    pub fn basis(&self, order: u16, azimuth: f64, elevation: f64) -> Arc<[f64]> {
        self.basis_cache
            .get_or_insert_with(ShKey::new(order, azimuth, elevation), |key| {
                debug!(order, azimuth = key.azimuth(), elevation = key.elevation(), "basis cache miss");
                Arc::from(sn3d_basis(key.order, key.azimuth(), key.elevation()))
            })
    }

    /// Rotation matrix for `order`, quantized to 0.1° per angle.
    pub fn rotation(&self, order: u16, yaw: f64, pitch: f64, roll: f64) -> Arc<RotationMatrix> {
        self.rotation_cache
            .get_or_insert_with(RotationKey::new(order, yaw, pitch, roll), |key| {
                let (yaw, pitch, roll) = key.angles();
                let matrix = RotationMatrix::new(key.order, yaw, pitch, roll);
                debug!(order, yaw, pitch, roll, kind = ?matrix.kind(), "rotation cache miss");
                Arc::new(matrix)
            })
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            basis: self.basis_cache.stats(),
            rotation: self.rotation_cache.stats(),
        }
    }

    /// Drop every cached entry. Counters are kept.
    pub fn clear(&self) {
        self.basis_cache.clear();
        self.rotation_cache.clear();
    }
}

impl Default for ShEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SH_CACHE_CAPACITY, DEFAULT_ROTATION_CACHE_CAPACITY)
    }
}
