//! Bounded, thread-safe memoization for spherical-harmonic coefficients and
//! rotation matrices.
//!
//! Listener movement sweeps through an unbounded set of angles, so both
//! caches are fixed-capacity LRUs. Keys are quantized (0.001 rad for basis
//! directions, 0.1° for rotations) and cached values are computed from the
//! *dequantized* key, which makes every entry a pure function of its key.

use std::f64::consts::{PI, TAU};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

/// Quantization step for basis directions, in radians.
pub const SH_QUANTUM: f64 = 0.001;

/// Quantization step for rotation angles: 0.1° in radians.
pub const ROTATION_QUANTUM: f64 = PI / 1800.0;

/// Wrap an angle into `[-π, π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

fn quantize(angle: f64, step: f64) -> i64 {
    if !angle.is_finite() {
        return 0;
    }
    (wrap_angle(angle) / step).round() as i64
}

/// Cache key for a basis evaluation: order plus a quantized direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShKey {
    pub order: u16,
    azimuth: i64,
    elevation: i64,
}

impl ShKey {
    pub fn new(order: u16, azimuth: f64, elevation: f64) -> Self {
        Self {
            order,
            azimuth: quantize(azimuth, SH_QUANTUM),
            elevation: quantize(elevation, SH_QUANTUM),
        }
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth as f64 * SH_QUANTUM
    }

    pub fn elevation(&self) -> f64 {
        self.elevation as f64 * SH_QUANTUM
    }
}

/// Cache key for a rotation matrix: order plus quantized yaw, pitch and roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RotationKey {
    pub order: u16,
    yaw: i64,
    pitch: i64,
    roll: i64,
}

impl RotationKey {
    pub fn new(order: u16, yaw: f64, pitch: f64, roll: f64) -> Self {
        Self {
            order,
            yaw: quantize(yaw, ROTATION_QUANTUM),
            pitch: quantize(pitch, ROTATION_QUANTUM),
            roll: quantize(roll, ROTATION_QUANTUM),
        }
    }

    /// Dequantized `(yaw, pitch, roll)` in radians.
    pub fn angles(&self) -> (f64, f64, f64) {
        (
            self.yaw as f64 * ROTATION_QUANTUM,
            self.pitch as f64 * ROTATION_QUANTUM,
            self.roll as f64 * ROTATION_QUANTUM,
        )
    }
}

/// Hit/miss counters and occupancy of one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// A fixed-capacity LRU map from `K` to shared values.
///
/// Values are computed outside the lock. Two threads missing on the same key
/// may both compute it; the first insertion wins and both callers receive
/// the stored value.
pub struct BoundedCache<K, V: ?Sized> {
    entries: Mutex<LruCache<K, Arc<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq + Clone, V: ?Sized> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, computing it with `compute` on a miss.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> Arc<V>
    where
        F: FnOnce(&K) -> Arc<V>,
    {
        if let Some(value) = self.entries.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = compute(&key);

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return Arc::clone(existing);
        }
        entries.put(key, Arc::clone(&value));
        value
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

impl<K: Hash + Eq, V: ?Sized> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("BoundedCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
