//! Reusable scratch buffers for per-speaker decoding.
//!
//! A render needs one signal buffer per virtual speaker, all of the same
//! length. The pool keeps released buffers keyed by length and hands them
//! back out zeroed. Only the most recently used lengths are kept; idle
//! buffers of older lengths are dropped. [`PooledBuffer`] returns its buffer on drop, so every
//! exit path of a render releases what it acquired.

use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

/// Default number of idle buffers kept per length.
pub const DEFAULT_RETAIN_PER_SIZE: usize = 32;

/// Default number of distinct lengths with idle buffers.
pub const DEFAULT_MAX_LENGTHS: usize = 8;

/// Usage counters of a [`SampleBufferPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buffers currently held by callers.
    pub outstanding: usize,
    /// Buffers created because none of the right length was idle.
    pub allocations: u64,
    /// Acquisitions served from an idle buffer.
    pub reuses: u64,
    /// Idle buffers across all lengths.
    pub idle: usize,
    /// Distinct lengths currently tracked.
    pub lengths: usize,
}

#[derive(Debug)]
struct PoolState {
    free: LruCache<usize, Vec<Vec<f32>>>,
    outstanding: usize,
    allocations: u64,
    reuses: u64,
}

impl PoolState {
    fn new(max_lengths: usize) -> Self {
        Self {
            free: LruCache::new(NonZeroUsize::new(max_lengths).unwrap_or(NonZeroUsize::MIN)),
            outstanding: 0,
            allocations: 0,
            reuses: 0,
        }
    }
}

/// Thread-safe pool of `f32` buffers.
#[derive(Debug)]
pub struct SampleBufferPool {
    state: Mutex<PoolState>,
    retain_per_size: usize,
}

impl SampleBufferPool {
    pub fn new(retain_per_size: usize) -> Self {
        Self::with_max_lengths(retain_per_size, DEFAULT_MAX_LENGTHS)
    }

    /// A pool keeping idle buffers for at most `max_lengths` lengths.
    pub fn with_max_lengths(retain_per_size: usize, max_lengths: usize) -> Self {
        Self {
            state: Mutex::new(PoolState::new(max_lengths)),
            retain_per_size,
        }
    }

    /// Borrow a zeroed buffer of exactly `len` samples.
    pub fn acquire(&self, len: usize) -> PooledBuffer<'_> {
        let mut state = self.state.lock();
        let reused = state.free.get_mut(&len).and_then(Vec::pop);
        let buffer = match reused {
            Some(buffer) => {
                state.reuses += 1;
                buffer
            }
            None => {
                state.allocations += 1;
                vec![0.0; len]
            }
        };
        state.outstanding += 1;
        PooledBuffer {
            pool: self,
            buffer: Some(buffer),
        }
    }

    fn release(&self, mut buffer: Vec<f32>) {
        buffer.fill(0.0);
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        if self.retain_per_size == 0 {
            return;
        }
        let len = buffer.len();
        match state.free.get_mut(&len) {
            Some(idle) => {
                if idle.len() < self.retain_per_size {
                    idle.push(buffer);
                }
            }
            None => {
                // Evicts the least recently used length when full.
                state.free.push(len, vec![buffer]);
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            outstanding: state.outstanding,
            allocations: state.allocations,
            reuses: state.reuses,
            idle: state.free.iter().map(|(_, idle)| idle.len()).sum(),
            lengths: state.free.len(),
        }
    }

    /// Drop every idle buffer and forget every length.
    pub fn clear(&self) {
        self.state.lock().free.clear();
    }
}

impl Default for SampleBufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN_PER_SIZE)
    }
}

/// A buffer on loan from a [`SampleBufferPool`].
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a SampleBufferPool,
    buffer: Option<Vec<f32>>,
}

impl Deref for PooledBuffer<'_> {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [f32] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}
