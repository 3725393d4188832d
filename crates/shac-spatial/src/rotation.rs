//! Sound-field rotation matrices in ACN channel order.
//!
//! World axes are x forward, y left, z up. Rotations follow the same sense
//! as the basis angles:
//!
//! - positive **yaw** turns a source in front toward the left (about z),
//! - positive **pitch** raises a source in front (about y),
//! - positive **roll** raises a source on the left (about x),
//!
//! and compose as `R = yaw · pitch · roll` (roll applied first).
//!
//! Accuracy by degree:
//!
//! | degree | block                                                        |
//! |--------|--------------------------------------------------------------|
//! | 0      | identity                                                     |
//! | 1      | exact 3×3 Cartesian rotation                                 |
//! | 2, 3   | exact yaw; pitch and roll as a diagonal small-angle factor   |
//! | ≥ 4    | identity                                                     |
//!
//! Matrices that rely on the approximation are tagged
//! [`RotationKind::Partial`].

use serde::Serialize;

use crate::harmonics::{acn, channel_count};

/// Whether a matrix is a true rotation of the whole field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationKind {
    /// Every degree is rotated exactly.
    Exact,
    /// Degrees 2 and 3 use the diagonal pitch/roll approximation, or degrees
    /// 4 and above are left unrotated.
    Partial,
}

/// 3×3 Cartesian rotation `Rz(yaw) · Ry(pitch) · Rx(roll)` in the axis
/// conventions of this module, row-major over (x, y, z).
pub fn cartesian_rotation(yaw: f64, pitch: f64, roll: f64) -> [[f64; 3]; 3] {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sr, cr) = roll.sin_cos();

    let rz = [[cy, -sy, 0.0], [sy, cy, 0.0], [0.0, 0.0, 1.0]];
    // Positive pitch moves +x toward +z.
    let ry = [[cp, 0.0, -sp], [0.0, 1.0, 0.0], [sp, 0.0, cp]];
    let rx = [[1.0, 0.0, 0.0], [0.0, cr, -sr], [0.0, sr, cr]];

    mul3(&rz, &mul3(&ry, &rx))
}

fn mul3(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Diagonal pitch/roll factor for degree `l`, index `m`:
/// `1 - (l(l+1) - m²)(1 - cos β)/2`, clamped to [-1, 1].
fn small_angle_factor(l: u32, m: i32, beta: f64) -> f64 {
    let weight = (l * (l + 1)) as f64 - (m * m) as f64;
    (1.0 - weight * (1.0 - beta.cos()) / 2.0).clamp(-1.0, 1.0)
}

/// A square rotation matrix over the `(order + 1)²` ambisonic channels.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationMatrix {
    order: u16,
    size: usize,
    /// Row-major `size × size` entries.
    data: Vec<f64>,
    kind: RotationKind,
}

impl RotationMatrix {
    pub fn identity(order: u16) -> Self {
        let size = channel_count(order);
        let mut data = vec![0.0; size * size];
        for i in 0..size {
            data[i * size + i] = 1.0;
        }
        Self {
            order,
            size,
            data,
            kind: RotationKind::Exact,
        }
    }

    /// Build the rotation for `order` from yaw, pitch and roll in radians.
    pub fn new(order: u16, yaw: f64, pitch: f64, roll: f64) -> Self {
        let mut m = Self::identity(order);
        if order == 0 {
            return m;
        }

        // Degree 1: channels (Y, Z, X) are the Cartesian (y, z, x) components.
        let r = cartesian_rotation(yaw, pitch, roll);
        const CART: [usize; 3] = [1, 2, 0];
        for a in 0..3 {
            for b in 0..3 {
                m.set(1 + a, 1 + b, r[CART[a]][CART[b]]);
            }
        }

        // Degrees 2 and 3: yaw mixes each ±m pair, pitch and roll scale the
        // diagonal.
        for l in 2..=(order.min(3) as u32) {
            let li = l as i32;
            let zonal = acn(l, 0);
            m.set(
                zonal,
                zonal,
                small_angle_factor(l, 0, pitch) * small_angle_factor(l, 0, roll),
            );
            for k in 1..=li {
                let scale = small_angle_factor(l, k, pitch) * small_angle_factor(l, k, roll);
                let (s, c) = (k as f64 * yaw).sin_cos();
                let pos = acn(l, k);
                let neg = acn(l, -k);
                m.set(pos, pos, c * scale);
                m.set(pos, neg, -s * scale);
                m.set(neg, neg, c * scale);
                m.set(neg, pos, s * scale);
            }
        }

        let tilted = pitch != 0.0 || roll != 0.0;
        let turned = yaw != 0.0 || tilted;
        m.kind = if (order >= 2 && tilted) || (order >= 4 && turned) {
            RotationKind::Partial
        } else {
            RotationKind::Exact
        };
        m
    }

    pub fn order(&self) -> u16 {
        self.order
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn kind(&self) -> RotationKind {
        self.kind
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.size + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.size..(row + 1) * self.size]
    }

    /// True if every entry is within `tolerance` of the identity.
    pub fn is_identity(&self, tolerance: f64) -> bool {
        (0..self.size).all(|i| {
            self.row(i)
                .iter()
                .enumerate()
                .all(|(j, &v)| (v - if i == j { 1.0 } else { 0.0 }).abs() <= tolerance)
        })
    }

    /// Matrix product `self · other`; `other` is applied first.
    pub fn compose(&self, other: &RotationMatrix) -> RotationMatrix {
        debug_assert_eq!(self.size, other.size);
        let n = self.size;
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for k in 0..n {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..n {
                    data[i * n + j] += a * other.get(k, j);
                }
            }
        }
        let kind = if self.kind == RotationKind::Exact && other.kind == RotationKind::Exact {
            RotationKind::Exact
        } else {
            RotationKind::Partial
        };
        RotationMatrix {
            order: self.order,
            size: n,
            data,
            kind,
        }
    }

    /// Rotate a coefficient vector.
    pub fn apply_to_coefficients(&self, coefficients: &[f64]) -> Vec<f64> {
        (0..self.size)
            .map(|i| self.row(i).iter().zip(coefficients).map(|(m, c)| m * c).sum())
            .collect()
    }

    /// Rotate per-channel sample buffers: `out[i][s] = Σ_j M[i][j] · in[j][s]`.
    ///
    /// `channels` must hold [`size`](Self::size) equally long buffers.
    pub fn apply(&self, channels: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let samples = channels.first().map_or(0, Vec::len);
        (0..self.size)
            .map(|i| {
                let mut out = vec![0.0f32; samples];
                for (j, input) in channels.iter().enumerate().take(self.size) {
                    let weight = self.get(i, j) as f32;
                    if weight == 0.0 {
                        continue;
                    }
                    for (o, &x) in out.iter_mut().zip(input) {
                        *o += weight * x;
                    }
                }
                out
            })
            .collect()
    }
}

/// Shorthand for [`RotationMatrix::new`].
pub fn rotation_matrix(order: u16, yaw: f64, pitch: f64, roll: f64) -> RotationMatrix {
    RotationMatrix::new(order, yaw, pitch, roll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonics::sn3d_basis;
    use std::f64::consts::FRAC_PI_2;

    fn assert_close(a: &[f64], b: &[f64], tol: f64, what: &str) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() < tol, "{what}: index {i}: {x} vs {y}");
        }
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        for order in 0..=7u16 {
            let m = rotation_matrix(order, 0.0, 0.0, 0.0);
            assert_eq!(m.size(), (order as usize + 1).pow(2));
            assert!(m.is_identity(0.0), "order {order}");
            assert_eq!(m.kind(), RotationKind::Exact);
        }
    }

    #[test]
    fn test_first_order_yaw_moves_source() {
        // A front source yawed by 90° ends up on the left.
        let m = rotation_matrix(1, FRAC_PI_2, 0.0, 0.0);
        let front = sn3d_basis(1, 0.0, 0.0);
        let rotated = m.apply_to_coefficients(&front);
        assert_close(&rotated, &sn3d_basis(1, FRAC_PI_2, 0.0), 1e-12, "yaw");
        assert_eq!(m.kind(), RotationKind::Exact);
    }

    #[test]
    fn test_first_order_pitch_and_roll() {
        let front = sn3d_basis(1, 0.0, 0.0);
        let up = rotation_matrix(1, 0.0, 0.5, 0.0).apply_to_coefficients(&front);
        assert_close(&up, &sn3d_basis(1, 0.0, 0.5), 1e-12, "pitch");

        let left = sn3d_basis(1, FRAC_PI_2, 0.0);
        let raised = rotation_matrix(1, 0.0, 0.0, 0.3).apply_to_coefficients(&left);
        assert_close(&raised, &sn3d_basis(1, FRAC_PI_2, 0.3), 1e-12, "roll");
    }

    #[test]
    fn test_first_order_composition_order() {
        // Pitch then yaw takes a front source to (az = yaw, el = pitch).
        let (yaw, pitch) = (1.1, -0.4);
        let m = rotation_matrix(1, yaw, pitch, 0.0);
        let rotated = m.apply_to_coefficients(&sn3d_basis(1, 0.0, 0.0));
        assert_close(&rotated, &sn3d_basis(1, yaw, pitch), 1e-12, "yaw·pitch");
    }

    #[test]
    fn test_first_order_block_is_orthonormal() {
        let m = rotation_matrix(1, 0.7, -0.2, 1.3);
        for i in 1..4 {
            for j in 1..4 {
                let dot: f64 = (1..4).map(|k| m.get(i, k) * m.get(j, k)).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-12, "rows {i},{j}: {dot}");
            }
        }
    }

    #[test]
    fn test_yaw_is_exact_through_third_order() {
        let yaw = 0.9;
        let m = rotation_matrix(3, yaw, 0.0, 0.0);
        assert_eq!(m.kind(), RotationKind::Exact);
        for &(az, el) in &[(0.0, 0.0), (0.3, 0.4), (-2.0, -0.6)] {
            let rotated = m.apply_to_coefficients(&sn3d_basis(3, az, el));
            assert_close(&rotated, &sn3d_basis(3, az + yaw, el), 1e-12, "third-order yaw");
        }
    }

    #[test]
    fn test_higher_degree_pitch_is_partial() {
        // The diagonal approximation does not reproduce a true pitch of the
        // second-order components; it only scales them.
        let m = rotation_matrix(2, 0.0, 0.5, 0.0);
        assert_eq!(m.kind(), RotationKind::Partial);
        for i in 4..9 {
            for j in 4..9 {
                if i != j {
                    assert_eq!(m.get(i, j), 0.0);
                }
            }
            assert!(m.get(i, i) <= 1.0 && m.get(i, i) >= -1.0);
        }
        // Degree 1 stays exact inside a partial matrix.
        let rotated = m.apply_to_coefficients(&sn3d_basis(2, 0.0, 0.0));
        assert_close(&rotated[1..4], &sn3d_basis(1, 0.0, 0.5)[1..4], 1e-12, "degree 1");
    }

    #[test]
    fn test_fourth_degree_left_unrotated() {
        let m = rotation_matrix(4, 0.8, 0.0, 0.0);
        assert_eq!(m.kind(), RotationKind::Partial);
        for i in 16..25 {
            for j in 0..25 {
                assert_eq!(m.get(i, j), if i == j { 1.0 } else { 0.0 });
            }
        }
    }

    #[test]
    fn test_apply_dense_multiply() {
        let m = rotation_matrix(1, FRAC_PI_2, 0.0, 0.0);
        // W = 1, X = 1 (front source) over 3 samples.
        let channels = vec![vec![1.0f32; 3], vec![0.0; 3], vec![0.0; 3], vec![1.0; 3]];
        let out = m.apply(&channels);
        assert_eq!(out.len(), 4);
        for s in 0..3 {
            assert!((out[0][s] - 1.0).abs() < 1e-6);
            assert!((out[1][s] - 1.0).abs() < 1e-6, "Y after turning left");
            assert!(out[3][s].abs() < 1e-6);
        }
        // Input is untouched.
        assert_eq!(channels[3], vec![1.0; 3]);
    }

    #[test]
    fn test_inverse_composition() {
        let (yaw, pitch, roll) = (0.4, -0.3, 0.2);
        let forward = rotation_matrix(1, yaw, pitch, roll);
        let inverse = rotation_matrix(1, 0.0, 0.0, -roll)
            .compose(&rotation_matrix(1, 0.0, -pitch, 0.0))
            .compose(&rotation_matrix(1, -yaw, 0.0, 0.0));
        assert!(inverse.compose(&forward).is_identity(1e-12));
    }
}
