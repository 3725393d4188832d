//! SN3D real spherical harmonics in ACN channel order.
//!
//! For degree `l` and index `m ∈ [-l, l]` the coefficient at azimuth `φ` and
//! elevation `θ` is
//!
//! ```text
//! N(l,|m|) · P(l,|m|)(sin θ) · { 1           m = 0
//!                              { √2·cos(mφ)  m > 0
//!                              { √2·sin(|m|φ) m < 0
//!
//! N(l,m) = sqrt((l-m)! / (l+m)!)
//! ```
//!
//! with the associated Legendre functions `P` taken without the
//! Condon–Shortley phase. Channel `l² + l + m` holds degree `l`, index `m`,
//! so channel 0 is the omnidirectional component and equals 1 everywhere.
//!
//! Degrees 0–3 have closed forms; every order can also be evaluated through
//! the three-term Legendre recurrence ([`associated_legendre`]).

use std::f64::consts::SQRT_2;

/// Number of ambisonic channels for `order`: `(order + 1)²`.
pub fn channel_count(order: u16) -> usize {
    let n = order as usize + 1;
    n * n
}

/// The order whose channel count is exactly `channels`, if any.
pub fn order_for_channels(channels: usize) -> Option<u16> {
    if channels == 0 {
        return None;
    }
    let n = (channels as f64).sqrt().round() as usize;
    if n * n == channels && n <= u16::MAX as usize + 1 {
        Some((n - 1) as u16)
    } else {
        None
    }
}

/// ACN channel index of degree `l`, index `m`.
pub fn acn(l: u32, m: i32) -> usize {
    (l as i64 * l as i64 + l as i64 + m as i64) as usize
}

/// SN3D normalization `sqrt((l-m)! / (l+m)!)` for `0 ≤ m ≤ l`.
pub fn sn3d_normalization(l: u32, m: u32) -> f64 {
    // (l-m)!/(l+m)! = 1 / ((l-m+1)·…·(l+m))
    let ratio: f64 = ((l - m + 1)..=(l + m)).map(|k| 1.0 / k as f64).product();
    ratio.sqrt()
}

/// Index of `P(l,m)` inside the table returned by [`associated_legendre`].
pub fn legendre_index(l: u32, m: u32) -> usize {
    (l * (l + 1) / 2 + m) as usize
}

/// Associated Legendre functions `P(l,m)(x)` for `0 ≤ m ≤ l ≤ max_degree`,
/// without the Condon–Shortley phase.
///
/// `s` is the companion value `sqrt(1 - x²)`. Passing `cos θ` for
/// `x = sin θ` keeps the result consistent for elevations beyond ±90°.
///
/// Uses the standard recurrence:
///
/// ```text
/// P(m,m)   = (2m-1)!! · s^m
/// P(m+1,m) = x · (2m+1) · P(m,m)
/// P(l,m)   = ((2l-1) · x · P(l-1,m) - (l+m-1) · P(l-2,m)) / (l-m)
/// ```
pub fn associated_legendre(max_degree: u32, x: f64, s: f64) -> Vec<f64> {
    let size = legendre_index(max_degree, max_degree) + 1;
    let mut p = vec![0.0; size];

    let mut pmm = 1.0;
    for m in 0..=max_degree {
        if m > 0 {
            pmm *= (2 * m - 1) as f64 * s;
        }
        p[legendre_index(m, m)] = pmm;
        if m == max_degree {
            break;
        }

        let mut prev2 = pmm;
        let mut prev1 = x * (2 * m + 1) as f64 * pmm;
        p[legendre_index(m + 1, m)] = prev1;

        for l in (m + 2)..=max_degree {
            let pl = ((2 * l - 1) as f64 * x * prev1 - (l + m - 1) as f64 * prev2) / (l - m) as f64;
            p[legendre_index(l, m)] = pl;
            prev2 = prev1;
            prev1 = pl;
        }
    }
    p
}

/// SN3D basis of `order` at (`azimuth`, `elevation`) in radians.
///
/// Returns `(order + 1)²` coefficients in ACN order. Degrees 0–3 use closed
/// forms; higher degrees use the recurrence.
pub fn sn3d_basis(order: u16, azimuth: f64, elevation: f64) -> Vec<f64> {
    let mut out = vec![0.0; channel_count(order)];
    closed_form_into(order.min(3), azimuth, elevation, &mut out);
    if order > 3 {
        recurrence_into(4, order as u32, azimuth, elevation, &mut out);
    }
    out
}

/// SN3D basis evaluated through the recurrence for every degree.
pub fn sn3d_basis_recurrence(order: u16, azimuth: f64, elevation: f64) -> Vec<f64> {
    let mut out = vec![0.0; channel_count(order)];
    recurrence_into(0, order as u32, azimuth, elevation, &mut out);
    out
}

fn recurrence_into(min_degree: u32, max_degree: u32, azimuth: f64, elevation: f64, out: &mut [f64]) {
    let (x, s) = elevation.sin_cos();
    let p = associated_legendre(max_degree, x, s);

    for l in min_degree..=max_degree {
        out[acn(l, 0)] = p[legendre_index(l, 0)];
        for m in 1..=l {
            let scale = SQRT_2 * sn3d_normalization(l, m) * p[legendre_index(l, m)];
            let (sin_m, cos_m) = (m as f64 * azimuth).sin_cos();
            out[acn(l, m as i32)] = scale * cos_m;
            out[acn(l, -(m as i32))] = scale * sin_m;
        }
    }
}

fn closed_form_into(order: u16, azimuth: f64, elevation: f64, out: &mut [f64]) {
    let (x, c) = elevation.sin_cos();

    out[0] = 1.0;
    if order < 1 {
        return;
    }

    let (sin_a, cos_a) = azimuth.sin_cos();
    out[1] = sin_a * c;
    out[2] = x;
    out[3] = cos_a * c;
    if order < 2 {
        return;
    }

    let (sin_2a, cos_2a) = (2.0 * azimuth).sin_cos();
    let half_sqrt3 = 3.0f64.sqrt() / 2.0;
    let c2 = c * c;
    out[4] = half_sqrt3 * sin_2a * c2;
    out[5] = half_sqrt3 * sin_a * 2.0 * x * c;
    out[6] = 0.5 * (3.0 * x * x - 1.0);
    out[7] = half_sqrt3 * cos_a * 2.0 * x * c;
    out[8] = half_sqrt3 * cos_2a * c2;
    if order < 3 {
        return;
    }

    let (sin_3a, cos_3a) = (3.0 * azimuth).sin_cos();
    let k3 = (5.0f64 / 8.0).sqrt();
    let k2 = 15.0f64.sqrt() / 2.0;
    let k1 = (3.0f64 / 8.0).sqrt();
    let c3 = c2 * c;
    let tilt = c * (5.0 * x * x - 1.0);
    out[9] = k3 * sin_3a * c3;
    out[10] = k2 * sin_2a * x * c2;
    out[11] = k1 * sin_a * tilt;
    out[12] = 0.5 * x * (5.0 * x * x - 3.0);
    out[13] = k1 * cos_a * tilt;
    out[14] = k2 * cos_2a * x * c2;
    out[15] = k3 * cos_3a * c3;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const DIRECTIONS: [(f64, f64); 8] = [
        (0.0, 0.0),
        (FRAC_PI_2, 0.0),
        (-FRAC_PI_2, 0.3),
        (PI, -0.7),
        (0.4, FRAC_PI_2),
        (-2.5, -FRAC_PI_2),
        (1.234, 0.567),
        (-0.1, -1.2),
    ];

    #[test]
    fn test_channel_count_and_inverse() {
        for order in 0..=7u16 {
            let n = channel_count(order);
            assert_eq!(n, (order as usize + 1).pow(2));
            assert_eq!(order_for_channels(n), Some(order));
        }
        for bad in [0usize, 2, 3, 5, 8, 15, 17] {
            assert_eq!(order_for_channels(bad), None, "{bad}");
        }
    }

    #[test]
    fn test_acn_index() {
        assert_eq!(acn(0, 0), 0);
        assert_eq!(acn(1, -1), 1);
        assert_eq!(acn(1, 0), 2);
        assert_eq!(acn(1, 1), 3);
        assert_eq!(acn(2, -2), 4);
        assert_eq!(acn(3, 3), 15);
        assert_eq!(acn(7, 7), 63);
    }

    #[test]
    fn test_basis_length_and_omni() {
        for order in 0..=7u16 {
            for &(az, el) in &DIRECTIONS {
                let b = sn3d_basis(order, az, el);
                assert_eq!(b.len(), channel_count(order));
                assert_eq!(b[0], 1.0, "order {order} at ({az}, {el})");
            }
        }
    }

    #[test]
    fn test_first_order_is_unit_vector() {
        // ACN 1..3 = (Y, Z, X) of the direction, x forward, y left, z up.
        let b = sn3d_basis(1, FRAC_PI_2, 0.0);
        assert!((b[1] - 1.0).abs() < 1e-12, "Y for a left source: {}", b[1]);
        assert!(b[3].abs() < 1e-12);

        let b = sn3d_basis(1, 0.0, FRAC_PI_2);
        assert!((b[2] - 1.0).abs() < 1e-12);

        let b = sn3d_basis(1, 0.7, -0.4);
        let norm = b[1] * b[1] + b[2] * b[2] + b[3] * b[3];
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_closed_forms_match_recurrence() {
        for order in 0..=3u16 {
            for &(az, el) in &DIRECTIONS {
                let closed = sn3d_basis(order, az, el);
                let recur = sn3d_basis_recurrence(order, az, el);
                for (i, (a, b)) in closed.iter().zip(&recur).enumerate() {
                    assert!(
                        (a - b).abs() < 1e-12,
                        "order {order} channel {i} at ({az}, {el}): closed {a}, recurrence {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_known_second_order_values() {
        // Source at azimuth 45°, on the horizon.
        let b = sn3d_basis(2, FRAC_PI_4, 0.0);
        assert!((b[4] - 3.0f64.sqrt() / 2.0).abs() < 1e-12);
        assert!(b[5].abs() < 1e-12);
        assert!((b[6] + 0.5).abs() < 1e-12);
        assert!(b[7].abs() < 1e-12);
        assert!(b[8].abs() < 1e-12);
    }

    #[test]
    fn test_sectoral_horizon_values() {
        for l in 1..=7u16 {
            let b = sn3d_basis(l, 0.0, 0.0);
            let cos_sectoral = b[acn(l as u32, l as i32)];
            assert!(
                (cos_sectoral - sectoral_peak(l as u32)).abs() < 1e-9,
                "degree {l}: {cos_sectoral}"
            );
        }
    }

    /// Value of the cos-type sectoral harmonic at (0, 0):
    /// √2 · (2l-1)!! / sqrt((2l)!).
    fn sectoral_peak(l: u32) -> f64 {
        let double_fact: f64 = (1..=l).map(|k| (2 * k - 1) as f64).product();
        let fact: f64 = (1..=2 * l).map(|k| k as f64).product();
        SQRT_2 * double_fact / fact.sqrt()
    }

    #[test]
    fn test_high_order_recurrence_is_finite_and_bounded() {
        for &(az, el) in &DIRECTIONS {
            let b = sn3d_basis(7, az, el);
            assert_eq!(b.len(), 64);
            for (i, v) in b.iter().enumerate() {
                assert!(v.is_finite(), "channel {i} not finite");
                // SN3D values are bounded by √2 in magnitude.
                assert!(v.abs() <= SQRT_2 + 1e-9, "channel {i} = {v}");
            }
        }
    }

    #[test]
    fn test_legendre_low_degrees() {
        let x: f64 = 0.3;
        let s = (1.0 - x * x).sqrt();
        let p = associated_legendre(3, x, s);
        assert!((p[legendre_index(0, 0)] - 1.0).abs() < 1e-12);
        assert!((p[legendre_index(1, 0)] - x).abs() < 1e-12);
        assert!((p[legendre_index(1, 1)] - s).abs() < 1e-12);
        assert!((p[legendre_index(2, 0)] - 0.5 * (3.0 * x * x - 1.0)).abs() < 1e-12);
        assert!((p[legendre_index(2, 2)] - 3.0 * s * s).abs() < 1e-12);
        assert!((p[legendre_index(3, 1)] - 1.5 * s * (5.0 * x * x - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_normalization_values() {
        assert_eq!(sn3d_normalization(0, 0), 1.0);
        assert_eq!(sn3d_normalization(3, 0), 1.0);
        assert!((sn3d_normalization(1, 1) - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((sn3d_normalization(2, 2) - (1.0f64 / 24.0).sqrt()).abs() < 1e-12);
    }
}
