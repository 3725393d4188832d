//! Virtual-speaker layouts used for binaural decoding.
//!
//! The layout grows with the ambisonic order so that every order is sampled
//! by at least `(order + 1)²` roughly uniform directions:
//!
//! | order | layout       | speakers |
//! |-------|--------------|----------|
//! | ≤ 1   | cube         | 8        |
//! | 2     | icosahedron  | 12       |
//! | ≥ 3   | dodecahedron | 20       |
//!
//! Each speaker carries gain `1 / N`.

use serde::Serialize;

/// Golden ratio.
const PHI: f64 = 1.618_033_988_749_895;

/// One virtual speaker. Angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VirtualSpeaker {
    pub azimuth: f64,
    pub elevation: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Cube,
    Icosahedron,
    Dodecahedron,
}

impl LayoutKind {
    pub fn for_order(order: u16) -> Self {
        match order {
            0 | 1 => LayoutKind::Cube,
            2 => LayoutKind::Icosahedron,
            _ => LayoutKind::Dodecahedron,
        }
    }

    pub fn speaker_count(self) -> usize {
        match self {
            LayoutKind::Cube => 8,
            LayoutKind::Icosahedron => 12,
            LayoutKind::Dodecahedron => 20,
        }
    }

    fn vertices(self) -> Vec<[f64; 3]> {
        let inv = 1.0 / PHI;
        let mut out = Vec::with_capacity(self.speaker_count());
        match self {
            LayoutKind::Cube => {
                for z in [1.0, -1.0] {
                    for (x, y) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
                        out.push([x, y, z]);
                    }
                }
            }
            LayoutKind::Icosahedron => {
                for a in [1.0, -1.0] {
                    for b in [PHI, -PHI] {
                        out.push([0.0, a, b]);
                        out.push([a, b, 0.0]);
                        out.push([b, 0.0, a]);
                    }
                }
            }
            LayoutKind::Dodecahedron => {
                for x in [1.0, -1.0] {
                    for y in [1.0, -1.0] {
                        for z in [1.0, -1.0] {
                            out.push([x, y, z]);
                        }
                    }
                }
                for a in [inv, -inv] {
                    for b in [PHI, -PHI] {
                        out.push([0.0, a, b]);
                        out.push([a, b, 0.0]);
                        out.push([b, 0.0, a]);
                    }
                }
            }
        }
        out
    }

    /// Speakers of this layout, each with gain `1 / N`.
    pub fn speakers(self) -> Vec<VirtualSpeaker> {
        let vertices = self.vertices();
        let gain = 1.0 / vertices.len() as f64;
        vertices
            .into_iter()
            .map(|v| {
                let (azimuth, elevation) = direction_of(v);
                VirtualSpeaker {
                    azimuth,
                    elevation,
                    gain,
                }
            })
            .collect()
    }
}

/// `(azimuth, elevation)` of a non-zero vector.
pub fn direction_of([x, y, z]: [f64; 3]) -> (f64, f64) {
    let norm = (x * x + y * y + z * z).sqrt();
    if norm == 0.0 {
        return (0.0, 0.0);
    }
    (y.atan2(x), (z / norm).clamp(-1.0, 1.0).asin())
}

/// Virtual speakers for an ambisonic `order`.
pub fn speaker_layout(order: u16) -> Vec<VirtualSpeaker> {
    LayoutKind::for_order(order).speakers()
}
