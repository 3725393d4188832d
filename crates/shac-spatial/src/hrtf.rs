//! Analytic HRTF model: per-ear gains for a virtual speaker direction.
//!
//! No measured dataset is involved. Gains are built from a handful of
//! broadband cues:
//!
//! - **Base panning**: `0.5 + 0.5·cos(φ ∓ π/2)`, left ear with `-`.
//! - **Pinna**: sources above the horizon are boosted by `1 + k·sin(el)`.
//! - **Head shadow**: the far ear loses `k·|sin φ|`.
//! - **Torso**: sources below the horizon are scaled by a constant reflection.
//! - **Air absorption**: a constant overall factor.
//!
//! Each gain is clamped to at least [`HrtfModel::min_gain`], and never below
//! [`MIN_GAIN_FLOOR`] whatever the configuration says. The interaural
//! time difference (Woodworth) is reported in [`HrtfGains::itd_seconds`] but
//! the renderer does not apply it.

use serde::{Deserialize, Serialize};

/// No direction is ever rendered silent.
pub const MIN_GAIN_FLOOR: f64 = 0.01;

/// Tunable coefficients of the analytic head model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrtfModel {
    /// Above-horizon boost factor.
    pub pinna_boost: f64,
    /// Far-ear attenuation at ±90°.
    pub head_shadow: f64,
    /// Gain for sources below the horizon.
    pub torso_reflection: f64,
    /// Constant broadband gain.
    pub air_absorption: f64,
    /// Lower bound of every ear gain; values below [`MIN_GAIN_FLOOR`] are raised to it.
    pub min_gain: f64,
    /// Head radius in meters.
    pub head_radius: f64,
    /// Meters per second.
    pub speed_of_sound: f64,
}

impl Default for HrtfModel {
    fn default() -> Self {
        Self {
            pinna_boost: 0.2,
            head_shadow: 0.3,
            torso_reflection: 0.9,
            air_absorption: 0.95,
            min_gain: MIN_GAIN_FLOOR,
            head_radius: 0.0875,
            speed_of_sound: 343.0,
        }
    }
}

/// Left and right gains for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HrtfGains {
    pub left: f64,
    pub right: f64,
    /// Interaural time difference; positive when the left ear leads.
    pub itd_seconds: f64,
}

impl HrtfModel {
    fn pinna(&self) -> f64 {
        self.pinna_boost.clamp(0.0, 1.0)
    }

    fn shadow(&self) -> f64 {
        self.head_shadow.clamp(0.0, 1.0)
    }

    fn torso(&self) -> f64 {
        self.torso_reflection.clamp(0.0, 1.0)
    }

    fn air(&self) -> f64 {
        self.air_absorption.clamp(0.0, 1.0)
    }

    fn floor(&self) -> f64 {
        self.min_gain.max(MIN_GAIN_FLOOR)
    }

    /// Ear gains for a source at `(azimuth, elevation)` radians.
    pub fn gains(&self, azimuth: f64, elevation: f64) -> HrtfGains {
        let lateral = azimuth.sin();
        let mut left = 0.5 + 0.5 * lateral;
        let mut right = 0.5 - 0.5 * lateral;

        if elevation > 0.0 {
            let boost = 1.0 + self.pinna() * elevation.sin();
            left *= boost;
            right *= boost;
        }

        let shadow = 1.0 - self.shadow() * lateral.abs();
        if lateral > 0.0 {
            right *= shadow;
        } else {
            left *= shadow;
        }

        if elevation < 0.0 {
            left *= self.torso();
            right *= self.torso();
        }

        left *= self.air();
        right *= self.air();

        HrtfGains {
            left: left.max(self.floor()),
            right: right.max(self.floor()),
            itd_seconds: self.itd_seconds(azimuth, elevation),
        }
    }

    /// Woodworth interaural time difference for a spherical head.
    pub fn itd_seconds(&self, azimuth: f64, elevation: f64) -> f64 {
        if self.speed_of_sound <= 0.0 {
            return 0.0;
        }
        let angle = (azimuth.sin() * elevation.cos()).clamp(-1.0, 1.0).asin();
        self.head_radius / self.speed_of_sound * (angle.sin() + angle)
    }

    /// Upper bound of any gain returned by [`gains`](Self::gains).
    pub fn max_gain(&self) -> f64 {
        (self.air() * (1.0 + self.pinna()).max(self.torso()).max(1.0)).max(self.floor())
    }
}
