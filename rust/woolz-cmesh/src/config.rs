// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transform configuration and tolerances.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use woolz_core::Error;

/// Tolerance used when quantising interval columns.
pub const MESH_TOLERANCE: f64 = 1.0e-4;

/// Signed area/volume below which an element is squashed.
pub const MESH_TOLERANCE_SQ: f64 = MESH_TOLERANCE * MESH_TOLERANCE;

/// Distance within which a tetrahedron vertex lies on a plane.
pub const PLANE_TOLERANCE: f64 = 1.0e-10;

/// Scale factors smaller than this in magnitude are rejected.
pub const SCALE_EPSILON: f64 = 1.0e-6;

/// Grey value interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
    /// Classifier-driven resampling; recognised but not supported.
    Classify,
}

impl Interpolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Linear => "linear",
            Interpolation::Classify => "classify",
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "linear" => Ok(Interpolation::Linear),
            "classify" => Ok(Interpolation::Classify),
            other => Err(Error::InterpolationType(other.to_string())),
        }
    }
}

/// How samples landing on one destination pixel are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overlap {
    /// Arithmetic mean of every sample.
    #[default]
    Mean,
    /// The most frequent sample value; ties go to the larger value. Used for
    /// label images, where a mean would invent labels.
    Majority,
}

/// Transform configuration.
///
/// Deserialises from partial documents; absent fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Grey resampling method.
    pub interpolation: Interpolation,
    /// Combination of overlapping samples.
    pub overlap: Overlap,
    /// Added to interval edge columns before flooring.
    pub column_tolerance: f64,
    /// Element squash threshold for twice-area or six-times-volume.
    pub squash_tolerance: f64,
    /// Plane contact tolerance in the tetrahedron sweep.
    pub plane_tolerance: f64,
    /// Smallest accepted domain scale magnitude.
    pub scale_epsilon: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Nearest,
            overlap: Overlap::Mean,
            column_tolerance: MESH_TOLERANCE,
            squash_tolerance: MESH_TOLERANCE_SQ,
            plane_tolerance: PLANE_TOLERANCE,
            scale_epsilon: SCALE_EPSILON,
        }
    }
}

impl TransformConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for absent or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            interpolation: std::env::var("WLZ_CMESH_INTERPOLATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.interpolation),
            column_tolerance: std::env::var("WLZ_CMESH_COLUMN_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .unwrap_or(defaults.column_tolerance),
            squash_tolerance: std::env::var("WLZ_CMESH_SQUASH_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .unwrap_or(defaults.squash_tolerance),
            ..defaults
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_overlap(mut self, overlap: Overlap) -> Self {
        self.overlap = overlap;
        self
    }
}
