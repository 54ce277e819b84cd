//! Navigation grid configuration.
//!
//! [`NavConfig`] is plain data so setup code can build it in place or load it
//! from JSON next to the level description.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds2D;
use crate::query::LayerMask;
use crate::NavError;

/// Configuration for a [`NavGrid`](crate::grid::NavGrid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// World-space area to cover. `max` is snapped outward to whole cells.
    pub bounds: Bounds2D,
    /// Desired cell size. The actual size may differ slightly after rounding.
    pub cell_size: Vec2,
    /// Collision layers sampled on refresh.
    pub layers: LayerMask,
}

impl Default for NavConfig {
    /// A 32 x 32 world-unit area centered on the origin with 1-unit cells.
    fn default() -> Self {
        Self {
            bounds: Bounds2D::new(Vec2::splat(-16.0), Vec2::splat(16.0)),
            cell_size: Vec2::ONE,
            layers: LayerMask::ALL,
        }
    }
}

impl NavConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = NavConfig::from_json(r#"{ "cell_size": [0.5, 0.5] }"#).unwrap();
        assert_eq!(config.cell_size, Vec2::splat(0.5));
        assert_eq!(config.bounds, NavConfig::default().bounds);
        assert_eq!(config.layers, LayerMask::ALL);
    }

    #[test]
    fn full_json_round_trip() {
        let config = NavConfig {
            bounds: Bounds2D::new(Vec2::ZERO, Vec2::new(20.0, 10.0)),
            cell_size: Vec2::new(2.0, 1.0),
            layers: LayerMask::layer(3),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(NavConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = NavConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }
}
