//! Tuning constants for the simulation and the user-facing render
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Rgb, ShapeKind};

/// Simulation tuning.
///
/// The defaults reproduce the reference motion; every field can be
/// overridden from JSON, missing fields keep their default.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Angular speed (rad/s) of the target spin about the vertical axis.
    pub spin_rate: f32,
    /// Angular speed (rad/s) of the presentation-only frame spin.
    pub frame_spin_rate: f32,
    /// Relaxation rate with no active gesture.
    pub idle_rate: f32,
    /// Relaxation rate while an open or closed hand is present.
    pub active_rate: f32,
    /// World units per unit of normalized control position.
    pub cursor_scale: f32,
    /// Repulsion only acts within this distance of the cursor.
    pub repel_radius: f32,
    /// Repulsion strength per unit of openness.
    pub repel_gain: f32,
    /// Attraction only acts within this distance of the cursor.
    pub attract_radius: f32,
    /// Fraction of the way a target moves toward the cursor when attracted.
    pub attract_blend: f32,
    /// Half-width of the cube new particles are scattered in.
    pub seed_spread: f32,
    /// Particle count from which ticks run on the rayon pool.
    pub parallel_threshold: usize,
    /// Rejection attempts per Buddha point before falling back to the
    /// region centre.
    pub rejection_attempts: u32,
}

impl Config {
    /// Range check for tuning read from outside, e.g. a JSON file.
    ///
    /// Spin rates only need to be finite. Relaxation rates, radii, gains and
    /// the scatter spread must be finite and non-negative, and
    /// `attract_blend` must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("spin_rate", self.spin_rate),
            ("frame_spin_rate", self.frame_spin_rate),
            ("cursor_scale", self.cursor_scale),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }

        let non_negative = [
            ("idle_rate", self.idle_rate),
            ("active_rate", self.active_rate),
            ("repel_radius", self.repel_radius),
            ("repel_gain", self.repel_gain),
            ("attract_radius", self.attract_radius),
            ("seed_spread", self.seed_spread),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.attract_blend) {
            return Err(ConfigError::InvalidTuning {
                field: "attract_blend",
                value: self.attract_blend,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spin_rate: 0.1,
            frame_spin_rate: 0.05,
            idle_rate: 3.0,
            active_rate: 1.5,
            cursor_scale: 5.0,
            repel_radius: 5.0,
            repel_gain: 5.0,
            attract_radius: 8.0,
            attract_blend: 0.1,
            seed_spread: 5.0,
            parallel_threshold: 4096,
            rejection_attempts: 64,
        }
    }
}

/// What the user picks: shape, particle count, colour and point size.
///
/// Changing `count` or `shape` rebuilds the target buffer; `color` and
/// `size` only matter to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub color: Rgb,
    pub count: usize,
    pub size: f32,
    pub shape: ShapeKind,
}

impl RenderConfig {
    /// Upper end of the particle-count slider.
    pub const MAX_INTERACTIVE_COUNT: usize = 20_000;

    /// Boundary check run before a configuration reaches the core.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::ZeroCount);
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ConfigError::InvalidSize(self.size));
        }
        Ok(())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: Rgb::new(0xa8, 0x55, 0xf7),
            count: 5000,
            size: 0.12,
            shape: ShapeKind::Saturn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render_config_is_valid() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.shape, ShapeKind::Saturn);
        assert_eq!(cfg.color.to_string(), "#a855f7");
    }

    #[test]
    fn validate_rejects_zero_count() {
        let cfg = RenderConfig {
            count: 0,
            ..RenderConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCount));
    }

    #[test]
    fn validate_rejects_non_positive_or_nan_size() {
        for size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let cfg = RenderConfig {
                size,
                ..RenderConfig::default()
            };
            assert!(cfg.validate().is_err(), "accepted size {size}");
        }
    }

    #[test]
    fn default_tuning_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_negative_spread_from_json() {
        let cfg: Config = serde_json::from_str(r#"{ "seed_spread": -1.0 }"#).unwrap();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidTuning {
                field: "seed_spread",
                value: -1.0
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_tuning() {
        let cases = [
            Config { idle_rate: -3.0, ..Config::default() },
            Config { repel_radius: f32::NAN, ..Config::default() },
            Config { attract_radius: f32::INFINITY, ..Config::default() },
            Config { attract_blend: 1.5, ..Config::default() },
            Config { attract_blend: f32::NAN, ..Config::default() },
            Config { spin_rate: f32::NAN, ..Config::default() },
        ];
        for cfg in cases {
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidTuning { .. })),
                "accepted {cfg:?}"
            );
        }
    }

    #[test]
    fn negative_spin_is_a_direction_not_an_error() {
        let cfg = Config {
            spin_rate: -0.1,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn partial_tuning_json_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "idle_rate": 4.0 }"#).unwrap();
        assert_eq!(cfg.idle_rate, 4.0);
        assert_eq!(cfg.active_rate, Config::default().active_rate);
        assert_eq!(cfg.repel_radius, 5.0);
    }

    #[test]
    fn render_config_reads_from_json() {
        let cfg: RenderConfig =
            serde_json::from_str(r##"{ "color": "#ff0000", "count": 1200, "shape": "Heart" }"##)
                .unwrap();
        assert_eq!(cfg.color, Rgb::new(255, 0, 0));
        assert_eq!(cfg.count, 1200);
        assert_eq!(cfg.shape, ShapeKind::Heart);
        assert_eq!(cfg.size, 0.12);
    }
}
