//! Gesture-driven adjustment of a particle's target.

use glam::Vec3;

use crate::config::Config;
use crate::control::{ControlSignal, Gesture};

/// Per-particle force field.
///
/// Holds only the scalar parameters taken from [`Config`]; evaluating it is
/// branch-and-arithmetic only, with no allocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceField {
    pub cursor_scale: f32,
    pub repel_radius: f32,
    pub repel_gain: f32,
    pub attract_radius: f32,
    pub attract_blend: f32,
}

impl ForceField {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            cursor_scale: cfg.cursor_scale,
            repel_radius: cfg.repel_radius,
            repel_gain: cfg.repel_gain,
            attract_radius: cfg.attract_radius,
            attract_blend: cfg.attract_blend,
        }
    }

    /// Returns `target` biased by the hand described in `control`.
    ///
    /// - No hand: `target` unchanged.
    /// - `Open`: within `repel_radius` of the cursor, the target is pushed
    ///   along `current - cursor` by
    ///   `openness * repel_gain * (repel_radius - d) * dt`.
    /// - `Closed`: within `attract_radius`, the target is blended toward the
    ///   cursor by `attract_blend`.
    /// - `Neutral`: unchanged.
    ///
    /// `d` is the distance from `current` (not `target`) to the cursor.
    #[inline]
    pub fn adjust(&self, target: Vec3, current: Vec3, control: &ControlSignal, dt: f32) -> Vec3 {
        if !control.present {
            return target;
        }

        let cursor = control.cursor(self.cursor_scale);
        let away = current - cursor;
        let d = away.length();

        match control.gesture {
            Gesture::Open if d < self.repel_radius => {
                let force = control.openness * self.repel_gain * (self.repel_radius - d).max(0.0) * dt;
                target + away * force
            }
            Gesture::Closed if d < self.attract_radius => target.lerp(cursor, self.attract_blend),
            _ => target,
        }
    }
}

impl Default for ForceField {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
