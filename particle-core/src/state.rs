//! Particle buffers and the per-frame integrator.
//!
//! One tick does, for every particle:
//! 1. spin the stored target about the vertical axis by `elapsed * spin_rate`,
//! 2. bias the spun target with the [`ForceField`],
//! 3. relax `current` toward it by `rate * dt`.
//!
//! The stored `target` buffer is never written by a tick; the spin and the
//! force bias are recomputed from it every frame. The presentation spin
//! returned by [`frame_rotation`] is a separate stage that never touches the
//! buffers.

use glam::{Quat, Vec3};
use rand::Rng;
use rayon::prelude::*;

use crate::config::Config;
use crate::control::ControlSignal;
use crate::force::ForceField;

/// Owned `current` / `target` buffers of one simulation.
///
/// Both buffers always have the same length, fixed at construction.
#[derive(Debug, Clone)]
pub struct SimulationState {
    current: Vec<Vec3>,
    target: Vec<Vec3>,
}

impl SimulationState {
    /// Creates a state relaxing toward `target`, with `current` scattered
    /// uniformly in `[-seed_spread, seed_spread]` on every axis so the
    /// particles fly in. A negative or non-finite spread scatters nothing:
    /// every particle starts at the origin.
    pub fn new(target: Vec<Vec3>, cfg: &Config, rng: &mut impl Rng) -> Self {
        let current = scatter(target.len(), cfg.seed_spread, rng);
        Self { current, target }
    }

    /// Creates a state from explicit buffers.
    ///
    /// ### Panics
    /// Panics if the buffers differ in length.
    pub fn from_parts(current: Vec<Vec3>, target: Vec<Vec3>) -> Self {
        assert_eq!(current.len(), target.len(), "buffer length mismatch");
        Self { current, target }
    }

    /// Swaps in a new target buffer, keeping `current` so particles animate
    /// from where they are.
    ///
    /// ### Panics
    /// Panics if `target` has a different particle count; a new count needs
    /// a new state.
    pub fn retarget(&mut self, target: Vec<Vec3>) {
        assert_eq!(
            target.len(),
            self.current.len(),
            "retarget cannot change the particle count"
        );
        self.target = target;
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current(&self) -> &[Vec3] {
        &self.current
    }

    pub fn target(&self) -> &[Vec3] {
        &self.target
    }

    /// `current` as interleaved `[x0, y0, z0, x1, ...]`, length `3 * len`.
    pub fn current_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.current)
    }

    /// `target` as interleaved coordinates, length `3 * len`.
    pub fn target_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.target)
    }

    /// Advances every particle by one frame.
    ///
    /// The relaxation step is `current += (goal - current) * gain` with
    /// `gain = clamp(rate * dt, 0, 1)`. Below `dt = 1 / rate` this is the
    /// plain `rate * dt` step; a longer frame lands on the goal instead of
    /// overshooting it (see the relaxation-gain entry in DESIGN.md).
    ///
    /// ### Parameters
    /// - `dt` - Frame time in seconds. Negative or non-finite values are
    ///   treated as zero, so the tick is total over every `f32`.
    /// - `elapsed` - Seconds since the simulation clock started; drives the
    ///   target spin.
    /// - `control` - Hand snapshot for this frame.
    /// - `cfg` - Tuning constants.
    pub fn tick(&mut self, dt: f32, elapsed: f32, control: &ControlSignal, cfg: &Config) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let step = Step::new(dt, elapsed, control, cfg);

        if self.current.len() >= cfg.parallel_threshold {
            self.current
                .par_iter_mut()
                .zip(self.target.par_iter())
                .for_each(|(current, &target)| step.apply(current, target));
        } else {
            for (current, &target) in self.current.iter_mut().zip(&self.target) {
                step.apply(current, target);
            }
        }
    }
}

/// Everything one tick needs per particle, resolved once per frame.
struct Step<'a> {
    field: ForceField,
    control: &'a ControlSignal,
    spin_sin: f32,
    spin_cos: f32,
    gain: f32,
    dt: f32,
}

impl<'a> Step<'a> {
    fn new(dt: f32, elapsed: f32, control: &'a ControlSignal, cfg: &Config) -> Self {
        let rate = if control.is_active() {
            cfg.active_rate
        } else {
            cfg.idle_rate
        };
        let (spin_sin, spin_cos) = (elapsed * cfg.spin_rate).sin_cos();
        Self {
            field: ForceField::from_config(cfg),
            control,
            spin_sin,
            spin_cos,
            // Past 1 the step would overshoot the target on a long frame.
            gain: (rate * dt).clamp(0.0, 1.0),
            dt,
        }
    }

    #[inline]
    fn apply(&self, current: &mut Vec3, target: Vec3) {
        let spun = spin_about_y(target, self.spin_sin, self.spin_cos);
        let goal = self.field.adjust(spun, *current, self.control, self.dt);
        *current += (goal - *current) * self.gain;
    }
}

/// Rotates `p` about +y: `x' = x cos - z sin`, `z' = x sin + z cos`.
#[inline]
pub fn spin_about_y(p: Vec3, sin: f32, cos: f32) -> Vec3 {
    Vec3::new(p.x * cos - p.z * sin, p.y, p.x * sin + p.z * cos)
}

/// Spins a target point by `elapsed * spin_rate`, as step 1 of a tick does.
pub fn spun_target(p: Vec3, elapsed: f32, cfg: &Config) -> Vec3 {
    let (sin, cos) = (elapsed * cfg.spin_rate).sin_cos();
    spin_about_y(p, sin, cos)
}

/// Whole-cloud orientation for the renderer: `elapsed * frame_spin_rate`
/// about +y. Purely cosmetic; the physics never sees it.
pub fn frame_rotation(elapsed: f32, cfg: &Config) -> Quat {
    Quat::from_rotation_y(elapsed * cfg.frame_spin_rate)
}

fn scatter(count: usize, spread: f32, rng: &mut impl Rng) -> Vec<Vec3> {
    let spread = if spread.is_finite() { spread.max(0.0) } else { 0.0 };
    (0..count)
        .map(|_| {
            Vec3::new(
                rng.random_range(-spread..=spread),
                rng.random_range(-spread..=spread),
                rng.random_range(-spread..=spread),
            )
        })
        .collect()
}
