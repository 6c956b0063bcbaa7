//! Ties configuration changes to buffer (re)allocation and drives ticks.

use glam::Quat;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cloud::PointCloud;
use crate::config::{Config, RenderConfig};
use crate::control::ControlSignal;
use crate::sampler;
use crate::state::{self, SimulationState};
use crate::types::{Rgb, ShapeKind};

/// What the renderer draws after a tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Interleaved particle positions, `3 * count` values.
    pub positions: &'a [f32],
    pub color: Rgb,
    pub size: f32,
    /// Presentation-only orientation of the whole cloud.
    pub rotation: Quat,
}

/// Owns the live configuration, the custom point list, the random source and
/// the simulation buffers.
///
/// Both configuration changes and ticks take `&mut self`, so a reallocation
/// can never overlap a tick.
#[derive(Debug)]
pub struct Orchestrator {
    config: RenderConfig,
    tuning: Config,
    custom: Option<Vec<f32>>,
    state: SimulationState,
    rng: StdRng,
}

impl Orchestrator {
    /// Builds an orchestrator seeded from the OS entropy source.
    pub fn new(config: RenderConfig, tuning: Config) -> Self {
        Self::with_rng(config, tuning, StdRng::from_os_rng())
    }

    /// Builds an orchestrator whose sampling and seeding are reproducible.
    pub fn with_seed(config: RenderConfig, tuning: Config, seed: u64) -> Self {
        Self::with_rng(config, tuning, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RenderConfig, tuning: Config, mut rng: StdRng) -> Self {
        let target = sampler::sample(
            config.shape,
            config.count,
            None,
            tuning.rejection_attempts,
            &mut rng,
        );
        let state = SimulationState::new(target, &tuning, &mut rng);
        log::debug!("initialized {} {} particles", config.count, config.shape);
        Self {
            config,
            tuning,
            custom: None,
            state,
            rng,
        }
    }

    /// Applies a configuration change.
    ///
    /// When `custom` is given it replaces the stored custom list before
    /// sampling. A changed particle count reallocates both buffers and
    /// scatters `current` again; otherwise only the target is replaced and
    /// particles glide from their present positions.
    ///
    /// `config` is expected to have passed [`RenderConfig::validate`].
    pub fn apply_config(&mut self, config: RenderConfig, custom: Option<&[f32]>) {
        debug_assert!(config.validate().is_ok(), "unvalidated config {config:?}");

        if let Some(points) = custom {
            self.custom = Some(points.to_vec());
        }

        let target = sampler::sample(
            config.shape,
            config.count,
            self.custom.as_deref(),
            self.tuning.rejection_attempts,
            &mut self.rng,
        );

        if config.count != self.state.len() {
            log::debug!(
                "particle count {} -> {}, reallocating",
                self.state.len(),
                config.count
            );
            self.state = SimulationState::new(target, &self.tuning, &mut self.rng);
        } else {
            log::debug!("retargeting {} particles to {}", config.count, config.shape);
            self.state.retarget(target);
        }
        self.config = config;
    }

    /// Stores a generated cloud and switches to the custom shape.
    pub fn adopt_cloud(&mut self, cloud: PointCloud) {
        log::info!("adopting generated cloud of {} points", cloud.len());
        let config = RenderConfig {
            shape: ShapeKind::Custom,
            ..self.config
        };
        self.apply_config(config, Some(cloud.as_slice()));
    }

    /// Replaces the tuning constants. Takes effect on the next tick; the
    /// buffers are left alone.
    pub fn set_tuning(&mut self, tuning: Config) {
        self.tuning = tuning;
    }

    /// Advances the simulation by one frame.
    pub fn tick(&mut self, dt: f32, elapsed: f32, control: &ControlSignal) {
        self.state.tick(dt, elapsed, control, &self.tuning);
    }

    /// Output for the renderer at clock time `elapsed`.
    pub fn frame(&self, elapsed: f32) -> Frame<'_> {
        Frame {
            positions: self.state.current_flat(),
            color: self.config.color,
            size: self.config.size,
            rotation: state::frame_rotation(elapsed, &self.tuning),
        }
    }

    pub fn positions(&self) -> &[f32] {
        self.state.current_flat()
    }

    pub fn targets(&self) -> &[f32] {
        self.state.target_flat()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn tuning(&self) -> &Config {
        &self.tuning
    }

    /// The stored custom list, if any cloud has been supplied.
    pub fn custom_points(&self) -> Option<&[f32]> {
        self.custom.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(shape: ShapeKind, count: usize) -> RenderConfig {
        RenderConfig {
            shape,
            count,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn new_builds_buffers_of_configured_size() {
        let orch = Orchestrator::with_seed(small(ShapeKind::Heart, 300), Config::default(), 1);
        assert_eq!(orch.positions().len(), 900);
        assert_eq!(orch.targets().len(), 900);
        assert_eq!(orch.render_config().shape, ShapeKind::Heart);
    }

    #[test]
    fn same_seed_reproduces_the_same_buffers() {
        let a = Orchestrator::with_seed(small(ShapeKind::Buddha, 200), Config::default(), 42);
        let b = Orchestrator::with_seed(small(ShapeKind::Buddha, 200), Config::default(), 42);
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.targets(), b.targets());
    }

    #[test]
    fn shape_change_keeps_current_positions() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Heart, 100), Config::default(), 2);
        let before = orch.positions().to_vec();
        let old_targets = orch.targets().to_vec();

        orch.apply_config(small(ShapeKind::Flower, 100), None);

        assert_eq!(orch.positions(), &before[..]);
        assert_ne!(orch.targets(), &old_targets[..]);
        assert_eq!(orch.render_config().shape, ShapeKind::Flower);
    }

    #[test]
    fn count_change_reallocates_and_reseeds() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Saturn, 100), Config::default(), 3);
        let before = orch.positions().to_vec();

        orch.apply_config(small(ShapeKind::Saturn, 150), None);

        assert_eq!(orch.positions().len(), 450);
        assert_eq!(orch.targets().len(), 450);
        assert_ne!(&orch.positions()[..300], &before[..]);
    }

    #[test]
    fn color_change_is_reported_in_frame() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Heart, 10), Config::default(), 4);
        let cfg = RenderConfig {
            color: Rgb::new(1, 2, 3),
            size: 0.5,
            ..*orch.render_config()
        };
        orch.apply_config(cfg, None);

        let frame = orch.frame(0.0);
        assert_eq!(frame.color, Rgb::new(1, 2, 3));
        assert_eq!(frame.size, 0.5);
        assert_eq!(frame.positions.len(), 30);
        assert_eq!(frame.rotation, Quat::IDENTITY);
    }

    #[test]
    fn adopt_cloud_switches_to_custom_and_tiles() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Heart, 4), Config::default(), 5);
        let cloud = PointCloud::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        orch.adopt_cloud(cloud);

        assert_eq!(orch.render_config().shape, ShapeKind::Custom);
        assert_eq!(
            orch.targets(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn stored_custom_points_survive_a_count_change() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Custom, 2), Config::default(), 6);
        orch.apply_config(small(ShapeKind::Custom, 2), Some(&[9.0, 8.0, 7.0]));
        orch.apply_config(small(ShapeKind::Custom, 3), None);

        assert_eq!(orch.custom_points(), Some(&[9.0, 8.0, 7.0][..]));
        assert_eq!(orch.targets(), &[9.0, 8.0, 7.0, 9.0, 8.0, 7.0, 9.0, 8.0, 7.0]);
    }

    #[test]
    fn tick_moves_particles_toward_targets() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Fireworks, 50), Config::default(), 7);
        let gap = |o: &Orchestrator| -> f32 {
            o.positions()
                .iter()
                .zip(o.targets())
                .map(|(c, t)| (c - t).abs())
                .sum()
        };
        let before = gap(&orch);
        orch.tick(1.0 / 60.0, 0.0, &ControlSignal::absent());
        assert!(gap(&orch) < before);
    }

    #[test]
    fn set_tuning_changes_frame_rotation() {
        let mut orch = Orchestrator::with_seed(small(ShapeKind::Heart, 1), Config::default(), 8);
        orch.set_tuning(Config {
            frame_spin_rate: 0.0,
            ..Config::default()
        });
        assert_eq!(orch.frame(100.0).rotation, Quat::IDENTITY);
        assert_eq!(orch.tuning().frame_spin_rate, 0.0);
    }
}
