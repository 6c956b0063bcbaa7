//! Core of the gesture-driven particle shaper.
//!
//! Main components:
//! - [`sampler`] — target point sets for each shape family.
//! - [`control`] — hand-control snapshots and the latest-snapshot mailbox.
//! - [`force`] — gesture force field applied to particle targets.
//! - [`state`] — particle buffers and the per-frame integrator.
//! - [`orchestrator`] — configuration changes and the tick entry point.
//! - [`config`] — tuning constants and the render configuration.
//! - [`cloud`] — externally generated point clouds.
//! - [`error`] — boundary error types.
//! - [`types`] — shared value types.

pub mod cloud;
pub mod config;
pub mod control;
pub mod error;
pub mod force;
pub mod orchestrator;
pub mod sampler;
pub mod state;
pub mod types;

pub use cloud::{JsonFileSource, KeyedSource, PointCloud, ShapeSource};
pub use config::{Config, RenderConfig};
pub use control::{ControlReceiver, ControlSender, ControlSignal, Gesture, mailbox};
pub use error::{ConfigError, SourceError};
pub use orchestrator::{Frame, Orchestrator};
pub use types::{Rgb, ShapeKind};
