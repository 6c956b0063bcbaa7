//! Error types raised at the boundaries of the core.
//!
//! Nothing inside the tick loop can fail. Errors only come from validating
//! user-facing configuration ([`ConfigError`]) and from the external
//! shape-generation collaborator ([`SourceError`]).

use thiserror::Error;

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A simulation needs at least one particle.
    #[error("particle count must be positive")]
    ZeroCount,

    /// Particle size must be a positive, finite real.
    #[error("invalid particle size {0}")]
    InvalidSize(f32),

    /// The shape tag does not name a known family.
    #[error("unknown shape `{0}`")]
    UnknownShape(String),

    /// A tuning constant is out of its range.
    #[error("tuning value `{field}` = {value} is out of range")]
    InvalidTuning { field: &'static str, value: f32 },

    /// The colour is not a `#rrggbb` string.
    #[error("invalid color `{0}`, expected #rrggbb")]
    InvalidColor(String),
}

/// Failures of a point-cloud generator.
///
/// A failed request never touches the running simulation; callers surface
/// the error and keep rendering the last applied configuration.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The generator needs a credential that is not configured.
    #[error("credential `{0}` is missing")]
    MissingCredential(String),

    /// Reading the payload failed.
    #[error("failed to read point cloud: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is not valid JSON.
    #[error("malformed point cloud payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload has no `points` array.
    #[error("payload has no `points` array")]
    MissingPoints,

    /// The `points` array is empty.
    #[error("point cloud is empty")]
    Empty,

    /// The coordinate count is not a multiple of three.
    #[error("point cloud has {0} coordinates, not a multiple of 3")]
    NotTriples(usize),

    /// An entry of `points` is not a number.
    #[error("coordinate {0} is not a number")]
    NotANumber(usize),

    /// A coordinate is NaN or infinite.
    #[error("coordinate {0} is not finite")]
    NonFinite(usize),
}
