//! Externally supplied point clouds and the shape-generation seam.
//!
//! A text-to-shape service answers with a JSON object
//! `{ "points": [x1, y1, z1, x2, ...] }`. [`PointCloud::from_payload`]
//! validates such a payload into a [`PointCloud`], which is then safe to hand
//! to [`crate::orchestrator::Orchestrator::adopt_cloud`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::SourceError;

/// A non-empty, finite, whole-point coordinate list.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    coords: Vec<f32>,
}

impl PointCloud {
    /// Validates a flat coordinate list.
    pub fn new(coords: Vec<f32>) -> Result<Self, SourceError> {
        if coords.is_empty() {
            return Err(SourceError::Empty);
        }
        if coords.len() % 3 != 0 {
            return Err(SourceError::NotTriples(coords.len()));
        }
        if let Some(i) = coords.iter().position(|v| !v.is_finite()) {
            return Err(SourceError::NonFinite(i));
        }
        Ok(Self { coords })
    }

    /// Parses a generator response.
    pub fn from_payload(json: &str) -> Result<Self, SourceError> {
        #[derive(Deserialize)]
        struct Payload {
            points: Option<Value>,
        }

        let payload: Payload = serde_json::from_str(json)?;
        let Some(Value::Array(items)) = payload.points else {
            return Err(SourceError::MissingPoints);
        };

        let coords = items
            .iter()
            .enumerate()
            .map(|(i, v)| v.as_f64().map(|x| x as f32).ok_or(SourceError::NotANumber(i)))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(coords)
    }

    /// Number of whole points.
    pub fn len(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coords
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.coords
    }
}

/// Anything that turns a free-text description into a point cloud.
///
/// Implementations may block; callers run them off the tick thread and hand
/// the result back between frames. Failures are returned, never retried.
pub trait ShapeSource {
    fn generate(&self, description: &str) -> Result<PointCloud, SourceError>;
}

/// Serves a stored generator payload from disk, ignoring the description.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShapeSource for JsonFileSource {
    fn generate(&self, description: &str) -> Result<PointCloud, SourceError> {
        log::debug!("loading point cloud for {description:?} from {}", self.path.display());
        let json = fs::read_to_string(&self.path)?;
        PointCloud::from_payload(&json)
    }
}

/// Gates another source behind an access key, the way a hosted generator
/// refuses requests without one.
///
/// The key is resolved once, at construction. Requests made without it fail
/// with [`SourceError::MissingCredential`] and never reach the inner source.
#[derive(Clone, Debug)]
pub struct KeyedSource<S> {
    var: String,
    key: Option<String>,
    inner: S,
}

impl<S: ShapeSource> KeyedSource<S> {
    /// Wraps `inner` with an explicit key; an empty key counts as missing.
    pub fn new(var: impl Into<String>, key: Option<String>, inner: S) -> Self {
        Self {
            var: var.into(),
            key: key.filter(|k| !k.trim().is_empty()),
            inner,
        }
    }

    /// Reads the key from the environment variable `var`.
    pub fn from_env(var: impl Into<String>, inner: S) -> Self {
        let var = var.into();
        let key = std::env::var(&var).ok();
        Self::new(var, key, inner)
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }
}

impl<S: ShapeSource> ShapeSource for KeyedSource<S> {
    fn generate(&self, description: &str) -> Result<PointCloud, SourceError> {
        if self.key.is_none() {
            return Err(SourceError::MissingCredential(self.var.clone()));
        }
        self.inner.generate(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_with_whole_points_parses() {
        let cloud = PointCloud::from_payload(r#"{ "points": [1, 2, 3, -4.5, 0, 6] }"#).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.as_slice(), &[1.0, 2.0, 3.0, -4.5, 0.0, 6.0]);
    }

    #[test]
    fn payload_that_is_not_json_is_malformed() {
        let err = PointCloud::from_payload("points: 1 2 3").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn payload_without_points_array_is_rejected() {
        for json in [r#"{}"#, r#"{ "points": null }"#, r#"{ "points": "1,2,3" }"#] {
            let err = PointCloud::from_payload(json).unwrap_err();
            assert!(matches!(err, SourceError::MissingPoints), "{json}: {err}");
        }
    }

    #[test]
    fn empty_points_array_is_rejected() {
        let err = PointCloud::from_payload(r#"{ "points": [] }"#).unwrap_err();
        assert!(matches!(err, SourceError::Empty));
    }

    #[test]
    fn partial_point_is_rejected() {
        let err = PointCloud::from_payload(r#"{ "points": [1, 2, 3, 4] }"#).unwrap_err();
        assert!(matches!(err, SourceError::NotTriples(4)));
    }

    #[test]
    fn non_numeric_entry_is_rejected() {
        let err = PointCloud::from_payload(r#"{ "points": [1, "two", 3] }"#).unwrap_err();
        assert!(matches!(err, SourceError::NotANumber(1)));
    }

    #[test]
    fn overflowing_coordinate_is_not_finite() {
        let err = PointCloud::from_payload(r#"{ "points": [0, 1e300, 0] }"#).unwrap_err();
        assert!(matches!(err, SourceError::NonFinite(1)));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let source = JsonFileSource::new("/definitely/not/here.json");
        let err = source.generate("a teapot").unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn file_source_reads_payload_from_disk() {
        let path = std::env::temp_dir().join(format!("particle-cloud-{}.json", std::process::id()));
        fs::write(&path, r#"{ "points": [0.5, 0.5, 0.5] }"#).unwrap();

        let cloud = JsonFileSource::new(&path).generate("anything").unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(cloud.into_inner(), vec![0.5, 0.5, 0.5]);
    }

    struct Fixed;

    impl ShapeSource for Fixed {
        fn generate(&self, _description: &str) -> Result<PointCloud, SourceError> {
            PointCloud::new(vec![1.0, 2.0, 3.0])
        }
    }

    #[test]
    fn keyed_source_without_key_reports_missing_credential() {
        for key in [None, Some(String::new()), Some("  ".to_string())] {
            let source = KeyedSource::new("SHAPE_API_KEY", key, Fixed);
            assert!(!source.has_key());
            let err = source.generate("a cat").unwrap_err();
            assert!(
                matches!(&err, SourceError::MissingCredential(var) if var == "SHAPE_API_KEY"),
                "{err}"
            );
        }
    }

    #[test]
    fn keyed_source_with_key_delegates() {
        let source = KeyedSource::new("SHAPE_API_KEY", Some("secret".to_string()), Fixed);
        assert_eq!(source.generate("a cat").unwrap().as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn keyed_source_reads_unset_variable_as_missing() {
        let source = KeyedSource::from_env("PARTICLE_CORE_TEST_UNSET_KEY_4F1C", Fixed);
        assert!(matches!(
            source.generate("x"),
            Err(SourceError::MissingCredential(_))
        ));
    }
}
