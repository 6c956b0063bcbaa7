//! Target point generation for every shape family.
//!
//! Each procedural point is drawn independently from the caller's RNG, so a
//! family sampler is a pure function of the random stream. The custom path is
//! a deterministic cyclic copy of the supplied coordinates.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::Rng;

use crate::types::ShapeKind;

/// Uniform scale applied to the raw heart surface.
pub const HEART_SCALE: f32 = 0.15;
/// Petal count of the rose curve.
pub const FLOWER_PETALS: f32 = 5.0;
/// Share of Saturn points placed on the ring.
pub const SATURN_RING_SHARE: f64 = 0.6;
pub const SATURN_RING_INNER: f32 = 2.5;
pub const SATURN_RING_OUTER: f32 = 4.0;
/// Half-thickness of the ring.
pub const SATURN_RING_JITTER: f32 = 0.05;
pub const SATURN_PLANET_RADIUS: f32 = 1.5;
pub const FIREWORKS_RADIUS: f32 = 3.0;

/// Builds the target buffer for `shape`.
///
/// For [`ShapeKind::Custom`] the supplied coordinates are tiled cyclically.
/// An absent, empty or malformed custom list (length not a multiple of three,
/// or non-finite values) falls back to [`ShapeKind::Fireworks`]; this never
/// fails.
///
/// ### Parameters
/// - `shape` - Family to sample.
/// - `count` - Number of particles.
/// - `custom` - Flat `[x0, y0, z0, x1, ...]` list, used only for `Custom`.
/// - `rejection_attempts` - Cap on the Buddha rejection loop.
/// - `rng` - Random source.
///
/// ### Returns
/// Exactly `count` points.
pub fn sample(
    shape: ShapeKind,
    count: usize,
    custom: Option<&[f32]>,
    rejection_attempts: u32,
    rng: &mut impl Rng,
) -> Vec<Vec3> {
    let family = match shape {
        ShapeKind::Custom => match custom {
            Some(points) if is_well_formed(points) => return tile_custom(points, count),
            Some(points) => {
                log::warn!(
                    "custom point list unusable ({} values), falling back to {}",
                    points.len(),
                    ShapeKind::Fireworks
                );
                ShapeKind::Fireworks
            }
            None => {
                log::warn!("custom shape without points, falling back to {}", ShapeKind::Fireworks);
                ShapeKind::Fireworks
            }
        },
        other => other,
    };

    let mut capped = 0usize;
    let points: Vec<Vec3> = (0..count)
        .map(|_| match family {
            ShapeKind::Heart => heart_point(rng),
            ShapeKind::Flower => flower_point(rng),
            ShapeKind::Saturn => saturn_point(count, rng),
            ShapeKind::Buddha => {
                let (p, accepted) = buddha_point(rejection_attempts, rng);
                if !accepted {
                    capped += 1;
                }
                p
            }
            ShapeKind::Fireworks | ShapeKind::Custom => fireworks_point(rng),
        })
        .collect();

    if capped > 0 {
        log::warn!("{capped} buddha points hit the rejection cap and were centred");
    }
    points
}

/// A custom list is usable when it holds at least one whole, finite point.
pub fn is_well_formed(points: &[f32]) -> bool {
    !points.is_empty() && points.len() % 3 == 0 && points.iter().all(|v| v.is_finite())
}

/// Repeats the source points until `count` are produced:
/// `out[i] = source[i mod source_len]`.
///
/// ### Panics
/// Panics if `points` holds no whole point; callers check
/// [`is_well_formed`] first.
pub fn tile_custom(points: &[f32], count: usize) -> Vec<Vec3> {
    let source: Vec<Vec3> = points.chunks_exact(3).map(Vec3::from_slice).collect();
    assert!(!source.is_empty(), "custom point list has no whole point");
    source.iter().copied().cycle().take(count).collect()
}

/// Parametric heart surface swept around the vertical axis.
pub fn heart_point(rng: &mut impl Rng) -> Vec3 {
    let phi = rng.random::<f32>() * TAU;
    let theta = rng.random::<f32>() * PI;
    let ring = 16.0 * theta.sin().powi(3);
    let y = 13.0 * theta.cos()
        - 5.0 * (2.0 * theta).cos()
        - 2.0 * (3.0 * theta).cos()
        - (4.0 * theta).cos();
    Vec3::new(ring * phi.sin(), y, ring * phi.cos()) * HEART_SCALE
}

/// Rose curve in the horizontal plane with vertical thickness jitter.
pub fn flower_point(rng: &mut impl Rng) -> Vec3 {
    let t = rng.random::<f32>() * TAU;
    let u = rng.random::<f32>() * TAU;
    let r = (FLOWER_PETALS * t).cos() * u.sin() * 2.0;
    let thickness = u.cos() * 2.0 * (rng.random::<f32>() - 0.5);
    Vec3::new(r * t.cos(), thickness, r * t.sin())
}

/// Ring point with probability [`SATURN_RING_SHARE`], otherwise a point on
/// the planet sphere.
///
/// Planet points use inverse-cosine polar sampling with the azimuth wound
/// along a spiral whose pitch depends on `count`.
pub fn saturn_point(count: usize, rng: &mut impl Rng) -> Vec3 {
    if rng.random_bool(SATURN_RING_SHARE) {
        let angle = rng.random::<f32>() * TAU;
        let radius = rng.random_range(SATURN_RING_INNER..=SATURN_RING_OUTER);
        let y = (rng.random::<f32>() - 0.5) * 2.0 * SATURN_RING_JITTER;
        Vec3::new(radius * angle.cos(), y, radius * angle.sin())
    } else {
        let polar = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
        let azimuth = (count as f32 * PI).sqrt() * polar;
        Vec3::new(
            azimuth.cos() * polar.sin(),
            azimuth.sin() * polar.sin(),
            polar.cos(),
        ) * SATURN_PLANET_RADIUS
    }
}

/// Uniform point in the solid ball of radius [`FIREWORKS_RADIUS`].
pub fn fireworks_point(rng: &mut impl Rng) -> Vec3 {
    let radius = FIREWORKS_RADIUS * rng.random::<f32>().cbrt();
    let azimuth = rng.random::<f32>() * TAU;
    let polar = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    Vec3::new(
        polar.sin() * azimuth.cos(),
        polar.sin() * azimuth.sin(),
        polar.cos(),
    ) * radius
}

/// One of the three stacked bodies making up the seated figure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuddhaRegion {
    Legs,
    Torso,
    Head,
}

impl BuddhaRegion {
    pub const ALL: [BuddhaRegion; 3] = [BuddhaRegion::Legs, BuddhaRegion::Torso, BuddhaRegion::Head];

    /// Mixture weight of the region.
    pub fn share(self) -> f32 {
        match self {
            BuddhaRegion::Legs => 0.4,
            BuddhaRegion::Torso | BuddhaRegion::Head => 0.3,
        }
    }

    /// Half extents of the candidate box, in region-local coordinates.
    pub fn half_extents(self) -> Vec3 {
        match self {
            BuddhaRegion::Legs => Vec3::new(2.0, 0.75, 1.25),
            BuddhaRegion::Torso => Vec3::new(1.0, 1.25, 0.75),
            BuddhaRegion::Head => Vec3::new(0.6, 0.7, 0.6),
        }
    }

    /// Vertical offset of the region centre.
    pub fn offset(self) -> Vec3 {
        match self {
            BuddhaRegion::Legs => Vec3::new(0.0, -1.5, 0.0),
            BuddhaRegion::Torso => Vec3::new(0.0, 0.5, 0.0),
            BuddhaRegion::Head => Vec3::new(0.0, 2.2, 0.0),
        }
    }

    /// Defining quadric, evaluated on a region-local point.
    #[inline]
    pub fn contains_local(self, p: Vec3) -> bool {
        match self {
            BuddhaRegion::Legs => p.x * p.x / 4.0 + p.y * p.y / 0.5 + p.z * p.z / 1.5 < 1.0,
            BuddhaRegion::Torso => p.length_squared() < 1.2,
            BuddhaRegion::Head => p.length_squared() < 0.5,
        }
    }

    /// Defining quadric, evaluated on a world-space point.
    #[inline]
    pub fn contains(self, p: Vec3) -> bool {
        self.contains_local(p - self.offset())
    }

    fn pick(rng: &mut impl Rng) -> Self {
        let u = rng.random::<f32>();
        if u < BuddhaRegion::Legs.share() {
            BuddhaRegion::Legs
        } else if u < BuddhaRegion::Legs.share() + BuddhaRegion::Torso.share() {
            BuddhaRegion::Torso
        } else {
            BuddhaRegion::Head
        }
    }

    /// Rejection-samples a world-space point inside this region.
    ///
    /// ### Returns
    /// The point and whether it was accepted within `max_attempts`; on
    /// exhaustion the region centre is returned.
    pub fn sample(self, max_attempts: u32, rng: &mut impl Rng) -> (Vec3, bool) {
        let half = self.half_extents();
        for _ in 0..max_attempts {
            let local = Vec3::new(
                rng.random_range(-half.x..=half.x),
                rng.random_range(-half.y..=half.y),
                rng.random_range(-half.z..=half.z),
            );
            if self.contains_local(local) {
                return (local + self.offset(), true);
            }
        }
        (self.offset(), false)
    }
}

/// Seated figure: legs 40 %, torso 30 %, head 30 %.
///
/// The region is chosen once per point and the rejection loop retries only
/// inside it, so the mixture weights hold exactly.
pub fn buddha_point(max_attempts: u32, rng: &mut impl Rng) -> (Vec3, bool) {
    BuddhaRegion::pick(rng).sample(max_attempts, rng)
}
