use crate::math::Vec3;

/// Axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis so that extending it with the
/// first point yields a zero-volume box at that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    pub fn empty() -> Self {
        Aabb3 {
            min: Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.extend(p);
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, p: Vec3) {
        if !p.is_finite() {
            return;
        }
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }
}

/// Bounding sphere used for camera framing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Sphere centered on the box center, with the radius reaching the
    /// farthest point. Non-finite points are skipped.
    ///
    /// Empty input gives a zero-radius sphere at the origin.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let center = Aabb3::from_points(iter.clone()).center();
        let radius = iter
            .filter(|p| p.is_finite())
            .map(|p| p.distance(center))
            .fold(0.0_f64, f64::max);
        Self { center, radius }
    }

    /// True when the sphere cannot be used to derive a framing distance.
    pub fn is_degenerate(&self) -> bool {
        !self.center.is_finite() || !self.radius.is_finite() || self.radius <= f64::EPSILON
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.distance(self.center) <= self.radius + 1e-9
    }
}
