//! src/utils/math.rs
//! Geometric primitives used by visibility culling
use glam::{Mat4, Vec3, Vec4};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// The corner furthest along `normal`.
    pub fn positive_vertex(&self, normal: Vec3) -> Vec3 {
        Vec3::new(
            if normal.x >= 0.0 { self.max.x } else { self.min.x },
            if normal.y >= 0.0 { self.max.y } else { self.min.y },
            if normal.z >= 0.0 { self.max.z } else { self.min.z },
        )
    }
}

/// Geometric plane, `normal · p + distance = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    pub fn from_coefficients(coefficients: Vec4) -> Self {
        Self::new(coefficients.truncate(), coefficients.w)
    }

    /// Scales the equation so the normal has unit length. Degenerate planes
    /// are left untouched.
    pub fn normalize(&mut self) {
        let length = self.normal.length();
        if length > 0.0 {
            self.normal /= length;
            self.distance /= length;
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::ZERO,
            distance: 0.0,
        }
    }
}

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;
pub const BOTTOM: usize = 2;
pub const TOP: usize = 3;
pub const NEAR: usize = 4;
pub const FAR: usize = 5;

/// View frustum for culling
#[derive(Debug, Clone)]
pub struct ViewFrustum {
    pub planes: [Plane; 6],
}

impl ViewFrustum {
    pub fn new() -> Self {
        Self {
            planes: [Plane::default(); 6],
        }
    }

    /// Gribb–Hartmann extraction from a combined `projection * view` matrix
    /// with GL clip conventions (`-w <= z <= w`). Planes point inwards and
    /// are normalized, so signed distances are in world units.
    pub fn from_view_projection(m: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        let mut planes = [Plane::default(); 6];
        planes[LEFT] = Plane::from_coefficients(r3 + r0);
        planes[RIGHT] = Plane::from_coefficients(r3 - r0);
        planes[BOTTOM] = Plane::from_coefficients(r3 + r1);
        planes[TOP] = Plane::from_coefficients(r3 - r1);
        planes[NEAR] = Plane::from_coefficients(r3 + r2);
        planes[FAR] = Plane::from_coefficients(r3 - r2);
        for plane in &mut planes {
            plane.normalize();
        }
        Self { planes }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }

    /// Conservative: false only when the box lies entirely behind some plane.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(aabb.positive_vertex(plane.normal)) >= 0.0)
    }
}

impl Default for ViewFrustum {
    fn default() -> Self {
        Self::new()
    }
}
