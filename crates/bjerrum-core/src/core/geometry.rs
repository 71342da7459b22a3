use crate::core::models::particle::Particle;
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use rand::Rng;
use thiserror::Error;
use std::f64::consts::PI;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Geometry dimension '{name}' must be strictly positive, got {value}")]
    NonPositiveDimension { name: &'static str, value: f64 },
}

/// What a collision test checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// Hard container walls (spherical wall, box faces, cylinder mantle).
    Boundary,
    /// A forbidden sub-region: for a sliced cuboid, positions outside the
    /// configured slice collide.
    Zone,
}

/// Axis-aligned slice constraining part of a cuboid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

/// Spherical cell surrounded by a hard wall; no periodicity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    radius: f64,
    radius_squared: f64,
}

impl Sphere {
    pub fn new(radius: f64) -> Result<Self, GeometryError> {
        if radius <= 0.0 {
            return Err(GeometryError::NonPositiveDimension {
                name: "radius",
                value: radius,
            });
        }
        Ok(Self {
            radius,
            radius_squared: radius * radius,
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius_squared * self.radius
    }

    fn set_volume(&mut self, volume: f64) {
        self.radius = (3.0 * volume / (4.0 * PI)).cbrt();
        self.radius_squared = self.radius * self.radius;
    }
}

/// Rectangular cell with periodic boundaries in all three directions and an
/// optional slice sub-region.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    len: Vector3<f64>,
    len_half: Vector3<f64>,
    len_inv: Vector3<f64>,
    slice: Option<Slice>,
}

impl Cuboid {
    pub fn new(len: Vector3<f64>) -> Result<Self, GeometryError> {
        for (value, name) in [(len.x, "len.x"), (len.y, "len.y"), (len.z, "len.z")] {
            if value <= 0.0 {
                return Err(GeometryError::NonPositiveDimension { name, value });
            }
        }
        Ok(Self {
            len,
            len_half: len / 2.0,
            len_inv: Vector3::new(1.0 / len.x, 1.0 / len.y, 1.0 / len.z),
            slice: None,
        })
    }

    pub fn cubic(side: f64) -> Result<Self, GeometryError> {
        Self::new(Vector3::new(side, side, side))
    }

    pub fn with_slice(mut self, slice: Slice) -> Self {
        self.slice = Some(slice);
        self
    }

    pub fn len(&self) -> Vector3<f64> {
        self.len
    }

    fn set_len(&mut self, len: Vector3<f64>) {
        self.len = len;
        self.len_half = len / 2.0;
        self.len_inv = Vector3::new(1.0 / len.x, 1.0 / len.y, 1.0 / len.z);
    }

    fn volume(&self) -> f64 {
        self.len.x * self.len.y * self.len.z
    }

    fn set_volume(&mut self, volume: f64) {
        let factor = (volume / self.volume()).cbrt();
        self.set_len(self.len * factor);
    }

    fn outside_slice(&self, p: &Point3<f64>) -> bool {
        match &self.slice {
            Some(slice) => {
                p.x < slice.min.x
                    || p.y < slice.min.y
                    || p.z < slice.min.z
                    || p.x > slice.max.x
                    || p.y > slice.max.y
                    || p.z > slice.max.z
            }
            None => false,
        }
    }
}

/// Cuboid that is periodic in x and y but has hard walls in z.
#[derive(Debug, Clone, PartialEq)]
pub struct CuboidSlit {
    len: Vector3<f64>,
    len_half: Vector3<f64>,
    len_inv: Vector3<f64>,
}

impl CuboidSlit {
    pub fn new(len: Vector3<f64>) -> Result<Self, GeometryError> {
        let inner = Cuboid::new(len)?;
        Ok(Self {
            len: inner.len,
            len_half: inner.len_half,
            len_inv: inner.len_inv,
        })
    }

    pub fn len(&self) -> Vector3<f64> {
        self.len
    }

    fn volume(&self) -> f64 {
        self.len.x * self.len.y * self.len.z
    }

    fn set_volume(&mut self, volume: f64) {
        let factor = (volume / self.volume()).cbrt();
        self.len *= factor;
        self.len_half = self.len / 2.0;
        self.len_inv = Vector3::new(1.0 / self.len.x, 1.0 / self.len.y, 1.0 / self.len.z);
    }
}

/// Cylinder with hard walls, finite length, origin in the middle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    length: f64,
    half_length: f64,
    radius: f64,
    radius_squared: f64,
}

impl Cylinder {
    pub fn new(length: f64, radius: f64) -> Result<Self, GeometryError> {
        if length <= 0.0 {
            return Err(GeometryError::NonPositiveDimension {
                name: "length",
                value: length,
            });
        }
        if radius <= 0.0 {
            return Err(GeometryError::NonPositiveDimension {
                name: "radius",
                value: radius,
            });
        }
        Ok(Self {
            length,
            half_length: length / 2.0,
            radius,
            radius_squared: radius * radius,
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    fn volume(&self) -> f64 {
        PI * self.radius_squared * self.length
    }

    fn set_volume(&mut self, volume: f64) {
        // Volume changes preserve the radius and stretch the axis.
        self.length = volume / (PI * self.radius_squared);
        self.half_length = self.length / 2.0;
    }
}

/// Simulation cell: boundary condition plus distance metric.
///
/// A closed set of container shapes. All distance computation, boundary
/// wrapping and volume scaling goes through this enum so there is a single
/// source of truth for the active boundary condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere(Sphere),
    Cuboid(Cuboid),
    CuboidSlit(CuboidSlit),
    Cylinder(Cylinder),
}

#[inline]
fn wrap_component(x: &mut f64, len: f64, len_half: f64, len_inv: f64) {
    if x.abs() > len_half {
        *x -= len * (*x * len_inv).round();
    }
}

#[inline]
fn minimum_image(mut d: f64, len: f64, len_half: f64) -> f64 {
    if d > len_half {
        d -= len;
    } else if d < -len_half {
        d += len;
    }
    d
}

impl Geometry {
    /// Squared distance between two points under the active boundary
    /// condition. Periodic axes use the minimum-image convention.
    pub fn sqdist(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        match self {
            Geometry::Sphere(_) | Geometry::Cylinder(_) => (a - b).norm_squared(),
            Geometry::Cuboid(c) => {
                let mut dx = (a.x - b.x).abs();
                let mut dy = (a.y - b.y).abs();
                let mut dz = (a.z - b.z).abs();
                if dx > c.len_half.x {
                    dx -= c.len.x;
                }
                if dy > c.len_half.y {
                    dy -= c.len.y;
                }
                if dz > c.len_half.z {
                    dz -= c.len.z;
                }
                dx * dx + dy * dy + dz * dz
            }
            Geometry::CuboidSlit(c) => {
                let mut dx = (a.x - b.x).abs();
                let mut dy = (a.y - b.y).abs();
                let dz = a.z - b.z;
                if dx > c.len_half.x {
                    dx -= c.len.x;
                }
                if dy > c.len_half.y {
                    dy -= c.len.y;
                }
                dx * dx + dy * dy + dz * dz
            }
        }
    }

    /// Distance between two points under the active boundary condition.
    pub fn dist(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.sqdist(a, b).sqrt()
    }

    /// Minimum-image displacement vector `a - b`.
    pub fn vdist(&self, a: &Point3<f64>, b: &Point3<f64>) -> Vector3<f64> {
        let mut r = a - b;
        match self {
            Geometry::Sphere(_) | Geometry::Cylinder(_) => r,
            Geometry::Cuboid(c) => {
                r.x = minimum_image(r.x, c.len.x, c.len_half.x);
                r.y = minimum_image(r.y, c.len.y, c.len_half.y);
                r.z = minimum_image(r.z, c.len.z, c.len_half.z);
                r
            }
            Geometry::CuboidSlit(c) => {
                r.x = minimum_image(r.x, c.len.x, c.len_half.x);
                r.y = minimum_image(r.y, c.len.y, c.len_half.y);
                r
            }
        }
    }

    /// Wraps a point back into the primary cell along periodic axes.
    pub fn boundary(&self, p: &mut Point3<f64>) {
        match self {
            Geometry::Sphere(_) | Geometry::Cylinder(_) => {}
            Geometry::Cuboid(c) => {
                wrap_component(&mut p.x, c.len.x, c.len_half.x, c.len_inv.x);
                wrap_component(&mut p.y, c.len.y, c.len_half.y, c.len_inv.y);
                wrap_component(&mut p.z, c.len.z, c.len_half.z, c.len_inv.z);
            }
            Geometry::CuboidSlit(c) => {
                wrap_component(&mut p.x, c.len.x, c.len_half.x, c.len_inv.x);
                wrap_component(&mut p.y, c.len.y, c.len_half.y, c.len_inv.y);
            }
        }
    }

    /// Tests a particle against hard walls or the forbidden zone.
    pub fn collision(&self, particle: &Particle, kind: CollisionKind) -> bool {
        let p = &particle.position;
        match (self, kind) {
            (Geometry::Sphere(s), CollisionKind::Boundary) => {
                p.coords.norm_squared() > s.radius_squared
            }
            (Geometry::Sphere(_), CollisionKind::Zone) => false,
            (Geometry::Cuboid(c), CollisionKind::Boundary) => {
                p.x.abs() > c.len_half.x || p.y.abs() > c.len_half.y || p.z.abs() > c.len_half.z
            }
            (Geometry::Cuboid(c), CollisionKind::Zone) => c.outside_slice(p),
            (Geometry::CuboidSlit(c), CollisionKind::Boundary) => p.z.abs() > c.len_half.z,
            (Geometry::CuboidSlit(_), CollisionKind::Zone) => false,
            (Geometry::Cylinder(c), CollisionKind::Boundary) => {
                p.x * p.x + p.y * p.y > c.radius_squared || p.z.abs() > c.half_length
            }
            (Geometry::Cylinder(_), CollisionKind::Zone) => false,
        }
    }

    /// Uniformly distributed random point inside the container.
    pub fn random_position(&self, rng: &mut impl Rng) -> Point3<f64> {
        match self {
            Geometry::Sphere(s) => loop {
                let p = Point3::new(
                    rng.gen_range(-s.radius..s.radius),
                    rng.gen_range(-s.radius..s.radius),
                    rng.gen_range(-s.radius..s.radius),
                );
                if p.coords.norm_squared() < s.radius_squared {
                    return p;
                }
            },
            Geometry::Cuboid(c) => Point3::new(
                rng.gen_range(-c.len_half.x..c.len_half.x),
                rng.gen_range(-c.len_half.y..c.len_half.y),
                rng.gen_range(-c.len_half.z..c.len_half.z),
            ),
            Geometry::CuboidSlit(c) => Point3::new(
                rng.gen_range(-c.len_half.x..c.len_half.x),
                rng.gen_range(-c.len_half.y..c.len_half.y),
                rng.gen_range(-c.len_half.z..c.len_half.z),
            ),
            Geometry::Cylinder(c) => loop {
                let x = rng.gen_range(-c.radius..c.radius);
                let y = rng.gen_range(-c.radius..c.radius);
                if x * x + y * y < c.radius_squared {
                    let z = rng.gen_range(-c.half_length..c.half_length);
                    return Point3::new(x, y, z);
                }
            },
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            Geometry::Sphere(s) => s.volume(),
            Geometry::Cuboid(c) => c.volume(),
            Geometry::CuboidSlit(c) => c.volume(),
            Geometry::Cylinder(c) => c.volume(),
        }
    }

    /// Sets a new volume, recomputing the shape's derived constants.
    pub fn set_volume(&mut self, volume: f64) {
        match self {
            Geometry::Sphere(s) => s.set_volume(volume),
            Geometry::Cuboid(c) => c.set_volume(volume),
            Geometry::CuboidSlit(c) => c.set_volume(volume),
            Geometry::Cylinder(c) => c.set_volume(volume),
        }
    }

    /// Rescales a point for a volume change from `old_volume` to
    /// `new_volume`, keeping fractional coordinates invariant.
    pub fn scale_position(
        &self,
        p: &Point3<f64>,
        old_volume: f64,
        new_volume: f64,
    ) -> Point3<f64> {
        let factor = (new_volume / old_volume).cbrt();
        Point3::from(p.coords * factor)
    }
}

/// Rotation about an arbitrary axis through an arbitrary origin.
///
/// The axis is built from two boundary-aware reference points via the
/// minimum-image displacement; the rotated point is wrapped back into the
/// cell. The rotated distance itself is not boundary-corrected.
#[derive(Debug, Clone)]
pub struct AxisRotation {
    origin: Point3<f64>,
    rotation: Rotation3<f64>,
}

impl AxisRotation {
    /// Sets up a rotation by `angle` radians about the axis from `origin`
    /// towards `axis_end`.
    pub fn new(
        geometry: &Geometry,
        origin: Point3<f64>,
        axis_end: Point3<f64>,
        angle: f64,
    ) -> Self {
        let axis = geometry.vdist(&axis_end, &origin);
        debug_assert!(axis.norm_squared() > 0.0, "rotation axis must have finite length");
        Self {
            origin,
            rotation: Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle),
        }
    }

    /// Rotates a point about the configured axis and wraps it into the cell.
    pub fn rotate(&self, geometry: &Geometry, point: Point3<f64>) -> Point3<f64> {
        let mut rotated = self.origin + self.rotation * (point - self.origin);
        geometry.boundary(&mut rotated);
        rotated
    }
}
