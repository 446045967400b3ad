use crate::{error::Error, pose::Landmark};
use std::ops::{Add, Mul, Sub};

/// Which landmark coordinates take part in angle computation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Projection {
    /// The image plane only. Reference profiles are tuned against this.
    Image,
    /// Include detector depth; a landmark without depth sits at z = 0.
    Depth,
}

impl Default for Projection {
    fn default() -> Self {
        Self::Image
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Vector {
    x: f64,
    y: f64,
    z: f64,
}

impl Vector {
    pub(crate) fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn from_landmark(landmark: Landmark, projection: Projection) -> Self {
        let z = match projection {
            Projection::Image => 0.0,
            Projection::Depth => landmark.z().map(f64::from).unwrap_or(0.0),
        };
        Self::new(f64::from(landmark.x()), f64::from(landmark.y()), z)
    }

    #[inline]
    pub(crate) fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub(crate) fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::Output {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

/// Angle in degrees between the segments `a -> b` and `b -> c`.
///
/// Both segments point along the limb chain (`b - a`, then `c - b`), so three
/// points continuing in a straight line give 0 and a limb folded back on
/// itself gives 180. The pose profiles are tuned against this convention.
pub(crate) fn angle_between(a: Vector, b: Vector, c: Vector) -> Result<f64, Error> {
    let ab = b - a;
    let bc = c - b;

    let ab_norm = ab.norm();
    if ab_norm == 0.0 {
        return Err(Error::DegenerateGeometry("ab"));
    }
    let bc_norm = bc.norm();
    if bc_norm == 0.0 {
        return Err(Error::DegenerateGeometry("bc"));
    }

    let cosine = (ab.dot(bc) / (ab_norm * bc_norm)).clamp(-1.0, 1.0);
    Ok(cosine.acos().to_degrees())
}

/// [`angle_between`] rounded to the nearest whole degree.
pub(crate) fn calculate_angle(a: Vector, b: Vector, c: Vector) -> Result<u16, Error> {
    // acos lands in [0, pi], so the rounded value always fits
    Ok(angle_between(a, b, c)?.round() as u16)
}
