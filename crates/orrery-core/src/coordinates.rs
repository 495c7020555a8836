use nalgebra::{Matrix3, Vector3};
use serde::{Serialize, Deserialize};
use crate::constants::{MIN_DIRECTION_NORM, OBLIQUITY_J2000_DEG};

/// Cartesian position in the J2000 equatorial frame (unit-free, e.g. parsecs in HYG)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquatorialPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EquatorialPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Rotate into the J2000 ecliptic frame
    pub fn to_ecliptic(&self) -> Vector3<f64> {
        equatorial_to_ecliptic() * Vector3::new(self.x, self.y, self.z)
    }

    /// Unit direction in engine axes, or `None` when the position is (near) zero
    pub fn to_engine_direction(&self) -> Option<EngineDirection> {
        EngineDirection::from_ecliptic(self.to_ecliptic())
    }
}

/// Rotation matrix Rx(-ε) from equatorial to ecliptic J2000
pub fn equatorial_to_ecliptic() -> Matrix3<f64> {
    let eps = OBLIQUITY_J2000_DEG.to_radians();
    let cos_e = eps.cos();
    let sin_e = eps.sin();

    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cos_e, sin_e,
        0.0, -sin_e, cos_e,
    )
}

/// Unit direction in the engine frame: ecliptic axes with Y and Z swapped
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineDirection {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EngineDirection {
    /// Remap ecliptic (x, y, z) to engine (x, z, y) and normalize
    pub fn from_ecliptic(ecl: Vector3<f64>) -> Option<Self> {
        let engine = Vector3::new(ecl.x, ecl.z, ecl.y);
        let len = engine.norm();
        if !len.is_finite() || len < MIN_DIRECTION_NORM {
            return None;
        }
        let unit = engine / len;
        Some(Self { x: unit.x, y: unit.y, z: unit.z })
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Single precision components, as stored in the starfield
    pub fn to_f32(&self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}
