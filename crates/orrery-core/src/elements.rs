//! Osculating orbital elements as delivered by the ephemeris service

use serde::{Deserialize, Serialize};
use crate::constants::AU_KM;

/// Classical Keplerian elements (angles in degrees)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis (AU)
    pub a_au: f64,
    /// Eccentricity (dimensionless, 0 = circular)
    pub e: f64,
    /// Inclination to the ecliptic (degrees)
    pub i_deg: f64,
    /// Longitude of ascending node (degrees)
    pub omega_big_deg: f64,
    /// Argument of periapsis (degrees)
    pub omega_small_deg: f64,
    /// Mean anomaly at epoch (degrees)
    pub m_deg: f64,
    /// Sidereal orbital period (days)
    pub period_days: f64,
}

impl OrbitalElements {
    /// Semi-major axis in engine distance units
    pub fn semi_major_axis_units(&self, km_per_unit: f64) -> f64 {
        au_to_units(self.a_au, km_per_unit)
    }

    /// Elliptic orbit (hyperbolic and parabolic comets have no meaningful period)
    pub fn is_closed(&self) -> bool {
        self.e < 1.0 && self.a_au > 0.0
    }

    /// All fields are finite numbers
    pub fn is_finite(&self) -> bool {
        [
            self.a_au, self.e, self.i_deg, self.omega_big_deg,
            self.omega_small_deg, self.m_deg, self.period_days,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// AU -> km -> engine units
pub fn au_to_units(au: f64, km_per_unit: f64) -> f64 {
    au * AU_KM / km_per_unit
}

/// km -> engine units
pub fn km_to_units(km: f64, km_per_unit: f64) -> f64 {
    km / km_per_unit
}
