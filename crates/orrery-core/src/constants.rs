/// Mean obliquity of the ecliptic at J2000 (degrees)
pub const OBLIQUITY_J2000_DEG: f64 = 23.439281;

/// Astronomical unit in kilometers
pub const AU_KM: f64 = 149_597_870.7;

/// Directions shorter than this before normalization are treated as degenerate
pub const MIN_DIRECTION_NORM: f64 = 1e-12;

/// B-V color index of a sun-like star, used when a catalog row has none
pub const SUN_COLOR_INDEX: f64 = 0.65;

/// Valid B-V domain of the temperature fit
pub const COLOR_INDEX_MIN: f64 = -0.4;
pub const COLOR_INDEX_MAX: f64 = 2.0;

/// Horizons/NAIF identifier of the Sun
pub const SUN_NAIF_ID: &str = "10";
