//! Star display color from a B-V color index
//!
//! B-V is turned into an effective temperature (Ballesteros 2012), and the
//! temperature into 8-bit RGB with Tanner Helland's blackbody fit.

use crate::constants::{COLOR_INDEX_MAX, COLOR_INDEX_MIN, SUN_COLOR_INDEX};

/// Alpha byte of every packed star color
pub const OPAQUE_ALPHA: u32 = 0xFF;

/// Effective temperature (K) for a B-V color index
pub fn bv_to_kelvin(bv: f64) -> f64 {
    let t1 = 1.0 / (0.92 * bv + 1.7);
    let t2 = 1.0 / (0.92 * bv + 0.62);
    4600.0 * (t1 + t2)
}

/// Blackbody temperature to 8-bit RGB (Tanner Helland algorithm)
pub fn kelvin_to_rgb(kelvin: f64) -> [u8; 3] {
    let temp = kelvin.clamp(1000.0, 40000.0) / 100.0;

    let r = if temp <= 66.0 {
        255.0
    } else {
        329.698727446 * (temp - 60.0).powf(-0.1332047592)
    };

    let g = if temp <= 66.0 {
        99.4708025861 * temp.ln() - 161.1195681661
    } else {
        288.1221695283 * (temp - 60.0).powf(-0.0755148492)
    };

    let b = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.5177312231 * (temp - 10.0).ln() - 305.0447927307
    };

    [channel(r), channel(g), channel(b)]
}

// Truncates like an integer cast after clamping.
fn channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Clamp a color index into the fit's domain, substituting a sun-like value when absent
pub fn effective_color_index(bv: Option<f64>) -> f64 {
    bv.unwrap_or(SUN_COLOR_INDEX).clamp(COLOR_INDEX_MIN, COLOR_INDEX_MAX)
}

/// Full star color pipeline: optional B-V to packed ARGB
pub fn color_index_to_argb(bv: Option<f64>) -> u32 {
    let rgb = kelvin_to_rgb(bv_to_kelvin(effective_color_index(bv)));
    pack_argb(rgb)
}

/// Pack RGB as 0xAARRGGBB with an opaque alpha
pub fn pack_argb([r, g, b]: [u8; 3]) -> u32 {
    (OPAQUE_ALPHA << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Split 0xAARRGGBB into (alpha, [r, g, b])
pub fn unpack_argb(argb: u32) -> (u8, [u8; 3]) {
    let a = (argb >> 24) as u8;
    let r = (argb >> 16) as u8;
    let g = (argb >> 8) as u8;
    let b = argb as u8;
    (a, [r, g, b])
}
