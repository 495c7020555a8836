use crate::constants::*;
use crate::coordinates::*;

#[test]
fn test_vernal_equinox_stays_on_x() {
    let dir = EquatorialPosition::new(1.0, 0.0, 0.0).to_engine_direction().unwrap();
    assert!((dir.x - 1.0).abs() < 1e-12);
    assert!(dir.y.abs() < 1e-12);
    assert!(dir.z.abs() < 1e-12);
}

#[test]
fn test_celestial_pole_maps_to_tilted_engine_up() {
    // Equatorial +Z is tilted by the obliquity away from the ecliptic pole.
    let eps = OBLIQUITY_J2000_DEG.to_radians();
    let dir = EquatorialPosition::new(0.0, 0.0, 1.0).to_engine_direction().unwrap();

    // ecliptic = (0, sin ε, cos ε); engine swaps Y/Z
    assert!(dir.x.abs() < 1e-12);
    assert!((dir.y - eps.cos()).abs() < 1e-12, "engine y = {}", dir.y);
    assert!((dir.z - eps.sin()).abs() < 1e-12, "engine z = {}", dir.z);
}

#[test]
fn test_ecliptic_rotation_preserves_length() {
    let positions = [
        EquatorialPosition::new(3.0, -4.0, 12.0),
        EquatorialPosition::new(-0.2, 0.7, -0.1),
        EquatorialPosition::new(1.3e5, 2.2e4, -9.9e4),
    ];

    for pos in positions {
        let ecl = pos.to_ecliptic();
        let tolerance = pos.magnitude() * 1e-12;
        assert!((ecl.norm() - pos.magnitude()).abs() < tolerance);
    }
}

#[test]
fn test_engine_direction_is_unit_length() {
    // Sweep a lattice of directions on and off the unit sphere
    for ix in -3..=3 {
        for iy in -3..=3 {
            for iz in -3..=3 {
                if ix == 0 && iy == 0 && iz == 0 {
                    continue;
                }
                let pos = EquatorialPosition::new(ix as f64 * 0.7, iy as f64 * 1.9, iz as f64 * 5.3);
                let dir = pos.to_engine_direction().expect("non-zero position");
                assert!((dir.norm() - 1.0).abs() < 1e-12, "|{:?}| = {}", dir, dir.norm());
            }
        }
    }
}

#[test]
fn test_zero_position_is_rejected() {
    assert!(EquatorialPosition::new(0.0, 0.0, 0.0).to_engine_direction().is_none());
    assert!(EquatorialPosition::new(1e-14, 0.0, -1e-14).to_engine_direction().is_none());
}

#[test]
fn test_non_finite_position_is_rejected() {
    assert!(EquatorialPosition::new(f64::NAN, 1.0, 0.0).to_engine_direction().is_none());
    assert!(EquatorialPosition::new(f64::INFINITY, 0.0, 0.0).to_engine_direction().is_none());
}

#[test]
fn test_single_precision_direction() {
    let dir = EquatorialPosition::new(0.0, 3.0, 4.0).to_engine_direction().unwrap();
    let [x, y, z] = dir.to_f32();
    let len = (x * x + y * y + z * z).sqrt();
    assert!((len - 1.0).abs() < 1e-6);
}
