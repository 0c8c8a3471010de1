use super::error::PropagateError;
use super::types::{OrbitalElements, SatelliteKinematics};
use super::{EARTH_MU_KM3_S2, EARTH_RADIUS_KM};

/// Propagate a circular orbit to `elapsed_seconds` after the mission epoch.
///
/// The in-plane state is rotated by the argument of perigee (about the orbit
/// normal), then the inclination (about the resulting x-axis), then the RAAN
/// (about the inertial z-axis). Changing this order changes the frame.
pub fn propagate(
    elements: &OrbitalElements,
    elapsed_seconds: f64,
) -> Result<SatelliteKinematics, PropagateError> {
    check_inputs(elements, elapsed_seconds)?;

    let a = semi_major_axis_km(elements.alt_km);
    let n = mean_motion_rad_s(a);
    let theta = elements.true_anom_deg_at_epoch.to_radians() + n * elapsed_seconds;

    let cos_theta = theta.cos();
    let sin_theta = theta.sin();
    let position_orb = [a * cos_theta, a * sin_theta, 0.0];
    let velocity_orb = [-a * n * sin_theta, a * n * cos_theta, 0.0];

    let argp = elements.argp_deg.to_radians();
    let inc = elements.inc_deg.to_radians();
    let raan = elements.raan_deg.to_radians();

    Ok(SatelliteKinematics {
        position_km: orbital_to_inertial(position_orb, argp, inc, raan),
        velocity_km_s: orbital_to_inertial(velocity_orb, argp, inc, raan),
        true_anom_deg: theta.to_degrees().rem_euclid(360.0),
    })
}

pub fn semi_major_axis_km(alt_km: f64) -> f64 {
    EARTH_RADIUS_KM + alt_km
}

pub fn mean_motion_rad_s(semi_major_axis_km: f64) -> f64 {
    (EARTH_MU_KM3_S2 / semi_major_axis_km.powi(3)).sqrt()
}

fn check_inputs(elements: &OrbitalElements, elapsed_seconds: f64) -> Result<(), PropagateError> {
    let fields = [
        ("alt_km", elements.alt_km),
        ("inc_deg", elements.inc_deg),
        ("raan_deg", elements.raan_deg),
        ("argp_deg", elements.argp_deg),
        ("true_anom_deg", elements.true_anom_deg_at_epoch),
        ("elapsed_seconds", elapsed_seconds),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(PropagateError::NonFinite(*name));
    }
    if elements.alt_km <= -EARTH_RADIUS_KM {
        return Err(PropagateError::InvalidOrbit {
            alt_km: elements.alt_km,
        });
    }
    Ok(())
}

fn orbital_to_inertial(v: [f64; 3], argp: f64, inc: f64, raan: f64) -> [f64; 3] {
    rotate_z(rotate_x(rotate_z(v, argp), inc), raan)
}

fn rotate_z(v: [f64; 3], angle: f64) -> [f64; 3] {
    let cos_a = angle.cos();
    let sin_a = angle.sin();
    [v[0] * cos_a - v[1] * sin_a, v[0] * sin_a + v[1] * cos_a, v[2]]
}

fn rotate_x(v: [f64; 3], angle: f64) -> [f64; 3] {
    let cos_a = angle.cos();
    let sin_a = angle.sin();
    [v[0], v[1] * cos_a - v[2] * sin_a, v[1] * sin_a + v[2] * cos_a]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn norm([x, y, z]: [f64; 3]) -> f64 {
        (x * x + y * y + z * z).sqrt()
    }

    fn elements(alt_km: f64, inc_deg: f64) -> OrbitalElements {
        OrbitalElements {
            alt_km,
            inc_deg,
            ..OrbitalElements::default()
        }
    }

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn equatorial_leo_after_one_minute() {
        let el = elements(500.0, 0.0);
        let a = semi_major_axis_km(el.alt_km);
        let n = mean_motion_rad_s(a);
        assert!(close(a, 6878.137, 1e-9));
        assert!(close(n, 0.0011067, 1e-6));

        let state = propagate(&el, 60.0).unwrap();
        let theta = n * 60.0;
        assert!(close(theta, 0.0664, 1e-4));
        assert!(close(state.position_km[0], a * theta.cos(), 1e-9));
        assert!(close(state.position_km[1], a * theta.sin(), 1e-9));
        assert_eq!(state.position_km[2], 0.0);
        assert!(close(state.velocity_km_s[0], -a * n * theta.sin(), 1e-12));
        assert!(close(state.velocity_km_s[1], a * n * theta.cos(), 1e-12));
        assert!(close(state.true_anom_deg, theta.to_degrees(), 1e-9));
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let el = OrbitalElements {
            alt_km: 550.0,
            inc_deg: 53.0,
            raan_deg: 120.0,
            argp_deg: 15.0,
            true_anom_deg_at_epoch: 200.0,
        };
        let first = propagate(&el, 12_345.678).unwrap();
        for _ in 0..10 {
            assert_eq!(propagate(&el, 12_345.678).unwrap(), first);
        }
    }

    #[test]
    fn circular_orbit_keeps_radius_and_speed() {
        let el = OrbitalElements {
            alt_km: 800.0,
            inc_deg: 98.0,
            raan_deg: 33.0,
            argp_deg: 70.0,
            true_anom_deg_at_epoch: 10.0,
        };
        let a = semi_major_axis_km(el.alt_km);
        let n = mean_motion_rad_s(a);
        for t in [0.0, 100.0, 2_500.0, 86_400.0] {
            let state = propagate(&el, t).unwrap();
            assert!(close(norm(state.position_km), a, 1e-6));
            assert!(close(norm(state.velocity_km_s), a * n, 1e-9));
        }
    }

    #[test]
    fn polar_orbit_reaches_the_pole_at_quarter_anomaly() {
        let el = OrbitalElements {
            inc_deg: 90.0,
            true_anom_deg_at_epoch: 90.0,
            ..OrbitalElements::default()
        };
        let state = propagate(&el, 0.0).unwrap();
        let a = semi_major_axis_km(el.alt_km);
        assert!(close(state.position_km[0], 0.0, 1e-9));
        assert!(close(state.position_km[1], 0.0, 1e-9));
        assert!(close(state.position_km[2], a, 1e-9));
    }

    #[test]
    fn rotations_apply_perigee_then_inclination_then_node() {
        let el = OrbitalElements {
            alt_km: 500.0,
            inc_deg: 45.0,
            raan_deg: 60.0,
            argp_deg: 30.0,
            true_anom_deg_at_epoch: 0.0,
        };
        let state = propagate(&el, 0.0).unwrap();
        let a = semi_major_axis_km(el.alt_km);
        let (argp, inc, raan) = (30f64.to_radians(), 45f64.to_radians(), 60f64.to_radians());

        let expected = rotate_z(rotate_x(rotate_z([a, 0.0, 0.0], argp), inc), raan);
        let swapped = rotate_z(rotate_x(rotate_z([a, 0.0, 0.0], raan), inc), argp);
        for i in 0..3 {
            assert!(close(state.position_km[i], expected[i], 1e-9));
        }
        assert!((0..3).any(|i| !close(state.position_km[i], swapped[i], 1e-3)));
    }

    #[test]
    fn true_anomaly_wraps_into_one_revolution() {
        let el = OrbitalElements {
            true_anom_deg_at_epoch: 350.0,
            ..OrbitalElements::default()
        };
        let a = semi_major_axis_km(el.alt_km);
        let period = TAU / mean_motion_rad_s(a);
        let state = propagate(&el, period * 3.25).unwrap();
        assert!((0.0..360.0).contains(&state.true_anom_deg));
        assert!(close(state.true_anom_deg, 80.0, 1e-6));
    }

    #[test]
    fn altitude_below_earth_centre_is_rejected() {
        let err = propagate(&elements(-EARTH_RADIUS_KM, 0.0), 0.0).unwrap_err();
        assert_eq!(
            err,
            PropagateError::InvalidOrbit {
                alt_km: -EARTH_RADIUS_KM
            }
        );
        assert!(propagate(&elements(-7000.0, 0.0), 10.0).is_err());
        assert!(propagate(&elements(-6000.0, 0.0), 10.0).is_ok());
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        assert_eq!(
            propagate(&elements(f64::NAN, 0.0), 0.0).unwrap_err(),
            PropagateError::NonFinite("alt_km")
        );
        assert_eq!(
            propagate(&elements(500.0, 0.0), f64::INFINITY).unwrap_err(),
            PropagateError::NonFinite("elapsed_seconds")
        );
    }
}
