//! Low-precision solar-system positions and spherical conversions.
//!
//! Truncated-series sun and moon positions, good to a fraction of a degree
//! over the next few decades. That is plenty for reporting separations and
//! is all the daemon computes itself; precise pointing astrometry lives in
//! the controller.
//!
//! Angles are radians unless a name says otherwise.

use std::f64::consts::PI;

/// MJD of the J2000.0 epoch (JD 2451545.0).
const J2000_MJD: f64 = 51544.5;

/// An equatorial position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquatorialCoord {
    pub ra: f64,
    pub dec: f64,
}

fn days_since_j2000(mjd: f64) -> f64 {
    mjd - J2000_MJD
}

fn normalize_radians(angle: f64) -> f64 {
    let wrapped = angle % (2.0 * PI);
    if wrapped < 0.0 {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Apparent solar position at `mjd`.
pub fn sun_position(mjd: f64) -> EquatorialCoord {
    let d = days_since_j2000(mjd);
    let mean_longitude = 280.46 + 0.9856474 * d;
    let mean_anomaly = (357.528 + 0.9856003 * d).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.0000004 * d).to_radians();

    let ra = (obliquity.cos() * ecliptic_longitude.sin()).atan2(ecliptic_longitude.cos());
    let dec = (obliquity.sin() * ecliptic_longitude.sin()).asin();
    EquatorialCoord {
        ra: normalize_radians(ra),
        dec,
    }
}

/// Approximate lunar position at `mjd`.
pub fn moon_position(mjd: f64) -> EquatorialCoord {
    let d = days_since_j2000(mjd);
    let mean_longitude = (218.32 + 13.176396 * d).to_radians();
    let mean_anomaly = (134.9 + 13.064993 * d).to_radians();
    let arg_latitude = (93.3 + 13.229350 * d).to_radians();

    let ecliptic_longitude = mean_longitude
        + (6.29_f64).to_radians() * mean_anomaly.sin()
        - (1.27_f64).to_radians() * (2.0 * arg_latitude - mean_anomaly).sin();
    let ecliptic_latitude = (5.13_f64).to_radians() * arg_latitude.sin();
    let obliquity = (23.439_f64).to_radians();

    let ra = (ecliptic_longitude.sin() * obliquity.cos()
        - ecliptic_latitude.tan() * obliquity.sin())
    .atan2(ecliptic_longitude.cos());
    let dec = (ecliptic_latitude.sin() * obliquity.cos()
        + ecliptic_latitude.cos() * obliquity.sin() * ecliptic_longitude.sin())
    .asin();
    EquatorialCoord {
        ra: normalize_radians(ra),
        dec,
    }
}

/// Great-circle separation between two equatorial positions.
pub fn angular_separation(a: EquatorialCoord, b: EquatorialCoord) -> f64 {
    let cos_sep = a.dec.sin() * b.dec.sin()
        + a.dec.cos() * b.dec.cos() * (a.ra - b.ra).cos();
    cos_sep.clamp(-1.0, 1.0).acos()
}

/// Convert a horizon position to (hour angle, declination) at `latitude`.
///
/// Azimuth is measured from north through east, matching talon. The hour
/// angle comes back in (-π, π], negative east of the meridian.
pub fn altaz_to_hadec(alt: f64, az: f64, latitude: f64) -> (f64, f64) {
    let sin_dec = latitude.sin() * alt.sin() + latitude.cos() * alt.cos() * az.cos();
    let dec = sin_dec.clamp(-1.0, 1.0).asin();
    let ha = (-az.sin() * alt.cos())
        .atan2(alt.sin() * latitude.cos() - alt.cos() * latitude.sin() * az.cos());
    (ha, dec)
}
