//! Linear tangent-plane astrometric solution from WCS header keywords.
//!
//! Supported keywords: `CRVAL1/2`, `CRPIX1/2`, `CDELT1/2`, `CROTA2`,
//! `CD1_1..CD2_2` and `CTYPE1/2`. Only TAN and SIN projections (or none
//! declared) are accepted for equatorial axes; `GLON`/`GLAT` axes take any
//! projection code, are treated as gnomonic and are converted to J2000.

use alloc::string::String;

use crate::error::{Error, Result};
use crate::header::Header;

const DEG: f64 = core::f64::consts::PI / 180.0;

/// Rotation from galactic to J2000 equatorial unit vectors (transpose of the
/// IAU equatorial-to-galactic matrix).
const GALACTIC_TO_J2000: [[f64; 3]; 3] = [
    [-0.054_875_560_4, 0.494_109_427_9, -0.867_666_149_0],
    [-0.873_437_090_2, -0.444_829_630_0, -0.198_076_373_4],
    [-0.483_835_015_5, 0.746_982_244_5, 0.455_983_776_2],
];

/// Sky-to-plane projection named by `CTYPE1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Gnomonic.
    #[default]
    Tan,
    /// Orthographic.
    Sin,
    /// No projection code; treated as gnomonic.
    Unspecified,
}

/// Astrometric calibration of an image.
///
/// `valid` is set only when scale, rotation, reference pixel and sky center
/// were all derived. Callers must check it before using the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WcsSolution {
    /// J2000 right ascension of the reference pixel, degrees.
    pub center_ra_deg: f64,
    /// J2000 declination of the reference pixel, degrees.
    pub center_dec_deg: f64,
    pub scale_x_deg_per_pix: f64,
    pub scale_y_deg_per_pix: f64,
    pub rotation_deg: f64,
    /// Reference pixel, 0-based.
    pub ref_pix_x: f64,
    pub ref_pix_y: f64,
    pub is_galactic: bool,
    /// Axis orientation recovered from a CD matrix. Scales are then stored as
    /// magnitudes; scales taken from `CDELT1/2` carry their own sign instead.
    pub flip_x: bool,
    pub flip_y: bool,
    pub projection: Projection,
    /// `CRVAL1/2` as written, in the native frame (galactic when `is_galactic`).
    pub native_center_deg: (f64, f64),
    pub valid: bool,
}

/// Classify `CTYPE1`/`CTYPE2` into a projection and a galactic flag.
pub fn parse_projection(header: &Header) -> Result<(Projection, bool)> {
    let ctype1 = header.get_str("CTYPE1").unwrap_or_default();
    let ctype2 = header.get_str("CTYPE2").unwrap_or_default();

    let is_galactic = [&ctype1, &ctype2]
        .iter()
        .any(|c| c.contains("GLON-") || c.contains("GLAT-"));

    let projection = if ctype1.contains("-TAN") {
        Projection::Tan
    } else if ctype1.contains("-SIN") {
        Projection::Sin
    } else if is_galactic || !ctype1.contains('-') {
        Projection::Unspecified
    } else {
        return Err(Error::UnsupportedProjection(String::from(ctype1.trim())));
    };
    Ok((projection, is_galactic))
}

/// Derive the solution, reporting an unsupported projection as an error.
pub fn try_calibrate(header: &Header) -> Result<WcsSolution> {
    let (projection, is_galactic) = parse_projection(header)?;

    let mut rotation = header.get_f64("CROTA2");
    let mut scale = pair(header, "CDELT1", "CDELT2");
    let mut flips = (false, false);
    let ref_pix = pair(header, "CRPIX1", "CRPIX2").map(|(x, y)| (x - 1.0, y - 1.0));
    let native_center = pair(header, "CRVAL1", "CRVAL2");

    if let Some(cd) = cd_matrix(header) {
        let (cd_rotation, cd_scale) = decompose_cd(cd);
        rotation = rotation.or(Some(cd_rotation));
        if scale.is_none() {
            let (sx, sy) = cd_scale;
            scale = Some((libm::fabs(sx), libm::fabs(sy)));
            flips = (sx < 0.0, sy < 0.0);
        }
    }

    let center = native_center.map(|(lon, lat)| {
        if is_galactic {
            galactic_to_j2000(lon, lat)
        } else {
            (lon, lat)
        }
    });

    let valid = rotation.is_some() && scale.is_some() && ref_pix.is_some() && center.is_some();
    let (scale_x, scale_y) = scale.unwrap_or_default();
    let (ref_x, ref_y) = ref_pix.unwrap_or_default();
    let (ra, dec) = center.unwrap_or_default();

    let solution = WcsSolution {
        center_ra_deg: ra,
        center_dec_deg: dec,
        scale_x_deg_per_pix: scale_x,
        scale_y_deg_per_pix: scale_y,
        rotation_deg: rotation.unwrap_or_default(),
        ref_pix_x: ref_x,
        ref_pix_y: ref_y,
        is_galactic,
        flip_x: flips.0,
        flip_y: flips.1,
        projection,
        native_center_deg: native_center.unwrap_or_default(),
        valid,
    };
    if !valid {
        tracing::debug!(
            rotation = rotation.is_some(),
            scale = scale.is_some(),
            ref_pix = ref_pix.is_some(),
            center = center.is_some(),
            "incomplete WCS"
        );
    }
    Ok(solution)
}

/// Derive the solution. An unsupported projection yields `valid = false` and a warning.
pub fn calibrate(header: &Header) -> WcsSolution {
    try_calibrate(header).unwrap_or_else(|err| {
        tracing::warn!(%err, "ignoring WCS");
        WcsSolution::default()
    })
}

fn pair(header: &Header, a: &str, b: &str) -> Option<(f64, f64)> {
    Some((header.get_f64(a)?, header.get_f64(b)?))
}

fn cd_matrix(header: &Header) -> Option<[f64; 4]> {
    Some([
        header.get_f64("CD1_1")?,
        header.get_f64("CD1_2")?,
        header.get_f64("CD2_1")?,
        header.get_f64("CD2_2")?,
    ])
}

/// Split a CD matrix into rotation (degrees) and signed per-axis scale.
///
/// The magnitudes are `hypot(CD1_1, CD2_1)` and `hypot(CD1_2, CD2_2)`.
///
/// The Y scale takes the sign of `CD2_2`; the X scale then carries the
/// parity of the determinant, so `CD = R(rotation) * diag(sx, sy)`.
fn decompose_cd([cd1_1, cd1_2, cd2_1, cd2_2]: [f64; 4]) -> (f64, (f64, f64)) {
    let y_sign = if cd2_2 < 0.0 { -1.0 } else { 1.0 };
    let scale_y = y_sign * libm::hypot(cd1_2, cd2_2);
    let rotation = libm::atan2(-cd1_2 * y_sign, cd2_2 * y_sign) / DEG;

    let det = cd1_1 * cd2_2 - cd1_2 * cd2_1;
    let x_sign = if (det < 0.0) != (scale_y < 0.0) {
        -1.0
    } else {
        1.0
    };
    let scale_x = x_sign * libm::hypot(cd1_1, cd2_1);
    (rotation, (scale_x, scale_y))
}

/// Convert galactic `(l, b)` in degrees to J2000 `(ra, dec)` in degrees.
pub fn galactic_to_j2000(l_deg: f64, b_deg: f64) -> (f64, f64) {
    let v = unit_vector(l_deg, b_deg);
    let m = &GALACTIC_TO_J2000;
    let rotated = [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ];
    lon_lat(rotated)
}

fn unit_vector(lon_deg: f64, lat_deg: f64) -> [f64; 3] {
    let (lon, lat) = (lon_deg * DEG, lat_deg * DEG);
    [
        libm::cos(lat) * libm::cos(lon),
        libm::cos(lat) * libm::sin(lon),
        libm::sin(lat),
    ]
}

fn lon_lat(v: [f64; 3]) -> (f64, f64) {
    let lon = normalize_degrees(libm::atan2(v[1], v[0]) / DEG);
    let lat = libm::asin(v[2].clamp(-1.0, 1.0)) / DEG;
    (lon, lat)
}

fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

impl WcsSolution {
    /// Sky position (J2000 degrees) of the 0-based pixel `(x, y)`.
    ///
    /// Returns `None` when the solution is invalid or the point falls outside
    /// the projection's domain.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !self.valid {
            return None;
        }
        let signed = |scale: f64, flip: bool| if flip { -scale } else { scale };
        let dx = (x - self.ref_pix_x) * signed(self.scale_x_deg_per_pix, self.flip_x);
        let dy = (y - self.ref_pix_y) * signed(self.scale_y_deg_per_pix, self.flip_y);
        let (sin_r, cos_r) = libm::sincos(self.rotation_deg * DEG);
        let xi = (cos_r * dx - sin_r * dy) * DEG;
        let eta = (sin_r * dx + cos_r * dy) * DEG;

        let (lon0, lat0) = if self.is_galactic {
            self.native_center_deg
        } else {
            (self.center_ra_deg, self.center_dec_deg)
        };
        let (sin_d0, cos_d0) = libm::sincos(lat0 * DEG);

        let (dlon, lat) = match self.projection {
            Projection::Tan | Projection::Unspecified => {
                let denom = cos_d0 - eta * sin_d0;
                let dlon = libm::atan2(xi, denom);
                let lat = libm::atan2(sin_d0 + eta * cos_d0, libm::hypot(xi, denom));
                (dlon, lat)
            }
            Projection::Sin => {
                let rho2 = xi * xi + eta * eta;
                if rho2 > 1.0 {
                    return None;
                }
                let z = libm::sqrt(1.0 - rho2);
                let lat = libm::asin((eta * cos_d0 + z * sin_d0).clamp(-1.0, 1.0));
                let dlon = libm::atan2(xi, z * cos_d0 - eta * sin_d0);
                (dlon, lat)
            }
        };

        let lon = normalize_degrees(lon0 + dlon / DEG);
        let lat = lat / DEG;
        if self.is_galactic {
            Some(galactic_to_j2000(lon, lat))
        } else {
            Some((lon, lat))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn header(pairs: &[(&str, &str)]) -> Header {
        let mut h = Header::new();
        for (k, v) in pairs {
            h.insert(k, v);
        }
        h
    }

    fn cd_header() -> Header {
        header(&[
            ("CD1_1", "-0.001"),
            ("CD1_2", "0"),
            ("CD2_1", "0"),
            ("CD2_2", "-0.001"),
            ("CRPIX1", "512"),
            ("CRPIX2", "512"),
            ("CRVAL1", "180.0"),
            ("CRVAL2", "0.0"),
            ("CTYPE1", "'RA---TAN'"),
            ("CTYPE2", "'DEC--TAN'"),
        ])
    }

    // ---- projection parsing ----

    #[test]
    fn tan_sin_and_unspecified_are_accepted() {
        let tan = header(&[("CTYPE1", "'RA---TAN-SIP'")]);
        assert_eq!(parse_projection(&tan).unwrap(), (Projection::Tan, false));
        let sin = header(&[("CTYPE1", "'RA---SIN'")]);
        assert_eq!(parse_projection(&sin).unwrap().0, Projection::Sin);
        let none = header(&[]);
        assert_eq!(parse_projection(&none).unwrap().0, Projection::Unspecified);
    }

    #[test]
    fn galactic_flag() {
        let h = header(&[("CTYPE1", "'GLON-TAN'"), ("CTYPE2", "'GLAT-TAN'")]);
        assert_eq!(parse_projection(&h).unwrap(), (Projection::Tan, true));
    }

    #[test]
    fn galactic_axes_accept_any_projection_code() {
        let h = header(&[("CTYPE1", "'GLON-CAR'"), ("CTYPE2", "'GLAT-CAR'")]);
        assert_eq!(
            parse_projection(&h).unwrap(),
            (Projection::Unspecified, true)
        );
    }

    #[test]
    fn other_projection_is_rejected() {
        let h = header(&[("CTYPE1", "'RA---AIT'")]);
        match parse_projection(&h) {
            Err(Error::UnsupportedProjection(code)) => assert_eq!(code, "RA---AIT"),
            other => panic!("expected UnsupportedProjection, got {other:?}"),
        }
    }

    // ---- calibration ----

    #[test]
    fn cd_matrix_solution() {
        let s = calibrate(&cd_header());
        assert!(s.valid);
        assert_abs_diff_eq!(s.scale_x_deg_per_pix, 0.001, epsilon = 1e-12);
        assert_abs_diff_eq!(s.scale_y_deg_per_pix, 0.001, epsilon = 1e-12);
        assert!(s.flip_x && s.flip_y);
        assert_abs_diff_eq!(s.rotation_deg, 0.0, epsilon = 1e-9);
        assert_eq!(s.center_ra_deg, 180.0);
        assert_eq!(s.center_dec_deg, 0.0);
        assert_eq!((s.ref_pix_x, s.ref_pix_y), (511.0, 511.0));
    }

    #[test]
    fn cd_decomposition_reproduces_matrix() {
        let rho = 30.0 * DEG;
        let (sx, sy) = (-2e-4, 2e-4);
        let cd = [
            sx * libm::cos(rho),
            -sy * libm::sin(rho),
            sx * libm::sin(rho),
            sy * libm::cos(rho),
        ];
        let (rotation, (scale_x, scale_y)) = decompose_cd(cd);
        assert_abs_diff_eq!(rotation, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(scale_x, sx, epsilon = 1e-15);
        assert_abs_diff_eq!(scale_y, sy, epsilon = 1e-15);
    }

    #[test]
    fn crota_and_cdelt_take_precedence_over_cd() {
        let mut h = cd_header();
        h.insert("CROTA2", "12.5");
        h.insert("CDELT1", "-0.5");
        h.insert("CDELT2", "0.5");
        let s = calibrate(&h);
        assert!(s.valid);
        assert_eq!(s.rotation_deg, 12.5);
        assert_eq!(s.scale_x_deg_per_pix, -0.5);
        assert_eq!(s.scale_y_deg_per_pix, 0.5);
    }

    #[test]
    fn unsupported_projection_is_invalid_not_fatal() {
        let mut h = cd_header();
        h.insert("CTYPE1", "'RA---AIT'");
        let s = calibrate(&h);
        assert!(!s.valid);
        assert!(matches!(
            try_calibrate(&h),
            Err(Error::UnsupportedProjection(_))
        ));
    }

    #[test]
    fn partial_keywords_are_invalid() {
        let h = header(&[
            ("CDELT1", "-0.001"),
            ("CDELT2", "0.001"),
            ("CROTA2", "0"),
            ("CRVAL1", "10"),
            ("CRVAL2", "20"),
        ]);
        let s = calibrate(&h);
        assert!(!s.valid);
        assert_eq!(s.scale_x_deg_per_pix, -0.001);
    }

    #[test]
    fn half_of_a_pair_is_ignored() {
        let h = header(&[("CDELT1", "-0.001"), ("CRPIX1", "10")]);
        let s = calibrate(&h);
        assert_eq!(s.scale_x_deg_per_pix, 0.0);
        assert_eq!(s.ref_pix_x, 0.0);
        assert!(!s.valid);
    }

    #[test]
    fn cd_flips_orient_pixel_offsets() {
        // CD1_1 = CD2_2 = -0.001: +x moves toward lower RA, +y toward south.
        let s = calibrate(&cd_header());
        let (ra, dec) = s.pixel_to_sky(512.0, 511.0).unwrap();
        assert_abs_diff_eq!(ra, 179.999, epsilon = 1e-9);
        assert_abs_diff_eq!(dec, 0.0, epsilon = 1e-12);
        let (_, dec) = s.pixel_to_sky(511.0, 512.0).unwrap();
        assert_abs_diff_eq!(dec, -0.001, epsilon = 1e-9);
    }

    #[test]
    fn cdelt_scale_is_not_flipped() {
        let mut h = cd_header();
        h.insert("CDELT1", "-0.5");
        h.insert("CDELT2", "0.5");
        let s = calibrate(&h);
        assert!(!s.flip_x && !s.flip_y);
    }

    // ---- galactic ----

    #[test]
    fn galactic_car_header_is_valid() {
        let h = header(&[
            ("CTYPE1", "'GLON-CAR'"),
            ("CTYPE2", "'GLAT-CAR'"),
            ("CRVAL1", "0"),
            ("CRVAL2", "0"),
            ("CRPIX1", "1"),
            ("CRPIX2", "1"),
            ("CDELT1", "-0.01"),
            ("CDELT2", "0.01"),
            ("CROTA2", "0"),
        ]);
        let s = calibrate(&h);
        assert!(s.valid && s.is_galactic);
        assert_eq!(s.projection, Projection::Unspecified);
        assert_abs_diff_eq!(s.center_ra_deg, 266.405, epsilon = 1e-3);
    }

    #[test]
    fn galactic_center_to_j2000() {
        let (ra, dec) = galactic_to_j2000(0.0, 0.0);
        assert_abs_diff_eq!(ra, 266.405, epsilon = 1e-3);
        assert_abs_diff_eq!(dec, -28.936, epsilon = 1e-3);
    }

    #[test]
    fn galactic_north_pole_to_j2000() {
        let (ra, dec) = galactic_to_j2000(0.0, 90.0);
        assert_abs_diff_eq!(ra, 192.859, epsilon = 1e-3);
        assert_abs_diff_eq!(dec, 27.128, epsilon = 1e-3);
    }

    #[test]
    fn galactic_header_center_is_converted() {
        let h = header(&[
            ("CTYPE1", "'GLON-TAN'"),
            ("CTYPE2", "'GLAT-TAN'"),
            ("CRVAL1", "0"),
            ("CRVAL2", "0"),
            ("CRPIX1", "1"),
            ("CRPIX2", "1"),
            ("CDELT1", "-0.01"),
            ("CDELT2", "0.01"),
            ("CROTA2", "0"),
        ]);
        let s = calibrate(&h);
        assert!(s.valid && s.is_galactic);
        assert_abs_diff_eq!(s.center_ra_deg, 266.405, epsilon = 1e-3);
        let (ra, dec) = s.pixel_to_sky(0.0, 0.0).unwrap();
        assert_abs_diff_eq!(ra, s.center_ra_deg, epsilon = 1e-9);
        assert_abs_diff_eq!(dec, s.center_dec_deg, epsilon = 1e-9);
    }

    // ---- pixel_to_sky ----

    #[test]
    fn reference_pixel_maps_to_center() {
        let s = calibrate(&cd_header());
        let (ra, dec) = s.pixel_to_sky(511.0, 511.0).unwrap();
        assert_abs_diff_eq!(ra, 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dec, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn east_is_left_for_negative_x_scale() {
        let h = header(&[
            ("CTYPE1", "'RA---TAN'"),
            ("CRVAL1", "180"),
            ("CRVAL2", "0"),
            ("CRPIX1", "1"),
            ("CRPIX2", "1"),
            ("CDELT1", "-0.001"),
            ("CDELT2", "0.001"),
            ("CROTA2", "0"),
        ]);
        let s = calibrate(&h);
        let (ra, dec) = s.pixel_to_sky(1.0, 0.0).unwrap();
        assert_abs_diff_eq!(ra, 179.999, epsilon = 1e-9);
        assert_abs_diff_eq!(dec, 0.0, epsilon = 1e-12);
        let (_, dec) = s.pixel_to_sky(0.0, 1.0).unwrap();
        assert_abs_diff_eq!(dec, 0.001, epsilon = 1e-9);
    }

    #[test]
    fn sin_projection_outside_domain() {
        let h = header(&[
            ("CTYPE1", "'RA---SIN'"),
            ("CRVAL1", "0"),
            ("CRVAL2", "0"),
            ("CRPIX1", "1"),
            ("CRPIX2", "1"),
            ("CDELT1", "1"),
            ("CDELT2", "1"),
            ("CROTA2", "0"),
        ]);
        let s = calibrate(&h);
        assert!(s.pixel_to_sky(10.0, 0.0).is_some());
        assert!(s.pixel_to_sky(100.0, 0.0).is_none());
    }

    #[test]
    fn invalid_solution_has_no_sky_mapping() {
        assert!(WcsSolution::default().pixel_to_sky(0.0, 0.0).is_none());
    }
}
