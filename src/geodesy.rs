//! Coordinate conversions between WGS84 degrees, a UTM-like projected grid,
//! the compact grid string printed on route cards, and canvas pixels.
//!
//! Trigonometry goes through `libm` so projected values are reproducible
//! across platforms; the card text is derived from them digit by digit.

use crate::error::RouteError;
use crate::types::{LatLon, ScreenPoint, Viewport};

// Rukla, Lithuania.
pub const DEFAULT_CENTER: LatLon = LatLon {
    latitude: 55.030180,
    longitude: 24.370464,
};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const ECCENTRICITY: f64 = 0.0818191908;
const E1_SQUARED: f64 = 0.006739497;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING: f64 = 0.0;

// Degrees covered by one canvas pixel at zoom 1.
const BASE_DEGREES_PER_PIXEL: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub zone: i32,
    pub easting: f64,
    pub northing: f64,
}

pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

pub fn validate(latitude: f64, longitude: f64) -> Result<LatLon, RouteError> {
    if is_valid_coordinate(latitude, longitude) {
        Ok(LatLon::new(latitude, longitude))
    } else {
        Err(RouteError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

pub fn utm_zone(longitude: f64) -> i32 {
    libm::floor((longitude + 180.0) / 6.0) as i32 + 1
}

pub fn to_projected(latitude: f64, longitude: f64) -> Result<Projected, RouteError> {
    validate(latitude, longitude)?;
    let zone = utm_zone(longitude);

    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    let lon0 = (((zone - 1) * 6 - 180 + 3) as f64).to_radians();
    let d_lon = lon - lon0;

    let e2 = ECCENTRICITY * ECCENTRICITY;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let sin_lat = libm::sin(lat);
    let cos_lat = libm::cos(lat);
    let tan_lat = libm::tan(lat);

    let m = SEMI_MAJOR_AXIS
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * libm::sin(2.0 * lat)
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * libm::sin(4.0 * lat)
            - (35.0 * e6 / 3072.0) * libm::sin(6.0 * lat));

    let es = ECCENTRICITY * sin_lat;
    let nu = SEMI_MAJOR_AXIS / libm::sqrt(1.0 - es * es);
    let t = tan_lat * tan_lat;
    let c = E1_SQUARED * cos_lat * cos_lat;
    let a = d_lon * cos_lat;

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let easting = SCALE_FACTOR
        * nu
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E1_SQUARED) * a5 / 120.0)
        + FALSE_EASTING;

    let northing = SCALE_FACTOR
        * (m + nu
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E1_SQUARED) * a6 / 720.0))
        + FALSE_NORTHING;

    Ok(Projected {
        zone,
        easting,
        northing,
    })
}

fn grid_letter(value: f64) -> char {
    let index = (libm::fabs(value * 10.0) as i64).rem_euclid(26) as u8;
    (b'A' + index) as char
}

/// Compact card notation: `"EEEE NNNN"`, the last four integer digits of the
/// projected easting and northing.
///
/// The full form carries the zone and two pseudo grid letters
/// (`"34UV 1234 5678"`); those first four characters are dropped. This is a
/// self-consistent placeholder, not MGRS.
pub fn to_grid_string(latitude: f64, longitude: f64) -> Result<String, RouteError> {
    let projected = to_projected(latitude, longitude)?;
    let first = grid_letter(latitude);
    let second = grid_letter(longitude);
    let easting = (libm::floor(libm::fabs(projected.easting)) as i64) % 10_000;
    let northing = (libm::floor(libm::fabs(projected.northing)) as i64) % 10_000;
    let full = format!(
        "{:02}{}{} {:04} {:04}",
        projected.zone, first, second, easting, northing
    );
    let tail = full.get(4..).unwrap_or(full.as_str());
    Ok(tail.trim_start().to_string())
}

fn first_four_digits(value: f64) -> String {
    let whole = libm::floor(libm::fabs(value)) as i64;
    let digits = whole.to_string();
    let head: String = digits.chars().take(4).collect();
    format!("{:0>4}", head)
}

pub fn to_short_projected_label(latitude: f64, longitude: f64) -> Result<String, RouteError> {
    let projected = to_projected(latitude, longitude)?;
    Ok(format!(
        "{} {}",
        first_four_digits(projected.easting / 100.0),
        first_four_digits(projected.northing / 1000.0)
    ))
}

pub fn to_full_projected_label(latitude: f64, longitude: f64) -> Result<String, RouteError> {
    let projected = to_projected(latitude, longitude)?;
    Ok(format!(
        "{}U {:06.0} {:07.0}",
        projected.zone, projected.easting, projected.northing
    ))
}

pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("{:.6}°, {:.6}°", latitude, longitude)
}

fn validate_viewport(viewport: &Viewport) -> Result<f64, RouteError> {
    validate(viewport.center.latitude, viewport.center.longitude)?;
    if !viewport.zoom.is_finite() || viewport.zoom <= 0.0 {
        return Err(RouteError::InvalidConfiguration(format!(
            "zoom must be positive, got {}",
            viewport.zoom
        )));
    }
    Ok(BASE_DEGREES_PER_PIXEL / viewport.zoom)
}

// Linear around the viewport center; only meaningful near it.
pub fn screen_to_geo(point: ScreenPoint, viewport: &Viewport) -> Result<LatLon, RouteError> {
    let degrees_per_pixel = validate_viewport(viewport)?;
    if !point.x.is_finite() || !point.y.is_finite() {
        return Err(RouteError::InvalidCoordinate {
            latitude: f64::NAN,
            longitude: f64::NAN,
        });
    }
    let offset_x = point.x - viewport.width / 2.0;
    let offset_y = point.y - viewport.height / 2.0;
    let longitude = viewport.center.longitude + offset_x * degrees_per_pixel;
    let latitude = viewport.center.latitude - offset_y * degrees_per_pixel;
    validate(latitude, longitude)
}

pub fn geo_to_screen(
    latitude: f64,
    longitude: f64,
    viewport: &Viewport,
) -> Result<ScreenPoint, RouteError> {
    validate(latitude, longitude)?;
    let degrees_per_pixel = validate_viewport(viewport)?;
    let lon_offset = longitude - viewport.center.longitude;
    let lat_offset = viewport.center.latitude - latitude;
    Ok(ScreenPoint::new(
        viewport.width / 2.0 + lon_offset / degrees_per_pixel,
        viewport.height / 2.0 + lat_offset / degrees_per_pixel,
    ))
}

pub fn haversine_distance_m(from: LatLon, to: LatLon) -> Result<f64, RouteError> {
    validate(from.latitude, from.longitude)?;
    validate(to.latitude, to.longitude)?;
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();
    let s_phi = libm::sin(d_phi / 2.0);
    let s_lambda = libm::sin(d_lambda / 2.0);
    let a = s_phi * s_phi + libm::cos(phi1) * libm::cos(phi2) * s_lambda * s_lambda;
    let c = 2.0 * libm::atan2(libm::sqrt(a), libm::sqrt(1.0 - a));
    Ok(EARTH_RADIUS_M * c)
}

pub fn route_length_m(points: &[LatLon]) -> Result<f64, RouteError> {
    let mut total = 0.0;
    for pair in points.windows(2) {
        total += haversine_distance_m(pair[0], pair[1])?;
    }
    Ok(total)
}
