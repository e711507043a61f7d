/// Geographic calculations for local airspace ranges
///
/// Flat-earth math is used for every range the engine operates in (< 100 NM);
/// the great-circle form is kept for callers that need it.

pub const EARTH_RADIUS_NM: f64 = 3440.065;
pub const NM_PER_DEGREE_LAT: f64 = 60.0;
pub const FT_PER_NM: f64 = 6076.0;

/// Flat-earth distance with midpoint-latitude cosine correction.
pub fn flat_earth_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let mid_lat = (lat1 + lat2) / 2.0;
    let cos_lat = mid_lat.to_radians().cos();

    let x_nm = (lon2 - lon1) * NM_PER_DEGREE_LAT * cos_lat;
    let y_nm = (lat2 - lat1) * NM_PER_DEGREE_LAT;

    (x_nm * x_nm + y_nm * y_nm).sqrt()
}

/// Haversine great-circle distance in nautical miles.
pub fn great_circle_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_NM * c
}

/// Advance a position along a heading at the given speed.
///
/// Heading convention is aviation-standard: 0° = north, 90° = east.
pub fn advance_position(
    lat: f64,
    lon: f64,
    heading_deg: f64,
    speed_kts: f64,
    dt_secs: f64,
) -> (f64, f64) {
    let distance_nm = (speed_kts / 3600.0) * dt_secs;
    let heading_rad = heading_deg.to_radians();

    let delta_north_nm = distance_nm * heading_rad.cos();
    let delta_east_nm = distance_nm * heading_rad.sin();

    let delta_lat = delta_north_nm / NM_PER_DEGREE_LAT;
    let cos_lat = lat.to_radians().cos();
    let delta_lon = delta_east_nm / (NM_PER_DEGREE_LAT * cos_lat);

    (lat + delta_lat, lon + delta_lon)
}

/// Normalize a heading into [0, 360).
pub fn normalize_heading(heading: f64) -> f64 {
    heading.rem_euclid(360.0)
}

/// Signed shortest-path difference from `current` to `target`, in (-180, +180].
/// Negative means turn left, positive means turn right.
pub fn heading_difference(current: f64, target: f64) -> f64 {
    let diff = (target - current).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Initial bearing from one point to another, normalized to [0, 360).
pub fn bearing_between(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    let lat1 = from_lat.to_radians();
    let lat2 = to_lat.to_radians();
    let delta_lon = (to_lon - from_lon).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_heading(x.atan2(y).to_degrees())
}

pub fn altitude_agl(altitude_msl_ft: f64, field_elevation_ft: f64) -> f64 {
    altitude_msl_ft - field_elevation_ft
}

pub fn altitude_msl(altitude_agl_ft: f64, field_elevation_ft: f64) -> f64 {
    altitude_agl_ft + field_elevation_ft
}
