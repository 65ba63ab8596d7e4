//! Great-circle formula library.
//!
//! Pure numeric functions shared by the per-chunk workers. Inputs are
//! latitude/longitude in degrees; distances come back in kilometers.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (haversine) distance between two coordinates in kilometers.
///
/// Symmetric, zero for identical points, and bounded by half the Earth's
/// circumference (~20 015 km) for any valid coordinate pair.
///
/// # Example
/// ```
/// use trackfeat::geo::haversine_km;
///
/// // One degree of longitude at the equator is ~111.19 km.
/// let d = haversine_km(0.0, 0.0, 0.0, 1.0);
/// assert!((d - 111.19).abs() < 0.01);
/// ```
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Initial bearing from the first coordinate to the second, in degrees.
///
/// Measured clockwise from true north, normalized to [0, 360).
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}
