//! Distancias geográficas
//!
//! Distancia de círculo máximo (haversine) entre dos puntos.

use crate::models::GeoPoint;

/// Radio terrestre usado por las consultas geoespaciales esféricas, en metros
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Distancia haversine en metros
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Caja (min_lon, min_lat, max_lon, max_lat) que contiene el círculo de `radius_m`.
/// Sirve como prefiltro barato; cerca de los polos devuelve el globo entero en longitud.
pub fn bounding_box(center: &GeoPoint, radius_m: f64) -> (f64, f64, f64, f64) {
    let dlat = (radius_m / EARTH_RADIUS_M).to_degrees();
    let min_lat = (center.latitude - dlat).max(-90.0);
    let max_lat = (center.latitude + dlat).min(90.0);

    let cos_lat = center.latitude.to_radians().cos();
    if cos_lat <= 1e-9 || min_lat <= -90.0 || max_lat >= 90.0 {
        return (-180.0, min_lat, 180.0, max_lat);
    }

    let dlon = (radius_m / (EARTH_RADIUS_M * cos_lat)).to_degrees();
    if dlon >= 180.0 {
        return (-180.0, min_lat, 180.0, max_lat);
    }
    (center.longitude - dlon, min_lat, center.longitude + dlon, max_lat)
}

/// Comprobar si un punto cae en la caja, teniendo en cuenta el antimeridiano
pub fn in_bounding_box(point: &GeoPoint, bbox: (f64, f64, f64, f64)) -> bool {
    let (min_lon, min_lat, max_lon, max_lat) = bbox;
    if point.latitude < min_lat || point.latitude > max_lat {
        return false;
    }
    if min_lon < -180.0 {
        return point.longitude >= min_lon + 360.0 || point.longitude <= max_lon;
    }
    if max_lon > 180.0 {
        return point.longitude >= min_lon || point.longitude <= max_lon - 360.0;
    }
    point.longitude >= min_lon && point.longitude <= max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(103.8237, 1.4509);
        assert_eq!(haversine_m(&p, &p), 0.0);
    }

    #[test]
    fn test_known_short_distance() {
        let carpark = GeoPoint::new(103.8237, 1.4509);
        let user = GeoPoint::new(103.8201, 1.4495);
        let d = haversine_m(&carpark, &user);
        assert!((400.0..470.0).contains(&d), "distance was {}", d);
        assert!((d - haversine_m(&user, &carpark)).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_m(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(0.0, 1.0));
        assert!((d - 111_318.8).abs() < 50.0, "distance was {}", d);
    }

    #[test]
    fn test_bounding_box_contains_circle() {
        let center = GeoPoint::new(103.82, 1.45);
        let bbox = bounding_box(&center, 20_000.0);
        assert!(in_bounding_box(&GeoPoint::new(103.82, 1.62), bbox));
        assert!(!in_bounding_box(&GeoPoint::new(103.82, 1.70), bbox));
    }

    #[test]
    fn test_bounding_box_wraps_antimeridian() {
        let center = GeoPoint::new(179.95, 0.0);
        let bbox = bounding_box(&center, 20_000.0);
        assert!(in_bounding_box(&GeoPoint::new(-179.95, 0.0), bbox));
        assert!(!in_bounding_box(&GeoPoint::new(0.0, 0.0), bbox));
    }
}
