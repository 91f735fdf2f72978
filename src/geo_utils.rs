//! # Geographic Utilities
//!
//! Core geographic computations for route analysis and POI matching.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance_meters`] | Great-circle distance between two points |
//! | [`point_segment_distance_meters`] | Distance from a point to a route segment |
//! | [`nearest_point_on_route`] | Snap a point to the closest route sample |
//! | [`sample_route_points_by_distance`] | Thin a route to one point per distance step |
//! | [`nearest_route_index_by_distance`] | Find the route index closest to a given distance |
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).
//! Distances assume a spherical Earth of radius 6,371 km; segment distances
//! additionally use a local equirectangular projection that is only valid over
//! the short spans between consecutive GPS samples. Neither is geodesically
//! exact and both are intentional approximations.

use crate::{GeoPoint, NearestOnRoute, RoutePoint};

/// Spherical Earth radius used throughout, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point in a local planar projection, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two points using the haversine formula.
///
/// Symmetric, and exactly zero for identical points.
///
/// # Example
/// ```
/// use route_pois::GeoPoint;
/// use route_pois::geo_utils::haversine_distance_meters;
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
/// let distance = haversine_distance_meters(london, paris);
/// assert!((distance - 343_560.0).abs() < 5_000.0); // ~344 km
/// ```
pub fn haversine_distance_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}

/// Project a coordinate onto a local equirectangular plane.
///
/// The x axis is scaled by `cos(reference_lat)`; the plane is only meaningful
/// for comparing points that share the same `reference_lat`.
pub fn project_to_local_plane(lat: f64, lon: f64, reference_lat: f64) -> PlanarPoint {
    PlanarPoint {
        x: lon.to_radians() * EARTH_RADIUS_METERS * reference_lat.to_radians().cos(),
        y: lat.to_radians() * EARTH_RADIUS_METERS,
    }
}

/// Distance from a point to a route segment, in meters.
///
/// Projects all three points to a shared local plane referenced at their mean
/// latitude, then computes the planar point-to-segment distance with the
/// projection parameter clamped to `[0, 1]`. A zero-length segment degenerates
/// to the planar distance to its start.
///
/// Valid for the short segments between consecutive GPS samples only; over
/// long spans the local projection drifts from the geodesic truth.
pub fn point_segment_distance_meters(
    point: GeoPoint,
    seg_start: GeoPoint,
    seg_end: GeoPoint,
) -> f64 {
    let reference_lat = (point.lat + seg_start.lat + seg_end.lat) / 3.0;
    let p = project_to_local_plane(point.lat, point.lon, reference_lat);
    let a = project_to_local_plane(seg_start.lat, seg_start.lon, reference_lat);
    let b = project_to_local_plane(seg_end.lat, seg_end.lon, reference_lat);

    let ab_x = b.x - a.x;
    let ab_y = b.y - a.y;
    let ap_x = p.x - a.x;
    let ap_y = p.y - a.y;
    let ab_sq = ab_x * ab_x + ab_y * ab_y;

    if ab_sq == 0.0 {
        return ap_x.hypot(ap_y);
    }

    let t = ((ap_x * ab_x + ap_y * ab_y) / ab_sq).clamp(0.0, 1.0);
    let closest_x = a.x + t * ab_x;
    let closest_y = a.y + t * ab_y;

    (p.x - closest_x).hypot(p.y - closest_y)
}

// =============================================================================
// Route Queries
// =============================================================================

/// Snap a point to the closest route sample.
///
/// Scans every consecutive segment and keeps the minimum
/// [`point_segment_distance_meters`]. The reported index is whichever
/// *endpoint* of that segment is haversine-closer to the query point (the
/// start wins ties), not the exact geometric projection. Downstream consumers
/// snap to route samples, so the endpoint index is the useful answer here.
///
/// Degenerate inputs: an empty route yields index 0 with infinite distance; a
/// single-point route yields the haversine distance to that point and its
/// stored along-route distance.
pub fn nearest_point_on_route(points: &[RoutePoint], point: GeoPoint) -> NearestOnRoute {
    if points.is_empty() {
        return NearestOnRoute {
            index: 0,
            distance_meters: f64::INFINITY,
            along_route_km: 0.0,
        };
    }

    if points.len() == 1 {
        let only = points[0];
        return NearestOnRoute {
            index: 0,
            distance_meters: haversine_distance_meters(point, only.geo()),
            along_route_km: only.distance_km,
        };
    }

    let mut best_distance = f64::INFINITY;
    let mut best_index = 0;

    for i in 0..points.len() - 1 {
        let start = points[i];
        let end = points[i + 1];
        let distance = point_segment_distance_meters(point, start.geo(), end.geo());
        if distance < best_distance {
            let to_start = haversine_distance_meters(point, start.geo());
            let to_end = haversine_distance_meters(point, end.geo());
            best_distance = distance;
            best_index = if to_start <= to_end { i } else { i + 1 };
        }
    }

    NearestOnRoute {
        index: best_index,
        distance_meters: best_distance,
        along_route_km: points[best_index].distance_km,
    }
}

/// Thin a route down to roughly one point per `step_km` of travel.
///
/// Always includes the first point, then greedily takes the first point whose
/// cumulative distance reaches each successive multiple of `step_km`, and
/// finally appends the last point if it was not already sampled. Used to bound
/// the number of spatial queries issued against the POI source.
pub fn sample_route_points_by_distance(points: &[RoutePoint], step_km: f64) -> Vec<RoutePoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut sampled = vec![*first];
    let mut last_sampled = 0usize;
    let mut next_threshold = step_km;

    for (i, point) in points.iter().enumerate() {
        if point.distance_km >= next_threshold {
            sampled.push(*point);
            last_sampled = i;
            next_threshold += step_km;
        }
    }

    if last_sampled != points.len() - 1 {
        sampled.push(points[points.len() - 1]);
    }

    sampled
}

/// Index of the route point closest to a given along-route distance.
///
/// Binary search over the monotonic `distance_km` sequence for the lower
/// bound, then compares against the predecessor and returns whichever is
/// closer in absolute distance, the found index winning ties. Empty routes
/// yield index 0.
pub fn nearest_route_index_by_distance(points: &[RoutePoint], dist_km: f64) -> usize {
    if points.is_empty() {
        return 0;
    }

    let mut low = 0usize;
    let mut high = points.len() - 1;

    while low < high {
        let mid = (low + high) / 2;
        if points[mid].distance_km < dist_km {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    if low == 0 {
        return 0;
    }

    let current = points[low].distance_km;
    let previous = points[low - 1].distance_km;

    if (current - dist_km).abs() <= (previous - dist_km).abs() {
        low
    } else {
        low - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::three_point_route;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn route_point(lat: f64, lon: f64, distance_km: f64) -> RoutePoint {
        RoutePoint {
            lat,
            lon,
            elevation_m: 0.0,
            distance_km,
        }
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let p = GeoPoint::new(51.5074, -0.1278);
        assert_eq!(haversine_distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = GeoPoint::new(48.4050, 2.7010);
        let b = GeoPoint::new(48.8566, 2.3522);
        let forward = haversine_distance_meters(a, b);
        let backward = haversine_distance_meters(b, a);
        assert!(approx_eq(forward, backward, 1e-9));
    }

    #[test]
    fn test_haversine_known_value() {
        // London to Paris is approximately 344 km
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let dist = haversine_distance_meters(london, paris);
        assert!(approx_eq(dist, 343_560.0, 5_000.0));
    }

    #[test]
    fn test_point_between_near_identical_endpoints_is_on_segment() {
        // Segment endpoints differ by 0.0002 degrees of longitude; a query
        // point between them must sit within a couple of meters.
        let start = GeoPoint::new(48.4050, 2.7010);
        let end = GeoPoint::new(48.4050, 2.7012);
        let between = GeoPoint::new(48.4050, 2.7011);
        let dist = point_segment_distance_meters(between, start, end);
        assert!(dist < 2.0, "expected < 2 m, got {dist}");
    }

    #[test]
    fn test_zero_length_segment_falls_back_to_start_distance() {
        let start = GeoPoint::new(48.4050, 2.7010);
        let point = GeoPoint::new(48.4060, 2.7010);
        let dist = point_segment_distance_meters(point, start, start);
        let direct = haversine_distance_meters(point, start);
        // Planar and great-circle distances agree closely at this scale.
        assert!(approx_eq(dist, direct, 1.0));
    }

    #[test]
    fn test_nearest_on_empty_route() {
        let nearest = nearest_point_on_route(&[], GeoPoint::new(48.0, 2.0));
        assert_eq!(nearest.index, 0);
        assert!(nearest.distance_meters.is_infinite());
        assert_eq!(nearest.along_route_km, 0.0);
    }

    #[test]
    fn test_nearest_on_single_point_route() {
        let points = [route_point(48.4050, 2.7010, 12.5)];
        let query = GeoPoint::new(48.4060, 2.7010);
        let nearest = nearest_point_on_route(&points, query);
        assert_eq!(nearest.index, 0);
        assert_eq!(nearest.along_route_km, 12.5);
        let expected = haversine_distance_meters(query, points[0].geo());
        assert!(approx_eq(nearest.distance_meters, expected, 1e-9));
    }

    #[test]
    fn test_nearest_snaps_to_second_point_of_short_route() {
        let route = three_point_route();
        // Just east of the middle point.
        let query = GeoPoint::new(48.40626, 2.7014);
        let nearest = nearest_point_on_route(route.points(), query);
        assert!(nearest.index >= 1, "index was {}", nearest.index);
        assert!(
            nearest.distance_meters < 40.0,
            "distance was {}",
            nearest.distance_meters
        );
    }

    #[test]
    fn test_sampling_keeps_first_and_last_points() {
        let points: Vec<RoutePoint> = (0..11)
            .map(|i| route_point(48.0 + i as f64 * 0.01, 2.7, i as f64))
            .collect();
        let sampled = sample_route_points_by_distance(&points, 3.0);
        assert_eq!(sampled.first(), points.first());
        assert_eq!(sampled.last(), points.last());
        // 0 km start, thresholds at 3, 6, 9 km, plus the 10 km endpoint.
        assert_eq!(sampled.len(), 5);
    }

    #[test]
    fn test_sampling_does_not_duplicate_a_sampled_endpoint() {
        let points: Vec<RoutePoint> = (0..4)
            .map(|i| route_point(48.0 + i as f64 * 0.01, 2.7, i as f64))
            .collect();
        // Last point (3 km) lands exactly on a threshold.
        let sampled = sample_route_points_by_distance(&points, 3.0);
        assert_eq!(sampled.len(), 2);
        assert_eq!(sampled.last(), points.last());
    }

    #[test]
    fn test_sampling_empty_route_is_empty() {
        assert!(sample_route_points_by_distance(&[], 3.0).is_empty());
    }

    #[test]
    fn test_nearest_index_is_exact_on_stored_distances() {
        let points: Vec<RoutePoint> = [0.0, 0.14, 0.28, 1.5, 2.75]
            .iter()
            .map(|&d| route_point(48.0, 2.7, d))
            .collect();
        for (k, point) in points.iter().enumerate() {
            let found = nearest_route_index_by_distance(&points, point.distance_km);
            assert!(
                approx_eq(points[found].distance_km, point.distance_km, f64::EPSILON),
                "query at index {k} returned index {found}"
            );
        }
    }

    #[test]
    fn test_nearest_index_prefers_closer_neighbor() {
        let points: Vec<RoutePoint> = [0.0, 1.0, 3.0]
            .iter()
            .map(|&d| route_point(48.0, 2.7, d))
            .collect();
        assert_eq!(nearest_route_index_by_distance(&points, 1.4), 1);
        assert_eq!(nearest_route_index_by_distance(&points, 2.6), 2);
        assert_eq!(nearest_route_index_by_distance(&points, 0.2), 0);
        // Exactly between two points, the found (later) index wins.
        assert_eq!(nearest_route_index_by_distance(&points, 2.0), 2);
    }

    #[test]
    fn test_nearest_index_on_empty_route_is_zero() {
        assert_eq!(nearest_route_index_by_distance(&[], 5.0), 0);
    }
}
