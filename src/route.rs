//! Route construction from raw trackpoints.
//!
//! [`build_route`] turns an ordered sequence of raw `{lat, lon, elevation}`
//! samples into a normalized [`Route`]: cumulative distance per point plus
//! aggregate elevation statistics, all computed in a single forward pass.
//! [`RouteCache`] holds the one route a process serves, built at most once and
//! immutable afterwards.

use std::sync::{Arc, RwLock};

use log::debug;
use thiserror::Error;

use crate::geo_utils::haversine_distance_meters;
use crate::{GeoPoint, RawTrackPoint, Route, RoutePoint, RouteStats};

/// Errors from route construction.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The route source supplied no usable trackpoints.
    #[error("no usable track points in input")]
    EmptyInput,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Build a normalized route from raw trackpoints.
///
/// Accumulates haversine distance between consecutive points, partitions
/// per-step elevation deltas into gain and loss, and tracks min/max elevation
/// across every point including the first. Per-point cumulative distance is
/// rounded to 3 decimals, total distance to 1, gain/loss to whole meters and
/// min/max elevation to 1 decimal.
///
/// # Errors
///
/// Returns [`RouteError::EmptyInput`] when `raw_points` is empty.
///
/// # Example
/// ```
/// use route_pois::{build_route, RawTrackPoint};
///
/// let raw = vec![
///     RawTrackPoint::new(48.4050, 2.7010, 80.0),
///     RawTrackPoint::new(48.4062, 2.7010, 84.5),
/// ];
/// let route = build_route("Day 1", &raw).unwrap();
/// assert_eq!(route.stats().elevation_gain_m, 5);
/// ```
pub fn build_route(name: &str, raw_points: &[RawTrackPoint]) -> Result<Route, RouteError> {
    if raw_points.is_empty() {
        return Err(RouteError::EmptyInput);
    }

    let mut cumulative_meters = 0.0;
    let mut gain_m = 0.0;
    let mut loss_m = 0.0;
    let mut min_elevation = f64::INFINITY;
    let mut max_elevation = f64::NEG_INFINITY;

    let mut points = Vec::with_capacity(raw_points.len());

    for (index, point) in raw_points.iter().enumerate() {
        if index > 0 {
            let prev = raw_points[index - 1];
            cumulative_meters += haversine_distance_meters(
                GeoPoint::new(prev.lat, prev.lon),
                GeoPoint::new(point.lat, point.lon),
            );
            let delta = point.elevation_m - prev.elevation_m;
            if delta > 0.0 {
                gain_m += delta;
            } else {
                loss_m += -delta;
            }
        }

        min_elevation = min_elevation.min(point.elevation_m);
        max_elevation = max_elevation.max(point.elevation_m);

        points.push(RoutePoint {
            lat: point.lat,
            lon: point.lon,
            elevation_m: point.elevation_m,
            distance_km: round_to(cumulative_meters / 1000.0, 3),
        });
    }

    let stats = RouteStats {
        total_distance_km: round_to(cumulative_meters / 1000.0, 1),
        elevation_gain_m: gain_m.round() as i64,
        elevation_loss_m: loss_m.round() as i64,
        min_elevation_m: round_to(min_elevation, 1),
        max_elevation_m: round_to(max_elevation, 1),
    };

    debug!(
        "built route '{}': {} points, {:.1} km, +{} m / -{} m",
        name,
        points.len(),
        stats.total_distance_km,
        stats.elevation_gain_m,
        stats.elevation_loss_m
    );

    Ok(Route::new(name.to_string(), points, stats))
}

/// Process-wide cache for the single route a process serves.
///
/// The route is built at most once and shared as an [`Arc`]; readers clone
/// the Arc under a short read lock and never hold the lock across use, so the
/// immutable route itself is read without synchronization. [`invalidate`]
/// drops the cached route so the next [`get_or_build`] rebuilds it.
///
/// [`invalidate`]: RouteCache::invalidate
/// [`get_or_build`]: RouteCache::get_or_build
///
/// # Example
/// ```
/// use route_pois::{RawTrackPoint, RouteCache};
///
/// let cache = RouteCache::new();
/// let raw = vec![RawTrackPoint::new(48.4050, 2.7010, 80.0)];
/// let route = cache
///     .get_or_build(|| route_pois::build_route("Day 1", &raw))
///     .unwrap();
/// assert_eq!(route.name(), "Day 1");
/// ```
#[derive(Debug, Default)]
pub struct RouteCache {
    inner: RwLock<Option<Arc<Route>>>,
}

impl RouteCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached route, building and caching it on first use.
    ///
    /// A failed build leaves the cache empty, so a later call retries.
    ///
    /// # Errors
    ///
    /// Propagates whatever error `build` returns.
    pub fn get_or_build<E>(
        &self,
        build: impl FnOnce() -> Result<Route, E>,
    ) -> Result<Arc<Route>, E> {
        if let Some(route) = self.get() {
            return Ok(route);
        }

        let route = Arc::new(build()?);
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        // A concurrent builder may have won the race; keep the first result
        // so every reader sees the same Arc.
        Ok(slot.get_or_insert_with(|| route).clone())
    }

    /// Return the cached route without building.
    pub fn get(&self) -> Option<Arc<Route>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drop the cached route so the next access rebuilds it.
    pub fn invalidate(&self) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climb_points() -> Vec<RawTrackPoint> {
        vec![
            RawTrackPoint::new(48.4050, 2.7010, 80.0),
            RawTrackPoint::new(48.40626, 2.7010, 95.5),
            RawTrackPoint::new(48.40752, 2.7010, 88.0),
            RawTrackPoint::new(48.40878, 2.7010, 102.2),
        ]
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = build_route("empty", &[]).unwrap_err();
        assert!(matches!(err, RouteError::EmptyInput));
    }

    #[test]
    fn test_cumulative_distance_is_non_decreasing() {
        let route = build_route("climb", &climb_points()).unwrap();
        let points = route.points();
        assert_eq!(points[0].distance_km, 0.0);
        for pair in points.windows(2) {
            assert!(pair[1].distance_km >= pair[0].distance_km);
        }
    }

    #[test]
    fn test_elevation_deltas_partition_into_gain_and_loss() {
        let route = build_route("climb", &climb_points()).unwrap();
        let stats = route.stats();
        // +15.5, -7.5, +14.2
        assert_eq!(stats.elevation_gain_m, 30);
        assert_eq!(stats.elevation_loss_m, 8);
        assert_eq!(stats.min_elevation_m, 80.0);
        assert_eq!(stats.max_elevation_m, 102.2);
    }

    #[test]
    fn test_min_elevation_includes_first_point() {
        let raw = vec![
            RawTrackPoint::new(48.4050, 2.7010, 12.0),
            RawTrackPoint::new(48.40626, 2.7010, 95.5),
        ];
        let route = build_route("start-low", &raw).unwrap();
        assert_eq!(route.stats().min_elevation_m, 12.0);
    }

    #[test]
    fn test_per_point_distance_is_rounded_to_three_decimals() {
        let route = build_route("climb", &climb_points()).unwrap();
        for point in route.points() {
            let scaled = point.distance_km * 1000.0;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_point_route_has_zero_distance() {
        let raw = vec![RawTrackPoint::new(48.4050, 2.7010, 80.0)];
        let route = build_route("single", &raw).unwrap();
        assert_eq!(route.points().len(), 1);
        assert_eq!(route.stats().total_distance_km, 0.0);
        assert_eq!(route.stats().elevation_gain_m, 0);
    }

    #[test]
    fn test_cache_builds_once_and_invalidates() {
        let cache = RouteCache::new();
        let mut builds = 0;

        for _ in 0..3 {
            let route = cache
                .get_or_build(|| {
                    builds += 1;
                    build_route("cached", &climb_points())
                })
                .unwrap();
            assert_eq!(route.name(), "cached");
        }
        assert_eq!(builds, 1);

        cache.invalidate();
        assert!(cache.get().is_none());
        cache
            .get_or_build(|| {
                builds += 1;
                build_route("cached", &climb_points())
            })
            .unwrap();
        assert_eq!(builds, 2);
    }

    #[test]
    fn test_cache_failed_build_leaves_cache_empty() {
        let cache = RouteCache::new();
        let err = cache.get_or_build(|| build_route("empty", &[])).unwrap_err();
        assert!(matches!(err, RouteError::EmptyInput));
        assert!(cache.get().is_none());
    }
}
