//! # Route POIs
//!
//! GPS route statistics and points-of-interest matching along a track.
//!
//! This library ingests a GPS track, derives cumulative-distance and elevation
//! statistics along it, and enriches it with points of interest (water,
//! bars/cafes, food shops) fetched from the Overpass API, matched and
//! deduplicated against the route.
//!
//! ## Features
//!
//! - **`http`** *(default)* - reqwest-backed Overpass fetcher with endpoint
//!   fallback, retry and timeout
//! - **`gpx-io`** *(default)* - GPX track-file adapter
//!
//! ## Quick Start
//!
//! ```rust
//! use route_pois::{RawTrackPoint, build_route};
//!
//! let raw = vec![
//!     RawTrackPoint::new(48.4050, 2.7010, 80.0),
//!     RawTrackPoint::new(48.4062, 2.7010, 84.5),
//!     RawTrackPoint::new(48.4075, 2.7010, 82.0),
//! ];
//!
//! let route = build_route("Day 1", &raw).unwrap();
//! assert_eq!(route.points().len(), 3);
//! assert!(route.stats().total_distance_km > 0.0);
//! ```

use serde::{Deserialize, Serialize};

pub mod api;
pub mod geo_utils;
pub mod overpass;
pub mod route;

// GPX track-file adapter
#[cfg(feature = "gpx-io")]
pub mod gpx;

// Reqwest-backed Overpass fetcher
#[cfg(feature = "http")]
pub mod http;

pub use api::{
    clamp_radius_km, ErrorPayload, PoisMeta, PoisPayload, RoutePayload, DEFAULT_RADIUS_KM,
};
pub use overpass::{
    category_from_tags, find_pois_near_route, FetchError, Poi, PoiCategory, PoiError, PoiFetcher,
    RawElement,
};
pub use route::{build_route, RouteCache, RouteError};

#[cfg(feature = "gpx-io")]
pub use gpx::{read_gpx_track, GpxError, GpxTrack};

#[cfg(feature = "http")]
pub use http::OverpassFetcher;

// ============================================================================
// Core Types
// ============================================================================

/// A bare geographic coordinate used for queries against a route.
///
/// # Example
/// ```
/// use route_pois::GeoPoint;
/// let point = GeoPoint::new(48.4053, 2.7016);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A raw trackpoint as supplied by a route source (GPX file or equivalent).
///
/// Elevation defaults to 0 when absent in the source format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation_m: f64,
}

impl RawTrackPoint {
    /// Create a new raw trackpoint.
    pub fn new(lat: f64, lon: f64, elevation_m: f64) -> Self {
        Self {
            lat,
            lon,
            elevation_m,
        }
    }
}

/// A normalized route point with cumulative distance from the start.
///
/// `distance_km` is cumulative from index 0, monotonically non-decreasing and
/// rounded to 3 decimal places. The index within [`Route::points`] is the
/// canonical identity of a point; points are never reordered after
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "ele")]
    pub elevation_m: f64,
    #[serde(rename = "distKm")]
    pub distance_km: f64,
}

impl RoutePoint {
    /// The bare coordinate of this route point.
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Aggregate statistics for a route, derived once at construction.
///
/// Total distance is rounded to 1 decimal place, gain/loss to whole meters,
/// min/max elevation to 1 decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    #[serde(rename = "distanceKm")]
    pub total_distance_km: f64,
    #[serde(rename = "gainM")]
    pub elevation_gain_m: i64,
    #[serde(rename = "lossM")]
    pub elevation_loss_m: i64,
    #[serde(rename = "minEle")]
    pub min_elevation_m: f64,
    #[serde(rename = "maxEle")]
    pub max_elevation_m: f64,
}

/// A normalized, distance-annotated GPS track.
///
/// Invariants: `points` is non-empty ([`build_route`] fails otherwise) and
/// `stats` is a pure function of `points`. A route is immutable after
/// construction, which is what makes the process-wide [`RouteCache`] safe to
/// read concurrently without locking.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    name: String,
    points: Vec<RoutePoint>,
    stats: RouteStats,
}

impl Route {
    pub(crate) fn new(name: String, points: Vec<RoutePoint>, stats: RouteStats) -> Self {
        Self {
            name,
            points,
            stats,
        }
    }

    /// The route name, as supplied by the route source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered, distance-annotated route points.
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// The derived route statistics.
    pub fn stats(&self) -> &RouteStats {
        &self.stats
    }
}

/// Result of projecting a geographic point onto a route.
///
/// `index` is the route sample the point snaps to: the haversine-closer
/// *endpoint* of the closest segment, not the exact geometric projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestOnRoute {
    /// Index into [`Route::points`] of the snapped route sample.
    pub index: usize,
    /// Distance from the query point to the nearest route segment, in meters.
    pub distance_meters: f64,
    /// Cumulative route distance of the snapped sample, in kilometers.
    pub along_route_km: f64,
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    /// A short straight north-bound route with three points ~140 m apart.
    pub fn three_point_route() -> Route {
        let raw = vec![
            RawTrackPoint::new(48.4050, 2.7010, 80.0),
            RawTrackPoint::new(48.40626, 2.7010, 84.5),
            RawTrackPoint::new(48.40752, 2.7010, 82.0),
        ];
        build_route("fixture", &raw).unwrap()
    }
}
