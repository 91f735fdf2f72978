//! # POI Matching Engine
//!
//! Matches Overpass-sourced points of interest against a route.
//!
//! The engine samples the route at a fixed distance step to bound query
//! fan-out, chunks the samples into fixed-size batches, fetches each batch
//! through an injected [`PoiFetcher`], then classifies, filters, deduplicates
//! and orders the raw elements:
//!
//! 1. resolve each element's coordinate (direct, `center`, or geometry mean)
//! 2. classify its tags into a [`PoiCategory`] (unclassifiable elements drop)
//! 3. snap it to the route and drop it when farther than the query radius
//! 4. dedup by `"{type}/{id}"`, last write wins
//! 5. sort ascending by along-route distance
//!
//! A batch whose fetch exhausts every endpoint is skipped, not fatal; the call
//! fails only when *every* batch fails.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo_utils::{nearest_point_on_route, sample_route_points_by_distance};
use crate::{GeoPoint, Route, RoutePoint};

/// Along-route interval between spatial query anchor points, in kilometers.
pub const SAMPLE_STEP_KM: f64 = 3.0;
/// Sampled points per Overpass query, bounding the query size.
pub const BATCH_SIZE: usize = 18;

/// Timeout directive embedded in the Overpass query text, in seconds.
const OVERPASS_QUERY_TIMEOUT_SECONDS: u32 = 45;

const UNNAMED_POI: &str = "Unnamed";

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by a [`PoiFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// A retryable condition from one endpoint. Absorbed by the orchestrator's
    /// retry/backoff loop; callers of [`PoiFetcher::fetch_batch`] never see it.
    #[error("transient failure from {endpoint}: {detail}")]
    Transient { endpoint: String, detail: String },
    /// Every endpoint/attempt combination failed for one batch.
    #[error("all endpoints exhausted ({last})")]
    AllEndpointsExhausted { last: String },
}

/// Errors surfaced by [`find_pois_near_route`].
#[derive(Debug, Error)]
pub enum PoiError {
    /// Every batch failed; no POI data could be fetched at all.
    #[error("POI source unavailable ({last})")]
    AllSourcesUnavailable { last: String },
}

// ============================================================================
// Data Model
// ============================================================================

/// Closed set of POI categories surfaced along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiCategory {
    Water,
    Bar,
    FoodShop,
}

/// A raw element as returned by the Overpass API.
///
/// Coordinate resolution is positional: direct `lat`/`lon` for nodes, the
/// precomputed `center` for ways, or the arithmetic mean of an attached
/// `geometry` outline as a last resort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<GeoPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// A point of interest matched against the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    /// Stable identity key, `"{type}/{id}"` of the source element.
    pub id: String,
    pub category: PoiCategory,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub tags: HashMap<String, String>,
    /// Distance from the POI to the nearest route segment, in kilometers.
    #[serde(rename = "distToTraceKm")]
    pub distance_to_route_km: f64,
    /// Along-route distance of the route sample the POI snaps to.
    #[serde(rename = "nearestTraceDistKm")]
    pub along_route_km: f64,
}

/// Collaborator that fetches one batch query against the external POI source.
///
/// Implementations own all transport detail (endpoints, retry, timeout) and
/// know nothing about routes or categories. The reqwest-backed implementation
/// lives in [`crate::http`]; tests inject mocks.
#[async_trait]
pub trait PoiFetcher: Send + Sync {
    /// Fetch the raw elements for one batch query.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AllEndpointsExhausted`] when every endpoint and
    /// attempt failed for this batch.
    async fn fetch_batch(&self, query: &str) -> Result<Vec<RawElement>, FetchError>;
}

// ============================================================================
// Classification and Coordinate Resolution
// ============================================================================

/// Classify an element's tags into a [`PoiCategory`].
///
/// Pure and total: exact-match lookups against a fixed vocabulary, `None` for
/// everything else.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use route_pois::{category_from_tags, PoiCategory};
///
/// let tags = HashMap::from([("amenity".to_string(), "fountain".to_string())]);
/// assert_eq!(category_from_tags(&tags), Some(PoiCategory::Water));
/// ```
pub fn category_from_tags(tags: &HashMap<String, String>) -> Option<PoiCategory> {
    match tags.get("amenity").map(String::as_str) {
        Some("drinking_water") | Some("fountain") => return Some(PoiCategory::Water),
        Some("bar") | Some("pub") | Some("cafe") => return Some(PoiCategory::Bar),
        _ => {}
    }

    match tags.get("shop").map(String::as_str) {
        Some("supermarket") | Some("convenience") | Some("bakery") | Some("butcher") => {
            Some(PoiCategory::FoodShop)
        }
        _ => None,
    }
}

/// Resolve an element's coordinate, or `None` when it has no position at all.
pub fn element_coordinates(element: &RawElement) -> Option<GeoPoint> {
    if let (Some(lat), Some(lon)) = (element.lat, element.lon) {
        return Some(GeoPoint::new(lat, lon));
    }

    if let Some(center) = element.center {
        return Some(center);
    }

    let geometry = element.geometry.as_deref()?;
    if geometry.is_empty() {
        return None;
    }

    let (lat_sum, lon_sum) = geometry
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    let count = geometry.len() as f64;
    Some(GeoPoint::new(lat_sum / count, lon_sum / count))
}

// ============================================================================
// Query Building
// ============================================================================

/// Build one Overpass QL batch query.
///
/// Collects nodes and ways within `radius_meters` of every sampled point into
/// a set, then filters the set down to the category vocabulary. `out center`
/// makes Overpass attach a centroid to ways.
pub fn build_overpass_query(sampled_points: &[GeoPoint], radius_meters: u32) -> String {
    let around_clauses = sampled_points
        .iter()
        .map(|point| {
            format!(
                "node(around:{radius_meters},{lat},{lon});way(around:{radius_meters},{lat},{lon});",
                lat = point.lat,
                lon = point.lon,
            )
        })
        .collect::<Vec<_>>()
        .join("\n  ");

    format!(
        r#"[out:json][timeout:{timeout}];
(
  {around_clauses}
)->.all;
(
  node.all["amenity"="drinking_water"];
  node.all["amenity"="fountain"];
  way.all["amenity"="drinking_water"];
  way.all["amenity"="fountain"];
  node.all["amenity"~"^(bar|pub|cafe)$"];
  node.all["shop"~"^(supermarket|convenience|bakery|butcher)$"];
  way.all["amenity"~"^(bar|pub|cafe)$"];
  way.all["shop"~"^(supermarket|convenience|bakery|butcher)$"];
);
out center tags;"#,
        timeout = OVERPASS_QUERY_TIMEOUT_SECONDS,
    )
}

// ============================================================================
// Matching
// ============================================================================

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Find all POIs within `radius_km` of the route, ordered along the trip.
///
/// Samples the route every [`SAMPLE_STEP_KM`] kilometers, queries the POI
/// source in batches of [`BATCH_SIZE`] anchor points, and matches the raw
/// results back against the **full** route. The spatial queries are anchored
/// on samples and may over-return, so elements are re-filtered against
/// `radius_km` using the exact point-to-route distance.
///
/// Batches that exhaust every endpoint are skipped so a single flaky request
/// degrades the result instead of failing it.
///
/// # Errors
///
/// Returns [`PoiError::AllSourcesUnavailable`] only when every batch failed.
pub async fn find_pois_near_route(
    route: &Route,
    radius_km: f64,
    fetcher: &dyn PoiFetcher,
) -> Result<Vec<Poi>, PoiError> {
    let sampled: Vec<GeoPoint> = sample_route_points_by_distance(route.points(), SAMPLE_STEP_KM)
        .iter()
        .map(RoutePoint::geo)
        .collect();
    let radius_meters = (radius_km * 1000.0).round() as u32;
    let batch_count = sampled.chunks(BATCH_SIZE).count();

    debug!(
        "querying {} sampled points in {} batches (radius {} m)",
        sampled.len(),
        batch_count,
        radius_meters
    );

    let mut elements: Vec<RawElement> = Vec::new();
    let mut successful_batches = 0usize;
    let mut last_failure: Option<String> = None;

    for (batch_index, batch) in sampled.chunks(BATCH_SIZE).enumerate() {
        let query = build_overpass_query(batch, radius_meters);
        match fetcher.fetch_batch(&query).await {
            Ok(mut batch_elements) => {
                debug!(
                    "batch {}/{}: {} elements",
                    batch_index + 1,
                    batch_count,
                    batch_elements.len()
                );
                elements.append(&mut batch_elements);
                successful_batches += 1;
            }
            Err(err) => {
                // Keep going: POIs from the other batches still make a
                // useful, if partial, answer.
                warn!(
                    "batch {}/{} failed, skipping: {err}",
                    batch_index + 1,
                    batch_count
                );
                last_failure = Some(err.to_string());
            }
        }
    }

    if successful_batches == 0 {
        return Err(PoiError::AllSourcesUnavailable {
            last: last_failure.unwrap_or_else(|| "no endpoint produced a response".to_string()),
        });
    }

    let mut dedup: HashMap<String, Poi> = HashMap::new();

    for element in elements {
        let tags = element.tags.clone().unwrap_or_default();
        let Some(category) = category_from_tags(&tags) else {
            continue;
        };
        let Some(coords) = element_coordinates(&element) else {
            continue;
        };

        let nearest = nearest_point_on_route(route.points(), coords);
        let distance_to_route_km = nearest.distance_meters / 1000.0;
        if distance_to_route_km > radius_km {
            continue;
        }

        let key = format!("{}/{}", element.element_type, element.id);
        let name = tags
            .get("name")
            .cloned()
            .unwrap_or_else(|| UNNAMED_POI.to_string());

        dedup.insert(
            key.clone(),
            Poi {
                id: key,
                category,
                name,
                lat: coords.lat,
                lon: coords.lon,
                tags,
                distance_to_route_km: round2(distance_to_route_km),
                along_route_km: round2(nearest.along_route_km),
            },
        );
    }

    let mut pois: Vec<Poi> = dedup.into_values().collect();
    pois.sort_by(|a, b| a.along_route_km.total_cmp(&b.along_route_km));

    debug!("{} POIs after dedup and radius filter", pois.len());
    Ok(pois)
}
