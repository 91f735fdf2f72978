//! Boundary payload contracts.
//!
//! Wire shapes and parameter normalization for whatever HTTP layer composes
//! this crate. Routing itself stays outside: these helpers only build the
//! payloads and normalize the one query parameter the POI endpoint takes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Poi, Route, RoutePoint, RouteStats};

/// Radius applied when the request omits one or sends a non-finite value.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
const MIN_RADIUS_KM: f64 = 1.0;
const MAX_RADIUS_KM: f64 = 10.0;

/// Normalize a requested POI radius.
///
/// Absent or non-finite values fall back to [`DEFAULT_RADIUS_KM`]; everything
/// else is rounded to one decimal and clamped to `[1, 10]` km.
///
/// # Example
/// ```
/// use route_pois::clamp_radius_km;
///
/// assert_eq!(clamp_radius_km(Some(20.0)), 10.0);
/// assert_eq!(clamp_radius_km(Some(f64::NAN)), 5.0);
/// assert_eq!(clamp_radius_km(None), 5.0);
/// ```
pub fn clamp_radius_km(raw: Option<f64>) -> f64 {
    let Some(value) = raw else {
        return DEFAULT_RADIUS_KM;
    };
    if !value.is_finite() {
        return DEFAULT_RADIUS_KM;
    }
    let rounded = (value * 10.0).round() / 10.0;
    rounded.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM)
}

/// Successful route response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePayload {
    pub route_name: String,
    pub points: Vec<RoutePoint>,
    pub stats: RouteStats,
}

impl RoutePayload {
    /// Build the wire payload for a route.
    pub fn from_route(route: &Route) -> Self {
        Self {
            route_name: route.name().to_string(),
            points: route.points().to_vec(),
            stats: *route.stats(),
        }
    }
}

/// Error-only payload, served with a server-fault status when the route
/// itself cannot be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

impl ErrorPayload {
    /// Build an error payload from any displayable error.
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Meta block attached to every POI response, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoisMeta {
    pub radius_km: f64,
    /// Always `"overpass"`; identifies the upstream geodata source.
    pub source: String,
    /// UTC timestamp of the fetch, serialized as ISO-8601.
    pub fetched_at: DateTime<Utc>,
}

impl PoisMeta {
    fn now(radius_km: f64) -> Self {
        Self {
            radius_km,
            source: "overpass".to_string(),
            fetched_at: Utc::now(),
        }
    }
}

/// POI response payload.
///
/// On total source failure the payload still carries the meta block plus an
/// `error` message and an empty POI list; the caller serves it with a
/// 503-equivalent status instead of omitting the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoisPayload {
    pub pois: Vec<Poi>,
    pub meta: PoisMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PoisPayload {
    /// Build the success payload.
    pub fn success(pois: Vec<Poi>, radius_km: f64) -> Self {
        Self {
            pois,
            meta: PoisMeta::now(radius_km),
            error: None,
        }
    }

    /// Build the total-failure payload.
    pub fn failure(radius_km: f64, message: impl Into<String>) -> Self {
        Self {
            pois: Vec::new(),
            meta: PoisMeta::now(radius_km),
            error: Some(message.into()),
        }
    }
}
