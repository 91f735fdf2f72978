//! GPX track-file adapter.
//!
//! A thin I/O layer: decodes a GPX document into the raw trackpoint contract
//! consumed by [`crate::build_route`]. Only the first track is used, all of
//! its segments concatenated; elevation defaults to 0 when absent and
//! non-finite values are skipped. No geometry lives here.

use std::io::Read;

use thiserror::Error;

use crate::RawTrackPoint;

/// Errors from GPX decoding.
#[derive(Debug, Error)]
pub enum GpxError {
    /// The document is not valid GPX.
    #[error("failed to parse GPX document: {0}")]
    Parse(#[from] gpx::errors::GpxError),
}

/// A decoded GPX track: the route-source contract of this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxTrack {
    /// Track name, falling back to the document metadata name.
    pub name: Option<String>,
    pub points: Vec<RawTrackPoint>,
}

/// Decode the first track of a GPX document into raw trackpoints.
///
/// A document without tracks yields an empty point list; rejecting that is
/// the route builder's job.
///
/// # Errors
///
/// Returns [`GpxError::Parse`] when the document is not valid GPX.
pub fn read_gpx_track(reader: impl Read) -> Result<GpxTrack, GpxError> {
    let document = gpx::read(std::io::BufReader::new(reader))?;

    let metadata_name = document.metadata.as_ref().and_then(|m| m.name.clone());
    let Some(track) = document.tracks.first() else {
        return Ok(GpxTrack {
            name: metadata_name,
            points: Vec::new(),
        });
    };

    let mut points = Vec::new();
    for segment in &track.segments {
        for waypoint in &segment.points {
            let lat = waypoint.point().y();
            let lon = waypoint.point().x();
            let elevation_m = waypoint.elevation.unwrap_or(0.0);
            if lat.is_finite() && lon.is_finite() && elevation_m.is_finite() {
                points.push(RawTrackPoint::new(lat, lon, elevation_m));
            }
        }
    }

    Ok(GpxTrack {
        name: track.name.clone().or(metadata_name),
        points,
    })
}
