use geo::{HaversineBearing, HaversineDistance, Point};
use serde::Serialize;

use crate::catalog::{LineGeometry, StopTime, TripID};
use crate::resolver::TripState;
use crate::Engine;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePosition {
    pub pos: Point<f64>,
    /// Forward azimuth in degrees from north.
    pub bearing_degrees: f64,
}

impl Engine {
    /// Geographic position for a state from `active_trips`. `None` when the
    /// state references a trip or stop the catalog dropped.
    pub fn position_of(&self, trip: &TripID, state: &TripState) -> Option<VehiclePosition> {
        let trip = self.catalog.trip_by_id(trip)?;
        match state {
            TripState::Dwell {
                stop,
                stop_sequence,
                ..
            } => {
                let here = self.catalog.stop_by_id(stop)?.pos;
                let bearing = self
                    .stop_position(trip.stop_times.get(*stop_sequence + 1))
                    .map(|next| here.haversine_bearing(next))
                    .unwrap_or(0.0);
                Some(VehiclePosition {
                    pos: here,
                    bearing_degrees: bearing,
                })
            }
            TripState::Move { from, to, progress } => {
                let from_pos = self.catalog.stop_by_id(from)?.pos;
                let to_pos = self.catalog.stop_by_id(to)?.pos;
                let geometry = self.catalog.geometry_for_route(&trip.route_id);
                let pos = geometry
                    .and_then(|geometry| along_geometry(geometry, from_pos, to_pos, *progress))
                    .unwrap_or_else(|| lerp(from_pos, to_pos, *progress));
                Some(VehiclePosition {
                    pos,
                    bearing_degrees: from_pos.haversine_bearing(to_pos),
                })
            }
        }
    }

    fn stop_position(&self, stop_time: Option<&StopTime>) -> Option<Point<f64>> {
        Some(self.catalog.stop_by_id(&stop_time?.stop_id)?.pos)
    }
}

fn lerp(a: Point<f64>, b: Point<f64>, fraction: f64) -> Point<f64> {
    let f = fraction.clamp(0.0, 1.0);
    Point::new(a.x() + (b.x() - a.x()) * f, a.y() + (b.y() - a.y()) * f)
}

/// Walks the route polyline between the vertices nearest each stop and picks
/// the point at `progress` of the slice's arc length. Returns `None` for
/// degenerate slices so the caller can fall back to a straight lerp. Loop
/// routes can snap both stops to the same arm; that also lands in the
/// fallback.
fn along_geometry(
    geometry: &LineGeometry,
    from: Point<f64>,
    to: Point<f64>,
    progress: f64,
) -> Option<Point<f64>> {
    let start = geometry.nearest_vertex(from)?;
    let end = geometry.nearest_vertex(to)?;
    if start == end {
        return None;
    }
    let slice: Vec<Point<f64>> = if start < end {
        geometry.points[start..=end].to_vec()
    } else {
        let mut reversed = geometry.points[end..=start].to_vec();
        reversed.reverse();
        reversed
    };

    let mut cumulative = Vec::with_capacity(slice.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for pair in slice.windows(2) {
        total += pair[0].haversine_distance(&pair[1]);
        cumulative.push(total);
    }
    if total <= 0.0 {
        return None;
    }

    let target = progress.clamp(0.0, 1.0) * total;
    for i in 1..slice.len() {
        if cumulative[i] >= target {
            let span = cumulative[i] - cumulative[i - 1];
            if span <= 0.0 {
                return Some(slice[i]);
            }
            let f = (target - cumulative[i - 1]) / span;
            return Some(lerp(slice[i - 1], slice[i], f));
        }
    }
    slice.last().copied()
}
