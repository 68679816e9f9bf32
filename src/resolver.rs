use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::{StopID, StopTime, TripID};
use crate::time::Time;
use crate::Engine;

/// Where a vehicle is within its trip at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TripState {
    /// Stationary at a stop, waiting for its scheduled departure.
    /// `stop_sequence` is the index of this call within the trip, so a trip
    /// visiting the same stop twice keeps its two dwells apart.
    #[serde(rename_all = "camelCase")]
    Dwell {
        stop: StopID,
        stop_sequence: usize,
        next_departure: Time,
    },
    /// Underway between two consecutive stops; `progress` is the scheduled
    /// fraction of the hop covered, in [0, 1].
    #[serde(rename_all = "camelCase")]
    Move {
        from: StopID,
        to: StopID,
        progress: f64,
    },
}

impl Engine {
    /// Every trip in service at `t` on `date`, with its momentary state. A
    /// trip is live from its first departure through its last arrival, and
    /// maps to exactly one state for every second of that window.
    pub fn active_trips(&self, date: NaiveDate, t: Time) -> Vec<(TripID, TripState)> {
        let active = self.catalog.calendar.services_on_date(date);
        let mut live = Vec::new();
        for trip in self.catalog.trips() {
            if !active.contains(&trip.service_id) {
                continue;
            }
            if t < trip.first_departure() || trip.last_arrival() < t {
                continue;
            }
            if let Some(state) = state_at(&trip.stop_times, t) {
                live.push((trip.trip_id.clone(), state));
            }
        }
        live
    }
}

/// The dwell test runs before the move test at each stop, so the boundary
/// second `t == arrival` belongs to the dwell whenever the vehicle actually
/// waits there. A zero-length dwell never matches; the hop into that stop
/// claims its arrival second with progress 1 instead.
fn state_at(stop_times: &[StopTime], t: Time) -> Option<TripState> {
    let first = &stop_times[0];
    if first.arrival_time <= t && t <= first.departure_time {
        return Some(TripState::Dwell {
            stop: first.stop_id.clone(),
            stop_sequence: 0,
            next_departure: first.departure_time,
        });
    }
    for i in 1..stop_times.len() {
        let prev = &stop_times[i - 1];
        let here = &stop_times[i];
        if here.arrival_time < here.departure_time
            && here.arrival_time <= t
            && t <= here.departure_time
        {
            return Some(TripState::Dwell {
                stop: here.stop_id.clone(),
                stop_sequence: i,
                next_departure: here.departure_time,
            });
        }
        if prev.departure_time < t && t <= here.arrival_time {
            let hop = here.arrival_time.seconds_since(prev.departure_time).max(1);
            let progress = t.seconds_since(prev.departure_time) as f64 / hop as f64;
            return Some(TripState::Move {
                from: prev.stop_id.clone(),
                to: here.stop_id.clone(),
                progress,
            });
        }
    }
    None
}
