use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::{MasterStop, RouteID, StopID, TripID};
use crate::time::Time;
use crate::Engine;

/// One row of a stop's departure board, enriched with route branding and the
/// trip's terminus.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub time: Time,
    pub route: RouteID,
    pub route_short_name: String,
    pub route_color: String,
    pub route_text_color: String,
    pub headsign: Option<String>,
    pub destination: String,
    pub trip: TripID,
}

const DEFAULT_ROUTE_COLOR: &str = "FFFFFF";
const DEFAULT_ROUTE_TEXT_COLOR: &str = "000000";

impl Engine {
    /// The next `limit` departures at or after `now` from a master stop and
    /// all its platforms, soonest first. Calls where the trip terminates are
    /// not departures and are left out.
    pub fn upcoming_departures(
        &self,
        master: &StopID,
        date: NaiveDate,
        now: Time,
        limit: usize,
    ) -> Vec<Departure> {
        let active = self.catalog.calendar.services_on_date(date);
        let mut rows = Vec::new();
        for stop_id in self.catalog.children_of_master(master) {
            for event in self.catalog.events_at_stop(stop_id) {
                if event.departure < now {
                    continue;
                }
                let Some(trip) = self.catalog.trip_by_id(&event.trip) else {
                    continue;
                };
                if !active.contains(&trip.service_id) {
                    continue;
                }
                if event.stop_sequence + 1 == trip.stop_times.len() {
                    continue;
                }

                let (route_short_name, route_color, route_text_color) =
                    match self.catalog.route_by_id(&trip.route_id) {
                        Some(route) => (
                            route
                                .short_name
                                .clone()
                                .unwrap_or_else(|| route.describe()),
                            route
                                .color
                                .clone()
                                .unwrap_or_else(|| DEFAULT_ROUTE_COLOR.to_string()),
                            route
                                .text_color
                                .clone()
                                .unwrap_or_else(|| DEFAULT_ROUTE_TEXT_COLOR.to_string()),
                        ),
                        None => (
                            trip.route_id.as_str().to_string(),
                            DEFAULT_ROUTE_COLOR.to_string(),
                            DEFAULT_ROUTE_TEXT_COLOR.to_string(),
                        ),
                    };
                let destination = trip
                    .stop_times
                    .last()
                    .map(|st| match self.catalog.stop_by_id(&st.stop_id) {
                        Some(stop) => stop.display_name(),
                        None => st.stop_id.as_str().to_string(),
                    })
                    .unwrap_or_default();

                rows.push(Departure {
                    time: event.departure,
                    route: trip.route_id.clone(),
                    route_short_name,
                    route_color,
                    route_text_color,
                    headsign: trip.headsign.clone(),
                    destination,
                    trip: trip.trip_id.clone(),
                });
            }
        }
        rows.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.trip.cmp(&b.trip)));
        rows.truncate(limit);
        rows
    }

    /// Case-insensitive prefix search over master-stop names.
    pub fn search_stops_by_name_prefix(&self, query: &str, limit: usize) -> Vec<&MasterStop> {
        let needle = query.to_lowercase();
        self.catalog
            .master_stops()
            .iter()
            .filter(|master| master.name.to_lowercase().starts_with(&needle))
            .take(limit)
            .collect()
    }
}
