mod calendar;
mod geometry;
mod routes;
mod stop_times;
mod stops;
mod trips;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use geo::Point;
use serde::Serialize;

use crate::error::FeedError;
use crate::time::Time;

pub use calendar::{Calendar, Service, ServiceID, ServiceRule};
pub use geometry::LineGeometry;
pub use routes::{Route, RouteID};
pub use stop_times::StopTime;
pub use stops::{Stop, StopID};
pub use trips::{Trip, TripID};

/// One scheduled call, as seen from the stop's side of the inverted index.
#[derive(Clone, Debug)]
pub struct StopEvent {
    pub trip: TripID,
    /// Index into the trip's ordered stop_times.
    pub stop_sequence: usize,
    pub arrival: Time,
    pub departure: Time,
}

/// The stop the planner and UI reason over: a station container, or a stop
/// with no parent. Platforms aggregate under their station.
#[derive(Clone, Debug, Serialize)]
pub struct MasterStop {
    pub id: StopID,
    pub name: String,
    pub pos: Point<f64>,
}

/// Everything the feed said, indexed for queries and immutable afterwards.
pub struct Catalog {
    routes: BTreeMap<RouteID, Route>,
    trips: BTreeMap<TripID, Trip>,
    stops: BTreeMap<StopID, Stop>,
    pub calendar: Calendar,
    geometries: BTreeMap<RouteID, LineGeometry>,

    events_per_stop: BTreeMap<StopID, Vec<StopEvent>>,
    masters: Vec<MasterStop>,
    master_index: BTreeMap<StopID, usize>,
    children: Vec<Vec<StopID>>,
    master_of_stop: BTreeMap<StopID, usize>,
}

impl Catalog {
    /// Reads the six GTFS tables (all required) and `map.geojson` (optional)
    /// from a directory, then indexes them.
    pub fn load_from_dir(dir: &Path) -> Result<Self, FeedError> {
        let routes = routes::load(open(dir, "routes.txt")?)
            .map_err(|err| FeedError::malformed("routes.txt", err))?;
        let (stops, dropped_stops) = stops::load(open(dir, "stops.txt")?)
            .map_err(|err| FeedError::malformed("stops.txt", err))?;
        let mut trips = trips::load(open(dir, "trips.txt")?)
            .map_err(|err| FeedError::malformed("trips.txt", err))?;
        let mut stop_times = stop_times::load(open(dir, "stop_times.txt")?)
            .map_err(|err| FeedError::malformed("stop_times.txt", err))?;
        let mut calendar = calendar::load(open(dir, "calendar.txt")?)
            .map_err(|err| FeedError::malformed("calendar.txt", err))?;
        calendar::load_exceptions(&mut calendar, open(dir, "calendar_dates.txt")?)
            .map_err(|err| FeedError::malformed("calendar_dates.txt", err))?;

        let geometries = match File::open(dir.join("map.geojson")) {
            Ok(file) => match geometry::load(file) {
                Ok(geometries) => geometries,
                Err(err) => {
                    warn!("map.geojson unusable, arc interpolation disabled: {err:#}");
                    BTreeMap::new()
                }
            },
            Err(_) => {
                warn!("No map.geojson, arc interpolation disabled");
                BTreeMap::new()
            }
        };

        for trip in trips.values_mut() {
            if let Some(list) = stop_times.remove(&trip.trip_id) {
                trip.stop_times = list;
            }
        }
        if !stop_times.is_empty() {
            warn!(
                "Stop times defined for unknown trips: {:?}",
                stop_times.keys()
            );
        }

        Self::build(routes, trips, stops, dropped_stops, calendar, geometries)
    }

    /// Indexes an already-parsed feed. Trips must carry their stop_times.
    pub fn build(
        routes: BTreeMap<RouteID, Route>,
        mut trips: BTreeMap<TripID, Trip>,
        stops: BTreeMap<StopID, Stop>,
        dropped_stops: BTreeSet<StopID>,
        calendar: Calendar,
        mut geometries: BTreeMap<RouteID, LineGeometry>,
    ) -> Result<Self, FeedError> {
        // References must resolve before anything else is derived.
        for trip in trips.values() {
            if !routes.contains_key(&trip.route_id) {
                return Err(FeedError::Malformed {
                    file: "trips.txt".to_string(),
                    message: format!(
                        "trip {} references unknown route {}",
                        trip.trip_id.as_str(),
                        trip.route_id.as_str()
                    ),
                });
            }
            for st in &trip.stop_times {
                if !stops.contains_key(&st.stop_id) && !dropped_stops.contains(&st.stop_id) {
                    return Err(FeedError::Malformed {
                        file: "stop_times.txt".to_string(),
                        message: format!(
                            "trip {} calls at unknown stop {}",
                            trip.trip_id.as_str(),
                            st.stop_id.as_str()
                        ),
                    });
                }
            }
        }

        // Drop trips with no usable schedule rather than failing the load.
        let inconsistent: Vec<TripID> = trips
            .values()
            .filter(|trip| !consistent_schedule(&trip.stop_times))
            .map(|trip| trip.trip_id.clone())
            .collect();
        for trip_id in inconsistent {
            warn!("Dropping {:?}: empty or non-monotonic schedule", trip_id);
            trips.remove(&trip_id);
        }

        let unknown_geometries: Vec<RouteID> = geometries
            .keys()
            .filter(|route_id| !routes.contains_key(*route_id))
            .cloned()
            .collect();
        for route_id in unknown_geometries {
            warn!("Dropping geometry for unknown route {:?}", route_id);
            geometries.remove(&route_id);
        }

        let mut events_per_stop: BTreeMap<StopID, Vec<StopEvent>> = BTreeMap::new();
        for trip in trips.values() {
            for (idx, st) in trip.stop_times.iter().enumerate() {
                events_per_stop
                    .entry(st.stop_id.clone())
                    .or_insert_with(Vec::new)
                    .push(StopEvent {
                        trip: trip.trip_id.clone(),
                        stop_sequence: idx,
                        arrival: st.arrival_time,
                        departure: st.departure_time,
                    });
            }
        }

        // Master grouping. Stations first so platforms can attach to them;
        // everything unattached masters itself.
        let mut masters = Vec::new();
        let mut master_index = BTreeMap::new();
        let mut children: Vec<Vec<StopID>> = Vec::new();
        let mut master_of_stop = BTreeMap::new();

        for stop in stops.values() {
            if stop.is_station {
                master_index.insert(stop.stop_id.clone(), masters.len());
                master_of_stop.insert(stop.stop_id.clone(), masters.len());
                children.push(vec![stop.stop_id.clone()]);
                masters.push(MasterStop {
                    id: stop.stop_id.clone(),
                    name: stop.display_name(),
                    pos: stop.pos,
                });
            }
        }
        for stop in stops.values() {
            if stop.is_station {
                continue;
            }
            let station_parent = stop
                .parent
                .as_ref()
                .and_then(|parent| stops.get(parent))
                .filter(|parent| parent.is_station)
                .and_then(|parent| master_index.get(&parent.stop_id).copied());
            let idx = match station_parent {
                Some(idx) => idx,
                None => {
                    if let Some(parent) = &stop.parent {
                        warn!(
                            "{:?} references missing or non-station parent {:?}; treating it as its own master",
                            stop.stop_id, parent
                        );
                    }
                    master_index.insert(stop.stop_id.clone(), masters.len());
                    children.push(Vec::new());
                    masters.push(MasterStop {
                        id: stop.stop_id.clone(),
                        name: stop.display_name(),
                        pos: stop.pos,
                    });
                    masters.len() - 1
                }
            };
            children[idx].push(stop.stop_id.clone());
            master_of_stop.insert(stop.stop_id.clone(), idx);
        }

        info!(
            "Catalog: {} routes, {} trips, {} stops under {} masters",
            routes.len(),
            trips.len(),
            stops.len(),
            masters.len()
        );

        Ok(Self {
            routes,
            trips,
            stops,
            calendar,
            geometries,
            events_per_stop,
            masters,
            master_index,
            children,
            master_of_stop,
        })
    }

    pub fn route_by_id(&self, id: &RouteID) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn stop_by_id(&self, id: &StopID) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn trip_by_id(&self, id: &TripID) -> Option<&Trip> {
        self.trips.get(id)
    }

    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.values()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    /// Ordered calls of a trip; empty for an unknown trip.
    pub fn stop_times_of_trip(&self, id: &TripID) -> &[StopTime] {
        self.trips
            .get(id)
            .map(|trip| trip.stop_times.as_slice())
            .unwrap_or(&[])
    }

    /// Every scheduled call at one physical stop, in no particular order.
    pub fn events_at_stop(&self, id: &StopID) -> &[StopEvent] {
        self.events_per_stop
            .get(id)
            .map(|events| events.as_slice())
            .unwrap_or(&[])
    }

    pub fn master_stops(&self) -> &[MasterStop] {
        &self.masters
    }

    pub fn master_by_id(&self, id: &StopID) -> Option<&MasterStop> {
        self.master_index.get(id).map(|idx| &self.masters[*idx])
    }

    /// Index into `master_stops` for the master a stop aggregates under.
    pub fn master_of_stop(&self, id: &StopID) -> Option<usize> {
        self.master_of_stop.get(id).copied()
    }

    /// Child stop ids of a master, the master itself included.
    pub fn children_of_master(&self, id: &StopID) -> &[StopID] {
        self.master_index
            .get(id)
            .map(|idx| self.children[*idx].as_slice())
            .unwrap_or(&[])
    }

    pub fn children_of_master_index(&self, master: usize) -> &[StopID] {
        &self.children[master]
    }

    pub fn geometry_for_route(&self, id: &RouteID) -> Option<&LineGeometry> {
        self.geometries.get(id)
    }
}

fn open(dir: &Path, name: &str) -> Result<File, FeedError> {
    File::open(dir.join(name)).map_err(|_| FeedError::Missing(name.to_string()))
}

/// Non-empty, departure ≥ arrival at each call, times never going backwards
/// between calls.
fn consistent_schedule(stop_times: &[StopTime]) -> bool {
    if stop_times.is_empty() {
        return false;
    }
    for st in stop_times {
        if st.departure_time < st.arrival_time {
            return false;
        }
    }
    stop_times
        .windows(2)
        .all(|pair| pair[1].arrival_time >= pair[0].departure_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn groups_platforms_under_their_station() {
        let catalog = testutil::catalog(
            vec![testutil::route("R1")],
            vec![testutil::trip(
                "T1",
                "R1",
                "ALL",
                &[("P1", "08:00:00", "08:00:00"), ("Z", "08:10:00", "08:10:00")],
            )],
            vec![
                testutil::station("STN", 11.5, 48.1),
                testutil::platform("P1", "STN", 11.5001, 48.1001),
                testutil::platform("P2", "STN", 11.5002, 48.1002),
                testutil::stop("Z", 11.6, 48.2),
            ],
        );

        let masters: Vec<&str> = catalog
            .master_stops()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(masters, vec!["STN", "Z"]);

        let children: Vec<&str> = catalog
            .children_of_master(&StopID::new("STN"))
            .iter()
            .map(|id| id.as_str())
            .collect();
        assert_eq!(children, vec!["STN", "P1", "P2"]);

        let stn = catalog.master_of_stop(&StopID::new("STN")).unwrap();
        assert_eq!(catalog.master_of_stop(&StopID::new("P1")), Some(stn));
        assert_eq!(catalog.master_of_stop(&StopID::new("P2")), Some(stn));
        assert_ne!(catalog.master_of_stop(&StopID::new("Z")), Some(stn));
    }

    #[test]
    fn orphaned_platform_masters_itself() {
        let catalog = testutil::catalog(
            vec![testutil::route("R1")],
            vec![testutil::trip(
                "T1",
                "R1",
                "ALL",
                &[("A", "08:00:00", "08:00:00"), ("B", "08:10:00", "08:10:00")],
            )],
            vec![
                testutil::platform("A", "GHOST", 11.5, 48.1),
                testutil::stop("B", 11.6, 48.2),
            ],
        );
        assert!(catalog.master_by_id(&StopID::new("A")).is_some());
        assert_eq!(catalog.master_stops().len(), 2);
    }

    #[test]
    fn drops_inconsistent_trips() {
        let catalog = testutil::catalog(
            vec![testutil::route("R1")],
            vec![
                testutil::trip(
                    "GOOD",
                    "R1",
                    "ALL",
                    &[("A", "08:00:00", "08:00:00"), ("B", "08:10:00", "08:10:00")],
                ),
                // Arrives at B before it left A
                testutil::trip(
                    "BACKWARDS",
                    "R1",
                    "ALL",
                    &[("A", "08:00:00", "08:00:00"), ("B", "07:50:00", "07:55:00")],
                ),
                // Departure before arrival at one call
                testutil::trip(
                    "IMPATIENT",
                    "R1",
                    "ALL",
                    &[("A", "08:00:00", "07:59:00"), ("B", "08:10:00", "08:10:00")],
                ),
                testutil::trip("EMPTY", "R1", "ALL", &[]),
            ],
            vec![testutil::stop("A", 11.5, 48.1), testutil::stop("B", 11.6, 48.2)],
        );
        assert!(catalog.trip_by_id(&TripID::new("GOOD")).is_some());
        assert!(catalog.trip_by_id(&TripID::new("BACKWARDS")).is_none());
        assert!(catalog.trip_by_id(&TripID::new("IMPATIENT")).is_none());
        assert!(catalog.trip_by_id(&TripID::new("EMPTY")).is_none());
        // The dropped trips left no events behind
        assert_eq!(catalog.events_at_stop(&StopID::new("A")).len(), 1);
    }

    #[test]
    fn events_index_covers_every_call() {
        let catalog = testutil::catalog(
            vec![testutil::route("R1")],
            vec![testutil::trip(
                "T1",
                "R1",
                "ALL",
                &[
                    ("A", "08:00:00", "08:00:00"),
                    ("B", "08:05:00", "08:06:00"),
                    ("C", "08:12:00", "08:12:00"),
                ],
            )],
            vec![
                testutil::stop("A", 11.5, 48.1),
                testutil::stop("B", 11.6, 48.2),
                testutil::stop("C", 11.7, 48.3),
            ],
        );
        let events = catalog.events_at_stop(&StopID::new("B"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trip, TripID::new("T1"));
        assert_eq!(events[0].stop_sequence, 1);
        assert_eq!(events[0].arrival, Time::parse("08:05:00").unwrap());
        assert_eq!(events[0].departure, Time::parse("08:06:00").unwrap());
        assert_eq!(catalog.stop_times_of_trip(&TripID::new("T1")).len(), 3);
        assert!(catalog.stop_times_of_trip(&TripID::new("NOPE")).is_empty());
    }

    #[test]
    fn events_at_dropped_stops_stay_unreachable() {
        let stops: BTreeMap<StopID, Stop> = [
            testutil::stop("A", 11.5, 48.1),
            testutil::stop("C", 11.7, 48.3),
        ]
        .into_iter()
        .map(|stop| (stop.stop_id.clone(), stop))
        .collect();
        let dropped: BTreeSet<StopID> = [StopID::new("B")].into_iter().collect();
        let trip = testutil::trip(
            "T1",
            "R1",
            "ALL",
            &[
                ("A", "08:00:00", "08:00:00"),
                ("B", "08:05:00", "08:05:00"),
                ("C", "08:12:00", "08:12:00"),
            ],
        );
        let catalog = Catalog::build(
            [(RouteID::new("R1"), testutil::route("R1"))]
                .into_iter()
                .collect(),
            [(TripID::new("T1"), trip)].into_iter().collect(),
            stops,
            dropped,
            Calendar::default(),
            BTreeMap::new(),
        )
        .unwrap();

        // The stop is gone from the master list but its schedule survives
        assert!(catalog.stop_by_id(&StopID::new("B")).is_none());
        assert!(catalog.master_of_stop(&StopID::new("B")).is_none());
        assert_eq!(catalog.events_at_stop(&StopID::new("B")).len(), 1);
        assert_eq!(catalog.stop_times_of_trip(&TripID::new("T1")).len(), 3);
    }

    #[test]
    fn unknown_route_reference_is_malformed() {
        let result = Catalog::build(
            BTreeMap::new(),
            [(
                TripID::new("T1"),
                testutil::trip("T1", "GHOST", "ALL", &[("A", "08:00:00", "08:00:00")]),
            )]
            .into_iter()
            .collect(),
            [(StopID::new("A"), testutil::stop("A", 11.5, 48.1))]
                .into_iter()
                .collect(),
            BTreeSet::new(),
            Calendar::default(),
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(FeedError::Malformed { .. })));
    }

    #[test]
    fn missing_file_fails_the_load() {
        let dir = std::env::temp_dir().join("transit-planner-empty-feed");
        std::fs::create_dir_all(&dir).unwrap();
        match Catalog::load_from_dir(&dir) {
            Err(FeedError::Missing(file)) => assert_eq!(file, "routes.txt"),
            Err(other) => panic!("expected FeedError::Missing, got {other}"),
            Ok(_) => panic!("expected FeedError::Missing, load succeeded"),
        }
    }
}
