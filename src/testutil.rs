//! Fixture builders for the in-module test suites. Everything goes through
//! `Catalog::build`, the same path the feed loader takes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::catalog::{
    Calendar, Catalog, LineGeometry, Route, RouteID, Service, ServiceID, ServiceRule, Stop, StopID,
    StopTime, Trip, TripID,
};
use crate::time::Time;
use crate::{Config, Engine};

/// A date inside every fixture service's window: Friday 2024-05-10.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

pub fn t(raw: &str) -> Time {
    Time::parse(raw).unwrap()
}

pub fn route(id: &str) -> Route {
    Route {
        route_id: RouteID::new(id),
        short_name: Some(id.to_string()),
        long_name: None,
        color: Some("0000FF".to_string()),
        text_color: None,
    }
}

pub fn stop(id: &str, lon: f64, lat: f64) -> Stop {
    Stop {
        stop_id: StopID::new(id),
        name: Some(format!("{id} stop")),
        pos: geo::Point::new(lon, lat),
        parent: None,
        is_station: false,
    }
}

pub fn station(id: &str, lon: f64, lat: f64) -> Stop {
    Stop {
        is_station: true,
        ..stop(id, lon, lat)
    }
}

pub fn platform(id: &str, parent: &str, lon: f64, lat: f64) -> Stop {
    Stop {
        parent: Some(StopID::new(parent)),
        ..stop(id, lon, lat)
    }
}

/// `calls` are (stop_id, arrival, departure) triples in sequence order.
pub fn trip(id: &str, route: &str, service: &str, calls: &[(&str, &str, &str)]) -> Trip {
    Trip {
        trip_id: TripID::new(id),
        route_id: RouteID::new(route),
        service_id: ServiceID::new(service),
        headsign: Some(format!("{id} headsign")),
        stop_times: calls
            .iter()
            .map(|(stop_id, arrival, departure)| StopTime {
                arrival_time: t(arrival),
                departure_time: t(departure),
                stop_id: StopID::new(*stop_id),
            })
            .collect(),
    }
}

/// An every-day service with a window comfortably around `today()`.
pub fn everyday_service(id: &str) -> Service {
    Service {
        service_id: ServiceID::new(id),
        rule: Some(ServiceRule {
            days: [true; 7],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }),
        added: BTreeSet::new(),
        removed: BTreeSet::new(),
    }
}

/// Catalog whose calendar activates every service the trips mention, every
/// day of the fixture year.
pub fn catalog(routes: Vec<Route>, trips: Vec<Trip>, stops: Vec<Stop>) -> Catalog {
    let services: BTreeSet<&ServiceID> = trips.iter().map(|trip| &trip.service_id).collect();
    let calendar = Calendar {
        services: services
            .into_iter()
            .map(|id| (id.clone(), everyday_service(id.as_str())))
            .collect(),
    };
    catalog_with_calendar(routes, trips, stops, calendar, BTreeMap::new())
}

pub fn catalog_with_calendar(
    routes: Vec<Route>,
    trips: Vec<Trip>,
    stops: Vec<Stop>,
    calendar: Calendar,
    geometries: BTreeMap<RouteID, LineGeometry>,
) -> Catalog {
    Catalog::build(
        routes
            .into_iter()
            .map(|route| (route.route_id.clone(), route))
            .collect(),
        trips
            .into_iter()
            .map(|trip| (trip.trip_id.clone(), trip))
            .collect(),
        stops
            .into_iter()
            .map(|stop| (stop.stop_id.clone(), stop))
            .collect(),
        BTreeSet::new(),
        calendar,
        geometries,
    )
    .unwrap()
}

pub fn engine(catalog: Catalog) -> Engine {
    Engine::from_catalog(catalog, Config::default())
}
