use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{RouteID, ServiceID, StopTime};
use crate::time::Time;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripID(String);

impl TripID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One scheduled run of a vehicle along a route. `stop_times` is attached
/// after loading and is non-empty and time-ordered once the catalog is built.
#[derive(Clone, Debug)]
pub struct Trip {
    pub trip_id: TripID,
    pub route_id: RouteID,
    pub service_id: ServiceID,
    pub headsign: Option<String>,
    pub stop_times: Vec<StopTime>,
}

impl Trip {
    pub fn first_departure(&self) -> Time {
        self.stop_times[0].departure_time
    }

    pub fn last_arrival(&self) -> Time {
        self.stop_times[self.stop_times.len() - 1].arrival_time
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<BTreeMap<TripID, Trip>> {
    let mut trips = BTreeMap::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if trips.contains_key(&rec.trip_id) {
            bail!("Duplicate {:?}", rec.trip_id);
        }
        trips.insert(
            rec.trip_id.clone(),
            Trip {
                trip_id: rec.trip_id,
                route_id: rec.route_id,
                service_id: rec.service_id,
                headsign: rec.trip_headsign,
                stop_times: Vec::new(),
            },
        );
    }
    Ok(trips)
}

#[derive(Deserialize)]
struct Record {
    trip_id: TripID,
    route_id: RouteID,
    service_id: ServiceID,
    trip_headsign: Option<String>,
}
