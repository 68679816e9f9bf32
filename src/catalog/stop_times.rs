use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{StopID, TripID};
use crate::time::Time;

/// One scheduled call within a trip.
#[derive(Clone, Debug, Serialize)]
pub struct StopTime {
    pub arrival_time: Time,
    pub departure_time: Time,
    pub stop_id: StopID,
}

pub fn load<R: std::io::Read>(reader: R) -> Result<BTreeMap<TripID, Vec<StopTime>>> {
    let mut stop_times: BTreeMap<TripID, Vec<(u32, StopTime)>> = BTreeMap::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        let arrival_time = Time::parse(&rec.arrival_time)?;
        let departure_time = Time::parse(&rec.departure_time)?;
        stop_times.entry(rec.trip_id).or_insert_with(Vec::new).push((
            rec.stop_sequence,
            StopTime {
                arrival_time,
                departure_time,
                stop_id: rec.stop_id,
            },
        ));
    }

    // Sort by stop_sequence, in case the file isn't in order
    let mut results = BTreeMap::new();
    for (trip_id, mut stops) in stop_times {
        stops.sort_by_key(|(seq, _)| *seq);
        results.insert(
            trip_id,
            stops.into_iter().map(|(_, stop_time)| stop_time).collect(),
        );
    }
    Ok(results)
}

#[derive(Deserialize)]
struct Record {
    trip_id: TripID,
    arrival_time: String,
    departure_time: String,
    stop_id: StopID,
    stop_sequence: u32,
}
