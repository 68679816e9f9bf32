use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use geo::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StopID(String);

impl StopID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct Stop {
    pub stop_id: StopID,
    pub name: Option<String>,
    /// Longitude-first, like every coordinate in the engine.
    pub pos: Point<f64>,
    pub parent: Option<StopID>,
    /// location_type = 1: a station container grouping child platforms.
    pub is_station: bool,
}

impl Stop {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.stop_id.as_str().to_string(),
        }
    }
}

/// Returns the usable stops plus the ids dropped for unusable coordinates.
/// Dropped ids stay known so stop_times referencing them remain legal; those
/// events are simply unreachable.
pub fn load<R: std::io::Read>(reader: R) -> Result<(BTreeMap<StopID, Stop>, BTreeSet<StopID>)> {
    let mut stops = BTreeMap::new();
    let mut dropped = BTreeSet::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if stops.contains_key(&rec.stop_id) || dropped.contains(&rec.stop_id) {
            bail!("Duplicate {:?}", rec.stop_id);
        }
        let lat = rec.stop_lat.trim().parse::<f64>();
        let lon = rec.stop_lon.trim().parse::<f64>();
        let (lat, lon) = match (lat, lon) {
            (Ok(lat), Ok(lon)) if lat.is_finite() && lon.is_finite() => (lat, lon),
            _ => {
                warn!("{:?} has unusable coordinates, dropping it", rec.stop_id);
                dropped.insert(rec.stop_id);
                continue;
            }
        };
        stops.insert(
            rec.stop_id.clone(),
            Stop {
                stop_id: rec.stop_id,
                name: rec.stop_name,
                pos: Point::new(lon, lat),
                parent: rec.parent_station,
                is_station: rec.location_type == Some(1),
            },
        );
    }
    Ok((stops, dropped))
}

#[derive(Deserialize)]
struct Record {
    stop_id: StopID,
    stop_name: Option<String>,
    stop_lat: String,
    stop_lon: String,
    parent_station: Option<StopID>,
    location_type: Option<u8>,
}
