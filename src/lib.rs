#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod catalog;
mod config;
mod departures;
mod error;
mod planner;
mod position;
mod resolver;
mod time;
mod transfers;

#[cfg(test)]
pub(crate) mod testutil;

pub use self::catalog::{
    Calendar, Catalog, LineGeometry, MasterStop, Route, RouteID, Service, ServiceID, ServiceRule,
    Stop, StopEvent, StopID, StopTime, Trip, TripID,
};
pub use self::config::Config;
pub use self::departures::Departure;
pub use self::error::FeedError;
pub use self::planner::{Leg, PlanOutcome, SearchStats};
pub use self::position::VehiclePosition;
pub use self::resolver::TripState;
pub use self::time::Time;
pub use self::transfers::{Transfer, TransferIndex};

/// The whole engine: immutable catalog, pre-built transfer index, tuning
/// knobs. Build one at startup and share it by reference; every query method
/// takes `&self` and keeps its working state on the stack.
pub struct Engine {
    pub config: Config,
    pub catalog: Catalog,
    pub transfers: TransferIndex,
}

impl Engine {
    /// Reads the feed from `config.data_dir` and builds every index.
    pub fn load(config: Config) -> Result<Self, FeedError> {
        let catalog = Catalog::load_from_dir(&config.data_dir)?;
        Ok(Self::from_catalog(catalog, config))
    }

    /// Wraps an already-indexed catalog, e.g. one assembled in memory.
    pub fn from_catalog(catalog: Catalog, config: Config) -> Self {
        let transfers = TransferIndex::build(&catalog, &config);
        info!(
            "Engine ready: {} master stops, {} trips",
            catalog.master_stops().len(),
            catalog.trip_count()
        );
        Self {
            config,
            catalog,
            transfers,
        }
    }
}
