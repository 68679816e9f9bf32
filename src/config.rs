use std::path::PathBuf;

/// Engine tuning knobs. Every field has a default; `DATA_DIR` is the only
/// environment variable consulted.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding the six GTFS tables and (optionally) `map.geojson`.
    pub data_dir: PathBuf,
    /// Radius bound for access, egress and transfer walks.
    pub max_walk_meters: f64,
    pub walk_speed_mps: f64,
    /// Default departure-board length.
    pub max_departures_per_stop: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            max_walk_meters: 500.0,
            walk_speed_mps: 1.4,
            max_departures_per_stop: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config
    }

    /// Walk time for a distance, rounded up to whole seconds.
    pub fn walk_seconds(&self, distance_meters: f64) -> u32 {
        (distance_meters / self.walk_speed_mps).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_seconds_rounds_up() {
        let config = Config::default();
        assert_eq!(config.walk_seconds(0.0), 0);
        assert_eq!(config.walk_seconds(1.4), 1);
        assert_eq!(config.walk_seconds(1.5), 2);
        assert_eq!(config.walk_seconds(200.0), 143);
        assert_eq!(config.walk_seconds(500.0), 358);
    }
}
