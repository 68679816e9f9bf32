use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteID(String);

impl RouteID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A branded line label: what riders see on the vehicle and the map.
#[derive(Clone, Debug, Serialize)]
pub struct Route {
    pub route_id: RouteID,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    /// 6-hex background colour, no leading '#'.
    pub color: Option<String>,
    /// 6-hex text colour.
    pub text_color: Option<String>,
}

impl Route {
    pub fn describe(&self) -> String {
        for x in [&self.short_name, &self.long_name] {
            if let Some(x) = x {
                return x.to_string();
            }
        }
        self.route_id.as_str().to_string()
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<BTreeMap<RouteID, Route>> {
    let mut routes = BTreeMap::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if routes.contains_key(&rec.route_id) {
            bail!("Duplicate {:?}", rec.route_id);
        }
        routes.insert(
            rec.route_id.clone(),
            Route {
                route_id: rec.route_id,
                short_name: rec.route_short_name,
                long_name: rec.route_long_name,
                color: rec.route_color,
                text_color: rec.route_text_color,
            },
        );
    }
    Ok(routes)
}

#[derive(Deserialize)]
struct Record {
    route_id: RouteID,
    route_short_name: Option<String>,
    route_long_name: Option<String>,
    route_color: Option<String>,
    route_text_color: Option<String>,
}
