use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result};
use geo::{HaversineDistance, Point};
use geojson::{GeoJson, Value};

use super::RouteID;

/// The physical path of a route: lon-lat vertices in drawing order.
#[derive(Clone, Debug)]
pub struct LineGeometry {
    pub points: Vec<Point<f64>>,
}

impl LineGeometry {
    /// Index of the vertex closest to `to` by great-circle distance.
    pub fn nearest_vertex(&self, to: Point<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, point) in self.points.iter().enumerate() {
            let distance = point.haversine_distance(&to);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((idx, distance));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// Reads the feature-collection document. Features must carry a `route_id`
/// property and a LineString geometry; anything else is skipped with a
/// warning rather than failing the load, since geometry is optional overall.
pub fn load<R: Read>(mut reader: R) -> Result<BTreeMap<RouteID, LineGeometry>> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let geojson: GeoJson = raw.parse().context("not valid GeoJSON")?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        bail!("expected a FeatureCollection");
    };

    let mut geometries = BTreeMap::new();
    for feature in collection.features {
        let route_id = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get("route_id"))
            .and_then(|value| value.as_str())
        {
            Some(id) => id.to_string(),
            None => {
                warn!("Skipping map feature without a route_id property");
                continue;
            }
        };
        let vertices = match feature.geometry.map(|geometry| geometry.value) {
            Some(Value::LineString(vertices)) => vertices,
            _ => {
                warn!("Skipping map feature for {route_id}: not a LineString");
                continue;
            }
        };
        let points: Vec<Point<f64>> = vertices
            .iter()
            .filter(|position| position.len() >= 2)
            .map(|position| Point::new(position[0], position[1]))
            .collect();
        if points.len() < 2 {
            warn!("Skipping map feature for {route_id}: fewer than 2 vertices");
            continue;
        }
        geometries.insert(RouteID::new(route_id), LineGeometry { points });
    }
    Ok(geometries)
}
