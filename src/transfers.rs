use geo::{HaversineDistance, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::catalog::Catalog;
use crate::config::Config;

/// A pre-computed foot connection to another master stop.
#[derive(Clone, Debug)]
pub struct Transfer {
    /// Index into the catalog's master-stop list.
    pub to: usize,
    pub walk_seconds: u32,
    pub distance_meters: f64,
}

/// Walk edges between master stops, plus the spatial index used to find
/// masters near an arbitrary coordinate. Both directions of every pair are
/// stored so lookup is a single slice access.
pub struct TransferIndex {
    outgoing: Vec<Vec<Transfer>>,
    rtree: RTree<MasterNode>,
}

/// R-tree node over a master stop. The tree filters in Euclidean degree
/// space; survivors get the exact haversine test.
struct MasterNode {
    master: usize,
    point: [f64; 2],
}

impl RTreeObject for MasterNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for MasterNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Degree radius guaranteed to cover `meters` at this latitude. Longitude
/// degrees shrink by cos(lat), so the coarse radius is inflated accordingly.
fn coarse_radius_degrees(meters: f64, lat: f64) -> f64 {
    let cos_lat = lat.to_radians().cos().abs().max(0.01);
    meters / METERS_PER_DEGREE / cos_lat
}

impl TransferIndex {
    pub fn build(catalog: &Catalog, config: &Config) -> Self {
        let masters = catalog.master_stops();
        let rtree = RTree::bulk_load(
            masters
                .iter()
                .enumerate()
                .map(|(master, m)| MasterNode {
                    master,
                    point: [m.pos.x(), m.pos.y()],
                })
                .collect(),
        );

        let mut outgoing = vec![Vec::new(); masters.len()];
        for (idx, master) in masters.iter().enumerate() {
            let radius = coarse_radius_degrees(config.max_walk_meters, master.pos.y());
            for node in
                rtree.locate_within_distance([master.pos.x(), master.pos.y()], radius * radius)
            {
                if node.master == idx {
                    continue;
                }
                let other = Point::new(node.point[0], node.point[1]);
                let distance_meters = master.pos.haversine_distance(&other);
                if distance_meters > config.max_walk_meters {
                    continue;
                }
                outgoing[idx].push(Transfer {
                    to: node.master,
                    walk_seconds: config.walk_seconds(distance_meters),
                    distance_meters,
                });
            }
        }

        let total: usize = outgoing.iter().map(|list| list.len()).sum();
        info!(
            "Transfer index: {} foot connections across {} master stops",
            total,
            masters.len()
        );
        Self { outgoing, rtree }
    }

    /// Walks leaving one master stop.
    pub fn outgoing_from(&self, master: usize) -> &[Transfer] {
        &self.outgoing[master]
    }

    /// Master stops within `meters` of a point, nearest first, with exact
    /// distances.
    pub fn masters_within(&self, point: Point<f64>, meters: f64) -> Vec<(usize, f64)> {
        let radius = coarse_radius_degrees(meters, point.y());
        let mut hits = Vec::new();
        for node in self
            .rtree
            .locate_within_distance([point.x(), point.y()], radius * radius)
        {
            let distance = point.haversine_distance(&Point::new(node.point[0], node.point[1]));
            if distance <= meters {
                hits.push((node.master, distance));
            }
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }
}
