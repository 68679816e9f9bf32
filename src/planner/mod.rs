
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use chrono::NaiveDate;
use geo::{HaversineDistance, Point};
use serde::Serialize;

use crate::catalog::{RouteID, StopID, TripID};
use crate::time::Time;
use crate::Engine;

/// One homogeneous piece of a journey: entirely on foot, or entirely on one
/// trip. Walk ends are a free coordinate for access/egress and a stop for
/// transfers.
#[derive(Clone, Debug, Serialize)]
pub enum Leg {
    #[serde(rename_all = "camelCase")]
    Walk {
        start_time: Time,
        end_time: Time,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_coords: Option<Point<f64>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_stop: Option<StopID>,
        #[serde(skip_serializing_if = "Option::is_none")]
        to_coords: Option<Point<f64>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        to_stop: Option<StopID>,
        distance_meters: f64,
    },
    #[serde(rename_all = "camelCase")]
    Bus {
        start_time: Time,
        end_time: Time,
        from_stop: StopID,
        to_stop: StopID,
        route: RouteID,
        trip: TripID,
        headsign: Option<String>,
    },
}

impl Leg {
    pub fn start_time(&self) -> Time {
        match self {
            Leg::Walk { start_time, .. } | Leg::Bus { start_time, .. } => *start_time,
        }
    }

    pub fn end_time(&self) -> Time {
        match self {
            Leg::Walk { end_time, .. } | Leg::Bus { end_time, .. } => *end_time,
        }
    }

    pub fn duration_seconds(&self) -> u32 {
        self.end_time().seconds_since(self.start_time())
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SearchStats {
    /// Labels settled by the search.
    pub settled: usize,
    /// Edge relaxations proposed, accepted or not.
    pub relaxed: usize,
}

/// What a journey query can come back with. The failures are ordinary
/// outcomes, not errors.
#[derive(Clone, Debug, Serialize)]
pub enum PlanOutcome {
    Itinerary { legs: Vec<Leg>, stats: SearchStats },
    NoService,
    NoStartStops,
    NoEndStops,
    NoPathFound,
}

/// Back-link for path reconstruction: the leg that produced a label, and the
/// master it was relaxed from. `parent == None` marks a label seeded by the
/// access walk. Acyclic by construction, since every leg ends strictly later
/// than its parent's label.
struct BackLink {
    parent: Option<usize>,
    leg: Leg,
}

impl Engine {
    /// Earliest-arrival journey between two coordinates, departing at
    /// `depart` on `date`. Dijkstra over master stops, where a label is the
    /// earliest known arrival; vehicle legs ride each boardable trip to its
    /// later calls, transfer legs follow the pre-built walk edges.
    pub fn find_itinerary(
        &self,
        from: Point<f64>,
        to: Point<f64>,
        date: NaiveDate,
        depart: Time,
    ) -> PlanOutcome {
        // A straight walk competes with every transit journey and is the only
        // option when the stop network is out of reach.
        let direct = {
            let distance = from.haversine_distance(&to);
            if distance <= self.config.max_walk_meters {
                Some(Leg::Walk {
                    start_time: depart,
                    end_time: depart + self.config.walk_seconds(distance),
                    from_coords: Some(from),
                    from_stop: None,
                    to_coords: Some(to),
                    to_stop: None,
                    distance_meters: distance,
                })
            } else {
                None
            }
        };

        match (self.search(from, to, date, depart), direct) {
            (PlanOutcome::Itinerary { legs, stats }, Some(walk)) => {
                let transit_arrival = legs.last().map(Leg::end_time);
                if transit_arrival.is_some_and(|arrival| arrival < walk.end_time()) {
                    PlanOutcome::Itinerary { legs, stats }
                } else {
                    PlanOutcome::Itinerary {
                        legs: vec![walk],
                        stats,
                    }
                }
            }
            (outcome, None) => outcome,
            (_, Some(walk)) => PlanOutcome::Itinerary {
                legs: vec![walk],
                stats: SearchStats::default(),
            },
        }
    }

    fn search(&self, from: Point<f64>, to: Point<f64>, date: NaiveDate, depart: Time) -> PlanOutcome {
        let max_walk = self.config.max_walk_meters;

        let active = self.catalog.calendar.services_on_date(date);
        if active.is_empty() {
            return PlanOutcome::NoService;
        }

        let starts = self.transfers.masters_within(from, max_walk);
        if starts.is_empty() {
            return PlanOutcome::NoStartStops;
        }
        let ends: HashMap<usize, f64> = self
            .transfers
            .masters_within(to, max_walk)
            .into_iter()
            .collect();
        if ends.is_empty() {
            return PlanOutcome::NoEndStops;
        }

        let n = self.catalog.master_stops().len();
        let mut best: Vec<Option<Time>> = vec![None; n];
        let mut back: Vec<Option<BackLink>> = Vec::new();
        back.resize_with(n, || None);
        let mut queue: BinaryHeap<Reverse<(Time, usize)>> = BinaryHeap::new();
        let mut stats = SearchStats::default();

        for (master, distance) in starts {
            let arrival = depart + self.config.walk_seconds(distance);
            if improves(&best, master, arrival) {
                best[master] = Some(arrival);
                back[master] = Some(BackLink {
                    parent: None,
                    leg: Leg::Walk {
                        start_time: depart,
                        end_time: arrival,
                        from_coords: Some(from),
                        from_stop: None,
                        to_coords: None,
                        to_stop: Some(self.catalog.master_stops()[master].id.clone()),
                        distance_meters: distance,
                    },
                });
                queue.push(Reverse((arrival, master)));
            }
        }

        while let Some(Reverse((arrival, master))) = queue.pop() {
            // Lazy deletion: an entry superseded by a better label is skipped,
            // not removed.
            if best[master] != Some(arrival) {
                continue;
            }
            stats.settled += 1;

            // First settled end stop is the earliest possible arrival.
            if ends.contains_key(&master) {
                return self.reconstruct(master, &back, to, &ends, stats);
            }

            // Ride every vehicle leaving here at or after our arrival.
            for stop_id in self.catalog.children_of_master_index(master) {
                for event in self.catalog.events_at_stop(stop_id) {
                    if event.departure < arrival {
                        continue;
                    }
                    let Some(trip) = self.catalog.trip_by_id(&event.trip) else {
                        continue;
                    };
                    if !active.contains(&trip.service_id) {
                        continue;
                    }
                    for later in &trip.stop_times[event.stop_sequence + 1..] {
                        stats.relaxed += 1;
                        let Some(next) = self.catalog.master_of_stop(&later.stop_id) else {
                            continue;
                        };
                        if improves(&best, next, later.arrival_time) {
                            best[next] = Some(later.arrival_time);
                            back[next] = Some(BackLink {
                                parent: Some(master),
                                leg: Leg::Bus {
                                    start_time: event.departure,
                                    end_time: later.arrival_time,
                                    from_stop: stop_id.clone(),
                                    to_stop: later.stop_id.clone(),
                                    route: trip.route_id.clone(),
                                    trip: trip.trip_id.clone(),
                                    headsign: trip.headsign.clone(),
                                },
                            });
                            queue.push(Reverse((later.arrival_time, next)));
                        }
                    }
                }
            }

            // Walk to the neighbours.
            for transfer in self.transfers.outgoing_from(master) {
                stats.relaxed += 1;
                let reached = arrival + transfer.walk_seconds;
                if improves(&best, transfer.to, reached) {
                    best[transfer.to] = Some(reached);
                    back[transfer.to] = Some(BackLink {
                        parent: Some(master),
                        leg: Leg::Walk {
                            start_time: arrival,
                            end_time: reached,
                            from_coords: None,
                            from_stop: Some(self.catalog.master_stops()[master].id.clone()),
                            to_coords: None,
                            to_stop: Some(self.catalog.master_stops()[transfer.to].id.clone()),
                            distance_meters: transfer.distance_meters,
                        },
                    });
                    queue.push(Reverse((reached, transfer.to)));
                }
            }
        }

        PlanOutcome::NoPathFound
    }

    /// Follows back-links from the settled end stop, reverses, and appends
    /// the egress walk. A broken back-link means the search state is
    /// inconsistent; that query gives up rather than panicking.
    fn reconstruct(
        &self,
        end: usize,
        back: &[Option<BackLink>],
        to: Point<f64>,
        ends: &HashMap<usize, f64>,
        stats: SearchStats,
    ) -> PlanOutcome {
        let mut legs = Vec::new();
        let mut cursor = Some(end);
        while let Some(idx) = cursor {
            let Some(link) = &back[idx] else {
                return PlanOutcome::NoPathFound;
            };
            legs.push(link.leg.clone());
            cursor = link.parent;
        }
        legs.reverse();

        let Some(arrival) = legs.last().map(Leg::end_time) else {
            return PlanOutcome::NoPathFound;
        };
        let Some(distance) = ends.get(&end).copied() else {
            return PlanOutcome::NoPathFound;
        };
        legs.push(Leg::Walk {
            start_time: arrival,
            end_time: arrival + self.config.walk_seconds(distance),
            from_coords: None,
            from_stop: Some(self.catalog.master_stops()[end].id.clone()),
            to_coords: Some(to),
            to_stop: None,
            distance_meters: distance,
        });
        PlanOutcome::Itinerary { legs, stats }
    }
}

fn improves(best: &[Option<Time>], master: usize, candidate: Time) -> bool {
    match best[master] {
        Some(current) => candidate < current,
        None => true,
    }
}
