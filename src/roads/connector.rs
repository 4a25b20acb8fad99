//! Cluster connector: stitches disconnected pieces of the road network.
//!
//! Every planned road tile plus every built or pending road is a node;
//! cardinal neighbours are edges. Components are found by flood fill seeded in
//! sorted tile order, so labels are stable between runs with the same input.
//! Close component pairs are bridged with connector roads, a few per run,
//! until one component remains or every remaining gap is longer than
//! `max_connector_length`. Islands beyond that range stay disconnected.

use super::road_network::*;
use crate::config::PlannerConfig;
use crate::location::*;
use crate::plan_key::*;
use crate::room_data::*;
use crate::store::*;
use crate::terrain::*;
use fnv::{FnvHashMap, FnvHashSet};
use itertools::Itertools;
use log::*;
use std::collections::VecDeque;

/// Road components plus a tile -> component index lookup.
pub struct RoadComponents {
    pub components: Vec<Vec<Location>>,
    pub labels: FnvHashMap<Location, usize>,
}

impl RoadComponents {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectorReport {
    pub components_before: usize,
    pub components_after: usize,
    pub connectors_created: usize,
    pub passes: usize,
}

/// Label 4-connected components of `nodes`, in discovery order.
pub fn road_components(nodes: &FnvHashSet<Location>) -> RoadComponents {
    let mut seeds: Vec<Location> = nodes.iter().copied().collect();
    seeds.sort();

    let mut labels: FnvHashMap<Location, usize> = FnvHashMap::default();
    let mut components: Vec<Vec<Location>> = Vec::new();

    for seed in seeds {
        if labels.contains_key(&seed) {
            continue;
        }

        let index = components.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::new();
        labels.insert(seed, index);
        queue.push_back(seed);

        while let Some(loc) = queue.pop_front() {
            members.push(loc);
            for &(dx, dy) in &NEIGHBORS_4 {
                if let Some(next) = loc.checked_add(dx, dy) {
                    if nodes.contains(&next) && !labels.contains_key(&next) {
                        labels.insert(next, index);
                        queue.push_back(next);
                    }
                }
            }
        }

        components.push(members);
    }

    RoadComponents { components, labels }
}

/// The closest tile pair between two components by Manhattan distance.
/// Ties keep the first pair found in discovery order.
fn closest_pair(a: &[Location], b: &[Location]) -> Option<(u32, Location, Location)> {
    let mut best: Option<(u32, Location, Location)> = None;
    for &from in a {
        for &to in b {
            let distance = from.manhattan_to(to);
            if best.map(|(d, _, _)| distance < d).unwrap_or(true) {
                best = Some((distance, from, to));
            }
        }
    }
    best
}

/// All tiles the connector treats as road network nodes.
fn network_nodes(plan: &TerritoryPlan, snapshot: &TerritorySnapshot) -> FnvHashSet<Location> {
    let mut nodes = plan.planned_road_tiles();
    nodes.extend(snapshot.road_tiles());
    nodes
}

/// True if some connector key already bridges components `a` and `b`.
fn has_connector(plan: &TerritoryPlan, components: &RoadComponents, a: usize, b: usize) -> bool {
    plan.keys_of(PlanCategory::RoadConnector)
        .iter()
        .any(|key| match key {
            PlanKey::RoadConnector { from, to } => {
                let from = components.labels.get(from).copied();
                let to = components.labels.get(to).copied();
                (from == Some(a) && to == Some(b)) || (from == Some(b) && to == Some(a))
            }
            _ => false,
        })
}

fn find_root(parents: &mut [usize], mut index: usize) -> usize {
    while parents[index] != index {
        parents[index] = parents[parents[index]];
        index = parents[index];
    }
    index
}

/// Bridge nearby road components, bounded by the configured connector and
/// pass caps.
#[cfg_attr(feature = "profile", screeps_timing_annotate::timing)]
pub fn connect_clusters(
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
    matrix: &mut RoadCostMatrix,
    config: &PlannerConfig,
    tick: u32,
) -> ConnectorReport {
    let mut report = ConnectorReport::default();
    let mut components = road_components(&network_nodes(plan, snapshot));
    report.components_before = components.len();

    for _ in 0..config.max_cluster_passes {
        if components.len() <= 1 || report.connectors_created >= config.max_connectors_per_run {
            break;
        }
        report.passes += 1;

        let mut candidates: Vec<(u32, usize, usize, Location, Location)> = components
            .components
            .iter()
            .enumerate()
            .tuple_combinations()
            .filter_map(|((i, a), (j, b))| {
                closest_pair(a, b)
                    .filter(|(distance, _, _)| *distance <= config.max_connector_length)
                    .map(|(distance, from, to)| (distance, i, j, from, to))
            })
            .collect();

        if candidates.is_empty() {
            trace!(
                "All {} road components are beyond connector range",
                components.len()
            );
            break;
        }

        candidates.sort_by_key(|&(distance, i, j, _, _)| (distance, i, j));

        let mut parents: Vec<usize> = (0..components.len()).collect();
        let mut created_this_pass = 0usize;

        for (distance, i, j, from, to) in candidates {
            if report.connectors_created >= config.max_connectors_per_run {
                break;
            }

            let (root_i, root_j) = (find_root(&mut parents, i), find_root(&mut parents, j));
            if root_i == root_j || has_connector(plan, &components, i, j) {
                continue;
            }

            let key = PlanKey::RoadConnector { from, to };
            match synthesize_road(plan, matrix, key, from, to, 0, config, tick) {
                RoadOutcome::Created(len) => {
                    debug!(
                        "Connected road components {} and {} ({} apart) with {} tiles",
                        i, j, distance, len
                    );
                    parents[root_i] = root_j;
                    report.connectors_created += 1;
                    created_this_pass += 1;
                }
                RoadOutcome::Cached => {
                    parents[root_i] = root_j;
                }
                RoadOutcome::NoRoute => {}
            }
        }

        components = road_components(&network_nodes(plan, snapshot));

        if created_this_pass == 0 {
            break;
        }
    }

    report.components_after = components.len();
    report
}
