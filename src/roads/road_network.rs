//! Road synthesis: cost-weighted A* between two anchors.
//!
//! Costs come from a `RoadCostMatrix` built once per phase from the live
//! snapshot and the territory plan. Existing, pending and planned roads cost
//! 1, so later roads merge onto earlier ones and the network grows as a shared
//! trunk rather than parallel lanes. Movement is cardinal only, which keeps
//! every synthesized road a single 4-connected run for the cluster connector.

use crate::config::PlannerConfig;
use crate::location::*;
use crate::plan_key::*;
use crate::room_data::*;
use crate::store::*;
use crate::terrain::*;
use log::*;
use pathfinding::directed::astar::astar;

use screeps::constants::StructureType;

const BLOCKED: u8 = 0;
const ROAD_COST: u8 = 1;

/// Per-tile traversal cost for road planning. Zero means impassable.
#[derive(Clone)]
pub struct RoadCostMatrix {
    costs: RoomDataArray<u8>,
}

impl RoadCostMatrix {
    pub fn new(
        snapshot: &TerritorySnapshot,
        plan: &TerritoryPlan,
        config: &PlannerConfig,
    ) -> RoadCostMatrix {
        let terrain = snapshot.terrain();
        let mut costs = RoomDataArray::new(BLOCKED);

        for y in 0..50u8 {
            for x in 0..50u8 {
                let loc = Location::from_xy(x, y);
                let cost = if !loc.in_build_bounds() || terrain.is_wall(x, y) {
                    BLOCKED
                } else if terrain.is_swamp(x, y) {
                    config.swamp_cost.max(ROAD_COST)
                } else {
                    config.plain_cost.max(ROAD_COST)
                };
                costs.set_at(loc, cost);
            }
        }

        let mut matrix = RoadCostMatrix { costs };

        for loc in snapshot.road_tiles() {
            matrix.costs.set_at(loc, ROAD_COST);
        }
        for loc in plan.planned_road_tiles() {
            if loc.in_build_bounds() {
                matrix.costs.set_at(loc, ROAD_COST);
            }
        }

        for structure in snapshot.structures() {
            if !matches!(
                structure.structure_type,
                StructureType::Road | StructureType::Rampart
            ) {
                matrix.block(structure.location);
            }
        }
        for y in 0..50u8 {
            for x in 0..50u8 {
                let loc = Location::from_xy(x, y);
                if snapshot.has_blocking_site(loc) {
                    matrix.block(loc);
                }
            }
        }
        for loc in snapshot.anchor_locations() {
            matrix.block(loc);
        }
        for loc in plan.planned_exclusive_tiles() {
            matrix.block(loc);
        }

        matrix
    }

    /// Traversal cost, or `None` if the tile cannot carry a road.
    pub fn cost(&self, loc: Location) -> Option<u32> {
        match self.costs.at(loc) {
            BLOCKED => None,
            cost => Some(cost as u32),
        }
    }

    pub fn is_blocked(&self, loc: Location) -> bool {
        self.costs.at(loc) == BLOCKED
    }

    /// Record a newly planned road so later searches merge onto it.
    pub fn mark_road(&mut self, loc: Location) {
        if !self.is_blocked(loc) {
            self.costs.set_at(loc, ROAD_COST);
        }
    }

    pub fn block(&mut self, loc: Location) {
        self.costs.set_at(loc, BLOCKED);
    }
}

/// Cheapest cardinal path from `start` to any tile within Chebyshev `range`
/// of `goal`.
///
/// The start tile is not part of the returned path (it is usually the anchor
/// structure itself). Returns `None` when no route exists or the search runs
/// out of its `max_ops` node expansions; callers must treat that as "not
/// viable right now", never as a result to cache.
#[cfg_attr(feature = "profile", screeps_timing_annotate::timing)]
pub fn find_path(
    start: Location,
    goal: Location,
    range: u8,
    matrix: &RoadCostMatrix,
    max_ops: u32,
) -> Option<Vec<Location>> {
    let mut ops = 0u32;

    let result = astar(
        &start,
        |&loc| {
            ops += 1;
            if ops > max_ops {
                return Vec::new();
            }
            NEIGHBORS_4
                .iter()
                .filter_map(|&(dx, dy)| {
                    let next = loc.checked_add(dx, dy)?;
                    matrix.cost(next).map(|cost| (next, cost))
                })
                .collect::<Vec<_>>()
        },
        |&loc| {
            let dx = (loc.x() as i32 - goal.x() as i32).unsigned_abs();
            let dy = (loc.y() as i32 - goal.y() as i32).unsigned_abs();
            dx.saturating_sub(range as u32) + dy.saturating_sub(range as u32)
        },
        |&loc| loc.distance_to(goal) <= range,
    );

    match result {
        Some((path, _cost)) => Some(path.into_iter().skip(1).collect()),
        None => {
            trace!(
                "No road from {} to {} (range {}, {} ops)",
                start,
                goal,
                range,
                ops
            );
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoadOutcome {
    /// The key already exists; its stored positions are the answer.
    Cached,
    /// A new path was stored with this many tiles.
    Created(usize),
    /// No complete route this cycle.
    NoRoute,
}

/// Plan a road between two anchors under `key`, once.
///
/// The first successful search is stored in the territory plan; afterwards
/// the key short-circuits the search until something (stale pruning, the
/// cleanup sweep) removes it.
pub fn synthesize_road(
    plan: &mut TerritoryPlan,
    matrix: &mut RoadCostMatrix,
    key: PlanKey,
    start: Location,
    goal: Location,
    range: u8,
    config: &PlannerConfig,
    tick: u32,
) -> RoadOutcome {
    if plan.contains_key(&key) {
        return RoadOutcome::Cached;
    }

    match find_path(start, goal, range, matrix, config.max_path_ops) {
        Some(path) => {
            for loc in &path {
                matrix.mark_road(*loc);
            }
            let positions = PositionSet::from_locations(path);
            let len = positions.len();
            debug!("Planned road {} with {} tiles", key, len);
            plan.set(key, positions, tick);
            RoadOutcome::Created(len)
        }
        None => {
            debug!("Road {} has no complete route yet", key);
            RoadOutcome::NoRoute
        }
    }
}
