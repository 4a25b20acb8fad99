//! Site layers: propose tiles for one structure category at a time.
//!
//! `SiteLayer` is the trait each category implements. Layers never touch the
//! world or the plan; they read a per-cycle `SiteContext` and return
//! `Proposal`s for the planner to commit. Claims made through the context are
//! visible to later proposals in the same cycle, so two layers never pick the
//! same tile.

pub mod controller_infra;
pub mod extension;
pub mod mineral_infra;
pub mod source_infra;
pub mod tower;

pub use self::controller_infra::*;
pub use self::extension::*;
pub use self::mineral_infra::*;
pub use self::source_infra::*;
pub use self::tower::*;

use crate::config::PlannerConfig;
use crate::constants::*;
use crate::location::*;
use crate::plan_key::*;
use crate::roads::road_network::*;
use crate::room_data::*;
use crate::store::*;
use fnv::{FnvHashMap, FnvHashSet};

use screeps::constants::StructureType;

/// Tiles proposed for a single plan key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub key: PlanKey,
    pub positions: PositionSet,
}

/// A placement step for one structure category.
pub trait SiteLayer {
    fn name(&self) -> &str;

    /// Whether this layer has anything to do for the territory at all.
    fn is_applicable(&self, _ctx: &SiteContext) -> bool {
        true
    }

    fn propose(&self, ctx: &mut SiteContext, plan: &TerritoryPlan) -> Vec<Proposal>;
}

/// Resource containers, planned before any roads so roads can target them.
pub fn container_layers() -> Vec<Box<dyn SiteLayer>> {
    vec![
        Box::new(SourceInfraLayer),
        Box::new(ControllerInfraLayer),
        Box::new(MineralInfraLayer),
    ]
}

/// Hub blocks. Towers go first so they get the template tiles closest to the
/// hub before extensions fill in around them.
pub fn hub_layers() -> Vec<Box<dyn SiteLayer>> {
    vec![Box::new(TowerLayer), Box::new(ExtensionLayer)]
}

/// Per-cycle placement view over the snapshot and the plan.
pub struct SiteContext<'a> {
    snapshot: &'a TerritorySnapshot,
    config: &'a PlannerConfig,
    matrix: RoadCostMatrix,
    planned: FnvHashSet<Location>,
    roads: FnvHashSet<Location>,
    reserved: FnvHashSet<Location>,
    containers: Vec<Location>,
    counts: FnvHashMap<StructureType, usize>,
}

impl<'a> SiteContext<'a> {
    pub fn new(
        snapshot: &'a TerritorySnapshot,
        plan: &TerritoryPlan,
        config: &'a PlannerConfig,
    ) -> SiteContext<'a> {
        let mut counts: FnvHashMap<StructureType, usize> = FnvHashMap::default();
        let mut containers = Vec::new();
        for (key, positions) in plan.entries() {
            *counts.entry(key.structure_type()).or_insert(0) += positions.len();
            if key.structure_type() == StructureType::Container {
                containers.extend(positions.iter());
            }
        }

        let mut roads = plan.planned_road_tiles();
        roads.extend(snapshot.road_tiles());

        let reserved = snapshot
            .anchor_locations()
            .chain(snapshot.hubs().iter().map(|hub| hub.location))
            .collect();

        SiteContext {
            snapshot,
            config,
            matrix: RoadCostMatrix::new(snapshot, plan, config),
            planned: plan.planned_tiles(),
            roads,
            reserved,
            containers,
            counts,
        }
    }

    pub fn snapshot(&self) -> &TerritorySnapshot {
        self.snapshot
    }

    pub fn config(&self) -> &PlannerConfig {
        self.config
    }

    pub fn matrix(&self) -> &RoadCostMatrix {
        &self.matrix
    }

    /// True if a new structure could be placed on the tile.
    pub fn is_buildable(&self, loc: Location) -> bool {
        loc.in_build_bounds()
            && !self.snapshot.terrain().is_wall_at(loc)
            && self
                .snapshot
                .structures_at(loc)
                .iter()
                .all(|t| *t == StructureType::Rampart)
            && !self.snapshot.has_any_site(loc)
            && !self.reserved.contains(&loc)
            && !self.planned.contains(&loc)
    }

    /// True for tiles that carry, or are planned to carry, a road.
    pub fn is_road(&self, loc: Location) -> bool {
        self.roads.contains(&loc)
    }

    /// Any container built, pending or planned within `range` of `loc`.
    pub fn container_within(&self, loc: Location, range: u8) -> bool {
        self.snapshot.container_near(loc, range).is_some()
            || self.containers.iter().any(|c| c.distance_to(loc) <= range)
    }

    /// Tier limit minus what is built, pending or planned.
    pub fn remaining_quota(&self, structure_type: StructureType) -> usize {
        let limit = max_structures_at_rcl(structure_type, self.snapshot.controller_level()) as usize;
        let planned = self.counts.get(&structure_type).copied().unwrap_or(0);
        limit
            .saturating_sub(self.snapshot.count_with_sites(structure_type))
            .saturating_sub(planned)
    }

    /// Record a proposed tile so later proposals see it as taken.
    pub fn claim(&mut self, loc: Location, structure_type: StructureType) {
        self.planned.insert(loc);
        *self.counts.entry(structure_type).or_insert(0) += 1;
        match structure_type {
            StructureType::Road => {
                self.roads.insert(loc);
            }
            StructureType::Rampart => {}
            StructureType::Container => {
                self.containers.push(loc);
                self.matrix.block(loc);
            }
            _ => self.matrix.block(loc),
        }
    }
}

/// Container tile for a harvestable resource (source or mineral).
///
/// Walks the hub -> resource path backwards and takes the first buildable tile
/// within `container_offset`; falls back to scanning the square around the
/// resource when no path exists or the path tiles are all taken.
pub(crate) fn resource_container(ctx: &SiteContext, resource: Location) -> Option<Location> {
    let offset = ctx.config().container_offset;
    if ctx.container_within(resource, offset) {
        return None;
    }

    let hub = ctx.snapshot().primary_hub().map(|hub| hub.location);

    if let Some(hub) = hub {
        if let Some(path) = find_path(hub, resource, 1, ctx.matrix(), ctx.config().max_path_ops) {
            let on_path = path
                .iter()
                .rev()
                .copied()
                .find(|loc| loc.distance_to(resource) <= offset && ctx.is_buildable(*loc));
            if on_path.is_some() {
                return on_path;
            }
        }
    }

    let mut candidates: Vec<Location> = Vec::new();
    let radius = offset as i8;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if let Some(loc) = resource.checked_add(dx, dy) {
                if ctx.is_buildable(loc) {
                    candidates.push(loc);
                }
            }
        }
    }

    candidates.sort_by_key(|loc| {
        (
            loc.distance_to(resource),
            hub.map(|h| h.manhattan_to(*loc)).unwrap_or(0),
            loc.y(),
            loc.x(),
        )
    });

    candidates.into_iter().next()
}
