use crate::error::PlanError;
use crate::location::*;
use crate::plan::PlanOperation;
use crate::terrain::*;
use fnv::FnvHashMap;

use screeps::constants::StructureType;

/// A named object the planner anchors placements to (spawn, source,
/// controller, mineral).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub id: String,
    pub location: Location,
}

impl Anchor {
    pub fn new(id: impl Into<String>, location: Location) -> Self {
        Anchor {
            id: id.into(),
            location,
        }
    }
}

/// A lightweight description of a structure present in the room.
///
/// This avoids requiring game-API objects in the planning logic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistingStructure {
    pub location: Location,
    pub structure_type: StructureType,
}

/// Read-only view of one territory for a single planning cycle.
///
/// Built once per cycle (from the game API or from test fixtures) and indexed
/// by tile so placement checks stay O(1).
#[derive(Clone)]
pub struct TerritorySnapshot {
    terrain: FastRoomTerrain,
    controller_level: u8,
    spawns: Vec<Anchor>,
    sources: Vec<Anchor>,
    controller: Option<Anchor>,
    minerals: Vec<Anchor>,
    structures: FnvHashMap<Location, Vec<StructureType>>,
    sites: FnvHashMap<Location, Vec<StructureType>>,
    structure_list: Vec<ExistingStructure>,
}

impl TerritorySnapshot {
    pub fn new(terrain: FastRoomTerrain, controller_level: u8) -> Self {
        TerritorySnapshot {
            terrain,
            controller_level,
            spawns: Vec::new(),
            sources: Vec::new(),
            controller: None,
            minerals: Vec::new(),
            structures: FnvHashMap::default(),
            sites: FnvHashMap::default(),
            structure_list: Vec::new(),
        }
    }

    /// Spawns are also recorded as structures at their location.
    pub fn add_spawn(&mut self, spawn: Anchor) {
        self.add_structure(spawn.location, StructureType::Spawn);
        self.spawns.push(spawn);
    }

    pub fn add_source(&mut self, source: Anchor) {
        self.sources.push(source);
    }

    pub fn set_controller(&mut self, controller: Anchor) {
        self.controller = Some(controller);
    }

    pub fn add_mineral(&mut self, mineral: Anchor) {
        self.minerals.push(mineral);
    }

    pub fn add_structure(&mut self, location: Location, structure_type: StructureType) {
        self.structures
            .entry(location)
            .or_default()
            .push(structure_type);
        self.structure_list.push(ExistingStructure {
            location,
            structure_type,
        });
    }

    pub fn add_site(&mut self, location: Location, structure_type: StructureType) {
        self.sites.entry(location).or_default().push(structure_type);
    }

    /// Drop one structure of the given type from a tile, returning whether
    /// anything was removed.
    pub fn remove_structure(&mut self, location: Location, structure_type: StructureType) -> bool {
        let removed = match self.structures.get_mut(&location) {
            Some(types) => match types.iter().position(|t| *t == structure_type) {
                Some(index) => {
                    types.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };
        if removed {
            if let Some(index) = self
                .structure_list
                .iter()
                .position(|s| s.location == location && s.structure_type == structure_type)
            {
                self.structure_list.remove(index);
            }
        }
        removed
    }

    /// Take every pending site off the map.
    pub fn take_sites(&mut self) -> Vec<(Location, StructureType)> {
        let mut sites: Vec<(Location, StructureType)> = self
            .sites
            .drain()
            .flat_map(|(loc, types)| types.into_iter().map(move |t| (loc, t)))
            .collect();
        sites.sort_by_key(|(loc, _)| *loc);
        sites
    }

    pub fn terrain(&self) -> &FastRoomTerrain {
        &self.terrain
    }

    pub fn terrain_mut(&mut self) -> &mut FastRoomTerrain {
        &mut self.terrain
    }

    pub fn controller_level(&self) -> u8 {
        self.controller_level
    }

    /// Spawns ordered by id; the first one is the primary hub.
    pub fn hubs(&self) -> Vec<&Anchor> {
        let mut hubs: Vec<&Anchor> = self.spawns.iter().collect();
        hubs.sort_by(|a, b| a.id.cmp(&b.id));
        hubs
    }

    pub fn primary_hub(&self) -> Option<&Anchor> {
        self.spawns.iter().min_by(|a, b| a.id.cmp(&b.id))
    }

    /// Sources ordered by id.
    pub fn sources(&self) -> Vec<&Anchor> {
        let mut sources: Vec<&Anchor> = self.sources.iter().collect();
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        sources
    }

    pub fn controller(&self) -> Option<&Anchor> {
        self.controller.as_ref()
    }

    /// Minerals ordered by id.
    pub fn minerals(&self) -> Vec<&Anchor> {
        let mut minerals: Vec<&Anchor> = self.minerals.iter().collect();
        minerals.sort_by(|a, b| a.id.cmp(&b.id));
        minerals
    }

    /// Every tile occupied by a room object creeps cannot walk onto.
    pub fn anchor_locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.sources
            .iter()
            .chain(self.minerals.iter())
            .chain(self.controller.iter())
            .map(|anchor| anchor.location)
    }

    pub fn structures(&self) -> &[ExistingStructure] {
        &self.structure_list
    }

    pub fn structures_at(&self, loc: Location) -> &[StructureType] {
        self.structures
            .get(&loc)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn sites_at(&self, loc: Location) -> &[StructureType] {
        self.sites.get(&loc).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn has_structure(&self, loc: Location, structure_type: StructureType) -> bool {
        self.structures_at(loc).contains(&structure_type)
    }

    pub fn has_site(&self, loc: Location, structure_type: StructureType) -> bool {
        self.sites_at(loc).contains(&structure_type)
    }

    /// True if a non-road, non-rampart structure stands on the tile.
    pub fn has_blocking_structure(&self, loc: Location) -> bool {
        self.structures_at(loc)
            .iter()
            .any(|t| !matches!(t, StructureType::Road | StructureType::Rampart))
    }

    /// True if a non-road, non-rampart construction site is on the tile.
    pub fn has_blocking_site(&self, loc: Location) -> bool {
        self.sites_at(loc)
            .iter()
            .any(|t| !matches!(t, StructureType::Road | StructureType::Rampart))
    }

    pub fn has_any_site(&self, loc: Location) -> bool {
        !self.sites_at(loc).is_empty()
    }

    /// Built plus pending count of a structure type.
    pub fn count_with_sites(&self, structure_type: StructureType) -> usize {
        let built = self
            .structures
            .values()
            .flat_map(|v| v.iter())
            .filter(|t| **t == structure_type)
            .count();
        let pending = self
            .sites
            .values()
            .flat_map(|v| v.iter())
            .filter(|t| **t == structure_type)
            .count();
        built + pending
    }

    /// Tiles holding a road structure or a pending road site.
    pub fn road_tiles(&self) -> impl Iterator<Item = Location> + '_ {
        let built = self
            .structures
            .iter()
            .filter(|(_, types)| types.contains(&StructureType::Road))
            .map(|(loc, _)| *loc);
        let pending = self
            .sites
            .iter()
            .filter(|(_, types)| types.contains(&StructureType::Road))
            .map(|(loc, _)| *loc);
        built.chain(pending)
    }

    /// Any container structure or container site within `range` of `loc`.
    pub fn container_near(&self, loc: Location, range: u8) -> Option<Location> {
        let mut found: Vec<Location> = self
            .structures
            .iter()
            .chain(self.sites.iter())
            .filter(|(l, types)| {
                l.distance_to(loc) <= range && types.contains(&StructureType::Container)
            })
            .map(|(l, _)| *l)
            .collect();
        found.sort();
        found.into_iter().next()
    }
}

/// Advisory outcome of executing a batch of plan operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub applied: u32,
    pub rejected: u32,
}

/// The live world as the planner sees it.
///
/// Implemented over the game API by `game::GameWorld` (behind the `screeps`
/// feature) and by an in-memory mock in tests.
pub trait World {
    /// Names of the territories to plan this tick.
    fn territories(&self) -> Vec<String>;

    fn snapshot(&self, room: &str) -> Result<TerritorySnapshot, PlanError>;

    /// Apply build and destroy orders. Rejections are advisory: the planner
    /// leaves rejected coordinates planned and retries next cycle.
    fn execute(&mut self, room: &str, operations: &[PlanOperation]) -> ExecutionSummary;
}
