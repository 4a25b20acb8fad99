//! Fixtures shared by the unit tests: hand-built snapshots and an in-memory
//! world that applies orders the way the game would.

use crate::error::PlanError;
use crate::location::*;
use crate::plan::PlanOperation;
use crate::room_data::*;
use crate::terrain::*;
use fnv::FnvHashSet;
use std::collections::BTreeMap;

use screeps::constants::StructureType;

pub const HUB: (u8, u8) = (25, 25);
pub const SOURCE_A: (u8, u8) = (10, 10);
pub const SOURCE_B: (u8, u8) = (40, 12);
pub const CONTROLLER: (u8, u8) = (25, 42);
pub const MINERAL: (u8, u8) = (40, 40);

pub fn loc(x: u8, y: u8) -> Location {
    Location::from_xy(x, y)
}

/// An empty plain room at the given controller level.
pub fn plain_snapshot(rcl: u8) -> TerritorySnapshot {
    TerritorySnapshot::new(FastRoomTerrain::plain(), rcl)
}

/// A plain room with one spawn, two sources, a controller and a mineral.
pub fn basic_snapshot(rcl: u8) -> TerritorySnapshot {
    let mut snapshot = plain_snapshot(rcl);
    snapshot.add_spawn(Anchor::new("spawn1", loc(HUB.0, HUB.1)));
    snapshot.add_source(Anchor::new("src_a", loc(SOURCE_A.0, SOURCE_A.1)));
    snapshot.add_source(Anchor::new("src_b", loc(SOURCE_B.0, SOURCE_B.1)));
    snapshot.set_controller(Anchor::new("ctrl", loc(CONTROLLER.0, CONTROLLER.1)));
    snapshot.add_mineral(Anchor::new("min_a", loc(MINERAL.0, MINERAL.1)));
    snapshot
}

pub fn wall(snapshot: &mut TerritorySnapshot, x: u8, y: u8) {
    snapshot.terrain_mut().set_xy(x, y, TerrainFlags::WALL);
}

pub fn road(snapshot: &mut TerritorySnapshot, x: u8, y: u8) {
    snapshot.add_structure(loc(x, y), StructureType::Road);
}

/// In-memory world: snapshots are mutated by executed orders.
#[derive(Default)]
pub struct MockWorld {
    pub rooms: BTreeMap<String, TerritorySnapshot>,
    pub invisible: FnvHashSet<String>,
    pub executed: Vec<(String, PlanOperation)>,
}

impl MockWorld {
    pub fn with_room(room: &str, snapshot: TerritorySnapshot) -> Self {
        let mut world = MockWorld::default();
        world.rooms.insert(room.to_string(), snapshot);
        world
    }

    pub fn room(&self, room: &str) -> &TerritorySnapshot {
        &self.rooms[room]
    }

    pub fn room_mut(&mut self, room: &str) -> &mut TerritorySnapshot {
        self.rooms.get_mut(room).unwrap()
    }

    /// Finish every pending construction site in the room.
    pub fn build_all(&mut self, room: &str) {
        let snapshot = self.room_mut(room);
        for (location, structure_type) in snapshot.take_sites() {
            snapshot.add_structure(location, structure_type);
        }
    }

    pub fn executed_in(&self, room: &str) -> Vec<&PlanOperation> {
        self.executed
            .iter()
            .filter(|(r, _)| r == room)
            .map(|(_, op)| op)
            .collect()
    }
}

impl World for MockWorld {
    fn territories(&self) -> Vec<String> {
        self.rooms
            .keys()
            .chain(self.invisible.iter())
            .cloned()
            .collect()
    }

    fn snapshot(&self, room: &str) -> Result<TerritorySnapshot, PlanError> {
        if self.invisible.contains(room) {
            return Err(PlanError::NotVisible(room.to_string()));
        }
        self.rooms
            .get(room)
            .cloned()
            .ok_or_else(|| PlanError::NotVisible(room.to_string()))
    }

    fn execute(&mut self, room: &str, operations: &[PlanOperation]) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        let snapshot = match self.rooms.get_mut(room) {
            Some(snapshot) => snapshot,
            None => {
                summary.rejected = operations.len() as u32;
                return summary;
            }
        };

        for op in operations {
            let accepted = match op {
                PlanOperation::CreateSite {
                    location,
                    structure_type,
                } => {
                    let blocked = snapshot.terrain().is_wall_at(*location)
                        || snapshot.has_structure(*location, *structure_type)
                        || snapshot.has_site(*location, *structure_type)
                        || (*structure_type != StructureType::Rampart
                            && *structure_type != StructureType::Road
                            && (snapshot.has_blocking_structure(*location)
                                || snapshot.has_blocking_site(*location)));
                    if !blocked {
                        snapshot.add_site(*location, *structure_type);
                    }
                    !blocked
                }
                PlanOperation::DestroyStructure {
                    location,
                    structure_type,
                } => snapshot.remove_structure(*location, *structure_type),
            };

            if accepted {
                summary.applied += 1;
            } else {
                summary.rejected += 1;
            }
            self.executed.push((room.to_string(), op.clone()));
        }

        summary
    }
}
