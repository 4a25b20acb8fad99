//! Live game adapter: snapshots owned rooms and executes plan operations
//! through the Screeps API.

use crate::budget::CpuBudget;
use crate::error::PlanError;
use crate::location::Location;
use crate::plan::PlanOperation;
use crate::room_data::{Anchor, ExecutionSummary, TerritorySnapshot, World};
use crate::terrain::FastRoomTerrain;
use log::*;
use std::str::FromStr;

use screeps::*;

fn to_location<T: HasPosition>(object: &T) -> Location {
    let pos = object.pos();
    Location::from_coords(pos.x().u8() as u32, pos.y().u8() as u32)
}

fn lookup_room(room: &str) -> Result<Room, PlanError> {
    let name = RoomName::from_str(room).map_err(|_| PlanError::NotVisible(room.to_string()))?;
    game::rooms()
        .get(name)
        .ok_or_else(|| PlanError::NotVisible(room.to_string()))
}

/// `World` over the running game. Territories are the rooms whose controller
/// is owned by the player.
#[derive(Default)]
pub struct GameWorld;

impl World for GameWorld {
    fn territories(&self) -> Vec<String> {
        game::rooms()
            .values()
            .filter(|room| room.controller().map(|c| c.my()).unwrap_or(false))
            .map(|room| room.name().to_string())
            .collect()
    }

    fn snapshot(&self, room_name: &str) -> Result<TerritorySnapshot, PlanError> {
        let room = lookup_room(room_name)?;

        let terrain = FastRoomTerrain::new(room.get_terrain().get_raw_buffer().to_vec());
        let level = room.controller().map(|c| c.level()).unwrap_or(0);
        let mut snapshot = TerritorySnapshot::new(terrain, level);

        if let Some(controller) = room.controller() {
            snapshot.set_controller(Anchor::new(
                controller.id().to_string(),
                to_location(&controller),
            ));
        }

        for spawn in room.find(find::MY_SPAWNS, None) {
            snapshot.add_spawn(Anchor::new(String::from(spawn.name()), to_location(&spawn)));
        }

        for source in room.find(find::SOURCES, None) {
            snapshot.add_source(Anchor::new(source.id().to_string(), to_location(&source)));
        }

        for mineral in room.find(find::MINERALS, None) {
            snapshot.add_mineral(Anchor::new(mineral.id().to_string(), to_location(&mineral)));
        }

        for structure in room.find(find::STRUCTURES, None) {
            let structure_type = structure.structure_type();
            // Spawns were recorded with their anchors.
            if structure_type != StructureType::Spawn {
                snapshot.add_structure(to_location(&structure), structure_type);
            }
        }

        for site in room.find(find::MY_CONSTRUCTION_SITES, None) {
            snapshot.add_site(to_location(&site), site.structure_type());
        }

        Ok(snapshot)
    }

    fn execute(&mut self, room_name: &str, operations: &[PlanOperation]) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();

        let room = match lookup_room(room_name) {
            Ok(room) => room,
            Err(err) => {
                warn!("Cannot execute plan operations: {}", err);
                summary.rejected = operations.len() as u32;
                return summary;
            }
        };

        for op in operations {
            let accepted = match op {
                PlanOperation::CreateSite {
                    location,
                    structure_type,
                } => room
                    .create_construction_site(location.x(), location.y(), *structure_type, None)
                    .is_ok(),
                PlanOperation::DestroyStructure {
                    location,
                    structure_type,
                } => {
                    let pos = RoomPosition::new(location.x(), location.y(), room.name());
                    room.look_for_at(look::STRUCTURES, &pos)
                        .iter()
                        .filter(|s| s.structure_type() == *structure_type)
                        .fold(false, |destroyed, s| s.destroy().is_ok() || destroyed)
                }
            };

            if accepted {
                summary.applied += 1;
            } else {
                trace!("Operation rejected in {}: {:?}", room_name, op);
                summary.rejected += 1;
            }
        }

        summary
    }
}

/// Budget that stops starting territories once `limit` CPU has been used this
/// tick.
pub fn cpu_budget(limit: f64) -> CpuBudget {
    CpuBudget::new(move || game::cpu::get_used() < limit)
}
