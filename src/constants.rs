pub const ROOM_WIDTH: u8 = 50;
pub const ROOM_HEIGHT: u8 = 50;

/// Lowest x/y a structure may be placed at (exit tiles are never buildable).
pub const ROOM_BUILD_MIN: u8 = 1;
/// Highest x/y a structure may be placed at.
pub const ROOM_BUILD_MAX: u8 = 48;

use screeps::constants::StructureType;

/// Maximum number of a given structure type allowed at a given RCL.
/// Returns 0 if the structure is not available at that RCL.
/// Based on the Screeps API: <https://docs.screeps.com/control.html>
///
/// Only the categories the planner gates on are listed; containers and roads
/// have no per-RCL limits.
pub fn max_structures_at_rcl(structure_type: StructureType, rcl: u8) -> u32 {
    match structure_type {
        StructureType::Extension => match rcl {
            0 | 1 => 0,
            2 => 5,
            3 => 10,
            4 => 20,
            5 => 30,
            6 => 40,
            7 => 50,
            _ => 60,
        },
        StructureType::Tower => match rcl {
            0..=2 => 0,
            3..=4 => 1,
            5..=6 => 2,
            7 => 3,
            _ => 6,
        },
        StructureType::Rampart | StructureType::Wall => match rcl {
            0 | 1 => 0,
            _ => 2500,
        },
        StructureType::Road | StructureType::Container => 2500,
        _ => 0,
    }
}

/// Structures important enough to always sit under a rampart once built.
pub fn is_overlay_eligible(structure_type: StructureType) -> bool {
    matches!(
        structure_type,
        StructureType::Spawn
            | StructureType::Extension
            | StructureType::Storage
            | StructureType::Tower
            | StructureType::Terminal
            | StructureType::Lab
            | StructureType::Factory
            | StructureType::PowerSpawn
            | StructureType::Nuker
            | StructureType::Observer
            | StructureType::Link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tower_quota_follows_rcl() {
        assert_eq!(max_structures_at_rcl(StructureType::Tower, 2), 0);
        assert_eq!(max_structures_at_rcl(StructureType::Tower, 3), 1);
        assert_eq!(max_structures_at_rcl(StructureType::Tower, 8), 6);
    }

    #[test]
    fn ramparts_unlock_at_rcl_two() {
        assert_eq!(max_structures_at_rcl(StructureType::Rampart, 1), 0);
        assert!(max_structures_at_rcl(StructureType::Rampart, 2) > 0);
    }

    #[test]
    fn roads_are_not_overlay_eligible() {
        assert!(!is_overlay_eligible(StructureType::Road));
        assert!(!is_overlay_eligible(StructureType::Rampart));
        assert!(is_overlay_eligible(StructureType::Extension));
    }
}
