use crate::location::*;

use screeps::constants::StructureType;

/// An operation that the planner wants the caller to perform.
///
/// Produced by the construction applier and the road pruning pass. The
/// planner itself never touches the game API; `World::execute` does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanOperation {
    /// Create a construction site at the given location.
    CreateSite {
        location: Location,
        structure_type: StructureType,
    },
    /// Destroy the structure of the given type at the given location.
    DestroyStructure {
        location: Location,
        structure_type: StructureType,
    },
}

impl PlanOperation {
    pub fn location(&self) -> Location {
        match self {
            PlanOperation::CreateSite { location, .. } => *location,
            PlanOperation::DestroyStructure { location, .. } => *location,
        }
    }

    pub fn structure_type(&self) -> StructureType {
        match self {
            PlanOperation::CreateSite { structure_type, .. } => *structure_type,
            PlanOperation::DestroyStructure { structure_type, .. } => *structure_type,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, PlanOperation::CreateSite { .. })
    }
}
