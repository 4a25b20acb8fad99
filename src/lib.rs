pub mod budget;
pub mod cleanup;
pub mod config;
pub mod constants;
pub mod construction;
pub mod error;
pub mod location;
pub mod plan;
pub mod plan_key;
pub mod planner;
pub mod roads;
pub mod room_data;
pub mod sites;
pub mod store;
pub mod terrain;

#[cfg(feature = "screeps")]
pub mod game;
#[cfg(feature = "screeps")]
pub use game::*;

#[cfg(test)]
mod testing;

pub use budget::CpuBudget;
pub use config::PlannerConfig;
pub use error::PlanError;
pub use location::Location;
pub use plan::PlanOperation;
pub use plan_key::PlanKey;
pub use planner::*;
pub use room_data::{TerritorySnapshot, World};
pub use store::PlanStore;
