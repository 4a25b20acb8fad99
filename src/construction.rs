//! Reconciles the territory plan with the live room.
//!
//! Planned tiles that now hold their structure are retired (and, for important
//! structures, handed to the rampart overlay). Tiles still waiting get a
//! construction order unless a site is already pending. An optional per-cycle
//! cap holds back the rest, which stays planned for the next one.

use crate::config::PlannerConfig;
use crate::constants::*;
use crate::location::*;
use crate::plan::PlanOperation;
use crate::plan_key::*;
use crate::room_data::*;
use crate::store::*;
use log::*;

use screeps::constants::StructureType;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub operations: Vec<PlanOperation>,
    /// Planned tiles retired because their structure now exists.
    pub completed: usize,
    /// Orders held back by the optional per-cycle cap.
    pub deferred: usize,
    pub ramparts_planned: usize,
    pub keys_removed: usize,
}

struct OrderQueue {
    operations: Vec<PlanOperation>,
    issued: Vec<(Location, StructureType)>,
    limit: Option<usize>,
    deferred: usize,
}

impl OrderQueue {
    fn new(limit: Option<usize>) -> Self {
        OrderQueue {
            operations: Vec::new(),
            issued: Vec::new(),
            limit,
            deferred: 0,
        }
    }

    fn create_site(&mut self, location: Location, structure_type: StructureType) {
        if self.issued.contains(&(location, structure_type)) {
            return;
        }
        if self.limit.map(|limit| self.issued.len() >= limit).unwrap_or(false) {
            self.deferred += 1;
            return;
        }
        self.issued.push((location, structure_type));
        self.operations.push(PlanOperation::CreateSite {
            location,
            structure_type,
        });
    }
}

pub fn ramparts_unlocked(snapshot: &TerritorySnapshot, config: &PlannerConfig) -> bool {
    let rcl = snapshot.controller_level();
    rcl >= config.rampart_min_rcl && max_structures_at_rcl(StructureType::Rampart, rcl) > 0
}

fn needs_rampart(snapshot: &TerritorySnapshot, loc: Location) -> bool {
    !snapshot.has_structure(loc, StructureType::Rampart)
        && !snapshot.has_site(loc, StructureType::Rampart)
}

/// Plan rampart overlays for every hub and every built structure that should
/// sit under one. Returns the number of tiles added.
pub fn plan_ramparts(
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
    config: &PlannerConfig,
    tick: u32,
) -> usize {
    if !ramparts_unlocked(snapshot, config) {
        return 0;
    }

    let mut targets: Vec<Location> = snapshot.hubs().iter().map(|hub| hub.location).collect();
    targets.extend(
        snapshot
            .structures()
            .iter()
            .filter(|s| is_overlay_eligible(s.structure_type))
            .map(|s| s.location),
    );

    targets
        .into_iter()
        .filter(|loc| needs_rampart(snapshot, *loc))
        .filter(|loc| plan.insert_position(&PlanKey::Ramparts, *loc, tick))
        .count()
}

/// Walk every planned tile, retire what is built and order what is missing.
#[cfg_attr(feature = "profile", screeps_timing_annotate::timing)]
pub fn apply_plan(
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
    config: &PlannerConfig,
    tick: u32,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut queue = OrderQueue::new(config.max_site_orders);
    let overlay = ramparts_unlocked(snapshot, config);

    for key in plan.keys() {
        let structure_type = key.structure_type();
        let positions: Vec<Location> = plan
            .get(&key)
            .map(|p| p.iter().collect())
            .unwrap_or_default();

        for loc in positions {
            if snapshot.has_structure(loc, structure_type) {
                plan.remove_position(&key, loc);
                report.completed += 1;

                if overlay && is_overlay_eligible(structure_type) && needs_rampart(snapshot, loc) {
                    if plan.insert_position(&PlanKey::Ramparts, loc, tick) {
                        report.ramparts_planned += 1;
                    }
                    queue.create_site(loc, StructureType::Rampart);
                }
                continue;
            }

            if snapshot.has_site(loc, structure_type) {
                continue;
            }

            queue.create_site(loc, structure_type);
        }
    }

    // Structures that were never planned (or were planned before the overlay
    // unlocked) still get covered.
    if overlay {
        for structure in snapshot.structures() {
            let loc = structure.location;
            if is_overlay_eligible(structure.structure_type) && needs_rampart(snapshot, loc) {
                if plan.insert_position(&PlanKey::Ramparts, loc, tick) {
                    report.ramparts_planned += 1;
                }
                queue.create_site(loc, StructureType::Rampart);
            }
        }
    }

    for key in plan.keys() {
        if key.is_transient() && !plan.has_pending(&key) {
            trace!("Removing finished plan key {}", key);
            plan.remove(&key);
            report.keys_removed += 1;
        }
    }

    if queue.deferred > 0 {
        debug!(
            "Construction order cap reached, {} orders deferred",
            queue.deferred
        );
    }

    report.deferred = queue.deferred;
    report.operations = queue.operations;
    report
}
