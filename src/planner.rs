//! Public API for the incremental territory planner.
//!
//! `Planner::run_tick` is the per-tick entry point: it walks every territory
//! the `World` reports, replans the ones that are due, hands the resulting
//! orders back to the world, and periodically sweeps the plan store. All
//! progress lives in the `PlanStore`; nothing is resumed mid-territory.

use crate::budget::CpuBudget;
use crate::cleanup::*;
use crate::config::PlannerConfig;
use crate::construction::*;
use crate::error::PlanError;
use crate::location::*;
use crate::plan::PlanOperation;
use crate::plan_key::*;
use crate::roads::connector::*;
use crate::roads::road_network::*;
use crate::roads::road_prune::*;
use crate::room_data::*;
use crate::sites::*;
use crate::store::*;
use itertools::Itertools;
use log::*;
use std::collections::BTreeMap;

/// Where a territory sits in its planning cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TerritoryPhase {
    /// Never planned.
    Idle,
    /// Planned before and due again.
    Planning,
    /// Planned recently; nothing to do this tick.
    Stable,
}

impl TerritoryPhase {
    pub fn of(plan: &TerritoryPlan, tick: u32, config: &PlannerConfig) -> TerritoryPhase {
        match plan.last_plan_tick {
            None => TerritoryPhase::Idle,
            Some(last) if tick.saturating_sub(last) >= config.plan_interval => {
                TerritoryPhase::Planning
            }
            Some(_) => TerritoryPhase::Stable,
        }
    }

    pub fn is_due(self) -> bool {
        self != TerritoryPhase::Stable
    }
}

/// What one planning cycle did to a territory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Orders for the world, destroys first.
    pub operations: Vec<PlanOperation>,
    pub stale_roads_removed: usize,
    pub containers_planned: usize,
    pub roads_created: usize,
    pub roads_without_route: usize,
    pub hub_keys_planned: usize,
    pub halos_created: usize,
    pub connectors: ConnectorReport,
    pub ramparts_planned: usize,
    pub tiles_completed: usize,
    pub orders_deferred: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerritoryOutcome {
    Planned {
        report: PlanReport,
        execution: ExecutionSummary,
    },
    Stable,
}

/// Everything that happened during one `run_tick`.
#[derive(Debug, Default)]
pub struct TickReport {
    pub territories: BTreeMap<String, Result<TerritoryOutcome, PlanError>>,
    /// Territories that were due but not started because the CPU budget ran
    /// out. They are first in line on the next tick.
    pub deferred: Vec<String>,
    pub cleanup: Option<CleanupReport>,
}

impl TickReport {
    pub fn planned(&self) -> usize {
        self.territories
            .values()
            .filter(|r| matches!(r, Ok(TerritoryOutcome::Planned { .. })))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&String, &PlanError)> {
        self.territories
            .iter()
            .filter_map(|(room, result)| result.as_ref().err().map(|err| (room, err)))
    }
}

/// A vertex of the energy road mesh.
struct EnergyNode {
    id: String,
    location: Location,
}

#[derive(Clone, Debug, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Planner { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run every territory that is due, within the CPU budget.
    pub fn run_tick(
        &self,
        store: &mut PlanStore,
        world: &mut dyn World,
        tick: u32,
        budget: &CpuBudget,
    ) -> TickReport {
        let mut report = TickReport::default();

        let rooms: Vec<String> = world.territories().into_iter().sorted().dedup().collect();
        let mut out_of_budget = false;

        for room in rooms {
            let territory = store.ensure_territory(&room, tick);
            territory.last_seen_tick = tick;

            let phase = TerritoryPhase::of(territory, tick, &self.config);
            if !phase.is_due() {
                report
                    .territories
                    .insert(room, Ok(TerritoryOutcome::Stable));
                continue;
            }

            if out_of_budget || !budget.has_budget() {
                out_of_budget = true;
                report.deferred.push(room);
                continue;
            }

            let result = world
                .snapshot(&room)
                .and_then(|snapshot| self.plan_territory(store, &room, &snapshot, tick))
                .map(|plan_report| {
                    let execution = world.execute(&room, &plan_report.operations);
                    if execution.rejected > 0 {
                        debug!(
                            "{}: {} of {} orders rejected",
                            room,
                            execution.rejected,
                            plan_report.operations.len()
                        );
                    }
                    TerritoryOutcome::Planned {
                        report: plan_report,
                        execution,
                    }
                });

            if let Err(err) = &result {
                warn!("Planning failed for {}: {}", room, err);
            }

            report.territories.insert(room, result);
        }

        if !report.deferred.is_empty() {
            debug!(
                "CPU budget exhausted, deferring {} territories",
                report.deferred.len()
            );
        }

        if tick.saturating_sub(store.last_cleanup_tick()) >= self.config.cleanup_interval {
            report.cleanup = Some(sweep(store, &self.config, tick));
        }

        report
    }

    /// One full planning cycle for a single territory.
    #[cfg_attr(feature = "profile", screeps_timing_annotate::timing)]
    pub fn plan_territory(
        &self,
        store: &mut PlanStore,
        room: &str,
        snapshot: &TerritorySnapshot,
        tick: u32,
    ) -> Result<PlanReport, PlanError> {
        if !snapshot.terrain().is_complete() {
            return Err(PlanError::InvalidTerrain {
                room: room.to_string(),
                len: snapshot.terrain().len(),
            });
        }

        let config = &self.config;
        let mut report = PlanReport::default();

        // --- (a) Territory state ------------------------------------------
        let plan = store.ensure_territory(room, tick);

        // --- (b) Stale roads ----------------------------------------------
        report.stale_roads_removed = prune_stale_roads(plan, snapshot, config.stale_road_age, tick);

        // --- (c) Resource containers --------------------------------------
        report.containers_planned = run_layers(&container_layers(), plan, snapshot, config, tick);

        // --- (d) Energy road mesh -----------------------------------------
        let (created, failed) = plan_energy_roads(plan, snapshot, config, tick);
        report.roads_created = created;
        report.roads_without_route = failed;

        // --- (e) Hub blocks -----------------------------------------------
        report.hub_keys_planned = run_layers(&hub_layers(), plan, snapshot, config, tick);

        // --- (f) Halo padding ---------------------------------------------
        report.halos_created = pad_halos(plan, snapshot, tick);

        // --- (g) Roads under structures -----------------------------------
        let mut operations = prune_roads_under_structures(plan, snapshot);

        // --- (h) Cluster connectors ---------------------------------------
        let mut matrix = RoadCostMatrix::new(snapshot, plan, config);
        report.connectors = connect_clusters(plan, snapshot, &mut matrix, config, tick);

        // --- (i) Cycle bookkeeping ----------------------------------------
        plan.last_plan_tick = Some(tick);

        // --- (j) Rampart overlay ------------------------------------------
        report.ramparts_planned = plan_ramparts(plan, snapshot, config, tick);

        let applied = apply_plan(plan, snapshot, config, tick);
        report.ramparts_planned += applied.ramparts_planned;
        report.tiles_completed = applied.completed;
        report.orders_deferred = applied.deferred;
        operations.extend(applied.operations);
        report.operations = operations;

        info!(
            "Planned {}: {} orders, {} roads, {} connectors, {} road components",
            room,
            report.operations.len(),
            report.roads_created,
            report.connectors.connectors_created,
            report.connectors.components_after
        );

        Ok(report)
    }
}

/// Run site layers in order and commit their proposals. Returns the number
/// of plan keys created.
fn run_layers(
    layers: &[Box<dyn SiteLayer>],
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
    config: &PlannerConfig,
    tick: u32,
) -> usize {
    let mut proposals: Vec<Proposal> = Vec::new();
    let mut ctx = SiteContext::new(snapshot, plan, config);
    for layer in layers {
        if !layer.is_applicable(&ctx) {
            continue;
        }
        let proposed = layer.propose(&mut ctx, plan);
        trace!("{} proposed {} keys", layer.name(), proposed.len());
        proposals.extend(proposed);
    }

    let count = proposals.len();
    for proposal in proposals {
        plan.set(proposal.key, proposal.positions, tick);
    }
    count
}

/// Energy nodes in a fixed order: sources by id, the controller, then
/// minerals once their containers are unlocked.
fn energy_nodes(
    plan: &TerritoryPlan,
    snapshot: &TerritorySnapshot,
    config: &PlannerConfig,
) -> Vec<EnergyNode> {
    let node_at = |key: PlanKey, anchor: Location, range: u8| -> Location {
        plan.get(&key)
            .and_then(|p| p.first())
            .or_else(|| snapshot.container_near(anchor, range))
            .unwrap_or(anchor)
    };

    let mut nodes = Vec::new();

    for source in snapshot.sources() {
        nodes.push(EnergyNode {
            id: source.id.clone(),
            location: node_at(
                PlanKey::SourceContainer(source.id.clone()),
                source.location,
                config.container_offset,
            ),
        });
    }

    if let Some(controller) = snapshot.controller() {
        nodes.push(EnergyNode {
            id: CONTROLLER_ANCHOR.to_string(),
            location: node_at(
                PlanKey::ControllerContainer,
                controller.location,
                config.controller_container_offset.saturating_add(1),
            ),
        });
    }

    if snapshot.controller_level() >= config.mineral_min_rcl {
        for mineral in snapshot.minerals() {
            nodes.push(EnergyNode {
                id: mineral.id.clone(),
                location: node_at(
                    PlanKey::MineralContainer(mineral.id.clone()),
                    mineral.location,
                    config.container_offset,
                ),
            });
        }
    }

    nodes
}

/// Roads from the primary hub to every energy node and between every pair of
/// nodes. Returns (created, without route).
fn plan_energy_roads(
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
    config: &PlannerConfig,
    tick: u32,
) -> (usize, usize) {
    let nodes = energy_nodes(plan, snapshot, config);
    let mut matrix = RoadCostMatrix::new(snapshot, plan, config);

    let mut routes: Vec<(PlanKey, Location, Location)> = Vec::new();
    if let Some(hub) = snapshot.primary_hub() {
        for node in &nodes {
            routes.push((PlanKey::road(hub.id.as_str(), node.id.as_str()), hub.location, node.location));
        }
    }
    for (a, b) in nodes.iter().tuple_combinations() {
        routes.push((PlanKey::road(a.id.as_str(), b.id.as_str()), a.location, b.location));
    }

    let mut created = 0;
    let mut failed = 0;
    for (key, from, to) in routes {
        match synthesize_road(plan, &mut matrix, key, from, to, 1, config, tick) {
            RoadOutcome::Created(_) => created += 1,
            RoadOutcome::NoRoute => failed += 1,
            RoadOutcome::Cached => {}
        }
    }

    (created, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FastRoomTerrain;
    use crate::testing::*;
    use screeps::constants::StructureType;
    use std::cell::Cell;
    use std::rc::Rc;

    const ROOM: &str = "W1N1";

    fn scenario_a_snapshot() -> TerritorySnapshot {
        let mut snapshot = plain_snapshot(3);
        snapshot.add_spawn(Anchor::new("spawn1", loc(HUB.0, HUB.1)));
        snapshot.add_source(Anchor::new("src_a", loc(SOURCE_A.0, SOURCE_A.1)));
        snapshot.add_source(Anchor::new("src_b", loc(SOURCE_B.0, SOURCE_B.1)));
        snapshot.set_controller(Anchor::new("ctrl", loc(CONTROLLER.0, CONTROLLER.1)));
        snapshot
    }

    #[test]
    fn scenario_a_plans_containers_mesh_and_towers() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let snapshot = scenario_a_snapshot();

        planner.plan_territory(&mut store, ROOM, &snapshot, 10).unwrap();
        let plan = store.territory(ROOM).unwrap();

        assert_eq!(plan.keys_of(PlanCategory::SourceContainer).len(), 2);
        assert!(plan.contains_key(&PlanKey::SourceContainer("src_a".into())));
        assert!(plan.contains_key(&PlanKey::SourceContainer("src_b".into())));
        assert!(plan.contains_key(&PlanKey::ControllerContainer));
        assert!(plan.keys_of(PlanCategory::MineralContainer).is_empty());

        for key in [
            PlanKey::road("spawn1", "src_a"),
            PlanKey::road("spawn1", "src_b"),
            PlanKey::road("spawn1", CONTROLLER_ANCHOR),
            PlanKey::road("src_a", "src_b"),
            PlanKey::road("src_a", CONTROLLER_ANCHOR),
            PlanKey::road("src_b", CONTROLLER_ANCHOR),
        ] {
            assert!(plan.contains_key(&key), "missing {}", key);
        }
        let energy_roads = plan
            .keys_of(PlanCategory::Road)
            .into_iter()
            .filter(|k| !k.is_halo())
            .count();
        assert_eq!(energy_roads, 6);

        let towers = plan.get(&PlanKey::Towers("spawn1".into())).unwrap();
        assert_eq!(towers.len(), 1);
        assert_eq!(plan.last_plan_tick, Some(10));
    }

    #[test]
    fn replanning_unchanged_world_adds_nothing() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let snapshot = basic_snapshot(4);

        // Connectors are rate limited, so let them settle first.
        let mut tick = 10;
        for _ in 0..10 {
            let report = planner.plan_territory(&mut store, ROOM, &snapshot, tick).unwrap();
            tick += 100;
            if report.connectors.connectors_created == 0 {
                break;
            }
        }
        let settled = store.territory(ROOM).unwrap().clone();

        let report = planner.plan_territory(&mut store, ROOM, &snapshot, tick).unwrap();
        let again = store.territory(ROOM).unwrap();

        assert_eq!(settled.keys(), again.keys());
        for key in settled.keys() {
            assert_eq!(settled.get(&key), again.get(&key), "{} changed", key);
        }
        assert_eq!(report.roads_created, 0);
        assert_eq!(report.connectors.connectors_created, 0);
        assert_eq!(report.hub_keys_planned, 0);
        assert_eq!(report.containers_planned, 0);
    }

    #[test]
    fn quota_is_respected_across_cycles() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut world = MockWorld::with_room(ROOM, basic_snapshot(3));
        let budget = CpuBudget::unlimited();

        for cycle in 0..6u32 {
            planner.run_tick(&mut store, &mut world, 1 + cycle * 100, &budget);
            world.build_all(ROOM);

            let snapshot = world.room(ROOM);
            let plan = store.territory(ROOM).unwrap();
            for structure_type in [StructureType::Extension, StructureType::Tower] {
                let category = if structure_type == StructureType::Tower {
                    PlanCategory::Towers
                } else {
                    PlanCategory::Extensions
                };
                let total = snapshot.count_with_sites(structure_type) + plan.planned_count(category);
                let limit = crate::constants::max_structures_at_rcl(structure_type, 3) as usize;
                assert!(total <= limit, "{:?}: {} > {}", structure_type, total, limit);
            }
        }
    }

    #[test]
    fn repeated_cycles_converge() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut world = MockWorld::with_room(ROOM, basic_snapshot(3));
        let budget = CpuBudget::unlimited();

        let mut quiet = false;
        for cycle in 0..100u32 {
            let report = planner.run_tick(&mut store, &mut world, 1 + cycle * 100, &budget);
            let orders = match &report.territories[ROOM] {
                Ok(TerritoryOutcome::Planned { report, .. }) => report.operations.len(),
                other => panic!("unexpected outcome {:?}", other),
            };
            if orders == 0 {
                quiet = true;
                break;
            }
            world.build_all(ROOM);
        }

        assert!(quiet, "planner never settled");
        let plan = store.territory(ROOM).unwrap();
        assert!(plan.keys().iter().all(|k| !k.is_transient()));
        assert!(plan.entries().all(|(_, p)| p.is_empty()));
        assert_eq!(world.room(ROOM).count_with_sites(StructureType::Extension), 10);
        assert_eq!(world.room(ROOM).count_with_sites(StructureType::Tower), 1);
    }

    #[test]
    fn stable_territories_are_skipped_until_due() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut world = MockWorld::with_room(ROOM, basic_snapshot(2));
        let budget = CpuBudget::unlimited();

        let first = planner.run_tick(&mut store, &mut world, 1, &budget);
        assert_eq!(first.planned(), 1);

        let second = planner.run_tick(&mut store, &mut world, 50, &budget);
        assert!(matches!(second.territories[ROOM], Ok(TerritoryOutcome::Stable)));
        assert_eq!(store.territory(ROOM).unwrap().last_seen_tick, 50);

        let third = planner.run_tick(&mut store, &mut world, 101, &budget);
        assert_eq!(third.planned(), 1);
    }

    #[test]
    fn one_failing_territory_does_not_stop_the_rest() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut world = MockWorld::with_room(ROOM, basic_snapshot(2));
        world.invisible.insert("W9N9".to_string());
        let broken = TerritorySnapshot::new(FastRoomTerrain::new(vec![0; 10]), 2);
        world.rooms.insert("W5N5".to_string(), broken);

        let report = planner.run_tick(&mut store, &mut world, 1, &CpuBudget::unlimited());

        assert_eq!(report.planned(), 1);
        let failures: BTreeMap<String, PlanError> = report
            .failures()
            .map(|(room, err)| (room.clone(), err.clone()))
            .collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures["W9N9"],
            PlanError::NotVisible("W9N9".to_string())
        );
        assert!(matches!(
            failures["W5N5"],
            PlanError::InvalidTerrain { len: 10, .. }
        ));
    }

    #[test]
    fn exhausted_budget_defers_remaining_territories() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut world = MockWorld::with_room("W1N1", basic_snapshot(2));
        world.rooms.insert("W2N1".to_string(), basic_snapshot(2));

        let calls = Rc::new(Cell::new(0u32));
        let counter = calls.clone();
        let budget = CpuBudget::new(move || {
            counter.set(counter.get() + 1);
            counter.get() <= 1
        });

        let report = planner.run_tick(&mut store, &mut world, 1, &budget);
        assert_eq!(report.planned(), 1);
        assert_eq!(report.deferred, vec!["W2N1".to_string()]);
        assert!(store.territory("W2N1").unwrap().last_plan_tick.is_none());

        let report = planner.run_tick(&mut store, &mut world, 2, &CpuBudget::unlimited());
        assert!(matches!(report.territories["W1N1"], Ok(TerritoryOutcome::Stable)));
        assert!(matches!(
            report.territories["W2N1"],
            Ok(TerritoryOutcome::Planned { .. })
        ));
    }

    #[test]
    fn destroyed_container_is_planned_and_ordered_again() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut snapshot = basic_snapshot(3);
        let key = PlanKey::SourceContainer("src_a".into());
        let source = loc(SOURCE_A.0, SOURCE_A.1);

        planner.plan_territory(&mut store, ROOM, &snapshot, 1).unwrap();
        let tile = store.get(ROOM, &key).unwrap().first().unwrap();

        snapshot.add_structure(tile, StructureType::Container);
        planner.plan_territory(&mut store, ROOM, &snapshot, 101).unwrap();
        assert!(store.get(ROOM, &key).unwrap().is_empty());

        assert!(snapshot.remove_structure(tile, StructureType::Container));
        let report = planner.plan_territory(&mut store, ROOM, &snapshot, 201).unwrap();

        let replanned = store.get(ROOM, &key).unwrap().first().unwrap();
        assert!(replanned.distance_to(source) <= 1);
        assert!(report.operations.contains(&PlanOperation::CreateSite {
            location: replanned,
            structure_type: StructureType::Container,
        }));
        let plan = store.territory(ROOM).unwrap();
        assert_eq!(plan.meta(&key).map(|m| m.created_at), Some(1));
    }

    #[test]
    fn second_cycle_without_progress_orders_nothing() {
        let planner = Planner::new(PlannerConfig {
            max_connectors_per_run: 100,
            max_cluster_passes: 100,
            ..PlannerConfig::default()
        });
        let mut store = PlanStore::new();
        let mut world = MockWorld::with_room(ROOM, basic_snapshot(3));
        let budget = CpuBudget::unlimited();

        let orders = |report: &TickReport| match &report.territories[ROOM] {
            Ok(TerritoryOutcome::Planned { report, .. }) => report.operations.len(),
            other => panic!("unexpected outcome {:?}", other),
        };

        let first = planner.run_tick(&mut store, &mut world, 1, &budget);
        assert!(orders(&first) > 20);
        match &first.territories[ROOM] {
            Ok(TerritoryOutcome::Planned { report, .. }) => assert_eq!(report.orders_deferred, 0),
            other => panic!("unexpected outcome {:?}", other),
        }

        let second = planner.run_tick(&mut store, &mut world, 101, &budget);
        assert_eq!(orders(&second), 0);
    }

    #[test]
    fn completed_structure_over_planned_road_is_cleared() {
        let planner = Planner::default();
        let mut store = PlanStore::new();
        let mut snapshot = basic_snapshot(3);

        planner.plan_territory(&mut store, ROOM, &snapshot, 1).unwrap();
        let key = PlanKey::road("spawn1", "src_a");
        let tile = store.get(ROOM, &key).unwrap().iter().nth(3).unwrap();

        snapshot.add_structure(tile, StructureType::Road);
        snapshot.add_structure(tile, StructureType::Storage);
        let report = planner.plan_territory(&mut store, ROOM, &snapshot, 101).unwrap();

        assert!(!store.get(ROOM, &key).unwrap().contains(tile));
        assert_eq!(
            report.operations.first(),
            Some(&PlanOperation::DestroyStructure {
                location: tile,
                structure_type: StructureType::Road,
            })
        );
    }
}
