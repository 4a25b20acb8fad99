//! Road maintenance passes that run around road synthesis: dropping road plans
//! that never got started, padding planned structure blocks with a walkable
//! road halo, and pulling planned road tiles out from under structures.

use crate::location::*;
use crate::plan::PlanOperation;
use crate::plan_key::*;
use crate::room_data::*;
use crate::store::*;
use crate::terrain::*;
use fnv::FnvHashSet;
use log::*;

use screeps::constants::StructureType;

/// Drop road and connector keys older than `max_age` whose remaining tiles
/// show no progress on the ground (no road structure, no road site).
///
/// Keys with no remaining tiles are finished roads and are never touched.
pub fn prune_stale_roads(
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
    max_age: u32,
    tick: u32,
) -> usize {
    let stale: Vec<PlanKey> = plan
        .entries()
        .filter(|(key, positions)| {
            key.is_road()
                && !positions.is_empty()
                && plan.age(key, tick) > max_age
                && positions.iter().all(|loc| {
                    !snapshot.has_structure(loc, StructureType::Road)
                        && !snapshot.has_site(loc, StructureType::Road)
                })
        })
        .map(|(key, _)| key.clone())
        .collect();

    for key in &stale {
        debug!("Dropping stale road plan {}", key);
        plan.remove(key);
    }

    stale.len()
}

/// True if a halo road may be planned on `loc`.
fn halo_tile_available(
    loc: Location,
    snapshot: &TerritorySnapshot,
    exclusive: &FnvHashSet<Location>,
    covered: &FnvHashSet<Location>,
    anchors: &FnvHashSet<Location>,
) -> bool {
    loc.in_build_bounds()
        && !snapshot.terrain().is_wall_at(loc)
        && !snapshot.has_blocking_structure(loc)
        && !snapshot.has_blocking_site(loc)
        && !snapshot.has_structure(loc, StructureType::Road)
        && !snapshot.has_site(loc, StructureType::Road)
        && !exclusive.contains(&loc)
        && !covered.contains(&loc)
        && !anchors.contains(&loc)
}

/// Surround every planned structure block that has no halo yet with a 1-tile
/// road ring, skipping tiles already covered by a road or claimed by another
/// structure. Returns the number of halo keys created.
pub fn pad_halos(plan: &mut TerritoryPlan, snapshot: &TerritorySnapshot, tick: u32) -> usize {
    let exclusive = plan.planned_exclusive_tiles();
    let mut covered = plan.planned_road_tiles();
    let anchors: FnvHashSet<Location> = snapshot
        .anchor_locations()
        .chain(snapshot.hubs().iter().map(|hub| hub.location))
        .collect();

    let owners: Vec<(PlanKey, Vec<Location>)> = plan
        .entries()
        .filter(|(key, positions)| {
            key.category().is_exclusive() && !positions.is_empty() && !plan.contains_key(&key.halo())
        })
        .map(|(key, positions)| (key.clone(), positions.iter().collect()))
        .collect();

    let mut created = 0;

    for (owner, tiles) in owners {
        let mut halo = PositionSet::new();
        for tile in tiles {
            for &(dx, dy) in &NEIGHBORS_8 {
                if let Some(next) = tile.checked_add(dx, dy) {
                    if halo_tile_available(next, snapshot, &exclusive, &covered, &anchors) {
                        halo.insert(next);
                    }
                }
            }
        }

        if halo.is_empty() {
            continue;
        }

        trace!("Padding {} with {} halo tiles", owner, halo.len());
        covered.extend(halo.iter());
        plan.set(owner.halo(), halo, tick);
        created += 1;
    }

    created
}

/// Remove planned road tiles that sit under a finished structure or under a
/// tile claimed by a structure key.
///
/// A road actually built under a finished structure is ordered destroyed.
pub fn prune_roads_under_structures(
    plan: &mut TerritoryPlan,
    snapshot: &TerritorySnapshot,
) -> Vec<PlanOperation> {
    let exclusive = plan.planned_exclusive_tiles();
    let mut operations = Vec::new();
    let mut destroyed: FnvHashSet<Location> = FnvHashSet::default();
    let mut pruned = 0;

    for (key, positions) in plan.entries_mut() {
        if !key.is_road() {
            continue;
        }

        pruned += positions.retain(|loc| {
            let under_structure = snapshot.has_blocking_structure(loc);
            if under_structure
                && snapshot.has_structure(loc, StructureType::Road)
                && destroyed.insert(loc)
            {
                operations.push(PlanOperation::DestroyStructure {
                    location: loc,
                    structure_type: StructureType::Road,
                });
            }
            !under_structure && !exclusive.contains(&loc)
        });
    }

    if pruned > 0 {
        debug!("Pruned {} planned road tiles under structures", pruned);
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn stale_roads_without_progress_are_dropped() {
        let mut snapshot = plain_snapshot(3);
        let mut plan = TerritoryPlan::new(0);

        let untouched = PlanKey::road("spawn1", "src_a");
        let started = PlanKey::road("spawn1", "src_b");
        let fresh = PlanKey::road("spawn1", CONTROLLER_ANCHOR);
        plan.set(
            untouched.clone(),
            PositionSet::from_locations(vec![loc(5, 5), loc(6, 5)]),
            0,
        );
        plan.set(
            started.clone(),
            PositionSet::from_locations(vec![loc(5, 7), loc(6, 7)]),
            0,
        );
        plan.set(
            fresh.clone(),
            PositionSet::from_locations(vec![loc(5, 9)]),
            5_500,
        );
        snapshot.add_site(loc(6, 7), StructureType::Road);

        let removed = prune_stale_roads(&mut plan, &snapshot, 5_000, 6_000);

        assert_eq!(removed, 1);
        assert!(!plan.contains_key(&untouched));
        assert!(plan.contains_key(&started));
        assert!(plan.contains_key(&fresh));
    }

    #[test]
    fn finished_roads_are_never_stale() {
        let snapshot = plain_snapshot(3);
        let mut plan = TerritoryPlan::new(0);
        let key = PlanKey::road("spawn1", "src_a");
        plan.set(key.clone(), PositionSet::new(), 0);

        assert_eq!(prune_stale_roads(&mut plan, &snapshot, 10, 50_000), 0);
        assert!(plan.contains_key(&key));
    }

    #[test]
    fn halo_surrounds_block_once() {
        let snapshot = plain_snapshot(3);
        let mut plan = TerritoryPlan::new(0);
        let key = PlanKey::Extensions("spawn1".into());
        plan.set(
            key.clone(),
            PositionSet::from_locations(vec![loc(20, 20), loc(21, 20)]),
            0,
        );

        assert_eq!(pad_halos(&mut plan, &snapshot, 1), 1);
        let halo = plan.get(&key.halo()).unwrap();
        assert_eq!(halo.len(), 10);
        assert!(!halo.contains(loc(20, 20)));
        assert!(halo.contains(loc(19, 19)));
        assert!(halo.contains(loc(22, 21)));

        assert_eq!(pad_halos(&mut plan, &snapshot, 2), 0);
    }

    #[test]
    fn halo_skips_roads_and_walls() {
        let mut snapshot = plain_snapshot(3);
        wall(&mut snapshot, 19, 19);
        road(&mut snapshot, 20, 19);
        let mut plan = TerritoryPlan::new(0);
        plan.set(
            PlanKey::road("a", "b"),
            PositionSet::from_locations(vec![loc(21, 19)]),
            0,
        );
        let key = PlanKey::Towers("spawn1".into());
        plan.set(key.clone(), PositionSet::from_locations(vec![loc(20, 20)]), 0);

        pad_halos(&mut plan, &snapshot, 1);
        let halo = plan.get(&key.halo()).unwrap();
        assert_eq!(halo.len(), 5);
        assert!(!halo.contains(loc(19, 19)));
        assert!(!halo.contains(loc(20, 19)));
        assert!(!halo.contains(loc(21, 19)));
    }

    #[test]
    fn roads_under_structures_are_pruned() {
        let mut snapshot = plain_snapshot(3);
        snapshot.add_structure(loc(10, 10), StructureType::Extension);
        snapshot.add_structure(loc(10, 10), StructureType::Road);
        let mut plan = TerritoryPlan::new(0);
        let road_key = PlanKey::road("spawn1", "src_a");
        plan.set(
            road_key.clone(),
            PositionSet::from_locations(vec![loc(9, 10), loc(10, 10), loc(11, 10)]),
            0,
        );
        plan.set(
            PlanKey::Towers("spawn1".into()),
            PositionSet::from_locations(vec![loc(11, 10)]),
            0,
        );

        let operations = prune_roads_under_structures(&mut plan, &snapshot);

        assert_eq!(
            plan.get(&road_key).unwrap().iter().collect::<Vec<_>>(),
            vec![loc(9, 10)]
        );
        assert_eq!(
            operations,
            vec![PlanOperation::DestroyStructure {
                location: loc(10, 10),
                structure_type: StructureType::Road,
            }]
        );
    }
}
