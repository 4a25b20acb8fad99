//! ExtensionLayer: fills the extension quota around each hub.
//!
//! Candidates come from three sources in order: the configured offset
//! template, Chebyshev rings (optionally checkerboarded so every extension
//! keeps a walkable neighbour), and finally a square scan sorted by Manhattan
//! distance. Tiles hugging a hub or a harvest/upgrade target are skipped so
//! those stay reachable.

use super::*;
use crate::terrain::*;
use log::*;

pub struct ExtensionLayer;

impl SiteLayer for ExtensionLayer {
    fn name(&self) -> &str {
        "extension"
    }

    fn is_applicable(&self, ctx: &SiteContext) -> bool {
        ctx.snapshot().primary_hub().is_some()
            && ctx.remaining_quota(StructureType::Extension) > 0
    }

    fn propose(&self, ctx: &mut SiteContext, plan: &TerritoryPlan) -> Vec<Proposal> {
        let hubs: Vec<Anchor> = ctx.snapshot().hubs().into_iter().cloned().collect();
        let mut proposals = Vec::new();

        for hub in hubs {
            let key = PlanKey::Extensions(hub.id.clone());
            if plan.contains_key(&key) {
                continue;
            }

            let quota = ctx.remaining_quota(StructureType::Extension);
            if quota == 0 {
                break;
            }

            let tiles = extension_block(ctx, hub.location, quota);
            if tiles.is_empty() {
                trace!("No extension tiles around {}", hub.id);
                continue;
            }

            debug!(
                "Planning {} extensions around {} (quota {})",
                tiles.len(),
                hub.id,
                quota
            );
            for &tile in &tiles {
                ctx.claim(tile, StructureType::Extension);
            }
            proposals.push(Proposal {
                key,
                positions: PositionSet::from_locations(tiles),
            });
        }

        proposals
    }
}

fn extension_block(ctx: &SiteContext, hub: Location, quota: usize) -> Vec<Location> {
    let config = ctx.config();
    let snapshot = ctx.snapshot();

    let clearance: Vec<Location> = snapshot
        .hubs()
        .iter()
        .map(|h| h.location)
        .chain(snapshot.anchor_locations())
        .collect();

    let mut chosen: Vec<Location> = Vec::with_capacity(quota);
    let consider = |loc: Location, chosen: &mut Vec<Location>| {
        if chosen.len() < quota
            && ctx.is_buildable(loc)
            && !clearance.iter().any(|c| c.distance_to(loc) <= 1)
            && !chosen.contains(&loc)
        {
            chosen.push(loc);
        }
    };

    for &(dx, dy) in &config.extension_template {
        if let Some(loc) = hub.checked_add(dx, dy) {
            consider(loc, &mut chosen);
        }
    }

    let parity = (hub.x() as u16 + hub.y() as u16) % 2;
    for radius in config.extension_ring_min..=config.extension_ring_max {
        if chosen.len() >= quota {
            break;
        }
        for loc in hub.ring(radius) {
            if config.extension_checkerboard && (loc.x() as u16 + loc.y() as u16) % 2 != parity {
                continue;
            }
            consider(loc, &mut chosen);
        }
    }

    if chosen.len() < quota {
        let radius = config.extension_scan_radius as i8;
        let mut scan: Vec<Location> = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if let Some(loc) = hub.checked_add(dx, dy) {
                    scan.push(loc);
                }
            }
        }
        scan.sort_by_key(|loc| loc.manhattan_to(hub));
        for loc in scan {
            consider(loc, &mut chosen);
        }
    }

    carve_entrances(ctx, &mut chosen);

    chosen
}

/// Open walk-in gaps in a block that is ringed by road and has extensions no
/// creep on the ring could reach.
fn carve_entrances(ctx: &SiteContext, chosen: &mut Vec<Location>) {
    let entrances = ctx.config().extension_entrances;
    if entrances == 0 || chosen.len() <= entrances {
        return;
    }

    let block: FnvHashSet<Location> = chosen.iter().copied().collect();
    let mut perimeter: FnvHashSet<Location> = FnvHashSet::default();
    let mut boundary: Vec<Location> = Vec::new();

    for &tile in chosen.iter() {
        let mut on_edge = false;
        for &(dx, dy) in &NEIGHBORS_8 {
            match tile.checked_add(dx, dy) {
                Some(next) if block.contains(&next) => {}
                Some(next) => {
                    on_edge = true;
                    perimeter.insert(next);
                }
                None => on_edge = true,
            }
        }
        if on_edge {
            boundary.push(tile);
        }
    }

    if boundary.len() == chosen.len() {
        return;
    }

    let terrain = ctx.snapshot().terrain();
    let enclosed = perimeter
        .iter()
        .filter(|loc| !terrain.is_wall_at(**loc))
        .all(|loc| ctx.is_road(*loc) || ctx.is_buildable(*loc));
    if !enclosed {
        return;
    }

    let count = entrances.min(boundary.len());
    let gaps: Vec<Location> = (0..count)
        .map(|i| boundary[i * boundary.len() / count])
        .collect();

    trace!("Opening {} entrances in extension block", gaps.len());
    chosen.retain(|loc| !gaps.contains(loc));
}
