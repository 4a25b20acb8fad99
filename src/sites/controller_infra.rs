//! ControllerInfraLayer: a single container inside upgrade range of the
//! controller, as close to the hub as the rings allow.

use super::*;
use log::*;

pub struct ControllerInfraLayer;

impl SiteLayer for ControllerInfraLayer {
    fn name(&self) -> &str {
        "controller_infra"
    }

    fn is_applicable(&self, ctx: &SiteContext) -> bool {
        ctx.snapshot().controller().is_some()
    }

    fn propose(&self, ctx: &mut SiteContext, plan: &TerritoryPlan) -> Vec<Proposal> {
        let controller = match ctx.snapshot().controller() {
            Some(controller) => controller.location,
            None => return Vec::new(),
        };

        if plan.has_pending(&PlanKey::ControllerContainer) {
            return Vec::new();
        }

        match controller_container(ctx, controller) {
            Some(loc) => {
                ctx.claim(loc, StructureType::Container);
                vec![Proposal {
                    key: PlanKey::ControllerContainer,
                    positions: PositionSet::from_locations(vec![loc]),
                }]
            }
            None => {
                trace!("No controller container tile");
                Vec::new()
            }
        }
    }
}

/// First buildable tile on the rings around the controller, nearest ring
/// first. Within a ring the tile closest to the hub wins, ties row-major.
fn controller_container(ctx: &SiteContext, controller: Location) -> Option<Location> {
    let outer = ctx.config().controller_container_offset.saturating_add(1);
    if ctx.container_within(controller, outer) {
        return None;
    }

    let hub = ctx.snapshot().primary_hub().map(|hub| hub.location);

    for radius in 1..=outer {
        let mut ring = controller.ring(radius);
        ring.sort_by_key(|loc| (hub.map(|h| h.manhattan_to(*loc)).unwrap_or(0), loc.y(), loc.x()));
        if let Some(loc) = ring.into_iter().find(|loc| ctx.is_buildable(*loc)) {
            return Some(loc);
        }
    }

    None
}
