//! MineralInfraLayer: a container beside each mineral once the extractor is
//! unlocked.

use super::*;
use log::*;

pub struct MineralInfraLayer;

impl SiteLayer for MineralInfraLayer {
    fn name(&self) -> &str {
        "mineral_infra"
    }

    fn is_applicable(&self, ctx: &SiteContext) -> bool {
        !ctx.snapshot().minerals().is_empty()
            && ctx.snapshot().controller_level() >= ctx.config().mineral_min_rcl
    }

    fn propose(&self, ctx: &mut SiteContext, plan: &TerritoryPlan) -> Vec<Proposal> {
        let minerals: Vec<Anchor> = ctx.snapshot().minerals().into_iter().cloned().collect();
        let mut proposals = Vec::new();

        for mineral in minerals {
            let key = PlanKey::MineralContainer(mineral.id.clone());
            if plan.has_pending(&key) {
                continue;
            }

            if let Some(loc) = resource_container(ctx, mineral.location) {
                debug!("Planning mineral container for {} at {}", mineral.id, loc);
                ctx.claim(loc, StructureType::Container);
                proposals.push(Proposal {
                    key,
                    positions: PositionSet::from_locations(vec![loc]),
                });
            }
        }

        proposals
    }
}
