//! TowerLayer: towers on fixed offsets around the hubs, capped by the tier
//! quota.

use super::*;
use crate::config::HubDistribution;
use log::*;

pub struct TowerLayer;

impl SiteLayer for TowerLayer {
    fn name(&self) -> &str {
        "tower"
    }

    fn is_applicable(&self, ctx: &SiteContext) -> bool {
        ctx.snapshot().primary_hub().is_some() && ctx.remaining_quota(StructureType::Tower) > 0
    }

    fn propose(&self, ctx: &mut SiteContext, plan: &TerritoryPlan) -> Vec<Proposal> {
        let hubs: Vec<Anchor> = match ctx.config().hub_distribution {
            HubDistribution::Even => ctx.snapshot().hubs().into_iter().cloned().collect(),
            HubDistribution::PrimaryOnly => ctx.snapshot().primary_hub().cloned().into_iter().collect(),
        };

        let hubs: Vec<Anchor> = hubs
            .into_iter()
            .filter(|hub| !plan.contains_key(&PlanKey::Towers(hub.id.clone())))
            .collect();

        let mut quota = ctx.remaining_quota(StructureType::Tower);
        if hubs.is_empty() || quota == 0 {
            return Vec::new();
        }

        // Round-robin: each pass gives every hub its next free template tile.
        let template = ctx.config().tower_template.clone();
        let mut cursors = vec![0usize; hubs.len()];
        let mut picked: Vec<Vec<Location>> = vec![Vec::new(); hubs.len()];

        while quota > 0 {
            let mut progressed = false;

            for (index, hub) in hubs.iter().enumerate() {
                if quota == 0 {
                    break;
                }

                while cursors[index] < template.len() {
                    let (dx, dy) = template[cursors[index]];
                    cursors[index] += 1;

                    if let Some(loc) = hub.location.checked_add(dx, dy) {
                        if ctx.is_buildable(loc) {
                            ctx.claim(loc, StructureType::Tower);
                            picked[index].push(loc);
                            quota -= 1;
                            progressed = true;
                            break;
                        }
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        hubs.into_iter()
            .zip(picked)
            .filter(|(_, tiles)| !tiles.is_empty())
            .map(|(hub, tiles)| {
                debug!("Planning {} towers around {}", tiles.len(), hub.id);
                Proposal {
                    key: PlanKey::Towers(hub.id),
                    positions: PositionSet::from_locations(tiles),
                }
            })
            .collect()
    }
}
