//! SourceInfraLayer: one container beside each energy source, on the side the
//! haul route from the hub arrives from.

use super::*;
use log::*;

pub struct SourceInfraLayer;

impl SiteLayer for SourceInfraLayer {
    fn name(&self) -> &str {
        "source_infra"
    }

    fn is_applicable(&self, ctx: &SiteContext) -> bool {
        !ctx.snapshot().sources().is_empty()
    }

    fn propose(&self, ctx: &mut SiteContext, plan: &TerritoryPlan) -> Vec<Proposal> {
        let sources: Vec<Anchor> = ctx.snapshot().sources().into_iter().cloned().collect();
        let mut proposals = Vec::new();

        for source in sources {
            let key = PlanKey::SourceContainer(source.id.clone());
            if plan.has_pending(&key) {
                continue;
            }

            match resource_container(ctx, source.location) {
                Some(loc) => {
                    ctx.claim(loc, StructureType::Container);
                    proposals.push(Proposal {
                        key,
                        positions: PositionSet::from_locations(vec![loc]),
                    });
                }
                None => trace!("No container tile for source {}", source.id),
            }
        }

        proposals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn container_sits_next_to_each_source() {
        let snapshot = basic_snapshot(1);
        let plan = TerritoryPlan::new(0);
        let config = PlannerConfig::default();
        let mut ctx = SiteContext::new(&snapshot, &plan, &config);

        let proposals = SourceInfraLayer.propose(&mut ctx, &plan);

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].key, PlanKey::SourceContainer("src_a".into()));
        for (proposal, source) in proposals.iter().zip([SOURCE_A, SOURCE_B].iter()) {
            let tile = proposal.positions.first().unwrap();
            assert_eq!(proposal.positions.len(), 1);
            assert_eq!(tile.distance_to(loc(source.0, source.1)), 1);
        }

        // The container faces the hub.
        let hub = loc(HUB.0, HUB.1);
        let first = proposals[0].positions.first().unwrap();
        assert_eq!(first, loc(11, 11));
        assert!(first.manhattan_to(hub) < loc(SOURCE_A.0, SOURCE_A.1).manhattan_to(hub));
    }

    #[test]
    fn existing_container_suppresses_proposal() {
        let mut snapshot = basic_snapshot(1);
        snapshot.add_structure(loc(11, 11), StructureType::Container);
        let plan = TerritoryPlan::new(0);
        let config = PlannerConfig::default();
        let mut ctx = SiteContext::new(&snapshot, &plan, &config);

        let proposals = SourceInfraLayer.propose(&mut ctx, &plan);

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].key, PlanKey::SourceContainer("src_b".into()));
    }

    #[test]
    fn walled_in_source_uses_scan_fallback() {
        let mut snapshot = basic_snapshot(1);
        for x in 0..=15 {
            wall(&mut snapshot, x, 14);
        }
        for y in 0..=14 {
            wall(&mut snapshot, 15, y);
        }
        let plan = TerritoryPlan::new(0);
        let config = PlannerConfig::default();
        let mut ctx = SiteContext::new(&snapshot, &plan, &config);

        let proposals = SourceInfraLayer.propose(&mut ctx, &plan);
        let tile = proposals[0].positions.first().unwrap();

        // Unreachable from the hub: nearest free tile to the hub wins the scan.
        assert_eq!(tile, loc(11, 11));
    }

    #[test]
    fn pending_key_is_not_replanned() {
        let snapshot = basic_snapshot(1);
        let mut plan = TerritoryPlan::new(0);
        plan.set(
            PlanKey::SourceContainer("src_a".into()),
            PositionSet::from_locations(vec![loc(11, 11)]),
            0,
        );
        plan.set(
            PlanKey::SourceContainer("src_b".into()),
            PositionSet::from_locations(vec![loc(39, 13)]),
            0,
        );
        let config = PlannerConfig::default();
        let mut ctx = SiteContext::new(&snapshot, &plan, &config);

        assert!(SourceInfraLayer.propose(&mut ctx, &plan).is_empty());
    }

    #[test]
    fn finished_key_without_container_is_replanned() {
        let mut snapshot = basic_snapshot(1);
        snapshot.add_structure(loc(39, 13), StructureType::Container);
        let mut plan = TerritoryPlan::new(0);
        plan.set(PlanKey::SourceContainer("src_a".into()), PositionSet::new(), 0);
        plan.set(PlanKey::SourceContainer("src_b".into()), PositionSet::new(), 0);
        let config = PlannerConfig::default();
        let mut ctx = SiteContext::new(&snapshot, &plan, &config);

        let proposals = SourceInfraLayer.propose(&mut ctx, &plan);

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].key, PlanKey::SourceContainer("src_a".into()));
        assert_eq!(proposals[0].positions.first(), Some(loc(11, 11)));
    }
}
