//! Periodic plan-store hygiene.
//!
//! The sweep repairs what the planning cycle itself never produces but a
//! persisted store can accumulate: unreadable coordinates, over-full
//! single-target keys, tiles claimed twice, finished transient keys, metadata
//! without a key, and territories nobody has seen in a long time.

use crate::config::PlannerConfig;
use crate::location::*;
use crate::store::*;
use fnv::FnvHashSet;
use log::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub corrupt_purged: usize,
    pub positions_truncated: usize,
    pub duplicates_removed: usize,
    pub keys_removed: usize,
    pub meta_removed: usize,
    pub territories_forgotten: Vec<String>,
}

/// Sweep a single territory. Returns counts merged into `report`.
fn sweep_territory(plan: &mut TerritoryPlan, report: &mut CleanupReport) {
    let mut claimed: FnvHashSet<Location> = FnvHashSet::default();

    for (key, positions) in plan.entries_mut() {
        report.corrupt_purged += positions.purge_corrupt();

        if let Some(limit) = key.category().max_positions() {
            report.positions_truncated += positions.truncate(limit);
        }

        if key.category().is_exclusive() {
            report.duplicates_removed += positions.retain(|loc| claimed.insert(loc));
        }
    }

    for key in plan.keys() {
        if key.is_transient() && !plan.has_pending(&key) {
            plan.remove(&key);
            report.keys_removed += 1;
        }
    }

    for key in plan.meta_keys() {
        if !plan.contains_key(&key) {
            plan.drop_meta(&key);
            report.meta_removed += 1;
        }
    }
}

/// Run the hygiene sweep over every territory and record the sweep tick.
pub fn sweep(store: &mut PlanStore, config: &PlannerConfig, tick: u32) -> CleanupReport {
    let mut report = CleanupReport::default();

    for room in store.rooms() {
        let forget = store
            .territory(&room)
            .map(|t| tick.saturating_sub(t.last_seen_tick) > config.forget_after)
            .unwrap_or(false);

        if forget {
            info!("Forgetting plan for unseen territory {}", room);
            store.forget(&room);
            report.territories_forgotten.push(room);
        }
    }

    for (_, plan) in store.territories_mut() {
        sweep_territory(plan, &mut report);
    }

    store.set_last_cleanup_tick(tick);

    debug!(
        "Plan sweep: {} corrupt, {} truncated, {} duplicates, {} keys, {} meta, {} territories forgotten",
        report.corrupt_purged,
        report.positions_truncated,
        report.duplicates_removed,
        report.keys_removed,
        report.meta_removed,
        report.territories_forgotten.len()
    );

    report
}
