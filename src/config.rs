//! Tunables for the incremental planner.
//!
//! Every field has a default, and the struct deserializes with
//! `#[serde(default)]`, so a partial document (for example a handful of keys
//! stored in game memory) overrides only what it names.

use serde::{Deserialize, Serialize};

/// How the tower quota is spread when a territory has several hubs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubDistribution {
    /// Round-robin over hubs ordered by id.
    Even,
    /// Everything goes to the primary hub.
    PrimaryOnly,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Minimum ticks between two planning cycles of the same territory.
    pub plan_interval: u32,
    /// Ticks between global memory hygiene sweeps.
    pub cleanup_interval: u32,
    /// Territories not observed for this many ticks are forgotten.
    pub forget_after: u32,
    /// Road keys older than this with no progress on the ground are dropped.
    pub stale_road_age: u32,

    /// Maximum range between a source/mineral and its container.
    pub container_offset: u8,
    /// Preferred range between the controller and its container.
    pub controller_container_offset: u8,
    /// RCL from which mineral containers are planned (extractor unlock).
    pub mineral_min_rcl: u8,

    /// Preferred extension offsets relative to the hub, in priority order.
    pub extension_template: Vec<(i8, i8)>,
    pub extension_ring_min: u8,
    pub extension_ring_max: u8,
    /// Only every other tile (by parity) is used during the ring search.
    pub extension_checkerboard: bool,
    pub extension_scan_radius: u8,
    /// Boundary tiles removed from a road-enclosed extension block.
    pub extension_entrances: usize,

    /// Tower offsets relative to the hub, in priority order.
    pub tower_template: Vec<(i8, i8)>,
    pub hub_distribution: HubDistribution,

    pub plain_cost: u8,
    pub swamp_cost: u8,
    /// Node expansions allowed for a single road search.
    pub max_path_ops: u32,

    /// Largest Manhattan gap the cluster connector will bridge.
    pub max_connector_length: u32,
    pub max_connectors_per_run: usize,
    pub max_cluster_passes: usize,

    /// Optional cap on construction orders issued per territory per cycle.
    /// Unset means every missing tile is ordered.
    pub max_site_orders: Option<usize>,
    /// RCL from which rampart overlays are planned.
    pub rampart_min_rcl: u8,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            plan_interval: 100,
            cleanup_interval: 1000,
            forget_after: 10_000,
            stale_road_age: 5_000,

            container_offset: 1,
            controller_container_offset: 2,
            mineral_min_rcl: 6,

            extension_template: diamond_template(2, 4),
            extension_ring_min: 2,
            extension_ring_max: 6,
            extension_checkerboard: true,
            extension_scan_radius: 10,
            extension_entrances: 2,

            tower_template: vec![(-2, -1), (-1, -2), (2, -1), (-1, 2), (2, 1), (1, 2)],
            hub_distribution: HubDistribution::Even,

            plain_cost: 2,
            swamp_cost: 10,
            max_path_ops: 4000,

            max_connector_length: 10,
            max_connectors_per_run: 3,
            max_cluster_passes: 2,

            max_site_orders: None,
            rampart_min_rcl: 2,
        }
    }
}

/// Offsets at Manhattan distance `min..=max` from the origin, innermost first.
///
/// Tiles within Chebyshev 1 of the origin are left out so the hub keeps its
/// access ring. Within one distance band the order is row-major.
pub fn diamond_template(min: i8, max: i8) -> Vec<(i8, i8)> {
    let mut offsets = Vec::new();
    for distance in min..=max {
        for dy in -distance..=distance {
            for dx in -distance..=distance {
                if dx.abs() + dy.abs() != distance || dx.abs().max(dy.abs()) <= 1 {
                    continue;
                }
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}
