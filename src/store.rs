//! The persisted plan: the planner's system of record.
//!
//! `PlanStore` owns one `TerritoryPlan` per room. Each territory maps typed
//! `PlanKey`s to ordered, duplicate-free tile sets plus creation metadata.
//! The serialized form mirrors the game-memory layout
//! (`plannedStructures`, `plannedStructuresMeta`, `lastStructurePlanTick`),
//! with tiles written as `"x,y"` strings.

use crate::error::PlanError;
use crate::location::*;
use crate::plan_key::*;
use fnv::FnvHashSet;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered, duplicate-free set of planned tiles for one key.
///
/// Persisted entries that fail to parse (or lie outside the room) are kept
/// aside as `corrupt` so loading never fails; they are never acted on and are
/// dropped by the cleanup sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionSet {
    tiles: Vec<Location>,
    corrupt: Vec<String>,
}

impl PositionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a path or candidate list, dropping repeats.
    pub fn from_locations<I: IntoIterator<Item = Location>>(locations: I) -> Self {
        let mut set = PositionSet::new();
        for loc in locations {
            set.insert(loc);
        }
        set
    }

    /// Append a tile. Returns false for duplicates and out-of-room tiles.
    pub fn insert(&mut self, loc: Location) -> bool {
        if !loc.in_room_bounds() || self.tiles.contains(&loc) {
            return false;
        }
        self.tiles.push(loc);
        true
    }

    pub fn remove(&mut self, loc: Location) -> bool {
        let before = self.tiles.len();
        self.tiles.retain(|l| *l != loc);
        before != self.tiles.len()
    }

    pub fn contains(&self, loc: Location) -> bool {
        self.tiles.contains(&loc)
    }

    pub fn iter(&self) -> impl Iterator<Item = Location> + '_ {
        self.tiles.iter().copied()
    }

    pub fn first(&self) -> Option<Location> {
        self.tiles.first().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn truncate(&mut self, len: usize) -> usize {
        let dropped = self.tiles.len().saturating_sub(len);
        self.tiles.truncate(len);
        dropped
    }

    pub fn retain<F: FnMut(Location) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|l| keep(*l));
        before - self.tiles.len()
    }

    pub fn corrupt(&self) -> &[String] {
        &self.corrupt
    }

    /// Forget unusable persisted entries, returning how many were dropped.
    pub fn purge_corrupt(&mut self) -> usize {
        let dropped = self.corrupt.len();
        self.corrupt.clear();
        dropped
    }

    fn from_persisted(raw: Vec<String>) -> Self {
        let mut set = PositionSet::new();
        for entry in raw {
            match entry.parse::<Location>() {
                Ok(loc) if set.insert(loc) => {}
                Ok(_) => {}
                Err(_) => set.corrupt.push(entry),
            }
        }
        set
    }

    fn to_persisted(&self) -> Vec<String> {
        self.tiles
            .iter()
            .map(|l| l.to_string())
            .chain(self.corrupt.iter().cloned())
            .collect()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
    pub created_at: u32,
}

/// Plan state for a single territory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PersistedTerritory", into = "PersistedTerritory")]
pub struct TerritoryPlan {
    pub last_plan_tick: Option<u32>,
    pub last_seen_tick: u32,
    planned: BTreeMap<PlanKey, PositionSet>,
    meta: BTreeMap<PlanKey, PlanMeta>,
}

impl TerritoryPlan {
    pub fn new(tick: u32) -> Self {
        TerritoryPlan {
            last_plan_tick: None,
            last_seen_tick: tick,
            planned: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &PlanKey) -> Option<&PositionSet> {
        self.planned.get(key)
    }

    pub fn get_mut(&mut self, key: &PlanKey) -> Option<&mut PositionSet> {
        self.planned.get_mut(key)
    }

    pub fn contains_key(&self, key: &PlanKey) -> bool {
        self.planned.contains_key(key)
    }

    /// True when the key exists and still has tiles waiting to be built.
    pub fn has_pending(&self, key: &PlanKey) -> bool {
        self.planned.get(key).map(|p| !p.is_empty()).unwrap_or(false)
    }

    /// Store positions under a key, stamping creation metadata the first time
    /// the key is seen.
    pub fn set(&mut self, key: PlanKey, positions: PositionSet, tick: u32) {
        self.meta
            .entry(key.clone())
            .or_insert(PlanMeta { created_at: tick });
        self.planned.insert(key, positions);
    }

    /// Add one tile to a key, creating the key if needed.
    pub fn insert_position(&mut self, key: &PlanKey, loc: Location, tick: u32) -> bool {
        if !self.planned.contains_key(key) {
            self.set(key.clone(), PositionSet::new(), tick);
        }
        self.planned
            .get_mut(key)
            .map(|positions| positions.insert(loc))
            .unwrap_or(false)
    }

    pub fn remove_position(&mut self, key: &PlanKey, loc: Location) -> bool {
        self.planned
            .get_mut(key)
            .map(|positions| positions.remove(loc))
            .unwrap_or(false)
    }

    pub fn remove(&mut self, key: &PlanKey) -> Option<PositionSet> {
        self.meta.remove(key);
        self.planned.remove(key)
    }

    pub fn meta(&self, key: &PlanKey) -> Option<&PlanMeta> {
        self.meta.get(key)
    }

    /// Age of a key in ticks. Keys without metadata count as created at 0.
    pub fn age(&self, key: &PlanKey, tick: u32) -> u32 {
        let created = self.meta.get(key).map(|m| m.created_at).unwrap_or(0);
        tick.saturating_sub(created)
    }

    pub fn keys(&self) -> Vec<PlanKey> {
        self.planned.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&PlanKey, &PositionSet)> {
        self.planned.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&PlanKey, &mut PositionSet)> {
        self.planned.iter_mut()
    }

    pub fn keys_of(&self, category: PlanCategory) -> Vec<PlanKey> {
        self.planned
            .keys()
            .filter(|k| k.category() == category)
            .cloned()
            .collect()
    }

    /// All tiles currently planned for road or connector keys.
    pub fn planned_road_tiles(&self) -> FnvHashSet<Location> {
        self.planned
            .iter()
            .filter(|(k, _)| k.is_road())
            .flat_map(|(_, p)| p.iter())
            .collect()
    }

    /// All tiles claimed by exclusive (non-road, non-rampart) keys.
    pub fn planned_exclusive_tiles(&self) -> FnvHashSet<Location> {
        self.planned
            .iter()
            .filter(|(k, _)| k.category().is_exclusive())
            .flat_map(|(_, p)| p.iter())
            .collect()
    }

    /// Every planned tile under any key.
    pub fn planned_tiles(&self) -> FnvHashSet<Location> {
        self.planned.values().flat_map(|p| p.iter()).collect()
    }

    pub fn planned_count(&self, category: PlanCategory) -> usize {
        self.planned
            .iter()
            .filter(|(k, _)| k.category() == category)
            .map(|(_, p)| p.len())
            .sum()
    }

    pub(crate) fn meta_keys(&self) -> Vec<PlanKey> {
        self.meta.keys().cloned().collect()
    }

    pub(crate) fn drop_meta(&mut self, key: &PlanKey) {
        self.meta.remove(key);
    }
}

/// Serialized layout of a territory, matching the game-memory document.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PersistedTerritory {
    #[serde(default)]
    planned_structures: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    planned_structures_meta: BTreeMap<String, PlanMeta>,
    #[serde(default)]
    last_structure_plan_tick: Option<u32>,
    #[serde(default)]
    last_seen_tick: u32,
}

impl From<PersistedTerritory> for TerritoryPlan {
    fn from(persisted: PersistedTerritory) -> Self {
        let mut planned = BTreeMap::new();
        for (raw_key, raw_positions) in persisted.planned_structures {
            match raw_key.parse::<PlanKey>() {
                Ok(key) => {
                    planned.insert(key, PositionSet::from_persisted(raw_positions));
                }
                Err(err) => warn!("Dropping persisted plan entry: {}", err),
            }
        }

        let meta = persisted
            .planned_structures_meta
            .into_iter()
            .filter_map(|(raw_key, meta)| raw_key.parse::<PlanKey>().ok().map(|k| (k, meta)))
            .collect();

        TerritoryPlan {
            last_plan_tick: persisted.last_structure_plan_tick,
            last_seen_tick: persisted.last_seen_tick,
            planned,
            meta,
        }
    }
}

impl From<TerritoryPlan> for PersistedTerritory {
    fn from(plan: TerritoryPlan) -> Self {
        PersistedTerritory {
            planned_structures: plan
                .planned
                .iter()
                .map(|(k, p)| (k.to_string(), p.to_persisted()))
                .collect(),
            planned_structures_meta: plan
                .meta
                .iter()
                .map(|(k, m)| (k.to_string(), *m))
                .collect(),
            last_structure_plan_tick: plan.last_plan_tick,
            last_seen_tick: plan.last_seen_tick,
        }
    }
}

/// Per-territory plan state for every room the planner tracks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStore {
    #[serde(default)]
    territories: BTreeMap<String, TerritoryPlan>,
    #[serde(default)]
    last_cleanup_tick: u32,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn territory(&self, room: &str) -> Option<&TerritoryPlan> {
        self.territories.get(room)
    }

    pub fn territory_mut(&mut self, room: &str) -> Option<&mut TerritoryPlan> {
        self.territories.get_mut(room)
    }

    /// Get the territory's plan, creating empty state on first contact.
    pub fn ensure_territory(&mut self, room: &str, tick: u32) -> &mut TerritoryPlan {
        self.territories
            .entry(room.to_string())
            .or_insert_with(|| TerritoryPlan::new(tick))
    }

    pub fn forget(&mut self, room: &str) -> Option<TerritoryPlan> {
        self.territories.remove(room)
    }

    pub fn rooms(&self) -> Vec<String> {
        self.territories.keys().cloned().collect()
    }

    pub fn territories_mut(&mut self) -> impl Iterator<Item = (&String, &mut TerritoryPlan)> {
        self.territories.iter_mut()
    }

    pub fn last_cleanup_tick(&self) -> u32 {
        self.last_cleanup_tick
    }

    pub(crate) fn set_last_cleanup_tick(&mut self, tick: u32) {
        self.last_cleanup_tick = tick;
    }

    /// Typed read of a single key in a territory.
    pub fn get(&self, room: &str, key: &PlanKey) -> Option<&PositionSet> {
        self.territory(room).and_then(|t| t.get(key))
    }

    pub fn set(&mut self, room: &str, key: PlanKey, positions: PositionSet, tick: u32) {
        self.ensure_territory(room, tick).set(key, positions, tick);
    }

    pub fn delete(&mut self, room: &str, key: &PlanKey) -> Option<PositionSet> {
        self.territory_mut(room).and_then(|t| t.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_unique_and_ordered() {
        let mut set = PositionSet::new();
        assert!(set.insert(Location::from_xy(5, 5)));
        assert!(set.insert(Location::from_xy(1, 2)));
        assert!(!set.insert(Location::from_xy(5, 5)));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Location::from_xy(5, 5), Location::from_xy(1, 2)]
        );
    }

    #[test]
    fn meta_records_first_creation() {
        let mut plan = TerritoryPlan::new(0);
        let key = PlanKey::ControllerContainer;
        plan.insert_position(&key, Location::from_xy(10, 10), 40);
        plan.set(key.clone(), PositionSet::new(), 90);
        assert_eq!(plan.meta(&key), Some(&PlanMeta { created_at: 40 }));
        assert_eq!(plan.age(&key, 100), 60);
    }

    #[test]
    fn persisted_layout_round_trips() {
        let mut store = PlanStore::new();
        let key = PlanKey::Extensions("spawn1".to_string());
        store.set(
            "W1N1",
            key.clone(),
            PositionSet::from_locations(vec![Location::from_xy(20, 21), Location::from_xy(22, 21)]),
            12,
        );
        store.ensure_territory("W1N1", 12).last_plan_tick = Some(12);

        let json = store.to_json().unwrap();
        assert!(json.contains("\"plannedStructures\""));
        assert!(json.contains("\"extensions:spawn1\":[\"20,21\",\"22,21\"]"));
        assert!(json.contains("\"lastStructurePlanTick\":12"));

        let restored = PlanStore::from_json(&json).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn corrupt_entries_load_without_failing() {
        let json = r#"{
            "territories": {
                "W1N1": {
                    "plannedStructures": {
                        "towers:s1": ["10,10", "60,3", "nonsense", "10,10"],
                        "labs:s1": ["1,1"]
                    },
                    "plannedStructuresMeta": { "towers:s1": { "createdAt": 5 } },
                    "lastStructurePlanTick": 9
                }
            }
        }"#;

        let store = PlanStore::from_json(json).unwrap();
        let territory = store.territory("W1N1").unwrap();
        let towers = territory.get(&PlanKey::Towers("s1".into())).unwrap();
        assert_eq!(towers.iter().collect::<Vec<_>>(), vec![Location::from_xy(10, 10)]);
        assert_eq!(towers.corrupt().len(), 2);
        assert_eq!(territory.keys().len(), 1);
        assert_eq!(territory.last_plan_tick, Some(9));
    }
}
