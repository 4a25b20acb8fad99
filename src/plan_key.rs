//! Typed plan keys.
//!
//! Every planned tile is filed under a `PlanKey`: a structure category plus
//! the identity of the thing it serves. The persisted form is a short string
//! (`container_source:<id>`, `road:<from>:<to>`, ...), parsed back into the
//! closed enum on load so no code branches on string prefixes.

use crate::location::*;
use serde::*;
use std::fmt;
use std::str::FromStr;

use screeps::constants::StructureType;

/// Identity used for the `from` side of halo padding roads.
pub const HALO_ANCHOR: &str = "halo";

/// Identity used for the controller when it is an energy node.
pub const CONTROLLER_ANCHOR: &str = "controller";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum PlanCategory {
    SourceContainer,
    ControllerContainer,
    MineralContainer,
    Road,
    RoadConnector,
    Extensions,
    Towers,
    Ramparts,
}

impl PlanCategory {
    pub fn structure_type(self) -> StructureType {
        match self {
            PlanCategory::SourceContainer
            | PlanCategory::ControllerContainer
            | PlanCategory::MineralContainer => StructureType::Container,
            PlanCategory::Road | PlanCategory::RoadConnector => StructureType::Road,
            PlanCategory::Extensions => StructureType::Extension,
            PlanCategory::Towers => StructureType::Tower,
            PlanCategory::Ramparts => StructureType::Rampart,
        }
    }

    pub fn is_road(self) -> bool {
        matches!(self, PlanCategory::Road | PlanCategory::RoadConnector)
    }

    /// Categories whose tiles claim the tile exclusively. Ramparts overlay
    /// other structures and roads can be pruned, so neither counts.
    pub fn is_exclusive(self) -> bool {
        !self.is_road() && self != PlanCategory::Ramparts
    }

    /// Upper bound on positions for single-target categories.
    pub fn max_positions(self) -> Option<usize> {
        match self {
            PlanCategory::SourceContainer
            | PlanCategory::ControllerContainer
            | PlanCategory::MineralContainer => Some(1),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            PlanCategory::SourceContainer => "container_source",
            PlanCategory::ControllerContainer => "container_controller",
            PlanCategory::MineralContainer => "container_mineral",
            PlanCategory::Road => "road",
            PlanCategory::RoadConnector => "road_connector",
            PlanCategory::Extensions => "extensions",
            PlanCategory::Towers => "towers",
            PlanCategory::Ramparts => "ramparts",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum PlanKey {
    SourceContainer(String),
    ControllerContainer,
    MineralContainer(String),
    Road { from: String, to: String },
    RoadConnector { from: Location, to: Location },
    Extensions(String),
    Towers(String),
    Ramparts,
}

impl PlanKey {
    pub fn category(&self) -> PlanCategory {
        match self {
            PlanKey::SourceContainer(_) => PlanCategory::SourceContainer,
            PlanKey::ControllerContainer => PlanCategory::ControllerContainer,
            PlanKey::MineralContainer(_) => PlanCategory::MineralContainer,
            PlanKey::Road { .. } => PlanCategory::Road,
            PlanKey::RoadConnector { .. } => PlanCategory::RoadConnector,
            PlanKey::Extensions(_) => PlanCategory::Extensions,
            PlanKey::Towers(_) => PlanCategory::Towers,
            PlanKey::Ramparts => PlanCategory::Ramparts,
        }
    }

    pub fn structure_type(&self) -> StructureType {
        self.category().structure_type()
    }

    pub fn is_road(&self) -> bool {
        self.category().is_road()
    }

    pub fn road(from: impl Into<String>, to: impl Into<String>) -> Self {
        PlanKey::Road {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The halo road key padding this key's structures.
    pub fn halo(&self) -> PlanKey {
        PlanKey::road(HALO_ANCHOR, self.owner_tag())
    }

    pub fn is_halo(&self) -> bool {
        matches!(self, PlanKey::Road { from, .. } if from == HALO_ANCHOR)
    }

    /// Keys that disappear once every tile has been built. The others stay
    /// behind empty, marking their target as done so it is not re-planned.
    pub fn is_transient(&self) -> bool {
        match self {
            PlanKey::Extensions(_) | PlanKey::Towers(_) => true,
            PlanKey::Road { .. } => self.is_halo(),
            _ => false,
        }
    }

    /// `<category>-<id>`: a separator-free tag naming this key inside another.
    pub fn owner_tag(&self) -> String {
        let tag = self.category().tag();
        match self {
            PlanKey::SourceContainer(id)
            | PlanKey::MineralContainer(id)
            | PlanKey::Extensions(id)
            | PlanKey::Towers(id) => format!("{}-{}", tag, id),
            PlanKey::Road { from, to } => format!("{}-{}-{}", tag, from, to),
            PlanKey::RoadConnector { from, to } => format!(
                "{}-{}-{}-{}-{}",
                tag,
                from.x(),
                from.y(),
                to.x(),
                to.y()
            ),
            PlanKey::ControllerContainer | PlanKey::Ramparts => tag.to_string(),
        }
    }
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.category().tag();
        match self {
            PlanKey::SourceContainer(id)
            | PlanKey::MineralContainer(id)
            | PlanKey::Extensions(id)
            | PlanKey::Towers(id) => write!(f, "{}:{}", tag, id),
            PlanKey::Road { from, to } => write!(f, "{}:{}:{}", tag, from, to),
            PlanKey::RoadConnector { from, to } => write!(f, "{}:{}:{}", tag, from, to),
            PlanKey::ControllerContainer | PlanKey::Ramparts => f.write_str(tag),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsePlanKeyError(pub String);

impl fmt::Display for ParsePlanKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized plan key {:?}", self.0)
    }
}

impl FromStr for PlanKey {
    type Err = ParsePlanKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePlanKeyError(s.to_string());
        let mut parts = s.splitn(3, ':');
        let tag = parts.next().ok_or_else(err)?;
        let first = parts.next().filter(|p| !p.is_empty());
        let second = parts.next().filter(|p| !p.is_empty());

        let key = match (tag, first, second) {
            ("container_source", Some(id), None) => PlanKey::SourceContainer(id.to_string()),
            ("container_controller", None, None) => PlanKey::ControllerContainer,
            ("container_mineral", Some(id), None) => PlanKey::MineralContainer(id.to_string()),
            ("road", Some(from), Some(to)) => PlanKey::road(from, to),
            ("road_connector", Some(from), Some(to)) => PlanKey::RoadConnector {
                from: from.parse().map_err(|_| err())?,
                to: to.parse().map_err(|_| err())?,
            },
            ("extensions", Some(id), None) => PlanKey::Extensions(id.to_string()),
            ("towers", Some(id), None) => PlanKey::Towers(id.to_string()),
            ("ramparts", None, None) => PlanKey::Ramparts,
            _ => return Err(err()),
        };

        Ok(key)
    }
}

impl Serialize for PlanKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlanKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
