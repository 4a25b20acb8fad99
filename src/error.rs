use thiserror::Error;

/// Failures that abort planning for a single territory.
///
/// Expected transient conditions (no hub yet, no candidate tile, no route
/// within the search budget) are not errors; they show up as `None` and the
/// work is retried on a later cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("territory {0} is not visible this tick")]
    NotVisible(String),
    #[error("territory {room} has a terrain buffer of {len} tiles")]
    InvalidTerrain { room: String, len: usize },
    #[error("plan store could not be (de)serialized: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Persistence(err.to_string())
    }
}
