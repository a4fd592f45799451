//! Fulfillment stages.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Where an order sits in the fixed fulfillment sequence.
///
/// `Created` is the value an order is recorded with before any processing.
/// The pipeline only ever writes the three stages in [`Stage::PIPELINE`], in
/// that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Created,
    Dispatched,
    InTransit,
    Delivered,
}

impl Stage {
    /// The stages a Stage Runner advances through, in order.
    pub const PIPELINE: [Stage; 3] = [Stage::Dispatched, Stage::InTransit, Stage::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Created => "created",
            Stage::Dispatched => "dispatched",
            Stage::InTransit => "in_transit",
            Stage::Delivered => "delivered",
        }
    }

    /// The stage that must follow this one, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Created => Some(Stage::Dispatched),
            Stage::Dispatched => Some(Stage::InTransit),
            Stage::InTransit => Some(Stage::Delivered),
            Stage::Delivered => None,
        }
    }

    /// The stage this one must be reached from. `Created` has none.
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Created => None,
            Stage::Dispatched => Some(Stage::Created),
            Stage::InTransit => Some(Stage::Dispatched),
            Stage::Delivered => Some(Stage::InTransit),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Stage::Delivered)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stage name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Stage::Created),
            "dispatched" => Ok(Stage::Dispatched),
            "in_transit" => Ok(Stage::InTransit),
            "delivered" => Ok(Stage::Delivered),
            other => Err(UnknownStage(other.to_string())),
        }
    }
}
