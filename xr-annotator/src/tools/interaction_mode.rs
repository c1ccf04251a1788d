use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the skilled hand's trigger does to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionMode {
    #[default]
    Navigate,
    AddPoint,
    AddPolygon,
    Remove,
}

impl InteractionMode {
    pub const ALL: [InteractionMode; 4] = [
        InteractionMode::Navigate,
        InteractionMode::AddPoint,
        InteractionMode::AddPolygon,
        InteractionMode::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::AddPoint => "addPoint",
            Self::AddPolygon => "addPolygon",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown mode: {s}"))
    }
}
