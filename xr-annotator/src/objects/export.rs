use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Flat snapshot of all committed objects, shaped for the activity log endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ExportSnapshot {
    pub flags: Vec<FlagRecord>,
    #[serde(rename = "terrainLines")]
    pub terrain_lines: Vec<TerrainLineRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlagRecord {
    pub color: [f32; 3],
    pub position: [f32; 3],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TerrainLineRecord {
    pub color: [f32; 3],
    pub points: Vec<[f32; 3]>,
}

/// Snapshot tagged with the session it belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivityLogRecord {
    #[serde(flatten)]
    pub snapshot: ExportSnapshot,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// sRGB components in 0..1, the form colours take over the wire.
pub fn color_to_rgb(color: Color) -> [f32; 3] {
    let srgba = color.to_srgba();
    [srgba.red, srgba.green, srgba.blue]
}
