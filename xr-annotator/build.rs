// build.rs
use std::{env, fs, path::PathBuf};

const DEMO_SIZE: usize = 129;
const DEMO_CELL_SIZE: f32 = 8.0;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let assets_dir = manifest_dir.join("assets");
    let terrain_dir = assets_dir.join("terrain");
    fs::create_dir_all(&terrain_dir).ok();

    // Existing assets are deployment specific, never overwrite them.
    let session_path = assets_dir.join("default.session.json");
    if !session_path.exists() {
        let session = serde_json::json!({
            "terrain": "terrain/demo.heightfield.json",
            "start_position": [0.0, -25.0],
            "activity_log_url": "",
            "user_handedness": "right",
            "height_offset": 1.0
        });
        write_json(&session_path, &session);
    }

    let terrain_path = terrain_dir.join("demo.heightfield.json");
    if !terrain_path.exists() {
        write_json(&terrain_path, &demo_heightfield());
    }
}

/// Rolling hills centred on the origin.
fn demo_heightfield() -> serde_json::Value {
    let half = (DEMO_SIZE - 1) as f32 * DEMO_CELL_SIZE * 0.5;
    let mut heights = Vec::with_capacity(DEMO_SIZE * DEMO_SIZE);
    for row in 0..DEMO_SIZE {
        for col in 0..DEMO_SIZE {
            let x = col as f32 * DEMO_CELL_SIZE - half;
            let z = row as f32 * DEMO_CELL_SIZE - half;
            let hills = (x * 0.012).sin() * (z * 0.009).cos() * 24.0;
            let ridge = (-((x - 150.0).powi(2) + (z + 120.0).powi(2)) / 20000.0).exp() * 60.0;
            heights.push((hills + ridge).max(0.0));
        }
    }

    serde_json::json!({
        "width": DEMO_SIZE,
        "depth": DEMO_SIZE,
        "origin": [-half, -half],
        "cell_size": DEMO_CELL_SIZE,
        "heights": heights,
    })
}

fn write_json(path: &PathBuf, value: &serde_json::Value) {
    let content = serde_json::to_string(value).expect("Failed to serialize generated asset");
    fs::write(path, content).expect("Failed to write generated asset");
    println!("cargo:warning=Generated {}", path.display());
}
