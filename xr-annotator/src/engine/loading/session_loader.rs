use crate::engine::assets::heightfield::Heightfield;
use crate::engine::assets::session_config::SessionConfig;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::scene::terrain::Terrain;
use bevy::asset::LoadState;
use bevy::prelude::*;
use constants::path::SESSION_CONFIG_PATH;

#[derive(Resource, Default)]
pub struct SessionLoader {
    session: Option<Handle<SessionConfig>>,
    terrain: Option<Handle<Heightfield>>,
}

fn load_failed<A: Asset>(asset_server: &AssetServer, handle: &Handle<A>) -> bool {
    matches!(asset_server.get_load_state(handle), Some(LoadState::Failed(_)))
}

// Start the loading process
pub fn start_loading(mut loader: ResMut<SessionLoader>, asset_server: Res<AssetServer>) {
    loader.session = Some(asset_server.load(SESSION_CONFIG_PATH));
}

// Read the session config and request its terrain
pub fn load_session_system(
    mut loading_progress: ResMut<LoadingProgress>,
    mut loader: ResMut<SessionLoader>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    configs: Res<Assets<SessionConfig>>,
) {
    if loading_progress.session_loaded || loading_progress.failure.is_some() {
        return;
    }
    let Some(handle) = loader.session.clone() else {
        return;
    };

    if let Some(config) = configs.get(&handle) {
        println!("✓ Session config loaded");
        commands.insert_resource(config.clone());
        loader.terrain = Some(asset_server.load(config.terrain.clone()));
        loading_progress.session_loaded = true;
    } else if load_failed(&asset_server, &handle) {
        loading_progress.fail(format!("Session config '{SESSION_CONFIG_PATH}' failed to load"));
    }
}

// Validate the heightfield and expose it as the terrain resource
pub fn load_terrain_system(
    mut loading_progress: ResMut<LoadingProgress>,
    loader: Res<SessionLoader>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    heightfields: Res<Assets<Heightfield>>,
) {
    if loading_progress.terrain_loaded || loading_progress.failure.is_some() {
        return;
    }
    let Some(handle) = loader.terrain.as_ref() else {
        return;
    };

    let loaded = heightfields.get(handle).is_some();
    let states = vec![
        (String::from("Session"), i32::from(loading_progress.session_loaded)),
        (String::from("Terrain"), i32::from(loaded)),
    ];
    // Writing unconditionally would re-trigger the frontend update every frame.
    if loading_progress.loading_states != states {
        loading_progress.loading_states = states;
    }

    if let Some(field) = heightfields.get(handle) {
        match field.validate() {
            Ok(()) => {
                println!(
                    "✓ Terrain loaded ({}x{} samples, cell {})",
                    field.width, field.depth, field.cell_size
                );
                commands.insert_resource(Terrain {
                    field: field.clone(),
                });
                loading_progress.terrain_loaded = true;
            }
            Err(e) => loading_progress.fail(format!("Invalid terrain: {e}")),
        }
    } else if load_failed(&asset_server, handle) {
        loading_progress.fail(String::from("Terrain heightfield failed to load"));
    }
}
