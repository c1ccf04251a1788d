use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
// Crate engine modules
use crate::engine::assets::heightfield::Heightfield;
use crate::engine::assets::session_config::SessionConfig;
use crate::engine::camera::xr_rig::{
    sync_hand_visuals, sync_head_pose, sync_minimap_icons, sync_rig_transform,
};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::loading::scene_creator::create_scene_when_ready;
use crate::engine::loading::session_loader::{
    SessionLoader, load_session_system, load_terrain_system, start_loading,
};
use crate::engine::scene::lighting::update_sun_location;
use crate::engine::scene::visuals::{
    VisualIndex, sync_container_transform, sync_preview_colors, sync_preview_visuals,
    sync_registry_visuals,
};
use crate::engine::settings::bind_menu_sliders;
// Interaction and input
use crate::tools::interaction_systems::{InteractionPlugin, InteractionSet};
use crate::xr::input_plugin::XrInputPlugin;
// Web RPC
use crate::rpc::web_rpc::WebRpcPlugin;
// Transitions
use crate::engine::core::app_state::{AppState, transition_to_running, update_loading_frontend};

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Double extensions keep the two JSON loaders apart.
        .add_plugins(JsonAssetPlugin::<SessionConfig>::new(&["session.json"]))
        .add_plugins(JsonAssetPlugin::<Heightfield>::new(&["heightfield.json"]))
        .add_plugins(XrInputPlugin)
        .add_plugins(InteractionPlugin)
        .add_plugins(WebRpcPlugin);

    // Initialise resources early
    app.init_resource::<LoadingProgress>()
        .init_resource::<SessionLoader>()
        .init_resource::<VisualIndex>();

    // State-based system scheduling
    app.add_systems(Startup, (bind_menu_sliders, start_loading).chain())
        .add_systems(
            Update,
            (
                // Loading phase systems
                load_session_system,
                load_terrain_system,
                create_scene_when_ready,
                update_loading_frontend,
                transition_to_running,
            )
                .chain()
                .run_if(in_state(AppState::Loading)),
        );

    // Presentation follows the interaction stage.
    let runtime_systems = (
        sync_registry_visuals,
        sync_preview_colors,
        sync_preview_visuals,
        sync_container_transform,
        sync_rig_transform,
        sync_head_pose,
        sync_hand_visuals,
        sync_minimap_icons,
        update_sun_location,
    );

    app.add_systems(
        Update,
        runtime_systems
            .after(InteractionSet)
            .run_if(in_state(AppState::Running)),
    );

    app
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
