use bevy::prelude::*;

use crate::engine::assets::session_config::SessionConfig;
use crate::engine::camera::xr_rig::spawn_xr_rig;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::player::Player;
use crate::engine::scene::lighting::spawn_lighting;
use crate::engine::scene::terrain::{Terrain, TerrainContainer, TerrainSurface};
use crate::engine::scene::visuals::spawn_scene_visuals;
use crate::engine::settings::{SettingKey, Settings};
use crate::objects::registry::SpatialObjectRegistry;
use crate::rpc::activity_log::ActivityLog;
use crate::tools::palette::Palette;
use crate::xr::controllers_manager::ControllersManager;
use crate::xr::ui_panel::MinimapPanel;

/// Spawn point on the terrain surface, world space.
pub fn start_position(
    config: &SessionConfig,
    terrain: &dyn TerrainSurface,
    container: &TerrainContainer,
) -> Vec3 {
    let [x, z] = config.start_position;
    let y = terrain.height_at(x, z).unwrap_or(0.0);
    container.to_world(Vec3::new(x, y, z))
}

pub fn create_scene_when_ready(
    mut loading_progress: ResMut<LoadingProgress>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut settings: ResMut<Settings>,
    mut minimap: ResMut<MinimapPanel>,
    terrain: Option<Res<Terrain>>,
    config: Option<Res<SessionConfig>>,
    container: Res<TerrainContainer>,
    palette: Res<Palette>,
) {
    if loading_progress.scene_created || !loading_progress.terrain_loaded {
        return;
    }
    let (Some(terrain), Some(config)) = (terrain, config) else {
        return;
    };

    let draw_color = palette.first();
    commands.insert_resource(SpatialObjectRegistry::new(draw_color));

    if let Err(e) = settings.set(SettingKey::HeightOffset, config.height_offset) {
        warn!("Ignoring configured height offset: {}", e);
    }
    let position = start_position(&config, &*terrain, &container);
    commands.insert_resource(Player::new(position).with_height_offset(settings.height_offset));
    commands.insert_resource(ControllersManager::new(config.user_handedness));
    commands.insert_resource(ActivityLog::from_config(&config));
    minimap.fit_terrain(terrain.field.min_corner(), terrain.field.max_corner());

    spawn_scene_visuals(
        &mut commands,
        &mut meshes,
        &mut materials,
        &terrain.field,
        &container,
        draw_color,
    );
    spawn_xr_rig(&mut commands, &mut meshes, &mut materials);
    spawn_lighting(&mut commands, &settings);

    loading_progress.scene_created = true;
    println!("✓ Scene created, player at {:?}", position);
}
