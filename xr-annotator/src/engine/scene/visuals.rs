/// ECS mirror of the annotation state: placed objects, previews and markers.
use bevy::prelude::*;
use bevy::render::view::NoFrustumCulling;
use std::collections::HashMap;

use crate::engine::assets::heightfield::Heightfield;
use crate::engine::scene::line_mesh::{line_mesh, tube_mesh};
use crate::engine::scene::terrain::TerrainContainer;
use crate::engine::scene::terrain_mesh::{TerrainMesh, build_terrain_mesh};
use crate::objects::registry::{ObjectId, PlacedKind, RegistryChange, SpatialObjectRegistry};
use crate::tools::mode_controller::InteractionModeController;
use crate::xr::ui_panel::MinimapPanel;
use constants::render_settings::{
    AREA_MARKER_HEIGHT, AREA_MARKER_OPACITY, AREA_MARKER_RADIUS, HIGHLIGHT_EMISSIVE,
    LINE_THICKNESS, MARKER_HEIGHT, NAVIGATION_MARKER_HEIGHT, NAVIGATION_MARKER_RADIUS,
    PLACEHOLDER_OPACITY,
};

/// Parent of the terrain and every placed object. Carries the container scale.
#[derive(Component)]
pub struct TerrainRoot;

#[derive(Component)]
pub struct PlacedVisual(pub ObjectId);

/// Per-instance material, recoloured and highlighted in place.
#[derive(Component)]
pub struct TintMaterial(pub Handle<StandardMaterial>);

#[derive(Component)]
pub struct DraftLineVisual;

#[derive(Component)]
pub struct DraftSegmentVisual;

#[derive(Component)]
pub struct MarkerPlaceholderVisual;

#[derive(Component)]
pub struct AreaMarkerVisual;

#[derive(Component)]
pub struct NavigationMarkerVisual;

/// Shared meshes and materials for annotation visuals.
#[derive(Resource)]
pub struct SceneAssets {
    pole_mesh: Handle<Mesh>,
    cloth_mesh: Handle<Mesh>,
    pole_material: Handle<StandardMaterial>,
    placeholder_material: Handle<StandardMaterial>,
    draft_material: Handle<StandardMaterial>,
    segment_material: Handle<StandardMaterial>,
}

#[derive(Resource, Default)]
pub struct VisualIndex {
    entities: HashMap<ObjectId, Entity>,
}

impl VisualIndex {
    pub fn get(&self, id: ObjectId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

fn translucent(color: Color, alpha: f32) -> StandardMaterial {
    StandardMaterial {
        base_color: color.with_alpha(alpha),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    }
}

/// Spawn the terrain root, terrain mesh and every preview entity. Runs once
/// after the heightfield is loaded.
pub fn spawn_scene_visuals(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    field: &Heightfield,
    container: &TerrainContainer,
    draw_color: Color,
) {
    let terrain_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.6, 0.45),
        perceptual_roughness: 0.95,
        ..default()
    });

    let root = commands
        .spawn((TerrainRoot, container.transform(), Visibility::Visible))
        .id();

    commands.spawn((
        Mesh3d(meshes.add(build_terrain_mesh(field))),
        MeshMaterial3d(terrain_material),
        Transform::IDENTITY,
        NoFrustumCulling,
        TerrainMesh,
        ChildOf(root),
    ));

    let assets = SceneAssets {
        pole_mesh: meshes.add(Cylinder::new(0.03, MARKER_HEIGHT)),
        cloth_mesh: meshes.add(Cuboid::new(0.6, 0.4, 0.02)),
        pole_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.8, 0.8, 0.8),
            metallic: 0.6,
            ..default()
        }),
        placeholder_material: materials.add(translucent(draw_color, PLACEHOLDER_OPACITY)),
        draft_material: materials.add(StandardMaterial {
            base_color: draw_color,
            ..default()
        }),
        segment_material: materials.add(translucent(draw_color, PLACEHOLDER_OPACITY)),
    };

    // Marker placeholder shares the marker silhouette.
    let placeholder = commands
        .spawn((
            MarkerPlaceholderVisual,
            Transform::IDENTITY,
            Visibility::Hidden,
            ChildOf(root),
        ))
        .id();
    spawn_marker_parts(commands, placeholder, &assets, assets.placeholder_material.clone());

    commands.spawn((
        DraftLineVisual,
        Mesh3d::default(),
        MeshMaterial3d(assets.draft_material.clone()),
        Transform::IDENTITY,
        Visibility::Hidden,
        ChildOf(root),
    ));
    commands.spawn((
        DraftSegmentVisual,
        Mesh3d::default(),
        MeshMaterial3d(assets.segment_material.clone()),
        Transform::IDENTITY,
        Visibility::Hidden,
        ChildOf(root),
    ));
    commands.spawn((
        AreaMarkerVisual,
        Mesh3d(meshes.add(Cylinder::new(AREA_MARKER_RADIUS, AREA_MARKER_HEIGHT))),
        MeshMaterial3d(materials.add(translucent(draw_color, AREA_MARKER_OPACITY))),
        Transform::IDENTITY,
        Visibility::Hidden,
        ChildOf(root),
    ));

    // Navigation beam lives in world space so it keeps its size at any scale.
    commands.spawn((
        NavigationMarkerVisual,
        Mesh3d(meshes.add(Cylinder::new(NAVIGATION_MARKER_RADIUS, NAVIGATION_MARKER_HEIGHT))),
        MeshMaterial3d(materials.add(translucent(Color::srgb(0.3, 0.8, 1.0), 0.4))),
        Transform::IDENTITY,
        Visibility::Hidden,
    ));

    commands.insert_resource(assets);
}

fn spawn_marker_parts(
    commands: &mut Commands,
    parent: Entity,
    assets: &SceneAssets,
    cloth_material: Handle<StandardMaterial>,
) {
    commands.spawn((
        Mesh3d(assets.pole_mesh.clone()),
        MeshMaterial3d(assets.pole_material.clone()),
        Transform::from_xyz(0.0, MARKER_HEIGHT * 0.5, 0.0),
        ChildOf(parent),
    ));
    commands.spawn((
        Mesh3d(assets.cloth_mesh.clone()),
        MeshMaterial3d(cloth_material),
        Transform::from_xyz(0.3, MARKER_HEIGHT - 0.2, 0.0),
        ChildOf(parent),
    ));
}

fn highlight_emissive(highlighted: bool) -> LinearRgba {
    if highlighted {
        let [r, g, b] = HIGHLIGHT_EMISSIVE;
        Color::srgb(r, g, b).into()
    } else {
        LinearRgba::BLACK
    }
}

/// Keep one minimap icon per committed object.
fn sync_minimap_icons(
    changes: &[RegistryChange],
    registry: &SpatialObjectRegistry,
    minimap: &mut MinimapPanel,
) {
    for change in changes {
        match change {
            RegistryChange::Added(id) => match registry.get(*id).map(|object| &object.kind) {
                Some(PlacedKind::Marker(marker)) => {
                    minimap.add_flag_icon(*id, marker.position(), marker.color())
                }
                Some(PlacedKind::Polyline(line)) => {
                    minimap.add_line_icon(*id, line.points(), line.color())
                }
                None => {}
            },
            RegistryChange::Removed(id) => {
                minimap.remove_icon(*id);
            }
            _ => {}
        }
    }
}

/// Apply registry changes recorded since the previous frame.
pub fn sync_registry_visuals(
    mut commands: Commands,
    mut registry: ResMut<SpatialObjectRegistry>,
    mut minimap: ResMut<MinimapPanel>,
    mut index: ResMut<VisualIndex>,
    assets: Option<Res<SceneAssets>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    roots: Query<Entity, With<TerrainRoot>>,
    tints: Query<&TintMaterial>,
    mut draft_line: Query<
        (&mut Mesh3d, &mut Visibility),
        (With<DraftLineVisual>, Without<DraftSegmentVisual>),
    >,
    mut draft_segment: Query<
        (&mut Mesh3d, &mut Visibility),
        (With<DraftSegmentVisual>, Without<DraftLineVisual>),
    >,
) {
    let changes = registry.take_changes();
    if changes.is_empty() {
        return;
    }
    if changes
        .iter()
        .any(|change| matches!(change, RegistryChange::Added(_) | RegistryChange::Removed(_)))
    {
        sync_minimap_icons(&changes, &registry, &mut minimap);
    }
    let (Some(assets), Ok(root)) = (assets, roots.single()) else {
        return;
    };

    for change in changes {
        match change {
            RegistryChange::Added(id) => {
                let Some(object) = registry.get(id) else {
                    continue;
                };
                let tint = materials.add(StandardMaterial {
                    base_color: object.color(),
                    emissive: highlight_emissive(object.highlighted),
                    ..default()
                });

                let entity = match &object.kind {
                    PlacedKind::Marker(marker) => {
                        let entity = commands
                            .spawn((
                                PlacedVisual(id),
                                TintMaterial(tint.clone()),
                                Transform::from_translation(marker.position()),
                                Visibility::Visible,
                                ChildOf(root),
                            ))
                            .id();
                        spawn_marker_parts(&mut commands, entity, &assets, tint);
                        entity
                    }
                    PlacedKind::Polyline(line) => {
                        let mesh = line
                            .geometry()
                            .map(|geometry| meshes.add(tube_mesh(geometry)))
                            .unwrap_or_default();
                        commands
                            .spawn((
                                PlacedVisual(id),
                                TintMaterial(tint.clone()),
                                Mesh3d(mesh),
                                MeshMaterial3d(tint),
                                Transform::IDENTITY,
                                Visibility::Visible,
                                ChildOf(root),
                            ))
                            .id()
                    }
                };
                index.entities.insert(id, entity);
            }
            RegistryChange::Removed(id) => {
                if let Some(entity) = index.entities.remove(&id) {
                    commands.entity(entity).despawn();
                }
            }
            RegistryChange::Restyled(id) => {
                let (Some(object), Some(entity)) = (registry.get(id), index.get(id)) else {
                    continue;
                };
                let Ok(tint) = tints.get(entity) else {
                    continue;
                };
                if let Some(material) = materials.get_mut(&tint.0) {
                    material.base_color = object.color();
                    material.emissive = highlight_emissive(object.highlighted);
                }
            }
            RegistryChange::DraftChanged => {
                let draft = registry.draft();
                if let Ok((mut mesh, mut visibility)) = draft_line.single_mut() {
                    match draft.and_then(|line| line.geometry()) {
                        Some(geometry) => {
                            mesh.0 = meshes.add(tube_mesh(geometry));
                            *visibility = Visibility::Visible;
                        }
                        None => *visibility = Visibility::Hidden,
                    }
                }
                if let Ok((mut mesh, mut visibility)) = draft_segment.single_mut() {
                    rebuild_draft_segment(&registry, &mut meshes, &mut mesh, &mut visibility);
                }
            }
            RegistryChange::DraftPreviewMoved => {
                if let Ok((mut mesh, mut visibility)) = draft_segment.single_mut() {
                    rebuild_draft_segment(&registry, &mut meshes, &mut mesh, &mut visibility);
                }
            }
        }
    }
}

fn rebuild_draft_segment(
    registry: &SpatialObjectRegistry,
    meshes: &mut Assets<Mesh>,
    mesh: &mut Mesh3d,
    visibility: &mut Visibility,
) {
    let segment = registry
        .draft()
        .map(|line| line.placeholder())
        .filter(|segment| segment.enabled)
        .and_then(|segment| line_mesh(&[segment.start, segment.end], LINE_THICKNESS));
    match segment {
        Some(segment_mesh) => {
            mesh.0 = meshes.add(segment_mesh);
            *visibility = Visibility::Visible;
        }
        None => *visibility = Visibility::Hidden,
    }
}

/// Follow the draw colour on every preview material.
pub fn sync_preview_colors(
    registry: Res<SpatialObjectRegistry>,
    assets: Option<Res<SceneAssets>>,
    area: Query<&MeshMaterial3d<StandardMaterial>, With<AreaMarkerVisual>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut last: Local<Option<Color>>,
) {
    let Some(assets) = assets else {
        return;
    };
    let color = registry.active_color();
    if *last == Some(color) {
        return;
    }
    *last = Some(color);

    let mut handles = vec![
        (assets.placeholder_material.clone(), PLACEHOLDER_OPACITY),
        (assets.segment_material.clone(), PLACEHOLDER_OPACITY),
        (assets.draft_material.clone(), 1.0),
    ];
    handles.extend(area.iter().map(|m| (m.0.clone(), AREA_MARKER_OPACITY)));
    for (handle, alpha) in handles {
        if let Some(material) = materials.get_mut(&handle) {
            material.base_color = color.with_alpha(alpha);
        }
    }
}

/// Position and show or hide the preview markers.
pub fn sync_preview_visuals(
    registry: Res<SpatialObjectRegistry>,
    controller: Res<InteractionModeController>,
    mut placeholders: Query<
        (&mut Transform, &mut Visibility),
        (
            With<MarkerPlaceholderVisual>,
            Without<AreaMarkerVisual>,
            Without<NavigationMarkerVisual>,
        ),
    >,
    mut areas: Query<
        (&mut Transform, &mut Visibility),
        (
            With<AreaMarkerVisual>,
            Without<MarkerPlaceholderVisual>,
            Without<NavigationMarkerVisual>,
        ),
    >,
    mut navigation: Query<
        (&mut Transform, &mut Visibility),
        (
            With<NavigationMarkerVisual>,
            Without<MarkerPlaceholderVisual>,
            Without<AreaMarkerVisual>,
        ),
    >,
) {
    let placeholder = registry.marker_placeholder();
    for (mut transform, mut visibility) in &mut placeholders {
        transform.translation = placeholder.position;
        *visibility = shown(placeholder.visible);
    }

    for (mut transform, mut visibility) in &mut areas {
        match controller.area_marker() {
            Some((position, rotation)) => {
                *transform = Transform::from_translation(position).with_rotation(rotation);
                *visibility = Visibility::Visible;
            }
            None => *visibility = Visibility::Hidden,
        }
    }

    for (mut transform, mut visibility) in &mut navigation {
        match controller.navigation_marker() {
            Some(position) => {
                transform.translation = position + Vec3::Y * NAVIGATION_MARKER_HEIGHT * 0.5;
                *visibility = Visibility::Visible;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

/// Apply container scale changes to the terrain root.
pub fn sync_container_transform(
    container: Res<TerrainContainer>,
    mut roots: Query<&mut Transform, With<TerrainRoot>>,
) {
    if !container.is_changed() {
        return;
    }
    for mut transform in &mut roots {
        *transform = container.transform();
    }
}

fn shown(visible: bool) -> Visibility {
    if visible {
        Visibility::Visible
    } else {
        Visibility::Hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::registry::LineOutcome;

    fn visuals_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<VisualIndex>()
            .init_resource::<MinimapPanel>()
            .insert_resource(SpatialObjectRegistry::new(Color::WHITE))
            .add_systems(
                Startup,
                |mut commands: Commands,
                 mut meshes: ResMut<Assets<Mesh>>,
                 mut materials: ResMut<Assets<StandardMaterial>>| {
                    spawn_scene_visuals(
                        &mut commands,
                        &mut meshes,
                        &mut materials,
                        &Heightfield::flat(9, 9, 1.0, 0.0),
                        &TerrainContainer::default(),
                        Color::WHITE,
                    );
                },
            )
            .add_systems(Update, sync_registry_visuals);
        app
    }

    fn registry(app: &mut App) -> Mut<'_, SpatialObjectRegistry> {
        app.world_mut().resource_mut::<SpatialObjectRegistry>()
    }

    #[test]
    fn placed_and_removed_objects_follow_the_registry() {
        let mut app = visuals_app();
        let id = registry(&mut app).place_marker(Vec3::new(1.0, 0.0, 1.0));
        app.update();

        let index = app.world().resource::<VisualIndex>();
        assert_eq!(index.len(), 1);
        let entity = index.get(id).unwrap();
        assert_eq!(
            app.world().get::<Transform>(entity).unwrap().translation,
            Vec3::new(1.0, 0.0, 1.0)
        );

        registry(&mut app).remove(id);
        app.update();
        assert_eq!(app.world().resource::<VisualIndex>().len(), 0);
        assert!(app.world().get_entity(entity).is_err());
    }

    #[test]
    fn minimap_icons_follow_placement_commit_and_removal() {
        let mut app = visuals_app();
        let marker = registry(&mut app).place_marker(Vec3::new(2.0, 0.0, 2.0));
        registry(&mut app).append_line_point(Vec3::ZERO);
        registry(&mut app).append_line_point(Vec3::X);
        let LineOutcome::Committed(line) = registry(&mut app).finish_line() else {
            panic!("expected a committed line");
        };
        app.update();

        let ids: Vec<ObjectId> = app
            .world()
            .resource::<MinimapPanel>()
            .icons()
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(ids, vec![marker, line]);

        registry(&mut app).remove(marker);
        app.update();
        let minimap = app.world().resource::<MinimapPanel>();
        assert_eq!(minimap.icons().len(), 1);
        assert_eq!(minimap.icons()[0].0, line);
    }

    #[test]
    fn highlight_restyles_the_instance_material() {
        let mut app = visuals_app();
        let id = registry(&mut app).place_marker(Vec3::ZERO);
        app.update();

        registry(&mut app).set_highlight(id, true);
        app.update();

        let entity = app.world().resource::<VisualIndex>().get(id).unwrap();
        let tint = app.world().get::<TintMaterial>(entity).unwrap().0.clone();
        let materials = app.world().resource::<Assets<StandardMaterial>>();
        assert_ne!(materials.get(&tint).unwrap().emissive, LinearRgba::BLACK);
    }

    #[test]
    fn draft_line_shows_once_it_has_geometry() {
        let mut app = visuals_app();
        registry(&mut app).append_line_point(Vec3::ZERO);
        app.update();

        let mut draft = app
            .world_mut()
            .query_filtered::<&Visibility, With<DraftLineVisual>>();
        assert_eq!(*draft.single(app.world()).unwrap(), Visibility::Hidden);

        registry(&mut app).append_line_point(Vec3::X);
        app.update();
        assert_eq!(*draft.single(app.world()).unwrap(), Visibility::Visible);
    }
}
