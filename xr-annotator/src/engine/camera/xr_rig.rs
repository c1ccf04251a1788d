use crate::engine::player::Player;
use crate::engine::scene::line_mesh::line_mesh;
use crate::xr::controllers_manager::ControllersManager;
use crate::xr::session::{CONTROLLER_SLOTS, XrInputFrame};
use crate::xr::ui_panel::{MinimapIcon, MinimapPanel, menu_local_transform};
use bevy::prelude::*;
use constants::panel::{
    MENU_PANEL_DEPTH, MENU_PANEL_SIZE, MINIMAP_ICON_LIFT, MINIMAP_ICON_RADIUS,
    MINIMAP_LINE_THICKNESS,
};
use constants::render_settings::POINTER_LENGTH;

/// Tracking-space origin. Moved by teleports, never by head motion.
#[derive(Component)]
pub struct XrRig;

/// Viewer camera, posed in tracking space under the rig.
#[derive(Component)]
pub struct XrHead;

#[derive(Component)]
pub struct PointerVisual {
    pub slot: usize,
}

#[derive(Component)]
pub struct HandMenuVisual;

#[derive(Component)]
pub struct MinimapVisual;

/// Board face under [`MinimapVisual`], scaled to the terrain aspect ratio.
#[derive(Component)]
pub struct MinimapFace;

/// Flag, line or user marker drawn on the board.
#[derive(Component)]
pub struct MinimapIconVisual;

const MINIMAP_FACE_DEPTH: f32 = 0.01;
const USER_ICON_COLOR: Color = Color::srgb(1.0, 0.85, 0.0);

pub fn spawn_xr_rig(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let rig = commands
        .spawn((XrRig, Transform::IDENTITY, Visibility::Visible))
        .id();
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 50f32.to_radians(),
            near: 0.01,
            far: 50_000.0,
            ..default()
        }),
        Transform::IDENTITY,
        XrHead,
        ChildOf(rig),
    ));

    let pointer_mesh = meshes.add(Cuboid::new(0.004, 0.004, POINTER_LENGTH));
    let pointer_material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.6),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });
    for slot in 0..CONTROLLER_SLOTS {
        commands.spawn((
            Mesh3d(pointer_mesh.clone()),
            MeshMaterial3d(pointer_material.clone()),
            Transform::IDENTITY,
            Visibility::Hidden,
            PointerVisual { slot },
        ));
    }

    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(MENU_PANEL_SIZE, MENU_PANEL_SIZE, MENU_PANEL_DEPTH))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.063, 0.063, 0.063),
            unlit: true,
            ..default()
        })),
        Transform::IDENTITY,
        Visibility::Hidden,
        HandMenuVisual,
    ));

    let board = commands
        .spawn((Transform::IDENTITY, Visibility::Hidden, MinimapVisual))
        .id();
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(1.0, 1.0, MINIMAP_FACE_DEPTH))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.85, 0.85, 0.8),
            unlit: true,
            ..default()
        })),
        Transform::IDENTITY,
        MinimapFace,
        ChildOf(board),
    ));
}

pub fn sync_rig_transform(player: Res<Player>, mut rigs: Query<&mut Transform, With<XrRig>>) {
    if !player.is_changed() {
        return;
    }
    for mut transform in &mut rigs {
        *transform = player.rig_transform();
    }
}

pub fn sync_head_pose(frame: Res<XrInputFrame>, mut heads: Query<&mut Transform, With<XrHead>>) {
    for mut transform in &mut heads {
        *transform = frame.head.to_transform();
    }
}

/// Pointer rays, the hand menu and the minimap board, all in world space.
pub fn sync_hand_visuals(
    controllers: Res<ControllersManager>,
    minimap: Res<MinimapPanel>,
    mut pointers: Query<
        (&PointerVisual, &mut Transform, &mut Visibility),
        (Without<HandMenuVisual>, Without<MinimapVisual>),
    >,
    mut menus: Query<
        (&mut Transform, &mut Visibility),
        (With<HandMenuVisual>, Without<PointerVisual>, Without<MinimapVisual>),
    >,
    mut boards: Query<
        (&mut Transform, &mut Visibility),
        (With<MinimapVisual>, Without<PointerVisual>, Without<HandMenuVisual>),
    >,
) {
    for (pointer, mut transform, mut visibility) in &mut pointers {
        let Some(hand) = controllers.controller(pointer.slot).filter(|c| c.connected()) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        let ray = hand.ray();
        *transform = Transform::from_translation(ray.origin + *ray.direction * POINTER_LENGTH * 0.5)
            .looking_to(*ray.direction, Vec3::Y);
        *visibility = Visibility::Visible;
    }

    let menu = controllers.menu();
    let grip = menu
        .attached_slot()
        .and_then(|slot| controllers.controller(slot))
        .filter(|c| c.connected())
        .map(|c| c.grip());
    for (mut transform, mut visibility) in &mut menus {
        match grip.filter(|_| menu.visible()) {
            Some(grip) => {
                *transform = grip.mul_transform(menu_local_transform());
                *visibility = Visibility::Visible;
            }
            None => *visibility = Visibility::Hidden,
        }
    }

    for (mut transform, mut visibility) in &mut boards {
        *transform = minimap.transform;
        *visibility = if minimap.visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}

/// Rebuild the board face and its icons whenever the minimap changes.
pub fn sync_minimap_icons(
    mut commands: Commands,
    minimap: Res<MinimapPanel>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    boards: Query<Entity, With<MinimapVisual>>,
    mut faces: Query<&mut Transform, With<MinimapFace>>,
    icons: Query<Entity, With<MinimapIconVisual>>,
) {
    if !minimap.is_changed() {
        return;
    }
    let Ok(board) = boards.single() else {
        return;
    };

    let size = minimap.board_size();
    for mut transform in &mut faces {
        transform.scale = size.extend(1.0);
    }
    for icon in &icons {
        commands.entity(icon).despawn();
    }

    let lift = MINIMAP_FACE_DEPTH * 0.5 + MINIMAP_ICON_LIFT;
    let disc = meshes.add(Cylinder::new(MINIMAP_ICON_RADIUS, 0.001));
    let upright = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
    let mut spawn_icon = |commands: &mut Commands, mesh: Handle<Mesh>, color: Color, at: Transform| {
        commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: color,
                unlit: true,
                ..default()
            })),
            at,
            MinimapIconVisual,
            ChildOf(board),
        ));
    };

    for (_, icon) in minimap.icons() {
        match icon {
            MinimapIcon::Flag { at, color } => {
                let at = Transform::from_translation(at.extend(lift)).with_rotation(upright);
                spawn_icon(&mut commands, disc.clone(), *color, at);
            }
            MinimapIcon::Line { points, color } => {
                let points: Vec<Vec3> = points.iter().map(|p| p.extend(lift)).collect();
                match line_mesh(&points, MINIMAP_LINE_THICKNESS) {
                    Some(mesh) => {
                        spawn_icon(&mut commands, meshes.add(mesh), *color, Transform::IDENTITY)
                    }
                    None => debug!("Skipping degenerate minimap line"),
                }
            }
        }
    }

    let user = Transform::from_translation(minimap.user_icon().extend(lift * 2.0))
        .with_rotation(upright)
        .with_scale(Vec3::splat(1.5));
    spawn_icon(&mut commands, disc, USER_ICON_COLOR, user);
}
