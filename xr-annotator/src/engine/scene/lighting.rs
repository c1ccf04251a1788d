use crate::engine::settings::Settings;
use bevy::prelude::*;

#[derive(Component)]
pub struct SunLight;

pub fn spawn_lighting(commands: &mut Commands, settings: &Settings) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        sun_transform(settings),
        SunLight,
    ));
    commands.insert_resource(AmbientLight {
        brightness: 400.0,
        ..default()
    });
}

fn sun_transform(settings: &Settings) -> Transform {
    // A directional light shines along its local -Z.
    Transform::from_translation(settings.sun_direction()).looking_at(Vec3::ZERO, Vec3::Y)
}

pub fn update_sun_location(
    settings: Res<Settings>,
    mut suns: Query<&mut Transform, With<SunLight>>,
) {
    if !settings.is_changed() {
        return;
    }
    for mut transform in &mut suns {
        *transform = sun_transform(&settings);
    }
}
