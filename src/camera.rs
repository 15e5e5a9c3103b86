use bevy::prelude::*;

use crate::components::{GamePosition, HeadlessMode};

/// Which entity the camera tracks. Cleared on death, reassigned on spawn;
/// gameplay only ever touches this resource, never the camera entity.
#[derive(Resource, Clone)]
pub struct CameraConfig {
    pub follow_target: Option<Entity>,
    pub follow_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_target: None,
            follow_speed: 0.1,
        }
    }
}

#[derive(Component)]
pub struct MainCamera;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(CameraConfig::default())
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, camera_follow);
    }
}

fn spawn_camera(mut commands: Commands, headless: Option<Res<HeadlessMode>>) {
    if headless.map(|h| h.0).unwrap_or(true) {
        return;
    }
    commands.spawn((Camera2d, MainCamera));
}

fn camera_follow(
    config: Res<CameraConfig>,
    positions: Query<&GamePosition>,
    mut cameras: Query<&mut Transform, With<MainCamera>>,
) {
    let Some(target) = config.follow_target else {
        return;
    };
    let Ok(target_pos) = positions.get(target) else {
        return;
    };
    let t = config.follow_speed.clamp(0.0, 1.0);
    for mut transform in cameras.iter_mut() {
        transform.translation.x += (target_pos.x - transform.translation.x) * t;
        transform.translation.y += (target_pos.y - transform.translation.y) * t;
    }
}
