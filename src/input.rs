use bevy::prelude::*;

use crate::events::GameEventBus;
use crate::game_flow::{FlowState, GameFlow};

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PreUpdate,
            keyboard_to_events.run_if(resource_exists::<ButtonInput<KeyCode>>),
        );
    }
}

/// Keyboard in windowed mode; headless drivers write to the bus directly.
fn keyboard_to_events(
    keyboard: Res<ButtonInput<KeyCode>>,
    flow: Res<GameFlow>,
    mut bus: ResMut<GameEventBus>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        let name = if flow.state == FlowState::Paused {
            "game_resume"
        } else {
            "game_pause"
        };
        bus.emit(name, serde_json::json!({}), None);
    }
    if keyboard.just_pressed(KeyCode::KeyR) {
        bus.emit("game_restart", serde_json::json!({}), None);
    }
}
