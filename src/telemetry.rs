use bevy::prelude::*;
use serde::Serialize;

use crate::events::{EventCursor, GameEventBus};

/// Run counters sampled off the event bus, for the debug overlay and
/// post-run dumps.
#[derive(Resource, Default, Serialize, Clone)]
pub struct GameplayTelemetry {
    pub total_frames: u64,
    pub deaths_cut: u64,
    pub deaths_burned: u64,
    pub treasures_collected: u64,
    pub wins: u64,
    pub resets: u64,
    pub parts_settled: u64,
}

#[derive(Resource, Default)]
struct TelemetryCursor(EventCursor);

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameplayTelemetry::default())
            .insert_resource(TelemetryCursor::default())
            .add_systems(Update, update_telemetry);
    }
}

fn update_telemetry(
    mut telemetry: ResMut<GameplayTelemetry>,
    bus: Res<GameEventBus>,
    mut cursor: ResMut<TelemetryCursor>,
) {
    telemetry.total_frames += 1;
    for ev in bus.drain_new(&mut cursor.0) {
        match ev.name.as_str() {
            "gnome_died" => match ev.data.get("kind").and_then(|v| v.as_str()) {
                Some("burned") => telemetry.deaths_burned += 1,
                _ => telemetry.deaths_cut += 1,
            },
            "treasure_collected" => telemetry.treasures_collected += 1,
            "game_won" => telemetry.wins += 1,
            "game_reset" => telemetry.resets += 1,
            "part_settled" => telemetry.parts_settled += 1,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_deaths_by_kind_and_wins() {
        let mut app = App::new();
        app.insert_resource(GameEventBus::default())
            .add_plugins(TelemetryPlugin);

        {
            let mut bus = app.world_mut().resource_mut::<GameEventBus>();
            bus.frame = 1;
            bus.emit("gnome_died", serde_json::json!({ "kind": "cut" }), None);
            bus.emit("gnome_died", serde_json::json!({ "kind": "burned" }), None);
            bus.emit("treasure_collected", serde_json::json!({}), None);
            bus.emit("game_won", serde_json::json!({}), None);
            bus.emit("game_reset", serde_json::json!({}), None);
        }
        app.update();
        app.update();

        let telemetry = app.world().resource::<GameplayTelemetry>();
        assert_eq!(telemetry.deaths_cut, 1);
        assert_eq!(telemetry.deaths_burned, 1);
        assert_eq!(telemetry.treasures_collected, 1);
        assert_eq!(telemetry.wins, 1);
        assert_eq!(telemetry.resets, 1);
        assert_eq!(telemetry.total_frames, 2);
    }
}
