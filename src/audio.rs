use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::GameConfig;
use crate::events::{EventCursor, GameEventBus};

const MAX_AUDIO_EVENTS: usize = 128;

fn default_volume() -> f32 {
    1.0
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SfxDefinition {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub pitch_variance: f32,
}

/// One observable playback, recorded whether or not a backend is attached.
/// Headless runs and tests assert against this log.
#[derive(Clone, Serialize)]
pub struct AudioEventLog {
    pub frame: u64,
    pub name: String,
    pub volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event: Option<String>,
}

/// Fire-and-forget one-shot playback service. A sound is a named clip
/// handle; asking for an unknown clip is an error the caller drops, so a
/// missing sound degrades to silence.
#[derive(Resource)]
pub struct AudioManager {
    pub sfx: HashMap<String, SfxDefinition>,
    /// Bus event name -> clip to auto-play when that event appears.
    pub triggers: HashMap<String, String>,
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub recent_events: Vec<AudioEventLog>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self {
            sfx: HashMap::new(),
            triggers: HashMap::new(),
            master_volume: 1.0,
            sfx_volume: 1.0,
            recent_events: Vec::new(),
        }
    }
}

impl AudioManager {
    pub fn play_sfx(
        &mut self,
        name: &str,
        frame: u64,
        source_event: Option<String>,
    ) -> Result<(), String> {
        let Some(def) = self.sfx.get(name) else {
            return Err(format!("unknown sfx: {name}"));
        };
        let volume = def.volume * self.sfx_volume * self.master_volume;
        self.push_event(AudioEventLog {
            frame,
            name: name.to_string(),
            volume,
            source_event,
        });
        Ok(())
    }

    pub fn set_volume(&mut self, channel: &str, value: f32) -> Result<(), String> {
        let v = value.clamp(0.0, 2.0);
        match channel {
            "master" => self.master_volume = v,
            "sfx" => self.sfx_volume = v,
            _ => return Err(format!("unknown volume channel: {channel}")),
        }
        Ok(())
    }

    pub fn played(&self, name: &str) -> usize {
        self.recent_events.iter().filter(|e| e.name == name).count()
    }

    fn push_event(&mut self, event: AudioEventLog) {
        self.recent_events.push(event);
        if self.recent_events.len() > MAX_AUDIO_EVENTS {
            let excess = self.recent_events.len() - MAX_AUDIO_EVENTS;
            self.recent_events.drain(0..excess);
        }
    }
}

#[derive(Resource, Default)]
struct AudioEventCursor(EventCursor);

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AudioManager::default())
            .insert_resource(AudioEventCursor::default())
            .add_systems(Startup, load_clips_from_config)
            .add_systems(Update, auto_audio_from_events);
    }
}

fn load_clips_from_config(config: Option<Res<GameConfig>>, mut audio: ResMut<AudioManager>) {
    if let Some(config) = config {
        for (name, def) in &config.sfx {
            audio.sfx.insert(name.clone(), def.clone());
        }
    }
}

fn auto_audio_from_events(
    mut audio: ResMut<AudioManager>,
    bus: Res<GameEventBus>,
    mut cursor: ResMut<AudioEventCursor>,
) {
    for ev in bus.drain_new(&mut cursor.0) {
        match ev.name.as_str() {
            "audio_play_sfx" => {
                let name = ev
                    .data
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|v| !v.is_empty());
                if let Some(name) = name {
                    let _ = audio.play_sfx(name, ev.frame, None);
                }
            }
            "audio_set_volume" => {
                let channel = ev.data.get("channel").and_then(|v| v.as_str());
                let value = ev.data.get("value").and_then(|v| v.as_f64());
                if let (Some(channel), Some(value)) = (channel, value) {
                    let _ = audio.set_volume(channel, value as f32);
                }
            }
            other => {
                if let Some(mapped) = audio.triggers.get(other).cloned() {
                    let _ = audio.play_sfx(&mapped, ev.frame, Some(other.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(name: &str) -> AudioManager {
        let mut audio = AudioManager::default();
        audio.sfx.insert(
            name.to_string(),
            SfxDefinition {
                path: format!("audio/{name}.ogg"),
                volume: 0.5,
                pitch_variance: 0.0,
            },
        );
        audio
    }

    #[test]
    fn play_sfx_records_scaled_volume() {
        let mut audio = manager_with("gnome_died");
        audio.master_volume = 0.8;
        audio.sfx_volume = 0.5;

        audio
            .play_sfx("gnome_died", 10, Some("trap_touched".to_string()))
            .expect("known sfx should play");

        assert_eq!(audio.recent_events.len(), 1);
        let ev = &audio.recent_events[0];
        assert_eq!(ev.name, "gnome_died");
        assert_eq!(ev.frame, 10);
        assert!((ev.volume - 0.2).abs() < 1e-6);
    }

    #[test]
    fn unknown_clip_is_an_error() {
        let mut audio = AudioManager::default();
        let err = audio
            .play_sfx("missing", 0, None)
            .expect_err("unknown clip must not play");
        assert!(err.contains("unknown sfx"));
        assert!(audio.recent_events.is_empty());
    }

    #[test]
    fn trigger_map_routes_bus_events_to_clips() {
        let mut app = App::new();
        app.insert_resource(GameEventBus::default())
            .add_plugins(AudioPlugin);
        {
            let mut audio = app.world_mut().resource_mut::<AudioManager>();
            audio.sfx.insert(
                "chime".to_string(),
                SfxDefinition {
                    path: "audio/chime.ogg".to_string(),
                    volume: 1.0,
                    pitch_variance: 0.0,
                },
            );
            audio
                .triggers
                .insert("treasure_collected".to_string(), "chime".to_string());
        }
        {
            let mut bus = app.world_mut().resource_mut::<GameEventBus>();
            bus.frame = 1;
            bus.emit("treasure_collected", serde_json::json!({}), None);
        }

        app.update();
        let audio = app.world().resource::<AudioManager>();
        assert_eq!(audio.played("chime"), 1);
        assert_eq!(
            audio.recent_events[0].source_event.as_deref(),
            Some("treasure_collected")
        );
    }

    #[test]
    fn invalid_channel_rejected() {
        let mut audio = AudioManager::default();
        let err = audio
            .set_volume("music", 1.0)
            .expect_err("unknown channel should fail");
        assert!(err.contains("unknown volume channel"));
    }
}
