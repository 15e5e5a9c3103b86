use std::collections::HashSet;

use bevy::prelude::*;

use crate::audio::AudioManager;
use crate::components::{BoxCollider, GamePosition, Tags};
use crate::events::GameEventBus;
use crate::game_flow;
use crate::gnome::DamageKind;
use crate::sprite_swap::{SpriteState, SpriteSwapper};

/// Typed handler a zone carries from construction, in place of editor-bound
/// event wiring.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriggerAction {
    Damage(DamageKind),
    CollectTreasure,
    ReachExit,
}

impl TriggerAction {
    fn event_name(self) -> &'static str {
        match self {
            TriggerAction::Damage(_) => "trap_touched",
            TriggerAction::CollectTreasure => "treasure_collected",
            TriggerAction::ReachExit => "exit_reached",
        }
    }

    fn payload(self) -> serde_json::Value {
        match self {
            TriggerAction::Damage(kind) => serde_json::json!({ "kind": kind.as_str() }),
            _ => serde_json::json!({}),
        }
    }
}

/// Notify-on-tagged-contact relay, reused for traps, the treasure and the
/// exit. Configuration is fixed at construction; `contacts` only tracks
/// which bodies are currently inside so the signal fires on entry, not
/// every tick of an overlap.
#[derive(Component)]
pub struct TriggerZone {
    pub required_tag: String,
    pub action: TriggerAction,
    pub sound: Option<String>,
    pub play_audio_on_touch: bool,
    pub swap_sprite_on_touch: bool,
    pub enabled: bool,
    contacts: HashSet<Entity>,
}

impl TriggerZone {
    pub fn new(required_tag: impl Into<String>, action: TriggerAction) -> Self {
        Self {
            required_tag: required_tag.into(),
            action,
            sound: None,
            play_audio_on_touch: true,
            swap_sprite_on_touch: false,
            enabled: true,
            contacts: HashSet::new(),
        }
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_sprite_swap(mut self) -> Self {
        self.swap_sprite_on_touch = true;
        self
    }
}

fn overlap(ax: f32, ay: f32, aw: f32, ah: f32, bx: f32, by: f32, bw: f32, bh: f32) -> bool {
    (ax - bx).abs() * 2.0 < aw + bw && (ay - by).abs() * 2.0 < ah + bh
}

pub struct TriggerPlugin;

impl Plugin for TriggerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            trigger_zone_system.run_if(game_flow::gameplay_active),
        );
    }
}

fn trigger_zone_system(
    mut bus: ResMut<GameEventBus>,
    mut audio: ResMut<AudioManager>,
    mut zones: Query<(
        Entity,
        &GamePosition,
        &BoxCollider,
        &mut TriggerZone,
        Option<&mut SpriteSwapper>,
        Option<&mut SpriteState>,
    )>,
    actors: Query<(Entity, &GamePosition, Option<&BoxCollider>, &Tags), Without<TriggerZone>>,
) {
    for (zone_entity, zone_pos, zone_col, mut zone, swapper, sprite) in zones.iter_mut() {
        if !zone.enabled {
            zone.contacts.clear();
            continue;
        }

        let mut inside = HashSet::new();
        let mut entered = false;
        for (actor, actor_pos, actor_col, tags) in actors.iter() {
            if !tags.contains(&zone.required_tag) {
                continue;
            }
            let (aw, ah) = actor_col.map(|c| (c.width, c.height)).unwrap_or((4.0, 4.0));
            if !overlap(
                zone_pos.x,
                zone_pos.y,
                zone_col.width,
                zone_col.height,
                actor_pos.x,
                actor_pos.y,
                aw,
                ah,
            ) {
                continue;
            }
            if !zone.contacts.contains(&actor) {
                entered = true;
            }
            inside.insert(actor);
        }
        zone.contacts = inside;
        if !entered {
            continue;
        }

        if zone.play_audio_on_touch {
            if let Some(sound) = zone.sound.clone() {
                let _ = audio.play_sfx(&sound, bus.frame, Some(zone.action.event_name().into()));
            }
        }
        if zone.swap_sprite_on_touch {
            if let (Some(mut swapper), Some(mut sprite)) = (swapper, sprite) {
                swapper.swap(&mut sprite);
            }
        }
        if zone.action == TriggerAction::CollectTreasure {
            // One grab per reset; the pedestal's resettable re-arms it.
            zone.enabled = false;
        }
        bus.emit(
            zone.action.event_name(),
            zone.action.payload(),
            Some(zone_entity.to_bits()),
        );
    }
}
