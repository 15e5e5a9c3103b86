use bevy::prelude::*;

use crate::body_part::BodyPart;
use crate::components::{
    BoxCollider, GameConfig, GamePosition, HeadlessMode, Joint, RigidBody, Tags, Velocity,
    ZoneDef, ZoneKind,
};
use crate::events::{EventCursor, GameEventBus};
use crate::gnome::{DamageKind, Gnome, HoldingArm};
use crate::particles::{self, PRESET_GHOST_TRAIL};
use crate::resettable::{ResetAction, Resettable};
use crate::scheduler::{self, ScheduledAction};
use crate::sprite_swap::{SpriteState, SpriteSwapper};
use crate::trigger::{TriggerAction, TriggerZone};

const GHOST_RISE_SPEED: f32 = 40.0;

pub struct SpawnedGnome {
    pub root: Entity,
    pub camera_target: Entity,
}

/// Build a gnome at the given spot from the configured template: a root
/// body plus an explicit ordered list of jointed, tagged body parts, with
/// the camera anchor and holding arm as plain children.
pub fn spawn_gnome(
    commands: &mut Commands,
    config: &GameConfig,
    headless: bool,
    x: f32,
    y: f32,
) -> SpawnedGnome {
    let template = &config.gnome;

    let root = commands
        .spawn((
            GamePosition { x, y },
            Velocity::default(),
            RigidBody::default(),
            BoxCollider {
                width: 12.0,
                height: 14.0,
            },
            Tags::player(),
            SpriteState::new(template.body_sprite.clone()),
        ))
        .id();
    if !headless {
        commands.entity(root).insert((
            Sprite::from_color(Color::srgb(0.2, 0.4, 0.9), Vec2::new(12.0, 14.0)),
            Transform::from_xyz(x, y, 10.0),
        ));
    }

    let camera_target = commands
        .spawn((GamePosition { x, y }, Joint::new(root, Vec2::new(0.0, 8.0))))
        .set_parent(root)
        .id();

    let holding_arm = commands
        .spawn((
            GamePosition { x, y },
            Joint::new(root, Vec2::new(5.0, 2.0)),
            SpriteState::new(template.arm_holding_empty.clone()),
            HoldingArm {
                empty: template.arm_holding_empty.clone(),
                treasure: template.arm_holding_treasure.clone(),
            },
        ))
        .set_parent(root)
        .id();

    let mut gnome = Gnome::new(camera_target);
    gnome.holding_arm = Some(holding_arm);

    for def in &template.segments {
        let sx = x + def.offset[0];
        let sy = y + def.offset[1];
        let segment = commands
            .spawn((
                BodyPart::new(def.cut_sprite.clone(), def.burned_sprite.clone())
                    .with_fountain_offset(Vec2::from_array(def.fountain_offset)),
                GamePosition { x: sx, y: sy },
                Velocity::default(),
                RigidBody::default(),
                BoxCollider {
                    width: def.size[0],
                    height: def.size[1],
                },
                Joint::new(root, Vec2::from_array(def.offset)),
                Tags::player(),
                SpriteState::new(def.sprite.clone()),
            ))
            .set_parent(root)
            .id();
        if !headless {
            commands.entity(segment).insert((
                Sprite::from_color(
                    Color::srgb(0.3, 0.5, 0.8),
                    Vec2::new(def.size[0], def.size[1]),
                ),
                Transform::from_xyz(sx, sy, 11.0),
            ));
        }
        gnome.segments.push(segment);
    }

    commands.entity(root).insert(gnome);

    SpawnedGnome {
        root,
        camera_target,
    }
}

fn zone_components(def: &ZoneDef) -> TriggerZone {
    let action = match def.kind {
        ZoneKind::KnifeTrap => TriggerAction::Damage(DamageKind::Cut),
        ZoneKind::FireTrap => TriggerAction::Damage(DamageKind::Burned),
        ZoneKind::Treasure => TriggerAction::CollectTreasure,
        ZoneKind::Exit => TriggerAction::ReachExit,
    };
    let mut zone = TriggerZone::new(crate::components::PLAYER_TAG, action);
    if let Some(sound) = &def.sound {
        zone = zone.with_sound(sound.clone());
    }
    if def.kind == ZoneKind::Treasure {
        zone = zone.with_sprite_swap();
    }
    zone
}

/// Place the level's trigger zones from config. The treasure pedestal gets
/// a sprite swapper plus the reset actions that restore it.
fn spawn_level(mut commands: Commands, config: Res<GameConfig>, headless: Res<HeadlessMode>) {
    for def in &config.zones {
        let zone = commands
            .spawn((
                zone_components(def),
                GamePosition {
                    x: def.position[0],
                    y: def.position[1],
                },
                BoxCollider {
                    width: def.size[0],
                    height: def.size[1],
                },
            ))
            .id();
        if let Some(sprite) = &def.sprite {
            commands.entity(zone).insert(SpriteState::new(sprite.clone()));
        }
        if def.kind == ZoneKind::Treasure {
            commands.entity(zone).insert((
                SpriteSwapper::new("treasure_taken"),
                Resettable::new(vec![
                    ResetAction::RestoreSprite,
                    ResetAction::ReactivateTrigger,
                ]),
            ));
        }
        if !headless.0 {
            commands.entity(zone).insert((
                Sprite::from_color(
                    Color::srgb(0.6, 0.6, 0.3),
                    Vec2::new(def.size[0], def.size[1]),
                ),
                Transform::from_xyz(def.position[0], def.position[1], 5.0),
            ));
        }
    }
}

#[derive(Resource, Default)]
struct GhostCursor(EventCursor);

/// The gnome's spirit drifts up out of the corpse a moment after death,
/// then fades on a timer.
fn release_ghosts(
    mut commands: Commands,
    mut bus: ResMut<GameEventBus>,
    mut cursor: ResMut<GhostCursor>,
    config: Res<GameConfig>,
    headless: Res<HeadlessMode>,
) {
    let mut due = Vec::new();
    for ev in bus.drain_new(&mut cursor.0) {
        if ev.name != "ghost_release_due" {
            continue;
        }
        let x = ev.data.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
        let y = ev.data.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
        due.push((x, y));
    }

    for (x, y) in due {
        let ghost = commands
            .spawn((
                GamePosition { x, y },
                Velocity {
                    x: 0.0,
                    y: GHOST_RISE_SPEED,
                },
                RigidBody {
                    gravity_scale: 0.0,
                    ..Default::default()
                },
                SpriteState::new("ghost"),
            ))
            .id();
        if !headless.0 {
            commands.entity(ghost).insert((
                Sprite::from_color(Color::srgba(0.9, 0.9, 1.0, 0.7), Vec2::new(10.0, 12.0)),
                Transform::from_xyz(x, y, 50.0),
            ));
        }
        particles::spawn_burst(&mut commands, PRESET_GHOST_TRAIL, x, y, Some(ghost), headless.0);
        scheduler::schedule(
            &mut commands,
            config.ghost_lifetime,
            Some(ghost),
            ScheduledAction::DespawnRecursive(ghost),
        );
        bus.emit(
            "ghost_released",
            serde_json::json!({ "x": x, "y": y }),
            Some(ghost.to_bits()),
        );
    }
}

pub struct SpawnPlugin;

impl Plugin for SpawnPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GhostCursor::default())
            .add_systems(Startup, spawn_level)
            .add_systems(Update, release_ghosts);
    }
}
