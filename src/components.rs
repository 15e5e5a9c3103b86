use std::collections::HashSet;

use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Classification tag carried by the gnome and its body parts while they
/// count as "player" for trigger purposes. Cleared on death/detach.
pub const PLAYER_TAG: &str = "player";

/// World-space position, kept separate from render transforms so every
/// gameplay system runs headless.
#[derive(Component, Clone, Copy, Default, Debug)]
pub struct GamePosition {
    pub x: f32,
    pub y: f32,
}

/// Velocity in world units per second.
#[derive(Component, Clone, Copy, Default, Debug)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// Minimal dynamic-body stand-in: integrated by the physics module, which
/// also latches `sleeping` once the body has come to rest ("settled").
#[derive(Component, Clone, Debug)]
pub struct RigidBody {
    pub gravity_scale: f32,
    pub rest_ticks: u32,
    pub sleeping: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            gravity_scale: 1.0,
            rest_ticks: 0,
            sleeping: false,
        }
    }
}

impl RigidBody {
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }
}

/// AABB extent used for overlap tests.
#[derive(Component, Clone, Copy, Debug)]
pub struct BoxCollider {
    pub width: f32,
    pub height: f32,
}

/// Physical attachment to another body: the owner rides `connected` at a
/// fixed offset until the joint is broken. Stripped when a detached part
/// settles, and broken immediately on detach.
#[derive(Component, Clone, Copy)]
pub struct Joint {
    pub connected: Entity,
    pub offset: Vec2,
}

impl Joint {
    pub fn new(connected: Entity, offset: Vec2) -> Self {
        Self { connected, offset }
    }
}

/// Tag-based classification ("player" vs untagged).
#[derive(Component, Clone, Default, Debug)]
pub struct Tags(pub HashSet<String>);

impl Tags {
    pub fn player() -> Self {
        Self(HashSet::from([PLAYER_TAG.to_string()]))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Resource, Clone, Copy)]
pub struct HeadlessMode(pub bool);

/// Global time-flow scale. Pause and the win screen freeze the world by
/// setting this to zero; systems multiply their delta by it.
#[derive(Resource, Clone, Copy)]
pub struct TimeFlow {
    pub scale: f32,
}

impl Default for TimeFlow {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

/// The well the gnome descends into: a floor and two walls.
#[derive(Resource, Clone, Copy, Serialize, Deserialize)]
pub struct WellGeometry {
    pub floor_y: f32,
    pub left_x: f32,
    pub right_x: f32,
}

impl Default for WellGeometry {
    fn default() -> Self {
        Self {
            floor_y: 0.0,
            left_x: -96.0,
            right_x: 96.0,
        }
    }
}

/// Uniform draws for the damage branching. Seedable so tests can pin the
/// coin flips.
#[derive(Resource)]
pub struct GameRng(pub SmallRng);

impl GameRng {
    pub fn from_seed_or_entropy(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(SmallRng::seed_from_u64(seed)),
            None => Self(SmallRng::from_entropy()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_spawn_point() -> [f32; 2] {
    [0.0, 120.0]
}

fn default_delay_after_death() -> f32 {
    1.0
}

fn default_delay_before_removing() -> f32 {
    3.0
}

fn default_delay_before_releasing_ghost() -> f32 {
    0.25
}

fn default_ghost_lifetime() -> f32 {
    2.0
}

fn default_gnome_died_sound() -> String {
    "gnome_died".to_string()
}

fn default_game_won_sound() -> String {
    "game_won".to_string()
}

fn default_sprite(name: &str) -> String {
    name.to_string()
}

/// One detachable body part in the gnome template.
#[derive(Clone, Serialize, Deserialize)]
pub struct SegmentDef {
    pub name: String,
    pub sprite: String,
    pub cut_sprite: String,
    pub burned_sprite: String,
    pub offset: [f32; 2],
    pub size: [f32; 2],
    pub fountain_offset: [f32; 2],
}

impl SegmentDef {
    fn limb(name: &str, offset: [f32; 2], size: [f32; 2], fountain_offset: [f32; 2]) -> Self {
        Self {
            name: name.to_string(),
            sprite: name.to_string(),
            cut_sprite: format!("{name}_cut"),
            burned_sprite: format!("{name}_burned"),
            offset,
            size,
            fountain_offset,
        }
    }
}

/// Injected build recipe for a gnome, normally edited as data rather than
/// code. Mirrors what the art side would author in a prefab.
#[derive(Clone, Serialize, Deserialize)]
pub struct GnomeTemplate {
    #[serde(default = "GnomeTemplate::default_body_sprite")]
    pub body_sprite: String,
    #[serde(default = "GnomeTemplate::default_arm_empty")]
    pub arm_holding_empty: String,
    #[serde(default = "GnomeTemplate::default_arm_treasure")]
    pub arm_holding_treasure: String,
    #[serde(default = "GnomeTemplate::default_segments")]
    pub segments: Vec<SegmentDef>,
}

impl GnomeTemplate {
    fn default_body_sprite() -> String {
        default_sprite("gnome_body")
    }

    fn default_arm_empty() -> String {
        default_sprite("arm_holding_empty")
    }

    fn default_arm_treasure() -> String {
        default_sprite("arm_holding_treasure")
    }

    fn default_segments() -> Vec<SegmentDef> {
        vec![
            SegmentDef::limb("head", [0.0, 10.0], [8.0, 8.0], [0.0, -4.0]),
            SegmentDef::limb("left_arm", [-6.0, 4.0], [4.0, 10.0], [0.0, 5.0]),
            SegmentDef::limb("right_arm", [6.0, 4.0], [4.0, 10.0], [0.0, 5.0]),
            SegmentDef::limb("left_leg", [-3.0, -8.0], [4.0, 10.0], [0.0, 5.0]),
            SegmentDef::limb("right_leg", [3.0, -8.0], [4.0, 10.0], [0.0, 5.0]),
        ]
    }
}

impl Default for GnomeTemplate {
    fn default() -> Self {
        Self {
            body_sprite: Self::default_body_sprite(),
            arm_holding_empty: Self::default_arm_empty(),
            arm_holding_treasure: Self::default_arm_treasure(),
            segments: Self::default_segments(),
        }
    }
}

/// What a placed zone does when a tagged body enters it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    KnifeTrap,
    FireTrap,
    Treasure,
    Exit,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ZoneDef {
    pub name: String,
    pub kind: ZoneKind,
    pub position: [f32; 2],
    pub size: [f32; 2],
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub sprite: Option<String>,
}

fn default_zones() -> Vec<ZoneDef> {
    vec![
        ZoneDef {
            name: "knife_trap".to_string(),
            kind: ZoneKind::KnifeTrap,
            position: [-80.0, 60.0],
            size: [16.0, 8.0],
            sound: Some("knife_slice".to_string()),
            sprite: Some("knives".to_string()),
        },
        ZoneDef {
            name: "fire_trap".to_string(),
            kind: ZoneKind::FireTrap,
            position: [80.0, 30.0],
            size: [16.0, 8.0],
            sound: Some("fire_whoosh".to_string()),
            sprite: Some("flames".to_string()),
        },
        ZoneDef {
            name: "treasure".to_string(),
            kind: ZoneKind::Treasure,
            position: [0.0, 4.0],
            size: [12.0, 12.0],
            sound: Some("treasure_pickup".to_string()),
            sprite: Some("treasure_present".to_string()),
        },
        // Off to the side of the drop-in point so a fresh gnome doesn't
        // start inside it.
        ZoneDef {
            name: "exit".to_string(),
            kind: ZoneKind::Exit,
            position: [60.0, 124.0],
            size: [24.0, 12.0],
            sound: None,
            sprite: None,
        },
    ]
}

fn default_sfx() -> std::collections::HashMap<String, crate::audio::SfxDefinition> {
    let mut sfx = std::collections::HashMap::new();
    for (name, path) in [
        ("gnome_died", "audio/gnome_died.ogg"),
        ("game_won", "audio/game_won.ogg"),
        ("knife_slice", "audio/knife_slice.ogg"),
        ("fire_whoosh", "audio/fire_whoosh.ogg"),
        ("treasure_pickup", "audio/treasure_pickup.ogg"),
    ] {
        sfx.insert(
            name.to_string(),
            crate::audio::SfxDefinition {
                path: path.to_string(),
                volume: 1.0,
                pitch_variance: 0.0,
            },
        );
    }
    sfx
}

/// Top-level gameplay configuration, loaded from `gnome_well.json` when
/// present. Every field has a sensible default so the file is optional.
#[derive(Resource, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_spawn_point")]
    pub spawn_point: [f32; 2],
    #[serde(default = "default_delay_after_death")]
    pub delay_after_death: f32,
    #[serde(default = "default_delay_before_removing")]
    pub delay_before_removing: f32,
    #[serde(default = "default_delay_before_releasing_ghost")]
    pub delay_before_releasing_ghost: f32,
    #[serde(default = "default_true")]
    pub ghost_enabled: bool,
    #[serde(default = "default_ghost_lifetime")]
    pub ghost_lifetime: f32,
    #[serde(default = "default_gnome_died_sound")]
    pub gnome_died_sound: String,
    #[serde(default = "default_game_won_sound")]
    pub game_won_sound: String,
    #[serde(default)]
    pub invincible: bool,
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub well: WellGeometry,
    #[serde(default)]
    pub gnome: GnomeTemplate,
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneDef>,
    #[serde(default = "default_sfx")]
    pub sfx: std::collections::HashMap<String, crate::audio::SfxDefinition>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            spawn_point: default_spawn_point(),
            delay_after_death: default_delay_after_death(),
            delay_before_removing: default_delay_before_removing(),
            delay_before_releasing_ghost: default_delay_before_releasing_ghost(),
            ghost_enabled: true,
            ghost_lifetime: default_ghost_lifetime(),
            gnome_died_sound: default_gnome_died_sound(),
            game_won_sound: default_game_won_sound(),
            invincible: false,
            rng_seed: None,
            well: WellGeometry::default(),
            gnome: GnomeTemplate::default(),
            zones: default_zones(),
            sfx: default_sfx(),
        }
    }
}
