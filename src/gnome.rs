use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand::Rng;

use crate::body_part::{self, BodyPart, DamageVisual};
use crate::components::{GameConfig, GamePosition, GameRng, Joint, Tags};
use crate::particles::{self, PRESET_BLOOD_FOUNTAIN};
use crate::scheduler::{self, ScheduledAction};
use crate::sprite_swap::SpriteState;

/// What kind of trap did the damage. Drives both the sprite variant and
/// the particle effect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DamageKind {
    Cut,
    Burned,
}

impl DamageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DamageKind::Cut => "cut",
            DamageKind::Burned => "burned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cut" => Some(DamageKind::Cut),
            "burned" => Some(DamageKind::Burned),
            _ => None,
        }
    }

    fn visual(self) -> DamageVisual {
        match self {
            DamageKind::Cut => DamageVisual::Cut,
            DamageKind::Burned => DamageVisual::Burned,
        }
    }
}

/// The player character. Holds the explicit, ordered list of its body
/// parts; nothing walks the entity hierarchy looking for them.
#[derive(Component)]
pub struct Gnome {
    alive: bool,
    holding_treasure: bool,
    pub segments: Vec<Entity>,
    pub camera_target: Entity,
    pub holding_arm: Option<Entity>,
}

impl Gnome {
    pub fn new(camera_target: Entity) -> Self {
        Self {
            alive: true,
            holding_treasure: false,
            segments: Vec::new(),
            camera_target,
            holding_arm: None,
        }
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn holding_treasure(&self) -> bool {
        self.holding_treasure
    }

    /// A dead gnome keeps its hands to itself: the write is refused once
    /// `alive` has gone false. Returns whether the change applied.
    pub fn set_holding_treasure(&mut self, value: bool) -> bool {
        if !self.alive {
            return false;
        }
        self.holding_treasure = value;
        true
    }

    /// Death drops the treasure before anything else happens.
    pub fn mark_dead(&mut self) {
        self.holding_treasure = false;
        self.alive = false;
    }
}

/// Sprite pair for the arm that shows whether the gnome is carrying.
#[derive(Component, Clone)]
pub struct HoldingArm {
    pub empty: String,
    pub treasure: String,
}

/// Outcome of the per-segment uniform draws for one damage pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentRoll {
    pub swap_visual: bool,
    pub detach: bool,
}

/// Roll the damage branching for every segment. Both branches are a coin
/// flip (uniform pick of 2): a cut always re-skins, a burn re-skins half
/// the time, and either kind detaches half the time.
pub fn roll_damage(rng: &mut impl Rng, kind: DamageKind, segment_count: usize) -> Vec<SegmentRoll> {
    (0..segment_count)
        .map(|_| {
            let swap_visual = match kind {
                DamageKind::Cut => true,
                DamageKind::Burned => rng.gen_range(0..2) == 0,
            };
            let detach = rng.gen_range(0..2) == 0;
            SegmentRoll {
                swap_visual,
                detach,
            }
        })
        .collect()
}

/// Queries the dismember pass needs. The gnome root and its parts carry
/// disjoint component sets, so the two mutable `Tags` borrows cannot alias.
#[derive(SystemParam)]
pub struct GnomeAccess<'w, 's> {
    pub gnomes: Query<
        'w,
        's,
        (&'static mut Gnome, &'static GamePosition, &'static mut Tags),
        Without<BodyPart>,
    >,
    pub parts: Query<
        'w,
        's,
        (
            &'static mut BodyPart,
            &'static mut SpriteState,
            &'static mut Tags,
            &'static GamePosition,
        ),
        With<BodyPart>,
    >,
    pub children: Query<'w, 's, &'static Children>,
    pub positions: Query<'w, 's, &'static GamePosition>,
}

/// The lethal half of taking damage, applied synchronously in one pass:
/// re-skin and randomly detach every segment, fountain blood on cut
/// detachments, then schedule corpse removal and the ghost.
pub fn dismember(
    commands: &mut Commands,
    rng: &mut GameRng,
    config: &GameConfig,
    headless: bool,
    access: &mut GnomeAccess,
    root: Entity,
    kind: DamageKind,
) {
    let Ok((mut gnome, root_pos, mut root_tags)) = access.gnomes.get_mut(root) else {
        return;
    };
    gnome.mark_dead();
    root_tags.clear();
    let segments = gnome.segments.clone();
    let camera_target = gnome.camera_target;
    let root_pos = *root_pos;

    let rolls = roll_damage(&mut rng.0, kind, segments.len());

    for (&segment, roll) in segments.iter().zip(rolls.iter()) {
        let Ok((mut part, mut sprite, mut tags, pos)) = access.parts.get_mut(segment) else {
            continue;
        };
        if roll.swap_visual {
            part.apply_damage_visual(&mut sprite, kind.visual());
        }
        // Removed from play either way: stop counting as "player".
        tags.clear();

        if !roll.detach {
            continue;
        }
        let fountain = Vec2::new(pos.x, pos.y) + part.fountain_offset;
        body_part::detach(commands, segment, &mut part, &mut tags);
        commands.entity(segment).remove::<Joint>();
        for descendant in access.children.iter_descendants(segment) {
            commands.entity(descendant).remove::<Joint>();
        }
        if kind == DamageKind::Cut {
            // Anchor the fountain to the camera target so it outlives the
            // severed part.
            particles::spawn_burst(
                commands,
                PRESET_BLOOD_FOUNTAIN,
                fountain.x,
                fountain.y,
                Some(camera_target),
                headless,
            );
        }
    }

    scheduler::schedule(
        commands,
        config.delay_before_removing,
        Some(root),
        ScheduledAction::DespawnRecursive(root),
    );
    if config.ghost_enabled {
        scheduler::schedule(
            commands,
            config.delay_before_releasing_ghost,
            Some(root),
            ScheduledAction::ReleaseGhost {
                x: root_pos.x,
                y: root_pos.y,
            },
        );
    }
}

pub struct GnomePlugin;

impl Plugin for GnomePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, sync_holding_arm);
    }
}

/// Keep the holding arm's sprite in step with the treasure flag.
fn sync_holding_arm(
    gnomes: Query<&Gnome, Changed<Gnome>>,
    mut arms: Query<(&HoldingArm, &mut SpriteState)>,
) {
    for gnome in gnomes.iter() {
        let Some(arm) = gnome.holding_arm else {
            continue;
        };
        let Ok((sprites, mut state)) = arms.get_mut(arm) else {
            continue;
        };
        state.current = if gnome.holding_treasure() {
            sprites.treasure.clone()
        } else {
            sprites.empty.clone()
        };
    }
}
