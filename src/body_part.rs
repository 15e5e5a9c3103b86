use bevy::prelude::*;

use crate::components::{BoxCollider, Joint, RigidBody, Tags};
use crate::events::GameEventBus;
use crate::sprite_swap::SpriteState;

/// Visual variant a body part ends up with after damage.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DamageVisual {
    #[default]
    None,
    Cut,
    Burned,
}

/// A detachable piece of the gnome. While attached it rides the character's
/// hierarchy; once detached it falls on its own and is stripped of physics
/// after settling so it can't block the treasure.
#[derive(Component, Clone)]
pub struct BodyPart {
    pub detached: bool,
    pub damage_visual: DamageVisual,
    pub cut_sprite: String,
    pub burned_sprite: String,
    /// Where the blood fountain sits, relative to the part.
    pub fountain_offset: Vec2,
}

impl BodyPart {
    pub fn new(cut_sprite: impl Into<String>, burned_sprite: impl Into<String>) -> Self {
        Self {
            detached: false,
            damage_visual: DamageVisual::None,
            cut_sprite: cut_sprite.into(),
            burned_sprite: burned_sprite.into(),
            fountain_offset: Vec2::ZERO,
        }
    }

    pub fn with_fountain_offset(mut self, offset: Vec2) -> Self {
        self.fountain_offset = offset;
        self
    }

    /// Swap this part's sprite to the damaged variant for the given visual.
    pub fn apply_damage_visual(&mut self, state: &mut SpriteState, visual: DamageVisual) {
        let sprite = match visual {
            DamageVisual::Cut => &self.cut_sprite,
            DamageVisual::Burned => &self.burned_sprite,
            DamageVisual::None => return,
        };
        if !sprite.is_empty() {
            state.current = sprite.clone();
        }
        self.damage_visual = visual;
    }
}

/// Separate a part from the character: reparent to the scene root, stop
/// counting as "player", and flag it for physics cleanup once it settles.
/// Idempotent; a second call does nothing.
pub fn detach(commands: &mut Commands, entity: Entity, part: &mut BodyPart, tags: &mut Tags) {
    if part.detached {
        return;
    }
    part.detached = true;
    tags.clear();
    commands.entity(entity).remove_parent();
}

/// Remove joint, rigid-body and collider bindings from an entity and all of
/// its descendants.
pub fn strip_physics(commands: &mut Commands, root: Entity, children: &Query<&Children>) {
    commands
        .entity(root)
        .remove::<(Joint, RigidBody, BoxCollider)>();
    for descendant in children.iter_descendants(root) {
        commands
            .entity(descendant)
            .remove::<(Joint, RigidBody, BoxCollider)>();
    }
}

pub struct BodyPartPlugin;

impl Plugin for BodyPartPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, cleanup_settled_parts);
    }
}

/// Second phase of detachment: the part keeps its physics until the body
/// reports rest, so it falls naturally and then locks in place. Removing
/// `BodyPart` together with the bindings makes the cleanup fire exactly
/// once even if the settled signal repeats.
fn cleanup_settled_parts(
    mut commands: Commands,
    mut bus: ResMut<GameEventBus>,
    parts: Query<(Entity, &BodyPart, &RigidBody)>,
    children: Query<&Children>,
) {
    for (entity, part, body) in parts.iter() {
        if !part.detached || !body.is_sleeping() {
            continue;
        }
        strip_physics(&mut commands, entity, &children);
        commands.entity(entity).remove::<BodyPart>();
        bus.emit(
            "part_settled",
            serde_json::json!({}),
            Some(entity.to_bits()),
        );
    }
}
