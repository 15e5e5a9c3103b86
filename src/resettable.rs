use bevy::prelude::*;

use crate::events::{EventCursor, GameEventBus};
use crate::sprite_swap::{SpriteState, SpriteSwapper};
use crate::trigger::TriggerZone;

/// What to do to an entity when the game resets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResetAction {
    /// Put the pre-swap sprite back (e.g. the treasure reappears).
    RestoreSprite,
    /// Re-arm a trigger zone that disabled itself.
    ReactivateTrigger,
}

/// Explicit registration for the reset fan-out: the flow controller emits
/// one `game_reset`, and every entity carrying this component applies its
/// configured actions.
#[derive(Component, Clone)]
pub struct Resettable {
    pub actions: Vec<ResetAction>,
}

impl Resettable {
    pub fn new(actions: Vec<ResetAction>) -> Self {
        Self { actions }
    }
}

#[derive(Resource, Default)]
struct ResetCursor(EventCursor);

pub struct ResettablePlugin;

impl Plugin for ResettablePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ResetCursor::default())
            .add_systems(Update, apply_resets);
    }
}

fn apply_resets(
    bus: Res<GameEventBus>,
    mut cursor: ResMut<ResetCursor>,
    mut resettables: Query<(
        &Resettable,
        Option<&mut SpriteSwapper>,
        Option<&mut SpriteState>,
        Option<&mut TriggerZone>,
    )>,
) {
    let resets = bus
        .drain_new(&mut cursor.0)
        .into_iter()
        .filter(|ev| ev.name == "game_reset")
        .count();
    if resets == 0 {
        return;
    }

    for (resettable, swapper, sprite, zone) in resettables.iter_mut() {
        let mut sprite = sprite;
        let mut zone = zone;
        for action in &resettable.actions {
            match action {
                ResetAction::RestoreSprite => {
                    if let (Some(swapper), Some(sprite)) = (swapper.as_ref(), sprite.as_mut()) {
                        swapper.restore(sprite);
                    }
                }
                ResetAction::ReactivateTrigger => {
                    if let Some(zone) = zone.as_mut() {
                        zone.enabled = true;
                    }
                }
            }
        }
    }
}
