use bevy::prelude::*;

use crate::components::{GamePosition, HeadlessMode};

/// Logical sprite id for an entity. Gameplay only ever deals in these ids;
/// windowed mode maps them to placeholder visuals, headless mode ignores
/// them entirely.
#[derive(Component, Clone, Debug)]
pub struct SpriteState {
    pub current: String,
}

impl SpriteState {
    pub fn new(sprite: impl Into<String>) -> Self {
        Self {
            current: sprite.into(),
        }
    }
}

/// Swaps one sprite for another and remembers the original, e.g. the
/// treasure pedestal switching between "present" and "taken".
#[derive(Component, Clone, Default)]
pub struct SpriteSwapper {
    pub sprite_to_use: String,
    original: Option<String>,
}

impl SpriteSwapper {
    pub fn new(sprite_to_use: impl Into<String>) -> Self {
        Self {
            sprite_to_use: sprite_to_use.into(),
            original: None,
        }
    }

    pub fn swap(&mut self, state: &mut SpriteState) {
        if state.current != self.sprite_to_use {
            self.original = Some(state.current.clone());
            state.current = self.sprite_to_use.clone();
        }
    }

    pub fn restore(&self, state: &mut SpriteState) {
        if let Some(original) = &self.original {
            state.current = original.clone();
        }
    }
}

pub struct SpriteSwapPlugin;

impl Plugin for SpriteSwapPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (sync_sprite_visuals, sync_transforms).run_if(windowed));
    }
}

fn windowed(headless: Option<Res<HeadlessMode>>) -> bool {
    headless.map(|h| !h.0).unwrap_or(false)
}

/// Stable placeholder tint per sprite id until real art lands.
fn placeholder_color(sprite: &str) -> Color {
    let mut hash: u32 = 2166136261;
    for b in sprite.bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    let r = 0.25 + ((hash & 0xff) as f32 / 255.0) * 0.7;
    let g = 0.25 + (((hash >> 8) & 0xff) as f32 / 255.0) * 0.7;
    let b = 0.25 + (((hash >> 16) & 0xff) as f32 / 255.0) * 0.7;
    Color::srgb(r, g, b)
}

fn sync_sprite_visuals(mut query: Query<(&SpriteState, &mut Sprite), Changed<SpriteState>>) {
    for (state, mut sprite) in query.iter_mut() {
        sprite.color = placeholder_color(&state.current);
    }
}

fn sync_transforms(mut query: Query<(&GamePosition, &mut Transform)>) {
    for (pos, mut transform) in query.iter_mut() {
        transform.translation.x = pos.x;
        transform.translation.y = pos.y;
    }
}
