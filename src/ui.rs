use std::collections::HashMap;

use bevy::prelude::*;

/// Buttons for up/down and the menu toggle live here during play.
pub const PANEL_GAMEPLAY: &str = "gameplay";
/// Restart / resume menu shown while paused.
pub const PANEL_MAIN_MENU: &str = "main_menu";
/// The "you won!" screen.
pub const PANEL_GAME_OVER: &str = "game_over";

/// Named-panel visibility service. Gameplay flips booleans here; windowed
/// rendering re-syncs whenever `generation` moves.
#[derive(Resource)]
pub struct UiManager {
    panels: HashMap<String, bool>,
    pub generation: u64,
}

impl Default for UiManager {
    fn default() -> Self {
        let mut panels = HashMap::new();
        panels.insert(PANEL_GAMEPLAY.to_string(), true);
        panels.insert(PANEL_MAIN_MENU.to_string(), false);
        panels.insert(PANEL_GAME_OVER.to_string(), false);
        Self {
            panels,
            generation: 0,
        }
    }
}

impl UiManager {
    pub fn show(&mut self, name: &str) {
        self.set_visible(name, true);
    }

    pub fn hide(&mut self, name: &str) {
        self.set_visible(name, false);
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) {
        let entry = self.panels.entry(name.to_string()).or_insert(!visible);
        if *entry != visible {
            *entry = visible;
            self.generation += 1;
        }
    }

    /// Unknown panels read as hidden.
    pub fn is_visible(&self, name: &str) -> bool {
        self.panels.get(name).copied().unwrap_or(false)
    }

    pub fn visible_panels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .panels
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(UiManager::default());
    }
}
