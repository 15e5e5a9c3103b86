use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 256;

/// A gameplay event on the shared bus. Consumers poll with an
/// [`EventCursor`] instead of registering callbacks, which keeps the wiring
/// explicit and inspectable.
#[derive(Serialize, Clone)]
pub struct GameEvent {
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
    pub source_entity: Option<u64>,
}

/// Per-consumer read position into the bus. Each consumer keeps its own so
/// a slow consumer never blocks a fast one.
#[derive(Default, Clone, Copy)]
pub struct EventCursor {
    last_frame: u64,
    processed_in_frame: usize,
}

#[derive(Resource, Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(
        &mut self,
        name: impl Into<String>,
        data: serde_json::Value,
        source_entity: Option<u64>,
    ) {
        self.recent.push_back(GameEvent {
            name: name.into(),
            data,
            frame: self.frame,
            source_entity,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "event bus dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    /// Returns every event the cursor has not seen yet and advances it.
    /// Events share a frame stamp, so the cursor tracks both the frame and
    /// how many events it already consumed within that frame.
    pub fn drain_new(&self, cursor: &mut EventCursor) -> Vec<GameEvent> {
        let mut out = Vec::new();
        let mut count_in_frame = 0usize;
        for ev in self.recent.iter() {
            if ev.frame < cursor.last_frame {
                continue;
            }
            if ev.frame == cursor.last_frame {
                count_in_frame = count_in_frame.saturating_add(1);
                if count_in_frame <= cursor.processed_in_frame {
                    continue;
                }
            } else {
                count_in_frame = 1;
            }
            cursor.last_frame = ev.frame;
            cursor.processed_in_frame = count_in_frame;
            out.push(ev.clone());
        }
        out
    }
}

pub struct GameEventsPlugin;

impl Plugin for GameEventsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameEventBus::default())
            .add_systems(First, tick_event_frame);
    }
}

fn tick_event_frame(mut bus: ResMut<GameEventBus>) {
    bus.frame = bus.frame.saturating_add(1);
}
