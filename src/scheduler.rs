use bevy::prelude::*;

use crate::components::TimeFlow;
use crate::events::GameEventBus;

/// What a timer does when it fires. Typed rather than a boxed closure so
/// pending work stays inspectable and serializable-adjacent.
#[derive(Clone, Debug, PartialEq)]
pub enum ScheduledAction {
    /// Remove an entity and everything under it.
    DespawnRecursive(Entity),
    /// Let the gnome's ghost out at the given spot.
    ReleaseGhost { x: f32, y: f32 },
    /// Bring the game back to a fresh state.
    ResetGame,
    /// Fire-and-forget one-shot sound.
    PlaySfx(String),
}

/// A pending continuation. Ticks down with time-flow-scaled delta; if the
/// owning entity disappears first the timer is silently cancelled, which
/// ties continuation lifetime to the owner the way engine coroutines die
/// with their object.
#[derive(Component)]
pub struct DelayedAction {
    pub remaining: f32,
    pub owner: Option<Entity>,
    pub action: ScheduledAction,
}

/// Handle for explicit cancellation of a scheduled action.
pub struct ScheduleHandle(Entity);

impl ScheduleHandle {
    pub fn entity(&self) -> Entity {
        self.0
    }

    pub fn cancel(self, commands: &mut Commands) {
        if let Some(mut timer) = commands.get_entity(self.0) {
            timer.despawn();
        }
    }
}

pub fn schedule(
    commands: &mut Commands,
    delay: f32,
    owner: Option<Entity>,
    action: ScheduledAction,
) -> ScheduleHandle {
    ScheduleHandle(
        commands
            .spawn(DelayedAction {
                remaining: delay.max(0.0),
                owner,
                action,
            })
            .id(),
    )
}

pub struct SchedulerPlugin;

impl Plugin for SchedulerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, tick_delayed_actions);
    }
}

fn tick_delayed_actions(
    mut commands: Commands,
    time: Res<Time>,
    flow: Res<TimeFlow>,
    mut bus: ResMut<GameEventBus>,
    entities: Query<Entity>,
    mut timers: Query<(Entity, &mut DelayedAction)>,
) {
    let dt = time.delta_secs() * flow.scale;

    for (timer_entity, mut timer) in timers.iter_mut() {
        if let Some(owner) = timer.owner {
            if !entities.contains(owner) {
                commands.entity(timer_entity).despawn();
                continue;
            }
        }

        timer.remaining -= dt;
        if timer.remaining > 0.0 {
            continue;
        }

        match &timer.action {
            ScheduledAction::DespawnRecursive(target) => {
                if let Some(target) = commands.get_entity(*target) {
                    target.despawn_recursive();
                }
            }
            ScheduledAction::ReleaseGhost { x, y } => {
                bus.emit(
                    "ghost_release_due",
                    serde_json::json!({ "x": x, "y": y }),
                    None,
                );
            }
            ScheduledAction::ResetGame => {
                bus.emit("reset_due", serde_json::json!({}), None);
            }
            ScheduledAction::PlaySfx(name) => {
                bus.emit("audio_play_sfx", serde_json::json!({ "name": name }), None);
            }
        }
        commands.entity(timer_entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn scheduler_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>()
            .insert_resource(TimeFlow::default())
            .insert_resource(GameEventBus::default())
            .add_plugins(SchedulerPlugin);
        app
    }

    fn step(app: &mut App, seconds: f32) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(seconds));
        app.update();
    }

    fn emitted(app: &App, name: &str) -> usize {
        app.world()
            .resource::<GameEventBus>()
            .recent
            .iter()
            .filter(|ev| ev.name == name)
            .count()
    }

    #[test]
    fn action_fires_once_after_delay() {
        let mut app = scheduler_app();
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            schedule(&mut commands, 1.0, None, ScheduledAction::ResetGame);
            world.flush();
        }

        step(&mut app, 0.5);
        assert_eq!(emitted(&app, "reset_due"), 0);
        step(&mut app, 0.6);
        assert_eq!(emitted(&app, "reset_due"), 1);
        step(&mut app, 1.0);
        assert_eq!(emitted(&app, "reset_due"), 1);
    }

    #[test]
    fn owner_despawn_cancels_pending_action() {
        let mut app = scheduler_app();
        let owner = app.world_mut().spawn_empty().id();
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            schedule(
                &mut commands,
                0.5,
                Some(owner),
                ScheduledAction::ReleaseGhost { x: 0.0, y: 0.0 },
            );
            world.flush();
        }

        app.world_mut().despawn(owner);
        step(&mut app, 1.0);
        step(&mut app, 1.0);
        assert_eq!(emitted(&app, "ghost_release_due"), 0);
    }

    #[test]
    fn frozen_time_flow_holds_timers() {
        let mut app = scheduler_app();
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            schedule(&mut commands, 0.2, None, ScheduledAction::ResetGame);
            world.flush();
        }

        app.world_mut().resource_mut::<TimeFlow>().scale = 0.0;
        step(&mut app, 5.0);
        assert_eq!(emitted(&app, "reset_due"), 0);

        app.world_mut().resource_mut::<TimeFlow>().scale = 1.0;
        step(&mut app, 0.3);
        assert_eq!(emitted(&app, "reset_due"), 1);
    }

    #[test]
    fn handle_cancels_explicitly() {
        let mut app = scheduler_app();
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            let handle = schedule(&mut commands, 0.1, None, ScheduledAction::ResetGame);
            handle.cancel(&mut commands);
            world.flush();
        }

        step(&mut app, 1.0);
        assert_eq!(emitted(&app, "reset_due"), 0);
    }

    #[test]
    fn scheduled_sfx_lands_on_the_bus() {
        let mut app = scheduler_app();
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            schedule(
                &mut commands,
                0.1,
                None,
                ScheduledAction::PlaySfx("gnome_died".to_string()),
            );
            world.flush();
        }

        step(&mut app, 0.2);
        assert_eq!(emitted(&app, "audio_play_sfx"), 1);
    }

    #[test]
    fn despawn_target_removes_entity_tree() {
        let mut app = scheduler_app();
        let child = app.world_mut().spawn_empty().id();
        let root = app.world_mut().spawn_empty().id();
        app.world_mut().entity_mut(root).add_children(&[child]);
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            schedule(
                &mut commands,
                0.1,
                None,
                ScheduledAction::DespawnRecursive(root),
            );
            world.flush();
        }

        step(&mut app, 0.2);
        assert!(app.world().get_entity(root).is_err());
        assert!(app.world().get_entity(child).is_err());
    }
}
