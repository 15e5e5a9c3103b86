use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::audio::AudioManager;
use crate::camera::CameraConfig;
use crate::components::{GameConfig, GameRng, HeadlessMode, TimeFlow};
use crate::events::{EventCursor, GameEventBus};
use crate::gnome::{self, DamageKind, GnomeAccess};
use crate::particles::{self, PRESET_DEATH_BURNED, PRESET_DEATH_CUT};
use crate::scheduler::{self, ScheduledAction};
use crate::spawn;
use crate::ui::{UiManager, PANEL_GAMEPLAY, PANEL_GAME_OVER, PANEL_MAIN_MENU};

#[derive(States, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum FlowState {
    #[default]
    Playing,
    Dying,
    GameOver,
    Paused,
}

/// The flow controller. An explicitly constructed resource handed to the
/// systems that need it; collaborators reach it through injection, never
/// through a global.
#[derive(Resource)]
pub struct GameFlow {
    pub state: FlowState,
    pub current_gnome: Option<Entity>,
    /// Damage still shows its effects, but stops being lethal.
    pub invincible: bool,
    prev_gameplay_panel: bool,
}

impl Default for GameFlow {
    fn default() -> Self {
        Self {
            state: FlowState::Playing,
            current_gnome: None,
            invincible: false,
            prev_gameplay_panel: true,
        }
    }
}

/// Run condition for systems that only make sense during active play.
pub fn gameplay_active(flow: Option<Res<GameFlow>>) -> bool {
    flow.map(|f| f.state == FlowState::Playing).unwrap_or(false)
}

/// Everything the flow operations mutate, bundled so each operation is a
/// plain function over explicit context.
#[derive(SystemParam)]
pub struct FlowCtx<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub flow: ResMut<'w, GameFlow>,
    pub ui: ResMut<'w, UiManager>,
    pub audio: ResMut<'w, AudioManager>,
    pub time_flow: ResMut<'w, TimeFlow>,
    pub camera: ResMut<'w, CameraConfig>,
    pub bus: ResMut<'w, GameEventBus>,
    pub rng: ResMut<'w, GameRng>,
    pub config: Res<'w, GameConfig>,
    pub headless: Res<'w, HeadlessMode>,
}

#[derive(Resource, Default)]
struct FlowCursor(EventCursor);

pub struct GameFlowPlugin;

impl Plugin for GameFlowPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameFlow::default())
            .insert_resource(FlowCursor::default())
            .init_state::<FlowState>()
            .add_systems(Startup, startup_reset)
            .add_systems(Update, (handle_flow_events, sync_flow_state).chain());
    }
}

fn startup_reset(mut ctx: FlowCtx, mut access: GnomeAccess) {
    ctx.flow.invincible = ctx.config.invincible;
    reset(&mut ctx, &mut access);
}

fn handle_flow_events(
    mut ctx: FlowCtx,
    mut access: GnomeAccess,
    mut cursor: ResMut<FlowCursor>,
) {
    let events = ctx.bus.drain_new(&mut cursor.0);
    for ev in events {
        match ev.name.as_str() {
            "trap_touched" => {
                let kind = ev
                    .data
                    .get("kind")
                    .and_then(|v| v.as_str())
                    .and_then(DamageKind::from_str);
                if let Some(kind) = kind {
                    on_damage(&mut ctx, &mut access, kind);
                }
            }
            "treasure_collected" => on_treasure_collected(&mut ctx, &mut access),
            "exit_reached" => on_exit_reached(&mut ctx, &mut access),
            "game_pause" => set_paused(&mut ctx, true),
            "game_resume" => set_paused(&mut ctx, false),
            "game_restart" => restart_game(&mut ctx, &mut access),
            "reset_due" => reset(&mut ctx, &mut access),
            _ => {}
        }
    }
}

/// Mirror the resource-held state into bevy's `State` so run conditions
/// and schedules can key off it.
fn sync_flow_state(
    flow: Res<GameFlow>,
    state: Res<State<FlowState>>,
    mut next: ResMut<NextState<FlowState>>,
) {
    if state.get() != &flow.state {
        next.set(flow.state);
    }
}

/// Back to a clean board: panels, resettables, a fresh gnome, time moving.
pub fn reset(ctx: &mut FlowCtx, access: &mut GnomeAccess) {
    ctx.ui.hide(PANEL_GAME_OVER);
    ctx.ui.hide(PANEL_MAIN_MENU);
    ctx.ui.show(PANEL_GAMEPLAY);
    ctx.bus.emit("game_reset", serde_json::json!({}), None);

    // Abandon whatever gnome is still around; it stops being the player
    // but is not destroyed here.
    if let Some(old) = ctx.flow.current_gnome.take() {
        let segments = if let Ok((mut old_gnome, _, mut tags)) = access.gnomes.get_mut(old) {
            old_gnome.set_holding_treasure(false);
            tags.clear();
            old_gnome.segments.clone()
        } else {
            Vec::new()
        };
        for segment in segments {
            if let Ok((_, _, mut tags, _)) = access.parts.get_mut(segment) {
                tags.clear();
            }
        }
    }

    let [x, y] = ctx.config.spawn_point;
    let spawned = spawn::spawn_gnome(&mut ctx.commands, &ctx.config, ctx.headless.0, x, y);
    ctx.flow.current_gnome = Some(spawned.root);
    ctx.camera.follow_target = Some(spawned.camera_target);
    ctx.time_flow.scale = 1.0;
    ctx.flow.state = FlowState::Playing;
    info!("game reset, new gnome spawned");
}

/// A trap got the gnome. Sound and gore always play; the lethal part is
/// skipped in invincible mode.
pub fn on_damage(ctx: &mut FlowCtx, access: &mut GnomeAccess, kind: DamageKind) {
    let Some(root) = ctx.flow.current_gnome else {
        return;
    };
    let frame = ctx.bus.frame;
    let _ = ctx
        .audio
        .play_sfx(&ctx.config.gnome_died_sound, frame, Some("trap_touched".into()));

    if let Ok((gnome, root_pos, _)) = access.gnomes.get(root) {
        let anchor = access
            .positions
            .get(gnome.camera_target)
            .copied()
            .unwrap_or(*root_pos);
        let preset = match kind {
            DamageKind::Cut => PRESET_DEATH_CUT,
            DamageKind::Burned => PRESET_DEATH_BURNED,
        };
        particles::spawn_burst(
            &mut ctx.commands,
            preset,
            anchor.x,
            anchor.y,
            None,
            ctx.headless.0,
        );
    }

    if ctx.flow.invincible {
        return;
    }

    gnome::dismember(
        &mut ctx.commands,
        &mut ctx.rng,
        &ctx.config,
        ctx.headless.0,
        access,
        root,
        kind,
    );
    ctx.camera.follow_target = None;
    ctx.flow.current_gnome = None;
    ctx.flow.state = FlowState::Dying;
    scheduler::schedule(
        &mut ctx.commands,
        ctx.config.delay_after_death,
        None,
        ScheduledAction::ResetGame,
    );
    ctx.bus.emit(
        "gnome_died",
        serde_json::json!({ "kind": kind.as_str() }),
        Some(root.to_bits()),
    );
}

/// No-op when no gnome is active or the active one is dead.
pub fn on_treasure_collected(ctx: &mut FlowCtx, access: &mut GnomeAccess) {
    let Some(root) = ctx.flow.current_gnome else {
        return;
    };
    if let Ok((mut gnome, _, _)) = access.gnomes.get_mut(root) {
        if gnome.set_holding_treasure(true) {
            info!("gnome picked up the treasure");
        }
    }
}

/// Reaching the exit only wins with treasure in hand; an empty-handed
/// gnome falls through to a full restart.
pub fn on_exit_reached(ctx: &mut FlowCtx, access: &mut GnomeAccess) {
    if let Some(root) = ctx.flow.current_gnome {
        if let Ok((gnome, _, _)) = access.gnomes.get(root) {
            if gnome.alive() && gnome.holding_treasure() {
                let frame = ctx.bus.frame;
                let _ = ctx
                    .audio
                    .play_sfx(&ctx.config.game_won_sound, frame, Some("exit_reached".into()));
                ctx.time_flow.scale = 0.0;
                ctx.ui.show(PANEL_GAME_OVER);
                ctx.flow.state = FlowState::GameOver;
                ctx.bus.emit("game_won", serde_json::json!({}), None);
                return;
            }
        }
    }
    restart_game(ctx, access);
}

/// Pause swaps the menu in and freezes time; resume puts back whatever
/// visibility the gameplay panel had before the pause.
pub fn set_paused(ctx: &mut FlowCtx, paused: bool) {
    if paused {
        if ctx.flow.state == FlowState::Paused {
            return;
        }
        ctx.flow.prev_gameplay_panel = ctx.ui.is_visible(PANEL_GAMEPLAY);
        ctx.time_flow.scale = 0.0;
        ctx.ui.hide(PANEL_GAMEPLAY);
        ctx.ui.show(PANEL_MAIN_MENU);
        ctx.flow.state = FlowState::Paused;
    } else {
        if ctx.flow.state != FlowState::Paused {
            return;
        }
        ctx.ui.hide(PANEL_MAIN_MENU);
        let visible = ctx.flow.prev_gameplay_panel;
        ctx.ui.set_visible(PANEL_GAMEPLAY, visible);
        ctx.time_flow.scale = 1.0;
        ctx.flow.state = FlowState::Playing;
    }
}

/// Tear the active gnome down immediately, skipping the death sequence,
/// and start over.
pub fn restart_game(ctx: &mut FlowCtx, access: &mut GnomeAccess) {
    if let Some(root) = ctx.flow.current_gnome.take() {
        if let Some(root) = ctx.commands.get_entity(root) {
            root.despawn_recursive();
        }
    }
    ctx.camera.follow_target = None;
    reset(ctx, access);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::body_part::{BodyPart, BodyPartPlugin, DamageVisual};
    use crate::camera::CameraPlugin;
    use crate::components::GamePosition;
    use crate::events::GameEventsPlugin;
    use crate::gnome::Gnome;
    use crate::particles::ParticlesPlugin;
    use crate::physics::PhysicsPlugin;
    use crate::resettable::ResettablePlugin;
    use crate::scheduler::SchedulerPlugin;
    use crate::spawn::SpawnPlugin;
    use crate::sprite_swap::SpriteState;
    use crate::trigger::TriggerPlugin;
    use crate::ui::UiPlugin;
    use crate::audio::AudioPlugin;

    fn game_app(seed: u64, invincible: bool) -> App {
        let mut config = GameConfig::default();
        config.rng_seed = Some(seed);
        config.invincible = invincible;
        let well = config.well;

        let mut app = App::new();
        app.init_resource::<Time>()
            .add_plugins(bevy::state::app::StatesPlugin)
            .insert_resource(HeadlessMode(true))
            .insert_resource(TimeFlow::default())
            .insert_resource(well)
            .insert_resource(GameRng::from_seed_or_entropy(config.rng_seed))
            .insert_resource(config)
            .add_plugins(GameEventsPlugin)
            .add_plugins(AudioPlugin)
            .add_plugins(UiPlugin)
            .add_plugins(CameraPlugin)
            .add_plugins(PhysicsPlugin)
            .add_plugins(ParticlesPlugin)
            .add_plugins(SchedulerPlugin)
            .add_plugins(BodyPartPlugin)
            .add_plugins(crate::gnome::GnomePlugin)
            .add_plugins(TriggerPlugin)
            .add_plugins(ResettablePlugin)
            .add_plugins(SpawnPlugin)
            .add_plugins(GameFlowPlugin);
        // First update runs Startup: level zones plus the first gnome.
        app.update();
        app
    }

    fn step(app: &mut App, seconds: f32) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(seconds));
        app.update();
    }

    /// Let the fresh gnome drop to the well floor, where the treasure sits.
    fn settle_on_floor(app: &mut App) {
        for _ in 0..120 {
            step(app, 0.02);
        }
    }

    fn current_gnome(app: &App) -> Option<Entity> {
        app.world().resource::<GameFlow>().current_gnome
    }

    fn teleport(app: &mut App, entity: Entity, x: f32, y: f32) {
        let mut pos = app.world_mut().get_mut::<GamePosition>(entity).unwrap();
        pos.x = x;
        pos.y = y;
    }

    fn played(app: &App, name: &str) -> usize {
        app.world().resource::<AudioManager>().played(name)
    }

    #[test]
    fn startup_spawns_a_gnome_and_shows_gameplay() {
        let app = game_app(1, false);
        assert!(current_gnome(&app).is_some());
        let ui = app.world().resource::<UiManager>();
        assert!(ui.is_visible(PANEL_GAMEPLAY));
        assert!(!ui.is_visible(PANEL_GAME_OVER));
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Playing);
    }

    #[test]
    fn treasure_then_exit_wins_the_game() {
        let mut app = game_app(2, false);
        settle_on_floor(&mut app);

        let root = current_gnome(&app).expect("gnome active");
        {
            let gnome = app.world().get::<Gnome>(root).unwrap();
            assert!(
                gnome.holding_treasure(),
                "landing on the pedestal collects the treasure"
            );
        }
        // The pedestal shows as taken.
        let mut pedestals = app.world_mut().query::<(&SpriteState, &crate::trigger::TriggerZone)>();
        assert!(pedestals
            .iter(app.world())
            .any(|(sprite, _)| sprite.current == "treasure_taken"));

        teleport(&mut app, root, 60.0, 124.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);

        assert_eq!(played(&app, "game_won"), 1, "victory sound plays");
        assert_eq!(app.world().resource::<TimeFlow>().scale, 0.0, "time frozen");
        let ui = app.world().resource::<UiManager>();
        assert!(ui.is_visible(PANEL_GAME_OVER));
        assert_eq!(
            app.world().resource::<GameFlow>().state,
            FlowState::GameOver
        );
    }

    #[test]
    fn empty_handed_exit_restarts_instead_of_winning() {
        let mut app = game_app(3, false);
        let root = current_gnome(&app).expect("gnome active");

        // Straight to the exit before ever touching the treasure.
        teleport(&mut app, root, 60.0, 124.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);

        let ui = app.world().resource::<UiManager>();
        assert!(
            !ui.is_visible(PANEL_GAME_OVER),
            "no win screen without treasure"
        );
        assert_eq!(played(&app, "game_won"), 0);
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Playing);
        let replacement = current_gnome(&app).expect("restart spawns a gnome");
        assert_ne!(replacement, root, "old gnome torn down, fresh one active");
        assert_eq!(app.world().resource::<TimeFlow>().scale, 1.0);
    }

    #[test]
    fn knife_trap_kills_dismembers_and_respawns() {
        let mut app = game_app(4, false);
        settle_on_floor(&mut app);
        let root = current_gnome(&app).expect("gnome active");

        teleport(&mut app, root, -80.0, 60.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);

        assert_eq!(played(&app, "gnome_died"), 1, "death sound plays");
        assert_eq!(played(&app, "knife_slice"), 1, "trap sound plays");
        assert!(current_gnome(&app).is_none(), "gnome removed from play");
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Dying);

        // Every segment shows the cut visual: no randomness for cuts.
        let gnome = app.world().get::<Gnome>(root).unwrap();
        let segments = gnome.segments.clone();
        for &segment in &segments {
            let part = app.world().get::<BodyPart>(segment).unwrap();
            assert_eq!(part.damage_visual, DamageVisual::Cut);
        }

        // The cut damage effect burst is live.
        let mut instances = app
            .world_mut()
            .query::<&crate::particles::ParticleInstance>();
        assert!(instances.iter(app.world()).next().is_some());

        // After the configured delay a fresh gnome appears.
        for _ in 0..70 {
            step(&mut app, 0.02);
        }
        let replacement = current_gnome(&app).expect("respawn after delay");
        assert_ne!(replacement, root);
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Playing);

        // And after the removal delay the corpse root is gone.
        for _ in 0..120 {
            step(&mut app, 0.02);
        }
        assert!(app.world().get_entity(root).is_err());
    }

    #[test]
    fn burn_trap_uses_coin_flip_visuals() {
        let mut app = game_app(6, false);
        settle_on_floor(&mut app);
        let root = current_gnome(&app).expect("gnome active");

        teleport(&mut app, root, 80.0, 30.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);

        assert_eq!(played(&app, "gnome_died"), 1);
        let gnome = app.world().get::<Gnome>(root).unwrap();
        let segments = gnome.segments.clone();
        let mut burned = 0;
        for &segment in &segments {
            let part = app.world().get::<BodyPart>(segment).unwrap();
            assert_ne!(part.damage_visual, DamageVisual::Cut);
            if part.damage_visual == DamageVisual::Burned {
                burned += 1;
            }
        }
        // Seeded run: the exact count is stable, and it must stay within
        // the segment count.
        assert!(burned <= segments.len());
    }

    #[test]
    fn damage_while_dead_leaves_treasure_alone() {
        let mut app = game_app(7, false);
        settle_on_floor(&mut app);
        let root = current_gnome(&app).expect("gnome active");
        teleport(&mut app, root, -80.0, 60.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);
        assert!(current_gnome(&app).is_none());

        // A second trap event while nobody is active is a clean no-op.
        {
            let mut bus = app.world_mut().resource_mut::<GameEventBus>();
            bus.emit(
                "trap_touched",
                serde_json::json!({ "kind": "cut" }),
                None,
            );
        }
        step(&mut app, 0.016);
        assert_eq!(played(&app, "gnome_died"), 1, "no extra death sound");

        let gnome = app.world().get::<Gnome>(root).unwrap();
        assert!(!gnome.holding_treasure());
    }

    #[test]
    fn invincible_mode_keeps_the_gnome_but_shows_feedback() {
        let mut app = game_app(8, true);
        settle_on_floor(&mut app);
        let root = current_gnome(&app).expect("gnome active");

        teleport(&mut app, root, -80.0, 60.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);

        assert_eq!(played(&app, "gnome_died"), 1, "feedback still plays");
        let mut instances = app
            .world_mut()
            .query::<&crate::particles::ParticleInstance>();
        assert!(
            instances.iter(app.world()).next().is_some(),
            "damage visual still shows"
        );

        assert_eq!(current_gnome(&app), Some(root), "gnome survives");
        assert!(app.world().get::<Gnome>(root).unwrap().alive());
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Playing);
    }

    #[test]
    fn pause_and_resume_restore_time_and_panels() {
        let mut app = game_app(9, false);
        {
            let mut bus = app.world_mut().resource_mut::<GameEventBus>();
            bus.emit("game_pause", serde_json::json!({}), None);
        }
        step(&mut app, 0.016);

        let ui = app.world().resource::<UiManager>();
        assert!(ui.is_visible(PANEL_MAIN_MENU));
        assert!(!ui.is_visible(PANEL_GAMEPLAY));
        assert_eq!(app.world().resource::<TimeFlow>().scale, 0.0);
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Paused);

        {
            let mut bus = app.world_mut().resource_mut::<GameEventBus>();
            bus.emit("game_resume", serde_json::json!({}), None);
        }
        step(&mut app, 0.016);

        let ui = app.world().resource::<UiManager>();
        assert!(!ui.is_visible(PANEL_MAIN_MENU));
        assert!(ui.is_visible(PANEL_GAMEPLAY), "pre-pause visibility restored");
        assert_eq!(app.world().resource::<TimeFlow>().scale, 1.0);
        assert_eq!(app.world().resource::<GameFlow>().state, FlowState::Playing);
    }

    #[test]
    fn reset_rearms_the_treasure_for_the_next_gnome() {
        let mut app = game_app(10, false);
        settle_on_floor(&mut app);
        let first = current_gnome(&app).expect("gnome active");
        assert!(app.world().get::<Gnome>(first).unwrap().holding_treasure());

        // Die, wait out the respawn, and drop the next gnome on the
        // pedestal again.
        teleport(&mut app, first, -80.0, 60.0);
        step(&mut app, 0.016);
        step(&mut app, 0.016);
        for _ in 0..70 {
            step(&mut app, 0.02);
        }
        let second = current_gnome(&app).expect("second gnome");
        assert_ne!(second, first);

        settle_on_floor(&mut app);
        assert!(
            app.world().get::<Gnome>(second).unwrap().holding_treasure(),
            "re-armed treasure can be collected again"
        );
    }
}
