mod audio;
mod body_part;
mod camera;
mod components;
mod events;
mod game_flow;
mod gnome;
mod input;
mod particles;
mod physics;
mod resettable;
mod scheduler;
mod spawn;
mod sprite_swap;
mod telemetry;
mod trigger;
mod ui;

use bevy::prelude::*;
use components::{GameConfig, GameRng, HeadlessMode, TimeFlow};

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    background_color: Option<[f32; 3]>,
    #[serde(flatten)]
    game: Option<GameConfig>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("GNOME_WELL_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "gnome_well.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[gnome-well] Loaded config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[gnome-well] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");

    let startup = load_startup_config();
    let config = startup.game.unwrap_or_default();

    let mut app = App::new();
    app.insert_resource(HeadlessMode(headless));

    if headless {
        // No window, no rendering, just the gameplay systems.
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::state::app::StatesPlugin);
        println!("[gnome-well] Starting in HEADLESS mode");
    } else {
        let window_title = startup
            .window_title
            .unwrap_or_else(|| "Gnome's Well".to_string());
        let window_width = startup.window_width.unwrap_or(960.0);
        let window_height = startup.window_height.unwrap_or(540.0);

        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: window_title,
                resolution: (window_width, window_height).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        let bg = startup.background_color.unwrap_or([0.08, 0.07, 0.1]);
        app.insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])));
        println!("[gnome-well] Starting in WINDOWED mode");
    }

    app.insert_resource(config.well)
        .insert_resource(GameRng::from_seed_or_entropy(config.rng_seed))
        .insert_resource(TimeFlow::default())
        .insert_resource(config)
        .add_plugins(events::GameEventsPlugin)
        .add_plugins(input::InputPlugin)
        .add_plugins(audio::AudioPlugin)
        .add_plugins(ui::UiPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(physics::PhysicsPlugin)
        .add_plugins(particles::ParticlesPlugin)
        .add_plugins(scheduler::SchedulerPlugin)
        .add_plugins(sprite_swap::SpriteSwapPlugin)
        .add_plugins(body_part::BodyPartPlugin)
        .add_plugins(gnome::GnomePlugin)
        .add_plugins(trigger::TriggerPlugin)
        .add_plugins(resettable::ResettablePlugin)
        .add_plugins(spawn::SpawnPlugin)
        .add_plugins(game_flow::GameFlowPlugin)
        .add_plugins(telemetry::TelemetryPlugin);

    app.run();
}
