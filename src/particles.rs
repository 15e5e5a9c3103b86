use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::{GamePosition, HeadlessMode, TimeFlow};

#[derive(Clone)]
pub struct ParticlePresetDef {
    pub color_start: [f32; 4],
    pub color_end: [f32; 4],
    pub size_start: f32,
    pub size_end: f32,
    pub lifetime: f32,
    pub spread_angle: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub gravity_multiplier: f32,
    pub burst_count: u32,
}

impl Default for ParticlePresetDef {
    fn default() -> Self {
        Self {
            color_start: [1.0, 1.0, 1.0, 1.0],
            color_end: [1.0, 1.0, 1.0, 0.0],
            size_start: 4.0,
            size_end: 1.0,
            lifetime: 0.5,
            spread_angle: 40.0,
            speed_min: 20.0,
            speed_max: 120.0,
            gravity_multiplier: 0.2,
            burst_count: 16,
        }
    }
}

/// Effects the gnome game needs out of the box. A config layer could
/// overwrite these by name later; nothing looks presets up dynamically.
#[derive(Resource)]
pub struct ParticlePresetLibrary {
    pub presets: HashMap<String, ParticlePresetDef>,
}

pub const PRESET_BLOOD_FOUNTAIN: &str = "blood_fountain";
pub const PRESET_DEATH_CUT: &str = "death_cut";
pub const PRESET_DEATH_BURNED: &str = "death_burned";
pub const PRESET_GHOST_TRAIL: &str = "ghost_trail";

impl Default for ParticlePresetLibrary {
    fn default() -> Self {
        let mut presets = HashMap::new();
        presets.insert(
            PRESET_BLOOD_FOUNTAIN.to_string(),
            ParticlePresetDef {
                color_start: [0.8, 0.05, 0.05, 1.0],
                color_end: [0.4, 0.0, 0.0, 0.0],
                spread_angle: 60.0,
                speed_min: 40.0,
                speed_max: 160.0,
                gravity_multiplier: 0.6,
                lifetime: 0.8,
                burst_count: 24,
                ..Default::default()
            },
        );
        presets.insert(
            PRESET_DEATH_CUT.to_string(),
            ParticlePresetDef {
                color_start: [0.9, 0.1, 0.1, 1.0],
                color_end: [0.5, 0.05, 0.05, 0.0],
                spread_angle: 360.0,
                burst_count: 32,
                ..Default::default()
            },
        );
        presets.insert(
            PRESET_DEATH_BURNED.to_string(),
            ParticlePresetDef {
                color_start: [1.0, 0.6, 0.1, 1.0],
                color_end: [0.3, 0.3, 0.3, 0.0],
                spread_angle: 360.0,
                speed_min: 10.0,
                speed_max: 60.0,
                gravity_multiplier: -0.1,
                lifetime: 0.9,
                burst_count: 32,
                ..Default::default()
            },
        );
        presets.insert(
            PRESET_GHOST_TRAIL.to_string(),
            ParticlePresetDef {
                color_start: [0.9, 0.9, 1.0, 0.6],
                color_end: [0.9, 0.9, 1.0, 0.0],
                spread_angle: 20.0,
                speed_min: 5.0,
                speed_max: 20.0,
                gravity_multiplier: -0.3,
                lifetime: 1.2,
                burst_count: 12,
                ..Default::default()
            },
        );
        Self { presets }
    }
}

/// One-shot emitter: fires its burst on the next tick, then despawns once
/// all of its particles are on their own.
#[derive(Component)]
pub struct ParticleBurst {
    pub preset: String,
    pub fired: bool,
}

impl ParticleBurst {
    pub fn preset(name: impl Into<String>) -> Self {
        Self {
            preset: name.into(),
            fired: false,
        }
    }
}

#[derive(Component)]
pub struct ParticleInstance {
    velocity: Vec2,
    age: f32,
    lifetime: f32,
    color_start: Vec4,
    color_end: Vec4,
    size_start: f32,
    size_end: f32,
    gravity_multiplier: f32,
}

pub struct ParticlesPlugin;

impl Plugin for ParticlesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ParticlePresetLibrary>()
            .add_systems(Update, (fire_bursts, update_particles).chain());
    }
}

/// Spawn a one-shot burst at a position, optionally parented so the effect
/// follows (and dies with) another entity.
pub fn spawn_burst(
    commands: &mut Commands,
    preset: &str,
    x: f32,
    y: f32,
    parent: Option<Entity>,
    headless: bool,
) -> Entity {
    let mut entity = commands.spawn((GamePosition { x, y }, ParticleBurst::preset(preset)));
    if !headless {
        entity.insert(Transform::from_xyz(x, y, 200.0));
    }
    let id = entity.id();
    if let Some(parent) = parent {
        commands.entity(id).set_parent(parent);
    }
    id
}

fn fire_bursts(
    mut commands: Commands,
    presets: Res<ParticlePresetLibrary>,
    headless: Option<Res<HeadlessMode>>,
    mut bursts: Query<(Entity, &GamePosition, &mut ParticleBurst)>,
) {
    let headless = headless.map(|h| h.0).unwrap_or(true);
    for (entity, pos, mut burst) in bursts.iter_mut() {
        if burst.fired {
            commands.entity(entity).despawn();
            continue;
        }
        burst.fired = true;
        let Some(profile) = presets.presets.get(&burst.preset) else {
            continue;
        };
        let count = profile.burst_count.clamp(1, 256);
        for i in 0..count {
            spawn_one_particle(&mut commands, pos, profile, i, count, headless);
        }
    }
}

fn update_particles(
    mut commands: Commands,
    time: Res<Time>,
    flow: Res<TimeFlow>,
    mut particles: Query<(
        Entity,
        &mut GamePosition,
        &mut ParticleInstance,
        Option<&mut Sprite>,
    )>,
) {
    let dt = time.delta_secs() * flow.scale;
    if dt <= 0.0 {
        return;
    }
    for (entity, mut pos, mut particle, sprite) in particles.iter_mut() {
        particle.age += dt;
        if particle.age >= particle.lifetime.max(0.01) {
            commands.entity(entity).despawn();
            continue;
        }

        particle.velocity.y -= 980.0 * particle.gravity_multiplier * dt;
        pos.x += particle.velocity.x * dt;
        pos.y += particle.velocity.y * dt;

        if let Some(mut sprite) = sprite {
            let t = (particle.age / particle.lifetime.max(0.01)).clamp(0.0, 1.0);
            let color = particle.color_start.lerp(particle.color_end, t);
            let size = particle.size_start + (particle.size_end - particle.size_start) * t;
            sprite.color = Color::srgba(color.x, color.y, color.z, color.w);
            sprite.custom_size = Some(Vec2::splat(size.max(0.1)));
        }
    }
}

fn spawn_one_particle(
    commands: &mut Commands,
    pos: &GamePosition,
    profile: &ParticlePresetDef,
    index: u32,
    total: u32,
    headless: bool,
) {
    let spread = profile.spread_angle.to_radians();
    let t = if total <= 1 {
        0.5
    } else {
        index as f32 / (total - 1) as f32
    };
    // Fan the burst across the spread, biased upward like a fountain.
    let angle = std::f32::consts::FRAC_PI_2 - spread * 0.5 + spread * t;
    let dir = Vec2::new(angle.cos(), angle.sin());
    let speed = profile.speed_min + (profile.speed_max - profile.speed_min) * t;

    let mut entity = commands.spawn((
        GamePosition { x: pos.x, y: pos.y },
        ParticleInstance {
            velocity: dir * speed.max(0.0),
            age: 0.0,
            lifetime: profile.lifetime.max(0.01),
            color_start: Vec4::from_array(profile.color_start),
            color_end: Vec4::from_array(profile.color_end),
            size_start: profile.size_start.max(0.1),
            size_end: profile.size_end.max(0.1),
            gravity_multiplier: profile.gravity_multiplier,
        },
    ));

    if !headless {
        entity.insert((
            Sprite::from_color(
                Color::srgba(
                    profile.color_start[0],
                    profile.color_start[1],
                    profile.color_start[2],
                    profile.color_start[3],
                ),
                Vec2::splat(profile.size_start.max(0.1)),
            ),
            Transform::from_xyz(pos.x, pos.y, 200.0),
        ));
    }
}
