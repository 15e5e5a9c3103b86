use bevy::prelude::*;

use crate::components::{
    BoxCollider, GamePosition, Joint, RigidBody, TimeFlow, Velocity, WellGeometry,
};

pub const GRAVITY: f32 = 980.0;
/// Maximum downward velocity to prevent tunneling through the floor.
pub const MAX_FALL_SPEED: f32 = 800.0;
/// Below this speed a grounded body accumulates rest ticks.
pub const SLEEP_VELOCITY: f32 = 4.0;
/// Consecutive slow ticks before a body counts as settled.
pub const SLEEP_TICKS: u32 = 8;

const GROUND_FRICTION: f32 = 0.6;

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (integrate_bodies, track_joints, detect_settling).chain(),
        );
    }
}

fn half_extents(collider: Option<&BoxCollider>) -> (f32, f32) {
    collider
        .map(|c| (c.width / 2.0, c.height / 2.0))
        .unwrap_or((2.0, 2.0))
}

/// Free bodies fall under gravity and come to rest against the well.
/// Jointed bodies are constrained elsewhere and skipped here.
fn integrate_bodies(
    time: Res<Time>,
    flow: Res<TimeFlow>,
    well: Res<WellGeometry>,
    mut bodies: Query<
        (
            &mut GamePosition,
            &mut Velocity,
            &RigidBody,
            Option<&BoxCollider>,
        ),
        Without<Joint>,
    >,
) {
    let dt = time.delta_secs() * flow.scale;
    if dt <= 0.0 {
        return;
    }

    for (mut pos, mut vel, body, collider) in bodies.iter_mut() {
        if body.sleeping {
            continue;
        }
        let (hw, hh) = half_extents(collider);

        vel.y -= GRAVITY * body.gravity_scale * dt;
        if vel.y < -MAX_FALL_SPEED {
            vel.y = -MAX_FALL_SPEED;
        }

        pos.x += vel.x * dt;
        pos.y += vel.y * dt;

        // Walls
        if pos.x - hw < well.left_x {
            pos.x = well.left_x + hw;
            vel.x = 0.0;
        } else if pos.x + hw > well.right_x {
            pos.x = well.right_x - hw;
            vel.x = 0.0;
        }

        // Floor
        if pos.y - hh < well.floor_y {
            pos.y = well.floor_y + hh;
            if vel.y < 0.0 {
                vel.y = 0.0;
            }
            vel.x *= GROUND_FRICTION;
        }
    }
}

/// A jointed body rides its anchor at a fixed offset and inherits the
/// anchor's velocity, so breaking the joint lets it keep falling from
/// wherever it was.
fn track_joints(
    mut jointed: Query<(&Joint, &mut GamePosition, Option<&mut Velocity>)>,
    anchors: Query<(&GamePosition, Option<&Velocity>), Without<Joint>>,
) {
    for (joint, mut pos, vel) in jointed.iter_mut() {
        let Ok((anchor_pos, anchor_vel)) = anchors.get(joint.connected) else {
            continue;
        };
        pos.x = anchor_pos.x + joint.offset.x;
        pos.y = anchor_pos.y + joint.offset.y;
        if let (Some(mut vel), Some(anchor_vel)) = (vel, anchor_vel) {
            vel.x = anchor_vel.x;
            vel.y = anchor_vel.y;
        }
    }
}

/// Latch `sleeping` once a free body has sat still long enough. This is
/// the "settled" signal the body-part cleanup waits for.
fn detect_settling(
    flow: Res<TimeFlow>,
    well: Res<WellGeometry>,
    mut bodies: Query<
        (
            &GamePosition,
            &Velocity,
            &mut RigidBody,
            Option<&BoxCollider>,
        ),
        Without<Joint>,
    >,
) {
    if flow.scale <= 0.0 {
        return;
    }
    for (pos, vel, mut body, collider) in bodies.iter_mut() {
        if body.sleeping {
            continue;
        }
        let (_, hh) = half_extents(collider);
        let grounded = pos.y - hh <= well.floor_y + 0.5;
        let slow = vel.x.abs() < SLEEP_VELOCITY && vel.y.abs() < SLEEP_VELOCITY;
        if grounded && slow {
            body.rest_ticks = body.rest_ticks.saturating_add(1);
            if body.rest_ticks >= SLEEP_TICKS {
                body.sleeping = true;
            }
        } else {
            body.rest_ticks = 0;
        }
    }
}
