//! Mapping between a body's world position and where the player sees it.
//!
//! The optical position is the spatial part, in the player's rest frame, of
//! the event on the body's worldline whose light reaches the player now.
//!
//! # Invariants
//! - `optical_to_world(world_to_optical(p.extend(0), v), v) == p` for a fixed
//!   velocity and frame, up to floating point tolerance.
//! - [`emission_time`] is never positive.

use crate::lorentz::boost_matrix;
use crate::metric::{ConformalMap, is_minkowski, local_metric, metric_dot};
use crate::FrameContext;
use glam::{DMat4, DVec3, DVec4};

const REFINE_ITERATIONS: usize = 32;
const REFINE_TOLERANCE: f64 = 1e-12;

/// Earlier root of `a·t² + 2·b·t + c = 0`, computed without cancellation.
fn past_root(a: f64, b: f64, c: f64) -> f64 {
    let s = (b * b - a * c).max(0.0).sqrt();
    let (num, den) = if b > 0.0 { (-b - s, a) } else { (c, -b + s) };
    if den == 0.0 { 0.0 } else { num / den }
}

/// Emission event relative to the player, in world coordinates.
///
/// `event.w` is the coordinate-time offset (seconds) at which the body
/// occupies `event.xyz`.
fn emission_event(event: DVec4, velocity: DVec3, frame: &FrameContext, map: &dyn ConformalMap) -> DVec4 {
    let c = frame.speed_of_light();
    let position = event.truncate();
    let r = position - frame.player_position();
    let metric = local_metric(position, frame, map);
    let a = (r - velocity * event.w).extend(0.0);
    let b = velocity.extend(c);
    let t = past_root(
        metric_dot(&metric, b, b),
        metric_dot(&metric, a, b),
        metric_dot(&metric, a, a),
    );
    a + b * t
}

/// Where the player sees a body that occupies `event.xyz` at world-time offset
/// `event.w` while moving at `velocity`.
pub fn world_to_optical(
    event: DVec4,
    velocity: DVec3,
    frame: &FrameContext,
    map: &dyn ConformalMap,
) -> DVec3 {
    let emitted = frame.player_boost() * emission_event(event, velocity, frame, map);
    emitted.truncate() + frame.player_position()
}

/// World-time offset (`<= 0`) at which the light seen now left the body.
pub fn emission_time(
    position: DVec3,
    velocity: DVec3,
    frame: &FrameContext,
    map: &dyn ConformalMap,
) -> f64 {
    let event = emission_event(position.extend(0.0), velocity, frame, map);
    (event.w / frame.speed_of_light()).min(0.0)
}

/// Current world position of a body seen at `optical` while moving at
/// `velocity`. Inverse of [`world_to_optical`] at zero time offset.
pub fn optical_to_world(
    optical: DVec3,
    velocity: DVec3,
    frame: &FrameContext,
    map: &dyn ConformalMap,
) -> DVec3 {
    let inverse_boost = boost_matrix(-frame.player_velocity(), frame.speed_of_light());
    let mut estimate = invert_under_metric(optical, velocity, frame, &inverse_boost, &local_metric(optical, frame, map));
    if is_minkowski(frame, map) {
        return estimate;
    }
    for _ in 0..REFINE_ITERATIONS {
        let metric = local_metric(estimate, frame, map);
        let next = invert_under_metric(optical, velocity, frame, &inverse_boost, &metric);
        let converged = (next - estimate).length() <= REFINE_TOLERANCE * next.length().max(1.0);
        estimate = next;
        if converged {
            return estimate;
        }
    }
    tracing::trace!(?optical, ?estimate, "optical inverse hit the iteration limit");
    estimate
}

fn invert_under_metric(
    optical: DVec3,
    velocity: DVec3,
    frame: &FrameContext,
    inverse_boost: &DMat4,
    metric: &DMat4,
) -> DVec3 {
    let c = frame.speed_of_light();
    let p = *inverse_boost * (optical - frame.player_position()).extend(0.0);
    let q = *inverse_boost * DVec4::W;
    let w = past_root(
        metric_dot(metric, q, q),
        metric_dot(metric, p, q),
        metric_dot(metric, p, p),
    );
    let event = p + q * w;
    let emitted_at = event.w / c;
    event.truncate() - velocity * emitted_at + frame.player_position()
}
