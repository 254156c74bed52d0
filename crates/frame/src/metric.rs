//! Local metric of the observer frame and the conformal-factor hook.
//!
//! # Invariants
//! - [`local_metric`] is symmetric.
//! - For an inertial observer and a flat map it is `diag(-1, -1, -1, 1)`.

use crate::FrameContext;
use glam::{DMat4, DVec3, DVec4};

/// Background geometry hook.
///
/// Scales the observer's local metric and contributes a background ("gravity")
/// acceleration on top of a body's own proper acceleration.
pub trait ConformalMap: Send + Sync {
    fn conformal_factor(&self, _position: DVec3, _frame: &FrameContext) -> f64 {
        1.0
    }

    /// Background 4-acceleration at `position`.
    fn world_acceleration(&self, _position: DVec3, _frame: &FrameContext) -> DVec4 {
        DVec4::ZERO
    }

    /// Flat maps never alter the metric, which lets bodies skip the optical
    /// round trip when the observer is also inertial.
    fn is_flat(&self) -> bool;
}

/// Empty flat spacetime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Minkowski;

impl ConformalMap for Minkowski {
    fn is_flat(&self) -> bool {
        true
    }
}

/// A constant background acceleration everywhere, with no metric scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    pub acceleration: DVec3,
}

impl ConformalMap for UniformField {
    fn world_acceleration(&self, _position: DVec3, _frame: &FrameContext) -> DVec4 {
        self.acceleration.extend(0.0)
    }

    fn is_flat(&self) -> bool {
        false
    }
}

/// Whether positions can advance by plain `v·dτ` for this frame and map.
pub fn is_minkowski(frame: &FrameContext, map: &dyn ConformalMap) -> bool {
    frame.is_inertial() && map.is_flat()
}

/// Metric seen by the player at `position` (Rindler plus rotating frame).
pub fn local_metric(position: DVec3, frame: &FrameContext, map: &dyn ConformalMap) -> DMat4 {
    let c = frame.speed_of_light();
    let r = position - frame.player_position();
    let lapse = 1.0 + frame.player_acceleration().dot(r) / (c * c);
    let wr = frame.player_angular_velocity().cross(r) / c;
    let g_ww = lapse * lapse - wr.length_squared();
    let metric = DMat4::from_cols(
        DVec4::new(-1.0, 0.0, 0.0, -wr.x),
        DVec4::new(0.0, -1.0, 0.0, -wr.y),
        DVec4::new(0.0, 0.0, -1.0, -wr.z),
        DVec4::new(-wr.x, -wr.y, -wr.z, g_ww),
    );
    metric * map.conformal_factor(position, frame)
}

/// `g(a, b)` for a metric matrix.
pub fn metric_dot(metric: &DMat4, a: DVec4, b: DVec4) -> f64 {
    a.dot(*metric * b)
}

/// Rate of body proper time per unit of player step time at `position`.
///
/// One when movement is frozen; never negative.
pub fn time_factor(position: DVec3, frame: &FrameContext, map: &dyn ConformalMap) -> f64 {
    if frame.movement_frozen() {
        return 1.0;
    }
    let c = frame.speed_of_light();
    let metric = local_metric(position, frame, map);
    let u = frame.player_velocity().extend(c);
    metric_dot(&metric, u, u).max(0.0).sqrt() / c
}
