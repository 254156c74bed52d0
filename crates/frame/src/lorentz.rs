//! Special-relativistic velocity algebra.
//!
//! All functions take the speed of light explicitly so they stay pure with
//! respect to the per-tick [`FrameContext`](crate::FrameContext).

use glam::{DMat4, DVec3, DVec4};

/// Largest `|v|/c` any function here will produce or accept.
pub const MAX_BETA: f64 = 1.0 - 1e-12;

/// Below this fraction of `c` rapidity and velocity are treated as equal.
const NEWTONIAN_BETA: f64 = 1e-12;

/// Lorentz factor `1 / sqrt(1 - v²/c²)`.
///
/// Speeds at or above `c` are treated as [`MAX_BETA`] so the result is always
/// finite.
pub fn gamma(v: DVec3, c: f64) -> f64 {
    let beta2 = (v.length_squared() / (c * c)).min(MAX_BETA * MAX_BETA);
    1.0 / (1.0 - beta2).sqrt()
}

/// Scale `v` down so that `|v| <= max`, preserving direction.
pub fn clamp_speed(v: DVec3, max: f64) -> DVec3 {
    let speed = v.length();
    if speed > max && speed > 0.0 {
        v * (max / speed)
    } else {
        v
    }
}

fn below_light(v: DVec3, c: f64) -> DVec3 {
    clamp_speed(v, c * MAX_BETA)
}

/// Relativistic velocity addition: `v2` as measured in a frame that itself
/// moves at `v1`, expressed in the frame where `v1` was measured.
///
/// Not commutative for non-parallel inputs. The result is strictly below `c`.
pub fn compose_velocity(v1: DVec3, v2: DVec3, c: f64) -> DVec3 {
    let v1 = below_light(v1, c);
    let v2 = below_light(v2, c);
    let c2 = c * c;
    let dot = v1.dot(v2);
    let g1 = gamma(v1, c);
    let numerator = v1 + v2 / g1 + (g1 / (c2 * (1.0 + g1))) * dot * v1;
    below_light(numerator / (1.0 + dot / c2), c)
}

/// Velocity `v` as seen by an observer moving at `frame_velocity`.
pub fn relative_velocity(v: DVec3, frame_velocity: DVec3, c: f64) -> DVec3 {
    compose_velocity(-frame_velocity, v, c)
}

/// Rapidity vector `c·atanh(|v|/c)·v̂`. Additive along a shared axis.
pub fn velocity_to_rapidity(v: DVec3, c: f64) -> DVec3 {
    let speed = v.length();
    if speed == 0.0 {
        return DVec3::ZERO;
    }
    let beta = (speed / c).min(MAX_BETA);
    v * (c * beta.atanh() / speed)
}

/// Inverse of [`velocity_to_rapidity`].
///
/// `magnitude` is the total rapidity the vector is a component of; when given,
/// the vector is scaled as that share of the total, so that components of one
/// rapidity convert to components of one velocity.
pub fn rapidity_to_velocity(rapidity: DVec3, magnitude: Option<f64>, c: f64) -> DVec3 {
    let m = magnitude.unwrap_or_else(|| rapidity.length()).abs();
    if m <= NEWTONIAN_BETA * c {
        return rapidity;
    }
    below_light(rapidity * (c * (m / c).tanh() / m), c)
}

/// Lorentz contraction of `extent` along the direction of `v`.
pub fn contract_length_by(extent: DVec3, v: DVec3, c: f64) -> DVec3 {
    scale_along(extent, v, 1.0 / gamma(v, c))
}

/// Undo [`contract_length_by`].
pub fn inverse_contract_length_by(extent: DVec3, v: DVec3, c: f64) -> DVec3 {
    scale_along(extent, v, gamma(v, c))
}

fn scale_along(extent: DVec3, v: DVec3, factor: f64) -> DVec3 {
    let Some(n) = v.try_normalize() else {
        return extent;
    };
    extent + (factor - 1.0) * extent.dot(n) * n
}

/// Lorentz boost into the rest frame of an observer moving at `v`.
///
/// Acts on `(x, y, z, w = c·t)`. Symmetric; `boost_matrix(-v)` is its inverse.
pub fn boost_matrix(v: DVec3, c: f64) -> DMat4 {
    let v = below_light(v, c);
    let beta = v.length() / c;
    if beta == 0.0 {
        return DMat4::IDENTITY;
    }
    let n = v.normalize();
    let g = gamma(v, c);
    let k = g - 1.0;
    let gb = g * beta;
    DMat4::from_cols(
        DVec4::new(1.0 + k * n.x * n.x, k * n.y * n.x, k * n.z * n.x, -gb * n.x),
        DVec4::new(k * n.x * n.y, 1.0 + k * n.y * n.y, k * n.z * n.y, -gb * n.y),
        DVec4::new(k * n.x * n.z, k * n.y * n.z, 1.0 + k * n.z * n.z, -gb * n.z),
        DVec4::new(-gb * n.x, -gb * n.y, -gb * n.z, g),
    )
}

/// Coordinate acceleration of a body with proper acceleration `a` moving at `v`.
pub fn proper_to_world_acceleration(a: DVec3, v: DVec3, c: f64) -> DVec3 {
    let g = gamma(v, c);
    let Some(n) = v.try_normalize() else {
        return a;
    };
    let parallel = a.dot(n) * n;
    parallel / (g * g * g) + (a - parallel) / (g * g)
}

/// Proper acceleration from a coordinate acceleration observed at velocity `v`.
pub fn world_to_proper_acceleration(a: DVec3, v: DVec3, c: f64) -> DVec3 {
    let g = gamma(v, c);
    let Some(n) = v.try_normalize() else {
        return a;
    };
    let parallel = a.dot(n) * n;
    parallel * (g * g * g) + (a - parallel) * (g * g)
}

/// Add a proper acceleration sustained for proper time `dtau` to `v`.
///
/// Integrates in rapidity space, which is exact for acceleration along the
/// direction of motion.
pub fn compose_acceleration(v: DVec3, proper_acceleration: DVec3, dtau: f64, c: f64) -> DVec3 {
    let rapidity = velocity_to_rapidity(v, c) + proper_acceleration * dtau;
    rapidity_to_velocity(rapidity, None, c)
}
