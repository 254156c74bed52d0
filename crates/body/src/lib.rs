//! Kinematic state of relativistic rigid bodies.
//!
//! # Invariants
//! - Velocities stay strictly below the frame's maximum speed.
//! - A body's boost matrix is recomputed on every velocity write.
//! - Non-finite results never reach stored state.

mod body;
mod integrator;
mod visibility;

pub use body::{BodyDesc, BodyError, RelativisticBody, StepOutcome};
pub use integrator::{NullIntegrator, RigidBodyIntegrator};
pub use visibility::Visibility;

/// Returns the crate name for diagnostics.
pub fn crate_info() -> &'static str {
    "relativity-body"
}
