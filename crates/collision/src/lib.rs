//! Collision resolution for relativistic bodies.
//!
//! The host's collision detector reports contacts in observed coordinates.
//! [`CollisionResolver`] turns them into post-contact velocities that the
//! world applies on the following tick.

pub mod contact;
pub mod geometry;
pub mod material;
mod resolver;
pub mod sleep;
pub mod solver;

pub use contact::{ContactEvent, ContactKind, ContactPoint, ContactQueue, PairKey};
pub use geometry::{BoxGeometry, EmptyGeometry, Geometry, OrientedBox, ProbeSide, RayFilter, RayHit, penetration_depth};
pub use material::{CombinedMaterial, combine, stiffness};
pub use resolver::{BodySet, CollisionResolver, PairState, ResolveReport, ResolvedContact, SolveKind};
pub use sleep::{SUPPORT_SKIN, SleepTransition, update_sleep};
pub use solver::{ContactBody, SolveInput, SolveMode, SolveOutput, Velocities, solve};

/// Returns the crate name for diagnostics.
pub fn crate_info() -> &'static str {
    "relativity-collision"
}
