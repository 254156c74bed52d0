//! Shared types for the relativistic body simulation.
//!
//! Everything here is plain data: ids, transforms, surface materials and the
//! tuning knobs read by the body, collision and kernel crates.

mod config;
mod material;
mod types;

pub use config::{ConfigError, MAX_YOUNGS_MODULUS, SimConfig, SolverConfig};
pub use material::{CombinePolicy, PhysicsMaterial};
pub use types::{BodyId, ColliderId, Transform, is_finite_vec};
