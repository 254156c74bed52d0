//! Frame transforms for the relativistic simulation.
//!
//! A [`FrameContext`] snapshot of the observer is built once per tick and
//! handed by reference to every function here. Nothing in this crate keeps
//! state between calls.
//!
//! 4-vectors are `(x, y, z, w = c·t)` with metric signature `(-, -, -, +)`.

mod context;
pub mod lorentz;
pub mod metric;
pub mod optical;

pub use context::{FrameContext, FrameContextBuilder, FrameError, FrameParams};
pub use lorentz::{
    MAX_BETA, boost_matrix, clamp_speed, compose_acceleration, compose_velocity,
    contract_length_by, gamma, inverse_contract_length_by, proper_to_world_acceleration,
    rapidity_to_velocity, relative_velocity, velocity_to_rapidity, world_to_proper_acceleration,
};
pub use metric::{ConformalMap, Minkowski, UniformField, is_minkowski, local_metric, metric_dot, time_factor};
pub use optical::{emission_time, optical_to_world, world_to_optical};

/// Returns the crate name for diagnostics.
pub fn crate_info() -> &'static str {
    "relativity-frame"
}
