//! World kernel: body registry, fixed and presentation ticks, event log.
//!
//! # Invariants
//! - Bodies are visited in collider order in every pass.
//! - Collision results take effect on the tick after the one that produced them.
//! - All state changes to the body set are recorded as [`WorldEvent`]s.

pub mod detect;
pub mod displacement;
pub mod scene;
pub mod world;

pub use detect::AabbContactDetector;
pub use displacement::{CpuDisplacer, DisplacementError, DisplacementParams, GpuParamBlock, VertexDisplacer};
pub use scene::{FieldDesc, Scene, SceneError};
pub use world::{PresentedBody, StepReport, World, WorldEvent};

/// Returns the crate name for diagnostics.
pub fn crate_info() -> &'static str {
    "relativity-kernel"
}
