use glam::DVec3;
use relativity_common::BodyId;

/// The rigid-body engine that actually moves colliders.
///
/// Velocities handed to [`drive`](Self::drive) are already scaled by the
/// body's time factor.
pub trait RigidBodyIntegrator {
    fn drive(&mut self, body: BodyId, linear: DVec3, angular: DVec3);

    /// Displacement applied to `body` by the engine since the last step
    /// (joints, kinematic parents and the like).
    fn external_displacement(&mut self, _body: BodyId) -> DVec3 {
        DVec3::ZERO
    }
}

/// Integrator for hosts that let the bodies move themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIntegrator;

impl RigidBodyIntegrator for NullIntegrator {
    fn drive(&mut self, _body: BodyId, _linear: DVec3, _angular: DVec3) {}
}
