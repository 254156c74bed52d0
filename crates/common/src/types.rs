use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a relativistic body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub Uuid);

impl BodyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BodyId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle of a collider registered with the external broad phase.
///
/// Allocated by the world in spawn order, so ordering is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u64);

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// True when every component of the vector is finite.
pub fn is_finite_vec(v: DVec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_id_uniqueness() {
        let a = BodyId::new();
        let b = BodyId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn collider_ids_order_by_allocation() {
        let mut ids = vec![ColliderId(3), ColliderId(1), ColliderId(2)];
        ids.sort();
        assert_eq!(ids, vec![ColliderId(1), ColliderId(2), ColliderId(3)]);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, DVec3::ZERO);
        assert_eq!(t.rotation, DQuat::IDENTITY);
        assert_eq!(t.scale, DVec3::ONE);
    }

    #[test]
    fn finite_check_rejects_nan_and_inf() {
        assert!(is_finite_vec(DVec3::new(1.0, -2.0, 3.0)));
        assert!(!is_finite_vec(DVec3::new(f64::NAN, 0.0, 0.0)));
        assert!(!is_finite_vec(DVec3::new(0.0, f64::INFINITY, 0.0)));
    }
}
