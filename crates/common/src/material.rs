use serde::{Deserialize, Serialize};

/// How two materials' coefficients are combined at a contact.
///
/// The policy of the body initiating the solve is the one applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    #[default]
    Average,
    Minimum,
    Maximum,
    Multiply,
    /// One-sided: only the initiating body's coefficient counts.
    Mine,
}

impl CombinePolicy {
    pub fn combine(self, mine: f64, theirs: f64) -> f64 {
        match self {
            Self::Average => 0.5 * (mine + theirs),
            Self::Minimum => mine.min(theirs),
            Self::Maximum => mine.max(theirs),
            Self::Multiply => mine * theirs,
            Self::Mine => mine,
        }
    }
}

/// Surface properties of a body's collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsMaterial {
    pub static_friction: f64,
    pub dynamic_friction: f64,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: f64,
    pub friction_combine: CombinePolicy,
    pub bounce_combine: CombinePolicy,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            static_friction: 0.6,
            dynamic_friction: 0.6,
            restitution: 0.4,
            friction_combine: CombinePolicy::Average,
            bounce_combine: CombinePolicy::Average,
        }
    }
}

impl PhysicsMaterial {
    /// A frictionless material with the given restitution.
    pub fn frictionless(restitution: f64) -> Self {
        Self {
            static_friction: 0.0,
            dynamic_friction: 0.0,
            restitution,
            ..Self::default()
        }
    }

    /// Friction coefficient in effect: static while resting, dynamic otherwise.
    pub fn friction(&self, at_rest: bool) -> f64 {
        if at_rest {
            self.static_friction
        } else {
            self.dynamic_friction
        }
    }
}
