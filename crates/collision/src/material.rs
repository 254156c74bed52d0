use relativity_common::{PhysicsMaterial, SolverConfig};
use std::f64::consts::FRAC_PI_2;

/// Coefficients in effect for one contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedMaterial {
    pub friction: f64,
    pub restitution: f64,
}

/// Combine two surfaces using the policies of `mine`.
///
/// A side flagged as at rest contributes its static friction coefficient.
pub fn combine(
    mine: &PhysicsMaterial,
    mine_at_rest: bool,
    theirs: &PhysicsMaterial,
    theirs_at_rest: bool,
) -> CombinedMaterial {
    CombinedMaterial {
        friction: mine
            .friction_combine
            .combine(mine.friction(mine_at_rest), theirs.friction(theirs_at_rest))
            .max(0.0),
        restitution: mine
            .bounce_combine
            .combine(mine.restitution, theirs.restitution)
            .clamp(0.0, 1.0),
    }
}

/// Penalty stiffness for a restitution coefficient: `scale·tan(e·π/2)`,
/// capped at the configured maximum. Perfectly elastic contacts get the cap.
pub fn stiffness(restitution: f64, solver: &SolverConfig) -> f64 {
    if restitution >= 1.0 {
        return solver.max_stiffness;
    }
    let e = restitution.max(0.0);
    (solver.stiffness_scale * (e * FRAC_PI_2).tan()).min(solver.max_stiffness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relativity_common::CombinePolicy;

    #[test]
    fn sleeping_side_contributes_static_friction() {
        let mine = PhysicsMaterial {
            static_friction: 0.8,
            dynamic_friction: 0.2,
            ..PhysicsMaterial::default()
        };
        let theirs = PhysicsMaterial {
            static_friction: 0.4,
            dynamic_friction: 0.4,
            ..PhysicsMaterial::default()
        };
        assert!((combine(&mine, true, &theirs, false).friction - 0.6).abs() < 1e-12);
        assert!((combine(&mine, false, &theirs, false).friction - 0.3).abs() < 1e-12);
    }

    #[test]
    fn initiating_policy_wins() {
        let mine = PhysicsMaterial {
            restitution: 0.2,
            bounce_combine: CombinePolicy::Maximum,
            ..PhysicsMaterial::default()
        };
        let theirs = PhysicsMaterial {
            restitution: 0.9,
            bounce_combine: CombinePolicy::Minimum,
            ..PhysicsMaterial::default()
        };
        assert_eq!(combine(&mine, false, &theirs, false).restitution, 0.9);
        assert_eq!(combine(&theirs, false, &mine, false).restitution, 0.2);
    }

    #[test]
    fn stiffness_grows_with_restitution_and_caps() {
        let solver = SolverConfig::default();
        assert_eq!(stiffness(0.0, &solver), 0.0);
        assert!((stiffness(0.5, &solver) - 1000.0).abs() < 1e-9);
        assert!(stiffness(0.9, &solver) > stiffness(0.5, &solver));
        assert_eq!(stiffness(1.0, &solver), solver.max_stiffness);
        assert_eq!(stiffness(1.5, &solver), solver.max_stiffness);
    }
}
