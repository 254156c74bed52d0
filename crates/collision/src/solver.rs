//! Contact impulses in rapidity space.
//!
//! Impulses change rapidities, which add linearly along a line, rather than
//! velocities. Converting the updated linear and tangential rapidities back
//! with a shared total magnitude keeps the combined contact speed below `c`.
//!
//! # Invariants
//! - Impulse magnitudes are never negative: contacts push, never pull.
//! - Friction never reverses the relative sliding direction.
//! - Output speeds are clamped to the caller's limit.

use glam::{DMat3, DVec3};
use relativity_common::SolverConfig;
use relativity_frame::{
    clamp_speed, compose_velocity, gamma, inverse_contract_length_by, rapidity_to_velocity,
    relative_velocity, velocity_to_rapidity,
};

/// Squared lever arms shorter than this leave the angular velocity alone.
const MIN_LEVER_SQRD: f64 = 1e-12;

/// Kinematic snapshot of one side of a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactBody {
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
    /// Zero for immovable bodies.
    pub inverse_mass: f64,
    pub inverse_inertia: DMat3,
    /// Contact point relative to the center, in the body's rest frame.
    pub lever: DVec3,
}

impl ContactBody {
    fn contact_velocity(&self, c: f64) -> DVec3 {
        compose_velocity(self.velocity, self.angular_velocity.cross(self.lever), c)
    }

    fn angular_term(&self, n: DVec3) -> f64 {
        n.dot((self.inverse_inertia * self.lever.cross(n)).cross(self.lever))
    }

    /// Velocities after receiving `impulse` (a rapidity times a mass) at the
    /// contact point.
    fn apply(&self, impulse: DVec3, c: f64, speed_limit: f64) -> Velocities {
        if self.inverse_mass == 0.0 {
            return Velocities {
                velocity: self.velocity,
                angular_velocity: self.angular_velocity,
            };
        }
        let r = self.lever;
        let linear = velocity_to_rapidity(self.velocity, c) + impulse * self.inverse_mass;
        let tangential = velocity_to_rapidity(self.angular_velocity.cross(r), c)
            + (self.inverse_inertia * r.cross(impulse)).cross(r);
        let total = (linear + tangential).length();
        let velocity = rapidity_to_velocity(linear, Some(total), c);
        let r2 = r.length_squared();
        let angular_velocity = if r2 > MIN_LEVER_SQRD {
            let tangential_velocity = rapidity_to_velocity(tangential, Some(total), c);
            let along_lever = r * (self.angular_velocity.dot(r) / r2);
            along_lever + r.cross(tangential_velocity) / r2
        } else {
            self.angular_velocity
        };
        Velocities {
            velocity: clamp_speed(velocity, speed_limit),
            angular_velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocities {
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveMode {
    /// First contact: restitution impulse less the spring preload.
    Impulse { restitution: f64 },
    /// Sustained contact: damped spring over one proper step.
    Penalty { dtau: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveInput {
    pub a: ContactBody,
    pub b: ContactBody,
    /// Contact normal pointing from `b` toward `a`.
    pub normal: DVec3,
    pub friction: f64,
    pub stiffness: f64,
    pub penetration: f64,
    pub mode: SolveMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOutput {
    pub a: Velocities,
    pub b: Velocities,
    /// Normal impulse magnitude.
    pub impulse: f64,
    /// Closing rapidity along the line of action before the solve.
    pub closing_rapidity: f64,
}

/// Direction along which `a` pushes on `b`, in `a`'s rest frame.
pub fn line_of_action(normal: DVec3, velocity: DVec3, c: f64) -> Option<DVec3> {
    inverse_contract_length_by(-normal, velocity, c).try_normalize()
}

/// Rapidity of `a`'s contact point relative to `b`'s, measured in the frame
/// where `a`'s contact velocity lies entirely along `n`.
pub fn relative_contact_rapidity(a: &ContactBody, b: &ContactBody, n: DVec3, c: f64) -> DVec3 {
    let u_a = a.contact_velocity(c);
    let u_b = b.contact_velocity(c);
    let parallel = n * u_a.dot(n);
    let perpendicular = (u_a - parallel) * gamma(parallel, c);
    let u_b = relative_velocity(u_b, perpendicular, c);
    velocity_to_rapidity(relative_velocity(parallel, u_b, c), c)
}

/// Solve one contact. `None` when nothing would change: both sides
/// immovable, separating on first contact, or no push in sustained contact.
pub fn solve(input: &SolveInput, config: &SolverConfig, c: f64, speed_limit: f64) -> Option<SolveOutput> {
    let inverse_mass_sum = input.a.inverse_mass + input.b.inverse_mass;
    if inverse_mass_sum <= 0.0 {
        return None;
    }
    let n = line_of_action(input.normal, input.a.velocity, c)?;
    let relative = relative_contact_rapidity(&input.a, &input.b, n, c);
    let closing = relative.dot(n);
    let tangential = relative - n * closing;
    let effective_mass = 1.0 / inverse_mass_sum;
    let k = input.stiffness;
    let pen = input.penetration.max(0.0);

    let impulse = match input.mode {
        SolveMode::Impulse { restitution } => {
            if closing <= 0.0 {
                return None;
            }
            let denominator = inverse_mass_sum + input.a.angular_term(n) + input.b.angular_term(n);
            let elastic = (1.0 + restitution) * closing / denominator;
            let preload = (config.hooke_multiplier * k * pen * pen * effective_mass).sqrt();
            (elastic - preload).max(0.0)
        }
        SolveMode::Penalty { dtau } => {
            if pen <= 0.0 {
                return None;
            }
            let spring = config.hooke_multiplier * k * pen * dtau;
            let damping = config.damping_ratio * 2.0 * (k * effective_mass).sqrt() * closing * dtau;
            (spring + damping).max(0.0)
        }
    };
    if impulse <= 0.0 || !impulse.is_finite() {
        return None;
    }

    // the cap brings the contact point to rest along `t`, spin included
    let friction = match tangential.try_normalize() {
        Some(t) => {
            let resistance = inverse_mass_sum + input.a.angular_term(t) + input.b.angular_term(t);
            t * (input.friction * impulse).min(tangential.length() / resistance)
        }
        None => DVec3::ZERO,
    };
    let on_a = -(n * impulse + friction);

    Some(SolveOutput {
        a: input.a.apply(on_a, c, speed_limit),
        b: input.b.apply(-on_a, c, speed_limit),
        impulse,
        closing_rapidity: closing,
    })
}
