use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Roughly the Young's modulus of diamond; caps the penalty stiffness.
pub const MAX_YOUNGS_MODULUS: f64 = 1220.0e9;

/// Errors from validating tuning parameters.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("gravity must be finite")]
    NonFiniteGravity,
    #[error("recent contact capacity must be at least 1")]
    ZeroContactCapacity,
}

/// Contact solver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Scales `tan(e·π/2)` into a penalty stiffness.
    pub stiffness_scale: f64,
    pub max_stiffness: f64,
    pub hooke_multiplier: f64,
    /// Fraction of critical damping applied during sustained contact.
    pub damping_ratio: f64,
    /// Ray probes start this many bounding extents away from the body.
    pub probe_margin_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            stiffness_scale: 1000.0,
            max_stiffness: MAX_YOUNGS_MODULUS,
            hooke_multiplier: 1.0,
            damping_ratio: 1.0,
            probe_margin_factor: 4.0,
        }
    }
}

/// Simulation-wide tuning shared by bodies, the resolver and the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds during which repeated enter events from one collider collapse
    /// into the same logical contact.
    pub contact_cooldown: f64,
    /// Velocities are clamped to `max_speed - speed_epsilon`.
    pub speed_epsilon: f64,
    pub sleep_velocity: f64,
    /// Consecutive slow steps before a body sleeps.
    pub sleep_frame_delay: u32,
    /// Steps between downward re-seating probes of sleeping bodies.
    pub reseat_interval: u32,
    /// Longest distance a re-seating probe may search for support.
    pub reseat_max_distance: f64,
    pub gravity: DVec3,
    pub recent_contact_capacity: usize,
    pub solver: SolverConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            contact_cooldown: 0.3,
            speed_epsilon: 0.01,
            sleep_velocity: 0.01,
            sleep_frame_delay: 3,
            reseat_interval: 10,
            reseat_max_distance: 100.0,
            gravity: DVec3::new(0.0, -9.81, 0.0),
            recent_contact_capacity: 32,
            solver: SolverConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("contact_cooldown", self.contact_cooldown)?;
        positive("speed_epsilon", self.speed_epsilon)?;
        non_negative("sleep_velocity", self.sleep_velocity)?;
        positive("reseat_max_distance", self.reseat_max_distance)?;
        positive("solver.stiffness_scale", self.solver.stiffness_scale)?;
        positive("solver.max_stiffness", self.solver.max_stiffness)?;
        positive("solver.hooke_multiplier", self.solver.hooke_multiplier)?;
        non_negative("solver.damping_ratio", self.solver.damping_ratio)?;
        positive("solver.probe_margin_factor", self.solver.probe_margin_factor)?;
        if !crate::is_finite_vec(self.gravity) {
            return Err(ConfigError::NonFiniteGravity);
        }
        if self.recent_contact_capacity == 0 {
            return Err(ConfigError::ZeroContactCapacity);
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}
