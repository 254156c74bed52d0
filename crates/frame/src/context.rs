use crate::lorentz::{boost_matrix, gamma};
use glam::{DMat4, DVec3};
use relativity_common::is_finite_vec;
use serde::{Deserialize, Serialize};

/// Errors from building a frame snapshot.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameError {
    #[error("speed of light must be finite and positive, got {0}")]
    InvalidSpeedOfLight(f64),
    #[error("max speed {max_speed} must lie in (0, {speed_of_light})")]
    InvalidMaxSpeed { max_speed: f64, speed_of_light: f64 },
    #[error("player speed {speed} is not below the speed of light {speed_of_light}")]
    PlayerTooFast { speed: f64, speed_of_light: f64 },
    #[error("fixed delta time must be finite and positive, got {0}")]
    InvalidDeltaTime(f64),
    #[error("non-finite frame parameter: {0}")]
    NonFinite(&'static str),
}

/// Raw observer state supplied by the host each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameParams {
    pub speed_of_light: f64,
    pub player_position: DVec3,
    pub player_velocity: DVec3,
    /// Proper acceleration felt by the player.
    pub player_acceleration: DVec3,
    pub player_angular_velocity: DVec3,
    pub movement_frozen: bool,
    pub total_time: f64,
    /// Fixed step in player proper time.
    pub fixed_delta_time: f64,
    pub max_speed: f64,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            speed_of_light: 200.0,
            player_position: DVec3::ZERO,
            player_velocity: DVec3::ZERO,
            player_acceleration: DVec3::ZERO,
            player_angular_velocity: DVec3::ZERO,
            movement_frozen: false,
            total_time: 0.0,
            fixed_delta_time: 0.02,
            max_speed: 199.0,
        }
    }
}

/// Immutable per-tick snapshot of the observer ("player") frame.
///
/// Every frame-transform call receives one of these by reference, so all reads
/// within a tick agree. The player boost matrix is derived from the player
/// velocity at construction and cannot drift from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    params: FrameParams,
    player_boost: DMat4,
}

impl FrameContext {
    pub fn new(params: FrameParams) -> Result<Self, FrameError> {
        let c = params.speed_of_light;
        if !(c.is_finite() && c > 0.0) {
            return Err(FrameError::InvalidSpeedOfLight(c));
        }
        if !(params.max_speed.is_finite() && params.max_speed > 0.0 && params.max_speed < c) {
            return Err(FrameError::InvalidMaxSpeed {
                max_speed: params.max_speed,
                speed_of_light: c,
            });
        }
        if !(params.fixed_delta_time.is_finite() && params.fixed_delta_time > 0.0) {
            return Err(FrameError::InvalidDeltaTime(params.fixed_delta_time));
        }
        for (name, v) in [
            ("player_position", params.player_position),
            ("player_velocity", params.player_velocity),
            ("player_acceleration", params.player_acceleration),
            ("player_angular_velocity", params.player_angular_velocity),
        ] {
            if !is_finite_vec(v) {
                return Err(FrameError::NonFinite(name));
            }
        }
        if !params.total_time.is_finite() {
            return Err(FrameError::NonFinite("total_time"));
        }
        let speed = params.player_velocity.length();
        if speed >= c {
            return Err(FrameError::PlayerTooFast {
                speed,
                speed_of_light: c,
            });
        }
        Ok(Self {
            params,
            player_boost: boost_matrix(params.player_velocity, c),
        })
    }

    pub fn builder() -> FrameContextBuilder {
        FrameContextBuilder::default()
    }

    pub fn params(&self) -> &FrameParams {
        &self.params
    }

    pub fn speed_of_light(&self) -> f64 {
        self.params.speed_of_light
    }

    pub fn speed_of_light_sqrd(&self) -> f64 {
        self.params.speed_of_light * self.params.speed_of_light
    }

    pub fn player_position(&self) -> DVec3 {
        self.params.player_position
    }

    pub fn player_velocity(&self) -> DVec3 {
        self.params.player_velocity
    }

    pub fn player_acceleration(&self) -> DVec3 {
        self.params.player_acceleration
    }

    pub fn player_angular_velocity(&self) -> DVec3 {
        self.params.player_angular_velocity
    }

    /// Boost from world coordinates into the player's rest frame.
    pub fn player_boost(&self) -> DMat4 {
        self.player_boost
    }

    pub fn movement_frozen(&self) -> bool {
        self.params.movement_frozen
    }

    pub fn total_time(&self) -> f64 {
        self.params.total_time
    }

    pub fn fixed_delta_time(&self) -> f64 {
        self.params.fixed_delta_time
    }

    /// Coordinate time elapsed in the world during one fixed player step.
    pub fn world_delta_time(&self) -> f64 {
        self.params.fixed_delta_time * gamma(self.params.player_velocity, self.speed_of_light())
    }

    pub fn max_speed(&self) -> f64 {
        self.params.max_speed
    }

    /// True when the observer neither accelerates nor rotates, so the local
    /// metric is plain Minkowski everywhere.
    pub fn is_inertial(&self) -> bool {
        self.params.player_acceleration == DVec3::ZERO
            && self.params.player_angular_velocity == DVec3::ZERO
    }

    /// The same snapshot with the player's velocity removed.
    pub fn at_rest(&self) -> Self {
        Self {
            params: FrameParams {
                player_velocity: DVec3::ZERO,
                ..self.params
            },
            player_boost: DMat4::IDENTITY,
        }
    }

    /// The snapshot for the next fixed tick.
    pub fn advanced(&self) -> Self {
        Self {
            params: FrameParams {
                total_time: self.params.total_time + self.world_delta_time(),
                ..self.params
            },
            player_boost: self.player_boost,
        }
    }
}

/// Chainable construction of a [`FrameContext`], starting from the defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameContextBuilder {
    params: FrameParams,
}

impl FrameContextBuilder {
    pub fn speed_of_light(mut self, c: f64) -> Self {
        self.params.speed_of_light = c;
        self
    }

    pub fn max_speed(mut self, max_speed: f64) -> Self {
        self.params.max_speed = max_speed;
        self
    }

    pub fn player_position(mut self, position: DVec3) -> Self {
        self.params.player_position = position;
        self
    }

    pub fn player_velocity(mut self, velocity: DVec3) -> Self {
        self.params.player_velocity = velocity;
        self
    }

    pub fn player_acceleration(mut self, acceleration: DVec3) -> Self {
        self.params.player_acceleration = acceleration;
        self
    }

    pub fn player_angular_velocity(mut self, angular_velocity: DVec3) -> Self {
        self.params.player_angular_velocity = angular_velocity;
        self
    }

    pub fn movement_frozen(mut self, frozen: bool) -> Self {
        self.params.movement_frozen = frozen;
        self
    }

    pub fn total_time(mut self, total_time: f64) -> Self {
        self.params.total_time = total_time;
        self
    }

    pub fn fixed_delta_time(mut self, dt: f64) -> Self {
        self.params.fixed_delta_time = dt;
        self
    }

    pub fn build(self) -> Result<FrameContext, FrameError> {
        FrameContext::new(self.params)
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        let params = FrameParams::default();
        Self {
            params,
            player_boost: DMat4::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        let frame = FrameContext::new(FrameParams::default()).unwrap();
        assert_eq!(frame, FrameContext::default());
    }

    #[test]
    fn rejects_max_speed_at_light_speed() {
        let params = FrameParams {
            max_speed: 200.0,
            ..FrameParams::default()
        };
        assert!(matches!(
            FrameContext::new(params),
            Err(FrameError::InvalidMaxSpeed { .. })
        ));
    }

    #[test]
    fn rejects_superluminal_player() {
        let params = FrameParams {
            player_velocity: DVec3::new(0.0, 250.0, 0.0),
            ..FrameParams::default()
        };
        assert!(matches!(
            FrameContext::new(params),
            Err(FrameError::PlayerTooFast { .. })
        ));
    }

    #[test]
    fn rejects_nan_position() {
        let params = FrameParams {
            player_position: DVec3::new(f64::NAN, 0.0, 0.0),
            ..FrameParams::default()
        };
        assert_eq!(
            FrameContext::new(params),
            Err(FrameError::NonFinite("player_position"))
        );
    }

    #[test]
    fn boost_follows_player_velocity() {
        let params = FrameParams {
            player_velocity: DVec3::new(120.0, 0.0, 0.0),
            ..FrameParams::default()
        };
        let frame = FrameContext::new(params).unwrap();
        assert_eq!(frame.player_boost(), boost_matrix(params.player_velocity, 200.0));
        assert_eq!(frame.at_rest().player_boost(), DMat4::IDENTITY);
    }

    #[test]
    fn builder_matches_params() {
        let built = FrameContext::builder()
            .speed_of_light(10.0)
            .max_speed(9.0)
            .player_velocity(DVec3::new(0.0, 0.0, 3.0))
            .build()
            .unwrap();
        assert_eq!(built.speed_of_light(), 10.0);
        assert_eq!(built.player_boost(), boost_matrix(DVec3::new(0.0, 0.0, 3.0), 10.0));
        assert!(built.is_inertial());
    }

    #[test]
    fn world_time_runs_faster_for_moving_player() {
        let params = FrameParams {
            player_velocity: DVec3::new(120.0, 0.0, 0.0),
            fixed_delta_time: 0.02,
            ..FrameParams::default()
        };
        let frame = FrameContext::new(params).unwrap();
        assert!((frame.world_delta_time() - 0.025).abs() < 1e-12);
        assert!((frame.advanced().total_time() - 0.025).abs() < 1e-12);
    }
}
