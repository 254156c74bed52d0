use crate::integrator::RigidBodyIntegrator;
use crate::visibility::Visibility;
use glam::{DMat3, DMat4, DQuat, DVec3};
use relativity_common::{BodyId, ColliderId, PhysicsMaterial, SimConfig, is_finite_vec};
use relativity_frame::{
    ConformalMap, FrameContext, boost_matrix, clamp_speed, compose_acceleration, emission_time,
    is_minkowski, optical_to_world, proper_to_world_acceleration, time_factor, world_to_optical,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors from body state updates.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BodyError {
    #[error("non-finite {quantity} for body {body:?}; update discarded")]
    NonFinite {
        body: BodyId,
        quantity: &'static str,
    },
    #[error("unknown body {0:?}")]
    Unknown(BodyId),
    #[error("invalid body description: {0}")]
    InvalidDesc(&'static str),
}

/// Initial state of a body, as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDesc {
    pub position: DVec3,
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
    pub proper_acceleration: DVec3,
    pub orientation: DQuat,
    /// Half size of the bounding box in body-local axes.
    pub half_extents: DVec3,
    pub mass: f64,
    /// Principal moments of inertia; a solid box when absent.
    pub inertia: Option<DVec3>,
    pub material: PhysicsMaterial,
    pub is_static: bool,
    pub use_gravity: bool,
    /// Body-local mesh vertices, displaced at presentation time.
    pub mesh: Option<Vec<DVec3>>,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            proper_acceleration: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
            half_extents: DVec3::splat(0.5),
            mass: 1.0,
            inertia: None,
            material: PhysicsMaterial::default(),
            is_static: false,
            use_gravity: false,
            mesh: None,
        }
    }
}

/// Result of one fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Body proper time elapsed during the step.
    pub proper_dt: f64,
    pub visibility: Visibility,
}

/// A rigid body whose motion and appearance follow special relativity.
///
/// Positions and velocities are in world coordinates ("in world": `piw`,
/// `viw`, `aviw`). The optical position is derived, never stored.
///
/// # Invariants
/// - `|velocity| < max_speed` of every frame it has been stepped with.
/// - `boost` is always `boost_matrix(velocity)`.
/// - A velocity write keeps the optical position where it was.
#[derive(Debug, Clone)]
pub struct RelativisticBody {
    id: BodyId,
    collider: ColliderId,
    position: DVec3,
    velocity: DVec3,
    angular_velocity: DVec3,
    proper_acceleration: DVec3,
    boost: DMat4,
    orientation: DQuat,
    half_extents: DVec3,
    mass: f64,
    inertia: DVec3,
    material: PhysicsMaterial,
    is_static: bool,
    use_gravity: bool,
    mesh: Option<Vec<DVec3>>,
    local_time_offset: f64,
    start_time: f64,
    death_time: f64,
    visibility: Visibility,
    sleeping: bool,
    slow_steps: u32,
    steps_asleep: u32,
    recent_contacts: BTreeMap<ColliderId, f64>,
}

impl RelativisticBody {
    pub fn new(
        id: BodyId,
        collider: ColliderId,
        desc: BodyDesc,
        frame: &FrameContext,
        config: &SimConfig,
    ) -> Result<Self, BodyError> {
        if !(desc.mass.is_finite() && desc.mass > 0.0) {
            return Err(BodyError::InvalidDesc("mass must be finite and positive"));
        }
        if !is_finite_vec(desc.half_extents) || desc.half_extents.min_element() < 0.0 {
            return Err(BodyError::InvalidDesc("half extents must be finite and non-negative"));
        }
        let inertia = desc.inertia.unwrap_or_else(|| box_inertia(desc.mass, desc.half_extents));
        if !is_finite_vec(inertia) || inertia.min_element() <= 0.0 {
            return Err(BodyError::InvalidDesc("inertia must be finite and positive"));
        }
        let mut body = Self {
            id,
            collider,
            position: desc.position,
            velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            proper_acceleration: desc.proper_acceleration,
            boost: DMat4::IDENTITY,
            orientation: desc.orientation.normalize(),
            half_extents: desc.half_extents,
            mass: desc.mass,
            inertia,
            material: desc.material,
            is_static: desc.is_static,
            use_gravity: desc.use_gravity,
            mesh: desc.mesh,
            local_time_offset: 0.0,
            start_time: f64::NEG_INFINITY,
            death_time: f64::INFINITY,
            visibility: Visibility::Visible,
            sleeping: false,
            slow_steps: 0,
            steps_asleep: 0,
            recent_contacts: BTreeMap::new(),
        };
        body.set_velocity_and_position(desc.position, desc.velocity, frame, config)?;
        if !desc.is_static {
            if !is_finite_vec(desc.angular_velocity) {
                return Err(body.non_finite("angular velocity"));
            }
            body.angular_velocity = desc.angular_velocity;
        }
        Ok(body)
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn collider(&self) -> ColliderId {
        self.collider
    }

    /// World position (`piw`).
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// World velocity (`viw`).
    pub fn velocity(&self) -> DVec3 {
        self.velocity
    }

    /// World angular velocity (`aviw`).
    pub fn angular_velocity(&self) -> DVec3 {
        self.angular_velocity
    }

    pub fn proper_acceleration(&self) -> DVec3 {
        self.proper_acceleration
    }

    pub fn set_proper_acceleration(&mut self, acceleration: DVec3) {
        if is_finite_vec(acceleration) {
            self.proper_acceleration = acceleration;
        } else {
            tracing::warn!(body = ?self.id, "discarding non-finite proper acceleration");
        }
    }

    pub fn boost(&self) -> DMat4 {
        self.boost
    }

    pub fn orientation(&self) -> DQuat {
        self.orientation
    }

    pub fn half_extents(&self) -> DVec3 {
        self.half_extents
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Zero for static bodies.
    pub fn inverse_mass(&self) -> f64 {
        if self.is_static { 0.0 } else { 1.0 / self.mass }
    }

    pub fn inertia(&self) -> DVec3 {
        self.inertia
    }

    /// Inverse inertia tensor in world axes. Zero for static bodies.
    pub fn inverse_inertia_world(&self) -> DMat3 {
        if self.is_static {
            return DMat3::ZERO;
        }
        let r = DMat3::from_quat(self.orientation);
        r * DMat3::from_diagonal(self.inertia.recip()) * r.transpose()
    }

    /// Distance from the center to the bounding box surface along unit `n`.
    pub fn support_extent(&self, n: DVec3) -> f64 {
        let r = DMat3::from_quat(self.orientation);
        r.x_axis.dot(n).abs() * self.half_extents.x
            + r.y_axis.dot(n).abs() * self.half_extents.y
            + r.z_axis.dot(n).abs() * self.half_extents.z
    }

    pub fn material(&self) -> &PhysicsMaterial {
        &self.material
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn use_gravity(&self) -> bool {
        self.use_gravity
    }

    pub fn mesh(&self) -> Option<&[DVec3]> {
        self.mesh.as_deref()
    }

    pub fn local_time_offset(&self) -> f64 {
        self.local_time_offset
    }

    pub fn reset_local_time(&mut self) {
        self.local_time_offset = 0.0;
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn death_time(&self) -> f64 {
        self.death_time
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Light delay from the body to the player, in player time.
    fn observed_delay(&self, frame: &FrameContext, map: &dyn ConformalMap) -> f64 {
        let distance = (self.optical_position(frame, map) - frame.player_position()).length();
        distance / frame.speed_of_light() * self.time_factor(frame, map)
    }

    /// Mark the body as created now, so the player sees it appear once the
    /// light from here arrives.
    pub fn set_start_time(&mut self, frame: &FrameContext, map: &dyn ConformalMap) {
        self.start_time = frame.total_time() - self.observed_delay(frame, map);
        self.visibility = Visibility::Pending;
    }

    /// Mark the body as destroyed now.
    pub fn set_death_time(&mut self, frame: &FrameContext, map: &dyn ConformalMap) {
        self.death_time = frame.total_time() - self.observed_delay(frame, map);
    }

    pub fn reset_death_time(&mut self) {
        self.death_time = f64::INFINITY;
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Consecutive steps spent below the sleep threshold.
    pub fn slow_steps(&self) -> u32 {
        self.slow_steps
    }

    pub fn steps_asleep(&self) -> u32 {
        self.steps_asleep
    }

    /// Not moving: static, asleep, or with zero velocity.
    pub fn is_at_rest(&self) -> bool {
        self.is_static
            || self.sleeping
            || (self.velocity == DVec3::ZERO && self.angular_velocity == DVec3::ZERO)
    }

    /// Pin the body: velocities zeroed and orientation frozen until woken.
    pub fn fall_asleep(&mut self) {
        if self.is_static || self.sleeping {
            return;
        }
        self.sleeping = true;
        self.steps_asleep = 0;
        self.velocity = DVec3::ZERO;
        self.angular_velocity = DVec3::ZERO;
        self.boost = DMat4::IDENTITY;
    }

    pub fn wake(&mut self) {
        self.sleeping = false;
        self.slow_steps = 0;
        self.steps_asleep = 0;
    }

    /// Move a sleeping body onto its support without touching its velocity.
    pub fn reseat(&mut self, position: DVec3) {
        if is_finite_vec(position) {
            self.position = position;
        }
    }

    /// Whether `collider` touched this body less than `cooldown` ago.
    pub fn recently_contacted(&self, collider: ColliderId, now: f64, cooldown: f64) -> bool {
        self.recent_contacts
            .get(&collider)
            .is_some_and(|&last| last + cooldown > now)
    }

    /// Remember a contact. When `capacity` is reached the oldest entry goes.
    pub fn record_contact(&mut self, collider: ColliderId, now: f64, capacity: usize) {
        if !self.recent_contacts.contains_key(&collider) && self.recent_contacts.len() >= capacity {
            let oldest = self
                .recent_contacts
                .iter()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(&id, _)| id);
            if let Some(oldest) = oldest {
                self.recent_contacts.remove(&oldest);
            }
        }
        self.recent_contacts.insert(collider, now);
    }

    pub fn recent_contacts(&self) -> &BTreeMap<ColliderId, f64> {
        &self.recent_contacts
    }

    pub fn time_factor(&self, frame: &FrameContext, map: &dyn ConformalMap) -> f64 {
        time_factor(self.position, frame, map)
    }

    pub fn optical_position(&self, frame: &FrameContext, map: &dyn ConformalMap) -> DVec3 {
        world_to_optical(self.position.extend(0.0), self.velocity, frame, map)
    }

    /// World-time offset of the light the player sees now (`tisw`).
    pub fn emission_time(&self, frame: &FrameContext, map: &dyn ConformalMap) -> f64 {
        emission_time(self.position, self.velocity, frame, map)
    }

    /// Coordinate acceleration: own proper acceleration seen in the world,
    /// plus the background field.
    pub fn total_acceleration(&self, frame: &FrameContext, map: &dyn ConformalMap) -> DVec3 {
        let own = proper_to_world_acceleration(
            self.proper_acceleration,
            self.velocity,
            frame.speed_of_light(),
        );
        own + map.world_acceleration(self.position, frame).truncate()
    }

    fn speed_limit(frame: &FrameContext, config: &SimConfig) -> f64 {
        (frame.max_speed() - config.speed_epsilon).max(0.0)
    }

    fn non_finite(&self, quantity: &'static str) -> BodyError {
        tracing::warn!(body = ?self.id, quantity, "discarding non-finite update");
        BodyError::NonFinite {
            body: self.id,
            quantity,
        }
    }

    /// Change the world velocity while keeping the body where the player sees
    /// it. Static bodies ignore the call.
    pub fn set_velocity(
        &mut self,
        velocity: DVec3,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        config: &SimConfig,
        integrator: &mut dyn RigidBodyIntegrator,
    ) -> Result<(), BodyError> {
        if self.is_static {
            return Ok(());
        }
        if !is_finite_vec(velocity) {
            return Err(self.non_finite("velocity"));
        }
        let velocity = clamp_speed(velocity, Self::speed_limit(frame, config));
        let seen = self.optical_position(frame, map);
        let position = optical_to_world(seen, velocity, frame, map);
        if !is_finite_vec(position) {
            return Err(self.non_finite("position"));
        }
        self.position = position;
        self.velocity = velocity;
        self.boost = boost_matrix(velocity, frame.speed_of_light());
        if self.sleeping && velocity != DVec3::ZERO {
            self.wake();
        }
        let tf = self.time_factor(frame, map);
        integrator.drive(self.id, velocity * tf, self.angular_velocity * tf);
        Ok(())
    }

    pub fn set_angular_velocity(
        &mut self,
        angular_velocity: DVec3,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        integrator: &mut dyn RigidBodyIntegrator,
    ) -> Result<(), BodyError> {
        if self.is_static {
            return Ok(());
        }
        if !is_finite_vec(angular_velocity) {
            return Err(self.non_finite("angular velocity"));
        }
        self.angular_velocity = angular_velocity;
        if self.sleeping && angular_velocity != DVec3::ZERO {
            self.wake();
        }
        let tf = self.time_factor(frame, map);
        integrator.drive(self.id, self.velocity * tf, angular_velocity * tf);
        Ok(())
    }

    /// Teleport: set both without preserving the optical position.
    pub fn set_velocity_and_position(
        &mut self,
        position: DVec3,
        velocity: DVec3,
        frame: &FrameContext,
        config: &SimConfig,
    ) -> Result<(), BodyError> {
        if !is_finite_vec(position) {
            return Err(self.non_finite("position"));
        }
        if !is_finite_vec(velocity) {
            return Err(self.non_finite("velocity"));
        }
        self.position = position;
        if !self.is_static {
            self.velocity = clamp_speed(velocity, Self::speed_limit(frame, config));
            self.boost = boost_matrix(self.velocity, frame.speed_of_light());
        }
        Ok(())
    }

    /// Advance the body by one fixed player step.
    ///
    /// Nothing is written unless every computed quantity is finite.
    pub fn fixed_step(
        &mut self,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        config: &SimConfig,
        integrator: &mut dyn RigidBodyIntegrator,
    ) -> Result<StepOutcome, BodyError> {
        if frame.movement_frozen() {
            integrator.drive(self.id, DVec3::ZERO, DVec3::ZERO);
            return Ok(StepOutcome {
                proper_dt: 0.0,
                visibility: self.visibility,
            });
        }

        let now = frame.total_time();
        let cooldown = config.contact_cooldown;
        self.recent_contacts.retain(|_, last| *last + cooldown > now);

        let was_slow = self.velocity.length() < config.sleep_velocity
            && self.angular_velocity.length() < config.sleep_velocity;
        let c = frame.speed_of_light();
        let tf = self.time_factor(frame, map);
        let dtau = frame.fixed_delta_time() * tf;
        let moving = !self.is_static && !self.sleeping;

        let mut velocity = self.velocity;
        if moving {
            let mut acceleration = self.proper_acceleration
                + map.world_acceleration(self.position, frame).truncate();
            if self.use_gravity {
                acceleration += config.gravity;
            }
            if acceleration != DVec3::ZERO {
                velocity = compose_acceleration(velocity, acceleration, dtau, c);
            }
        }

        let mut position = self.position;
        if moving && dtau != 0.0 {
            if is_minkowski(frame, map) {
                position += velocity * dtau;
            } else {
                let rest = frame.at_rest();
                let seen = world_to_optical(position.extend(-dtau), velocity, &rest, map);
                position = optical_to_world(seen, velocity, &rest, map);
            }
            position += integrator.external_displacement(self.id);
        }

        let local_time_offset = self.local_time_offset + dtau - frame.world_delta_time();
        let velocity = clamp_speed(velocity, Self::speed_limit(frame, config));

        let orientation = if moving && self.angular_velocity != DVec3::ZERO {
            (DQuat::from_scaled_axis(self.angular_velocity * dtau) * self.orientation).normalize()
        } else {
            self.orientation
        };

        if !is_finite_vec(velocity) {
            return Err(self.non_finite("velocity"));
        }
        if !is_finite_vec(position) {
            return Err(self.non_finite("position"));
        }
        if !local_time_offset.is_finite() {
            return Err(self.non_finite("local time offset"));
        }
        if !orientation.is_finite() {
            return Err(self.non_finite("orientation"));
        }

        self.position = position;
        if velocity != self.velocity {
            self.velocity = velocity;
            self.boost = boost_matrix(velocity, c);
        }
        self.local_time_offset = local_time_offset;
        self.orientation = orientation;
        integrator.drive(self.id, self.velocity * tf, self.angular_velocity * tf);

        let seen_time = now + self.local_time_offset + self.emission_time(frame, map);
        self.visibility = Visibility::classify(seen_time, self.start_time, self.death_time);

        if self.sleeping {
            self.steps_asleep = self.steps_asleep.saturating_add(1);
        } else if was_slow && !self.is_static {
            self.slow_steps = self.slow_steps.saturating_add(1);
        } else {
            self.slow_steps = 0;
        }

        tracing::trace!(
            body = ?self.id,
            position = ?self.position,
            velocity = ?self.velocity,
            dtau,
            "body stepped"
        );
        Ok(StepOutcome {
            proper_dt: dtau,
            visibility: self.visibility,
        })
    }
}

/// Principal moments of a solid box.
fn box_inertia(mass: f64, half_extents: DVec3) -> DVec3 {
    let h2 = half_extents * half_extents;
    let moments = DVec3::new(h2.y + h2.z, h2.x + h2.z, h2.x + h2.y) * (mass / 3.0);
    moments.max(DVec3::splat(f64::MIN_POSITIVE))
}
