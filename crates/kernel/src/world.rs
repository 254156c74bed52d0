use crate::displacement::{DisplacementError, DisplacementParams, VertexDisplacer};
use glam::{DMat3, DQuat, DVec3};
use relativity_body::{BodyDesc, BodyError, RelativisticBody, RigidBodyIntegrator, Visibility};
use relativity_collision::{
    BoxGeometry, CollisionResolver, ContactEvent, Geometry, OrientedBox, ResolvedContact,
    SleepTransition, update_sleep,
};
use relativity_common::{BodyId, ColliderId, SimConfig};
use relativity_frame::{ConformalMap, FrameContext, contract_length_by, relative_velocity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every change to the body set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    Spawned { id: BodyId, collider: ColliderId },
    Despawned { id: BodyId, collider: ColliderId },
    /// The light from the body's death reached the player.
    Retired { id: BodyId, collider: ColliderId },
    Slept { id: BodyId },
    Woke { id: BodyId },
    ContactResolved(ResolvedContact),
    /// One fixed tick completed.
    Stepped { tick: u64 },
}

/// Summary of one fixed tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub tick: u64,
    pub stepped: usize,
    /// Writes thrown away because they produced non-finite state.
    pub discarded: usize,
    pub resolved: usize,
    pub retired: Vec<BodyId>,
}

/// What the player sees of one body this presentation tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentedBody {
    pub id: BodyId,
    pub collider: ColliderId,
    pub optical_position: DVec3,
    pub orientation: DQuat,
    /// Contracted bounding box, the fallback when no displaced mesh exists.
    pub half_extents: DVec3,
    pub vertices: Option<Vec<DVec3>>,
}

/// The authoritative set of relativistic bodies.
///
/// Bodies are keyed by collider in a BTreeMap so every pass visits them in
/// the same order. Collision results staged during one tick are applied at
/// the start of the next.
#[derive(Debug, Clone, Default)]
pub struct World {
    config: SimConfig,
    bodies: BTreeMap<ColliderId, RelativisticBody>,
    colliders: BTreeMap<BodyId, ColliderId>,
    next_collider: u64,
    tick: u64,
    resolver: CollisionResolver,
    event_log: Vec<WorldEvent>,
    displacer_warned: bool,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Bodies in collider order.
    pub fn bodies(&self) -> impl Iterator<Item = &RelativisticBody> {
        self.bodies.values()
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    pub fn collider_of(&self, id: BodyId) -> Option<ColliderId> {
        self.colliders.get(&id).copied()
    }

    pub fn get(&self, id: BodyId) -> Option<&RelativisticBody> {
        self.bodies.get(&self.collider_of(id)?)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RelativisticBody> {
        let collider = self.collider_of(id)?;
        self.bodies.get_mut(&collider)
    }

    pub fn by_collider(&self, collider: ColliderId) -> Option<&RelativisticBody> {
        self.bodies.get(&collider)
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    pub fn spawn(&mut self, desc: BodyDesc, frame: &FrameContext) -> Result<BodyId, BodyError> {
        let id = BodyId::new();
        let collider = ColliderId(self.next_collider);
        let body = RelativisticBody::new(id, collider, desc, frame, &self.config)?;
        self.next_collider += 1;
        self.bodies.insert(collider, body);
        self.colliders.insert(id, collider);
        self.event_log.push(WorldEvent::Spawned { id, collider });
        Ok(id)
    }

    /// Remove a body. Returns it if it existed.
    pub fn despawn(&mut self, id: BodyId) -> Option<RelativisticBody> {
        let collider = self.colliders.remove(&id)?;
        let body = self.bodies.remove(&collider)?;
        self.event_log.push(WorldEvent::Despawned { id, collider });
        Some(body)
    }

    /// Queue a contact report for the next fixed tick.
    pub fn submit_contact(&mut self, event: ContactEvent) {
        self.resolver.submit(event);
    }

    /// Observed bounding boxes of every body, for hosts without their own
    /// collision geometry.
    pub fn optical_boxes(&self, frame: &FrameContext, map: &dyn ConformalMap) -> Vec<OrientedBox> {
        self.bodies.values().map(|b| observed_box(b, frame, map)).collect()
    }

    pub fn geometry(&self, frame: &FrameContext, map: &dyn ConformalMap) -> BoxGeometry {
        BoxGeometry::new(self.optical_boxes(frame, map))
    }

    /// Advance one fixed tick.
    ///
    /// Staged collision results are applied first, then every body steps,
    /// sleep states update, and queued contacts are resolved and staged.
    /// Bodies whose death the player has now seen are removed last.
    pub fn step(
        &mut self,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        geometry: &dyn Geometry,
        integrator: &mut dyn RigidBodyIntegrator,
    ) -> StepReport {
        let tick = self.tick + 1;
        let _span = tracing::info_span!("world_step", tick).entered();
        let mut report = StepReport {
            tick,
            ..StepReport::default()
        };

        for (collider, staged) in self.resolver.take_staged() {
            let Some(body) = self.bodies.get_mut(&collider) else {
                continue;
            };
            let was_sleeping = body.is_sleeping();
            let applied = body
                .set_velocity(staged.velocity, frame, map, &self.config, integrator)
                .and_then(|()| body.set_angular_velocity(staged.angular_velocity, frame, map, integrator));
            if let Err(err) = applied {
                tracing::warn!(%err, "discarded collision result");
                report.discarded += 1;
            }
            if was_sleeping && !body.is_sleeping() {
                self.event_log.push(WorldEvent::Woke { id: body.id() });
            }
        }

        for body in self.bodies.values_mut() {
            match body.fixed_step(frame, map, &self.config, integrator) {
                Ok(_) => report.stepped += 1,
                Err(err) => {
                    tracing::warn!(%err, "discarded fixed step");
                    report.discarded += 1;
                }
            }
        }

        for body in self.bodies.values_mut() {
            match update_sleep(body, geometry, frame, map, &self.config) {
                Some(SleepTransition::Slept) => self.event_log.push(WorldEvent::Slept { id: body.id() }),
                Some(SleepTransition::Woke) => self.event_log.push(WorldEvent::Woke { id: body.id() }),
                Some(SleepTransition::Reseated { .. }) | None => {}
            }
        }

        let resolved = self
            .resolver
            .resolve(&mut self.bodies, geometry, frame, map, &self.config);
        for collider in resolved.woken {
            if let Some(body) = self.bodies.get(&collider) {
                self.event_log.push(WorldEvent::Woke { id: body.id() });
            }
        }
        report.resolved = resolved.resolved.len();
        self.event_log
            .extend(resolved.resolved.into_iter().map(WorldEvent::ContactResolved));

        let retired: Vec<ColliderId> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.visibility() == Visibility::Retired)
            .map(|(&c, _)| c)
            .collect();
        for collider in retired {
            if let Some(body) = self.bodies.remove(&collider) {
                let id = body.id();
                self.colliders.remove(&id);
                self.event_log.push(WorldEvent::Retired { id, collider });
                report.retired.push(id);
            }
        }

        self.tick = tick;
        self.event_log.push(WorldEvent::Stepped { tick });
        tracing::debug!(
            stepped = report.stepped,
            resolved = report.resolved,
            discarded = report.discarded,
            "tick complete"
        );
        report
    }

    /// Presentation tick: what the player sees of every visible body.
    ///
    /// Mesh bodies are displaced at most once per call. Without a displacer,
    /// or when it fails, the body falls back to its contracted box and the
    /// problem is logged once.
    pub fn present(
        &mut self,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        mut displacer: Option<&mut dyn VertexDisplacer>,
    ) -> Vec<PresentedBody> {
        let _span = tracing::debug_span!("world_present", tick = self.tick).entered();
        let mut presented = Vec::with_capacity(self.bodies.len());
        for body in self.bodies.values() {
            if body.visibility() != Visibility::Visible {
                continue;
            }
            let vertices = match (body.mesh(), displacer.as_deref_mut()) {
                (Some(mesh), Some(displacer)) => {
                    let params = DisplacementParams::new(body, frame, map);
                    match displacer.displace(&params, map, mesh) {
                        Ok(v) if v.len() == mesh.len() => Some(v),
                        Ok(v) => {
                            let err = DisplacementError::VertexCountMismatch {
                                expected: mesh.len(),
                                got: v.len(),
                            };
                            warn_once(&mut self.displacer_warned, &err);
                            None
                        }
                        Err(err) => {
                            warn_once(&mut self.displacer_warned, &err);
                            None
                        }
                    }
                }
                (Some(_), None) => {
                    let err = DisplacementError::Unavailable("no displacer installed".into());
                    warn_once(&mut self.displacer_warned, &err);
                    None
                }
                (None, _) => None,
            };
            let observed = observed_box(body, frame, map);
            presented.push(PresentedBody {
                id: body.id(),
                collider: body.collider(),
                optical_position: observed.center,
                orientation: observed.rotation,
                half_extents: observed.half_extents,
                vertices,
            });
        }
        presented
    }

    /// Deterministic hash of tick and body kinematics, in collider order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mut mix = |bytes: &[u8]| {
            for &b in bytes {
                h ^= b as u64;
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&self.tick.to_le_bytes());
        for (collider, body) in &self.bodies {
            mix(&collider.0.to_le_bytes());
            for v in [body.position(), body.velocity(), body.angular_velocity()] {
                for x in v.to_array() {
                    mix(&x.to_le_bytes());
                }
            }
            mix(&body.local_time_offset().to_le_bytes());
        }
        h
    }
}

fn warn_once(warned: &mut bool, err: &DisplacementError) {
    if !*warned {
        tracing::warn!(%err, "mesh displacement unavailable, drawing bounding boxes");
        *warned = true;
    }
}

/// Where the player sees the body's bounding box, each axis contracted along
/// the body's velocity relative to the player.
fn observed_box(body: &RelativisticBody, frame: &FrameContext, map: &dyn ConformalMap) -> OrientedBox {
    let c = frame.speed_of_light();
    let v = relative_velocity(body.velocity(), frame.player_velocity(), c);
    let r = DMat3::from_quat(body.orientation());
    let h = body.half_extents();
    let half_extents = DVec3::new(
        contract_length_by(r.x_axis * h.x, v, c).length(),
        contract_length_by(r.y_axis * h.y, v, c).length(),
        contract_length_by(r.z_axis * h.z, v, c).length(),
    );
    OrientedBox {
        collider: body.collider(),
        center: body.optical_position(frame, map),
        half_extents,
        rotation: body.orientation(),
    }
}
