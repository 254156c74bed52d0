//! Per-pair contact state machine.
//!
//! Contact reports are queued during a tick and settled once, in the order
//! their pairs first reported. Resulting velocities are staged and only take
//! effect when the caller applies them at the start of the next tick.
//!
//! # Invariants
//! - Each pair is solved at most once per tick.
//! - A solve sees the velocities staged by solves settled before it in the
//!   same tick, never the sum of several.
//! - A sleeping body touched only by bodies at rest stays asleep.
//! - Static bodies never receive staged velocities.

use crate::contact::{ContactEvent, ContactKind, ContactQueue, PairKey};
use crate::geometry::{Geometry, ProbeSide, penetration_depth};
use crate::material::{combine, stiffness};
use crate::solver::{ContactBody, SolveInput, SolveMode, Velocities, solve};
use glam::DVec3;
use relativity_body::RelativisticBody;
use relativity_common::{ColliderId, SimConfig};
use relativity_frame::{
    ConformalMap, FrameContext, contract_length_by, inverse_contract_length_by, optical_to_world,
    relative_velocity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bodies addressable by collider handle.
pub trait BodySet {
    fn by_collider(&self, collider: ColliderId) -> Option<&RelativisticBody>;
    fn by_collider_mut(&mut self, collider: ColliderId) -> Option<&mut RelativisticBody>;
}

impl BodySet for BTreeMap<ColliderId, RelativisticBody> {
    fn by_collider(&self, collider: ColliderId) -> Option<&RelativisticBody> {
        self.get(&collider)
    }

    fn by_collider_mut(&mut self, collider: ColliderId) -> Option<&mut RelativisticBody> {
        self.get_mut(&collider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairState {
    #[default]
    NoContact,
    /// First contact this tick, solved with the restitution impulse.
    Entering,
    /// Sustained contact, solved with the penalty spring.
    Active,
    /// Separated, still inside the cool-down window.
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PairRecord {
    state: PairState,
    last_contact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveKind {
    Impulse,
    Penalty,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContact {
    pub a: ColliderId,
    pub b: ColliderId,
    pub kind: SolveKind,
    pub impulse: f64,
    pub penetration: f64,
    pub closing_rapidity: f64,
}

/// What one call to [`CollisionResolver::resolve`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    pub resolved: Vec<ResolvedContact>,
    pub woken: Vec<ColliderId>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    queue: ContactQueue,
    pairs: BTreeMap<PairKey, PairRecord>,
    staged: BTreeMap<ColliderId, Velocities>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, event: ContactEvent) {
        self.queue.push(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn pair_state(&self, a: ColliderId, b: ColliderId) -> PairState {
        self.pairs
            .get(&PairKey::new(a, b))
            .map_or(PairState::NoContact, |r| r.state)
    }

    /// Velocities staged for `collider`, if any.
    pub fn staged(&self, collider: ColliderId) -> Option<&Velocities> {
        self.staged.get(&collider)
    }

    /// Take the staged post-collision velocities, ordered by collider.
    pub fn take_staged(&mut self) -> Vec<(ColliderId, Velocities)> {
        std::mem::take(&mut self.staged).into_iter().collect()
    }

    /// Settle every queued contact against the current body states.
    pub fn resolve(
        &mut self,
        bodies: &mut dyn BodySet,
        geometry: &dyn Geometry,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        config: &SimConfig,
    ) -> ResolveReport {
        let now = frame.total_time();
        let cooldown = config.contact_cooldown;
        self.pairs
            .retain(|_, r| r.state != PairState::Resolved || r.last_contact + cooldown > now);

        let mut report = ResolveReport::default();
        for event in self.queue.drain() {
            if self.settle(&event, bodies, geometry, frame, map, config, &mut report).is_none() {
                report.skipped += 1;
            }
        }
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn settle(
        &mut self,
        event: &ContactEvent,
        bodies: &mut dyn BodySet,
        geometry: &dyn Geometry,
        frame: &FrameContext,
        map: &dyn ConformalMap,
        config: &SimConfig,
        report: &mut ResolveReport,
    ) -> Option<()> {
        let (a, b) = (event.a, event.b);
        let key = PairKey::new(a, b);
        let now = frame.total_time();
        if a == b {
            return None;
        }
        if event.kind == ContactKind::Exit {
            if let Some(record) = self.pairs.get_mut(&key) {
                record.state = PairState::Resolved;
                record.last_contact = now;
            }
            tracing::debug!(?a, ?b, "contact ended");
            return Some(());
        }

        let (Some(body_a), Some(body_b)) = (bodies.by_collider(a), bodies.by_collider(b)) else {
            tracing::debug!(?a, ?b, "contact with unknown collider");
            return None;
        };
        if body_a.is_static() && body_b.is_static() {
            tracing::debug!(?a, ?b, "contact between static bodies");
            return None;
        }

        let cooldown = config.contact_cooldown;
        let cooled = body_a.recently_contacted(b, now, cooldown) || body_b.recently_contacted(a, now, cooldown);
        let previous = self.pairs.get(&key).map(|r| r.state).unwrap_or_default();
        let first = event.kind == ContactKind::Enter && !cooled;
        let state = if first { PairState::Entering } else { PairState::Active };
        self.pairs.insert(
            key,
            PairRecord {
                state,
                last_contact: now,
            },
        );
        tracing::debug!(?a, ?b, ?previous, ?state, "contact");

        let both_at_rest = self.is_resting(body_a) && self.is_resting(body_b);
        let a_at_rest = body_a.is_sleeping();
        let b_at_rest = body_b.is_sleeping();
        let point = event.representative();
        if point.is_none() {
            tracing::debug!(?a, ?b, "empty contact manifold");
            return None;
        }

        let input = match point {
            Some(point) if !both_at_rest => {
                let c = frame.speed_of_light();
                let combined = if first {
                    combine(body_a.material(), a_at_rest, body_b.material(), b_at_rest)
                } else {
                    combine(body_a.material(), true, body_b.material(), true)
                };
                let k = stiffness(combined.restitution, &config.solver);
                let side = |body: &RelativisticBody| ProbeSide {
                    collider: body.collider(),
                    center: body.optical_position(frame, map),
                    extent: body.support_extent(contract_length_by(
                        point.normal,
                        relative_velocity(body.velocity(), frame.player_velocity(), c),
                        c,
                    )),
                    max_extent: body.half_extents().max_element(),
                };
                let penetration = penetration_depth(
                    geometry,
                    &side(body_a),
                    &side(body_b),
                    point.normal,
                    config.solver.probe_margin_factor,
                );
                let mode = if first {
                    SolveMode::Impulse {
                        restitution: combined.restitution,
                    }
                } else {
                    SolveMode::Penalty {
                        dtau: frame.fixed_delta_time() * body_a.time_factor(frame, map),
                    }
                };
                Some(SolveInput {
                    a: self.contact_body(body_a, point.point, frame, map),
                    b: self.contact_body(body_b, point.point, frame, map),
                    normal: point.normal,
                    friction: combined.friction,
                    stiffness: k,
                    penetration,
                    mode,
                })
            }
            _ => None,
        };

        let capacity = config.recent_contact_capacity;
        for (this, other) in [(a, b), (b, a)] {
            let Some(body) = bodies.by_collider_mut(this) else {
                continue;
            };
            if event.kind == ContactKind::Enter {
                body.record_contact(other, now, capacity);
            }
            if !both_at_rest && body.is_sleeping() {
                body.wake();
                report.woken.push(this);
                tracing::debug!(collider = ?this, "woken by contact");
            }
        }

        let Some(input) = input else {
            return Some(());
        };
        let limit = (frame.max_speed() - config.speed_epsilon).max(0.0);
        let Some(out) = solve(&input, &config.solver, frame.speed_of_light(), limit) else {
            return Some(());
        };
        for (collider, velocities, is_static) in [
            (a, out.a, input.a.inverse_mass == 0.0),
            (b, out.b, input.b.inverse_mass == 0.0),
        ] {
            if !is_static {
                self.staged.insert(collider, velocities);
            }
        }
        report.resolved.push(ResolvedContact {
            a,
            b,
            kind: if first { SolveKind::Impulse } else { SolveKind::Penalty },
            impulse: out.impulse,
            penetration: input.penetration,
            closing_rapidity: out.closing_rapidity,
        });
        Some(())
    }

    /// At rest, and not set moving by a contact settled earlier this tick.
    fn is_resting(&self, body: &RelativisticBody) -> bool {
        body.is_at_rest()
            && self
                .staged
                .get(&body.collider())
                .is_none_or(|v| v.velocity == DVec3::ZERO && v.angular_velocity == DVec3::ZERO)
    }

    /// Snapshot of `body` at the contact, using any velocities already staged
    /// for it this tick.
    fn contact_body(
        &self,
        body: &RelativisticBody,
        optical_point: DVec3,
        frame: &FrameContext,
        map: &dyn ConformalMap,
    ) -> ContactBody {
        let c = frame.speed_of_light();
        let contact = optical_to_world(optical_point, body.velocity(), frame, map);
        let lever = inverse_contract_length_by(contact - body.position(), body.velocity(), c);
        let current = Velocities {
            velocity: body.velocity(),
            angular_velocity: body.angular_velocity(),
        };
        let v = self.staged.get(&body.collider()).copied().unwrap_or(current);
        ContactBody {
            velocity: v.velocity,
            angular_velocity: v.angular_velocity,
            inverse_mass: body.inverse_mass(),
            inverse_inertia: body.inverse_inertia_world(),
            lever,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactPoint;
    use crate::geometry::{BoxGeometry, EmptyGeometry, OrientedBox};
    use crate::solver::{line_of_action, relative_contact_rapidity};
    use relativity_body::{BodyDesc, NullIntegrator};
    use relativity_common::{BodyId, PhysicsMaterial};
    use relativity_frame::{FrameParams, Minkowski, velocity_to_rapidity};

    fn frame(c: f64) -> FrameContext {
        FrameContext::new(FrameParams {
            speed_of_light: c,
            max_speed: 0.99 * c,
            ..FrameParams::default()
        })
        .unwrap()
    }

    fn spawn(
        bodies: &mut BTreeMap<ColliderId, RelativisticBody>,
        collider: u64,
        desc: BodyDesc,
        f: &FrameContext,
    ) -> ColliderId {
        let id = ColliderId(collider);
        let body = RelativisticBody::new(BodyId::new(), id, desc, f, &SimConfig::default()).unwrap();
        bodies.insert(id, body);
        id
    }

    fn touching(kind: ContactKind, a: ColliderId, b: ColliderId, point: DVec3, normal: DVec3) -> ContactEvent {
        ContactEvent::new(kind, a, b, vec![ContactPoint { point, normal }])
    }

    fn optical_boxes(bodies: &BTreeMap<ColliderId, RelativisticBody>, f: &FrameContext) -> BoxGeometry {
        BoxGeometry::new(
            bodies
                .values()
                .map(|body| OrientedBox {
                    collider: body.collider(),
                    center: body.optical_position(f, &Minkowski),
                    half_extents: body.half_extents(),
                    rotation: body.orientation(),
                })
                .collect(),
        )
    }

    fn elastic() -> PhysicsMaterial {
        PhysicsMaterial::frictionless(1.0)
    }

    #[test]
    fn head_on_pair_swaps_velocities() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let a = spawn(&mut bodies, 1, BodyDesc {
            position: DVec3::new(-0.5, 0.0, 0.0),
            velocity: DVec3::new(2.0, 0.0, 0.0),
            material: elastic(),
            ..BodyDesc::default()
        }, &f);
        let b = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(0.5, 0.0, 0.0),
            velocity: DVec3::new(-2.0, 0.0, 0.0),
            material: elastic(),
            ..BodyDesc::default()
        }, &f);
        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, a, b, DVec3::ZERO, -DVec3::X));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());

        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.resolved[0].kind, SolveKind::Impulse);
        assert_eq!(resolver.pair_state(a, b), PairState::Entering);
        let staged = resolver.take_staged();
        assert_eq!(staged.len(), 2);
        assert!((staged[0].1.velocity - DVec3::new(-2.0, 0.0, 0.0)).length() < 1e-6);
        assert!((staged[1].1.velocity - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        // staged, not applied
        assert_eq!(bodies[&a].velocity(), DVec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn duplicate_reports_solve_once() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let a = spawn(&mut bodies, 1, BodyDesc {
            position: DVec3::new(-0.5, 0.0, 0.0),
            velocity: DVec3::new(2.0, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        let b = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(0.5, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, a, b, DVec3::ZERO, -DVec3::X));
        resolver.submit(touching(ContactKind::Enter, b, a, DVec3::ZERO, DVec3::X));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());
        assert_eq!(report.resolved.len(), 1);
    }

    #[test]
    fn sleeping_body_ignores_contact_from_body_at_rest() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let sleeper = spawn(&mut bodies, 1, BodyDesc::default(), &f);
        let still = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(1.0, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        bodies.get_mut(&sleeper).unwrap().fall_asleep();

        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, sleeper, still, DVec3::new(0.5, 0.0, 0.0), -DVec3::X));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());
        assert!(bodies[&sleeper].is_sleeping());
        assert!(report.woken.is_empty());
        assert!(resolver.take_staged().is_empty());
    }

    #[test]
    fn sleeping_body_wakes_when_hit_by_moving_body() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let sleeper = spawn(&mut bodies, 1, BodyDesc::default(), &f);
        let mover = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(1.0, 0.0, 0.0),
            velocity: DVec3::new(-3.0, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        bodies.get_mut(&sleeper).unwrap().fall_asleep();

        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, sleeper, mover, DVec3::new(0.5, 0.0, 0.0), -DVec3::X));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());
        assert!(!bodies[&sleeper].is_sleeping());
        assert_eq!(report.woken, vec![sleeper]);
        // pushed away from the mover
        assert!(resolver.staged(sleeper).unwrap().velocity.x < 0.0);
    }

    #[test]
    fn unknown_and_empty_contacts_are_skipped() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let a = spawn(&mut bodies, 1, BodyDesc {
            velocity: DVec3::X,
            ..BodyDesc::default()
        }, &f);
        let b = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(1.0, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, a, ColliderId(99), DVec3::ZERO, DVec3::Y));
        resolver.submit(ContactEvent::new(ContactKind::Enter, a, b, vec![]));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());
        assert_eq!(report.skipped, 2);
        assert!(report.resolved.is_empty());
    }

    #[test]
    fn repeated_enter_within_cooldown_collapses_to_active() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let a = spawn(&mut bodies, 1, BodyDesc {
            position: DVec3::new(-0.5, 0.0, 0.0),
            velocity: DVec3::new(1.0, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        let b = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(0.5, 0.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        let config = SimConfig::default();
        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, a, b, DVec3::ZERO, -DVec3::X));
        resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &config);
        resolver.take_staged();

        resolver.submit(touching(ContactKind::Exit, a, b, DVec3::ZERO, -DVec3::X));
        let later = f.advanced();
        resolver.resolve(&mut bodies, &EmptyGeometry, &later, &Minkowski, &config);
        assert_eq!(resolver.pair_state(a, b), PairState::Resolved);

        resolver.submit(touching(ContactKind::Enter, a, b, DVec3::ZERO, -DVec3::X));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &later.advanced(), &Minkowski, &config);
        assert_eq!(resolver.pair_state(a, b), PairState::Active);
        // no penetration, so the penalty spring has nothing to push
        assert!(report.resolved.is_empty());

        let expired = FrameContext::new(FrameParams {
            total_time: 5.0,
            ..*f.params()
        })
        .unwrap();
        resolver.submit(touching(ContactKind::Exit, a, b, DVec3::ZERO, -DVec3::X));
        resolver.resolve(&mut bodies, &EmptyGeometry, &expired, &Minkowski, &config);
        resolver.resolve(&mut bodies, &EmptyGeometry, &expired.advanced(), &Minkowski, &config);
        assert_eq!(resolver.pair_state(a, b), PairState::Resolved);
        let much_later = FrameContext::new(FrameParams {
            total_time: 6.0,
            ..*f.params()
        })
        .unwrap();
        resolver.resolve(&mut bodies, &EmptyGeometry, &much_later, &Minkowski, &config);
        assert_eq!(resolver.pair_state(a, b), PairState::NoContact);
    }

    #[test]
    fn first_contact_hands_off_to_penalty_without_gaining_speed() {
        let f = frame(1000.0);
        let config = SimConfig::default();
        let mut bodies = BTreeMap::new();
        let floor = spawn(&mut bodies, 1, BodyDesc {
            position: DVec3::new(0.0, -0.5, 0.0),
            half_extents: DVec3::new(5.0, 0.5, 5.0),
            is_static: true,
            ..BodyDesc::default()
        }, &f);
        let block = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(0.0, 0.49, 0.0),
            velocity: DVec3::new(0.0, -2.0, 0.0),
            ..BodyDesc::default()
        }, &f);
        let mut resolver = CollisionResolver::new();

        let geometry = optical_boxes(&bodies, &f);
        resolver.submit(touching(ContactKind::Enter, block, floor, DVec3::ZERO, DVec3::Y));
        let first = resolver.resolve(&mut bodies, &geometry, &f, &Minkowski, &config);
        assert_eq!(first.resolved.len(), 1);
        let entry = first.resolved[0];
        assert_eq!(entry.kind, SolveKind::Impulse);
        assert!(entry.penetration > 0.0);
        assert!(entry.closing_rapidity > 0.0);

        // next tick: apply the staged result, then report the contact as sustained
        let next = f.advanced();
        for (collider, v) in resolver.take_staged() {
            let body = bodies.get_mut(&collider).unwrap();
            body.set_velocity(v.velocity, &next, &Minkowski, &config, &mut NullIntegrator)
                .unwrap();
        }
        let bounced = bodies[&block].velocity();
        assert!(bounced.y > 0.0);

        let geometry = optical_boxes(&bodies, &next);
        resolver.submit(touching(ContactKind::Stay, block, floor, DVec3::ZERO, DVec3::Y));
        let second = resolver.resolve(&mut bodies, &geometry, &next, &Minkowski, &config);
        assert_eq!(resolver.pair_state(block, floor), PairState::Active);
        for contact in &second.resolved {
            assert_eq!(contact.kind, SolveKind::Penalty);
            assert!(contact.closing_rapidity <= entry.closing_rapidity);
        }
        let after = resolver
            .staged(block)
            .map_or(bounced, |v| v.velocity);
        assert!(after.y <= bounced.y + 1e-9);

        let n = line_of_action(DVec3::Y, after, 1000.0).unwrap();
        let snapshot = |v: DVec3| ContactBody {
            velocity: v,
            angular_velocity: DVec3::ZERO,
            inverse_mass: 1.0,
            inverse_inertia: glam::DMat3::IDENTITY,
            lever: DVec3::new(0.0, -0.5, 0.0),
        };
        let still = ContactBody {
            inverse_mass: 0.0,
            ..snapshot(DVec3::ZERO)
        };
        let closing_after = relative_contact_rapidity(&snapshot(after), &still, n, 1000.0).dot(n);
        assert!(closing_after <= entry.closing_rapidity);
        assert!(closing_after < velocity_to_rapidity(DVec3::new(0.0, 2.0, 0.0), 1000.0).y);
    }

    #[test]
    fn pair_entering_and_leaving_in_one_tick_is_still_solved() {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let a = spawn(&mut bodies, 1, BodyDesc {
            position: DVec3::new(-0.5, 0.0, 0.0),
            velocity: DVec3::new(2.0, 0.0, 0.0),
            material: elastic(),
            ..BodyDesc::default()
        }, &f);
        let b = spawn(&mut bodies, 2, BodyDesc {
            position: DVec3::new(0.5, 0.0, 0.0),
            velocity: DVec3::new(-2.0, 0.0, 0.0),
            material: elastic(),
            ..BodyDesc::default()
        }, &f);
        let mut resolver = CollisionResolver::new();
        resolver.submit(touching(ContactKind::Enter, a, b, DVec3::ZERO, -DVec3::X));
        resolver.submit(ContactEvent::new(ContactKind::Exit, a, b, vec![]));
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());

        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.resolved[0].kind, SolveKind::Impulse);
        assert_eq!(report.skipped, 0);
        assert_eq!(resolver.pair_state(a, b), PairState::Resolved);
        assert!((resolver.staged(a).unwrap().velocity - DVec3::new(-2.0, 0.0, 0.0)).length() < 1e-6);
        assert!((resolver.staged(b).unwrap().velocity - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
    }

    /// A moves into B, which rests against C. Returns the staged velocities
    /// of A, B and C after settling the two contacts in the given order.
    fn cradle(middle_first: bool) -> ([Option<DVec3>; 3], ResolveReport, [DVec3; 3]) {
        let f = frame(1000.0);
        let mut bodies = BTreeMap::new();
        let desc = |x: f64, vx: f64| BodyDesc {
            position: DVec3::new(x, 0.0, 0.0),
            velocity: DVec3::new(vx, 0.0, 0.0),
            material: elastic(),
            ..BodyDesc::default()
        };
        let a = spawn(&mut bodies, 1, desc(-1.0, 2.0), &f);
        let b = spawn(&mut bodies, 2, desc(0.0, 0.0), &f);
        let c = spawn(&mut bodies, 3, desc(1.0, 0.0), &f);
        let hit = touching(ContactKind::Enter, a, b, DVec3::new(-0.5, 0.0, 0.0), -DVec3::X);
        let rest = touching(ContactKind::Enter, b, c, DVec3::new(0.5, 0.0, 0.0), -DVec3::X);

        let mut resolver = CollisionResolver::new();
        if middle_first {
            resolver.submit(rest);
            resolver.submit(hit);
        } else {
            resolver.submit(hit);
            resolver.submit(rest);
        }
        let report = resolver.resolve(&mut bodies, &EmptyGeometry, &f, &Minkowski, &SimConfig::default());
        let staged = [a, b, c].map(|id| resolver.staged(id).map(|v| v.velocity));
        let current = [a, b, c].map(|id| bodies[&id].velocity());
        (staged, report, current)
    }

    #[test]
    fn contacts_on_one_body_chain_through_staged_velocities() {
        let (staged, report, current) = cradle(false);
        assert_eq!(report.resolved.len(), 2);
        // B picked up A's speed and passed it straight on to C
        let [a, b, c] = staged.map(Option::unwrap);
        assert!(a.length() < 1e-6);
        assert!(b.length() < 1e-6, "B staged {b}");
        assert!((c - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        // nothing is applied before the next step
        assert_eq!(current, [DVec3::new(2.0, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO]);
    }

    #[test]
    fn resting_pair_settled_first_sees_no_motion() {
        let (staged, report, current) = cradle(true);
        // B and C were both at rest when their contact settled
        assert_eq!(report.resolved.len(), 1);
        assert!(staged[0].unwrap().length() < 1e-6);
        assert!((staged[1].unwrap() - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(staged[2], None);
        assert_eq!(current, [DVec3::new(2.0, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO]);
    }
}
