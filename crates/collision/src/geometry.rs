//! Ray queries against the observed collider shapes.
//!
//! # Invariants
//! - Penetration depths are never negative.
//! - A probe filtered to one collider never reports another.

use glam::{DQuat, DVec3};
use relativity_common::ColliderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayFilter {
    All,
    Only(ColliderId),
    Exclude(ColliderId),
}

impl RayFilter {
    pub fn accepts(self, collider: ColliderId) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => id == collider,
            Self::Exclude(id) => id != collider,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderId,
    pub distance: f64,
    pub point: DVec3,
    pub normal: DVec3,
}

/// Scene queries supplied by the host's collision detector.
pub trait Geometry {
    /// Closest hit along the unit `direction` within `max_distance`.
    fn raycast(&self, origin: DVec3, direction: DVec3, max_distance: f64, filter: RayFilter)
    -> Option<RayHit>;
}

/// Geometry with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyGeometry;

impl Geometry for EmptyGeometry {
    fn raycast(&self, _: DVec3, _: DVec3, _: f64, _: RayFilter) -> Option<RayHit> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub collider: ColliderId,
    pub center: DVec3,
    pub half_extents: DVec3,
    pub rotation: DQuat,
}

impl OrientedBox {
    /// Entry distance of the ray, or zero when it starts inside.
    fn raycast(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<RayHit> {
        let inverse = self.rotation.inverse();
        let o = inverse * (origin - self.center);
        let d = inverse * direction;
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;
        let mut near_axis = 0;
        for axis in 0..3 {
            let (oa, da, h) = (o[axis], d[axis], self.half_extents[axis]);
            if da.abs() < 1e-300 {
                if oa.abs() > h {
                    return None;
                }
                continue;
            }
            let (t0, t1) = ((-h - oa) / da, (h - oa) / da);
            let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            if t0 > t_near {
                t_near = t0;
                near_axis = axis;
            }
            t_far = t_far.min(t1);
        }
        if t_near > t_far || t_far < 0.0 {
            return None;
        }
        let distance = t_near.max(0.0);
        if distance > max_distance {
            return None;
        }
        let mut local_normal = DVec3::ZERO;
        local_normal[near_axis] = -d[near_axis].signum();
        Some(RayHit {
            collider: self.collider,
            distance,
            point: origin + direction * distance,
            normal: self.rotation * local_normal,
        })
    }
}

/// Brute-force ray queries over a set of boxes.
#[derive(Debug, Clone, Default)]
pub struct BoxGeometry {
    boxes: Vec<OrientedBox>,
}

impl BoxGeometry {
    pub fn new(boxes: Vec<OrientedBox>) -> Self {
        Self { boxes }
    }

    pub fn boxes(&self) -> &[OrientedBox] {
        &self.boxes
    }

    pub fn push(&mut self, b: OrientedBox) {
        self.boxes.push(b);
    }
}

impl Geometry for BoxGeometry {
    fn raycast(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_distance: f64,
        filter: RayFilter,
    ) -> Option<RayHit> {
        self.boxes
            .iter()
            .filter(|b| filter.accepts(b.collider))
            .filter_map(|b| b.raycast(origin, direction, max_distance))
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
    }
}

/// One side of a penetration probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSide {
    pub collider: ColliderId,
    /// Observed center.
    pub center: DVec3,
    /// Observed distance from the center to the surface along the contact
    /// normal.
    pub extent: f64,
    /// Largest bounding half extent.
    pub max_extent: f64,
}

/// Depth by which `a` and `b` overlap along `normal` (pointing from `b`
/// toward `a`).
///
/// Each collider is probed from behind the other body's center, starting
/// `margin_factor` bounding extents out; the deeper of the two readings wins.
pub fn penetration_depth(
    geometry: &dyn Geometry,
    a: &ProbeSide,
    b: &ProbeSide,
    normal: DVec3,
    margin_factor: f64,
) -> f64 {
    let start = margin_factor * a.max_extent.max(b.max_extent);
    let reach = 2.0 * start + a.extent + b.extent;

    let into_b = geometry
        .raycast(a.center + normal * start, -normal, reach, RayFilter::Only(b.collider))
        .map_or(0.0, |hit| start + a.extent - hit.distance);
    let into_a = geometry
        .raycast(b.center - normal * start, normal, reach, RayFilter::Only(a.collider))
        .map_or(0.0, |hit| start + b.extent - hit.distance);

    into_b.max(into_a).max(0.0)
}
