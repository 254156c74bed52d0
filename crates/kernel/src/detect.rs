//! Minimal contact detector over observed bounding boxes.
//!
//! Stands in for a host physics engine in demos and tests. Every pair is
//! tested each tick (`O(n²)`); pairs come out ordered by `(min, max)`
//! collider id. Touching faces count as contact.

use glam::DVec3;
use relativity_collision::{ContactEvent, ContactKind, ContactPoint, OrientedBox, PairKey};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min: DVec3,
    max: DVec3,
}

impl Bounds {
    fn of(b: &OrientedBox) -> Self {
        let r = glam::DMat3::from_quat(b.rotation);
        let h = r.x_axis.abs() * b.half_extents.x
            + r.y_axis.abs() * b.half_extents.y
            + r.z_axis.abs() * b.half_extents.z;
        Self {
            min: b.center - h,
            max: b.center + h,
        }
    }

    /// Per-axis overlap; negative on a separated axis.
    fn overlap(&self, other: &Self) -> DVec3 {
        self.max.min(other.max) - self.min.max(other.min)
    }
}

/// Reports `Enter`, `Stay` and `Exit` from frame-to-frame box overlap.
#[derive(Debug, Clone, Default)]
pub struct AabbContactDetector {
    touching: BTreeSet<PairKey>,
}

impl AabbContactDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touching(&self) -> usize {
        self.touching.len()
    }

    pub fn detect(&mut self, boxes: &[OrientedBox]) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        let mut now = BTreeSet::new();
        let mut sorted: Vec<&OrientedBox> = boxes.iter().collect();
        sorted.sort_by_key(|b| b.collider);

        for (i, a) in sorted.iter().enumerate() {
            let ba = Bounds::of(a);
            for b in &sorted[i + 1..] {
                let bb = Bounds::of(b);
                let overlap = ba.overlap(&bb);
                if overlap.min_element() < 0.0 {
                    continue;
                }
                let key = PairKey::new(a.collider, b.collider);
                now.insert(key);
                let kind = if self.touching.contains(&key) {
                    ContactKind::Stay
                } else {
                    ContactKind::Enter
                };
                events.push(ContactEvent::new(kind, a.collider, b.collider, vec![contact(&ba, &bb, overlap, a, b)]));
            }
        }
        for &key in self.touching.difference(&now) {
            events.push(ContactEvent::new(ContactKind::Exit, key.0, key.1, Vec::new()));
        }
        self.touching = now;
        events
    }
}

/// Center of the overlap region, normal along the axis of least overlap
/// pointing from `b` toward `a`.
fn contact(ba: &Bounds, bb: &Bounds, overlap: DVec3, a: &OrientedBox, b: &OrientedBox) -> ContactPoint {
    let axis = if overlap.x <= overlap.y && overlap.x <= overlap.z {
        0
    } else if overlap.y <= overlap.z {
        1
    } else {
        2
    };
    let mut normal = DVec3::ZERO;
    normal[axis] = if a.center[axis] >= b.center[axis] { 1.0 } else { -1.0 };
    let point = (ba.min.max(bb.min) + ba.max.min(bb.max)) * 0.5;
    ContactPoint { point, normal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;
    use relativity_common::ColliderId;

    fn cube(collider: u64, center: DVec3) -> OrientedBox {
        OrientedBox {
            collider: ColliderId(collider),
            center,
            half_extents: DVec3::splat(0.5),
            rotation: DQuat::IDENTITY,
        }
    }

    #[test]
    fn enter_stay_exit_sequence() {
        let mut detector = AabbContactDetector::new();
        let apart = [cube(1, DVec3::ZERO), cube(2, DVec3::new(2.0, 0.0, 0.0))];
        assert!(detector.detect(&apart).is_empty());

        let touching = [cube(1, DVec3::ZERO), cube(2, DVec3::new(0.9, 0.0, 0.0))];
        let events = detector.detect(&touching);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ContactKind::Enter);
        let p = events[0].points[0];
        assert_eq!(p.normal, -DVec3::X);
        assert!((p.point - DVec3::new(0.45, 0.0, 0.0)).length() < 1e-12);

        assert_eq!(detector.detect(&touching)[0].kind, ContactKind::Stay);
        let events = detector.detect(&apart);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ContactKind::Exit);
        assert_eq!(detector.touching(), 0);
    }

    #[test]
    fn resting_box_touches_floor_from_above() {
        let floor = OrientedBox {
            collider: ColliderId(1),
            center: DVec3::new(0.0, -0.5, 0.0),
            half_extents: DVec3::new(10.0, 0.5, 10.0),
            rotation: DQuat::IDENTITY,
        };
        let mut detector = AabbContactDetector::new();
        let events = detector.detect(&[cube(2, DVec3::new(0.0, 0.5, 0.0)), floor]);
        assert_eq!(events.len(), 1);
        // a is the floor (lower id); normal points from the box toward it
        assert_eq!(events[0].a, ColliderId(1));
        assert_eq!(events[0].points[0].normal, -DVec3::Y);
    }
}
