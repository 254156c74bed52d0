use glam::DVec3;
use relativity_common::ColliderId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    Enter,
    Stay,
    Exit,
}

/// One point of a contact manifold, in optical (observed) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub point: DVec3,
    /// Unit normal pointing from `b` toward `a`.
    pub normal: DVec3,
}

/// A contact report from the broad phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub kind: ContactKind,
    pub a: ColliderId,
    pub b: ColliderId,
    pub points: Vec<ContactPoint>,
}

impl ContactEvent {
    pub fn new(kind: ContactKind, a: ColliderId, b: ColliderId, points: Vec<ContactPoint>) -> Self {
        Self { kind, a, b, points }
    }

    /// Averaged point and renormalized summed normal. `None` for an empty or
    /// degenerate manifold.
    pub fn representative(&self) -> Option<ContactPoint> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let point = self.points.iter().map(|p| p.point).sum::<DVec3>() / n;
        let normal = self
            .points
            .iter()
            .map(|p| p.normal)
            .sum::<DVec3>()
            .try_normalize()?;
        Some(ContactPoint { point, normal })
    }

    /// The same contact seen from `b`.
    pub fn flipped(&self) -> Self {
        Self {
            kind: self.kind,
            a: self.b,
            b: self.a,
            points: self
                .points
                .iter()
                .map(|p| ContactPoint {
                    point: p.point,
                    normal: -p.normal,
                })
                .collect(),
        }
    }
}

/// Unordered collider pair, stored smallest id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey(pub ColliderId, pub ColliderId);

impl PairKey {
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Contact events collected during one tick.
///
/// Each pair appears once, at the position of its first report. A later
/// `Enter` for the same pair replaces a `Stay`, and an `Exit` replaces a
/// `Stay`. An `Exit` after an `Enter` keeps the `Enter` and its manifold, and
/// the pair drains as that `Enter` followed by an `Exit`.
#[derive(Debug, Clone, Default)]
pub struct ContactQueue {
    events: Vec<ContactEvent>,
    /// Slots whose `Enter` separated again within the tick.
    exiting: BTreeSet<usize>,
    index: BTreeMap<PairKey, usize>,
}

impl ContactQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ContactEvent) {
        let key = PairKey::new(event.a, event.b);
        let Some(&slot) = self.index.get(&key) else {
            self.index.insert(key, self.events.len());
            self.events.push(event);
            return;
        };
        if event.kind == ContactKind::Enter {
            self.exiting.remove(&slot);
        }
        let queued = &mut self.events[slot];
        let same_orientation = queued.a == event.a;
        match (queued.kind, event.kind) {
            (ContactKind::Enter, ContactKind::Exit) => {
                self.exiting.insert(slot);
            }
            (ContactKind::Enter, ContactKind::Stay) if self.exiting.contains(&slot) => {}
            (_, ContactKind::Exit) | (ContactKind::Exit, ContactKind::Enter) => *queued = event,
            (ContactKind::Exit, ContactKind::Stay) => {}
            (ContactKind::Stay, ContactKind::Enter) => {
                let mut points = if same_orientation {
                    std::mem::take(&mut queued.points)
                } else {
                    queued.flipped().points
                };
                points.extend(event.points);
                *queued = ContactEvent { points, ..event };
            }
            _ => {
                let event = if same_orientation { event } else { event.flipped() };
                queued.points.extend(event.points);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take this tick's events in first-arrival order.
    pub fn drain(&mut self) -> Vec<ContactEvent> {
        self.index.clear();
        let exiting = std::mem::take(&mut self.exiting);
        let mut drained = Vec::with_capacity(self.events.len() + exiting.len());
        for (slot, event) in std::mem::take(&mut self.events).into_iter().enumerate() {
            let exit = exiting
                .contains(&slot)
                .then(|| ContactEvent::new(ContactKind::Exit, event.a, event.b, Vec::new()));
            drained.push(event);
            drained.extend(exit);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, normal: DVec3) -> ContactPoint {
        ContactPoint {
            point: DVec3::new(x, 0.0, 0.0),
            normal,
        }
    }

    #[test]
    fn representative_averages_points() {
        let event = ContactEvent::new(
            ContactKind::Enter,
            ColliderId(1),
            ColliderId(2),
            vec![point(0.0, DVec3::Y), point(2.0, DVec3::new(0.0, 1.0, 1.0))],
        );
        let rep = event.representative().unwrap();
        assert_eq!(rep.point, DVec3::new(1.0, 0.0, 0.0));
        assert!((rep.normal.length() - 1.0).abs() < 1e-12);
        assert!(rep.normal.y > rep.normal.z);
    }

    #[test]
    fn empty_or_cancelling_manifold_has_no_representative() {
        let empty = ContactEvent::new(ContactKind::Stay, ColliderId(1), ColliderId(2), vec![]);
        assert!(empty.representative().is_none());
        let cancelling = ContactEvent::new(
            ContactKind::Stay,
            ColliderId(1),
            ColliderId(2),
            vec![point(0.0, DVec3::Y), point(1.0, -DVec3::Y)],
        );
        assert!(cancelling.representative().is_none());
    }

    #[test]
    fn queue_merges_pairs_and_prefers_enter() {
        let mut queue = ContactQueue::new();
        queue.push(ContactEvent::new(ContactKind::Stay, ColliderId(5), ColliderId(1), vec![point(0.0, DVec3::X)]));
        queue.push(ContactEvent::new(ContactKind::Enter, ColliderId(2), ColliderId(3), vec![]));
        queue.push(ContactEvent::new(ContactKind::Enter, ColliderId(1), ColliderId(5), vec![point(1.0, -DVec3::X)]));
        assert_eq!(queue.len(), 2);
        let events = queue.drain();
        assert_eq!(events[0].kind, ContactKind::Enter);
        assert_eq!((events[0].a, events[0].b), (ColliderId(1), ColliderId(5)));
        // the earlier point was flipped into the new orientation
        assert_eq!(events[0].points.len(), 2);
        assert!(events[0].points.iter().all(|p| p.normal == -DVec3::X));
        assert_eq!((events[1].a, events[1].b), (ColliderId(2), ColliderId(3)));
        assert!(queue.is_empty());
    }

    #[test]
    fn exit_after_enter_keeps_the_enter() {
        let mut queue = ContactQueue::new();
        queue.push(ContactEvent::new(ContactKind::Enter, ColliderId(1), ColliderId(2), vec![point(0.0, DVec3::X)]));
        queue.push(ContactEvent::new(ContactKind::Exit, ColliderId(1), ColliderId(2), vec![]));
        queue.push(ContactEvent::new(ContactKind::Stay, ColliderId(2), ColliderId(1), vec![point(0.0, -DVec3::X)]));
        assert_eq!(queue.len(), 1);
        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ContactKind::Enter);
        assert_eq!(events[0].points, vec![point(0.0, DVec3::X)]);
        assert_eq!(events[1].kind, ContactKind::Exit);
        assert_eq!((events[1].a, events[1].b), (ColliderId(1), ColliderId(2)));
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn reentering_cancels_a_pending_exit() {
        let mut queue = ContactQueue::new();
        queue.push(ContactEvent::new(ContactKind::Enter, ColliderId(1), ColliderId(2), vec![point(0.0, DVec3::X)]));
        queue.push(ContactEvent::new(ContactKind::Exit, ColliderId(2), ColliderId(1), vec![]));
        queue.push(ContactEvent::new(ContactKind::Enter, ColliderId(2), ColliderId(1), vec![point(1.0, -DVec3::X)]));
        let events = queue.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ContactKind::Enter);
        assert_eq!(events[0].points.len(), 2);
        assert!(events[0].points.iter().all(|p| p.normal == DVec3::X));
    }

    #[test]
    fn exit_overrides_sustained_contact() {
        let mut queue = ContactQueue::new();
        queue.push(ContactEvent::new(ContactKind::Stay, ColliderId(1), ColliderId(2), vec![point(0.0, DVec3::X)]));
        queue.push(ContactEvent::new(ContactKind::Exit, ColliderId(1), ColliderId(2), vec![]));
        queue.push(ContactEvent::new(ContactKind::Stay, ColliderId(2), ColliderId(1), vec![]));
        let events = queue.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ContactKind::Exit);
    }

    #[test]
    fn pair_key_is_unordered() {
        assert_eq!(PairKey::new(ColliderId(9), ColliderId(2)), PairKey::new(ColliderId(2), ColliderId(9)));
    }
}
