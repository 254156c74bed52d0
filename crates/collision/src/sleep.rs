use crate::geometry::{Geometry, RayFilter};
use glam::DVec3;
use relativity_body::RelativisticBody;
use relativity_common::SimConfig;
use relativity_frame::{ConformalMap, FrameContext};

/// Gap below a body still counted as touching its support.
pub const SUPPORT_SKIN: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SleepTransition {
    Slept,
    /// A sleeping body was moved back onto its support.
    Reseated { from: DVec3, to: DVec3 },
    /// A sleeping body lost its support.
    Woke,
}

fn support_probe(
    body: &RelativisticBody,
    geometry: &dyn Geometry,
    frame: &FrameContext,
    map: &dyn ConformalMap,
    down: DVec3,
    max_distance: f64,
) -> Option<f64> {
    let origin = body.optical_position(frame, map);
    geometry
        .raycast(origin, down, max_distance, RayFilter::Exclude(body.collider()))
        .map(|hit| hit.distance - body.support_extent(down))
}

/// Put slow bodies to sleep and keep sleeping ones seated.
///
/// A body with gravity only sleeps when something supports it from below.
pub fn update_sleep(
    body: &mut RelativisticBody,
    geometry: &dyn Geometry,
    frame: &FrameContext,
    map: &dyn ConformalMap,
    config: &SimConfig,
) -> Option<SleepTransition> {
    if body.is_static() {
        return None;
    }
    let down = config.gravity.try_normalize().filter(|_| body.use_gravity());

    if !body.is_sleeping() {
        if body.slow_steps() < config.sleep_frame_delay {
            return None;
        }
        if let Some(down) = down {
            let reach = body.support_extent(down) + SUPPORT_SKIN;
            support_probe(body, geometry, frame, map, down, reach)?;
        }
        body.fall_asleep();
        tracing::debug!(body = ?body.id(), "body fell asleep");
        return Some(SleepTransition::Slept);
    }

    let down = down?;
    if config.reseat_interval == 0 || body.steps_asleep() == 0 || body.steps_asleep() % config.reseat_interval != 0 {
        return None;
    }
    let gap = support_probe(body, geometry, frame, map, down, config.reseat_max_distance);
    match gap {
        Some(gap) if gap <= SUPPORT_SKIN => {
            if gap.abs() <= f64::EPSILON {
                return None;
            }
            let from = body.position();
            let to = from + down * gap;
            body.reseat(to);
            tracing::debug!(body = ?body.id(), gap, "re-seated sleeping body");
            Some(SleepTransition::Reseated { from, to })
        }
        _ => {
            body.wake();
            tracing::debug!(body = ?body.id(), "sleeping body lost its support");
            Some(SleepTransition::Woke)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoxGeometry, EmptyGeometry, OrientedBox};
    use glam::DQuat;
    use relativity_body::{BodyDesc, NullIntegrator};
    use relativity_common::{BodyId, ColliderId};
    use relativity_frame::Minkowski;

    fn floor() -> OrientedBox {
        OrientedBox {
            collider: ColliderId(1),
            center: DVec3::new(0.0, -0.5, 0.0),
            half_extents: DVec3::new(10.0, 0.5, 10.0),
            rotation: DQuat::IDENTITY,
        }
    }

    fn resting_body(y: f64, use_gravity: bool) -> RelativisticBody {
        RelativisticBody::new(
            BodyId::new(),
            ColliderId(2),
            BodyDesc {
                position: DVec3::new(0.0, y, 0.0),
                use_gravity,
                ..BodyDesc::default()
            },
            &FrameContext::default(),
            &SimConfig::default(),
        )
        .unwrap()
    }

    /// Step without gravity so the body stays put while counting slow steps.
    fn settle(body: &mut RelativisticBody, steps: u32) {
        let frame = FrameContext::default();
        let config = SimConfig {
            gravity: DVec3::ZERO,
            ..SimConfig::default()
        };
        for _ in 0..steps {
            body.fixed_step(&frame, &Minkowski, &config, &mut NullIntegrator)
                .unwrap();
        }
    }

    #[test]
    fn supported_body_sleeps_after_delay() {
        let config = SimConfig::default();
        let mut body = resting_body(0.5, true);
        let geometry = BoxGeometry::new(vec![floor()]);
        let frame = FrameContext::default();
        settle(&mut body, 2);
        assert_eq!(update_sleep(&mut body, &geometry, &frame, &Minkowski, &config), None);
        settle(&mut body, 1);
        assert_eq!(
            update_sleep(&mut body, &geometry, &frame, &Minkowski, &config),
            Some(SleepTransition::Slept)
        );
        assert!(body.is_sleeping());
    }

    #[test]
    fn unsupported_gravity_body_stays_awake() {
        let config = SimConfig::default();
        let mut body = resting_body(3.0, true);
        let frame = FrameContext::default();
        settle(&mut body, 5);
        let geometry = BoxGeometry::new(vec![floor()]);
        assert_eq!(update_sleep(&mut body, &geometry, &frame, &Minkowski, &config), None);
        assert!(!body.is_sleeping());
    }

    #[test]
    fn weightless_body_sleeps_without_support() {
        let config = SimConfig::default();
        let mut body = resting_body(3.0, false);
        let frame = FrameContext::default();
        settle(&mut body, 3);
        assert_eq!(
            update_sleep(&mut body, &EmptyGeometry, &frame, &Minkowski, &config),
            Some(SleepTransition::Slept)
        );
    }

    #[test]
    fn sleeping_body_is_reseated_onto_support() {
        let config = SimConfig {
            reseat_interval: 2,
            ..SimConfig::default()
        };
        let mut body = resting_body(0.505, true);
        let geometry = BoxGeometry::new(vec![floor()]);
        let frame = FrameContext::default();
        settle(&mut body, 3);
        assert_eq!(
            update_sleep(&mut body, &geometry, &frame, &Minkowski, &config),
            Some(SleepTransition::Slept)
        );
        settle(&mut body, 2);
        let transition = update_sleep(&mut body, &geometry, &frame, &Minkowski, &config);
        assert!(matches!(transition, Some(SleepTransition::Reseated { .. })));
        assert!((body.position().y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sleeping_body_wakes_when_support_vanishes() {
        let config = SimConfig {
            reseat_interval: 1,
            ..SimConfig::default()
        };
        let mut body = resting_body(0.5, true);
        let frame = FrameContext::default();
        settle(&mut body, 3);
        update_sleep(&mut body, &BoxGeometry::new(vec![floor()]), &frame, &Minkowski, &config);
        assert!(body.is_sleeping());
        settle(&mut body, 1);
        assert_eq!(
            update_sleep(&mut body, &EmptyGeometry, &frame, &Minkowski, &config),
            Some(SleepTransition::Woke)
        );
        assert!(!body.is_sleeping());
    }
}
