//! Pointer intersection router — per-device spatial queries, cursor and
//! ray visual state, hover haptics, and press/release forwarding.
//!
//! Each registered input device runs one query per frame (straight ray
//! from the device's target-ray pose, or a sphere volume at a
//! device-anchored point). Candidates pass through an optional
//! caller-supplied filter, are sorted ascending by distance, and index 0
//! becomes authoritative: it places the cursor, clamps the ray visual,
//! and receives presses. Devices are fully independent.

use std::collections::HashMap;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::trace;

use crate::joints::Handedness;
use crate::scene::{InteractiveScene, Intersection, Ray};

/// Host-assigned input device identifier.
pub type DeviceId = u32;

/// Candidate filter: runs over raw sorted hits before the router picks
/// the authoritative one (e.g. restrict to teleport surfaces, drop
/// clipped candidates).
pub type IntersectionFilter =
    Box<dyn FnMut(Vec<Intersection>, &InteractiveScene) -> Vec<Intersection>>;

// ── Config ─────────────────────────────────────────────────

/// Tunables shared by all devices on one router.
#[derive(Debug, Clone)]
pub struct PointerConfig {
    /// Cursor offset along the hit normal, avoiding z-fighting. The right
    /// hand uses 1.5× this value so overlapping cursors keep a stable
    /// depth order.
    pub cursor_offset: f32,
    /// Ray visual length when nothing is hit.
    pub max_ray_length: f32,
    /// Hover-enter pulse intensity (0-1).
    pub haptic_intensity: f32,
    /// Hover-enter pulse duration in milliseconds.
    pub haptic_duration_ms: f32,
    /// Probe radius for sphere (volume) queries.
    pub sphere_radius: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            cursor_offset: 0.01,
            max_ray_length: 10.0,
            haptic_intensity: 0.5,
            haptic_duration_ms: 30.0,
            sphere_radius: 0.07,
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// Events produced by per-frame updates and press/release forwarding.
#[derive(Debug)]
pub enum PointerEvent {
    /// Full sorted candidate list for this frame's query.
    Intersections {
        device: DeviceId,
        hits: Vec<Intersection>,
    },
    /// One-shot pulse on the no-hit → hit transition.
    HapticPulse {
        device: DeviceId,
        intensity: f32,
        duration_ms: f32,
    },
    /// Select/squeeze press, forwarded to the authoritative hit (if any).
    Press {
        device: DeviceId,
        target: Option<Intersection>,
    },
    /// Select/squeeze release.
    Release {
        device: DeviceId,
        target: Option<Intersection>,
    },
}

// ── Visual state ───────────────────────────────────────────

/// Cursor placement for one device, refreshed every query.
#[derive(Debug, Clone)]
pub struct CursorPose {
    pub visible: bool,
    pub position: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
}

impl Default for CursorPose {
    fn default() -> Self {
        Self {
            visible: false,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

// ── Per-device state ───────────────────────────────────────

struct DeviceState {
    handedness: Handedness,
    pressed: bool,
    was_intersected: bool,
    current: Option<Intersection>,
    cursor: CursorPose,
    ray_length: f32,
    filter: Option<IntersectionFilter>,
}

impl DeviceState {
    fn new(handedness: Handedness, max_ray_length: f32) -> Self {
        Self {
            handedness,
            pressed: false,
            was_intersected: false,
            current: None,
            cursor: CursorPose::default(),
            ray_length: max_ray_length,
            filter: None,
        }
    }
}

// ── Router ─────────────────────────────────────────────────

/// Routes spatial queries and discrete actions for all input devices.
pub struct PointerRouter {
    pub config: PointerConfig,
    devices: HashMap<DeviceId, DeviceState>,
}

impl PointerRouter {
    pub fn new(config: PointerConfig) -> Self {
        Self {
            config,
            devices: HashMap::new(),
        }
    }

    /// Register a device. Re-registering resets its state.
    pub fn register_device(&mut self, device: DeviceId, handedness: Handedness) {
        self.devices.insert(
            device,
            DeviceState::new(handedness, self.config.max_ray_length),
        );
    }

    pub fn unregister_device(&mut self, device: DeviceId) {
        self.devices.remove(&device);
    }

    /// Install a candidate filter for one device.
    pub fn set_filter(&mut self, device: DeviceId, filter: IntersectionFilter) {
        if let Some(state) = self.devices.get_mut(&device) {
            state.filter = Some(filter);
        }
    }

    /// Per-frame straight-ray query for a device.
    pub fn update_ray(
        &mut self,
        device: DeviceId,
        ray: &Ray,
        scene: &InteractiveScene,
    ) -> Vec<PointerEvent> {
        let hits = scene.cast_ray(ray);
        self.consume_hits(device, hits, scene)
    }

    /// Per-frame sphere-volume query for a device.
    pub fn update_sphere(
        &mut self,
        device: DeviceId,
        center: Point3<f32>,
        scene: &InteractiveScene,
    ) -> Vec<PointerEvent> {
        let hits = scene.cast_sphere(center, self.config.sphere_radius);
        self.consume_hits(device, hits, scene)
    }

    /// No tracking data for this device this frame: nothing is visible
    /// or interactive until the next update.
    pub fn clear(&mut self, device: DeviceId) {
        if let Some(state) = self.devices.get_mut(&device) {
            state.current = None;
            state.was_intersected = false;
            state.cursor.visible = false;
            state.ray_length = self.config.max_ray_length;
        }
    }

    fn consume_hits(
        &mut self,
        device: DeviceId,
        hits: Vec<Intersection>,
        scene: &InteractiveScene,
    ) -> Vec<PointerEvent> {
        let Some(state) = self.devices.get_mut(&device) else {
            return Vec::new();
        };

        let hits = match state.filter.as_mut() {
            Some(filter) => filter(hits, scene),
            None => hits,
        };

        let mut events = Vec::new();

        // Hover haptics: edge-triggered on empty -> non-empty.
        let intersected = !hits.is_empty();
        if intersected && !state.was_intersected {
            trace!("device {device}: hover enter");
            events.push(PointerEvent::HapticPulse {
                device,
                intensity: self.config.haptic_intensity,
                duration_ms: self.config.haptic_duration_ms,
            });
        }
        state.was_intersected = intersected;

        // Visual state from the authoritative hit.
        match hits.first() {
            Some(best) => {
                state.cursor.visible = true;
                state.cursor.position = best.point;
                if let Some(normal) = best.normal {
                    let orientation =
                        UnitQuaternion::rotation_between(&Vector3::z(), &normal)
                            .unwrap_or_else(|| {
                                UnitQuaternion::from_axis_angle(
                                    &Vector3::x_axis(),
                                    std::f32::consts::PI,
                                )
                            });
                    state.cursor.orientation = orientation;
                    let scale = match state.handedness {
                        Handedness::Left => 1.0,
                        Handedness::Right => 1.5,
                    };
                    state.cursor.position += normal * (self.config.cursor_offset * scale);
                }
                state.ray_length = self.config.max_ray_length.min(best.distance);
                state.current = Some(best.clone());
            }
            None => {
                state.cursor.visible = false;
                state.ray_length = self.config.max_ray_length;
                state.current = None;
            }
        }

        events.push(PointerEvent::Intersections { device, hits });
        events
    }

    /// Discrete press action (select/trigger or squeeze/grip). Forwarded
    /// to the current authoritative hit; without one the press still
    /// surfaces for directly subscribed listeners.
    pub fn press(&mut self, device: DeviceId) -> Option<PointerEvent> {
        let state = self.devices.get_mut(&device)?;
        state.pressed = true;
        Some(PointerEvent::Press {
            device,
            target: state.current.clone(),
        })
    }

    /// Discrete release action.
    pub fn release(&mut self, device: DeviceId) -> Option<PointerEvent> {
        let state = self.devices.get_mut(&device)?;
        state.pressed = false;
        Some(PointerEvent::Release {
            device,
            target: state.current.clone(),
        })
    }

    /// Whether the device is currently pressed.
    pub fn is_pressed(&self, device: DeviceId) -> bool {
        self.devices.get(&device).is_some_and(|s| s.pressed)
    }

    /// The device's current authoritative hit.
    pub fn current_intersection(&self, device: DeviceId) -> Option<&Intersection> {
        self.devices.get(&device)?.current.as_ref()
    }

    /// Cursor visual state for a device.
    pub fn cursor(&self, device: DeviceId) -> Option<&CursorPose> {
        self.devices.get(&device).map(|s| &s.cursor)
    }

    /// Clamped ray visual length for a device.
    pub fn ray_length(&self, device: DeviceId) -> Option<f32> {
        self.devices.get(&device).map(|s| s.ray_length)
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{facing_quad, Geometry};
    use nalgebra::Isometry3;

    fn scene_with_quads(distances: &[f32]) -> InteractiveScene {
        let mut scene = InteractiveScene::new();
        for d in distances {
            let (t, g) = facing_quad(-d, 1.0);
            scene.add_node(t, g);
        }
        scene
    }

    fn forward_ray() -> Ray {
        Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0))
    }

    fn router_with_device(handedness: Handedness) -> PointerRouter {
        let mut router = PointerRouter::new(PointerConfig::default());
        router.register_device(1, handedness);
        router
    }

    fn hits_of(events: &[PointerEvent]) -> &[Intersection] {
        events
            .iter()
            .find_map(|e| match e {
                PointerEvent::Intersections { hits, .. } => Some(hits.as_slice()),
                _ => None,
            })
            .expect("intersections event")
    }

    #[test]
    fn test_nearest_hit_is_authoritative() {
        let scene = scene_with_quads(&[3.0, 1.0, 2.0]);
        let mut router = router_with_device(Handedness::Left);

        let events = router.update_ray(1, &forward_ray(), &scene);
        let hits = hits_of(&events);
        assert_eq!(hits.len(), 3);
        assert!((hits[0].distance - 1.0).abs() < 1e-5);

        let current = router.current_intersection(1).unwrap();
        assert!((current.distance - 1.0).abs() < 1e-5);

        // Cursor sits at the hit point, pushed off the surface.
        let cursor = router.cursor(1).unwrap();
        assert!(cursor.visible);
        assert!((cursor.position.x - 0.0).abs() < 1e-5);
        assert!((cursor.position.z - (-1.0 + 0.01)).abs() < 1e-4);
    }

    #[test]
    fn test_right_hand_cursor_offset_is_larger() {
        let scene = scene_with_quads(&[1.0]);

        let mut left = router_with_device(Handedness::Left);
        left.update_ray(1, &forward_ray(), &scene);
        let left_z = left.cursor(1).unwrap().position.z;

        let mut right = router_with_device(Handedness::Right);
        right.update_ray(1, &forward_ray(), &scene);
        let right_z = right.cursor(1).unwrap().position.z;

        assert!((left_z - (-1.0 + 0.01)).abs() < 1e-4);
        assert!((right_z - (-1.0 + 0.015)).abs() < 1e-4);
    }

    #[test]
    fn test_ray_length_clamps_to_nearest_hit() {
        let scene = scene_with_quads(&[2.5]);
        let mut router = router_with_device(Handedness::Left);

        assert_eq!(router.ray_length(1), Some(10.0));
        router.update_ray(1, &forward_ray(), &scene);
        assert!((router.ray_length(1).unwrap() - 2.5).abs() < 1e-5);

        let empty = InteractiveScene::new();
        router.update_ray(1, &forward_ray(), &empty);
        assert_eq!(router.ray_length(1), Some(10.0));
        assert!(!router.cursor(1).unwrap().visible);
    }

    #[test]
    fn test_haptic_pulse_fires_on_enter_edge_only() {
        let scene = scene_with_quads(&[1.0]);
        let empty = InteractiveScene::new();
        let mut router = router_with_device(Handedness::Left);

        let count_pulses = |events: &[PointerEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, PointerEvent::HapticPulse { .. }))
                .count()
        };

        // Frame 1: no hits.
        let e1 = router.update_ray(1, &forward_ray(), &empty);
        assert_eq!(count_pulses(&e1), 0);

        // Frame 2: enter — exactly one pulse with the configured shape.
        let e2 = router.update_ray(1, &forward_ray(), &scene);
        assert_eq!(count_pulses(&e2), 1);
        let pulse = e2
            .iter()
            .find(|e| matches!(e, PointerEvent::HapticPulse { .. }))
            .unwrap();
        if let PointerEvent::HapticPulse {
            intensity,
            duration_ms,
            ..
        } = pulse
        {
            assert!((intensity - 0.5).abs() < 1e-6);
            assert!((duration_ms - 30.0).abs() < 1e-6);
        }

        // Frame 3: still intersecting — no pulse.
        let e3 = router.update_ray(1, &forward_ray(), &scene);
        assert_eq!(count_pulses(&e3), 0);

        // Leave and re-enter — pulses again.
        router.update_ray(1, &forward_ray(), &empty);
        let e5 = router.update_ray(1, &forward_ray(), &scene);
        assert_eq!(count_pulses(&e5), 1);
    }

    #[test]
    fn test_filter_restricts_candidates() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(1.0, 1.0);
        let near = scene.add_node(t, g);
        let (t, g) = facing_quad(2.0, 1.0);
        let far = scene.add_node(t, g);
        // Quads sit at +z; cast backwards so both are hit.
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));

        let mut router = router_with_device(Handedness::Left);
        let keep = far;
        router.set_filter(
            1,
            Box::new(move |hits, _scene| hits.into_iter().filter(|h| h.node == keep).collect()),
        );

        let events = router.update_ray(1, &ray, &scene);
        let hits = hits_of(&events);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, far);
        assert_ne!(hits[0].node, near);
        assert_eq!(router.current_intersection(1).unwrap().node, far);
    }

    #[test]
    fn test_press_forwards_to_current_target() {
        let scene = scene_with_quads(&[1.0]);
        let mut router = router_with_device(Handedness::Left);
        router.update_ray(1, &forward_ray(), &scene);

        let press = router.press(1).unwrap();
        assert!(router.is_pressed(1));
        match press {
            PointerEvent::Press { target: Some(t), .. } => {
                assert!((t.distance - 1.0).abs() < 1e-5);
            }
            other => panic!("expected targeted press, got {other:?}"),
        }

        let release = router.release(1).unwrap();
        assert!(!router.is_pressed(1));
        assert!(matches!(
            release,
            PointerEvent::Release { target: Some(_), .. },
        ));
    }

    #[test]
    fn test_press_without_intersection_has_no_target() {
        let mut router = router_with_device(Handedness::Left);
        let empty = InteractiveScene::new();
        router.update_ray(1, &forward_ray(), &empty);

        // Still delivered, just untargeted.
        let press = router.press(1).unwrap();
        assert!(matches!(press, PointerEvent::Press { target: None, .. }));
    }

    #[test]
    fn test_sphere_query_uses_config_radius() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-0.05, 1.0);
        scene.add_node(t, g);

        let mut router = router_with_device(Handedness::Left);
        let events = router.update_sphere(1, Point3::origin(), &scene);
        assert_eq!(hits_of(&events).len(), 1);

        router.config.sphere_radius = 0.01;
        let events = router.update_sphere(1, Point3::origin(), &scene);
        assert!(hits_of(&events).is_empty());
    }

    #[test]
    fn test_clear_resets_hover_state() {
        let scene = scene_with_quads(&[1.0]);
        let mut router = router_with_device(Handedness::Left);

        router.update_ray(1, &forward_ray(), &scene);
        assert!(router.current_intersection(1).is_some());

        router.clear(1);
        assert!(router.current_intersection(1).is_none());
        assert!(!router.cursor(1).unwrap().visible);

        // Tracking resumes over the same target: hover-enter fires again.
        let events = router.update_ray(1, &forward_ray(), &scene);
        assert!(events
            .iter()
            .any(|e| matches!(e, PointerEvent::HapticPulse { .. })));
    }

    #[test]
    fn test_unknown_device_is_ignored() {
        let scene = scene_with_quads(&[1.0]);
        let mut router = PointerRouter::new(PointerConfig::default());
        assert!(router.update_ray(9, &forward_ray(), &scene).is_empty());
        assert!(router.press(9).is_none());
        assert!(router.cursor(9).is_none());
    }
}
