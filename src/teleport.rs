//! Teleport aiming state machine.
//!
//! While armed (select held), a downward-arcing curve is cast from the
//! aiming device into the scene each frame; only nodes tagged as teleport
//! targets count. Releasing commits the locomotion: the destination keeps
//! the aimed point's height and subtracts the camera's horizontal offset
//! within the local reference space, so the user's head lands over the
//! aimed point rather than the space origin.

use std::f32::consts::{FRAC_PI_2, PI};

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use tracing::debug;

use crate::joints::Handedness;
use crate::scene::{InteractiveScene, Intersection};

/// Segment count of the aiming curve (21 sampled points).
pub const CURVE_SEGMENTS: usize = 20;

/// Steepest downward aim allowed, radians about x.
const MIN_AIM_PITCH: f32 = -FRAC_PI_2;
/// Highest upward aim allowed, radians about x.
const MAX_AIM_PITCH: f32 = 1.1 * PI / 4.0;

/// Yaw correction applied to hand aiming, outward per handedness.
const HAND_YAW_OFFSET: f32 = 20.0 * PI / 180.0;
/// Pitch correction applied to hand aiming (wrists rest tilted up).
const HAND_PITCH_OFFSET: f32 = -10.0 * PI / 180.0;

// ── Aim curve ──────────────────────────────────────────────

/// Sample the aiming curve in device-local space: a quadratic Bézier from
/// the origin through (0, 0, -8) to (0, -20, -15), `segments + 1` points.
pub fn teleport_curve(segments: usize) -> Vec<Point3<f32>> {
    let p0 = Point3::new(0.0, 0.0, 0.0);
    let p1 = Point3::new(0.0, 0.0, -8.0);
    let p2 = Point3::new(0.0, -20.0, -15.0);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            let v = (p0.coords * (u * u)) + (p1.coords * (2.0 * u * t)) + (p2.coords * (t * t));
            Point3::from(v)
        })
        .collect()
}

/// Constrain a raw device orientation into a usable aiming orientation:
/// roll is discarded and pitch is clamped so the curve can neither flip
/// backward over the shoulder nor aim too far skyward. Hand aiming gets
/// an additional fixed yaw/pitch correction for the wrist's resting tilt.
pub fn clamp_aim(
    orientation: &UnitQuaternion<f32>,
    hand: Option<Handedness>,
) -> UnitQuaternion<f32> {
    let (mut yaw, mut pitch) = yaw_pitch(orientation);
    if let Some(handedness) = hand {
        yaw += match handedness {
            Handedness::Right => HAND_YAW_OFFSET,
            Handedness::Left => -HAND_YAW_OFFSET,
        };
        pitch += HAND_PITCH_OFFSET;
    }
    pitch = pitch.clamp(MIN_AIM_PITCH, MAX_AIM_PITCH);
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch)
}

/// Yaw-then-pitch decomposition (roll dropped).
fn yaw_pitch(orientation: &UnitQuaternion<f32>) -> (f32, f32) {
    let m = orientation.to_rotation_matrix().into_inner();
    let m12 = m[(1, 2)].clamp(-1.0, 1.0);
    let pitch = (-m12).asin();
    let yaw = if m12.abs() < 0.999_999 {
        m[(0, 2)].atan2(m[(2, 2)])
    } else {
        (-m[(2, 0)]).atan2(m[(0, 0)])
    };
    (yaw, pitch)
}

// ── State machine ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeleportPhase {
    Idle,
    Aiming,
}

/// Per-device teleport machine. Armed by select start, aimed every frame,
/// committed (or silently dropped) by select end.
pub struct TeleportMachine {
    hand: Option<Handedness>,
    phase: TeleportPhase,
    local_curve: Vec<Point3<f32>>,
    segment_lengths: Vec<f32>,
    candidate: Option<Intersection>,
    indicator_fraction: f32,
}

impl TeleportMachine {
    /// `hand` enables the hand-aiming wrist correction; `None` is
    /// controller aiming.
    pub fn new(hand: Option<Handedness>) -> Self {
        let local_curve = teleport_curve(CURVE_SEGMENTS);
        let segment_lengths = local_curve
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .collect();
        Self {
            hand,
            phase: TeleportPhase::Idle,
            local_curve,
            segment_lengths,
            candidate: None,
            indicator_fraction: 1.0,
        }
    }

    /// Begin aiming (select start).
    pub fn arm(&mut self) {
        self.phase = TeleportPhase::Aiming;
    }

    /// Abort an aim without committing (tracking loss, device removal).
    pub fn cancel(&mut self) {
        self.phase = TeleportPhase::Idle;
        self.candidate = None;
        self.indicator_fraction = 1.0;
    }

    pub fn is_aiming(&self) -> bool {
        self.phase == TeleportPhase::Aiming
    }

    /// Current teleport candidate, if the curve lands on an eligible node.
    pub fn candidate(&self) -> Option<&Intersection> {
        self.candidate.as_ref()
    }

    /// Fraction of the curve to render, in (0, 1]: the curve visually
    /// stops at the hit rather than passing through it.
    pub fn indicator_fraction(&self) -> f32 {
        self.indicator_fraction
    }

    /// Re-aim from this frame's device pose. No-op while idle.
    pub fn update(
        &mut self,
        device_pose: &Isometry3<f32>,
        scene: &InteractiveScene,
    ) -> Option<&Intersection> {
        if self.phase != TeleportPhase::Aiming {
            self.candidate = None;
            self.indicator_fraction = 1.0;
            return None;
        }

        let aim = Isometry3::from_parts(
            device_pose.translation,
            clamp_aim(&device_pose.rotation, self.hand),
        );
        let world_curve: Vec<Point3<f32>> = self
            .local_curve
            .iter()
            .map(|p| aim.transform_point(p))
            .collect();

        let hit = scene
            .cast_polyline(&world_curve)
            .into_iter()
            .find(|hit| scene.is_teleport_target(hit.node));

        match &hit {
            Some(hit) => {
                let index = hit.line_index.unwrap_or(0);
                let offset = hit.distance_on_line.unwrap_or(0.0);
                let length = self.segment_lengths[index].max(f32::EPSILON);
                self.indicator_fraction =
                    (index as f32 + offset / length) / (self.local_curve.len() - 1) as f32;
            }
            None => self.indicator_fraction = 1.0,
        }
        self.candidate = hit;
        self.candidate.as_ref()
    }

    /// End aiming (select end). With a candidate under the curve, returns
    /// the locomotion destination: the aimed point minus the camera's
    /// horizontal offset in the local reference space. Without one, or
    /// while idle, returns `None`.
    pub fn release(&mut self, camera_local_position: &Point3<f32>) -> Option<Point3<f32>> {
        if self.phase != TeleportPhase::Aiming {
            return None;
        }
        self.phase = TeleportPhase::Idle;
        self.indicator_fraction = 1.0;
        let candidate = self.candidate.take()?;
        let destination = Point3::new(
            candidate.point.x - camera_local_position.x,
            candidate.point.y,
            candidate.point.z - camera_local_position.z,
        );
        debug!(
            "teleport commit: aimed {:?} -> destination {:?}",
            candidate.point, destination,
        );
        Some(destination)
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Geometry, NodeId};

    fn ground_scene(tagged: bool) -> (InteractiveScene, NodeId) {
        let mut scene = InteractiveScene::new();
        // Large disc at y = 0 facing up.
        let up = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let pad = scene.add_node(
            Isometry3::from_parts(Vector3::new(0.0, 0.0, 0.0).into(), up),
            Geometry::Circle { radius: 50.0 },
        );
        scene.set_teleport_target(pad, tagged);
        (scene, pad)
    }

    fn standing_pose() -> Isometry3<f32> {
        Isometry3::translation(0.0, 1.6, 0.0)
    }

    #[test]
    fn test_curve_shape() {
        let points = teleport_curve(CURVE_SEGMENTS);
        assert_eq!(points.len(), 21);
        assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(points[20], Point3::new(0.0, -20.0, -15.0));
        // Monotonically forward and eventually steeply down.
        assert!(points[10].z < points[1].z);
        assert!(points[20].y < points[10].y);
    }

    #[test]
    fn test_aim_lands_on_tagged_ground() {
        let (scene, pad) = ground_scene(true);
        let mut machine = TeleportMachine::new(None);

        machine.arm();
        let hit = machine.update(&standing_pose(), &scene).expect("candidate");
        assert_eq!(hit.node, pad);
        assert!(hit.point.y.abs() < 1e-3, "hit should be on the ground");
        assert!(hit.point.z < 0.0, "hit should be in front");
        assert!(machine.indicator_fraction() > 0.0 && machine.indicator_fraction() < 1.0);
    }

    #[test]
    fn test_untagged_geometry_is_not_a_candidate() {
        let (scene, _) = ground_scene(false);
        let mut machine = TeleportMachine::new(None);

        machine.arm();
        assert!(machine.update(&standing_pose(), &scene).is_none());
        assert_eq!(machine.indicator_fraction(), 1.0);

        // Releasing over nothing commits nothing.
        assert!(machine.release(&Point3::new(0.0, 1.6, 0.0)).is_none());
        assert!(!machine.is_aiming());
    }

    #[test]
    fn test_release_subtracts_horizontal_camera_offset() {
        let (scene, _) = ground_scene(true);
        let mut machine = TeleportMachine::new(None);

        machine.arm();
        let aimed = machine.update(&standing_pose(), &scene).unwrap().point;

        let camera = Point3::new(0.3, 1.6, 0.2);
        let destination = machine.release(&camera).expect("commit");
        assert!((destination.x - (aimed.x - 0.3)).abs() < 1e-5);
        assert!((destination.z - (aimed.z - 0.2)).abs() < 1e-5);
        // Height comes from the aimed point, not the camera.
        assert!((destination.y - aimed.y).abs() < 1e-5);
    }

    #[test]
    fn test_exactly_one_commit_per_aim() {
        let (scene, _) = ground_scene(true);
        let mut machine = TeleportMachine::new(None);

        machine.arm();
        machine.update(&standing_pose(), &scene);
        let camera = Point3::new(0.0, 1.6, 0.0);
        assert!(machine.release(&camera).is_some());
        // Candidate consumed; further releases are inert.
        assert!(machine.release(&camera).is_none());
        assert!(machine.candidate().is_none());
    }

    #[test]
    fn test_release_while_idle_is_none() {
        let (scene, _) = ground_scene(true);
        let mut machine = TeleportMachine::new(None);
        // Never armed: updates are no-ops and release commits nothing.
        assert!(machine.update(&standing_pose(), &scene).is_none());
        assert!(machine.release(&Point3::origin()).is_none());
    }

    #[test]
    fn test_update_while_idle_clears_candidate() {
        let (scene, _) = ground_scene(true);
        let mut machine = TeleportMachine::new(None);

        machine.arm();
        machine.update(&standing_pose(), &scene);
        assert!(machine.candidate().is_some());

        machine.release(&Point3::origin());
        assert!(machine.update(&standing_pose(), &scene).is_none());
        assert!(machine.candidate().is_none());
    }

    #[test]
    fn test_cancel_drops_aim_without_commit() {
        let (scene, _) = ground_scene(true);
        let mut machine = TeleportMachine::new(None);

        machine.arm();
        machine.update(&standing_pose(), &scene);
        assert!(machine.candidate().is_some());

        machine.cancel();
        assert!(!machine.is_aiming());
        assert!(machine.candidate().is_none());
        assert!(machine.release(&Point3::origin()).is_none());
    }

    #[test]
    fn test_aim_pitch_clamped() {
        // Aiming straight up is pulled back to the pitch ceiling.
        let up = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        let clamped = clamp_aim(&up, None);
        let (_, pitch) = yaw_pitch(&clamped);
        assert!((pitch - MAX_AIM_PITCH).abs() < 1e-4, "pitch {pitch}");

        // Straight down stays within range.
        let down = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2 + 0.1);
        let (_, pitch) = yaw_pitch(&clamp_aim(&down, None));
        assert!((pitch - (-FRAC_PI_2 + 0.1)).abs() < 1e-4);
    }

    #[test]
    fn test_aim_roll_discarded() {
        let rolled = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.8);
        let clamped = clamp_aim(&rolled, None);
        // A pure roll reduces to an identity aim.
        assert!(clamped.angle() < 1e-4, "residual angle {}", clamped.angle());
    }

    #[test]
    fn test_hand_aim_offsets_mirror_by_handedness() {
        let identity = UnitQuaternion::identity();
        let (left_yaw, left_pitch) = yaw_pitch(&clamp_aim(&identity, Some(Handedness::Left)));
        let (right_yaw, right_pitch) = yaw_pitch(&clamp_aim(&identity, Some(Handedness::Right)));
        assert!((left_yaw + right_yaw).abs() < 1e-4, "yaw should mirror");
        assert!((left_pitch - right_pitch).abs() < 1e-4);
        assert!((right_yaw - HAND_YAW_OFFSET).abs() < 1e-4);
        assert!((left_pitch - HAND_PITCH_OFFSET).abs() < 1e-4);
    }
}
