//! Per-frame hand sampling — wrist-relative normalization of joint
//! transforms.
//!
//! The platform delivers one world-space rigid transform per joint per
//! frame. A `HandSample` re-expresses every joint relative to the wrist,
//! removing the hand's global position and orientation so samples from
//! different frames (and different users) compare purely by finger shape.

use nalgebra::{Matrix4, Rotation3, UnitQuaternion};
use tracing::debug;

use crate::joints::{HandJoint, JOINT_COUNT};

/// A 4×4 rigid transform for one joint, as supplied by the platform.
pub type JointTransform = Matrix4<f32>;

// ── Hand sample ────────────────────────────────────────────

/// One frame's worth of wrist-relative joint transforms.
///
/// Invariant: the wrist entry (index 0) is exactly the identity after
/// construction. Owned by the caller; never aliased across frames.
#[derive(Debug, Clone)]
pub struct HandSample {
    matrices: Vec<Matrix4<f32>>,
}

impl HandSample {
    /// Build a sample from per-joint world transforms in the fixed joint
    /// ordering (wrist first).
    ///
    /// Returns `None` when any joint pose is missing or the wrist
    /// transform is degenerate — tracking loss invalidates the whole
    /// frame, so partial samples are never produced.
    pub fn capture(joints: &[Option<JointTransform>]) -> Option<Self> {
        if joints.len() != JOINT_COUNT {
            debug!(
                "hand sample: expected {} joints, got {}",
                JOINT_COUNT,
                joints.len(),
            );
            return None;
        }
        if joints.iter().any(|j| j.is_none()) {
            // Tracking loss on at least one joint; skip this frame.
            return None;
        }

        let wrist = joints[0].as_ref().unwrap();
        let inverted_wrist = match wrist.try_inverse() {
            Some(inv) => inv,
            None => {
                debug!("hand sample: wrist transform not invertible");
                return None;
            }
        };

        let matrices = joints
            .iter()
            .map(|j| inverted_wrist * j.as_ref().unwrap())
            .collect();
        Some(Self { matrices })
    }

    /// Number of joints in this sample.
    pub fn joint_count(&self) -> usize {
        self.matrices.len()
    }

    /// Wrist-relative transform for a joint.
    pub fn joint(&self, joint: HandJoint) -> &Matrix4<f32> {
        &self.matrices[joint.index()]
    }

    /// Wrist-relative transform by raw index.
    pub fn joint_at(&self, index: usize) -> &Matrix4<f32> {
        &self.matrices[index]
    }

    /// Wrist-relative transform looked up by joint name.
    ///
    /// Panics on a name outside the fixed joint list; asking for an
    /// unknown joint is a programming error, not a runtime condition.
    pub fn joint_by_name(&self, name: &str) -> &Matrix4<f32> {
        let joint = HandJoint::from_name(name)
            .unwrap_or_else(|| panic!("unknown hand joint name: {name:?}"));
        self.joint(joint)
    }

    /// Rotation component of a joint's wrist-relative transform.
    pub fn rotation_at(&self, index: usize) -> UnitQuaternion<f32> {
        rotation_of(&self.matrices[index])
    }
}

/// Extract the rotation component of a rigid transform.
pub(crate) fn rotation_of(m: &Matrix4<f32>) -> UnitQuaternion<f32> {
    let r = m.fixed_view::<3, 3>(0, 0).into_owned();
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r))
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
pub(crate) fn test_world_joints(
    wrist: Matrix4<f32>,
    make: impl Fn(usize) -> Matrix4<f32>,
) -> Vec<Option<JointTransform>> {
    (0..JOINT_COUNT)
        .map(|i| Some(if i == 0 { wrist } else { wrist * make(i) }))
        .collect()
}

// ── Tests ──────────────────────────────────────────────────
