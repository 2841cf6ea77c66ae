//! Reference poses and the hand-pose distance metric.
//!
//! A reference pose is an authored hand shape stored as a binary blob:
//! a joint count, one wrist-relative rotation matrix per joint, and one
//! weight per joint. The distance metric compares a live `HandSample`
//! against a reference by weighted mean angular deviation of the joint
//! rotations — rotation-only by design, since hand shape is carried by
//! joint orientation alone.

use nalgebra::{Matrix4, Quaternion, UnitQuaternion};
use thiserror::Error;

use crate::sample::{rotation_of, HandSample};

/// Seed for the weight denominator, so all-zero weights never divide by zero.
const WEIGHT_EPSILON: f32 = 1e-4;

/// Largest joint count accepted from a blob. Guards against garbage input
/// allocating unbounded memory.
const MAX_BLOB_JOINTS: usize = 128;

// ── Errors ─────────────────────────────────────────────────

/// Failures parsing a reference-pose blob.
#[derive(Debug, Error)]
pub enum PoseDataError {
    #[error("pose blob too short: {0} bytes")]
    TooShort(usize),
    #[error("pose blob joint count invalid: {0}")]
    BadJointCount(f32),
    #[error("pose blob length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

// ── Reference pose ─────────────────────────────────────────

/// An authored target hand shape used for gesture matching.
///
/// Immutable once parsed. Rotations are wrist-relative; translation in
/// the stored matrices is ignored.
#[derive(Debug, Clone)]
pub struct ReferencePose {
    rotations: Vec<UnitQuaternion<f32>>,
    weights: Vec<f32>,
}

impl ReferencePose {
    /// Parse the binary blob layout: `[0]` joint count N as an f32,
    /// then N row-major 4×4 rotation matrices, then N per-joint weights.
    /// All values little-endian f32.
    pub fn parse(data: &[u8]) -> Result<Self, PoseDataError> {
        if data.len() < 4 {
            return Err(PoseDataError::TooShort(data.len()));
        }
        let count_f = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if !count_f.is_finite() || count_f < 0.0 || count_f.fract() != 0.0 {
            return Err(PoseDataError::BadJointCount(count_f));
        }
        let count = count_f as usize;
        if count > MAX_BLOB_JOINTS {
            return Err(PoseDataError::BadJointCount(count_f));
        }

        let expected = 4 * (1 + count * 16 + count);
        if data.len() != expected {
            return Err(PoseDataError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }

        let floats: Vec<f32> = data[4..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let rotations = (0..count)
            .map(|i| {
                let m = &floats[i * 16..(i + 1) * 16];
                // Stored row-major; nalgebra constructs from row iteration.
                let matrix = Matrix4::from_row_slice(m);
                rotation_of(&matrix)
            })
            .collect();
        let weights = floats[count * 16..count * 16 + count].to_vec();

        Ok(Self { rotations, weights })
    }

    /// Build a pose directly from rotations with unit weights.
    pub fn from_rotations(rotations: Vec<UnitQuaternion<f32>>) -> Self {
        let weights = vec![1.0; rotations.len()];
        Self { rotations, weights }
    }

    /// Capture a live sample into a storable pose with unit weights.
    ///
    /// With `mirror` set the rotations are reflected so a pose recorded
    /// on one hand is stored in the canonical (opposite) handedness.
    pub fn from_sample(sample: &HandSample, mirror: bool) -> Self {
        let rotations = (0..sample.joint_count())
            .map(|i| {
                let q = sample.rotation_at(i);
                if mirror {
                    mirror_quaternion(&q)
                } else {
                    q
                }
            })
            .collect();
        Self::from_rotations(rotations)
    }

    /// Serialize to the binary blob layout accepted by [`parse`].
    ///
    /// [`parse`]: ReferencePose::parse
    pub fn encode(&self) -> Vec<u8> {
        let count = self.rotations.len();
        let mut out = Vec::with_capacity(4 * (1 + count * 16 + count));
        out.extend_from_slice(&(count as f32).to_le_bytes());
        for q in &self.rotations {
            let m = q.to_homogeneous();
            for r in 0..4 {
                for c in 0..4 {
                    out.extend_from_slice(&m[(r, c)].to_le_bytes());
                }
            }
        }
        for w in &self.weights {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    /// Number of joints stored in this pose.
    pub fn joint_count(&self) -> usize {
        self.rotations.len()
    }

    /// Per-joint weight (default 1 for captured poses).
    pub fn weight(&self, index: usize) -> f32 {
        self.weights[index]
    }

    /// Override a joint's contribution to the distance metric.
    pub fn set_weight(&mut self, index: usize, weight: f32) {
        self.weights[index] = weight;
    }
}

// ── Distance metric ────────────────────────────────────────

/// Weighted mean angular deviation (radians) between a live sample and a
/// reference pose.
///
/// The wrist (index 0) carries no signal — it is identity by construction
/// on the live side — so only joints past it contribute. The wrist weight
/// is excluded from the normalizing denominator as well; tooling that
/// counts it reports distances smaller by roughly (N-1)/N for the same
/// assets, so margin thresholds must be calibrated against this metric.
/// With `mirror` set, each reference rotation is reflected across the
/// sagittal plane before comparison; this is only meaningful when
/// comparing the physically opposite hand against a single-handed
/// reference.
pub fn pose_distance(sample: &HandSample, pose: &ReferencePose, mirror: bool) -> f32 {
    let joint_count = pose.joint_count().min(sample.joint_count());
    let mut sum = 0.0;
    let mut total_weight = WEIGHT_EPSILON;
    for i in 1..joint_count {
        let weight = pose.weights[i];
        total_weight += weight;

        let mut reference = pose.rotations[i];
        if mirror {
            reference = mirror_quaternion(&reference);
        }
        let live = sample.rotation_at(i);
        sum += reference.angle_to(&live) * weight;
    }
    sum / total_weight
}

/// Reflect a rotation across the hand's sagittal plane by negating the
/// quaternion's x and w components. Applying it twice restores the input.
pub fn mirror_quaternion(q: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    let inner = q.quaternion();
    UnitQuaternion::new_unchecked(Quaternion::new(
        -inner.w, -inner.i, inner.j, inner.k,
    ))
}

// ── Tests ──────────────────────────────────────────────────
