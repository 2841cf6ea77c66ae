//! Hand skeleton vocabulary — the fixed 25-joint WebXR hand layout.
//!
//! The wrist is always index 0; each finger contributes its joints in
//! proximal-to-tip order, ending in the fingertip. This ordering matches
//! the platform's per-frame joint iteration and the reference-pose blob
//! layout, so it must never change.

// ── Joint definitions ──────────────────────────────────────

/// The 25 hand joints tracked per hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Wrist,
    ThumbMetacarpal,
    ThumbPhalanxProximal,
    ThumbPhalanxDistal,
    ThumbTip,
    IndexFingerMetacarpal,
    IndexFingerPhalanxProximal,
    IndexFingerPhalanxIntermediate,
    IndexFingerPhalanxDistal,
    IndexFingerTip,
    MiddleFingerMetacarpal,
    MiddleFingerPhalanxProximal,
    MiddleFingerPhalanxIntermediate,
    MiddleFingerPhalanxDistal,
    MiddleFingerTip,
    RingFingerMetacarpal,
    RingFingerPhalanxProximal,
    RingFingerPhalanxIntermediate,
    RingFingerPhalanxDistal,
    RingFingerTip,
    PinkyFingerMetacarpal,
    PinkyFingerPhalanxProximal,
    PinkyFingerPhalanxIntermediate,
    PinkyFingerPhalanxDistal,
    PinkyFingerTip,
}

/// Total number of joints per hand.
pub const JOINT_COUNT: usize = 25;

/// All joints in their fixed platform ordering (wrist first).
pub const ALL_JOINTS: [HandJoint; JOINT_COUNT] = [
    HandJoint::Wrist,
    HandJoint::ThumbMetacarpal,
    HandJoint::ThumbPhalanxProximal,
    HandJoint::ThumbPhalanxDistal,
    HandJoint::ThumbTip,
    HandJoint::IndexFingerMetacarpal,
    HandJoint::IndexFingerPhalanxProximal,
    HandJoint::IndexFingerPhalanxIntermediate,
    HandJoint::IndexFingerPhalanxDistal,
    HandJoint::IndexFingerTip,
    HandJoint::MiddleFingerMetacarpal,
    HandJoint::MiddleFingerPhalanxProximal,
    HandJoint::MiddleFingerPhalanxIntermediate,
    HandJoint::MiddleFingerPhalanxDistal,
    HandJoint::MiddleFingerTip,
    HandJoint::RingFingerMetacarpal,
    HandJoint::RingFingerPhalanxProximal,
    HandJoint::RingFingerPhalanxIntermediate,
    HandJoint::RingFingerPhalanxDistal,
    HandJoint::RingFingerTip,
    HandJoint::PinkyFingerMetacarpal,
    HandJoint::PinkyFingerPhalanxProximal,
    HandJoint::PinkyFingerPhalanxIntermediate,
    HandJoint::PinkyFingerPhalanxDistal,
    HandJoint::PinkyFingerTip,
];

/// All joint names in order, matching `HandJoint` enum indices.
pub const JOINT_NAMES: [&str; JOINT_COUNT] = [
    "wrist",
    "thumb-metacarpal",
    "thumb-phalanx-proximal",
    "thumb-phalanx-distal",
    "thumb-tip",
    "index-finger-metacarpal",
    "index-finger-phalanx-proximal",
    "index-finger-phalanx-intermediate",
    "index-finger-phalanx-distal",
    "index-finger-tip",
    "middle-finger-metacarpal",
    "middle-finger-phalanx-proximal",
    "middle-finger-phalanx-intermediate",
    "middle-finger-phalanx-distal",
    "middle-finger-tip",
    "ring-finger-metacarpal",
    "ring-finger-phalanx-proximal",
    "ring-finger-phalanx-intermediate",
    "ring-finger-phalanx-distal",
    "ring-finger-tip",
    "pinky-finger-metacarpal",
    "pinky-finger-phalanx-proximal",
    "pinky-finger-phalanx-intermediate",
    "pinky-finger-phalanx-distal",
    "pinky-finger-tip",
];

impl HandJoint {
    /// Convert joint enum to array index (0-24).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Canonical joint name as used by the platform and pose assets.
    pub fn as_str(&self) -> &'static str {
        JOINT_NAMES[self.index()]
    }

    /// Parse a joint name. `None` for names outside the fixed list.
    pub fn from_name(name: &str) -> Option<Self> {
        JOINT_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| ALL_JOINTS[i])
    }

    /// Fingertip joints for convenience.
    pub fn fingertip_joints() -> [HandJoint; 5] {
        [
            Self::ThumbTip,
            Self::IndexFingerTip,
            Self::MiddleFingerTip,
            Self::RingFingerTip,
            Self::PinkyFingerTip,
        ]
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Which hand an input source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
