//! XR interaction primitives — hand-pose recognition, spatial pointers,
//! and teleportation.
//!
//! Platform-agnostic: the host owns the XR session and rendering, and
//! feeds per-frame tracking data (joint transforms, target-ray poses,
//! gamepad buttons) into this crate's state machines. Provides:
//! - `joints` / `sample`: the fixed hand-joint model and wrist-relative
//!   per-frame samples
//! - `pose` / `library` / `classifier`: reference-pose blobs, the lazily
//!   fetched pose cache, and frame-by-frame gesture matching
//! - `scene` / `pointer`: intersectable geometry and the per-device
//!   intersection router (cursor, ray clamp, hover haptics, presses)
//! - `input`: gamepad button phases and press/release edge detection
//! - `teleport`: the curved-aim teleport state machine
//! - `system`: the composition root driven once per frame

pub mod classifier;
pub mod input;
pub mod joints;
pub mod library;
pub mod pointer;
pub mod pose;
pub mod sample;
pub mod scene;
pub mod system;
pub mod teleport;

pub use classifier::{GestureClassifier, PoseMatch};
pub use input::{
    ButtonEdge, ButtonPhase, GamepadButton, GamepadButtonWatcher, InputAction, InputEvent,
    InputListeners,
};
pub use joints::{HandJoint, Handedness, JOINT_COUNT};
pub use library::{FetchError, FilePoseFetcher, PoseFetcher, PoseLibrary, PoseStatus};
pub use pointer::{
    CursorPose, DeviceId, IntersectionFilter, PointerConfig, PointerEvent, PointerRouter,
};
pub use pose::{pose_distance, PoseDataError, ReferencePose};
pub use sample::{HandSample, JointTransform};
pub use scene::{Geometry, InteractiveScene, Intersection, NodeId, Ray, SceneNode};
pub use system::{DeviceRole, InteractionSystem, SelectOutcome};
pub use teleport::{teleport_curve, TeleportMachine};
