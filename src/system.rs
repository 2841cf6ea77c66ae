//! Per-frame composition root.
//!
//! `InteractionSystem` owns the pose library, per-device gesture
//! classifiers, the pointer router, and per-device teleport machines,
//! and exposes the explicit transition functions the host's frame
//! callback drives: `begin_frame`, then one update per tracked device.
//! A device the platform reports no pose for this frame is simply not
//! updated (or reported lost); every component degrades to inactive.

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3};
use tracing::debug;

use crate::classifier::{GestureClassifier, PoseMatch};
use crate::joints::Handedness;
use crate::library::PoseLibrary;
use crate::pointer::{DeviceId, PointerConfig, PointerEvent, PointerRouter};
use crate::sample::{HandSample, JointTransform};
use crate::scene::{InteractiveScene, Intersection, Ray};
use crate::teleport::TeleportMachine;

/// What a device's select action drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// Select presses/releases forward to the pointed-at node.
    Pointer,
    /// Select arms and commits teleport aiming.
    Teleport,
}

/// Result of ending a select action.
#[derive(Debug)]
pub enum SelectOutcome {
    /// Pointer release, forwarded to the current hit (if any).
    Release(PointerEvent),
    /// Teleport committed to this local-space destination.
    Teleport(Point3<f32>),
    /// Unknown device, or a teleport release over nothing.
    Inactive,
}

struct Device {
    handedness: Handedness,
    role: DeviceRole,
    classifier: GestureClassifier,
    teleport: Option<TeleportMachine>,
}

// ── System ─────────────────────────────────────────────────

/// Owns all interaction state and routes one frame at a time.
pub struct InteractionSystem {
    library: PoseLibrary,
    router: PointerRouter,
    devices: HashMap<DeviceId, Device>,
}

impl InteractionSystem {
    pub fn new(library: PoseLibrary, config: PointerConfig) -> Self {
        Self {
            library,
            router: PointerRouter::new(config),
            devices: HashMap::new(),
        }
    }

    // ── Registration ───────────────────────────────────────

    /// Register a tracked hand. Hands classify gestures every frame and
    /// aim teleports with the wrist-tilt correction.
    pub fn register_hand(&mut self, device: DeviceId, handedness: Handedness, role: DeviceRole) {
        self.router.register_device(device, handedness);
        self.devices.insert(
            device,
            Device {
                handedness,
                role,
                classifier: GestureClassifier::new(),
                teleport: (role == DeviceRole::Teleport)
                    .then(|| TeleportMachine::new(Some(handedness))),
            },
        );
        debug!("registered hand device {device} ({})", handedness.as_str());
    }

    /// Register a controller. No gesture classification; teleport aiming
    /// uses the raw target-ray orientation.
    pub fn register_controller(
        &mut self,
        device: DeviceId,
        handedness: Handedness,
        role: DeviceRole,
    ) {
        self.router.register_device(device, handedness);
        self.devices.insert(
            device,
            Device {
                handedness,
                role,
                classifier: GestureClassifier::new(),
                teleport: (role == DeviceRole::Teleport).then(|| TeleportMachine::new(None)),
            },
        );
        debug!(
            "registered controller device {device} ({})",
            handedness.as_str(),
        );
    }

    pub fn unregister_device(&mut self, device: DeviceId) {
        self.router.unregister_device(device);
        self.devices.remove(&device);
    }

    /// Register a gesture on one device's classifier.
    pub fn add_gesture(
        &mut self,
        device: DeviceId,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) {
        if let Some(d) = self.devices.get_mut(&device) {
            d.classifier.add_gesture(name, identifier);
        }
    }

    /// Observe gesture matches on one device.
    pub fn on_gesture(&mut self, device: DeviceId, observer: impl FnMut(&PoseMatch) + 'static) {
        if let Some(d) = self.devices.get_mut(&device) {
            d.classifier.on_match(observer);
        }
    }

    // ── Per-frame transitions ──────────────────────────────

    /// Start a frame: drain completed pose fetches.
    pub fn begin_frame(&mut self) {
        self.library.poll();
    }

    /// Feed this frame's hand joints and classify. Incomplete tracking
    /// (any missing joint) resets the classifier and clears the device's
    /// pointer state.
    pub fn update_hand(
        &mut self,
        device: DeviceId,
        joints: &[Option<JointTransform>],
    ) -> Option<PoseMatch> {
        let d = self.devices.get_mut(&device)?;
        match HandSample::capture(joints) {
            Some(sample) => {
                // Reference poses are stored right-handed; left hands
                // compare mirrored.
                let mirror = d.handedness == Handedness::Left;
                d.classifier.classify(&sample, &mut self.library, mirror)
            }
            None => {
                d.classifier.reset();
                self.router.clear(device);
                None
            }
        }
    }

    /// Straight-ray pointer query for this frame.
    pub fn update_pointer(
        &mut self,
        device: DeviceId,
        ray: &Ray,
        scene: &InteractiveScene,
    ) -> Vec<PointerEvent> {
        self.router.update_ray(device, ray, scene)
    }

    /// Sphere-volume (touch/grab) query for this frame.
    pub fn update_grab(
        &mut self,
        device: DeviceId,
        center: Point3<f32>,
        scene: &InteractiveScene,
    ) -> Vec<PointerEvent> {
        self.router.update_sphere(device, center, scene)
    }

    /// Re-aim an armed teleport from this frame's device pose.
    pub fn update_teleport(
        &mut self,
        device: DeviceId,
        device_pose: &Isometry3<f32>,
        scene: &InteractiveScene,
    ) -> Option<&Intersection> {
        self.devices
            .get_mut(&device)?
            .teleport
            .as_mut()?
            .update(device_pose, scene)
    }

    /// The platform reported no pose for this device this frame.
    pub fn device_lost(&mut self, device: DeviceId) {
        self.router.clear(device);
        if let Some(d) = self.devices.get_mut(&device) {
            d.classifier.reset();
            if let Some(teleport) = d.teleport.as_mut() {
                teleport.cancel();
            }
        }
    }

    // ── Discrete actions ───────────────────────────────────

    /// Select pressed: forwards to the pointed-at node, or arms the
    /// teleport, per the device's role.
    pub fn select_start(&mut self, device: DeviceId) -> Option<PointerEvent> {
        let d = self.devices.get_mut(&device)?;
        match d.role {
            DeviceRole::Pointer => self.router.press(device),
            DeviceRole::Teleport => {
                if let Some(teleport) = d.teleport.as_mut() {
                    teleport.arm();
                }
                None
            }
        }
    }

    /// Select released. `camera_local_position` is the viewer's position
    /// in the local reference space, used for the teleport commit.
    pub fn select_end(
        &mut self,
        device: DeviceId,
        camera_local_position: &Point3<f32>,
    ) -> SelectOutcome {
        let Some(d) = self.devices.get_mut(&device) else {
            return SelectOutcome::Inactive;
        };
        match d.role {
            DeviceRole::Pointer => match self.router.release(device) {
                Some(event) => SelectOutcome::Release(event),
                None => SelectOutcome::Inactive,
            },
            DeviceRole::Teleport => {
                let destination = d
                    .teleport
                    .as_mut()
                    .and_then(|t| t.release(camera_local_position));
                match destination {
                    Some(point) => SelectOutcome::Teleport(point),
                    None => SelectOutcome::Inactive,
                }
            }
        }
    }

    // ── Accessors ──────────────────────────────────────────

    pub fn library(&self) -> &PoseLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut PoseLibrary {
        &mut self.library
    }

    pub fn router(&self) -> &PointerRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut PointerRouter {
        &mut self.router
    }

    /// Teleport indicator fraction for a device's curve visual.
    pub fn teleport_indicator(&self, device: DeviceId) -> Option<f32> {
        Some(
            self.devices
                .get(&device)?
                .teleport
                .as_ref()?
                .indicator_fraction(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
