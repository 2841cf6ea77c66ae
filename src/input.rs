//! Input glue — gamepad button phases, per-frame edge detection, and a
//! plain listener list for discrete input actions.
//!
//! The platform exposes continuous button values; interaction components
//! need discrete press/release transitions. `GamepadButtonWatcher` derives them
//! frame-by-frame, and `InputListeners` fans the resulting events out to
//! subscribers (an explicit registration list, not a store).

use crate::pointer::DeviceId;

/// Button value above which an analog button counts as touched.
pub const BUTTON_TOUCH_THRESHOLD: f32 = 0.05;

// ── Button phases ──────────────────────────────────────────

/// Snapshot of one gamepad button as reported by the platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct GamepadButton {
    /// Analog value in [0, 1].
    pub value: f32,
    /// Platform digital pressed flag.
    pub pressed: bool,
    /// Platform capacitive touched flag.
    pub touched: bool,
}

/// Discrete phase derived from a button snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Default,
    Touched,
    Pressed,
}

impl GamepadButton {
    pub fn phase(&self) -> ButtonPhase {
        if self.pressed || self.value >= 1.0 {
            ButtonPhase::Pressed
        } else if self.touched || self.value > BUTTON_TOUCH_THRESHOLD {
            ButtonPhase::Touched
        } else {
            ButtonPhase::Default
        }
    }
}

// ── Edge detection ─────────────────────────────────────────

/// Press/release transition for one watched button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Per-frame edge detector over one button component.
///
/// A missing snapshot (device not reporting this frame) keeps the
/// previous phase, so transient gaps don't produce phantom releases.
#[derive(Debug, Default)]
pub struct GamepadButtonWatcher {
    previous: Option<ButtonPhase>,
}

impl GamepadButtonWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this frame's snapshot; returns the transition, if any.
    pub fn update(&mut self, button: Option<&GamepadButton>) -> Option<ButtonEdge> {
        let Some(button) = button else {
            return None;
        };
        let phase = button.phase();
        let previous = self.previous.replace(phase);

        match (previous, phase) {
            (Some(ButtonPhase::Pressed), ButtonPhase::Pressed) => None,
            (_, ButtonPhase::Pressed) => Some(ButtonEdge::Pressed),
            (Some(ButtonPhase::Pressed), _) => Some(ButtonEdge::Released),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

// ── Input events ───────────────────────────────────────────

/// Discrete input actions raised by the platform or derived from
/// button edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    SelectStart,
    SelectEnd,
    SqueezeStart,
    SqueezeEnd,
}

impl InputAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectStart => "selectstart",
            Self::SelectEnd => "selectend",
            Self::SqueezeStart => "squeezestart",
            Self::SqueezeEnd => "squeezeend",
        }
    }
}

/// One discrete input action on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub device: DeviceId,
    pub action: InputAction,
}

/// Plain listener registration list for input events.
#[derive(Default)]
pub struct InputListeners {
    listeners: Vec<Box<dyn FnMut(&InputEvent)>>,
}

impl InputListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&InputEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn dispatch(&mut self, event: InputEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────
