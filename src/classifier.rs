//! Frame-by-frame gesture classification against a reference pose set.
//!
//! Every frame the live sample is scored against each *ready* pose in
//! the library; pending poses simply don't compete yet. The best match
//! wins outright — no debounce or hysteresis is applied here. Callers
//! wanting stable transitions threshold the reported margin themselves.

use tracing::trace;

use crate::library::PoseLibrary;
use crate::pose::pose_distance;
use crate::sample::HandSample;

// ── Match result ───────────────────────────────────────────

/// Result of one frame's classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseMatch {
    /// Name of the best-matching gesture.
    pub name: String,
    /// Best match of the previous classified frame (`None` on the first).
    pub previous: Option<String>,
    /// Distance gap to the runner-up; `f32::INFINITY` with a single
    /// candidate. Small margins mean an ambiguous match.
    pub margin: f32,
}

impl PoseMatch {
    /// Whether the best match changed since the previous classified frame.
    pub fn changed(&self) -> bool {
        self.previous.as_deref() != Some(self.name.as_str())
    }
}

// ── Classifier ─────────────────────────────────────────────

/// Per-hand gesture classifier over a named reference-pose set.
///
/// Registration order is the tie-break order: under an exact distance tie
/// the first registered gesture wins. The only state carried across
/// frames is the previous best name.
pub struct GestureClassifier {
    gestures: Vec<(String, String)>,
    previous: Option<String>,
    observers: Vec<Box<dyn FnMut(&PoseMatch)>>,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self {
            gestures: Vec::new(),
            previous: None,
            observers: Vec::new(),
        }
    }

    /// Register a gesture name and the pose identifier backing it.
    /// Re-registering a name replaces its identifier in place.
    pub fn add_gesture(&mut self, name: impl Into<String>, identifier: impl Into<String>) {
        let name = name.into();
        let identifier = identifier.into();
        if let Some(entry) = self.gestures.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = identifier;
        } else {
            self.gestures.push((name, identifier));
        }
    }

    /// Register an observer invoked after every successful classification.
    pub fn on_match(&mut self, observer: impl FnMut(&PoseMatch) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Number of registered gestures.
    pub fn gesture_count(&self) -> usize {
        self.gestures.len()
    }

    /// Classify a live sample. Returns `None` while no registered pose is
    /// ready. `mirror` selects opposite-hand comparison against
    /// single-handed reference data.
    ///
    /// The margin is computed incrementally during the scan (no full
    /// sort): it is the smallest observed "runner-up minus best" gap.
    pub fn classify(
        &mut self,
        sample: &HandSample,
        library: &mut PoseLibrary,
        mirror: bool,
    ) -> Option<PoseMatch> {
        let mut best: Option<(usize, f32)> = None;
        let mut margin = f32::INFINITY;

        for (index, (_, identifier)) in self.gestures.iter().enumerate() {
            let Some(pose) = library.get(identifier) else {
                continue;
            };
            let distance = pose_distance(sample, pose, mirror);
            match best {
                Some((_, best_distance)) if distance < best_distance => {
                    margin = best_distance - distance;
                    best = Some((index, distance));
                }
                Some((_, best_distance)) => {
                    margin = margin.min(distance - best_distance);
                }
                None => {
                    best = Some((index, distance));
                }
            }
        }

        let (best_index, best_distance) = best?;
        let name = self.gestures[best_index].0.clone();
        trace!("pose match: {name} distance={best_distance:.4} margin={margin:.4}");

        let result = PoseMatch {
            name: name.clone(),
            previous: self.previous.take(),
            margin,
        };
        for observer in &mut self.observers {
            observer(&result);
        }
        self.previous = Some(name);
        Some(result)
    }

    /// Forget the previous-frame best (e.g. after tracking loss, so the
    /// next match reports a fresh transition).
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────
