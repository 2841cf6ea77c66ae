//! Pose library cache — lazily fetched, process-lifetime reference poses.
//!
//! The library is an explicitly constructed registry (no module-level
//! singleton) keyed by resolved identifier. The first lookup for an
//! identifier starts an asynchronous fetch through the injected
//! [`PoseFetcher`]; until the fetch resolves the entry is pending and
//! lookups return `None`. Fetch or parse failures are logged and leave
//! the entry permanently non-ready — there is no retry policy. Entries
//! are never evicted.
//!
//! Fetches run on background threads; completions cross an mpsc channel
//! drained by [`PoseLibrary::poll`] on the frame thread, so the per-frame
//! path never blocks and never shares locks with the fetch side.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, error};

use crate::pose::ReferencePose;

// ── Errors ─────────────────────────────────────────────────

/// Failures delivering a pose blob.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fetch failed: {0}")]
    Other(String),
}

// ── Fetcher ────────────────────────────────────────────────

/// Transport for pose blobs. Implementations run on a background thread
/// and may block; network transports are supplied by the host.
pub trait PoseFetcher: Send + Sync {
    fn fetch(&self, identifier: &str) -> Result<Vec<u8>, FetchError>;
}

/// Built-in fetcher reading blobs from the filesystem, treating the
/// resolved identifier as a path.
pub struct FilePoseFetcher;

impl PoseFetcher for FilePoseFetcher {
    fn fetch(&self, identifier: &str) -> Result<Vec<u8>, FetchError> {
        Ok(std::fs::read(PathBuf::from(identifier))?)
    }
}

// ── Entry state ────────────────────────────────────────────

/// Readiness of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseStatus {
    /// Never requested.
    Unrequested,
    /// Fetch in flight.
    Pending,
    /// Parsed and usable.
    Ready,
    /// Fetch or parse failed; permanently non-ready.
    Failed,
}

enum Entry {
    Pending,
    Ready(ReferencePose),
    Failed,
}

// ── Library ────────────────────────────────────────────────

/// Process-lifetime cache of named reference poses.
pub struct PoseLibrary {
    base_url: String,
    fetcher: Arc<dyn PoseFetcher>,
    entries: HashMap<String, Entry>,
    completions_tx: Sender<(String, Result<Vec<u8>, FetchError>)>,
    completions_rx: Receiver<(String, Result<Vec<u8>, FetchError>)>,
}

impl PoseLibrary {
    /// Create a library resolving identifiers against `base_url` and
    /// fetching through `fetcher`.
    pub fn new(base_url: impl Into<String>, fetcher: Arc<dyn PoseFetcher>) -> Self {
        let (completions_tx, completions_rx) = channel();
        Self {
            base_url: base_url.into(),
            fetcher,
            entries: HashMap::new(),
            completions_tx,
            completions_rx,
        }
    }

    /// Resolve an identifier against the base URL, collapsing duplicate
    /// slashes (the scheme separator is preserved).
    pub fn resolve(&self, path: &str) -> String {
        let joined = format!("{}/{}", self.base_url, path);
        let (scheme, rest) = match joined.find("://") {
            Some(i) => joined.split_at(i + 3),
            None => ("", joined.as_str()),
        };
        let mut out = String::with_capacity(joined.len());
        out.push_str(scheme);
        let mut prev_slash = false;
        for c in rest.chars() {
            if c == '/' {
                if prev_slash {
                    continue;
                }
                prev_slash = true;
            } else {
                prev_slash = false;
            }
            out.push(c);
        }
        out
    }

    /// Synchronous lookup: the pose if it is ready, `None` otherwise.
    ///
    /// The first lookup for an identifier starts its fetch; repeated
    /// lookups during the pending window do not start another.
    pub fn get(&mut self, path: &str) -> Option<&ReferencePose> {
        let key = self.resolve(path);
        if !self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), Entry::Pending);
            self.spawn_fetch(key.clone());
        }
        match self.entries.get(&key) {
            Some(Entry::Ready(pose)) => Some(pose),
            _ => None,
        }
    }

    /// Entry state without side effects.
    pub fn status(&self, path: &str) -> PoseStatus {
        match self.entries.get(&self.resolve(path)) {
            None => PoseStatus::Unrequested,
            Some(Entry::Pending) => PoseStatus::Pending,
            Some(Entry::Ready(_)) => PoseStatus::Ready,
            Some(Entry::Failed) => PoseStatus::Failed,
        }
    }

    /// Insert a pre-built pose (authoring and test workflows).
    pub fn insert(&mut self, path: &str, pose: ReferencePose) {
        let key = self.resolve(path);
        self.entries.insert(key, Entry::Ready(pose));
    }

    /// Drain completed fetches. Call once per frame before classification.
    pub fn poll(&mut self) {
        while let Ok((key, result)) = self.completions_rx.try_recv() {
            match result.and_then(|bytes| {
                ReferencePose::parse(&bytes).map_err(|e| FetchError::Other(e.to_string()))
            }) {
                Ok(pose) => {
                    debug!("pose ready: {key} ({} joints)", pose.joint_count());
                    self.entries.insert(key, Entry::Ready(pose));
                }
                Err(e) => {
                    error!("pose load failed for {key}: {e}");
                    self.entries.insert(key, Entry::Failed);
                }
            }
        }
    }

    /// Number of ready poses.
    pub fn ready_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, Entry::Ready(_)))
            .count()
    }

    fn spawn_fetch(&self, key: String) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.completions_tx.clone();
        thread::spawn(move || {
            let result = fetcher.fetch(&key);
            // The library may be gone by the time the fetch resolves;
            // a closed channel just discards the completion.
            let _ = tx.send((key, result));
        });
    }
}

// ── Tests ──────────────────────────────────────────────────
