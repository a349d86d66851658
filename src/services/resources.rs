//! Object handle lifecycle
//!
//! Every binary result the pipeline hands to a presentation layer is held
//! here behind an [`ObjectHandle`]. The manager also owns the single
//! "current" [`ResultArtifact`] slot, so replacing or dropping the artifact
//! and releasing its handle always happen together.

use crate::types::{Blob, ObjectHandle, ResultArtifact, SubmissionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Counters for handle allocation, used to verify acquire/release balance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub acquired: u64,
    pub released: u64,
}

impl ResourceStats {
    #[must_use]
    pub fn live(&self) -> u64 {
        self.acquired - self.released
    }
}

/// Owner of object handles and the current result artifact
#[derive(Debug, Default)]
pub struct ResourceManager {
    next_id: u64,
    live: HashMap<ObjectHandle, Arc<Blob>>,
    current: Option<ResultArtifact>,
    stats: ResourceStats,
}

impl ResourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and hand out a fresh handle. Ids are never reused.
    pub fn acquire(&mut self, blob: Blob) -> ObjectHandle {
        self.next_id += 1;
        let handle = ObjectHandle(self.next_id);
        trace!(%handle, bytes = blob.len(), "Acquired object handle");
        self.live.insert(handle, Arc::new(blob));
        self.stats.acquired += 1;
        handle
    }

    /// Release a handle. Returns `false` if it was already released or unknown.
    pub fn release(&mut self, handle: ObjectHandle) -> bool {
        if self.live.remove(&handle).is_some() {
            self.stats.released += 1;
            trace!(%handle, "Released object handle");
            if self.current.is_some_and(|a| a.handle == handle) {
                self.current = None;
            }
            true
        } else {
            false
        }
    }

    /// Make `blob` the current artifact of `session`, releasing the previous one first
    pub fn install(&mut self, blob: Blob, session: SubmissionId) -> ObjectHandle {
        self.retire();
        let handle = self.acquire(blob);
        self.current = Some(ResultArtifact { handle, session });
        debug!(%handle, %session, "Installed result artifact");
        handle
    }

    /// Release the current artifact, if any. Returns whether one was live.
    pub fn retire(&mut self) -> bool {
        match self.current.take() {
            Some(artifact) => {
                debug!(handle = %artifact.handle, session = %artifact.session, "Retiring result artifact");
                self.release(artifact.handle)
            },
            None => false,
        }
    }

    /// Release every live handle; used on teardown
    pub fn release_all(&mut self) -> usize {
        self.current = None;
        let handles: Vec<ObjectHandle> = self.live.keys().copied().collect();
        handles.into_iter().filter(|h| self.release(*h)).count()
    }

    #[must_use]
    pub fn current(&self) -> Option<ResultArtifact> {
        self.current
    }

    #[must_use]
    pub fn resolve(&self, handle: ObjectHandle) -> Option<Arc<Blob>> {
        self.live.get(&handle).cloned()
    }

    #[must_use]
    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.live.contains_key(&handle)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            debug!(released, "Released object handles on teardown");
        }
    }
}
