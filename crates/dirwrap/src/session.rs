//! Per-handle session bookkeeping shared by backends.
//!
//! A provider owns one [`HandleTable`] holding the state of every open handle.
//! Each entry sits behind its own shard lock, so sessions on different handles
//! never contend on a cursor, while two callers racing on the same handle are
//! serialized.

use dashmap::DashMap;

use crate::error::{DirError, DirResult};
use crate::types::DirHandle;

/// Maps live handles to backend session state.
#[derive(Debug)]
pub struct HandleTable<S> {
    sessions: DashMap<DirHandle, S>,
}

impl<S> Default for HandleTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> HandleTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a new session and return its handle.
    pub fn insert(&self, state: S) -> DirHandle {
        let handle = DirHandle::new();
        self.sessions.insert(handle, state);
        handle
    }

    /// Run `f` with exclusive access to the session behind `handle`.
    ///
    /// The entry stays locked for the duration of `f`; do not await inside it.
    pub fn with<R>(&self, handle: DirHandle, f: impl FnOnce(&mut S) -> R) -> DirResult<R> {
        let mut entry = self
            .sessions
            .get_mut(&handle)
            .ok_or(DirError::InvalidHandle(handle))?;
        Ok(f(entry.value_mut()))
    }

    /// Remove the session, handing back its state for cleanup.
    pub fn remove(&self, handle: DirHandle) -> DirResult<S> {
        self.sessions
            .remove(&handle)
            .map(|(_, state)| state)
            .ok_or(DirError::InvalidHandle(handle))
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no handle is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// A point-in-time snapshot of one directory with a read cursor.
#[derive(Debug, Clone)]
pub struct Listing {
    path: String,
    names: Vec<String>,
    cursor: usize,
}

impl Listing {
    /// Snapshot `names` for `path`, positioned at the first entry.
    pub fn new(path: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            path: path.into(),
            names,
            cursor: 0,
        }
    }

    /// The path this listing was opened for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next name, or `None` once every name has been returned.
    pub fn next_name(&mut self) -> Option<String> {
        let name = self.names.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(name)
    }

    /// Reset the cursor to the first entry.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Total entries in the snapshot.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the directory was empty when opened.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
