//! Read-only backend built from a list of paths.
//!
//! Models archive-style sources whose directory structure comes from an
//! index of member names rather than from real directories. Entries ending in
//! `/` are directories; every ancestor of an entry is an implied directory.
//! `.` is ignored and `..` steps back one level, never above the root, the
//! same way the memory backend normalizes paths.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DirError, DirResult};
use crate::provider::DirectoryProvider;
use crate::session::{HandleTable, Listing};
use crate::types::{DirHandle, StreamOptions};

/// Read-only manifest backend. Declares no optional capabilities.
#[derive(Debug)]
pub struct ManifestBackend {
    /// Directory path (no leading/trailing `/`, root is `""`) to child names.
    dirs: BTreeMap<String, BTreeSet<String>>,
    files: BTreeSet<String>,
    handles: HandleTable<Listing>,
}

impl ManifestBackend {
    /// Build the tree from manifest entries.
    ///
    /// A path listed both as a file and as a directory (explicitly or as an
    /// ancestor) is an error.
    pub fn from_entries<I, S>(entries: I) -> DirResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut backend = Self {
            dirs: BTreeMap::from([(String::new(), BTreeSet::new())]),
            files: BTreeSet::new(),
            handles: HandleTable::new(),
        };

        for entry in entries {
            let entry = entry.as_ref();
            let is_dir = entry.ends_with('/');
            let parts = Self::split(entry);
            if parts.is_empty() {
                continue;
            }

            let mut parent = String::new();
            for (i, part) in parts.iter().enumerate() {
                let path = Self::join(&parent, part);
                let last = i + 1 == parts.len();
                backend
                    .dirs
                    .get_mut(&parent)
                    .ok_or_else(|| DirError::not_a_directory(parent.clone()))?
                    .insert(part.to_string());

                if last && !is_dir {
                    if backend.dirs.contains_key(&path) {
                        return Err(DirError::already_exists(path));
                    }
                    backend.files.insert(path.clone());
                } else {
                    if backend.files.contains(&path) {
                        return Err(DirError::not_a_directory(path));
                    }
                    backend.dirs.entry(path.clone()).or_default();
                }
                parent = path;
            }
        }

        Ok(backend)
    }

    /// Number of directories, including the root.
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Normalized components of `path`.
    fn split(path: &str) -> Vec<&str> {
        let mut parts = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                _ => parts.push(part),
            }
        }
        parts
    }

    fn join(parent: &str, name: &str) -> String {
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}/{name}")
        }
    }

    fn key(path: &str) -> String {
        Self::split(path).join("/")
    }
}

#[async_trait]
impl DirectoryProvider for ManifestBackend {
    async fn open(&self, path: &str, _options: StreamOptions) -> DirResult<DirHandle> {
        let key = Self::key(path);
        let Some(children) = self.dirs.get(&key) else {
            return Err(if self.files.contains(&key) {
                DirError::not_a_directory(path)
            } else {
                DirError::not_found(path)
            });
        };

        let names = children.iter().cloned().collect();
        let handle = self.handles.insert(Listing::new(key, names));
        tracing::trace!(%handle, path, "manifest: opened directory");
        Ok(handle)
    }

    async fn read(&self, handle: DirHandle) -> DirResult<Option<String>> {
        self.handles.with(handle, Listing::next_name)
    }

    async fn rewind(&self, handle: DirHandle) -> DirResult<()> {
        self.handles.with(handle, Listing::rewind)
    }

    async fn close(&self, handle: DirHandle) -> DirResult<()> {
        let listing = self.handles.remove(handle)?;
        tracing::trace!(%handle, path = listing.path(), "manifest: closed directory");
        Ok(())
    }
}
