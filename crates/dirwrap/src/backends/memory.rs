//! In-memory directory backend.
//!
//! Used for scratch namespaces and testing. All data is ephemeral.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{DirError, DirResult};
use crate::provider::{DirectoryProvider, MakeDirectory, RemoveDirectory};
use crate::session::{HandleTable, Listing};
use crate::types::{DirHandle, StreamOptions};

const ROOT_MODE: u32 = 0o755;

/// Node in the memory tree.
#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8> },
    Directory { mode: u32 },
}

/// In-memory directory backend.
///
/// The tree is guarded by an `RwLock`; open handles live in a separate
/// [`HandleTable`] so listing one directory never blocks mkdir elsewhere.
/// Listings are snapshots: changes after `open` are not seen by that handle.
#[derive(Debug)]
pub struct MemoryBackend {
    nodes: RwLock<HashMap<PathBuf, Node>>,
    handles: HandleTable<Listing>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new tree holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        // Root directory always exists
        nodes.insert(PathBuf::new(), Node::Directory { mode: ROOT_MODE });
        Self {
            nodes: RwLock::new(nodes),
            handles: HandleTable::new(),
        }
    }

    /// Add a file, creating missing parent directories.
    ///
    /// Seeding helper; file contents are never served by the provider.
    pub fn add_file(&self, path: &str, data: impl Into<Vec<u8>>) -> DirResult<()> {
        let normalized = Self::normalize(path);
        if normalized.as_os_str().is_empty() {
            return Err(DirError::already_exists("/"));
        }

        let mut nodes = self.nodes.write();
        if let Some(parent) = normalized.parent() {
            Self::create_ancestors(&mut nodes, parent, ROOT_MODE)?;
        }
        match nodes.get(&normalized) {
            Some(Node::Directory { .. }) => Err(DirError::already_exists(Self::path_str(&normalized))),
            _ => {
                nodes.insert(normalized, Node::File { data: data.into() });
                Ok(())
            }
        }
    }

    /// Mode recorded for a directory, if `path` is one.
    pub fn dir_mode(&self, path: &str) -> Option<u32> {
        match self.nodes.read().get(&Self::normalize(path)) {
            Some(Node::Directory { mode }) => Some(*mode),
            _ => None,
        }
    }

    /// Size of a seeded file, if `path` is one.
    pub fn file_len(&self, path: &str) -> Option<usize> {
        match self.nodes.read().get(&Self::normalize(path)) {
            Some(Node::File { data }) => Some(data.len()),
            _ => None,
        }
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    fn normalize(path: &str) -> PathBuf {
        let mut result = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => result.push(s),
            }
        }
        result
    }

    /// Get the path string for error messages.
    fn path_str(path: &Path) -> String {
        if path.as_os_str().is_empty() {
            "/".to_string()
        } else {
            path.display().to_string()
        }
    }

    /// Create every missing directory from the root down to `dir` inclusive.
    fn create_ancestors(
        nodes: &mut HashMap<PathBuf, Node>,
        dir: &Path,
        mode: u32,
    ) -> DirResult<()> {
        let mut current = PathBuf::new();
        for component in dir.components() {
            current.push(component);
            match nodes.get(&current) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(DirError::not_a_directory(Self::path_str(&current)));
                }
                None => {
                    nodes.insert(current.clone(), Node::Directory { mode });
                }
            }
        }
        Ok(())
    }

    /// Names of the direct children of `dir`, sorted.
    fn children(nodes: &HashMap<PathBuf, Node>, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = nodes
            .keys()
            .filter(|k| k.parent() == Some(dir) && k.as_path() != dir)
            .filter_map(|k| k.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DirectoryProvider for MemoryBackend {
    async fn open(&self, path: &str, _options: StreamOptions) -> DirResult<DirHandle> {
        let normalized = Self::normalize(path);
        let names = {
            let nodes = self.nodes.read();
            match nodes.get(&normalized) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(DirError::not_a_directory(Self::path_str(&normalized)));
                }
                None => return Err(DirError::not_found(Self::path_str(&normalized))),
            }
            Self::children(&nodes, &normalized)
        };

        let handle = self
            .handles
            .insert(Listing::new(Self::path_str(&normalized), names));
        tracing::trace!(%handle, path = %Self::path_str(&normalized), "memory: opened directory");
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
        tracing::trace!(%handle, path = listing.path(), "memory: closed directory");
        Ok(())
    }

    fn dir_maker(&self) -> Option<&dyn MakeDirectory> {
        Some(self)
    }

    fn dir_remover(&self) -> Option<&dyn RemoveDirectory> {
        Some(self)
    }
}

#[async_trait]
impl MakeDirectory for MemoryBackend {
    async fn mkdir(&self, path: &str, mode: u32, options: StreamOptions) -> DirResult<()> {
        let normalized = Self::normalize(path);
        let mut nodes = self.nodes.write();

        if nodes.contains_key(&normalized) {
            return Err(DirError::already_exists(Self::path_str(&normalized)));
        }

        let parent = normalized.parent().unwrap_or(Path::new(""));
        if options.recursive() {
            Self::create_ancestors(&mut nodes, parent, mode)?;
        } else {
            match nodes.get(parent) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(DirError::not_a_directory(Self::path_str(parent)));
                }
                None => return Err(DirError::not_found(Self::path_str(parent))),
            }
        }

        tracing::debug!(path = %Self::path_str(&normalized), mode = %format_args!("{mode:o}"), "memory: mkdir");
        nodes.insert(normalized, Node::Directory { mode });
        Ok(())
    }
}

#[async_trait]
impl RemoveDirectory for MemoryBackend {
    async fn rmdir(&self, path: &str, options: StreamOptions) -> DirResult<()> {
        let normalized = Self::normalize(path);

        if normalized.as_os_str().is_empty() {
            return Err(DirError::permission_denied("cannot remove root"));
        }

        let mut nodes = self.nodes.write();

        match nodes.get(&normalized) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => {
                return Err(DirError::not_a_directory(Self::path_str(&normalized)));
            }
            None => return Err(DirError::not_found(Self::path_str(&normalized))),
        }

        let has_children = nodes
            .keys()
            .any(|k| k.parent() == Some(normalized.as_path()));

        if has_children {
            if !options.recursive() {
                return Err(DirError::not_empty(Self::path_str(&normalized)));
            }
            nodes.retain(|k, _| !k.starts_with(&normalized));
        } else {
            nodes.remove(&normalized);
        }

        tracing::debug!(path = %Self::path_str(&normalized), recursive = options.recursive(), "memory: rmdir");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::collect_entries;

    const NONE: StreamOptions = StreamOptions::empty();

    async fn list(fs: &MemoryBackend, path: &str) -> Vec<String> {
        collect_entries(fs, path, NONE).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_read_rewind() {
        let fs = MemoryBackend::new();
        fs.add_file("docs/b.txt", "b").unwrap();
        fs.add_file("docs/a.txt", "a").unwrap();

        let handle = fs.open("docs", NONE).await.unwrap();
        assert_eq!(fs.read(handle).await.unwrap().as_deref(), Some("a.txt"));
        assert_eq!(fs.read(handle).await.unwrap().as_deref(), Some("b.txt"));
        assert_eq!(fs.read(handle).await.unwrap(), None);

        fs.rewind(handle).await.unwrap();
        assert_eq!(fs.read(handle).await.unwrap().as_deref(), Some("a.txt"));
        fs.close(handle).await.unwrap();
        assert_eq!(fs.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_open_errors() {
        let fs = MemoryBackend::new();
        fs.add_file("file.txt", "x").unwrap();

        assert!(matches!(fs.open("missing", NONE).await, Err(DirError::NotFound(_))));
        assert!(matches!(
            fs.open("file.txt", NONE).await,
            Err(DirError::NotADirectory(_))
        ));
        assert_eq!(fs.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_ignores_later_changes() {
        let fs = MemoryBackend::new();
        fs.add_file("d/one", "1").unwrap();

        let handle = fs.open("d", NONE).await.unwrap();
        fs.add_file("d/two", "2").unwrap();
        fs.rewind(handle).await.unwrap();

        assert_eq!(fs.read(handle).await.unwrap().as_deref(), Some("one"));
        assert_eq!(fs.read(handle).await.unwrap(), None);
        fs.close(handle).await.unwrap();

        assert_eq!(list(&fs, "d").await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_mkdir() {
        let fs = MemoryBackend::new();
        fs.mkdir("subdir", 0o700, NONE).await.unwrap();
        assert_eq!(fs.dir_mode("subdir"), Some(0o700));
        assert_eq!(list(&fs, "/").await, vec!["subdir"]);
    }

    #[tokio::test]
    async fn test_mkdir_existing() {
        let fs = MemoryBackend::new();
        fs.mkdir("dup", 0o755, NONE).await.unwrap();
        assert!(matches!(
            fs.mkdir("dup", 0o755, NONE).await,
            Err(DirError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.mkdir("dup", 0o755, StreamOptions::RECURSIVE).await,
            Err(DirError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_mkdir_missing_parent() {
        let fs = MemoryBackend::new();
        assert!(matches!(
            fs.mkdir("a/b/c", 0o755, NONE).await,
            Err(DirError::NotFound(p)) if p == "a/b"
        ));

        fs.mkdir("a/b/c", 0o750, StreamOptions::RECURSIVE).await.unwrap();
        assert_eq!(fs.dir_mode("a"), Some(0o750));
        assert_eq!(fs.dir_mode("a/b/c"), Some(0o750));
    }

    #[tokio::test]
    async fn test_mkdir_through_file() {
        let fs = MemoryBackend::new();
        fs.add_file("plain", "x").unwrap();
        assert!(matches!(
            fs.mkdir("plain/sub", 0o755, NONE).await,
            Err(DirError::NotADirectory(_))
        ));
        assert!(matches!(
            fs.mkdir("plain/sub/deeper", 0o755, StreamOptions::RECURSIVE).await,
            Err(DirError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_rmdir() {
        let fs = MemoryBackend::new();
        fs.mkdir("empty", 0o755, NONE).await.unwrap();
        fs.rmdir("empty", NONE).await.unwrap();
        assert!(matches!(fs.open("empty", NONE).await, Err(DirError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rmdir_not_empty() {
        let fs = MemoryBackend::new();
        fs.add_file("full/nested/file.txt", "x").unwrap();
        fs.add_file("fullness.txt", "x").unwrap();

        assert!(matches!(
            fs.rmdir("full", NONE).await,
            Err(DirError::NotEmpty(_))
        ));

        fs.rmdir("full", StreamOptions::RECURSIVE).await.unwrap();
        assert!(fs.dir_mode("full/nested").is_none());
        assert!(fs.file_len("full/nested/file.txt").is_none());
        // Sibling sharing a name prefix survives
        assert_eq!(fs.file_len("fullness.txt"), Some(1));
    }

    #[tokio::test]
    async fn test_rmdir_errors() {
        let fs = MemoryBackend::new();
        fs.add_file("f", "x").unwrap();
        assert!(matches!(fs.rmdir("/", NONE).await, Err(DirError::PermissionDenied(_))));
        assert!(matches!(fs.rmdir("f", NONE).await, Err(DirError::NotADirectory(_))));
        assert!(matches!(fs.rmdir("nope", NONE).await, Err(DirError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_normalization() {
        let fs = MemoryBackend::new();
        fs.add_file("/a/b/c.txt", "x").unwrap();

        assert_eq!(list(&fs, "a/b").await, vec!["c.txt"]);
        assert_eq!(list(&fs, "/a/b/").await, vec!["c.txt"]);
        assert_eq!(list(&fs, "a/./b").await, vec!["c.txt"]);
        assert_eq!(list(&fs, "a/b/../b").await, vec!["c.txt"]);
    }

    #[tokio::test]
    async fn test_declares_both_capabilities() {
        let fs = MemoryBackend::new();
        assert!(fs.capabilities().is_all());
    }
}
