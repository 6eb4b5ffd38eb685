//! Local filesystem backend.
//!
//! Serves real directories under a root, with path security to prevent
//! escaping it.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::{DirError, DirResult};
use crate::provider::{DirectoryProvider, MakeDirectory, RemoveDirectory};
use crate::session::{HandleTable, Listing};
use crate::types::{DirHandle, StreamOptions};

/// Local filesystem backend.
///
/// All paths are relative to `root`. For example, if `root` is
/// `/srv/data`, then `open("logs")` lists `/srv/data/logs`.
///
/// `open` reads the whole directory and releases the OS handle before
/// returning, so no descriptor is held between calls. Entries are sorted by
/// name and `rewind` replays that snapshot. A directory holding an entry whose
/// name is not valid UTF-8 fails to open with a `Backend` error.
///
/// With [`Self::with_io_timeout`], path resolution and the filesystem work of
/// each operation share one deadline.
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
    read_only: bool,
    io_timeout: Option<Duration>,
    handles: HandleTable<Listing>,
}

impl LocalBackend {
    /// Create a new backend rooted at the given path.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            read_only: false,
            io_timeout: None,
            handles: HandleTable::new(),
        }
    }

    /// Create a read-only backend. It declares no mkdir/rmdir capability.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        let mut backend = Self::new(root);
        backend.read_only = true;
        backend
    }

    /// Bound every filesystem call by `timeout`.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if this backend refuses to create or remove directories.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Lexically normalize `path` relative to the root.
    ///
    /// `..` may not climb above the root.
    fn relative(path: &str) -> DirResult<PathBuf> {
        let mut relative = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    if !relative.pop() {
                        return Err(DirError::permission_denied(format!(
                            "path escapes root: {path}"
                        )));
                    }
                }
                Component::Normal(s) => relative.push(s),
            }
        }
        Ok(relative)
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// The deepest existing ancestor must canonicalize to somewhere under the
    /// root (symlinks pointing out are rejected). Touches the filesystem, so
    /// callers run it inside [`Self::bounded`].
    async fn resolve(&self, path: &str) -> DirResult<PathBuf> {
        let full = self.root.join(Self::relative(path)?);

        let mut existing = full.as_path();
        while !fs::try_exists(existing).await.unwrap_or(false) {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }
        let canonical = fs::canonicalize(existing)
            .await
            .map_err(|e| DirError::from_io(e, path))?;
        let canonical = dunce::simplified(&canonical);
        if !canonical.starts_with(&self.root) {
            return Err(DirError::permission_denied(format!(
                "{} is not under {}",
                canonical.display(),
                self.root.display()
            )));
        }

        Ok(full)
    }

    /// Run a filesystem future under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = DirResult<T>>,
    ) -> DirResult<T> {
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| DirError::Timeout {
                    operation,
                    elapsed: limit,
                })?,
            None => fut.await,
        }
    }

    /// Read every entry name in `full`, sorted.
    async fn snapshot(full: &Path, path: &str) -> DirResult<Vec<String>> {
        let meta = fs::metadata(full)
            .await
            .map_err(|e| DirError::from_io(e, path))?;
        if !meta.is_dir() {
            return Err(DirError::not_a_directory(path));
        }

        let mut names = Vec::new();
        let mut dir = fs::read_dir(full)
            .await
            .map_err(|e| DirError::from_io(e, path))?;
        while let Some(entry) = dir.next_entry().await.map_err(DirError::Backend)? {
            let name = entry.file_name().into_string().map_err(|raw| {
                DirError::backend(format!("{path}: entry name is not valid UTF-8: {raw:?}"))
            })?;
            names.push(name);
        }

        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl DirectoryProvider for LocalBackend {
    async fn open(&self, path: &str, _options: StreamOptions) -> DirResult<DirHandle> {
        let (full, names) = self
            .bounded("open", async {
                let full = self.resolve(path).await?;
                let names = Self::snapshot(&full, path).await?;
                Ok((full, names))
            })
            .await?;

        let handle = self.handles.insert(Listing::new(path, names));
        tracing::debug!(%handle, path = %full.display(), "local: opened directory");
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
        tracing::debug!(%handle, path = listing.path(), entries = listing.len(), "local: closed directory");
        Ok(())
    }

    fn dir_maker(&self) -> Option<&dyn MakeDirectory> {
        if self.read_only { None } else { Some(self) }
    }

    fn dir_remover(&self) -> Option<&dyn RemoveDirectory> {
        if self.read_only { None } else { Some(self) }
    }
}

#[async_trait]
impl MakeDirectory for LocalBackend {
    async fn mkdir(&self, path: &str, mode: u32, options: StreamOptions) -> DirResult<()> {
        let full = self
            .bounded("mkdir", async {
                let full = self.resolve(path).await?;
                // DirBuilder::recursive accepts an existing directory silently
                if fs::symlink_metadata(&full).await.is_ok() {
                    return Err(DirError::already_exists(path));
                }

                let mut builder = fs::DirBuilder::new();
                builder.recursive(options.recursive());
                #[cfg(unix)]
                builder.mode(mode);
                builder
                    .create(&full)
                    .await
                    .map_err(|e| DirError::from_io(e, path))?;
                Ok(full)
            })
            .await?;

        tracing::debug!(path = %full.display(), mode = %format_args!("{mode:o}"), recursive = options.recursive(), "local: mkdir");
        Ok(())
    }
}

#[async_trait]
impl RemoveDirectory for LocalBackend {
    async fn rmdir(&self, path: &str, options: StreamOptions) -> DirResult<()> {
        if Self::relative(path)?.as_os_str().is_empty() {
            return Err(DirError::permission_denied("cannot remove root"));
        }

        let full = self
            .bounded("rmdir", async {
                let full = self.resolve(path).await?;
                let meta = fs::symlink_metadata(&full)
                    .await
                    .map_err(|e| DirError::from_io(e, path))?;
                if !meta.is_dir() {
                    return Err(DirError::not_a_directory(path));
                }

                let removed = if options.recursive() {
                    fs::remove_dir_all(&full).await
                } else {
                    fs::remove_dir(&full).await
                };
                removed.map_err(|e| DirError::from_io(e, path))?;
                Ok(full)
            })
            .await?;

        tracing::debug!(path = %full.display(), recursive = options.recursive(), "local: rmdir");
        Ok(())
    }
}
