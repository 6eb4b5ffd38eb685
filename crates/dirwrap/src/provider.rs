//! Directory provider trait.
//!
//! A provider serves directory listings and (optionally) directory lifecycle
//! for one namespace. The host decides which provider a path belongs to and
//! hands over the path with any scheme already stripped.

use async_trait::async_trait;

use crate::error::{DirError, DirResult};
use crate::types::{Capabilities, Capability, DirHandle, StreamOptions};

/// Core directory provider trait.
///
/// Handles follow `open -> (read | rewind)* -> close`. Once closed, every
/// operation on the handle fails with [`DirError::InvalidHandle`].
///
/// Enumeration order is backend-defined but must not change between `read`
/// calls on one handle. A backend that fails to produce the next entry returns
/// an error rather than `Ok(None)`.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Open a directory listing.
    ///
    /// Fails with `NotFound` or `NotADirectory` when `path` does not name a
    /// directory. Anything acquired before a failure is released before
    /// returning.
    async fn open(&self, path: &str, options: StreamOptions) -> DirResult<DirHandle>;

    /// Next entry name, or `None` once the listing is exhausted.
    async fn read(&self, handle: DirHandle) -> DirResult<Option<String>>;

    /// Reset so that the next `read` returns the first entry again.
    async fn rewind(&self, handle: DirHandle) -> DirResult<()>;

    /// Release the handle and everything it holds.
    async fn close(&self, handle: DirHandle) -> DirResult<()>;

    // ========================================================================
    // Optional capabilities
    // ========================================================================

    /// Directory creation, if this provider supports it.
    fn dir_maker(&self) -> Option<&dyn MakeDirectory> {
        None
    }

    /// Directory removal, if this provider supports it.
    fn dir_remover(&self) -> Option<&dyn RemoveDirectory> {
        None
    }

    /// Optional operations this provider declares.
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::MAKE_DIRECTORY, self.dir_maker().is_some());
        caps.set(Capabilities::REMOVE_DIRECTORY, self.dir_remover().is_some());
        caps
    }

    /// Create a directory, or fail with `Unsupported` if the provider has no
    /// [`MakeDirectory`] capability.
    async fn make_directory(
        &self,
        path: &str,
        mode: u32,
        options: StreamOptions,
    ) -> DirResult<()> {
        let maker = self
            .dir_maker()
            .ok_or(DirError::Unsupported(Capability::MakeDirectory))?;
        maker.mkdir(path, mode, options).await
    }

    /// Remove a directory, or fail with `Unsupported` if the provider has no
    /// [`RemoveDirectory`] capability.
    async fn remove_directory(&self, path: &str, options: StreamOptions) -> DirResult<()> {
        let remover = self
            .dir_remover()
            .ok_or(DirError::Unsupported(Capability::RemoveDirectory))?;
        remover.rmdir(path, options).await
    }
}

/// Directory creation capability.
#[async_trait]
pub trait MakeDirectory: Send + Sync {
    /// Create `path`.
    ///
    /// `mode` is interpreted by the backend. With [`StreamOptions::RECURSIVE`]
    /// missing ancestors are created too. An existing target is
    /// `AlreadyExists`.
    async fn mkdir(&self, path: &str, mode: u32, options: StreamOptions) -> DirResult<()>;
}

/// Directory removal capability.
#[async_trait]
pub trait RemoveDirectory: Send + Sync {
    /// Remove `path`.
    ///
    /// A non-empty directory is `NotEmpty` unless
    /// [`StreamOptions::RECURSIVE`] is set, in which case the subtree goes too.
    async fn rmdir(&self, path: &str, options: StreamOptions) -> DirResult<()>;
}

/// Open `path`, read every entry, and close the handle.
///
/// The handle is closed even when a read fails; the read error wins.
pub async fn collect_entries(
    provider: &dyn DirectoryProvider,
    path: &str,
    options: StreamOptions,
) -> DirResult<Vec<String>> {
    let handle = provider.open(path, options).await?;
    let mut names = Vec::new();
    let result = loop {
        match provider.read(handle).await {
            Ok(Some(name)) => names.push(name),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = provider.close(handle).await;
    result?;
    closed?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{HandleTable, Listing};

    /// Serves one fixed directory and nothing else.
    struct FixedProvider {
        handles: HandleTable<Listing>,
    }

    #[async_trait]
    impl DirectoryProvider for FixedProvider {
        async fn open(&self, path: &str, _options: StreamOptions) -> DirResult<DirHandle> {
            if path != "fixed" {
                return Err(DirError::not_found(path));
            }
            let names = vec!["a.txt".to_string(), "b.txt".to_string()];
            Ok(self.handles.insert(Listing::new(path, names)))
        }

        async fn read(&self, handle: DirHandle) -> DirResult<Option<String>> {
            self.handles.with(handle, |l| l.next_name())
        }

        async fn rewind(&self, handle: DirHandle) -> DirResult<()> {
            self.handles.with(handle, |l| l.rewind())
        }

        async fn close(&self, handle: DirHandle) -> DirResult<()> {
            self.handles.remove(handle).map(drop)
        }
    }

    /// Opens anything, then fails every read.
    struct BrokenReads {
        handles: HandleTable<Listing>,
    }

    #[async_trait]
    impl DirectoryProvider for BrokenReads {
        async fn open(&self, path: &str, _options: StreamOptions) -> DirResult<DirHandle> {
            Ok(self.handles.insert(Listing::new(path, Vec::new())))
        }

        async fn read(&self, handle: DirHandle) -> DirResult<Option<String>> {
            self.handles.with(handle, |_| ())?;
            Err(DirError::backend("device went away"))
        }

        async fn rewind(&self, handle: DirHandle) -> DirResult<()> {
            self.handles.with(handle, |l| l.rewind())
        }

        async fn close(&self, handle: DirHandle) -> DirResult<()> {
            self.handles.remove(handle).map(drop)
        }
    }

    fn fixed() -> FixedProvider {
        FixedProvider {
            handles: HandleTable::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_capabilities_are_unsupported() {
        let provider = fixed();
        assert!(provider.capabilities().is_empty());

        let err = provider
            .make_directory("new", 0o755, StreamOptions::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, DirError::Unsupported(Capability::MakeDirectory)));

        let err = provider
            .remove_directory("fixed", StreamOptions::RECURSIVE)
            .await
            .unwrap_err();
        assert!(matches!(err, DirError::Unsupported(Capability::RemoveDirectory)));
    }

    #[tokio::test]
    async fn test_collect_entries_closes_handle() {
        let provider = fixed();
        let names = collect_entries(&provider, "fixed", StreamOptions::empty())
            .await
            .unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(provider.handles.is_empty());
    }

    #[tokio::test]
    async fn test_collect_entries_open_failure() {
        let provider = fixed();
        let err = collect_entries(&provider, "elsewhere", StreamOptions::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, DirError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_collect_entries_read_failure_still_closes() {
        let provider = BrokenReads {
            handles: HandleTable::new(),
        };
        let err = collect_entries(&provider, "anywhere", StreamOptions::empty())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::DirErrorKind::Backend);
        assert!(provider.handles.is_empty());
    }
}
