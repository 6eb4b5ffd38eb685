//! # dirwrap
//!
//! Pluggable directory-stream providers.
//!
//! A provider serves directory listings for one namespace through an
//! open/read/rewind/close handle protocol, and may additionally support
//! creating and removing directories. Key components:
//!
//! - [`DirectoryProvider`] - Core trait every backend implements
//! - [`MakeDirectory`] / [`RemoveDirectory`] - Optional capabilities
//! - [`HandleTable`] / [`Listing`] - Session bookkeeping for backends
//! - [`MemoryBackend`] - In-memory tree (for scratch space, testing)
//! - [`LocalBackend`] - Real directories under a root (with path security)
//! - [`ManifestBackend`] - Read-only tree from an archive-style index
//!
//! ## Design Decisions
//!
//! - **Capabilities by omission**: a backend without mkdir/rmdir returns
//!   `None` from the capability accessor, and the dispatch methods report
//!   [`DirError::Unsupported`] rather than a failed attempt.
//! - **Opaque handles**: [`DirHandle`] is a random token; state lives in the
//!   provider, so a closed or foreign handle fails with `InvalidHandle`.
//! - **Snapshot listings**: bundled backends read the directory at `open` and
//!   `rewind` replays that snapshot in name order.
//! - **Pass-through options**: [`StreamOptions`] keeps bits it has no name for.

pub mod backends;
pub mod config;
mod error;
mod provider;
mod session;
mod types;

pub use backends::{LocalBackend, ManifestBackend, MemoryBackend};
pub use config::{Config, ConfigError, LogConfig, ProviderConfig};
pub use error::{DirError, DirErrorKind, DirResult};
pub use provider::{DirectoryProvider, MakeDirectory, RemoveDirectory, collect_entries};
pub use session::{HandleTable, Listing};
pub use types::{Capabilities, Capability, DirHandle, StreamOptions};
