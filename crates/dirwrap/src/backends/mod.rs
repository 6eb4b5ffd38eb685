//! Directory provider backends.
//!
//! Backends implement [`DirectoryProvider`](crate::DirectoryProvider) for
//! different storage types.

mod local;
mod manifest;
mod memory;

pub use local::LocalBackend;
pub use manifest::ManifestBackend;
pub use memory::MemoryBackend;
