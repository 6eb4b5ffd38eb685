//! Core provider types.
//!
//! Options and modes are opaque bitfields owned by the caller. Providers read
//! the bits they understand and leave the rest untouched.

use std::fmt;
use uuid::Uuid;

/// Opaque token naming one open directory session.
///
/// Handles are random, so a handle from another provider (or one made up by
/// the caller) never aliases a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirHandle(Uuid);

impl DirHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// A handle that was never issued by any provider.
    pub fn dangling() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for DirHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dir:{}", self.0.simple())
    }
}

bitflags::bitflags! {
    /// Caller-supplied option bits for open, mkdir and rmdir.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StreamOptions: u32 {
        /// Create intermediate directories / remove a whole subtree.
        const RECURSIVE = 0x01;
        /// The caller wants diagnostics reported.
        const REPORT_ERRORS = 0x08;
    }
}

impl StreamOptions {
    /// Wrap raw host bits, keeping any this crate has no name for.
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Returns true if the recursive bit is set.
    pub fn recursive(&self) -> bool {
        self.contains(Self::RECURSIVE)
    }
}

/// An optional provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    MakeDirectory,
    RemoveDirectory,
}

bitflags::bitflags! {
    /// Optional operations a provider declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const MAKE_DIRECTORY = 0b01;
        const REMOVE_DIRECTORY = 0b10;
    }
}

impl Capabilities {
    /// Returns true if the given capability is declared.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::MakeDirectory => self.contains(Self::MAKE_DIRECTORY),
            Capability::RemoveDirectory => self.contains(Self::REMOVE_DIRECTORY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_option_bits_survive() {
        let opts = StreamOptions::from_raw(0x01 | 0x40);
        assert!(opts.recursive());
        assert_eq!(opts.bits(), 0x41);
        assert!(!StreamOptions::from_raw(0x08).recursive());
    }

    #[test]
    fn test_handles_are_distinct() {
        let a = DirHandle::new();
        let b = DirHandle::new();
        assert_ne!(a, b);
        assert_ne!(a, DirHandle::dangling());
        assert!(a.to_string().starts_with("dir:"));
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::MAKE_DIRECTORY;
        assert!(caps.supports(Capability::MakeDirectory));
        assert!(!caps.supports(Capability::RemoveDirectory));
        assert!(Capabilities::empty().is_empty());
    }

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::MakeDirectory.to_string(), "make_directory");
        assert_eq!(Capability::RemoveDirectory.as_ref(), "remove_directory");
    }
}
