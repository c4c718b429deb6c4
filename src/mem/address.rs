//! Untrusted and Trusted Address Types
//!
//! Type-safe wrappers that keep sandbox (untrusted) addresses apart from
//! host (trusted) addresses at compile time.
//!
//! # Security Properties
//! - An untrusted address can only become trusted through the memory
//!   collaborator's translation
//! - Neither type dereferences; byte access goes through validated buffers

use core::fmt;

/// An address inside the sandbox, as the untrusted program sees it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct UserAddr(u64);

impl UserAddr {
    /// The null untrusted address.
    pub const NULL: Self = Self(0);

    /// Create a new untrusted address.
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A trusted-side address produced by translating a [`UserAddr`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SysAddr(usize);

impl SysAddr {
    /// Create a trusted address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check alignment to an arbitrary power-of-two granule.
    #[inline]
    pub const fn is_aligned_to(self, granule: u64) -> bool {
        (self.0 as u64) & (granule - 1) == 0
    }
}

impl fmt::Debug for SysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SysAddr({:#018x})", self.0)
    }
}

impl fmt::Display for SysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_addr_formatting() {
        assert_eq!(UserAddr::NULL.as_u64(), 0);
        assert_eq!(format!("{}", UserAddr::new(0x1000)), "0x00001000");
        assert_eq!(format!("{:?}", UserAddr::new(0x1000)), "UserAddr(0x00001000)");
    }

    #[test]
    fn test_sys_alignment() {
        assert!(SysAddr::new(0x2_0000).is_aligned_to(0x1_0000));
        assert!(!SysAddr::new(0x2_1000).is_aligned_to(0x1_0000));
    }
}
