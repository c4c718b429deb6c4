//! Sandbox Memory Arena
//!
//! An in-process implementation of [`UserMemory`]: one contiguous byte
//! arena standing in for the untrusted address space, with a per-page
//! protection table.
//!
//! # Design
//! - Untrusted address `u` translates to trusted `base + u`
//! - Every page carries a protection and a lock bit
//! - Locked pages belong to the host (trampolines, guard regions) and
//!   never change protection
//!
//! # Security Properties
//! - Range checks cover every page the range touches
//! - Out-of-arena ranges are never reported as accessible

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use super::address::{SysAddr, UserAddr};
use super::prot::Prot;
use super::user::UserMemory;
use crate::trap::error::errno;

/// Default trusted base address of the arena (1 GiB, 64 KiB aligned).
pub const DEFAULT_BASE: usize = 0x4000_0000;

/// State of one arena page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageState {
    prot: Prot,
    locked: bool,
}

impl PageState {
    const fn unmapped() -> Self {
        Self {
            prot: Prot::NONE,
            locked: false,
        }
    }
}

/// Software sandbox address space.
#[derive(Debug)]
pub struct SandboxMemory {
    base: usize,
    page_size: usize,
    bytes: Vec<u8>,
    pages: Vec<PageState>,
}

impl SandboxMemory {
    /// Create an arena of `len` bytes at [`DEFAULT_BASE`].
    ///
    /// `len` is rounded up to a whole number of pages; every page starts
    /// with no access.
    pub fn new(len: usize, page_size: usize) -> Self {
        Self::with_base(DEFAULT_BASE, len, page_size)
    }

    /// Create an arena at a specific trusted base.
    ///
    /// # Panics
    /// Panics if `page_size` is not a power of two or `base` is not
    /// aligned to it.
    pub fn with_base(base: usize, len: usize, page_size: usize) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");
        assert!(base & (page_size - 1) == 0, "arena base must be page aligned");

        let page_count = len.div_ceil(page_size);
        Self {
            base,
            page_size,
            bytes: vec![0; page_count * page_size],
            pages: vec![PageState::unmapped(); page_count],
        }
    }

    /// Arena size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the arena holds no pages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Set protection on an untrusted range during setup, ignoring locks.
    pub fn map(&mut self, addr: UserAddr, len: usize, prot: Prot) -> Result<(), i32> {
        let range = self.user_range(addr, len).ok_or(errno::ENOMEM)?;
        for page in self.page_span(&range) {
            self.pages[page].prot = prot;
        }
        Ok(())
    }

    /// Lock an untrusted range so its protection can no longer change.
    pub fn lock(&mut self, addr: UserAddr, len: usize) -> Result<(), i32> {
        let range = self.user_range(addr, len).ok_or(errno::ENOMEM)?;
        for page in self.page_span(&range) {
            self.pages[page].locked = true;
        }
        Ok(())
    }

    /// Current protection of the page holding `addr`.
    pub fn prot_at(&self, addr: UserAddr) -> Option<Prot> {
        let range = self.user_range(addr, 1)?;
        Some(self.pages[range.start / self.page_size].prot)
    }

    /// Copy bytes into the arena, ignoring protection.
    pub fn write_user(&mut self, addr: UserAddr, data: &[u8]) -> Option<()> {
        let range = self.user_range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Some(())
    }

    /// Borrow arena bytes, ignoring protection.
    pub fn read_user(&self, addr: UserAddr, len: usize) -> Option<&[u8]> {
        let range = self.user_range(addr, len)?;
        Some(&self.bytes[range])
    }

    /// Arena offsets covered by an untrusted range.
    fn user_range(&self, addr: UserAddr, len: usize) -> Option<Range<usize>> {
        let start = usize::try_from(addr.as_u64()).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start..end)
    }

    /// Arena offsets covered by a trusted range.
    fn sys_range(&self, addr: SysAddr, len: usize) -> Option<Range<usize>> {
        let start = addr.as_usize().checked_sub(self.base)?;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start..end)
    }

    /// Page indices touched by an arena range.
    fn page_span(&self, range: &Range<usize>) -> Range<usize> {
        if range.is_empty() {
            return 0..0;
        }
        let first = range.start / self.page_size;
        let last = (range.end - 1) / self.page_size;
        first..last + 1
    }
}

impl UserMemory for SandboxMemory {
    fn to_sys(&self, addr: UserAddr) -> SysAddr {
        SysAddr::new(self.base.wrapping_add(addr.as_u64() as usize))
    }

    fn check(&self, addr: SysAddr, len: usize, prot: Prot) -> bool {
        let Some(range) = self.sys_range(addr, len) else {
            return false;
        };
        self.pages[self.page_span(&range)]
            .iter()
            .all(|page| !page.locked && page.prot.contains(prot))
    }

    fn protect(&mut self, addr: SysAddr, len: usize, prot: Prot) -> Result<(), i32> {
        let range = self.sys_range(addr, len).ok_or(errno::ENOMEM)?;
        let span = self.page_span(&range);
        if self.pages[span.clone()].iter().any(|page| page.locked) {
            return Err(errno::EACCES);
        }
        for page in &mut self.pages[span] {
            page.prot = prot;
        }
        Ok(())
    }

    fn bytes(&self, addr: SysAddr, len: usize) -> Option<&[u8]> {
        let range = self.sys_range(addr, len)?;
        Some(&self.bytes[range])
    }

    fn bytes_mut(&mut self, addr: SysAddr, len: usize) -> Option<&mut [u8]> {
        let range = self.sys_range(addr, len)?;
        Some(&mut self.bytes[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 0x1000;

    #[test]
    fn test_translation_is_base_relative() {
        let mem = SandboxMemory::new(4 * PAGE, PAGE);
        assert_eq!(mem.to_sys(UserAddr::NULL).as_usize(), DEFAULT_BASE);
        assert_eq!(mem.to_sys(UserAddr::new(0x1234)).as_usize(), DEFAULT_BASE + 0x1234);
    }

    #[test]
    fn test_len_rounds_up_to_pages() {
        let mem = SandboxMemory::new(PAGE + 1, PAGE);
        assert_eq!(mem.len(), 2 * PAGE);
        assert!(!mem.is_empty());
    }

    #[test]
    fn test_check_requires_every_page() {
        let mut mem = SandboxMemory::new(4 * PAGE, PAGE);
        mem.map(UserAddr::new(0), 2 * PAGE, Prot::READ_WRITE).unwrap();
        let sys = mem.to_sys(UserAddr::new(0));
        assert!(mem.check(sys, 2 * PAGE, Prot::WRITE));
        assert!(!mem.check(sys, 2 * PAGE + 1, Prot::WRITE));
        assert!(!mem.check(sys, 2 * PAGE, Prot::EXEC));
        // unmapped pages still pass the lock check
        assert!(mem.check(sys, 4 * PAGE, Prot::NONE));
    }

    #[test]
    fn test_out_of_arena_never_accessible() {
        let mem = SandboxMemory::new(PAGE, PAGE);
        assert!(!mem.check(SysAddr::new(0), 1, Prot::NONE));
        assert!(!mem.check(mem.to_sys(UserAddr::new(PAGE as u64)), 1, Prot::NONE));
        assert!(mem.bytes(SysAddr::new(usize::MAX), 2).is_none());
    }

    #[test]
    fn test_locked_pages_fail_check_and_protect() {
        let mut mem = SandboxMemory::new(2 * PAGE, PAGE);
        mem.map(UserAddr::new(0), PAGE, Prot::READ_EXEC).unwrap();
        mem.lock(UserAddr::new(0), PAGE).unwrap();
        let sys = mem.to_sys(UserAddr::new(0));

        assert!(!mem.check(sys, PAGE, Prot::NONE));
        assert_eq!(mem.protect(sys, PAGE, Prot::READ_WRITE), Err(errno::EACCES));
        assert_eq!(mem.prot_at(UserAddr::new(0)), Some(Prot::READ_EXEC));
    }

    #[test]
    fn test_protect_out_of_range_is_enomem() {
        let mut mem = SandboxMemory::new(PAGE, PAGE);
        let sys = mem.to_sys(UserAddr::new(0));
        assert_eq!(mem.protect(sys, 2 * PAGE, Prot::READ), Err(errno::ENOMEM));
    }
}
