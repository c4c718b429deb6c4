//! Untrusted Memory Access
//!
//! Defines the contract the gate needs from the host's address-space
//! collaborator, and the validated buffer handles built on top of it.
//!
//! # Security Principles
//! - Translate, then range-check, then touch: never the other way round
//! - Fail-secure: a buffer that cannot be checked is treated as invalid
//! - Buffers borrow the memory collaborator, so no handle outlives a
//!   protection change

use super::address::{SysAddr, UserAddr};
use super::prot::Prot;
use crate::trap::TrapError;

/// Address-space collaborator.
///
/// Implemented by whatever owns the sandbox mapping; [`SandboxMemory`]
/// is the in-process implementation.
///
/// [`SandboxMemory`]: super::SandboxMemory
pub trait UserMemory {
    /// Translate an untrusted address to a trusted one. Null translates
    /// without error; later range checks decide whether it is usable.
    fn to_sys(&self, addr: UserAddr) -> SysAddr;

    /// Whether the whole range is mapped with at least `prot`.
    ///
    /// With `Prot::NONE` this only asks whether the range is unlocked.
    fn check(&self, addr: SysAddr, len: usize, prot: Prot) -> bool;

    /// Change protection of the range, reporting a platform errno on failure.
    fn protect(&mut self, addr: SysAddr, len: usize, prot: Prot) -> Result<(), i32>;

    /// Borrow a trusted range for reading.
    fn bytes(&self, addr: SysAddr, len: usize) -> Option<&[u8]>;

    /// Borrow a trusted range for writing.
    fn bytes_mut(&mut self, addr: SysAddr, len: usize) -> Option<&mut [u8]>;
}

/// A validated untrusted buffer the host may read from.
#[derive(Debug)]
pub struct UserBuffer<'a> {
    bytes: &'a [u8],
}

impl<'a> UserBuffer<'a> {
    /// Get the buffer as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// A validated untrusted buffer the host may write into.
#[derive(Debug)]
pub struct UserBufferMut<'a> {
    bytes: &'a mut [u8],
}

impl UserBufferMut<'_> {
    /// Get the buffer as a mutable byte slice.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }
}

/// Validate an untrusted buffer that the host will read (a Write source).
///
/// # Security Checks
/// 1. Address is translated (null allowed)
/// 2. The whole range is mapped readable
pub fn validate_user_read<'a>(
    memory: &'a dyn UserMemory,
    addr: UserAddr,
    len: usize,
) -> Result<UserBuffer<'a>, TrapError> {
    let sys = memory.to_sys(addr);
    if !memory.check(sys, len, Prot::READ) {
        return Err(TrapError::InvalidArgument);
    }
    let bytes = memory.bytes(sys, len).ok_or(TrapError::InvalidArgument)?;
    Ok(UserBuffer { bytes })
}

/// Validate an untrusted buffer that the host will fill (a Read target).
pub fn validate_user_write<'a>(
    memory: &'a mut dyn UserMemory,
    addr: UserAddr,
    len: usize,
) -> Result<UserBufferMut<'a>, TrapError> {
    let sys = memory.to_sys(addr);
    if !memory.check(sys, len, Prot::WRITE) {
        return Err(TrapError::InvalidArgument);
    }
    let bytes = memory.bytes_mut(sys, len).ok_or(TrapError::InvalidArgument)?;
    Ok(UserBufferMut { bytes })
}
