//! Memory Protection Gate
//!
//! Handles the Prot trap: changes protection of an untrusted region, and
//! only lets a region become executable after the code validator accepts
//! its bytes.
//!
//! # Security Considerations
//! - Address and size must be multiples of the mapping granularity
//! - Locked regions never change protection
//! - A region must already be readable before it is validated for execute
//! - Write+execute is not in the permitted table and is always refused

use log::{debug, warn};

use super::address::{SysAddr, UserAddr};
use super::prot::{classify, Prot, ProtAction};
use super::user::UserMemory;
use crate::config::TrapConfig;
use crate::trap::{TrapError, TrapResult};

/// Instruction-stream validator collaborator.
pub trait CodeValidator {
    /// Whether `len` bytes at `code` are safe to execute.
    ///
    /// `user` is the untrusted address of the same bytes; branch targets in
    /// the code are expressed relative to it.
    fn validates(&self, code: SysAddr, len: usize, user: UserAddr) -> bool;
}

/// Change protection of `[addr, addr + size)`.
///
/// Returns 0 on success.
pub fn protect(
    config: &TrapConfig,
    memory: &mut dyn UserMemory,
    validator: &dyn CodeValidator,
    addr: UserAddr,
    size: u32,
    prot: i32,
) -> TrapResult {
    let sys = memory.to_sys(addr);
    let len = size as usize;

    if u64::from(size) % config.map_page_size() != 0 {
        return Err(TrapError::InvalidArgument);
    }
    if !sys.is_aligned_to(config.map_page_size()) {
        return Err(TrapError::InvalidArgument);
    }

    if !memory.check(sys, len, Prot::NONE) {
        warn!("protection change on locked region {}+{:#x} refused", addr, size);
        return Err(TrapError::AccessDenied);
    }

    match classify(prot) {
        ProtAction::Apply(prot) => apply(memory, sys, len, prot),
        ProtAction::ValidateThenApply(prot) => {
            if !memory.check(sys, len, Prot::READ) {
                return Err(TrapError::AccessDenied);
            }
            if !validator.validates(sys, len, addr) {
                warn!("code at {}+{:#x} failed validation", addr, size);
                return Err(TrapError::NotPermitted);
            }
            apply(memory, sys, len, prot)
        }
        ProtAction::Reject => Err(TrapError::NotPermitted),
    }
}

fn apply(memory: &mut dyn UserMemory, sys: SysAddr, len: usize, prot: Prot) -> TrapResult {
    memory.protect(sys, len, prot).map_err(TrapError::Os)?;
    debug!("protection {:?} applied to {}+{:#x}", prot, sys, len);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::SandboxMemory;
    use core::cell::Cell;

    const PAGE: u64 = 0x1000;

    /// Validator with a fixed verdict that counts its invocations.
    struct Verdict {
        accept: bool,
        calls: Cell<usize>,
    }

    impl Verdict {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                calls: Cell::new(0),
            }
        }
    }

    impl CodeValidator for Verdict {
        fn validates(&self, _code: SysAddr, _len: usize, _user: UserAddr) -> bool {
            self.calls.set(self.calls.get() + 1);
            self.accept
        }
    }

    fn setup() -> (TrapConfig, SandboxMemory) {
        let config = TrapConfig::new(0xFFFF_FFFF, PAGE).unwrap();
        let mut mem = SandboxMemory::new(8 * PAGE as usize, PAGE as usize);
        mem.map(UserAddr::new(PAGE), 2 * PAGE as usize, Prot::READ_WRITE).unwrap();
        (config, mem)
    }

    #[test]
    fn test_misaligned_size_or_address() {
        let (config, mut mem) = setup();
        let v = Verdict::new(true);
        assert_eq!(
            protect(&config, &mut mem, &v, UserAddr::new(PAGE), 100, 1),
            Err(TrapError::InvalidArgument)
        );
        assert_eq!(
            protect(&config, &mut mem, &v, UserAddr::new(PAGE + 8), PAGE as u32, 1),
            Err(TrapError::InvalidArgument)
        );
    }

    #[test]
    fn test_data_protection_applies() {
        let (config, mut mem) = setup();
        let v = Verdict::new(true);
        assert_eq!(protect(&config, &mut mem, &v, UserAddr::new(PAGE), PAGE as u32, 1), Ok(0));
        assert_eq!(mem.prot_at(UserAddr::new(PAGE)), Some(Prot::READ));
        assert_eq!(v.calls.get(), 0);
    }

    #[test]
    fn test_locked_region_denied() {
        let (config, mut mem) = setup();
        mem.lock(UserAddr::new(PAGE), PAGE as usize).unwrap();
        let v = Verdict::new(true);
        assert_eq!(
            protect(&config, &mut mem, &v, UserAddr::new(PAGE), PAGE as u32, 3),
            Err(TrapError::AccessDenied)
        );
    }

    #[test]
    fn test_exec_on_unreadable_skips_validator() {
        let (config, mut mem) = setup();
        let v = Verdict::new(true);
        // page 4 is still no-access
        assert_eq!(
            protect(&config, &mut mem, &v, UserAddr::new(4 * PAGE), PAGE as u32, 5),
            Err(TrapError::AccessDenied)
        );
        assert_eq!(v.calls.get(), 0);
    }

    #[test]
    fn test_failed_validation_leaves_protection() {
        let (config, mut mem) = setup();
        let v = Verdict::new(false);
        assert_eq!(
            protect(&config, &mut mem, &v, UserAddr::new(PAGE), PAGE as u32, 5),
            Err(TrapError::NotPermitted)
        );
        assert_eq!(v.calls.get(), 1);
        assert_eq!(mem.prot_at(UserAddr::new(PAGE)), Some(Prot::READ_WRITE));
    }

    #[test]
    fn test_validated_code_becomes_executable() {
        let (config, mut mem) = setup();
        let v = Verdict::new(true);
        assert_eq!(protect(&config, &mut mem, &v, UserAddr::new(PAGE), 2 * PAGE as u32, 5), Ok(0));
        assert_eq!(mem.prot_at(UserAddr::new(2 * PAGE)), Some(Prot::READ_EXEC));
    }

    #[test]
    fn test_exec_only_goes_through_validator() {
        let (config, mut mem) = setup();
        let refuse = Verdict::new(false);
        assert_eq!(
            protect(&config, &mut mem, &refuse, UserAddr::new(PAGE), PAGE as u32, 4),
            Err(TrapError::NotPermitted)
        );
        assert_eq!(refuse.calls.get(), 1);

        let accept = Verdict::new(true);
        assert_eq!(protect(&config, &mut mem, &accept, UserAddr::new(PAGE), PAGE as u32, 4), Ok(0));
        assert_eq!(accept.calls.get(), 1);
        assert_eq!(mem.prot_at(UserAddr::new(PAGE)), Some(Prot::EXEC));
    }

    #[test]
    fn test_unsupported_combination() {
        let (config, mut mem) = setup();
        let v = Verdict::new(true);
        assert_eq!(
            protect(&config, &mut mem, &v, UserAddr::new(PAGE), PAGE as u32, 7),
            Err(TrapError::NotPermitted)
        );
        assert_eq!(v.calls.get(), 0);
    }

    #[test]
    fn test_platform_error_surfaces_verbatim() {
        let (config, mut mem) = setup();
        let v = Verdict::new(true);
        // range checks pass, the primitive itself refuses
        struct Refusing<'a>(&'a mut SandboxMemory);
        impl UserMemory for Refusing<'_> {
            fn to_sys(&self, addr: UserAddr) -> SysAddr {
                self.0.to_sys(addr)
            }
            fn check(&self, addr: SysAddr, len: usize, prot: Prot) -> bool {
                self.0.check(addr, len, prot)
            }
            fn protect(&mut self, _: SysAddr, _: usize, _: Prot) -> Result<(), i32> {
                Err(crate::trap::error::errno::ENOMEM)
            }
            fn bytes(&self, addr: SysAddr, len: usize) -> Option<&[u8]> {
                self.0.bytes(addr, len)
            }
            fn bytes_mut(&mut self, addr: SysAddr, len: usize) -> Option<&mut [u8]> {
                self.0.bytes_mut(addr, len)
            }
        }
        let mut refusing = Refusing(&mut mem);
        let result = protect(&config, &mut refusing, &v, UserAddr::new(PAGE), PAGE as u32, 3);
        assert_eq!(result, Err(TrapError::Os(12)));
        assert_eq!(result.unwrap_err().code(), -12);
    }
}
