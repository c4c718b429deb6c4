//! Memory Protection Bits
//!
//! Protection values follow the POSIX `PROT_*` encoding, which is also what
//! the untrusted caller passes in the Prot trap.
//!
//! # Security Properties
//! - Requested protections are mapped through a closed table; anything not
//!   listed is rejected
//! - Executable protections always route through code validation

use bitflags::bitflags;

bitflags! {
    /// Page protection flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Prot: u32 {
        /// Readable.
        const READ = 0x1;
        /// Writable.
        const WRITE = 0x2;
        /// Executable.
        const EXEC = 0x4;

        /// Read and write.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        /// Read and execute.
        const READ_EXEC = Self::READ.bits() | Self::EXEC.bits();
    }
}

impl Prot {
    /// No access.
    pub const NONE: Self = Self::empty();
}

/// What the gate does for a requested protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtAction {
    /// Apply the protection directly.
    Apply(Prot),
    /// Require readability and a passing validator before applying.
    ValidateThenApply(Prot),
    /// Refuse the request.
    Reject,
}

/// Map a raw requested protection onto the action the gate takes.
///
/// New combinations are added only by extending this table.
pub fn classify(raw: i32) -> ProtAction {
    const NONE: i32 = 0;
    const R: i32 = Prot::READ.bits() as i32;
    const W: i32 = Prot::WRITE.bits() as i32;
    const X: i32 = Prot::EXEC.bits() as i32;

    match raw {
        NONE => ProtAction::Apply(Prot::NONE),
        R => ProtAction::Apply(Prot::READ),
        W => ProtAction::Apply(Prot::WRITE),
        v if v == R | W => ProtAction::Apply(Prot::READ_WRITE),
        X => ProtAction::ValidateThenApply(Prot::EXEC),
        v if v == R | X => ProtAction::ValidateThenApply(Prot::READ_EXEC),
        _ => ProtAction::Reject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_protections_apply_directly() {
        assert_eq!(classify(0), ProtAction::Apply(Prot::NONE));
        assert_eq!(classify(1), ProtAction::Apply(Prot::READ));
        assert_eq!(classify(2), ProtAction::Apply(Prot::WRITE));
        assert_eq!(classify(3), ProtAction::Apply(Prot::READ_WRITE));
    }

    #[test]
    fn test_exec_protections_need_validation() {
        assert_eq!(classify(4), ProtAction::ValidateThenApply(Prot::EXEC));
        assert_eq!(classify(5), ProtAction::ValidateThenApply(Prot::READ_EXEC));
    }

    #[test]
    fn test_everything_else_rejected() {
        // write+exec and rwx must never be grantable
        assert_eq!(classify(6), ProtAction::Reject);
        assert_eq!(classify(7), ProtAction::Reject);
        assert_eq!(classify(8), ProtAction::Reject);
        assert_eq!(classify(-1), ProtAction::Reject);
    }
}
