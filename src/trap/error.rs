//! Trap Result Codes
//!
//! Every handler reports failure through [`TrapError`]. The dispatcher
//! turns it into the negated errno the untrusted caller sees, exactly once,
//! at the trap boundary.

use core::fmt;

/// Linux errno values used on the trap ABI.
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const ENOMEM: i32 = 12;
    pub const EACCES: i32 = 13;
    pub const EFAULT: i32 = 14;
    pub const EINVAL: i32 = 22;
    pub const EFBIG: i32 = 27;
    pub const EDQUOT: i32 = 122;
}

/// Trap error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapError {
    /// Invalid argument (bad channel id, offset, alignment)
    InvalidArgument,
    /// Bad address or negative size
    Fault,
    /// Region locked or not readable for execution
    AccessDenied,
    /// Unsupported syscall, protection, or failed validation
    NotPermitted,
    /// Channel operation or byte budget exhausted
    QuotaExceeded,
    /// Errno reported verbatim by the protection primitive
    Os(i32),
}

impl TrapError {
    /// Negated errno placed in the trap return value.
    #[inline]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidArgument => -errno::EINVAL,
            Self::Fault => -errno::EFAULT,
            Self::AccessDenied => -errno::EACCES,
            Self::NotPermitted => -errno::EPERM,
            Self::QuotaExceeded => -errno::EDQUOT,
            Self::Os(errno) => -errno,
        }
    }
}

impl fmt::Display for TrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Fault => write!(f, "bad address"),
            Self::AccessDenied => write!(f, "access denied"),
            Self::NotPermitted => write!(f, "operation not permitted"),
            Self::QuotaExceeded => write!(f, "quota exceeded"),
            Self::Os(errno) => write!(f, "platform error {}", errno),
        }
    }
}

/// Result of a handler: success payload or trap error.
pub type TrapResult = Result<i32, TrapError>;

/// Collapse a handler result into the signed ABI value.
#[inline]
pub fn into_retcode(result: TrapResult) -> i32 {
    match result {
        Ok(value) => value,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_negated_errno() {
        assert_eq!(TrapError::InvalidArgument.code(), -22);
        assert_eq!(TrapError::Fault.code(), -14);
        assert_eq!(TrapError::AccessDenied.code(), -13);
        assert_eq!(TrapError::NotPermitted.code(), -1);
        assert_eq!(TrapError::QuotaExceeded.code(), -122);
        assert_eq!(TrapError::Os(errno::ENOMEM).code(), -12);
    }

    #[test]
    fn test_into_retcode() {
        assert_eq!(into_retcode(Ok(17)), 17);
        assert_eq!(into_retcode(Err(TrapError::QuotaExceeded)), -122);
    }
}
