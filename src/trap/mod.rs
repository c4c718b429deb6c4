//! Trap Interface
//!
//! The single entry point through which untrusted code reaches the host.
//!
//! # Security Model
//! - Whitelist approach: only the six listed syscalls are served
//! - All parameters are narrowed at decode time and validated by the
//!   handler before use
//! - Invalid inputs return errors, never panic
//!
//! # Syscalls
//! - Fork: duplicate the session; the caller's context ends on success
//! - Exit(code): end the session
//! - Read(ch, buf, size, offset) / Write(ch, buf, size, offset): channel I/O
//! - Prot(addr, size, prot): change memory protection
//! - Test: snapshot the session, then end it

pub mod abi;
mod dispatch;
pub mod error;

pub use abi::{Syscall, TrapBlock, TrapRequest};
pub use dispatch::{Dispatcher, Host, TrapOutcome};
pub use error::{into_retcode, TrapError, TrapResult};
