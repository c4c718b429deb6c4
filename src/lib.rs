//! trapgate - Trusted Trap Gate for Sandboxed Code
//!
//! Mediates every request an untrusted, sandboxed program makes to the
//! host: decodes the trap, validates it against memory and quota
//! invariants, performs the channel I/O or protection change, and returns
//! a result code.
//!
//! # Components
//! - Trap Dispatcher (`trap`): request block decode and routing
//! - Channel I/O Manager (`channel`): cursors, counters, quotas
//! - Memory Protection Gate (`mem`): alignment, locking, code validation
//! - Session Lifecycle Controller (`session`): terminal exit report
//!
//! # Security Features
//! - Pointer wraparound guard on the request block
//! - Closed syscall and protection tables, deny by default
//! - Quotas enforced before any byte moves
//! - Executable access only for validated, already-readable code
//!
//! # Collaborators
//! Address translation, the mapping primitive, the code validator, channel
//! byte movement, and fork/snapshot/teardown are supplied by the host
//! through the traits in each module. In-memory implementations
//! ([`mem::SandboxMemory`], [`channel::BufferedChannels`],
//! [`trace::MemoryTracer`]) are provided.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod channel;
pub mod config;
pub mod mem;
pub mod session;
pub mod trace;
pub mod trap;

pub use config::TrapConfig;
pub use session::{Lifecycle, Manifest, Session, SessionReport};
pub use trap::{Dispatcher, Host, TrapError, TrapOutcome};
