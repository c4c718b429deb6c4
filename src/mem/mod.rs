//! Untrusted memory management
//!
//! Provides:
//! - Typed untrusted/trusted addresses
//! - The address-space collaborator contract and validated user buffers
//! - The memory protection gate (Prot trap)
//! - A software sandbox arena implementing the contract
//!
//! # Security Principles
//! - Every untrusted range is checked before it is touched
//! - Protection changes go through a closed permission table
//! - Executable access requires code validation

mod address;
mod arena;
mod gate;
mod prot;
mod user;

pub use address::{SysAddr, UserAddr};
pub use arena::{SandboxMemory, DEFAULT_BASE};
pub use gate::{protect, CodeValidator};
pub use prot::{classify, Prot, ProtAction};
pub use user::{validate_user_read, validate_user_write, UserBuffer, UserBufferMut, UserMemory};
