//! Sandbox Layout Configuration
//!
//! Constants describing the untrusted address space and the trap ABI,
//! plus the [`TrapConfig`] value the dispatcher and protection gate read.

use core::fmt;

/// Highest addressable untrusted address (4 GiB sandbox).
pub const USER_ADDRESS_MAX: u64 = 0xFFFF_FFFF;

/// Granularity of the mapping primitive (64 KiB).
pub const MAP_PAGE_SIZE: u64 = 0x1_0000;

/// Number of 64-bit words in a trap request block.
pub const TRAP_BLOCK_WORDS: usize = 6;

/// Size in bytes of a trap request block.
pub const TRAP_BLOCK_SIZE: u64 = (TRAP_BLOCK_WORDS * 8) as u64;

/// Status string recorded for a normally completed session.
pub const OK_STATE: &str = "ok";

/// Layout parameters consumed by the trap dispatcher.
///
/// Only obtainable through [`TrapConfig::new`] or `Default`, so the page
/// size is always a power of two and a trap block always fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapConfig {
    max_address: u64,
    map_page_size: u64,
}

impl TrapConfig {
    /// Build a configuration, rejecting layouts the gate cannot honour.
    pub const fn new(max_address: u64, map_page_size: u64) -> Result<Self, ConfigError> {
        if map_page_size == 0 || !map_page_size.is_power_of_two() {
            return Err(ConfigError::BadPageSize(map_page_size));
        }
        if max_address < TRAP_BLOCK_SIZE {
            return Err(ConfigError::AddressSpaceTooSmall(max_address));
        }
        Ok(Self {
            max_address,
            map_page_size,
        })
    }

    /// Highest representable untrusted address.
    #[inline]
    pub const fn max_address(&self) -> u64 {
        self.max_address
    }

    /// Mapping granularity for protection changes.
    #[inline]
    pub const fn map_page_size(&self) -> u64 {
        self.map_page_size
    }

    /// Highest address at which a full trap block still fits.
    #[inline]
    pub const fn last_block_address(&self) -> u64 {
        self.max_address - TRAP_BLOCK_SIZE
    }
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            max_address: USER_ADDRESS_MAX,
            map_page_size: MAP_PAGE_SIZE,
        }
    }
}

/// Rejected layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Page size is zero or not a power of two.
    BadPageSize(u64),
    /// Address space cannot hold a single trap block.
    AddressSpaceTooSmall(u64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPageSize(size) => write!(f, "mapping page size {:#x} is not a power of two", size),
            Self::AddressSpaceTooSmall(max) => {
                write!(f, "address space ending at {:#x} cannot hold a trap block", max)
            }
        }
    }
}
